//! Per-format capability records and the two-axis format merger.
//!
//! A format's capabilities are three independent feature masks: two tiling
//! masks and one buffer mask. A format counts as supported when at least one
//! mask is non-zero. Merging runs in two stages: a membership axis decides
//! whose record answers the query at all, and a feature axis combines the
//! masks bit-wise when both the device and the profile have something to say.

use crate::diag::{Warning, note};
use crate::policy::CombinePolicy;
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier for a pixel format (e.g., `r8g8b8a8_unorm`).
///
/// Profiles key format entries by these names; the interception layer maps
/// them to and from the driver's numeric format ids.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormatId(pub String);

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

bitflags::bitflags! {
    /// Feature bits a format can assert for one usage class.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct FormatFeatures: u64 {
        const SAMPLED_IMAGE = 1 << 0;
        const STORAGE_IMAGE = 1 << 1;
        const COLOR_ATTACHMENT = 1 << 2;
        const COLOR_ATTACHMENT_BLEND = 1 << 3;
        const DEPTH_STENCIL_ATTACHMENT = 1 << 4;
        const BLIT_SRC = 1 << 5;
        const BLIT_DST = 1 << 6;
        const SAMPLED_IMAGE_FILTER_LINEAR = 1 << 7;
        const TRANSFER_SRC = 1 << 8;
        const TRANSFER_DST = 1 << 9;
        const VERTEX_BUFFER = 1 << 10;
        const UNIFORM_TEXEL_BUFFER = 1 << 11;
        const STORAGE_TEXEL_BUFFER = 1 << 12;
    }
}

/// Profile-facing names for each feature bit.
const FORMAT_FEATURE_FLAGS: &[(&str, FormatFeatures)] = &[
    ("sampled_image", FormatFeatures::SAMPLED_IMAGE),
    ("storage_image", FormatFeatures::STORAGE_IMAGE),
    ("color_attachment", FormatFeatures::COLOR_ATTACHMENT),
    ("color_attachment_blend", FormatFeatures::COLOR_ATTACHMENT_BLEND),
    ("depth_stencil_attachment", FormatFeatures::DEPTH_STENCIL_ATTACHMENT),
    ("blit_src", FormatFeatures::BLIT_SRC),
    ("blit_dst", FormatFeatures::BLIT_DST),
    (
        "sampled_image_filter_linear",
        FormatFeatures::SAMPLED_IMAGE_FILTER_LINEAR,
    ),
    ("transfer_src", FormatFeatures::TRANSFER_SRC),
    ("transfer_dst", FormatFeatures::TRANSFER_DST),
    ("vertex_buffer", FormatFeatures::VERTEX_BUFFER),
    ("uniform_texel_buffer", FormatFeatures::UNIFORM_TEXEL_BUFFER),
    ("storage_texel_buffer", FormatFeatures::STORAGE_TEXEL_BUFFER),
];

/// OR a profile's string array into a single mask.
///
/// Unknown names fail the whole document rather than silently dropping bits.
pub fn parse_format_features(names: &[String]) -> Result<FormatFeatures> {
    let mut mask = FormatFeatures::empty();
    for name in names {
        match FORMAT_FEATURE_FLAGS.iter().find(|(n, _)| *n == name.as_str()) {
            Some((_, flag)) => mask |= *flag,
            None => bail!("unknown format feature '{name}'"),
        }
    }
    Ok(mask)
}

/// Capability record for one format: two tiling masks plus a buffer mask.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FormatCaps {
    pub linear_tiling: FormatFeatures,
    pub optimal_tiling: FormatFeatures,
    pub buffer: FormatFeatures,
}

impl FormatCaps {
    /// A format is supported iff at least one of its three masks is non-zero.
    pub fn is_supported(&self) -> bool {
        !self.linear_tiling.is_empty() || !self.optimal_tiling.is_empty() || !self.buffer.is_empty()
    }
}

/// Bit-wise combination of one mask field under the feature-merge policy.
fn merge_masks(real: FormatFeatures, declared: FormatFeatures, policy: CombinePolicy) -> FormatFeatures {
    match policy {
        CombinePolicy::None => real,
        CombinePolicy::Replace => declared,
        CombinePolicy::Whitelist => real & declared,
        // Equivalent to `real & !declared`; the XOR form matches the
        // established behavior and is kept verbatim.
        CombinePolicy::Blacklist => (real ^ declared) & real,
        CombinePolicy::Intersect => real | declared,
    }
}

/// Merge the device's answer for one format with the profile's declaration.
///
/// The membership policy decides whose record answers at all; the device
/// record participates when the real value is supported, the profile record
/// when the document declares the format. The feature policy only runs when
/// both sides have a record and the declared triple is itself supported; a
/// declared all-zero triple is an explicit removal of support and wins
/// unmerged. Bits the merge asserts beyond the real mask are reported per
/// field but still returned.
pub fn merge_format_caps(
    format: &FormatId,
    real: FormatCaps,
    declared: Option<&FormatCaps>,
    membership: CombinePolicy,
    features: CombinePolicy,
    warnings: &mut Vec<Warning>,
) -> FormatCaps {
    let unsupported = FormatCaps::default();
    match membership {
        CombinePolicy::None => real,
        CombinePolicy::Replace => declared.copied().unwrap_or(unsupported),
        CombinePolicy::Whitelist => {
            if declared.is_some() {
                real
            } else {
                unsupported
            }
        }
        CombinePolicy::Blacklist => {
            if declared.is_some() {
                unsupported
            } else {
                real
            }
        }
        CombinePolicy::Intersect => match declared {
            None => real,
            Some(decl) if !real.is_supported() => *decl,
            Some(decl) if !decl.is_supported() => *decl,
            Some(decl) => {
                let merged = FormatCaps {
                    linear_tiling: merge_masks(real.linear_tiling, decl.linear_tiling, features),
                    optimal_tiling: merge_masks(real.optimal_tiling, decl.optimal_tiling, features),
                    buffer: merge_masks(real.buffer, decl.buffer, features),
                };
                warn_unsupported_bits(format, &real, &merged, warnings);
                merged
            }
        },
    }
}

fn warn_unsupported_bits(
    format: &FormatId,
    real: &FormatCaps,
    merged: &FormatCaps,
    warnings: &mut Vec<Warning>,
) {
    let fields: [(&'static str, FormatFeatures, FormatFeatures); 3] = [
        ("linear_tiling_features", real.linear_tiling, merged.linear_tiling),
        ("optimal_tiling_features", real.optimal_tiling, merged.optimal_tiling),
        ("buffer_features", real.buffer, merged.buffer),
    ];
    for (field, real_mask, merged_mask) in fields {
        let added = merged_mask & !real_mask;
        if !added.is_empty() {
            note(
                warnings,
                Warning::UnsupportedFeatureBit {
                    format: format.0.clone(),
                    field,
                    bits: added.bits(),
                },
            );
        }
    }
}
