//! Per-device capability store: the real-queried baseline plus the declared
//! overrides and the policies that combine them.
//!
//! A store is created once per discovered device, mutated only while profile
//! documents load, and read-only afterwards. Query entry points obtain the
//! real driver answer first, then ask the store to fold the declared values
//! in; collection-valued areas go through the combination policies, scalar
//! blocks return the override copies, and chained query structures are
//! patched in place.

use crate::blocks::{
    DepthStencilResolveProperties, DescriptorIndexingFeatures, Maintenance3Properties,
    PhysicalFeatures, PhysicalLimits, PortabilityFeatures, ShaderFloat16Int8Features,
    apply_block_fields,
};
use crate::chain::{BlockPayload, BlockTag, ChainNode, SectionKind, spec_for_section, spec_for_tag};
use crate::diag::{Warning, note};
use crate::format::{FormatCaps, FormatId, merge_format_caps};
use crate::policy::{CombinePolicy, combine};
use crate::records::{ExtensionRecord, PresentMode, SurfaceFormatRecord};
use anyhow::{Result, bail};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Combination policy per collection kind, chosen independently.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CombinePolicies {
    pub extensions: CombinePolicy,
    /// Membership axis for per-format records.
    pub formats: CombinePolicy,
    /// Feature-merge axis for per-format bitmasks.
    pub format_features: CombinePolicy,
    pub surface_formats: CombinePolicy,
    pub present_modes: CombinePolicy,
}

/// Everything queried from the real device at discovery time.
///
/// `active` holds the names of the capabilities (extensions) the host enabled
/// for this device; it gates which chained blocks the patcher may overwrite.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeviceBaseline {
    pub features: PhysicalFeatures,
    pub limits: PhysicalLimits,
    pub descriptor_indexing: DescriptorIndexingFeatures,
    pub shader_float16_int8: ShaderFloat16Int8Features,
    pub depth_stencil_resolve: DepthStencilResolveProperties,
    pub maintenance3: Maintenance3Properties,
    pub portability: PortabilityFeatures,
    pub extensions: Vec<ExtensionRecord>,
    pub formats: BTreeMap<FormatId, FormatCaps>,
    pub surface_formats: Vec<SurfaceFormatRecord>,
    pub present_modes: Vec<PresentMode>,
    pub active: BTreeSet<String>,
}

/// Override copies of every scalar block, seeded from the baseline.
#[derive(Clone, Debug, PartialEq)]
struct BlockSet {
    features: PhysicalFeatures,
    limits: PhysicalLimits,
    descriptor_indexing: DescriptorIndexingFeatures,
    shader_float16_int8: ShaderFloat16Int8Features,
    depth_stencil_resolve: DepthStencilResolveProperties,
    maintenance3: Maintenance3Properties,
    portability: PortabilityFeatures,
}

impl BlockSet {
    fn from_baseline(baseline: &DeviceBaseline) -> Self {
        Self {
            features: baseline.features.clone(),
            limits: baseline.limits.clone(),
            descriptor_indexing: baseline.descriptor_indexing.clone(),
            shader_float16_int8: baseline.shader_float16_int8.clone(),
            depth_stencil_resolve: baseline.depth_stencil_resolve.clone(),
            maintenance3: baseline.maintenance3.clone(),
            portability: baseline.portability.clone(),
        }
    }
}

/// Per-device capability store.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceCaps {
    baseline: DeviceBaseline,
    overrides: BlockSet,
    // `None` per collection means no document declared that area; queries
    // then return the baseline regardless of the configured policy.
    declared_extensions: Option<BTreeMap<String, u32>>,
    declared_formats: Option<BTreeMap<FormatId, FormatCaps>>,
    declared_surface_formats: Option<Vec<SurfaceFormatRecord>>,
    declared_present_modes: Option<Vec<PresentMode>>,
    policies: CombinePolicies,
    emulate_portability: bool,
}

impl DeviceCaps {
    pub fn new(baseline: DeviceBaseline, policies: CombinePolicies, emulate_portability: bool) -> Self {
        let overrides = BlockSet::from_baseline(&baseline);
        Self {
            baseline,
            overrides,
            declared_extensions: None,
            declared_formats: None,
            declared_surface_formats: None,
            declared_present_modes: None,
            policies,
            emulate_portability,
        }
    }

    /// Whether a block's governing capability is active on this device.
    pub fn is_active(&self, capability: &str) -> bool {
        self.baseline.active.contains(capability)
    }

    pub fn emulate_portability(&self) -> bool {
        self.emulate_portability
    }

    pub fn baseline(&self) -> &DeviceBaseline {
        &self.baseline
    }

    pub fn features(&self) -> &PhysicalFeatures {
        &self.overrides.features
    }

    pub fn limits(&self) -> &PhysicalLimits {
        &self.overrides.limits
    }

    pub fn descriptor_indexing(&self) -> &DescriptorIndexingFeatures {
        &self.overrides.descriptor_indexing
    }

    pub fn shader_float16_int8(&self) -> &ShaderFloat16Int8Features {
        &self.overrides.shader_float16_int8
    }

    pub fn depth_stencil_resolve(&self) -> &DepthStencilResolveProperties {
        &self.overrides.depth_stencil_resolve
    }

    pub fn maintenance3(&self) -> &Maintenance3Properties {
        &self.overrides.maintenance3
    }

    pub fn portability(&self) -> &PortabilityFeatures {
        &self.overrides.portability
    }

    /// Extension list after folding the declared names in.
    pub fn effective_extensions(&self) -> Vec<ExtensionRecord> {
        match &self.declared_extensions {
            None => self.baseline.extensions.clone(),
            Some(declared) => {
                let declared: Vec<ExtensionRecord> = declared
                    .iter()
                    .map(|(name, version)| ExtensionRecord {
                        name: name.clone(),
                        spec_version: *version,
                    })
                    .collect();
                combine(&self.baseline.extensions, &declared, self.policies.extensions)
            }
        }
    }

    pub fn effective_surface_formats(&self) -> Vec<SurfaceFormatRecord> {
        match &self.declared_surface_formats {
            None => self.baseline.surface_formats.clone(),
            Some(declared) => combine(
                &self.baseline.surface_formats,
                declared,
                self.policies.surface_formats,
            ),
        }
    }

    pub fn effective_present_modes(&self) -> Vec<PresentMode> {
        match &self.declared_present_modes {
            None => self.baseline.present_modes.clone(),
            Some(declared) => combine(
                &self.baseline.present_modes,
                declared,
                self.policies.present_modes,
            ),
        }
    }

    /// Fold the declared record for one format into the driver's answer.
    pub fn format_properties(
        &self,
        format: &FormatId,
        real: FormatCaps,
        warnings: &mut Vec<Warning>,
    ) -> FormatCaps {
        match &self.declared_formats {
            None => real,
            Some(declared) => merge_format_caps(
                format,
                real,
                declared.get(format),
                self.policies.formats,
                self.policies.format_features,
                warnings,
            ),
        }
    }

    /// Patch a caller-owned capability chain in place.
    ///
    /// Single left-to-right traversal; each registered node whose governing
    /// capability is active (or, for the portability block, when emulation is
    /// on) has its payload overwritten with the stored override. Inactive and
    /// unregistered nodes keep whatever the driver wrote. Idempotent: the
    /// write is a full overwrite, never an increment.
    pub fn patch_chain(&self, head: &mut ChainNode) {
        let mut node = Some(head);
        while let Some(current) = node {
            if let Some(spec) = spec_for_tag(current.payload.tag()) {
                let emulated =
                    spec.tag == BlockTag::Portability && self.emulate_portability;
                if self.is_active(spec.capability) || emulated {
                    current.payload = self.override_payload(spec.tag);
                }
            }
            node = current.next.as_deref_mut();
        }
    }

    fn override_payload(&self, tag: BlockTag) -> BlockPayload {
        match tag {
            BlockTag::DescriptorIndexing => {
                BlockPayload::DescriptorIndexing(self.overrides.descriptor_indexing.clone())
            }
            BlockTag::ShaderFloat16Int8 => {
                BlockPayload::ShaderFloat16Int8(self.overrides.shader_float16_int8.clone())
            }
            BlockTag::DepthStencilResolve => {
                BlockPayload::DepthStencilResolve(self.overrides.depth_stencil_resolve.clone())
            }
            BlockTag::Maintenance3 => {
                BlockPayload::Maintenance3(self.overrides.maintenance3.clone())
            }
            BlockTag::Portability => {
                BlockPayload::Portability(self.overrides.portability.clone())
            }
        }
    }

    /// Overlay a document's extension map; later documents win per name.
    pub(crate) fn apply_extension_map(&mut self, declared: &BTreeMap<String, u32>) {
        self.declared_extensions
            .get_or_insert_with(BTreeMap::new)
            .extend(declared.iter().map(|(k, v)| (k.clone(), *v)));
    }

    /// Dispatch one named feature/property section to its destination block.
    ///
    /// Writing into a block whose governing capability is inactive still
    /// succeeds but warns that the value will not be surfaced.
    pub(crate) fn apply_block_section(
        &mut self,
        kind: SectionKind,
        section: &str,
        fields: &Map<String, Value>,
        warnings: &mut Vec<Warning>,
    ) -> Result<()> {
        match (kind, section) {
            (SectionKind::Features, "core") => {
                return apply_block_fields(
                    &mut self.overrides.features,
                    &self.baseline.features,
                    section,
                    fields,
                    warnings,
                );
            }
            (SectionKind::Properties, "limits") => {
                return apply_block_fields(
                    &mut self.overrides.limits,
                    &self.baseline.limits,
                    section,
                    fields,
                    warnings,
                );
            }
            _ => {}
        }

        let Some(spec) = spec_for_section(kind, section) else {
            let kind_name = match kind {
                SectionKind::Features => "features",
                SectionKind::Properties => "properties",
            };
            bail!("unknown {kind_name} section '{section}'");
        };
        let emulated = spec.tag == BlockTag::Portability && self.emulate_portability;
        if !self.is_active(spec.capability) && !emulated {
            note(
                warnings,
                Warning::CapabilityInactive {
                    section: section.to_string(),
                    capability: spec.capability.to_string(),
                },
            );
        }
        match spec.tag {
            BlockTag::DescriptorIndexing => apply_block_fields(
                &mut self.overrides.descriptor_indexing,
                &self.baseline.descriptor_indexing,
                section,
                fields,
                warnings,
            ),
            BlockTag::ShaderFloat16Int8 => apply_block_fields(
                &mut self.overrides.shader_float16_int8,
                &self.baseline.shader_float16_int8,
                section,
                fields,
                warnings,
            ),
            BlockTag::DepthStencilResolve => apply_block_fields(
                &mut self.overrides.depth_stencil_resolve,
                &self.baseline.depth_stencil_resolve,
                section,
                fields,
                warnings,
            ),
            BlockTag::Maintenance3 => apply_block_fields(
                &mut self.overrides.maintenance3,
                &self.baseline.maintenance3,
                section,
                fields,
                warnings,
            ),
            BlockTag::Portability => apply_block_fields(
                &mut self.overrides.portability,
                &self.baseline.portability,
                section,
                fields,
                warnings,
            ),
        }
    }

    /// Overlay one declared format record; later documents win per format.
    pub(crate) fn apply_format_entry(&mut self, format: FormatId, caps: FormatCaps) {
        self.declared_formats
            .get_or_insert_with(BTreeMap::new)
            .insert(format, caps);
    }

    /// Replace the declared surface-format list for this store.
    pub(crate) fn set_declared_surface_formats(&mut self, declared: Vec<SurfaceFormatRecord>) {
        self.declared_surface_formats = Some(declared);
    }

    /// Replace the declared presentation-mode list for this store.
    pub(crate) fn set_declared_present_modes(&mut self, declared: Vec<PresentMode>) {
        self.declared_present_modes = Some(declared);
    }
}
