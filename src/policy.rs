//! Combination policies for merging declared capability collections with the
//! values queried from the real device.
//!
//! The engine is a pure function over two keyed collections: equality is
//! key-based, values never participate in matching. No policy needs values
//! beyond identity except `Replace`, which substitutes the declared
//! collection wholesale.

use anyhow::{Result, bail};
use std::collections::BTreeSet;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CombinePolicy {
    /// Baseline unchanged; declared values ignored.
    #[default]
    None,
    /// Declared collection substituted wholesale.
    Replace,
    /// Baseline entries whose key the profile also declares.
    Whitelist,
    /// Baseline entries whose key the profile does not declare.
    Blacklist,
    /// Key-union of baseline and declared; baseline values win on collision.
    /// The name is historical and is kept for compatibility with existing
    /// profiles and settings.
    Intersect,
}

impl CombinePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CombinePolicy::None => "none",
            CombinePolicy::Replace => "replace",
            CombinePolicy::Whitelist => "whitelist",
            CombinePolicy::Blacklist => "blacklist",
            CombinePolicy::Intersect => "intersect",
        }
    }
}

impl TryFrom<&str> for CombinePolicy {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self> {
        match value {
            "none" => Ok(CombinePolicy::None),
            "replace" => Ok(CombinePolicy::Replace),
            "whitelist" => Ok(CombinePolicy::Whitelist),
            "blacklist" => Ok(CombinePolicy::Blacklist),
            "intersect" => Ok(CombinePolicy::Intersect),
            other => bail!(
                "Unknown combination policy: {other} (expected none|replace|whitelist|blacklist|intersect)"
            ),
        }
    }
}

/// Record types the policy engine can combine.
///
/// Keys must be cheap to clone; collections stay small (extension lists,
/// surface formats, presentation modes).
pub trait Keyed {
    type Key: Ord + Clone;

    fn key(&self) -> Self::Key;
}

/// Combine a declared collection with the baseline queried from the device.
///
/// Baseline order is preserved under every policy except `Replace`; under
/// `Intersect` the declared entries missing from the baseline are appended in
/// declared order. An empty declared set simply yields whatever the policy
/// rules dictate; the engine never fails.
pub fn combine<R: Keyed + Clone>(baseline: &[R], declared: &[R], policy: CombinePolicy) -> Vec<R> {
    match policy {
        CombinePolicy::None => baseline.to_vec(),
        CombinePolicy::Replace => declared.to_vec(),
        CombinePolicy::Whitelist => {
            let keep: BTreeSet<R::Key> = declared.iter().map(Keyed::key).collect();
            baseline
                .iter()
                .filter(|record| keep.contains(&record.key()))
                .cloned()
                .collect()
        }
        CombinePolicy::Blacklist => {
            let drop: BTreeSet<R::Key> = declared.iter().map(Keyed::key).collect();
            baseline
                .iter()
                .filter(|record| !drop.contains(&record.key()))
                .cloned()
                .collect()
        }
        CombinePolicy::Intersect => {
            let present: BTreeSet<R::Key> = baseline.iter().map(Keyed::key).collect();
            let mut merged = baseline.to_vec();
            merged.extend(
                declared
                    .iter()
                    .filter(|record| !present.contains(&record.key()))
                    .cloned(),
            );
            merged
        }
    }
}
