//! Plain-data configuration consumed by the simulation context.
//!
//! Flag/file parsing mechanics belong to the embedding layer; this module
//! only defines the settings shape and a convenience reader for the
//! `CAPSIM_*` environment variables so standalone harnesses get the same
//! defaults as the layer.

use crate::policy::CombinePolicy;
use crate::store::CombinePolicies;
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

pub const ENV_PROFILE: &str = "CAPSIM_PROFILE";
pub const ENV_EXTENSION_POLICY: &str = "CAPSIM_EXTENSION_POLICY";
pub const ENV_FORMAT_POLICY: &str = "CAPSIM_FORMAT_POLICY";
pub const ENV_FORMAT_FEATURE_POLICY: &str = "CAPSIM_FORMAT_FEATURE_POLICY";
pub const ENV_SURFACE_FORMAT_POLICY: &str = "CAPSIM_SURFACE_FORMAT_POLICY";
pub const ENV_PRESENT_MODE_POLICY: &str = "CAPSIM_PRESENT_MODE_POLICY";
pub const ENV_EMULATE_PORTABILITY: &str = "CAPSIM_EMULATE_PORTABILITY";
pub const ENV_FAIL_ON_ERROR: &str = "CAPSIM_FAIL_ON_ERROR";

/// Settings for one simulation context.
#[derive(Clone, Debug, Default)]
pub struct SimulationConfig {
    /// Profile documents applied, in order, to every registered device.
    pub profile_paths: Vec<PathBuf>,
    pub policies: CombinePolicies,
    /// Surface the portability compatibility block even when the device does
    /// not expose its capability.
    pub emulate_portability: bool,
    /// Escalate any profile-load failure instead of degrading to
    /// "no overrides for this device".
    pub fail_on_error: bool,
}

impl SimulationConfig {
    /// Read settings from the `CAPSIM_*` environment variables.
    ///
    /// Unset variables keep their defaults; a malformed policy name is an
    /// error rather than a silent fallback.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            profile_paths: env::var(ENV_PROFILE)
                .map(|raw| split_list(&raw).into_iter().map(PathBuf::from).collect())
                .unwrap_or_default(),
            policies: CombinePolicies {
                extensions: policy_from_env(ENV_EXTENSION_POLICY)?,
                formats: policy_from_env(ENV_FORMAT_POLICY)?,
                format_features: policy_from_env(ENV_FORMAT_FEATURE_POLICY)?,
                surface_formats: policy_from_env(ENV_SURFACE_FORMAT_POLICY)?,
                present_modes: policy_from_env(ENV_PRESENT_MODE_POLICY)?,
            },
            emulate_portability: bool_from_env(ENV_EMULATE_PORTABILITY),
            fail_on_error: bool_from_env(ENV_FAIL_ON_ERROR),
        })
    }
}

fn policy_from_env(var: &str) -> Result<CombinePolicy> {
    match env::var(var) {
        Ok(raw) => CombinePolicy::try_from(raw.trim())
            .with_context(|| format!("while reading {var}")),
        Err(_) => Ok(CombinePolicy::None),
    }
}

fn bool_from_env(var: &str) -> bool {
    env::var(var)
        .ok()
        .map(|v| !v.trim().is_empty() && v.trim() != "0")
        .unwrap_or(false)
}

/// Split comma- or whitespace-delimited configuration lists into tokens.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .replace(',', " ")
        .split_whitespace()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
