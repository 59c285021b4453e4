//! Profile document loading.
//!
//! A profile is a versioned JSON document declaring capability values to
//! overlay onto a device's real answers. Loading is staged: the document is
//! read, checked against the schema-version allowlist, validated against the
//! embedded JSON Schema, and applied to a copy of the store that is committed
//! only when every section lands cleanly. A failed document therefore leaves
//! the store exactly as it was. Loading is idempotent across documents;
//! later documents overlay earlier ones, last write wins per scalar field.

use crate::chain::{BLOCK_SPECS, SectionKind};
use crate::diag::{ProfileError, Warning};
use crate::format::{FormatCaps, FormatId, parse_format_features};
use crate::records::{PresentMode, SurfaceFormatRecord};
use crate::store::{CombinePolicies, DeviceBaseline, DeviceCaps};
use anyhow::{Context, Result};
use jsonschema::JSONSchema;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Schema identifiers this build understands.
///
/// Documents declaring anything else fail with `UnsupportedSchema`; the
/// device then runs with whatever was loaded before.
pub const SUPPORTED_SCHEMAS: &[&str] = &["capsim_profile_v1", "capsim_profile_v1_1"];

const PROFILE_SCHEMA_SRC: &str = include_str!("../schema/profile.schema.json");

fn compiled_schema() -> &'static JSONSchema {
    static RAW: OnceLock<Value> = OnceLock::new();
    static COMPILED: OnceLock<JSONSchema> = OnceLock::new();
    COMPILED.get_or_init(|| {
        let raw = RAW.get_or_init(|| {
            serde_json::from_str(PROFILE_SCHEMA_SRC).expect("embedded profile schema parses")
        });
        JSONSchema::compile(raw).expect("embedded profile schema compiles")
    })
}

/// Deserialized profile document.
#[derive(Clone, Debug, Deserialize)]
pub struct ProfileDocument {
    pub schema_version: String,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub capabilities: CapabilitySet,
}

/// The document's capability set: one named section per area.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CapabilitySet {
    /// Extension name → spec version.
    #[serde(default)]
    pub extensions: Option<BTreeMap<String, u32>>,
    /// Named feature blocks, dispatched through the block registry.
    #[serde(default)]
    pub features: BTreeMap<String, Map<String, Value>>,
    /// Named property blocks, dispatched through the block registry.
    #[serde(default)]
    pub properties: BTreeMap<String, Map<String, Value>>,
    /// Per-format feature triples, keyed by format name.
    #[serde(default)]
    pub formats: BTreeMap<FormatId, FormatEntry>,
    #[serde(default)]
    pub surface_formats: Option<Vec<SurfaceFormatRecord>>,
    #[serde(default)]
    pub present_modes: Option<Vec<PresentMode>>,
}

/// Declared feature masks for one format, as name arrays.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct FormatEntry {
    #[serde(default)]
    pub linear_tiling_features: Vec<String>,
    #[serde(default)]
    pub optimal_tiling_features: Vec<String>,
    #[serde(default)]
    pub buffer_features: Vec<String>,
}

impl FormatEntry {
    fn to_caps(&self, format: &FormatId) -> Result<FormatCaps> {
        Ok(FormatCaps {
            linear_tiling: parse_format_features(&self.linear_tiling_features)
                .with_context(|| format!("format '{format}'"))?,
            optimal_tiling: parse_format_features(&self.optimal_tiling_features)
                .with_context(|| format!("format '{format}'"))?,
            buffer: parse_format_features(&self.buffer_features)
                .with_context(|| format!("format '{format}'"))?,
        })
    }
}

/// Load one profile document into a device's capability store.
pub fn load_profile(store: &mut DeviceCaps, path: &Path) -> Result<Vec<Warning>, ProfileError> {
    let doc = parse_document(path)?;
    let mut staged = store.clone();
    let mut warnings = Vec::new();
    apply(&mut staged, &doc, &mut warnings).map_err(|err| ProfileError::DocumentMalformed {
        path: path.to_path_buf(),
        detail: format!("{err:#}"),
    })?;
    *store = staged;
    Ok(warnings)
}

/// Structurally validate a document without a device.
///
/// Runs the same read/allowlist/schema/coercion pipeline as `load_profile`
/// against a scratch store with every capability active, so findings that
/// depend on a real baseline (bounds, inactive blocks) do not apply. Used by
/// the `profile-check` helper.
pub fn validate_document(path: &Path) -> Result<ProfileDocument, ProfileError> {
    let doc = parse_document(path)?;
    let baseline = DeviceBaseline {
        active: BLOCK_SPECS
            .iter()
            .map(|spec| spec.capability.to_string())
            .collect(),
        ..Default::default()
    };
    let mut scratch = DeviceCaps::new(baseline, CombinePolicies::default(), true);
    let mut warnings = Vec::new();
    apply(&mut scratch, &doc, &mut warnings).map_err(|err| ProfileError::DocumentMalformed {
        path: path.to_path_buf(),
        detail: format!("{err:#}"),
    })?;
    Ok(doc)
}

fn parse_document(path: &Path) -> Result<ProfileDocument, ProfileError> {
    let raw = fs::read_to_string(path).map_err(|source| ProfileError::DocumentUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value =
        serde_json::from_str(&raw).map_err(|err| ProfileError::DocumentMalformed {
            path: path.to_path_buf(),
            detail: err.to_string(),
        })?;

    let schema_version = value
        .get("schema_version")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if !SUPPORTED_SCHEMAS.contains(&schema_version.as_str()) {
        return Err(ProfileError::UnsupportedSchema {
            path: path.to_path_buf(),
            schema_version,
        });
    }

    if let Err(errors) = compiled_schema().validate(&value) {
        let details = errors
            .map(|err| err.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        return Err(ProfileError::DocumentMalformed {
            path: path.to_path_buf(),
            detail: details,
        });
    }

    serde_json::from_value(value).map_err(|err| ProfileError::DocumentMalformed {
        path: path.to_path_buf(),
        detail: err.to_string(),
    })
}

fn apply(store: &mut DeviceCaps, doc: &ProfileDocument, warnings: &mut Vec<Warning>) -> Result<()> {
    let set = &doc.capabilities;
    if let Some(extensions) = &set.extensions {
        store.apply_extension_map(extensions);
    }
    for (section, fields) in &set.features {
        store.apply_block_section(SectionKind::Features, section, fields, warnings)?;
    }
    for (section, fields) in &set.properties {
        store.apply_block_section(SectionKind::Properties, section, fields, warnings)?;
    }
    for (format, entry) in &set.formats {
        let caps = entry.to_caps(format)?;
        store.apply_format_entry(format.clone(), caps);
    }
    if let Some(surface_formats) = &set.surface_formats {
        store.set_declared_surface_formats(surface_formats.clone());
    }
    if let Some(present_modes) = &set.present_modes {
        store.set_declared_present_modes(present_modes.clone());
    }
    Ok(())
}
