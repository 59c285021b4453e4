//! Diagnostics shared across the loader, merger, and store.
//!
//! Non-fatal findings are values: callers receive them in a `Vec<Warning>`
//! and decide what to surface. Recording mirrors each warning to the `log`
//! facade so embedding layers get them without plumbing. Hard profile-load
//! failures use `ProfileError` so callers can match on the failure kind.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Non-fatal findings emitted while loading a profile or merging values.
///
/// Every variant is advisory: the value in question is still applied (or, for
/// `CapabilityInactive`, still stored). Correctness of an override is the
/// profile author's responsibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A declared override targets a block whose governing capability is not
    /// active; the value is stored but will not be surfaced at query time.
    CapabilityInactive { section: String, capability: String },
    /// A declared value violates a directional sanity bound against the real
    /// baseline; the value is applied anyway.
    BaselineExceeded {
        section: String,
        field: &'static str,
        declared: String,
        baseline: String,
    },
    /// A merged format mask asserts a bit the real hardware lacks; the caller
    /// may be simulating an unsupported feature.
    UnsupportedFeatureBit {
        format: String,
        field: &'static str,
        bits: u64,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::CapabilityInactive { section, capability } => write!(
                f,
                "section '{section}': capability '{capability}' is not active; declared values will not be surfaced"
            ),
            Warning::BaselineExceeded {
                section,
                field,
                declared,
                baseline,
            } => write!(
                f,
                "{section}.{field}: declared value {declared} violates the device baseline {baseline}"
            ),
            Warning::UnsupportedFeatureBit { format, field, bits } => write!(
                f,
                "format '{format}': {field} asserts bits {bits:#x} the device lacks; may be simulating an unsupported feature"
            ),
        }
    }
}

/// Record a warning: mirror it to the log facade and keep it for the caller.
pub(crate) fn note(warnings: &mut Vec<Warning>, warning: Warning) {
    log::warn!("{warning}");
    warnings.push(warning);
}

/// Hard failures while loading a profile document.
///
/// Each variant covers one stage of the load: reading the file, parsing or
/// validating its content, and matching its declared schema identifier
/// against the supported allowlist. A failed document contributes no
/// overrides; escalation to a fatal error is the caller's decision.
#[derive(Debug)]
pub enum ProfileError {
    DocumentUnreadable { path: PathBuf, source: io::Error },
    DocumentMalformed { path: PathBuf, detail: String },
    UnsupportedSchema { path: PathBuf, schema_version: String },
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileError::DocumentUnreadable { path, source } => {
                write!(f, "unable to read profile {}: {source}", path.display())
            }
            ProfileError::DocumentMalformed { path, detail } => {
                write!(f, "profile {} is malformed: {detail}", path.display())
            }
            ProfileError::UnsupportedSchema { path, schema_version } => write!(
                f,
                "profile {} declares unsupported schema '{schema_version}'",
                path.display()
            ),
        }
    }
}

impl std::error::Error for ProfileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProfileError::DocumentUnreadable { source, .. } => Some(source),
            _ => None,
        }
    }
}
