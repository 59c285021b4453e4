//! Identity-keyed capability records the policy engine combines.
//!
//! These are the collection-valued capability areas: the extension list, the
//! surface-format list, and the presentation-mode list. Known enum variants
//! keep serialization consistent; `Other` preserves forward compatibility
//! with drivers and profiles that introduce new names.

use crate::format::FormatId;
use crate::policy::Keyed;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One entry of the device extension list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionRecord {
    pub name: String,
    pub spec_version: u32,
}

impl Keyed for ExtensionRecord {
    type Key = String;

    fn key(&self) -> String {
        self.name.clone()
    }
}

/// Presentation mode reported by the surface query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PresentMode {
    Immediate,
    Mailbox,
    Fifo,
    FifoRelaxed,
    Other(String),
}

impl PresentMode {
    pub fn as_str(&self) -> &str {
        match self {
            PresentMode::Immediate => "immediate",
            PresentMode::Mailbox => "mailbox",
            PresentMode::Fifo => "fifo",
            PresentMode::FifoRelaxed => "fifo_relaxed",
            PresentMode::Other(value) => value.as_str(),
        }
    }

    fn from_str(value: &str) -> Self {
        match value {
            "immediate" => PresentMode::Immediate,
            "mailbox" => PresentMode::Mailbox,
            "fifo" => PresentMode::Fifo,
            "fifo_relaxed" => PresentMode::FifoRelaxed,
            other => PresentMode::Other(other.to_string()),
        }
    }
}

impl Serialize for PresentMode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PresentMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Self::from_str(&value))
    }
}

impl Keyed for PresentMode {
    type Key = String;

    fn key(&self) -> String {
        self.as_str().to_string()
    }
}

/// Color space attached to a surface format.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColorSpace {
    SrgbNonlinear,
    ExtendedSrgbLinear,
    Hdr10St2084,
    Other(String),
}

impl ColorSpace {
    pub fn as_str(&self) -> &str {
        match self {
            ColorSpace::SrgbNonlinear => "srgb_nonlinear",
            ColorSpace::ExtendedSrgbLinear => "extended_srgb_linear",
            ColorSpace::Hdr10St2084 => "hdr10_st2084",
            ColorSpace::Other(value) => value.as_str(),
        }
    }

    fn from_str(value: &str) -> Self {
        match value {
            "srgb_nonlinear" => ColorSpace::SrgbNonlinear,
            "extended_srgb_linear" => ColorSpace::ExtendedSrgbLinear,
            "hdr10_st2084" => ColorSpace::Hdr10St2084,
            other => ColorSpace::Other(other.to_string()),
        }
    }
}

impl Serialize for ColorSpace {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ColorSpace {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Self::from_str(&value))
    }
}

/// One entry of the surface-format list.
///
/// Identity is the (format, color space) pair; two entries with the same
/// format but different color spaces are distinct records.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceFormatRecord {
    pub format: FormatId,
    pub color_space: ColorSpace,
}

impl Keyed for SurfaceFormatRecord {
    type Key = (String, String);

    fn key(&self) -> (String, String) {
        (self.format.0.clone(), self.color_space.as_str().to_string())
    }
}
