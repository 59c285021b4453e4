//! Capability override engine for a device-simulation layer.
//!
//! The crate lets applications test against device capability sets they do
//! not physically possess: a declarative profile document declares the
//! desired capability values, and the engine merges them with the answers
//! queried from the real device under explicit combination policies. Only
//! the *descriptive* capability surface is simulated; the device's actual
//! behavior is untouched.
//!
//! The interception layer that routes driver calls here is an external
//! collaborator. Its contract is small: capture a [`DeviceBaseline`] at
//! discovery, register it with the [`SimulationContext`], and route every
//! capability query through the per-device [`DeviceCaps`] store before
//! answering the application.

pub mod blocks;
pub mod chain;
pub mod config;
pub mod context;
pub mod diag;
pub mod format;
pub mod policy;
pub mod profile;
pub mod records;
pub mod store;

pub use blocks::{
    Bound, CapabilityBlock, DepthStencilResolveProperties, DescriptorIndexingFeatures, FieldKind,
    FieldSpec, FieldValue, Maintenance3Properties, PhysicalFeatures, PhysicalLimits,
    PortabilityFeatures, ResolveModes, SampleCounts, ShaderFloat16Int8Features,
};
pub use chain::{BLOCK_SPECS, BlockPayload, BlockSpec, BlockTag, ChainNode, SectionKind};
pub use config::{SimulationConfig, split_list};
pub use context::{DeviceHandle, SimulationContext};
pub use diag::{ProfileError, Warning};
pub use format::{FormatCaps, FormatFeatures, FormatId, merge_format_caps, parse_format_features};
pub use policy::{CombinePolicy, Keyed, combine};
pub use profile::{
    CapabilitySet, FormatEntry, ProfileDocument, SUPPORTED_SCHEMAS, load_profile,
    validate_document,
};
pub use records::{ColorSpace, ExtensionRecord, PresentMode, SurfaceFormatRecord};
pub use store::{CombinePolicies, DeviceBaseline, DeviceCaps};
