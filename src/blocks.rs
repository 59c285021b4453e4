//! Typed capability blocks and the declarative field tables that drive
//! profile writes into them.
//!
//! Each block is a fixed-shape struct of feature flags, limits, or masks for
//! one capability area. The per-block `FIELDS` table is the single source of
//! truth for profile-facing field names, value coercion, and directional
//! sanity bounds; the loader walks the table instead of hand-writing one
//! assignment per field.

use crate::diag::{Warning, note};
use anyhow::{Result, bail};
use serde_json::{Map, Value};
use std::fmt;

bitflags::bitflags! {
    /// Framebuffer sample-count support mask.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct SampleCounts: u64 {
        const COUNT_1 = 1 << 0;
        const COUNT_2 = 1 << 1;
        const COUNT_4 = 1 << 2;
        const COUNT_8 = 1 << 3;
        const COUNT_16 = 1 << 4;
        const COUNT_32 = 1 << 5;
        const COUNT_64 = 1 << 6;
    }
}

bitflags::bitflags! {
    /// Depth/stencil resolve mode support mask.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct ResolveModes: u64 {
        const SAMPLE_ZERO = 1 << 0;
        const AVERAGE = 1 << 1;
        const MIN = 1 << 2;
        const MAX = 1 << 3;
    }
}

const SAMPLE_COUNT_BITS: &[(&str, u64)] = &[
    ("1", SampleCounts::COUNT_1.bits()),
    ("2", SampleCounts::COUNT_2.bits()),
    ("4", SampleCounts::COUNT_4.bits()),
    ("8", SampleCounts::COUNT_8.bits()),
    ("16", SampleCounts::COUNT_16.bits()),
    ("32", SampleCounts::COUNT_32.bits()),
    ("64", SampleCounts::COUNT_64.bits()),
];

const RESOLVE_MODE_BITS: &[(&str, u64)] = &[
    ("sample_zero", ResolveModes::SAMPLE_ZERO.bits()),
    ("average", ResolveModes::AVERAGE.bits()),
    ("min", ResolveModes::MIN.bits()),
    ("max", ResolveModes::MAX.bits()),
];

/// Coerced scalar value flowing between a profile document and a block field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldValue {
    Flag(bool),
    Uint(u64),
    Float(f64),
    Mask(u64),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Flag(v) => write!(f, "{v}"),
            FieldValue::Uint(v) => write!(f, "{v}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Mask(v) => write!(f, "{v:#x}"),
        }
    }
}

/// How a profile JSON value is coerced before reaching the setter.
#[derive(Clone, Copy, Debug)]
pub enum FieldKind {
    /// JSON bool, or a bare 0/1 integer.
    Flag,
    /// Unsigned integer that must fit in 32 bits.
    Uint32,
    /// Unsigned integer up to 64 bits.
    Uint64,
    /// Finite number.
    Float,
    /// Array of names OR'd through the given name→bit table.
    Mask(&'static [(&'static str, u64)]),
}

/// Directional sanity bound checked against the real baseline.
///
/// Violations warn and never block the write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    Unchecked,
    /// Declared must not exceed the baseline (maxima, supported-feature flags).
    AtMostBaseline,
    /// Declared must not fall below the baseline (minimum alignments).
    AtLeastBaseline,
}

/// One profile-addressable field of a capability block.
pub struct FieldSpec<T> {
    pub name: &'static str,
    pub kind: FieldKind,
    pub bound: Bound,
    pub get: fn(&T) -> FieldValue,
    pub set: fn(&mut T, FieldValue),
}

/// A block whose fields are addressable from profile documents.
pub trait CapabilityBlock: Clone + 'static {
    const FIELDS: &'static [FieldSpec<Self>];
}

/// Coerce one JSON value according to the field's kind.
fn coerce(kind: FieldKind, value: &Value, field: &str) -> Result<FieldValue> {
    match kind {
        FieldKind::Flag => match value {
            Value::Bool(b) => Ok(FieldValue::Flag(*b)),
            Value::Number(n) => match n.as_u64() {
                Some(0) => Ok(FieldValue::Flag(false)),
                Some(1) => Ok(FieldValue::Flag(true)),
                _ => bail!("{field}: expected a boolean or 0/1"),
            },
            _ => bail!("{field}: expected a boolean or 0/1"),
        },
        FieldKind::Uint32 => {
            let Some(raw) = value.as_u64() else {
                bail!("{field}: expected a non-negative integer");
            };
            if raw > u64::from(u32::MAX) {
                bail!("{field}: {raw} does not fit in 32 bits");
            }
            Ok(FieldValue::Uint(raw))
        }
        FieldKind::Uint64 => match value.as_u64() {
            Some(raw) => Ok(FieldValue::Uint(raw)),
            None => bail!("{field}: expected a non-negative integer"),
        },
        FieldKind::Float => match value.as_f64() {
            Some(raw) if raw.is_finite() => Ok(FieldValue::Float(raw)),
            _ => bail!("{field}: expected a finite number"),
        },
        FieldKind::Mask(table) => {
            let Some(names) = value.as_array() else {
                bail!("{field}: expected an array of names");
            };
            let mut mask = 0u64;
            for entry in names {
                let Some(name) = entry.as_str() else {
                    bail!("{field}: mask entries must be strings");
                };
                match table.iter().find(|(n, _)| *n == name) {
                    Some((_, bits)) => mask |= bits,
                    None => bail!("{field}: unknown mask name '{name}'"),
                }
            }
            Ok(FieldValue::Mask(mask))
        }
    }
}

/// Whether a declared value violates the field's directional bound.
fn violates(bound: Bound, declared: &FieldValue, baseline: &FieldValue) -> bool {
    let ordering = match (declared, baseline) {
        (FieldValue::Flag(d), FieldValue::Flag(b)) => d.partial_cmp(b),
        (FieldValue::Uint(d), FieldValue::Uint(b)) => d.partial_cmp(b),
        (FieldValue::Float(d), FieldValue::Float(b)) => d.partial_cmp(b),
        (FieldValue::Mask(d), FieldValue::Mask(b)) => {
            // Masks order by inclusion: "exceeds" means asserting bits the
            // baseline lacks, "falls below" means dropping baseline bits.
            return match bound {
                Bound::Unchecked => false,
                Bound::AtMostBaseline => d & !b != 0,
                Bound::AtLeastBaseline => b & !d != 0,
            };
        }
        _ => None,
    };
    match (bound, ordering) {
        (Bound::Unchecked, _) | (_, None) => false,
        (Bound::AtMostBaseline, Some(ord)) => ord == std::cmp::Ordering::Greater,
        (Bound::AtLeastBaseline, Some(ord)) => ord == std::cmp::Ordering::Less,
    }
}

/// Apply a profile section's fields to a block, checking bounds against the
/// real baseline.
///
/// Unknown field names fail the document; bound violations warn (once per
/// field) and write anyway.
pub(crate) fn apply_block_fields<T: CapabilityBlock>(
    block: &mut T,
    baseline: &T,
    section: &str,
    fields: &Map<String, Value>,
    warnings: &mut Vec<Warning>,
) -> Result<()> {
    for (name, raw) in fields {
        let Some(spec) = T::FIELDS.iter().find(|spec| spec.name == name.as_str()) else {
            bail!("{section}: unknown field '{name}'");
        };
        let declared = coerce(spec.kind, raw, spec.name)?;
        let real = (spec.get)(baseline);
        if violates(spec.bound, &declared, &real) {
            note(
                warnings,
                Warning::BaselineExceeded {
                    section: section.to_string(),
                    field: spec.name,
                    declared: declared.to_string(),
                    baseline: real.to_string(),
                },
            );
        }
        (spec.set)(block, declared);
    }
    Ok(())
}

macro_rules! flag_field {
    ($name:literal, $field:ident) => {
        FieldSpec {
            name: $name,
            kind: FieldKind::Flag,
            bound: Bound::AtMostBaseline,
            get: |b| FieldValue::Flag(b.$field),
            set: |b, v| {
                if let FieldValue::Flag(flag) = v {
                    b.$field = flag;
                }
            },
        }
    };
}

macro_rules! uint_field {
    ($name:literal, $field:ident, u32, $bound:expr) => {
        FieldSpec {
            name: $name,
            kind: FieldKind::Uint32,
            bound: $bound,
            get: |b| FieldValue::Uint(u64::from(b.$field)),
            set: |b, v| {
                if let FieldValue::Uint(raw) = v {
                    b.$field = raw as u32;
                }
            },
        }
    };
    ($name:literal, $field:ident, u64, $bound:expr) => {
        FieldSpec {
            name: $name,
            kind: FieldKind::Uint64,
            bound: $bound,
            get: |b| FieldValue::Uint(b.$field),
            set: |b, v| {
                if let FieldValue::Uint(raw) = v {
                    b.$field = raw;
                }
            },
        }
    };
}

/// Core feature toggles every device reports.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PhysicalFeatures {
    pub robust_buffer_access: bool,
    pub full_draw_index_uint32: bool,
    pub image_cube_array: bool,
    pub independent_blend: bool,
    pub geometry_shader: bool,
    pub tessellation_shader: bool,
    pub dual_src_blend: bool,
    pub multi_viewport: bool,
    pub sampler_anisotropy: bool,
    pub fragment_stores_and_atomics: bool,
    pub shader_float64: bool,
    pub shader_int64: bool,
}

impl CapabilityBlock for PhysicalFeatures {
    const FIELDS: &'static [FieldSpec<Self>] = &[
        flag_field!("robust_buffer_access", robust_buffer_access),
        flag_field!("full_draw_index_uint32", full_draw_index_uint32),
        flag_field!("image_cube_array", image_cube_array),
        flag_field!("independent_blend", independent_blend),
        flag_field!("geometry_shader", geometry_shader),
        flag_field!("tessellation_shader", tessellation_shader),
        flag_field!("dual_src_blend", dual_src_blend),
        flag_field!("multi_viewport", multi_viewport),
        flag_field!("sampler_anisotropy", sampler_anisotropy),
        flag_field!("fragment_stores_and_atomics", fragment_stores_and_atomics),
        flag_field!("shader_float64", shader_float64),
        flag_field!("shader_int64", shader_int64),
    ];
}

/// Core device limits.
///
/// `max_*` fields bound from above, `min_*` alignments from below; sample
/// count masks bound by inclusion.
#[derive(Clone, Debug, PartialEq)]
pub struct PhysicalLimits {
    pub max_image_dimension_1d: u32,
    pub max_image_dimension_2d: u32,
    pub max_image_dimension_3d: u32,
    pub max_image_array_layers: u32,
    pub max_uniform_buffer_range: u32,
    pub max_push_constants_size: u32,
    pub max_memory_allocation_count: u32,
    pub max_bound_descriptor_sets: u32,
    pub max_viewports: u32,
    pub max_compute_work_group_invocations: u32,
    pub max_sampler_anisotropy: f64,
    pub min_uniform_buffer_offset_alignment: u64,
    pub min_storage_buffer_offset_alignment: u64,
    pub framebuffer_color_sample_counts: SampleCounts,
    pub framebuffer_depth_sample_counts: SampleCounts,
}

impl Default for PhysicalLimits {
    fn default() -> Self {
        Self {
            max_image_dimension_1d: 0,
            max_image_dimension_2d: 0,
            max_image_dimension_3d: 0,
            max_image_array_layers: 0,
            max_uniform_buffer_range: 0,
            max_push_constants_size: 0,
            max_memory_allocation_count: 0,
            max_bound_descriptor_sets: 0,
            max_viewports: 0,
            max_compute_work_group_invocations: 0,
            max_sampler_anisotropy: 1.0,
            min_uniform_buffer_offset_alignment: 1,
            min_storage_buffer_offset_alignment: 1,
            framebuffer_color_sample_counts: SampleCounts::empty(),
            framebuffer_depth_sample_counts: SampleCounts::empty(),
        }
    }
}

impl CapabilityBlock for PhysicalLimits {
    const FIELDS: &'static [FieldSpec<Self>] = &[
        uint_field!("max_image_dimension_1d", max_image_dimension_1d, u32, Bound::AtMostBaseline),
        uint_field!("max_image_dimension_2d", max_image_dimension_2d, u32, Bound::AtMostBaseline),
        uint_field!("max_image_dimension_3d", max_image_dimension_3d, u32, Bound::AtMostBaseline),
        uint_field!("max_image_array_layers", max_image_array_layers, u32, Bound::AtMostBaseline),
        uint_field!("max_uniform_buffer_range", max_uniform_buffer_range, u32, Bound::AtMostBaseline),
        uint_field!("max_push_constants_size", max_push_constants_size, u32, Bound::AtMostBaseline),
        uint_field!(
            "max_memory_allocation_count",
            max_memory_allocation_count,
            u32,
            Bound::AtMostBaseline
        ),
        uint_field!(
            "max_bound_descriptor_sets",
            max_bound_descriptor_sets,
            u32,
            Bound::AtMostBaseline
        ),
        uint_field!("max_viewports", max_viewports, u32, Bound::AtMostBaseline),
        uint_field!(
            "max_compute_work_group_invocations",
            max_compute_work_group_invocations,
            u32,
            Bound::AtMostBaseline
        ),
        FieldSpec {
            name: "max_sampler_anisotropy",
            kind: FieldKind::Float,
            bound: Bound::AtMostBaseline,
            get: |b| FieldValue::Float(b.max_sampler_anisotropy),
            set: |b, v| {
                if let FieldValue::Float(raw) = v {
                    b.max_sampler_anisotropy = raw;
                }
            },
        },
        uint_field!(
            "min_uniform_buffer_offset_alignment",
            min_uniform_buffer_offset_alignment,
            u64,
            Bound::AtLeastBaseline
        ),
        uint_field!(
            "min_storage_buffer_offset_alignment",
            min_storage_buffer_offset_alignment,
            u64,
            Bound::AtLeastBaseline
        ),
        FieldSpec {
            name: "framebuffer_color_sample_counts",
            kind: FieldKind::Mask(SAMPLE_COUNT_BITS),
            bound: Bound::AtMostBaseline,
            get: |b| FieldValue::Mask(b.framebuffer_color_sample_counts.bits()),
            set: |b, v| {
                if let FieldValue::Mask(raw) = v {
                    b.framebuffer_color_sample_counts = SampleCounts::from_bits_truncate(raw);
                }
            },
        },
        FieldSpec {
            name: "framebuffer_depth_sample_counts",
            kind: FieldKind::Mask(SAMPLE_COUNT_BITS),
            bound: Bound::AtMostBaseline,
            get: |b| FieldValue::Mask(b.framebuffer_depth_sample_counts.bits()),
            set: |b, v| {
                if let FieldValue::Mask(raw) = v {
                    b.framebuffer_depth_sample_counts = SampleCounts::from_bits_truncate(raw);
                }
            },
        },
    ];
}

/// Descriptor indexing feature block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DescriptorIndexingFeatures {
    pub shader_sampled_image_array_non_uniform_indexing: bool,
    pub shader_storage_buffer_array_non_uniform_indexing: bool,
    pub descriptor_binding_sampled_image_update_after_bind: bool,
    pub descriptor_binding_partially_bound: bool,
    pub descriptor_binding_variable_descriptor_count: bool,
    pub runtime_descriptor_array: bool,
}

impl CapabilityBlock for DescriptorIndexingFeatures {
    const FIELDS: &'static [FieldSpec<Self>] = &[
        flag_field!(
            "shader_sampled_image_array_non_uniform_indexing",
            shader_sampled_image_array_non_uniform_indexing
        ),
        flag_field!(
            "shader_storage_buffer_array_non_uniform_indexing",
            shader_storage_buffer_array_non_uniform_indexing
        ),
        flag_field!(
            "descriptor_binding_sampled_image_update_after_bind",
            descriptor_binding_sampled_image_update_after_bind
        ),
        flag_field!("descriptor_binding_partially_bound", descriptor_binding_partially_bound),
        flag_field!(
            "descriptor_binding_variable_descriptor_count",
            descriptor_binding_variable_descriptor_count
        ),
        flag_field!("runtime_descriptor_array", runtime_descriptor_array),
    ];
}

/// 16-bit float / 8-bit int shader arithmetic feature block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShaderFloat16Int8Features {
    pub shader_float16: bool,
    pub shader_int8: bool,
}

impl CapabilityBlock for ShaderFloat16Int8Features {
    const FIELDS: &'static [FieldSpec<Self>] = &[
        flag_field!("shader_float16", shader_float16),
        flag_field!("shader_int8", shader_int8),
    ];
}

/// Depth/stencil resolve property block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DepthStencilResolveProperties {
    pub supported_depth_resolve_modes: ResolveModes,
    pub supported_stencil_resolve_modes: ResolveModes,
    pub independent_resolve_none: bool,
    pub independent_resolve: bool,
}

impl CapabilityBlock for DepthStencilResolveProperties {
    const FIELDS: &'static [FieldSpec<Self>] = &[
        FieldSpec {
            name: "supported_depth_resolve_modes",
            kind: FieldKind::Mask(RESOLVE_MODE_BITS),
            bound: Bound::AtMostBaseline,
            get: |b| FieldValue::Mask(b.supported_depth_resolve_modes.bits()),
            set: |b, v| {
                if let FieldValue::Mask(raw) = v {
                    b.supported_depth_resolve_modes = ResolveModes::from_bits_truncate(raw);
                }
            },
        },
        FieldSpec {
            name: "supported_stencil_resolve_modes",
            kind: FieldKind::Mask(RESOLVE_MODE_BITS),
            bound: Bound::AtMostBaseline,
            get: |b| FieldValue::Mask(b.supported_stencil_resolve_modes.bits()),
            set: |b, v| {
                if let FieldValue::Mask(raw) = v {
                    b.supported_stencil_resolve_modes = ResolveModes::from_bits_truncate(raw);
                }
            },
        },
        flag_field!("independent_resolve_none", independent_resolve_none),
        flag_field!("independent_resolve", independent_resolve),
    ];
}

/// Maintenance3 property block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Maintenance3Properties {
    pub max_per_set_descriptors: u32,
    pub max_memory_allocation_size: u64,
}

impl CapabilityBlock for Maintenance3Properties {
    const FIELDS: &'static [FieldSpec<Self>] = &[
        uint_field!("max_per_set_descriptors", max_per_set_descriptors, u32, Bound::AtMostBaseline),
        uint_field!(
            "max_memory_allocation_size",
            max_memory_allocation_size,
            u64,
            Bound::AtMostBaseline
        ),
    ];
}

/// Portability compatibility feature block.
///
/// Legacy surface: only patched into query chains when its capability is
/// active or portability emulation is requested in the configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PortabilityFeatures {
    pub constant_alpha_color_blend_factors: bool,
    pub events: bool,
    pub image_view_format_swizzle: bool,
    pub point_polygons: bool,
    pub separate_stencil_mask_ref: bool,
    pub triangle_fans: bool,
}

impl CapabilityBlock for PortabilityFeatures {
    const FIELDS: &'static [FieldSpec<Self>] = &[
        flag_field!(
            "constant_alpha_color_blend_factors",
            constant_alpha_color_blend_factors
        ),
        flag_field!("events", events),
        flag_field!("image_view_format_swizzle", image_view_format_swizzle),
        flag_field!("point_polygons", point_polygons),
        flag_field!("separate_stencil_mask_ref", separate_stencil_mask_ref),
        flag_field!("triangle_fans", triangle_fans),
    ];
}
