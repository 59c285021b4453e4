use capsim::{
    ColorSpace, DeviceBaseline, ExtensionRecord, FormatCaps, FormatFeatures, FormatId,
    Maintenance3Properties, PhysicalFeatures, PhysicalLimits, PresentMode, SurfaceFormatRecord,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Write;
use tempfile::NamedTempFile;

pub fn write_profile(value: &Value) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("failed to allocate profile file");
    file.write_all(value.to_string().as_bytes())
        .expect("failed to write profile file");
    file
}

/// A plausible mid-range device baseline shared by the suite.
pub fn sample_baseline() -> DeviceBaseline {
    let mut formats = BTreeMap::new();
    formats.insert(
        FormatId("r8g8b8a8_unorm".to_string()),
        FormatCaps {
            linear_tiling: FormatFeatures::SAMPLED_IMAGE | FormatFeatures::TRANSFER_SRC,
            optimal_tiling: FormatFeatures::SAMPLED_IMAGE
                | FormatFeatures::COLOR_ATTACHMENT
                | FormatFeatures::COLOR_ATTACHMENT_BLEND,
            buffer: FormatFeatures::VERTEX_BUFFER,
        },
    );
    formats.insert(
        FormatId("d32_sfloat".to_string()),
        FormatCaps {
            linear_tiling: FormatFeatures::empty(),
            optimal_tiling: FormatFeatures::DEPTH_STENCIL_ATTACHMENT,
            buffer: FormatFeatures::empty(),
        },
    );

    DeviceBaseline {
        features: PhysicalFeatures {
            robust_buffer_access: true,
            sampler_anisotropy: true,
            ..Default::default()
        },
        limits: PhysicalLimits {
            max_image_dimension_2d: 16384,
            max_viewports: 16,
            max_push_constants_size: 256,
            min_uniform_buffer_offset_alignment: 256,
            ..Default::default()
        },
        maintenance3: Maintenance3Properties {
            max_per_set_descriptors: 1024,
            max_memory_allocation_size: 1 << 31,
        },
        extensions: vec![
            ExtensionRecord {
                name: "ext_maintenance3".to_string(),
                spec_version: 1,
            },
            ExtensionRecord {
                name: "ext_descriptor_indexing".to_string(),
                spec_version: 2,
            },
        ],
        formats,
        surface_formats: vec![SurfaceFormatRecord {
            format: FormatId("b8g8r8a8_unorm".to_string()),
            color_space: ColorSpace::SrgbNonlinear,
        }],
        present_modes: vec![PresentMode::Fifo, PresentMode::Immediate],
        active: ["ext_maintenance3", "ext_descriptor_indexing"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        ..Default::default()
    }
}
