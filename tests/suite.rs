// Centralized integration suite for the override engine; exercises profile
// loading, policy combination, format merging, and chain patching through the
// public context API so changes surface in one place.
mod support;

use anyhow::Result;
use capsim::{
    BlockPayload, ChainNode, CombinePolicies, CombinePolicy, DeviceHandle, FormatCaps,
    FormatFeatures, FormatId, PresentMode, SimulationConfig, SimulationContext, Warning,
};
use serde_json::json;
use support::{sample_baseline, write_profile};

fn simulated_context(profile: &tempfile::NamedTempFile) -> SimulationContext {
    SimulationContext::new(SimulationConfig {
        profile_paths: vec![profile.path().to_path_buf()],
        policies: CombinePolicies {
            extensions: CombinePolicy::Intersect,
            formats: CombinePolicy::Intersect,
            format_features: CombinePolicy::Intersect,
            surface_formats: CombinePolicy::Replace,
            present_modes: CombinePolicy::Intersect,
        },
        emulate_portability: false,
        fail_on_error: false,
    })
}

#[test]
fn discovery_load_and_query_round_trip() -> Result<()> {
    let profile = write_profile(&json!({
        "schema_version": "capsim_profile_v1",
        "comment": "mid-range card pretending to be a flagship",
        "capabilities": {
            "extensions": {"ext_shader_float16_int8": 1},
            "features": {
                "core": {"geometry_shader": true},
                "descriptor_indexing": {"runtime_descriptor_array": true}
            },
            "properties": {
                "limits": {"max_viewports": 8},
                "maintenance3": {"max_per_set_descriptors": 2048}
            },
            "formats": {
                "r8g8b8a8_unorm": {"optimal_tiling_features": ["storage_image"]}
            },
            "surface_formats": [
                {"format": "r16g16b16a16_sfloat", "color_space": "extended_srgb_linear"}
            ],
            "present_modes": ["mailbox"]
        }
    }));
    let context = simulated_context(&profile);
    let handle = DeviceHandle(1);

    let warnings = context.register_device(handle, sample_baseline())?;
    // geometry_shader and runtime_descriptor_array exceed the baseline, and
    // max_per_set_descriptors 2048 exceeds 1024.
    let exceeded = warnings
        .iter()
        .filter(|w| matches!(w, Warning::BaselineExceeded { .. }))
        .count();
    assert_eq!(exceeded, 3);

    context
        .with_device(handle, |caps| {
            assert!(caps.features().geometry_shader);
            assert!(caps.features().robust_buffer_access, "baseline survives");
            assert_eq!(caps.limits().max_viewports, 8);
            assert_eq!(caps.limits().max_image_dimension_2d, 16384);
            assert_eq!(caps.maintenance3().max_per_set_descriptors, 2048);

            let names: Vec<String> = caps
                .effective_extensions()
                .iter()
                .map(|e| e.name.clone())
                .collect();
            assert_eq!(
                names,
                vec![
                    "ext_maintenance3",
                    "ext_descriptor_indexing",
                    "ext_shader_float16_int8"
                ],
                "union appends the declared extension after the baseline"
            );

            let surface: Vec<String> = caps
                .effective_surface_formats()
                .iter()
                .map(|s| s.format.0.clone())
                .collect();
            assert_eq!(surface, vec!["r16g16b16a16_sfloat"], "replace discards the baseline");

            let modes = caps.effective_present_modes();
            assert_eq!(
                modes,
                vec![PresentMode::Fifo, PresentMode::Immediate, PresentMode::Mailbox]
            );
        })
        .expect("device registered");
    Ok(())
}

#[test]
fn format_query_folds_declared_masks_into_the_real_answer() -> Result<()> {
    let profile = write_profile(&json!({
        "schema_version": "capsim_profile_v1",
        "capabilities": {
            "formats": {
                "r8g8b8a8_unorm": {"optimal_tiling_features": ["storage_image"]}
            }
        }
    }));
    let context = simulated_context(&profile);
    let handle = DeviceHandle(2);
    context.register_device(handle, sample_baseline())?;

    let baseline_caps = sample_baseline().formats[&FormatId("r8g8b8a8_unorm".to_string())];
    let (merged, warnings) = context
        .with_device(handle, |caps| {
            let mut warnings = Vec::new();
            let merged = caps.format_properties(
                &FormatId("r8g8b8a8_unorm".to_string()),
                baseline_caps,
                &mut warnings,
            );
            (merged, warnings)
        })
        .expect("device registered");

    assert!(merged.optimal_tiling.contains(FormatFeatures::STORAGE_IMAGE));
    assert!(merged.optimal_tiling.contains(FormatFeatures::COLOR_ATTACHMENT));
    assert_eq!(warnings.len(), 1, "storage_image is not in the real mask");
    assert!(matches!(
        &warnings[0],
        Warning::UnsupportedFeatureBit { field: "optimal_tiling_features", .. }
    ));

    // A format the profile does not mention answers with the real value.
    let untouched = context
        .with_device(handle, |caps| {
            let mut warnings = Vec::new();
            let real = FormatCaps {
                optimal_tiling: FormatFeatures::DEPTH_STENCIL_ATTACHMENT,
                ..Default::default()
            };
            let merged =
                caps.format_properties(&FormatId("d32_sfloat".to_string()), real, &mut warnings);
            assert!(warnings.is_empty());
            merged
        })
        .expect("device registered");
    assert_eq!(
        untouched.optimal_tiling,
        FormatFeatures::DEPTH_STENCIL_ATTACHMENT
    );
    Ok(())
}

#[test]
fn chain_patching_respects_activation_through_the_context() -> Result<()> {
    let profile = write_profile(&json!({
        "schema_version": "capsim_profile_v1",
        "capabilities": {
            "features": {
                "descriptor_indexing": {"descriptor_binding_partially_bound": true},
                "shader_float16_int8": {"shader_float16": true},
                "portability_subset": {"triangle_fans": true}
            }
        }
    }));
    let context = simulated_context(&profile);
    let handle = DeviceHandle(3);
    context.register_device(handle, sample_baseline())?;

    let mut chain = ChainNode::link(vec![
        BlockPayload::DescriptorIndexing(Default::default()),
        BlockPayload::ShaderFloat16Int8(Default::default()),
        BlockPayload::Portability(Default::default()),
    ])
    .expect("three-node chain");

    context
        .with_device(handle, |caps| caps.patch_chain(&mut chain))
        .expect("device registered");

    match &chain.payload {
        BlockPayload::DescriptorIndexing(block) => {
            assert!(block.descriptor_binding_partially_bound, "active block patched");
        }
        other => panic!("head payload changed type: {other:?}"),
    }
    let second = chain.next.as_ref().expect("topology preserved");
    match &second.payload {
        BlockPayload::ShaderFloat16Int8(block) => {
            assert!(!block.shader_float16, "inactive block keeps the driver value");
        }
        other => panic!("second payload changed type: {other:?}"),
    }
    let third = second.next.as_ref().expect("topology preserved");
    match &third.payload {
        BlockPayload::Portability(block) => {
            assert!(!block.triangle_fans, "no activation, no emulation");
        }
        other => panic!("third payload changed type: {other:?}"),
    }
    assert!(third.next.is_none());
    Ok(())
}

#[test]
fn portability_emulation_surfaces_the_legacy_block() -> Result<()> {
    let profile = write_profile(&json!({
        "schema_version": "capsim_profile_v1",
        "capabilities": {
            "features": {"portability_subset": {"triangle_fans": true, "events": true}}
        }
    }));
    let context = SimulationContext::new(SimulationConfig {
        profile_paths: vec![profile.path().to_path_buf()],
        emulate_portability: true,
        ..Default::default()
    });
    let handle = DeviceHandle(4);
    let warnings = context.register_device(handle, sample_baseline())?;
    assert!(
        !warnings
            .iter()
            .any(|w| matches!(w, Warning::CapabilityInactive { .. })),
        "emulation suppresses the inactive-capability warning"
    );

    let mut chain = ChainNode::new(BlockPayload::Portability(Default::default()));
    context
        .with_device(handle, |caps| caps.patch_chain(&mut chain))
        .expect("device registered");
    match &chain.payload {
        BlockPayload::Portability(block) => {
            assert!(block.triangle_fans);
            assert!(block.events);
        }
        other => panic!("payload changed type: {other:?}"),
    }
    Ok(())
}

#[test]
fn later_documents_overlay_registered_devices() -> Result<()> {
    let first = write_profile(&json!({
        "schema_version": "capsim_profile_v1",
        "capabilities": {"properties": {"limits": {"max_viewports": 4}}}
    }));
    let second = write_profile(&json!({
        "schema_version": "capsim_profile_v1_1",
        "capabilities": {"properties": {"limits": {"max_viewports": 2}}}
    }));
    let context = simulated_context(&first);
    let handle = DeviceHandle(5);
    context.register_device(handle, sample_baseline())?;
    context.load_document(handle, second.path())?;

    let viewports = context
        .with_device(handle, |caps| caps.limits().max_viewports)
        .expect("device registered");
    assert_eq!(viewports, 2);
    Ok(())
}

#[test]
fn bad_documents_degrade_unless_configured_fatal() -> Result<()> {
    let bad = write_profile(&json!({
        "schema_version": "someone_elses_schema_v7",
        "capabilities": {}
    }));

    let lenient = simulated_context(&bad);
    let handle = DeviceHandle(6);
    lenient.register_device(handle, sample_baseline())?;
    let names: Vec<String> = lenient
        .with_device(handle, |caps| {
            caps.effective_extensions()
                .iter()
                .map(|e| e.name.clone())
                .collect()
        })
        .expect("device registered");
    assert_eq!(
        names,
        vec!["ext_maintenance3", "ext_descriptor_indexing"],
        "device runs with real values only"
    );

    let fatal = SimulationContext::new(SimulationConfig {
        profile_paths: vec![bad.path().to_path_buf()],
        fail_on_error: true,
        ..Default::default()
    });
    assert!(fatal.register_device(DeviceHandle(7), sample_baseline()).is_err());
    Ok(())
}
