//! Unit tests for descriptor.rs

use crate::error::Error;
use crate::render::descriptor::*;
use crate::render::reflection::*;
use rustc_hash::FxHashSet;

fn ubo(name: &str, binding: u32, size: u32) -> ReflectedDescriptor {
    ReflectedDescriptor {
        name: name.to_string(),
        set: 0,
        binding,
        kind: DescriptorKind::UniformBuffer,
        count: 1,
        size: Some(size),
    }
}

fn sampler(name: &str, binding: u32) -> ReflectedDescriptor {
    ReflectedDescriptor {
        name: name.to_string(),
        set: 0,
        binding,
        kind: DescriptorKind::CombinedImageSampler,
        count: 1,
        size: None,
    }
}

fn stage(stage: ShaderStage, descriptors: Vec<ReflectedDescriptor>) -> ShaderReflection {
    let mut reflection = ShaderReflection::new(stage);
    reflection.descriptors = descriptors;
    reflection
}

// ============================================================================
// BUILD
// ============================================================================

#[test]
fn test_build_across_stages() {
    let vs = stage(ShaderStage::Vertex, vec![ubo("_uboViewProj", 0, 128)]);
    let fs = stage(ShaderStage::Fragment, vec![sampler("texAlbedo", 1), ubo("_uboLights", 2, 64)]);
    let table = DescriptorTable::build([&vs, &fs]).unwrap();

    assert_eq!(table.len(), 3);
    let view_proj = table.get("_uboViewProj").unwrap();
    assert_eq!(view_proj.ty, DescriptorType::Ubo);
    assert_eq!(view_proj.stages, ShaderStageFlags::VERTEX);
    assert_eq!(view_proj.role, UboRole::ViewProj);
    assert_eq!(table.get("_uboLights").unwrap().role, UboRole::Lights);

    let bindings: Vec<_> = table.sorted().iter().map(|d| d.binding).collect();
    assert_eq!(bindings, vec![0, 1, 2]);
}

#[test]
fn test_duplicate_binding_across_stages_rejected() {
    let vs = stage(ShaderStage::Vertex, vec![ubo("_uboViewProj", 0, 128)]);
    let fs = stage(ShaderStage::Fragment, vec![sampler("texAlbedo", 0)]);
    let err = DescriptorTable::build([&vs, &fs]).unwrap_err();
    assert!(matches!(err, Error::ShaderError(msg) if msg.contains("Binding 0")));
}

#[test]
fn test_duplicate_name_across_stages_rejected() {
    let vs = stage(ShaderStage::Vertex, vec![ubo("_uboViewProj", 0, 128)]);
    let fs = stage(ShaderStage::Fragment, vec![ubo("_uboViewProj", 3, 128)]);
    assert!(matches!(DescriptorTable::build([&vs, &fs]), Err(Error::ShaderError(_))));
}

#[test]
fn test_ubo_array_rejected() {
    let mut array = ubo("_uboInstanceData", 0, 64);
    array.count = 4;
    let vs = stage(ShaderStage::Vertex, vec![array]);
    assert!(DescriptorTable::build([&vs]).is_err());
}

#[test]
fn test_storage_buffer_rejected() {
    let mut storage = ubo("particles", 0, 64);
    storage.kind = DescriptorKind::StorageBuffer;
    let vs = stage(ShaderStage::Vertex, vec![storage]);
    assert!(DescriptorTable::build([&vs]).is_err());
}

#[test]
fn test_pool_sizes_scale_with_frames() {
    let vs = stage(ShaderStage::Vertex, vec![ubo("_uboViewProj", 0, 128), ubo("_uboInstanceData", 1, 64)]);
    let fs = stage(ShaderStage::Fragment, vec![sampler("tex", 2)]);
    let table = DescriptorTable::build([&vs, &fs]).unwrap();
    assert_eq!(table.pool_sizes(3), PoolSizes { ubos: 6, samplers: 3, sets: 3 });
}

// ============================================================================
// UBO REQUESTS
// ============================================================================

#[test]
fn test_ubo_request_checks() {
    let vs = stage(ShaderStage::Vertex, vec![ubo("_uboViewProj", 0, 128)]);
    let fs = stage(ShaderStage::Fragment, vec![sampler("tex", 1)]);
    let table = DescriptorTable::build([&vs, &fs]).unwrap();
    let mut created = FxHashSet::default();

    assert!(table.check_ubo_request("_uboViewProj", 128, &created).is_ok());
    assert!(table.check_ubo_request("_uboViewProj", 129, &created).is_err());
    assert!(table.check_ubo_request("missing", 16, &created).is_err());
    assert!(table.check_ubo_request("tex", 16, &created).is_err());

    created.insert("_uboViewProj".to_string());
    assert!(matches!(
        table.check_ubo_request("_uboViewProj", 64, &created),
        Err(Error::InvalidResource(_))
    ));
}

// ============================================================================
// BINDING TRACKER
// ============================================================================

#[test]
fn test_unbound_descriptors_reported_once() {
    let vs = stage(ShaderStage::Vertex, vec![ubo("_uboViewProj", 0, 128)]);
    let fs = stage(ShaderStage::Fragment, vec![sampler("tex", 1)]);
    let table = DescriptorTable::build([&vs, &fs]).unwrap();
    let mut tracker = BindingTracker::default();

    tracker.mark_bound("_uboViewProj");
    assert_eq!(tracker.report_unbound(&table), vec!["tex".to_string()]);
    assert!(tracker.report_unbound(&table).is_empty());

    tracker.reset();
    assert!(!tracker.is_bound("_uboViewProj"));
}

#[test]
fn test_ubo_roles() {
    assert_eq!(UboRole::from_name("_uboInstanceData"), UboRole::InstanceData);
    assert_eq!(UboRole::from_name("material"), UboRole::Other);
}
