//! Unit tests for reflection.rs

use crate::render::reflection::*;

#[test]
fn test_execution_model_names() {
    assert_eq!(ShaderStage::from_execution_model("Vertex"), Some(ShaderStage::Vertex));
    assert_eq!(ShaderStage::from_execution_model("Fragment"), Some(ShaderStage::Fragment));
    assert_eq!(ShaderStage::from_execution_model("GLCompute"), None);
}

#[test]
fn test_stage_flags() {
    let flags = ShaderStage::Vertex.flag() | ShaderStage::Fragment.flag();
    assert!(flags.contains(ShaderStageFlags::VERTEX));
    assert!(!flags.contains(ShaderStageFlags::GEOMETRY));
}

#[test]
fn test_byte_sizes() {
    let vec3 = ReflectedType::Vector { kind: ScalarKind::Float, bits: 32, components: 3 };
    assert_eq!(vec3.byte_size(), Some(12));

    let mat4 = ReflectedType::Matrix { kind: ScalarKind::Float, bits: 32, columns: 4, rows: 4 };
    assert_eq!(mat4.byte_size(), Some(64));

    let array = ReflectedType::Array { element: Box::new(mat4), count: Some(2) };
    assert_eq!(array.byte_size(), Some(128));

    let runtime = ReflectedType::Array { element: Box::new(vec3), count: None };
    assert_eq!(runtime.byte_size(), None);
    assert_eq!(ReflectedType::SampledImage.byte_size(), None);
}
