//! Unit tests for output_binding.rs

use crate::render::output::OutputMRT;
use crate::render::output_binding::*;
use crate::render::reflection::{ReflectedType, ReflectedVariable, ScalarKind};
use crate::render::types::TextureFormat;

fn out(name: &str, location: u32) -> ReflectedVariable {
    ReflectedVariable {
        name: name.to_string(),
        location: Some(location),
        ty: ReflectedType::Vector { kind: ScalarKind::Float, bits: 32, components: 4 },
    }
}

#[test]
fn test_single_color_gets_depth_appended() {
    let bindings = derive_output_bindings(&[out("_outFBODefaultColor", 0)], TextureFormat::D32Sfloat).unwrap();
    assert_eq!(bindings.len(), 2);
    assert_eq!(bindings[0].output, OutputMRT::DefaultColor);
    assert_eq!(bindings[1], OutputBinding {
        output: OutputMRT::DefaultDepth,
        location: 1,
        format: TextureFormat::D32Sfloat,
    });
}

#[test]
fn test_contiguous_mrt() {
    let outputs = [out("_outFBODF_Position", 0), out("_outFBODF_Normal", 1), out("_outFBODF_Color", 2)];
    let bindings = derive_output_bindings(&outputs, TextureFormat::D24UnormS8Uint).unwrap();
    let slots: Vec<_> = bindings.iter().map(|b| (b.output, b.location)).collect();
    assert_eq!(
        slots,
        vec![
            (OutputMRT::DfPosition, 0),
            (OutputMRT::DfNormal, 1),
            (OutputMRT::DfColor, 2),
            (OutputMRT::DefaultDepth, 3),
        ]
    );
}

#[test]
fn test_declaration_order_does_not_matter() {
    let outputs = [out("_outFBODF_Color", 2), out("_outFBODF_Position", 0), out("_outFBODF_Normal", 1)];
    let bindings = derive_output_bindings(&outputs, TextureFormat::D32Sfloat).unwrap();
    let locations: Vec<u32> = bindings.iter().map(|b| b.location).collect();
    assert_eq!(locations, vec![0, 1, 2, 3]);
    assert_eq!(bindings[0].output, OutputMRT::DfPosition);
}

#[test]
fn test_location_gap_rejected() {
    let outputs = [out("_outFBODefaultColor", 0), out("_outFBODF_Normal", 2)];
    assert!(derive_output_bindings(&outputs, TextureFormat::D32Sfloat).is_err());
}

#[test]
fn test_not_starting_at_zero_rejected() {
    assert!(derive_output_bindings(&[out("_outFBODefaultColor", 1)], TextureFormat::D32Sfloat).is_err());
}

#[test]
fn test_repeated_location_rejected() {
    let outputs = [out("_outFBODefaultColor", 0), out("_outFBODF_Normal", 0)];
    assert!(derive_output_bindings(&outputs, TextureFormat::D32Sfloat).is_err());
}

#[test]
fn test_unknown_tag_rejected() {
    assert!(derive_output_bindings(&[out("_outFBOAlbedo", 0)], TextureFormat::D32Sfloat).is_err());
}

#[test]
fn test_unprefixed_output_ignored() {
    let bindings = derive_output_bindings(&[out("debugColor", 0)], TextureFormat::D32Sfloat).unwrap();
    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].output, OutputMRT::DefaultDepth);
    assert_eq!(bindings[0].location, 0);
}

#[test]
fn test_output_formats() {
    let float2 = ReflectedType::Vector { kind: ScalarKind::Float, bits: 32, components: 2 };
    assert_eq!(output_format(&float2), Some(TextureFormat::R32G32Sfloat));
    let uint = ReflectedType::Scalar { kind: ScalarKind::Uint, bits: 32 };
    assert_eq!(output_format(&uint), Some(TextureFormat::R32Uint));
    assert_eq!(output_format(&ReflectedType::Image), None);
}
