//! Unit tests for vulkan_convert.rs
//!
//! Pure mappings, no GPU required.

use super::*;

#[test]
fn test_color_formats() {
    assert_eq!(format_to_vk(TextureFormat::B8G8R8A8Srgb), vk::Format::B8G8R8A8_SRGB);
    assert_eq!(format_to_vk(TextureFormat::R16G16B16A16Sfloat), vk::Format::R16G16B16A16_SFLOAT);
    assert_eq!(format_to_vk(TextureFormat::R32G32B32Sfloat), vk::Format::R32G32B32_SFLOAT);
    assert_eq!(format_to_vk(TextureFormat::R32G32Uint), vk::Format::R32G32_UINT);
}

#[test]
fn test_surface_formats_map_back() {
    for format in [
        TextureFormat::R8G8B8A8Srgb,
        TextureFormat::B8G8R8A8Srgb,
        TextureFormat::B8G8R8A8Unorm,
        TextureFormat::D32Sfloat,
        TextureFormat::D24UnormS8Uint,
    ] {
        assert_eq!(format_from_vk(format_to_vk(format)), Some(format));
    }
    assert_eq!(format_from_vk(vk::Format::BC1_RGB_UNORM_BLOCK), None);
}

#[test]
fn test_depth_aspects() {
    assert_eq!(aspect_of(TextureFormat::R8G8B8A8Unorm), vk::ImageAspectFlags::COLOR);
    assert_eq!(aspect_of(TextureFormat::D32Sfloat), vk::ImageAspectFlags::DEPTH);
    assert_eq!(
        aspect_of(TextureFormat::D32SfloatS8Uint),
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    );
}

#[test]
fn test_max_sample_count_from_limits() {
    let flags = vk::SampleCountFlags::TYPE_1 | vk::SampleCountFlags::TYPE_2 | vk::SampleCountFlags::TYPE_4;
    assert_eq!(max_sample_count(flags), SampleCount::S4);
    assert_eq!(max_sample_count(vk::SampleCountFlags::empty()), SampleCount::S1);
    assert_eq!(sample_count_to_vk(SampleCount::S8), vk::SampleCountFlags::TYPE_8);
}

#[test]
fn test_layouts_and_access() {
    assert_eq!(image_layout_to_vk(ImageLayout::PresentSrc), vk::ImageLayout::PRESENT_SRC_KHR);

    let (access, stage) = layout_access(ImageLayout::Undefined);
    assert!(access.is_empty());
    assert_eq!(stage, vk::PipelineStageFlags::TOP_OF_PIPE);

    let (access, stage) = layout_access(ImageLayout::ShaderReadOnlyOptimal);
    assert_eq!(access, vk::AccessFlags::SHADER_READ);
    assert_eq!(stage, vk::PipelineStageFlags::FRAGMENT_SHADER);
}

#[test]
fn test_blend_attachment() {
    let state = blend_attachment(&BlendFunction::ALPHA);
    assert_eq!(state.blend_enable, vk::TRUE);
    assert_eq!(state.src_color_blend_factor, vk::BlendFactor::SRC_ALPHA);
    assert_eq!(state.dst_color_blend_factor, vk::BlendFactor::ONE_MINUS_SRC_ALPHA);
    assert_eq!(state.color_write_mask, vk::ColorComponentFlags::RGBA);

    let opaque = blend_attachment(&BlendFunction::OPAQUE);
    assert_eq!(opaque.blend_enable, vk::FALSE);
}

#[test]
fn test_stage_flags() {
    let flags = ShaderStageFlags::VERTEX | ShaderStageFlags::FRAGMENT;
    assert_eq!(
        stage_flags_to_vk(flags),
        vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT
    );
    assert_eq!(shader_stage_to_vk(ShaderStage::Geometry), vk::ShaderStageFlags::GEOMETRY);
}

#[test]
fn test_misc_state() {
    assert_eq!(load_op_to_vk(LoadOp::Load), vk::AttachmentLoadOp::LOAD);
    assert_eq!(cull_mode_to_vk(CullMode::Back), vk::CullModeFlags::BACK);
    assert_eq!(polygon_mode_to_vk(PolygonMode::Line), vk::PolygonMode::LINE);
    assert_eq!(topology_to_vk(PrimitiveTopology::TriangleFan), vk::PrimitiveTopology::TRIANGLE_FAN);
    assert_eq!(compare_op_to_vk(CompareOp::LessOrEqual), vk::CompareOp::LESS_OR_EQUAL);
    assert_eq!(index_type_to_vk(IndexType::U16), vk::IndexType::UINT16);
    assert_eq!(mipmap_filter_to_vk(MipmapFilter::Disabled), None);
    assert_eq!(mipmap_filter_to_vk(MipmapFilter::Nearest), Some(vk::Filter::NEAREST));
}

#[test]
fn test_rect_and_clear() {
    let rect = rect_to_vk(Rect2D::new(4, 8, 100, 50));
    assert_eq!(rect.offset.x, 4);
    assert_eq!(rect.offset.y, 8);
    assert_eq!(rect.extent.width, 100);

    let clear = clear_value_to_vk(ClearValue::DEPTH_ONE);
    unsafe {
        assert_eq!(clear.depth_stencil.depth, 1.0);
        assert_eq!(clear.depth_stencil.stencil, 0);
    }
}
