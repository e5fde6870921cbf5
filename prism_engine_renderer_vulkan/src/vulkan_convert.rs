/// Engine enum to `vk::*` conversions
///
/// Every mapping between the backend-neutral render vocabulary and Vulkan
/// lives here, so the rest of the backend never matches on raw `vk` values.

use ash::vk;
use prism_engine::prism::render::{
    BlendFactor, BlendFunction, BlendOp, ClearValue, CompareOp, CullMode, Extent2D, ImageLayout,
    IndexType, LoadOp, MipmapFilter, PolygonMode, PrimitiveTopology, Rect2D, SampleCount,
    ShaderStage, ShaderStageFlags, TextureFormat,
};

pub fn format_to_vk(format: TextureFormat) -> vk::Format {
    match format {
        TextureFormat::R8G8B8A8Unorm => vk::Format::R8G8B8A8_UNORM,
        TextureFormat::R8G8B8A8Srgb => vk::Format::R8G8B8A8_SRGB,
        TextureFormat::B8G8R8A8Unorm => vk::Format::B8G8R8A8_UNORM,
        TextureFormat::B8G8R8A8Srgb => vk::Format::B8G8R8A8_SRGB,
        TextureFormat::R16G16B16A16Sfloat => vk::Format::R16G16B16A16_SFLOAT,
        TextureFormat::R32Sfloat => vk::Format::R32_SFLOAT,
        TextureFormat::R32G32Sfloat => vk::Format::R32G32_SFLOAT,
        TextureFormat::R32G32B32Sfloat => vk::Format::R32G32B32_SFLOAT,
        TextureFormat::R32G32B32A32Sfloat => vk::Format::R32G32B32A32_SFLOAT,
        TextureFormat::R32Sint => vk::Format::R32_SINT,
        TextureFormat::R32G32Sint => vk::Format::R32G32_SINT,
        TextureFormat::R32G32B32Sint => vk::Format::R32G32B32_SINT,
        TextureFormat::R32G32B32A32Sint => vk::Format::R32G32B32A32_SINT,
        TextureFormat::R32Uint => vk::Format::R32_UINT,
        TextureFormat::R32G32Uint => vk::Format::R32G32_UINT,
        TextureFormat::R32G32B32Uint => vk::Format::R32G32B32_UINT,
        TextureFormat::R32G32B32A32Uint => vk::Format::R32G32B32A32_UINT,
        TextureFormat::D16Unorm => vk::Format::D16_UNORM,
        TextureFormat::D32Sfloat => vk::Format::D32_SFLOAT,
        TextureFormat::D24UnormS8Uint => vk::Format::D24_UNORM_S8_UINT,
        TextureFormat::D32SfloatS8Uint => vk::Format::D32_SFLOAT_S8_UINT,
    }
}

/// Reverse of [`format_to_vk`] for the formats a surface or device may report
pub fn format_from_vk(format: vk::Format) -> Option<TextureFormat> {
    let format = match format {
        vk::Format::R8G8B8A8_UNORM => TextureFormat::R8G8B8A8Unorm,
        vk::Format::R8G8B8A8_SRGB => TextureFormat::R8G8B8A8Srgb,
        vk::Format::B8G8R8A8_UNORM => TextureFormat::B8G8R8A8Unorm,
        vk::Format::B8G8R8A8_SRGB => TextureFormat::B8G8R8A8Srgb,
        vk::Format::R16G16B16A16_SFLOAT => TextureFormat::R16G16B16A16Sfloat,
        vk::Format::D16_UNORM => TextureFormat::D16Unorm,
        vk::Format::D32_SFLOAT => TextureFormat::D32Sfloat,
        vk::Format::D24_UNORM_S8_UINT => TextureFormat::D24UnormS8Uint,
        vk::Format::D32_SFLOAT_S8_UINT => TextureFormat::D32SfloatS8Uint,
        _ => return None,
    };
    Some(format)
}

pub fn aspect_of(format: TextureFormat) -> vk::ImageAspectFlags {
    if format.has_stencil() {
        vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
    } else if format.is_depth() {
        vk::ImageAspectFlags::DEPTH
    } else {
        vk::ImageAspectFlags::COLOR
    }
}

pub fn sample_count_to_vk(samples: SampleCount) -> vk::SampleCountFlags {
    match samples {
        SampleCount::S1 => vk::SampleCountFlags::TYPE_1,
        SampleCount::S2 => vk::SampleCountFlags::TYPE_2,
        SampleCount::S4 => vk::SampleCountFlags::TYPE_4,
        SampleCount::S8 => vk::SampleCountFlags::TYPE_8,
        SampleCount::S16 => vk::SampleCountFlags::TYPE_16,
        SampleCount::S32 => vk::SampleCountFlags::TYPE_32,
        SampleCount::S64 => vk::SampleCountFlags::TYPE_64,
    }
}

/// Highest sample count contained in a device limit mask
pub fn max_sample_count(flags: vk::SampleCountFlags) -> SampleCount {
    SampleCount::ALL
        .into_iter()
        .rev()
        .find(|s| flags.contains(sample_count_to_vk(*s)))
        .unwrap_or(SampleCount::S1)
}

pub fn topology_to_vk(topology: PrimitiveTopology) -> vk::PrimitiveTopology {
    match topology {
        PrimitiveTopology::PointList => vk::PrimitiveTopology::POINT_LIST,
        PrimitiveTopology::LineList => vk::PrimitiveTopology::LINE_LIST,
        PrimitiveTopology::LineStrip => vk::PrimitiveTopology::LINE_STRIP,
        PrimitiveTopology::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
        PrimitiveTopology::TriangleStrip => vk::PrimitiveTopology::TRIANGLE_STRIP,
        PrimitiveTopology::TriangleFan => vk::PrimitiveTopology::TRIANGLE_FAN,
    }
}

pub fn cull_mode_to_vk(mode: CullMode) -> vk::CullModeFlags {
    match mode {
        CullMode::None => vk::CullModeFlags::NONE,
        CullMode::Front => vk::CullModeFlags::FRONT,
        CullMode::Back => vk::CullModeFlags::BACK,
        CullMode::FrontAndBack => vk::CullModeFlags::FRONT_AND_BACK,
    }
}

pub fn polygon_mode_to_vk(mode: PolygonMode) -> vk::PolygonMode {
    match mode {
        PolygonMode::Fill => vk::PolygonMode::FILL,
        PolygonMode::Line => vk::PolygonMode::LINE,
        PolygonMode::Point => vk::PolygonMode::POINT,
    }
}

pub fn index_type_to_vk(index_type: IndexType) -> vk::IndexType {
    match index_type {
        IndexType::U16 => vk::IndexType::UINT16,
        IndexType::U32 => vk::IndexType::UINT32,
    }
}

pub fn compare_op_to_vk(op: CompareOp) -> vk::CompareOp {
    match op {
        CompareOp::Never => vk::CompareOp::NEVER,
        CompareOp::Less => vk::CompareOp::LESS,
        CompareOp::Equal => vk::CompareOp::EQUAL,
        CompareOp::LessOrEqual => vk::CompareOp::LESS_OR_EQUAL,
        CompareOp::Greater => vk::CompareOp::GREATER,
        CompareOp::NotEqual => vk::CompareOp::NOT_EQUAL,
        CompareOp::GreaterOrEqual => vk::CompareOp::GREATER_OR_EQUAL,
        CompareOp::Always => vk::CompareOp::ALWAYS,
    }
}

pub fn blend_factor_to_vk(factor: BlendFactor) -> vk::BlendFactor {
    match factor {
        BlendFactor::Zero => vk::BlendFactor::ZERO,
        BlendFactor::One => vk::BlendFactor::ONE,
        BlendFactor::SrcColor => vk::BlendFactor::SRC_COLOR,
        BlendFactor::OneMinusSrcColor => vk::BlendFactor::ONE_MINUS_SRC_COLOR,
        BlendFactor::DstColor => vk::BlendFactor::DST_COLOR,
        BlendFactor::OneMinusDstColor => vk::BlendFactor::ONE_MINUS_DST_COLOR,
        BlendFactor::SrcAlpha => vk::BlendFactor::SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
        BlendFactor::DstAlpha => vk::BlendFactor::DST_ALPHA,
        BlendFactor::OneMinusDstAlpha => vk::BlendFactor::ONE_MINUS_DST_ALPHA,
        BlendFactor::ConstantColor => vk::BlendFactor::CONSTANT_COLOR,
        BlendFactor::OneMinusConstantColor => vk::BlendFactor::ONE_MINUS_CONSTANT_COLOR,
        BlendFactor::SrcAlphaSaturate => vk::BlendFactor::SRC_ALPHA_SATURATE,
    }
}

pub fn blend_op_to_vk(op: BlendOp) -> vk::BlendOp {
    match op {
        BlendOp::Add => vk::BlendOp::ADD,
        BlendOp::Subtract => vk::BlendOp::SUBTRACT,
        BlendOp::ReverseSubtract => vk::BlendOp::REVERSE_SUBTRACT,
        BlendOp::Min => vk::BlendOp::MIN,
        BlendOp::Max => vk::BlendOp::MAX,
    }
}

/// Color blend state of one attachment
pub fn blend_attachment(blend: &BlendFunction) -> vk::PipelineColorBlendAttachmentState {
    vk::PipelineColorBlendAttachmentState::default()
        .blend_enable(blend.enabled)
        .src_color_blend_factor(blend_factor_to_vk(blend.src_color))
        .dst_color_blend_factor(blend_factor_to_vk(blend.dst_color))
        .color_blend_op(blend_op_to_vk(blend.color_op))
        .src_alpha_blend_factor(blend_factor_to_vk(blend.src_alpha))
        .dst_alpha_blend_factor(blend_factor_to_vk(blend.dst_alpha))
        .alpha_blend_op(blend_op_to_vk(blend.alpha_op))
        .color_write_mask(vk::ColorComponentFlags::RGBA)
}

pub fn image_layout_to_vk(layout: ImageLayout) -> vk::ImageLayout {
    match layout {
        ImageLayout::Undefined => vk::ImageLayout::UNDEFINED,
        ImageLayout::ColorAttachmentOptimal => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        ImageLayout::DepthStencilAttachmentOptimal => vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        ImageLayout::ShaderReadOnlyOptimal => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        ImageLayout::TransferSrcOptimal => vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        ImageLayout::TransferDstOptimal => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        ImageLayout::PresentSrc => vk::ImageLayout::PRESENT_SRC_KHR,
    }
}

/// Access mask and pipeline stage touching an image in `layout`
///
/// Used on both sides of a layout transition barrier.
pub fn layout_access(layout: ImageLayout) -> (vk::AccessFlags, vk::PipelineStageFlags) {
    match layout {
        ImageLayout::Undefined => (vk::AccessFlags::empty(), vk::PipelineStageFlags::TOP_OF_PIPE),
        ImageLayout::ColorAttachmentOptimal => (
            vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
        ),
        ImageLayout::DepthStencilAttachmentOptimal => (
            vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS,
        ),
        ImageLayout::ShaderReadOnlyOptimal => {
            (vk::AccessFlags::SHADER_READ, vk::PipelineStageFlags::FRAGMENT_SHADER)
        }
        ImageLayout::TransferSrcOptimal => (vk::AccessFlags::TRANSFER_READ, vk::PipelineStageFlags::TRANSFER),
        ImageLayout::TransferDstOptimal => (vk::AccessFlags::TRANSFER_WRITE, vk::PipelineStageFlags::TRANSFER),
        ImageLayout::PresentSrc => (vk::AccessFlags::empty(), vk::PipelineStageFlags::BOTTOM_OF_PIPE),
    }
}

pub fn load_op_to_vk(load: LoadOp) -> vk::AttachmentLoadOp {
    match load {
        LoadOp::Clear => vk::AttachmentLoadOp::CLEAR,
        LoadOp::Load => vk::AttachmentLoadOp::LOAD,
        LoadOp::DontCare => vk::AttachmentLoadOp::DONT_CARE,
    }
}

pub fn clear_value_to_vk(value: ClearValue) -> vk::ClearValue {
    match value {
        ClearValue::Color(float32) => vk::ClearValue {
            color: vk::ClearColorValue { float32 },
        },
        ClearValue::DepthStencil { depth, stencil } => vk::ClearValue {
            depth_stencil: vk::ClearDepthStencilValue { depth, stencil },
        },
    }
}

pub fn shader_stage_to_vk(stage: ShaderStage) -> vk::ShaderStageFlags {
    match stage {
        ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
        ShaderStage::TessellationControl => vk::ShaderStageFlags::TESSELLATION_CONTROL,
        ShaderStage::TessellationEvaluation => vk::ShaderStageFlags::TESSELLATION_EVALUATION,
        ShaderStage::Geometry => vk::ShaderStageFlags::GEOMETRY,
        ShaderStage::Fragment => vk::ShaderStageFlags::FRAGMENT,
    }
}

pub fn stage_flags_to_vk(flags: ShaderStageFlags) -> vk::ShaderStageFlags {
    let mut vk_flags = vk::ShaderStageFlags::empty();
    if flags.contains(ShaderStageFlags::VERTEX) {
        vk_flags |= vk::ShaderStageFlags::VERTEX;
    }
    if flags.contains(ShaderStageFlags::TESSELLATION_CONTROL) {
        vk_flags |= vk::ShaderStageFlags::TESSELLATION_CONTROL;
    }
    if flags.contains(ShaderStageFlags::TESSELLATION_EVALUATION) {
        vk_flags |= vk::ShaderStageFlags::TESSELLATION_EVALUATION;
    }
    if flags.contains(ShaderStageFlags::GEOMETRY) {
        vk_flags |= vk::ShaderStageFlags::GEOMETRY;
    }
    if flags.contains(ShaderStageFlags::FRAGMENT) {
        vk_flags |= vk::ShaderStageFlags::FRAGMENT;
    }
    vk_flags
}

/// Blit filter for mip generation, `None` when the chain is disabled
pub fn mipmap_filter_to_vk(filter: MipmapFilter) -> Option<vk::Filter> {
    match filter {
        MipmapFilter::Disabled => None,
        MipmapFilter::Nearest => Some(vk::Filter::NEAREST),
        MipmapFilter::Linear => Some(vk::Filter::LINEAR),
    }
}

pub fn extent_to_vk(extent: Extent2D) -> vk::Extent2D {
    vk::Extent2D {
        width: extent.width,
        height: extent.height,
    }
}

pub fn rect_to_vk(rect: Rect2D) -> vk::Rect2D {
    vk::Rect2D {
        offset: vk::Offset2D { x: rect.x, y: rect.y },
        extent: vk::Extent2D {
            width: rect.width,
            height: rect.height,
        },
    }
}

#[cfg(test)]
#[path = "vulkan_convert_tests.rs"]
mod tests;
