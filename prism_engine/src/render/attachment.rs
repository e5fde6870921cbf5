/// Attachment planning - turns a pass description into an ordered attachment list
///
/// Locations are assigned in declaration order for color outputs, then the
/// depth output, then one resolve per color output when the pass is
/// multisampled. Every Vulkan attachment description and reference is derived
/// from this fixed ordering.

use crate::error::Result;
use crate::render::output::OutputMRT;
use crate::render::pass::{FboType, PassDescription, RenderTextureId};
use crate::render::types::{ClearValue, Extent2D, ImageLayout, SampleCount};

/// Role of an attachment in the render pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentKind {
    Color,
    Depth,
    Resolve,
}

/// Physical image an attachment resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageSource {
    /// The swapchain image acquired for this frame
    SwapchainImage,
    /// The frame's render-target cache, keyed by (slot, samples)
    FrameTarget,
    /// A render texture image for (frame, samples)
    RenderTexture(RenderTextureId),
}

/// Load behaviour of an attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadOp {
    Clear,
    Load,
    DontCare,
}

/// One planned attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentSlot {
    /// Attachment index in the render pass
    pub location: u32,
    /// Index of the originating output in the pass description
    pub output_index: usize,
    pub output: OutputMRT,
    pub kind: AttachmentKind,
    pub samples: SampleCount,
    pub source: ImageSource,
    pub load: LoadOp,
}

impl AttachmentSlot {
    /// Layout the image is left in when the render pass ends
    pub fn final_layout(&self) -> ImageLayout {
        match (self.kind, self.source) {
            (AttachmentKind::Depth, _) => ImageLayout::DepthStencilAttachmentOptimal,
            (_, ImageSource::SwapchainImage) => ImageLayout::PresentSrc,
            (_, ImageSource::RenderTexture(_)) => ImageLayout::ColorAttachmentOptimal,
            (_, ImageSource::FrameTarget) => ImageLayout::ColorAttachmentOptimal,
        }
    }

    /// Layout the image is expected in when the render pass begins
    ///
    /// Always the layout the image rests in between passes, so a clear or a
    /// resolve limited to a render area keeps the pixels outside it.
    /// Single-sample render textures rest in shader-read layout.
    pub fn initial_layout(&self) -> ImageLayout {
        match self.source {
            ImageSource::RenderTexture(_) if self.kind != AttachmentKind::Depth && self.samples == SampleCount::S1 => {
                ImageLayout::ShaderReadOnlyOptimal
            }
            _ => self.final_layout(),
        }
    }

    pub fn is_color(&self) -> bool {
        self.kind == AttachmentKind::Color
    }
}

/// Plan the attachments of `pass` in render-pass order
pub fn plan_attachments(pass: &PassDescription) -> Vec<AttachmentSlot> {
    let samples = pass.sample_count();
    let msaa = samples.is_multisampled();
    let outputs = pass.outputs();

    let source_of = |fbo: FboType, kind: AttachmentKind| match (fbo, kind) {
        (FboType::RenderTexture(id), _) => ImageSource::RenderTexture(id),
        (FboType::Swapchain, AttachmentKind::Color) if msaa => ImageSource::FrameTarget,
        (FboType::Swapchain, _) => ImageSource::SwapchainImage,
        (FboType::FrameTarget, _) => ImageSource::FrameTarget,
    };

    let mut slots = Vec::with_capacity(outputs.len() * 2);
    let mut push = |index: usize, kind: AttachmentKind, slot_samples: SampleCount, load: LoadOp| {
        let output = &outputs[index];
        slots.push(AttachmentSlot {
            location: 0,
            output_index: index,
            output: output.output,
            kind,
            samples: slot_samples,
            source: source_of(output.fbo_type(), kind),
            load,
        });
    };
    let load_of = |clear: bool| if clear { LoadOp::Clear } else { LoadOp::Load };

    for (index, output) in outputs.iter().enumerate() {
        if output.output.is_color() {
            push(index, AttachmentKind::Color, samples, load_of(output.clear));
        }
    }
    for (index, output) in outputs.iter().enumerate() {
        if output.output.is_depth() {
            push(index, AttachmentKind::Depth, samples, load_of(output.clear));
        }
    }
    if msaa {
        for (index, output) in outputs.iter().enumerate() {
            if output.output.is_color() {
                push(index, AttachmentKind::Resolve, SampleCount::S1, LoadOp::DontCare);
            }
        }
    }

    for (location, slot) in slots.iter_mut().enumerate() {
        slot.location = location as u32;
    }
    slots
}

/// Clear values of `pass`, one per planned slot
///
/// Passes with equal keys share a framebuffer, so the values are taken from
/// the pass being begun. Resolve slots repeat their color output's value.
pub fn clear_values(pass: &PassDescription, slots: &[AttachmentSlot]) -> Vec<ClearValue> {
    slots
        .iter()
        .map(|slot| {
            pass.outputs()
                .get(slot.output_index)
                .map(|o| o.clear_value)
                .unwrap_or(ClearValue::BLACK)
        })
        .collect()
}

/// What the backend resolved a slot to, for validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedAttachment {
    pub output: OutputMRT,
    pub kind: AttachmentKind,
    pub samples: SampleCount,
    pub extent: Extent2D,
}

/// Validate a resolved attachment list before any render pass is created
///
/// * at least one attachment
/// * all color sample counts equal
/// * at most one depth attachment
/// * depth samples equal color samples (`>=` is accepted with mixed samples;
///   the planner always gives depth the pass sample count)
/// * one resolve per color attachment when resolves are present
/// * all extents equal
pub fn validate_attachments(attachments: &[ResolvedAttachment], mixed_samples: bool) -> Result<()> {
    const SOURCE: &str = "prism::framebuffer";

    if attachments.is_empty() {
        return Err(crate::engine_fatal!(SOURCE, @PipelineError, "Framebuffer has no attachment"));
    }

    let colors: Vec<_> = attachments.iter().filter(|a| a.kind == AttachmentKind::Color).collect();
    let depths: Vec<_> = attachments.iter().filter(|a| a.kind == AttachmentKind::Depth).collect();
    let resolves = attachments.iter().filter(|a| a.kind == AttachmentKind::Resolve).count();

    if let Some(first) = colors.first() {
        if let Some(odd) = colors.iter().find(|c| c.samples != first.samples) {
            return Err(crate::engine_fatal!(
                SOURCE, @PipelineError,
                "Color attachment {} has {} samples, {} has {}",
                odd.output, odd.samples.count(), first.output, first.samples.count()
            ));
        }
    }

    if depths.len() > 1 {
        return Err(crate::engine_fatal!(
            SOURCE, @PipelineError,
            "Framebuffer has {} depth attachments, at most one is allowed",
            depths.len()
        ));
    }

    if let (Some(depth), Some(color)) = (depths.first(), colors.first()) {
        let matches = if mixed_samples {
            depth.samples >= color.samples
        } else {
            depth.samples == color.samples
        };
        if !matches {
            return Err(crate::engine_fatal!(
                SOURCE, @PipelineError,
                "Depth attachment has {} samples but color attachments have {}",
                depth.samples.count(), color.samples.count()
            ));
        }
    }

    if resolves > 0 && resolves != colors.len() {
        return Err(crate::engine_fatal!(
            SOURCE, @PipelineError,
            "{} resolve attachments for {} color attachments",
            resolves, colors.len()
        ));
    }

    let extent = attachments[0].extent;
    if let Some(odd) = attachments.iter().find(|a| a.extent != extent) {
        return Err(crate::engine_fatal!(
            SOURCE, @PipelineError,
            "Attachment {} is {}x{}, expected {}x{}",
            odd.output, odd.extent.width, odd.extent.height, extent.width, extent.height
        ));
    }

    Ok(())
}

#[cfg(test)]
#[path = "attachment_tests.rs"]
mod tests;
