/// Framebuffer - a pass description resolved to a render pass, a framebuffer
/// and the images behind every attachment
///
/// Attachments follow the planned order (colors, depth, resolves). Subpass
/// color references follow the fragment shader output locations instead, so
/// the pipeline's blend array lines up with what the shader writes.
///
/// Only structure is kept. Clear values, render area, blend and depth state
/// come from the pass being begun, since structurally equal passes share one
/// framebuffer.
///
/// A description that fails validation yields an invalid framebuffer: it is
/// still cached (so the failure is reported once) but owns no Vulkan objects.

use ash::vk;
use prism_engine::prism::render::{
    clear_values, plan_attachments, validate_attachments, AttachmentKind, AttachmentSlot, Extent2D,
    OutputBinding, OutputMRT, PassDescription, PassKey, Rect2D, ResolvedAttachment, SampleCount,
};
use prism_engine::prism::Result;
use prism_engine::{engine_debug, engine_err};
use std::sync::Arc;

use crate::vulkan_convert::{
    clear_value_to_vk, format_to_vk, image_layout_to_vk, load_op_to_vk, rect_to_vk, sample_count_to_vk,
};
use crate::vulkan_device::Device;
use crate::vulkan_texture::TextureImage;

const SOURCE: &str = "prism::framebuffer";

/// One attachment and the image it resolved to
pub struct FramebufferAttachment {
    pub slot: AttachmentSlot,
    pub image: Arc<TextureImage>,
}

pub struct Framebuffer {
    device: Arc<Device>,
    key: PassKey,
    /// Swapchain image the framebuffer renders to, if any
    image_index: Option<u32>,
    render_pass: vk::RenderPass,
    framebuffer: vk::Framebuffer,
    attachments: Vec<FramebufferAttachment>,
    extent: Extent2D,
    samples: SampleCount,
    valid: bool,
}

impl Framebuffer {
    /// Resolve `pass` and build its render pass and framebuffer
    ///
    /// `outputs` are the fragment output bindings of the shader, `image_of`
    /// returns the image behind a planned attachment. Errors from `image_of`
    /// propagate; validation failures produce an invalid framebuffer.
    pub fn new<F>(
        device: &Arc<Device>,
        pass: &PassDescription,
        image_index: Option<u32>,
        outputs: &[OutputBinding],
        mut image_of: F,
    ) -> Result<Self>
    where
        F: FnMut(&AttachmentSlot) -> Result<Arc<TextureImage>>,
    {
        let mut framebuffer = Self {
            device: Arc::clone(device),
            key: pass.key(),
            image_index,
            render_pass: vk::RenderPass::null(),
            framebuffer: vk::Framebuffer::null(),
            attachments: Vec::new(),
            extent: Extent2D::default(),
            samples: pass.sample_count(),
            valid: false,
        };
        if !pass.valid() {
            return Ok(framebuffer);
        }

        for slot in plan_attachments(pass) {
            let image = image_of(&slot)?;
            framebuffer.attachments.push(FramebufferAttachment { slot, image });
        }

        let resolved: Vec<ResolvedAttachment> = framebuffer
            .attachments
            .iter()
            .map(|a| ResolvedAttachment {
                output: a.slot.output,
                kind: a.slot.kind,
                samples: a.image.samples(),
                extent: a.image.extent(),
            })
            .collect();
        if validate_attachments(&resolved, device.mixed_samples()).is_err() {
            return Ok(framebuffer);
        }
        framebuffer.extent = resolved[0].extent;

        framebuffer.build(outputs)?;
        framebuffer.valid = true;
        engine_debug!(
            SOURCE,
            "Framebuffer {}x{}: {} attachments, {} samples",
            framebuffer.extent.width, framebuffer.extent.height,
            framebuffer.attachments.len(), framebuffer.samples.count()
        );
        Ok(framebuffer)
    }

    fn attachment_index(&self, kind: AttachmentKind, output: OutputMRT) -> Option<u32> {
        self.attachments
            .iter()
            .find(|a| a.slot.kind == kind && a.slot.output == output)
            .map(|a| a.slot.location)
    }

    fn build(&mut self, outputs: &[OutputBinding]) -> Result<()> {
        let descriptions: Vec<vk::AttachmentDescription> = self
            .attachments
            .iter()
            .map(|a| {
                vk::AttachmentDescription::default()
                    .format(format_to_vk(a.image.format()))
                    .samples(sample_count_to_vk(a.image.samples()))
                    .load_op(load_op_to_vk(a.slot.load))
                    .store_op(vk::AttachmentStoreOp::STORE)
                    .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
                    .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
                    .initial_layout(image_layout_to_vk(a.slot.initial_layout()))
                    .final_layout(image_layout_to_vk(a.slot.final_layout()))
            })
            .collect();

        let unused = vk::AttachmentReference {
            attachment: vk::ATTACHMENT_UNUSED,
            layout: vk::ImageLayout::UNDEFINED,
        };
        let reference = |index: Option<u32>, layout: vk::ImageLayout| match index {
            Some(attachment) => vk::AttachmentReference { attachment, layout },
            None => unused,
        };

        let shader_colors: Vec<&OutputBinding> = outputs.iter().filter(|b| b.output.is_color()).collect();
        let mut color_refs = Vec::with_capacity(shader_colors.len());
        let mut resolve_refs = Vec::with_capacity(shader_colors.len());
        for binding in &shader_colors {
            let color = self.attachment_index(AttachmentKind::Color, binding.output);
            color_refs.push(reference(color, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL));
            resolve_refs.push(reference(
                self.attachment_index(AttachmentKind::Resolve, binding.output),
                vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            ));
        }

        let depth_ref = self
            .attachments
            .iter()
            .find(|a| a.slot.kind == AttachmentKind::Depth)
            .map(|a| vk::AttachmentReference {
                attachment: a.slot.location,
                layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            });

        let mut subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs);
        if self.samples.is_multisampled() && !color_refs.is_empty() {
            subpass = subpass.resolve_attachments(&resolve_refs);
        }
        if let Some(depth_ref) = depth_ref.as_ref() {
            subpass = subpass.depth_stencil_attachment(depth_ref);
        }

        let stage_mask = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
            | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS
            | vk::PipelineStageFlags::LATE_FRAGMENT_TESTS;
        let write_mask =
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE;

        let dependency = vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(stage_mask | vk::PipelineStageFlags::FRAGMENT_SHADER)
            .src_access_mask(write_mask)
            .dst_stage_mask(stage_mask)
            .dst_access_mask(
                write_mask
                    | vk::AccessFlags::COLOR_ATTACHMENT_READ
                    | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ,
            );

        let render_pass_info = vk::RenderPassCreateInfo::default()
            .attachments(&descriptions)
            .subpasses(std::slice::from_ref(&subpass))
            .dependencies(std::slice::from_ref(&dependency));

        self.render_pass = unsafe {
            self.device
                .raw()
                .create_render_pass(&render_pass_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create render pass: {:?}", e))?
        };

        let views: Vec<vk::ImageView> = self.attachments.iter().map(|a| a.image.attachment_view()).collect();
        let framebuffer_info = vk::FramebufferCreateInfo::default()
            .render_pass(self.render_pass)
            .attachments(&views)
            .width(self.extent.width)
            .height(self.extent.height)
            .layers(1);

        self.framebuffer = unsafe {
            self.device
                .raw()
                .create_framebuffer(&framebuffer_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create framebuffer: {:?}", e))?
        };
        Ok(())
    }

    /// True when this framebuffer serves `pass` on swapchain image `image_index`
    pub fn matches(&self, pass: &PassDescription, image_index: u32) -> bool {
        self.key == pass.key() && (!pass.uses_swapchain() || self.image_index == Some(image_index))
    }

    /// Clear values of `pass` in attachment order
    pub fn clear_values(&self, pass: &PassDescription) -> Vec<vk::ClearValue> {
        let slots: Vec<AttachmentSlot> = self.attachments.iter().map(|a| a.slot).collect();
        clear_values(pass, &slots).into_iter().map(clear_value_to_vk).collect()
    }

    /// Render pass begin info limited to `render_area`
    pub fn begin_info<'a>(&self, clear_values: &'a [vk::ClearValue], render_area: Rect2D) -> vk::RenderPassBeginInfo<'a> {
        vk::RenderPassBeginInfo::default()
            .render_pass(self.render_pass)
            .framebuffer(self.framebuffer)
            .render_area(rect_to_vk(render_area))
            .clear_values(clear_values)
    }

    /// `requested` clamped to the framebuffer, or the whole framebuffer
    pub fn viewport(&self, requested: Option<Rect2D>) -> Rect2D {
        requested
            .map(|r| r.clamp_to(self.extent))
            .unwrap_or_else(|| Rect2D::full(self.extent))
    }

    pub fn valid(&self) -> bool {
        self.valid
    }

    pub fn key(&self) -> &PassKey {
        &self.key
    }

    pub fn image_index(&self) -> Option<u32> {
        self.image_index
    }

    pub fn render_pass(&self) -> vk::RenderPass {
        self.render_pass
    }

    pub fn handle(&self) -> vk::Framebuffer {
        self.framebuffer
    }

    pub fn attachments(&self) -> &[FramebufferAttachment] {
        &self.attachments
    }

    pub fn extent(&self) -> Extent2D {
        self.extent
    }

    pub fn samples(&self) -> SampleCount {
        self.samples
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            if self.framebuffer != vk::Framebuffer::null() {
                self.device.raw().destroy_framebuffer(self.framebuffer, None);
            }
            if self.render_pass != vk::RenderPass::null() {
                self.device.raw().destroy_render_pass(self.render_pass, None);
            }
        }
    }
}
