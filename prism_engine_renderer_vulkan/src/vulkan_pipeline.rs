/// Pipeline - one graphics pipeline built for a framebuffer's render pass
///
/// Cached by `PipelineKey` in the frame's shader data. Blend and depth state
/// come from the key, the render pass and sample count from the framebuffer.
/// The pipeline layout is owned by the pipeline shader and shared by every
/// pipeline it creates.

use ash::vk;
use prism_engine::prism::render::{PipelineKey, VertexFormat, VertexLayout};
use prism_engine::prism::Result;
use prism_engine::{engine_bail, engine_debug, engine_err};
use std::sync::Arc;

use crate::vulkan_convert::{
    blend_attachment, compare_op_to_vk, cull_mode_to_vk, format_to_vk, polygon_mode_to_vk, sample_count_to_vk,
    shader_stage_to_vk, topology_to_vk,
};
use crate::vulkan_device::Device;
use crate::vulkan_framebuffer::Framebuffer;
use crate::vulkan_shader_module::ShaderModule;

const SOURCE: &str = "prism::pipeline";

pub struct Pipeline {
    device: Arc<Device>,
    key: PipelineKey,
    pipeline: vk::Pipeline,
}

impl Pipeline {
    pub fn new(
        device: &Arc<Device>,
        key: PipelineKey,
        modules: &[ShaderModule],
        layout: vk::PipelineLayout,
        vertex_layout: &VertexLayout,
        framebuffer: &Framebuffer,
    ) -> Result<Self> {
        if !framebuffer.valid() {
            engine_bail!(SOURCE, @PipelineError, "Cannot build a pipeline for an invalid framebuffer");
        }

        let stages: Vec<vk::PipelineShaderStageCreateInfo> = modules
            .iter()
            .map(|module| {
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(shader_stage_to_vk(module.stage()))
                    .module(module.handle())
                    .name(module.entry_point())
            })
            .collect();

        // Vertex input state
        let (bindings, attributes) = match key.vertex_format {
            VertexFormat::ShaderLayout if !vertex_layout.is_empty() => {
                let bindings = vec![vk::VertexInputBindingDescription {
                    binding: 0,
                    stride: vertex_layout.stride,
                    input_rate: vk::VertexInputRate::VERTEX,
                }];
                let attributes = vertex_layout
                    .attributes
                    .iter()
                    .map(|attribute| vk::VertexInputAttributeDescription {
                        location: attribute.location,
                        binding: 0,
                        format: format_to_vk(attribute.format),
                        offset: attribute.offset,
                    })
                    .collect();
                (bindings, attributes)
            }
            _ => (Vec::new(), Vec::new()),
        };
        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&bindings)
            .vertex_attribute_descriptions(&attributes);

        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(topology_to_vk(key.topology))
            .primitive_restart_enable(false);

        // Viewport and scissor are dynamic
        let viewports = [vk::Viewport::default()];
        let scissors = [vk::Rect2D::default()];
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewports(&viewports)
            .scissors(&scissors);

        let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(polygon_mode_to_vk(key.polygon_mode))
            .line_width(1.0)
            .cull_mode(cull_mode_to_vk(key.cull_mode))
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .depth_bias_enable(false);

        let depth_stencil_state = match key.render_state.depth {
            Some(depth) => vk::PipelineDepthStencilStateCreateInfo::default()
                .depth_test_enable(true)
                .depth_write_enable(depth.write)
                .depth_compare_op(compare_op_to_vk(depth.compare)),
            None => vk::PipelineDepthStencilStateCreateInfo::default()
                .depth_test_enable(false)
                .depth_write_enable(false)
                .depth_compare_op(vk::CompareOp::ALWAYS),
        }
        .depth_bounds_test_enable(false)
        .stencil_test_enable(false);

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(false)
            .rasterization_samples(sample_count_to_vk(framebuffer.samples()))
            .alpha_to_coverage_enable(false);

        let blend_attachments: Vec<vk::PipelineColorBlendAttachmentState> =
            key.render_state.color_blends.iter().map(blend_attachment).collect();
        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&blend_attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .depth_stencil_state(&depth_stencil_state)
            .multisample_state(&multisample_state)
            .color_blend_state(&color_blend_state)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .render_pass(framebuffer.render_pass())
            .subpass(0);

        let pipelines = unsafe {
            device
                .raw()
                .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create graphics pipeline: {:?}", e.1))?
        };

        engine_debug!(
            SOURCE,
            "Created pipeline {:?}/{:?}/{:?} for framebuffer {}",
            key.topology, key.polygon_mode, key.cull_mode, key.framebuffer
        );

        Ok(Self {
            device: Arc::clone(device),
            key,
            pipeline: pipelines[0],
        })
    }

    pub fn key(&self) -> &PipelineKey {
        &self.key
    }

    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.raw().destroy_pipeline(self.pipeline, None);
        }
    }
}
