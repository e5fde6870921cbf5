/// PipelineShader - a set of shader stages plus everything reflection derives
/// from them: vertex layout, fragment output bindings and descriptor table
///
/// Per frame in flight it owns one descriptor set and one [`ShaderData`]
/// cache of framebuffers, pipelines and UBO buffers. Those are rebuilt by the
/// swapchain whenever it is recreated.
///
/// Binding calls are only legal between `begin_render_pass` and
/// `end_render_pass`. Misuse is logged and reported as `Ok(false)`; the GPU
/// state is left untouched.

use ash::vk;
use prism_engine::prism::render::{
    derive_output_bindings, derive_vertex_layout, AttachmentKind, BindingTracker, BlendFunction, BlendMode,
    Descriptor, DescriptorTable, DescriptorType, ImageLayout, ImageSource, IndexType, OutputBinding, OutputMRT,
    PassDescription, PassRenderState, PipelineKey, PrimitiveTopology, RenderSettings, SampleCount, ShaderStage, ShaderStageFlags,
    VertexFormat, VertexLayout,
};
use prism_engine::prism::Result;
use prism_engine::{engine_debug, engine_err, engine_error, engine_fatal, engine_warn};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

use crate::vulkan_buffer::{Buffer, BufferUsage};
use crate::vulkan_convert::{index_type_to_vk, rect_to_vk, stage_flags_to_vk};
use crate::vulkan_device::{map_vk_result, Device};
use crate::vulkan_framebuffer::Framebuffer;
use crate::vulkan_pipeline::Pipeline;
use crate::vulkan_shader_data::ShaderData;
use crate::vulkan_shader_module::ShaderModule;
use crate::vulkan_swapchain::Swapchain;
use crate::vulkan_texture::TextureImage;

const SOURCE: &str = "prism::shader";

/// A UBO the application asked for, replayed after every rebuild
#[derive(Debug, Clone)]
struct UboRequest {
    shader_var: String,
    item_size: u64,
    item_count: u64,
}

/// Objects bound by the pass in progress, by index
#[derive(Debug, Clone, Copy)]
struct BoundPass {
    frame: usize,
    framebuffer: usize,
    command_buffer: vk::CommandBuffer,
    pipeline: Option<usize>,
}

pub struct PipelineShader {
    device: Arc<Device>,
    modules: Vec<ShaderModule>,
    vertex_layout: VertexLayout,
    output_bindings: Vec<OutputBinding>,
    descriptors: DescriptorTable,
    set_layout: vk::DescriptorSetLayout,
    pipeline_layout: vk::PipelineLayout,
    push_constants: Option<vk::PushConstantRange>,
    descriptor_pool: vk::DescriptorPool,
    /// One set per frame
    descriptor_sets: Vec<vk::DescriptorSet>,
    /// One cache per frame
    shader_data: Vec<ShaderData>,
    ubo_requests: FxHashMap<String, UboRequest>,
    settings: RenderSettings,
    bound: Option<BoundPass>,
    /// Blend and depth state of the pass in progress
    pass_state: PassRenderState,
    tracker: BindingTracker,
    valid: bool,
}

impl PipelineShader {
    /// Build a shader from SPIR-V binaries, one per stage
    ///
    /// The shader renders nothing until it is registered with a
    /// [`Swapchain`], which sizes its per-frame state.
    pub fn new(device: &Arc<Device>, spirv: &[&[u8]]) -> Result<Self> {
        let modules = spirv
            .iter()
            .map(|bytes| ShaderModule::new(device, bytes))
            .collect::<Result<Vec<_>>>()?;

        let stage_of = |stage: ShaderStage| modules.iter().find(|m| m.stage() == stage);
        let (Some(vertex), Some(fragment)) = (stage_of(ShaderStage::Vertex), stage_of(ShaderStage::Fragment)) else {
            return Err(engine_fatal!(
                SOURCE, @ShaderError,
                "A pipeline shader needs a vertex and a fragment stage"
            ));
        };
        for (i, module) in modules.iter().enumerate() {
            if modules[..i].iter().any(|m| m.stage() == module.stage()) {
                return Err(engine_fatal!(SOURCE, @ShaderError, "Stage {:?} given twice", module.stage()));
            }
        }

        let limits = device.limits();
        let inputs = &vertex.reflection().inputs;
        if inputs.len() as u32 >= limits.max_vertex_attributes {
            return Err(engine_fatal!(
                SOURCE, @ShaderError,
                "Vertex stage declares {} inputs, the device allows fewer than {}",
                inputs.len(), limits.max_vertex_attributes
            ));
        }
        let outputs = &fragment.reflection().outputs;
        if outputs.len() as u32 >= limits.max_color_attachments {
            return Err(engine_fatal!(
                SOURCE, @ShaderError,
                "Fragment stage declares {} outputs, the device allows fewer than {}",
                outputs.len(), limits.max_color_attachments
            ));
        }

        let vertex_layout = derive_vertex_layout(inputs)?;
        let output_bindings = derive_output_bindings(outputs, limits.depth_format)?;
        let descriptors = DescriptorTable::build(modules.iter().map(|m| m.reflection()))?;

        let push_constants = modules
            .iter()
            .filter_map(|m| m.reflection().push_constant_size.map(|size| (m.stage().flag(), size)))
            .fold(None, |acc: Option<(ShaderStageFlags, u32)>, (stage, size)| match acc {
                Some((stages, max)) => Some((stages | stage, max.max(size))),
                None => Some((stage, size)),
            })
            .map(|(stages, size)| vk::PushConstantRange {
                stage_flags: stage_flags_to_vk(stages),
                offset: 0,
                size,
            });

        let (set_layout, pipeline_layout) = create_layouts(device, &descriptors, push_constants)?;

        engine_debug!(
            SOURCE,
            "Pipeline shader: {} stages, {} vertex attributes (stride {}), {} outputs, {} descriptors",
            modules.len(),
            vertex_layout.attributes.len(),
            vertex_layout.stride,
            output_bindings.len(),
            descriptors.len()
        );

        Ok(Self {
            device: Arc::clone(device),
            modules,
            vertex_layout,
            output_bindings,
            descriptors,
            set_layout,
            pipeline_layout,
            push_constants,
            descriptor_pool: vk::DescriptorPool::null(),
            descriptor_sets: Vec::new(),
            shader_data: Vec::new(),
            ubo_requests: FxHashMap::default(),
            settings: RenderSettings::default(),
            bound: None,
            pass_state: PassRenderState::default(),
            tracker: BindingTracker::default(),
            valid: true,
        })
    }

    // ===== PER-FRAME STATE =====

    /// Drop every per-frame cache and the descriptor pool
    pub(crate) fn release_frames(&mut self) {
        self.bound = None;
        self.pass_state = PassRenderState::default();
        self.tracker.reset();
        for data in &mut self.shader_data {
            data.clear();
        }
        self.shader_data.clear();
        self.descriptor_sets.clear();
        if self.descriptor_pool != vk::DescriptorPool::null() {
            unsafe {
                self.device.raw().destroy_descriptor_pool(self.descriptor_pool, None);
            }
            self.descriptor_pool = vk::DescriptorPool::null();
        }
    }

    /// Size per-frame state for `frame_count` frames and replay UBO requests
    pub(crate) fn rebuild(&mut self, frame_count: usize, settings: &RenderSettings) -> Result<()> {
        self.release_frames();
        self.settings = *settings;
        self.valid = false;

        if !self.descriptors.is_empty() && frame_count > 0 {
            let sizes = self.descriptors.pool_sizes(frame_count as u32);
            let mut pool_sizes = Vec::with_capacity(2);
            if sizes.ubos > 0 {
                pool_sizes.push(vk::DescriptorPoolSize {
                    ty: vk::DescriptorType::UNIFORM_BUFFER,
                    descriptor_count: sizes.ubos,
                });
            }
            if sizes.samplers > 0 {
                pool_sizes.push(vk::DescriptorPoolSize {
                    ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                    descriptor_count: sizes.samplers,
                });
            }
            let pool_info = vk::DescriptorPoolCreateInfo::default()
                .max_sets(sizes.sets)
                .pool_sizes(&pool_sizes);

            let layouts = vec![self.set_layout; frame_count];
            unsafe {
                self.descriptor_pool = self
                    .device
                    .raw()
                    .create_descriptor_pool(&pool_info, None)
                    .map_err(|e| map_vk_result(e, "create descriptor pool"))?;
                let alloc_info = vk::DescriptorSetAllocateInfo::default()
                    .descriptor_pool(self.descriptor_pool)
                    .set_layouts(&layouts);
                self.descriptor_sets = self
                    .device
                    .raw()
                    .allocate_descriptor_sets(&alloc_info)
                    .map_err(|e| map_vk_result(e, "allocate descriptor sets"))?;
            }
        }

        self.shader_data = (0..frame_count).map(|_| ShaderData::new()).collect();
        let requests: Vec<(String, UboRequest)> =
            self.ubo_requests.iter().map(|(name, request)| (name.clone(), request.clone())).collect();
        for (name, request) in requests {
            self.create_ubo_buffers(&name, &request)?;
        }

        self.valid = true;
        Ok(())
    }

    fn create_ubo_buffers(&mut self, name: &str, request: &UboRequest) -> Result<()> {
        for data in &mut self.shader_data {
            let buffer = Buffer::new(
                &self.device,
                BufferUsage::Uniform,
                request.item_size,
                request.item_count,
                false,
            )?;
            data.insert_ubo(name, buffer);
        }
        Ok(())
    }

    // ===== UNIFORM BUFFERS =====

    /// Create one host-visible UBO per frame backing `shader_var`
    ///
    /// Fails if the shader has no such uniform block, if a UBO for it exists
    /// already, or if the request is larger than the declared block.
    pub fn create_ubo(&mut self, name: &str, shader_var: &str, item_size: u64, item_count: u64) -> Result<()> {
        let Some(byte_size) = item_size.checked_mul(item_count) else {
            return Err(engine_fatal!(
                SOURCE, @InvalidResource,
                "UBO '{}' of {} items of {} bytes overflows",
                name, item_count, item_size
            ));
        };
        let created: FxHashSet<String> = self.ubo_requests.values().map(|r| r.shader_var.clone()).collect();
        self.descriptors.check_ubo_request(shader_var, byte_size, &created)?;
        if self.ubo_requests.contains_key(name) {
            return Err(engine_fatal!(SOURCE, @InvalidResource, "UBO '{}' already exists", name));
        }

        let request = UboRequest {
            shader_var: shader_var.to_string(),
            item_size,
            item_count,
        };
        self.create_ubo_buffers(name, &request)?;
        self.ubo_requests.insert(name.to_string(), request);
        Ok(())
    }

    /// Overwrite the UBO `name` of `frame` with `data`
    pub fn write_ubo(&mut self, frame: usize, name: &str, data: &[u8]) -> Result<()> {
        let Some(buffer) = self.shader_data.get_mut(frame).and_then(|d| d.ubo_mut(name)) else {
            return Err(engine_err!(SOURCE, @InvalidResource, "No UBO '{}' for frame {}", name, frame));
        };
        buffer.write_data(data)
    }

    pub fn write_ubo_pod<T: bytemuck::Pod>(&mut self, frame: usize, name: &str, items: &[T]) -> Result<()> {
        self.write_ubo(frame, name, bytemuck::cast_slice(items))
    }

    // ===== DESCRIPTORS =====

    fn bound_for(&self, what: &str) -> Option<BoundPass> {
        match self.bound {
            Some(bound) if bound.pipeline.is_some() => Some(bound),
            _ => {
                engine_error!(SOURCE, "{} outside a render pass with a bound pipeline", what);
                None
            }
        }
    }

    fn descriptor_of(&self, shader_var: &str, ty: DescriptorType) -> Option<&Descriptor> {
        match self.descriptors.get(shader_var) {
            Some(descriptor) if descriptor.ty == ty => Some(descriptor),
            Some(_) => {
                engine_error!(SOURCE, "Descriptor '{}' is not a {:?}", shader_var, ty);
                None
            }
            None => {
                engine_error!(SOURCE, "Shader declares no descriptor '{}'", shader_var);
                None
            }
        }
    }

    /// Point the UBO's descriptor of the current frame at its buffer
    pub fn bind_ubo(&mut self, name: &str) -> Result<bool> {
        let Some(bound) = self.bound_for("bind_ubo") else {
            return Ok(false);
        };
        let Some(request) = self.ubo_requests.get(name) else {
            engine_error!(SOURCE, "bind_ubo: UBO '{}' was never created", name);
            return Ok(false);
        };
        let Some(descriptor) = self.descriptor_of(&request.shader_var, DescriptorType::Ubo) else {
            return Ok(false);
        };
        let Some(buffer) = self.shader_data[bound.frame].ubo(name) else {
            engine_error!(SOURCE, "bind_ubo: UBO '{}' has no buffer for frame {}", name, bound.frame);
            return Ok(false);
        };

        let buffer_info = [vk::DescriptorBufferInfo {
            buffer: buffer.handle(),
            offset: 0,
            range: buffer.size(),
        }];
        let write = vk::WriteDescriptorSet::default()
            .dst_set(self.descriptor_sets[bound.frame])
            .dst_binding(descriptor.binding)
            .dst_array_element(0)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .buffer_info(&buffer_info);
        unsafe {
            self.device.raw().update_descriptor_sets(&[write], &[]);
        }

        let shader_var = request.shader_var.clone();
        self.tracker.mark_bound(&shader_var);
        Ok(true)
    }

    /// Point the sampler descriptor `shader_var` of the current frame at `texture`
    pub fn bind_sampler(&mut self, shader_var: &str, texture: &TextureImage) -> Result<bool> {
        let Some(bound) = self.bound_for("bind_sampler") else {
            return Ok(false);
        };
        let Some(descriptor) = self.descriptor_of(shader_var, DescriptorType::Sampler) else {
            return Ok(false);
        };
        let Some(sampler) = texture.sampler() else {
            engine_error!(SOURCE, "bind_sampler: texture bound to '{}' cannot be sampled", shader_var);
            return Ok(false);
        };

        let image_info = [vk::DescriptorImageInfo {
            sampler,
            image_view: texture.view(),
            image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        }];
        let write = vk::WriteDescriptorSet::default()
            .dst_set(self.descriptor_sets[bound.frame])
            .dst_binding(descriptor.binding)
            .dst_array_element(0)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .image_info(&image_info);
        unsafe {
            self.device.raw().update_descriptor_sets(&[write], &[]);
        }

        self.tracker.mark_bound(shader_var);
        Ok(true)
    }

    // ===== PASSES =====

    /// Fresh pass description for `frame`, clamped to the device sample limit
    pub fn get_pass(
        &self,
        frame: usize,
        samples: SampleCount,
        blend: BlendFunction,
        blend_mode: BlendMode,
    ) -> PassDescription {
        PassDescription::new(frame, samples, self.device.limits().max_samples, blend, blend_mode)
    }

    /// Resolve `pass` to a cached framebuffer and begin its render pass
    ///
    /// Returns `false` (after logging) when the pass cannot be rendered.
    pub fn begin_render_pass(&mut self, swapchain: &mut Swapchain, pass: &PassDescription) -> Result<bool> {
        if self.bound.is_some() {
            engine_error!(SOURCE, "begin_render_pass called inside another render pass");
            return Ok(false);
        }
        if !self.valid || !pass.valid() {
            engine_error!(SOURCE, "begin_render_pass with an invalid shader or pass description");
            return Ok(false);
        }
        let frame = pass.frame_index();
        let Some(image_index) = swapchain.image_index() else {
            engine_error!(SOURCE, "begin_render_pass outside begin_frame/end_frame");
            return Ok(false);
        };
        if frame != swapchain.frame_index() || frame >= self.shader_data.len() {
            engine_error!(
                SOURCE,
                "Pass built for frame {} but frame {} is being recorded",
                frame,
                swapchain.frame_index()
            );
            return Ok(false);
        }

        let index = match self.shader_data[frame].find_framebuffer(pass, image_index) {
            Some(index) => index,
            None => {
                let outputs = &self.output_bindings;
                let framebuffer_image = pass.uses_swapchain().then_some(image_index);
                let framebuffer = Framebuffer::new(&self.device, pass, framebuffer_image, outputs, |slot| {
                    let format = outputs.iter().find(|b| b.output == slot.output).map(|b| b.format);
                    swapchain.attachment_image(frame, image_index, slot, format)
                })?;
                self.shader_data[frame].add_framebuffer(framebuffer)
            }
        };

        let Some(framebuffer) = self.shader_data[frame].framebuffer(index) else {
            return Err(engine_err!(SOURCE, "Framebuffer {} missing from frame {}", index, frame));
        };
        if !framebuffer.valid() {
            return Ok(false);
        }
        let viewport = framebuffer.viewport(pass.viewport());
        let clear_values = framebuffer.clear_values(pass);

        let Some(render_frame) = swapchain.frame_mut(frame) else {
            return Err(engine_err!(SOURCE, @InvalidResource, "Swapchain has no frame {}", frame));
        };
        let command_buffer = render_frame.command_buffer_mut();
        command_buffer.begin_pass(&framebuffer.begin_info(&clear_values, viewport))?;
        let cb = command_buffer.handle();

        let vk_viewport = vk::Viewport {
            x: viewport.x as f32,
            y: viewport.y as f32,
            width: viewport.width as f32,
            height: viewport.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        unsafe {
            self.device.raw().cmd_set_viewport(cb, 0, &[vk_viewport]);
            self.device.raw().cmd_set_scissor(cb, 0, &[rect_to_vk(viewport)]);
        }

        let colors: Vec<OutputMRT> = self
            .output_bindings
            .iter()
            .filter(|b| b.output.is_color())
            .map(|b| b.output)
            .collect();
        self.pass_state = pass.render_state(&colors);
        self.bound = Some(BoundPass {
            frame,
            framebuffer: index,
            command_buffer: cb,
            pipeline: None,
        });
        Ok(true)
    }

    /// End the current render pass and regenerate render texture mip chains
    pub fn end_render_pass(&mut self, swapchain: &mut Swapchain) -> Result<bool> {
        let Some(bound) = self.bound.take() else {
            engine_error!(SOURCE, "end_render_pass without begin_render_pass");
            return Ok(false);
        };
        self.pass_state = PassRenderState::default();
        self.tracker.reset();

        let Some(render_frame) = swapchain.frame_mut(bound.frame) else {
            return Err(engine_err!(SOURCE, @InvalidResource, "Swapchain has no frame {}", bound.frame));
        };
        render_frame.command_buffer_mut().end_pass()?;

        if let Some(framebuffer) = self.shader_data[bound.frame].framebuffer(bound.framebuffer) {
            for attachment in framebuffer.attachments() {
                let slot = &attachment.slot;
                if matches!(slot.source, ImageSource::RenderTexture(_))
                    && slot.kind != AttachmentKind::Depth
                    && slot.samples == SampleCount::S1
                {
                    attachment
                        .image
                        .record_mip_chain(bound.command_buffer, ImageLayout::ColorAttachmentOptimal);
                }
            }
        }
        Ok(true)
    }

    // ===== PIPELINES =====

    /// Index of the pipeline for `topology` in the current pass, created on a miss
    pub fn get_pipeline(&mut self, topology: PrimitiveTopology, vertex_format: VertexFormat) -> Result<Option<usize>> {
        let Some(bound) = self.bound else {
            engine_error!(SOURCE, "get_pipeline outside a render pass");
            return Ok(None);
        };
        let key = PipelineKey {
            topology,
            polygon_mode: self.settings.polygon_mode,
            cull_mode: self.settings.cull_mode,
            vertex_format,
            framebuffer: bound.framebuffer,
            render_state: self.pass_state.clone(),
        };

        let data = &mut self.shader_data[bound.frame];
        if let Some(index) = data.find_pipeline(&key) {
            return Ok(Some(index));
        }
        let Some(framebuffer) = data.framebuffer(bound.framebuffer) else {
            return Err(engine_err!(SOURCE, "Bound framebuffer {} is gone", bound.framebuffer));
        };
        let pipeline = Pipeline::new(
            &self.device,
            key,
            &self.modules,
            self.pipeline_layout,
            &self.vertex_layout,
            framebuffer,
        )?;
        Ok(Some(data.add_pipeline(pipeline)))
    }

    /// Bind the pipeline for `topology` and `vertex_format`
    pub fn bind_pipeline(&mut self, topology: PrimitiveTopology, vertex_format: VertexFormat) -> Result<bool> {
        let Some(index) = self.get_pipeline(topology, vertex_format)? else {
            return Ok(false);
        };
        let Some(bound) = self.bound.as_mut() else {
            return Ok(false);
        };
        let Some(pipeline) = self.shader_data[bound.frame].pipeline(index) else {
            return Err(engine_err!(SOURCE, "Pipeline {} missing from frame {}", index, bound.frame));
        };
        unsafe {
            self.device
                .raw()
                .cmd_bind_pipeline(bound.command_buffer, vk::PipelineBindPoint::GRAPHICS, pipeline.handle());
        }
        bound.pipeline = Some(index);
        Ok(true)
    }

    // ===== DRAWING =====

    pub fn bind_vertex_buffer(&mut self, buffer: &Buffer) -> Result<bool> {
        let Some(bound) = self.bound_for("bind_vertex_buffer") else {
            return Ok(false);
        };
        if buffer.usage() != BufferUsage::Vertex {
            engine_error!(SOURCE, "bind_vertex_buffer with a {:?} buffer", buffer.usage());
            return Ok(false);
        }
        if buffer.item_size() != self.vertex_layout.stride as u64 {
            engine_warn!(
                SOURCE,
                "Vertex buffer items are {} bytes, the shader layout stride is {}",
                buffer.item_size(),
                self.vertex_layout.stride
            );
        }
        unsafe {
            self.device
                .raw()
                .cmd_bind_vertex_buffers(bound.command_buffer, 0, &[buffer.handle()], &[0]);
        }
        Ok(true)
    }

    pub fn bind_index_buffer(&mut self, buffer: &Buffer, index_type: IndexType) -> Result<bool> {
        let Some(bound) = self.bound_for("bind_index_buffer") else {
            return Ok(false);
        };
        if buffer.usage() != BufferUsage::Index {
            engine_error!(SOURCE, "bind_index_buffer with a {:?} buffer", buffer.usage());
            return Ok(false);
        }
        unsafe {
            self.device.raw().cmd_bind_index_buffer(
                bound.command_buffer,
                buffer.handle(),
                0,
                index_type_to_vk(index_type),
            );
        }
        Ok(true)
    }

    /// Push constant bytes visible to every stage that declares the block
    pub fn push_constants(&mut self, data: &[u8]) -> Result<bool> {
        let Some(bound) = self.bound_for("push_constants") else {
            return Ok(false);
        };
        let Some(range) = self.push_constants else {
            engine_error!(SOURCE, "Shader declares no push constant block");
            return Ok(false);
        };
        if data.len() as u32 > range.size {
            engine_error!(SOURCE, "{} push constant bytes exceed the {}-byte block", data.len(), range.size);
            return Ok(false);
        }
        unsafe {
            self.device
                .raw()
                .cmd_push_constants(bound.command_buffer, self.pipeline_layout, range.stage_flags, 0, data);
        }
        Ok(true)
    }

    /// Warn about unbound descriptors and bind the frame's descriptor set
    fn prepare_draw(&mut self, what: &str) -> Option<BoundPass> {
        let bound = self.bound_for(what)?;
        self.tracker.report_unbound(&self.descriptors);
        if let Some(set) = self.descriptor_sets.get(bound.frame) {
            unsafe {
                self.device.raw().cmd_bind_descriptor_sets(
                    bound.command_buffer,
                    vk::PipelineBindPoint::GRAPHICS,
                    self.pipeline_layout,
                    0,
                    &[*set],
                    &[],
                );
            }
        }
        Some(bound)
    }

    pub fn draw(&mut self, vertex_count: u32, instance_count: u32) -> Result<bool> {
        let Some(bound) = self.prepare_draw("draw") else {
            return Ok(false);
        };
        unsafe {
            self.device
                .raw()
                .cmd_draw(bound.command_buffer, vertex_count, instance_count, 0, 0);
        }
        Ok(true)
    }

    pub fn draw_indexed(&mut self, index_count: u32, instance_count: u32) -> Result<bool> {
        let Some(bound) = self.prepare_draw("draw_indexed") else {
            return Ok(false);
        };
        unsafe {
            self.device
                .raw()
                .cmd_draw_indexed(bound.command_buffer, index_count, instance_count, 0, 0, 0);
        }
        Ok(true)
    }

    // ===== ACCESSORS =====

    /// False until registered with a swapchain, or after a failed rebuild
    pub fn valid(&self) -> bool {
        self.valid && !self.shader_data.is_empty()
    }

    pub fn in_pass(&self) -> bool {
        self.bound.is_some()
    }

    pub fn framebuffer_count(&self, frame: usize) -> usize {
        self.shader_data.get(frame).map_or(0, ShaderData::framebuffer_count)
    }

    pub fn pipeline_count(&self, frame: usize) -> usize {
        self.shader_data.get(frame).map_or(0, ShaderData::pipeline_count)
    }

    pub fn ubo_count(&self, frame: usize) -> usize {
        self.shader_data.get(frame).map_or(0, ShaderData::ubo_count)
    }

    pub fn frame_count(&self) -> usize {
        self.shader_data.len()
    }

    pub fn output_bindings(&self) -> &[OutputBinding] {
        &self.output_bindings
    }

    pub fn vertex_layout(&self) -> &VertexLayout {
        &self.vertex_layout
    }

    pub fn descriptors(&self) -> &DescriptorTable {
        &self.descriptors
    }

    pub fn modules(&self) -> &[ShaderModule] {
        &self.modules
    }
}

/// Descriptor set layout from the table, pipeline layout around it
fn create_layouts(
    device: &Arc<Device>,
    descriptors: &DescriptorTable,
    push_constants: Option<vk::PushConstantRange>,
) -> Result<(vk::DescriptorSetLayout, vk::PipelineLayout)> {
    let bindings: Vec<vk::DescriptorSetLayoutBinding> = descriptors
        .sorted()
        .into_iter()
        .map(|d| {
            let ty = match d.ty {
                DescriptorType::Ubo => vk::DescriptorType::UNIFORM_BUFFER,
                DescriptorType::Sampler => vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            };
            vk::DescriptorSetLayoutBinding::default()
                .binding(d.binding)
                .descriptor_type(ty)
                .descriptor_count(d.array_size)
                .stage_flags(stage_flags_to_vk(d.stages))
        })
        .collect();

    let layout_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
    let set_layout = unsafe {
        device
            .raw()
            .create_descriptor_set_layout(&layout_info, None)
            .map_err(|e| map_vk_result(e, "create descriptor set layout"))?
    };

    let set_layouts = [set_layout];
    let ranges: Vec<vk::PushConstantRange> = push_constants.into_iter().collect();
    let pipeline_layout_info = vk::PipelineLayoutCreateInfo::default()
        .set_layouts(&set_layouts)
        .push_constant_ranges(&ranges);
    let pipeline_layout = unsafe {
        device
            .raw()
            .create_pipeline_layout(&pipeline_layout_info, None)
            .map_err(|e| {
                device.raw().destroy_descriptor_set_layout(set_layout, None);
                map_vk_result(e, "create pipeline layout")
            })?
    };
    Ok((set_layout, pipeline_layout))
}

impl Drop for PipelineShader {
    fn drop(&mut self) {
        self.release_frames();
        unsafe {
            self.device.raw().destroy_pipeline_layout(self.pipeline_layout, None);
            self.device.raw().destroy_descriptor_set_layout(self.set_layout, None);
        }
    }
}
