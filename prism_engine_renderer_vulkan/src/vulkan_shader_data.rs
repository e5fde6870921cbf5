/// ShaderData - per (shader, frame) cache of framebuffers, pipelines and UBOs
///
/// Pipelines refer to their framebuffer by index into `framebuffers`, never
/// by handle. The whole cache is dropped when the swapchain is recreated.

use prism_engine::prism::render::{find_pipeline, PassDescription, PipelineKey};
use rustc_hash::FxHashMap;

use crate::vulkan_buffer::Buffer;
use crate::vulkan_framebuffer::Framebuffer;
use crate::vulkan_pipeline::Pipeline;

#[derive(Default)]
pub struct ShaderData {
    framebuffers: Vec<Framebuffer>,
    pipeline_keys: Vec<PipelineKey>,
    pipelines: Vec<Pipeline>,
    /// UBO backing buffers keyed by UBO name
    ubos: FxHashMap<String, Buffer>,
}

impl ShaderData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the cached framebuffer serving `pass`
    pub fn find_framebuffer(&self, pass: &PassDescription, image_index: u32) -> Option<usize> {
        self.framebuffers.iter().position(|fb| fb.matches(pass, image_index))
    }

    pub fn add_framebuffer(&mut self, framebuffer: Framebuffer) -> usize {
        self.framebuffers.push(framebuffer);
        self.framebuffers.len() - 1
    }

    pub fn framebuffer(&self, index: usize) -> Option<&Framebuffer> {
        self.framebuffers.get(index)
    }

    pub fn find_pipeline(&self, key: &PipelineKey) -> Option<usize> {
        find_pipeline(&self.pipeline_keys, key)
    }

    pub fn add_pipeline(&mut self, pipeline: Pipeline) -> usize {
        self.pipeline_keys.push(pipeline.key().clone());
        self.pipelines.push(pipeline);
        self.pipelines.len() - 1
    }

    pub fn pipeline(&self, index: usize) -> Option<&Pipeline> {
        self.pipelines.get(index)
    }

    pub fn insert_ubo(&mut self, name: &str, buffer: Buffer) {
        self.ubos.insert(name.to_string(), buffer);
    }

    pub fn ubo(&self, name: &str) -> Option<&Buffer> {
        self.ubos.get(name)
    }

    pub fn ubo_mut(&mut self, name: &str) -> Option<&mut Buffer> {
        self.ubos.get_mut(name)
    }

    pub fn framebuffer_count(&self) -> usize {
        self.framebuffers.len()
    }

    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    pub fn ubo_count(&self) -> usize {
        self.ubos.len()
    }

    /// Drop framebuffer-dependent objects, pipelines first
    pub fn clear(&mut self) {
        self.pipelines.clear();
        self.pipeline_keys.clear();
        self.framebuffers.clear();
        self.ubos.clear();
    }
}
