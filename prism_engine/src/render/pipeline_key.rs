/// Graphics pipeline cache key

use crate::render::pass::PassRenderState;
use crate::render::types::{CullMode, PolygonMode, PrimitiveTopology};

/// Vertex input of a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    /// Interleaved buffer described by the vertex shader inputs
    ShaderLayout,
    /// No vertex buffer, vertices are generated in the shader
    Empty,
}

/// Identity of a cached pipeline within one frame's shader data
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub topology: PrimitiveTopology,
    pub polygon_mode: PolygonMode,
    pub cull_mode: CullMode,
    pub vertex_format: VertexFormat,
    /// Index of the framebuffer in the owning frame's cache
    pub framebuffer: usize,
    /// Blend and depth state of the pass the pipeline was requested in
    pub render_state: PassRenderState,
}

/// Linear search of a pipeline cache
pub fn find_pipeline(keys: &[PipelineKey], key: &PipelineKey) -> Option<usize> {
    keys.iter().position(|k| k == key)
}
