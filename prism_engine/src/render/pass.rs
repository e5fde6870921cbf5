/// Pass description - declarative, per-frame description of a render pass
///
/// A `PassDescription` names the frame it renders for, the MSAA sample count
/// and one `OutputDescription` per attachment. Two descriptions with equal
/// [`PassKey`]s resolve to the same cached framebuffer.

use crate::render::output::OutputMRT;
use crate::render::types::{BlendFunction, BlendMode, ClearValue, CompareOp, Rect2D, SampleCount};

/// Opaque identity of a render texture registered with the swapchain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderTextureId(pub u64);

/// Where the image of an attachment comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FboType {
    /// The acquired swapchain image (DefaultColor without a render texture)
    Swapchain,
    /// A render target cached by the frame, keyed by (slot, samples)
    FrameTarget,
    /// A user render texture
    RenderTexture(RenderTextureId),
}

/// One logical attachment of a pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputDescription {
    /// Semantic slot
    pub output: OutputMRT,
    /// Optional render texture receiving this output
    pub render_texture: Option<RenderTextureId>,
    /// Clear on load (`true`) or retain previous contents (`false`)
    pub clear: bool,
    pub clear_value: ClearValue,
    /// Blend function used in [`BlendMode::Independent`]
    pub blend: BlendFunction,
    /// Depth compare op (depth outputs only)
    pub depth_compare: CompareOp,
    pub depth_write: bool,
    /// MSAA resolve target synthesized by the framebuffer builder
    pub resolve: bool,
}

impl OutputDescription {
    /// Color output with a clear value
    pub fn color(output: OutputMRT, clear_value: [f32; 4]) -> Self {
        Self {
            output,
            render_texture: None,
            clear: true,
            clear_value: ClearValue::Color(clear_value),
            blend: BlendFunction::OPAQUE,
            depth_compare: CompareOp::Less,
            depth_write: true,
            resolve: false,
        }
    }

    /// Depth output cleared to 1.0
    pub fn depth() -> Self {
        Self {
            output: OutputMRT::DefaultDepth,
            render_texture: None,
            clear: true,
            clear_value: ClearValue::DEPTH_ONE,
            blend: BlendFunction::OPAQUE,
            depth_compare: CompareOp::Less,
            depth_write: true,
            resolve: false,
        }
    }

    /// Keep the attachment contents instead of clearing
    pub fn retain(mut self) -> Self {
        self.clear = false;
        self
    }

    pub fn with_render_texture(mut self, id: RenderTextureId) -> Self {
        self.render_texture = Some(id);
        self
    }

    pub fn with_blend(mut self, blend: BlendFunction) -> Self {
        self.blend = blend;
        self
    }

    pub fn with_depth_compare(mut self, op: CompareOp, write: bool) -> Self {
        self.depth_compare = op;
        self.depth_write = write;
        self
    }

    /// Physical source of the image
    pub fn fbo_type(&self) -> FboType {
        match (self.render_texture, self.output) {
            (Some(id), _) => FboType::RenderTexture(id),
            (None, OutputMRT::DefaultColor) => FboType::Swapchain,
            (None, _) => FboType::FrameTarget,
        }
    }

    /// Blend function applied to this attachment under `mode`
    pub fn effective_blend(&self, mode: BlendMode, global: BlendFunction) -> BlendFunction {
        match mode {
            BlendMode::Global => global,
            BlendMode::Independent => self.blend,
        }
    }
}

/// Depth test state a pass imposes on the pipelines drawn in it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthState {
    pub compare: CompareOp,
    pub write: bool,
}

/// Per-pass state baked into pipelines but not into framebuffers
///
/// Passes that differ only here share a framebuffer and get distinct pipelines.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PassRenderState {
    /// One blend function per color slot, in the order asked for
    pub color_blends: Vec<BlendFunction>,
    pub depth: Option<DepthState>,
}

/// Structural identity of a pass, used for framebuffer matching
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PassKey {
    pub sample_count: SampleCount,
    pub outputs: Vec<(OutputMRT, bool, FboType)>,
}

/// Declarative description of one render pass
#[derive(Debug, Clone)]
pub struct PassDescription {
    frame_index: usize,
    sample_count: SampleCount,
    outputs: Vec<OutputDescription>,
    blend_mode: BlendMode,
    blend: BlendFunction,
    viewport: Option<Rect2D>,
    valid: bool,
}

impl PassDescription {
    /// Build a pass for `frame_index`, clamping `requested` to `max_samples`
    pub fn new(
        frame_index: usize,
        requested: SampleCount,
        max_samples: SampleCount,
        blend: BlendFunction,
        blend_mode: BlendMode,
    ) -> Self {
        let sample_count = if requested > max_samples {
            crate::engine_warn_once!(
                "prism::pass",
                "Requested {} samples but the device supports at most {}, clamping",
                requested.count(),
                max_samples.count()
            );
            max_samples
        } else {
            requested
        };

        Self {
            frame_index,
            sample_count,
            outputs: Vec::new(),
            blend_mode,
            blend,
            viewport: None,
            valid: true,
        }
    }

    /// Add an attachment
    ///
    /// A slot may appear once per pass and a pass holds at most one depth
    /// output; violations invalidate the description.
    pub fn add_output(&mut self, output: OutputDescription) -> &mut Self {
        if !self.valid {
            return self;
        }
        if self.outputs.iter().any(|o| o.output == output.output) {
            crate::engine_error!("prism::pass", "Output {} added twice to the same pass", output.output);
            self.valid = false;
        } else if output.output.is_depth() && self.outputs.iter().any(|o| o.output.is_depth()) {
            crate::engine_error!("prism::pass", "A pass can hold at most one depth output");
            self.valid = false;
        } else if output.resolve {
            crate::engine_error!("prism::pass", "Resolve outputs are synthesized, they cannot be added");
            self.valid = false;
        } else {
            self.outputs.push(output);
        }
        self
    }

    /// Restrict rendering to a sub-rectangle of the framebuffer
    pub fn set_viewport(&mut self, viewport: Rect2D) -> &mut Self {
        self.viewport = Some(viewport);
        self
    }

    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    pub fn sample_count(&self) -> SampleCount {
        self.sample_count
    }

    pub fn outputs(&self) -> &[OutputDescription] {
        &self.outputs
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn blend(&self) -> BlendFunction {
        self.blend
    }

    pub fn viewport(&self) -> Option<Rect2D> {
        self.viewport
    }

    pub fn valid(&self) -> bool {
        self.valid
    }

    /// True if any attachment targets the acquired swapchain image
    pub fn uses_swapchain(&self) -> bool {
        self.outputs.iter().any(|o| o.fbo_type() == FboType::Swapchain)
    }

    /// Blend per color slot in `colors` order plus the depth state
    ///
    /// Slots the pass does not write get [`BlendFunction::OPAQUE`].
    pub fn render_state(&self, colors: &[OutputMRT]) -> PassRenderState {
        let color_blends = colors
            .iter()
            .map(|slot| {
                self.outputs
                    .iter()
                    .find(|o| o.output == *slot)
                    .map(|o| o.effective_blend(self.blend_mode, self.blend))
                    .unwrap_or(BlendFunction::OPAQUE)
            })
            .collect();
        let depth = self.outputs.iter().find(|o| o.output.is_depth()).map(|o| DepthState {
            compare: o.depth_compare,
            write: o.depth_write,
        });
        PassRenderState { color_blends, depth }
    }

    /// Structural key: sample count plus ordered (slot, clear, type) list
    pub fn key(&self) -> PassKey {
        PassKey {
            sample_count: self.sample_count,
            outputs: self
                .outputs
                .iter()
                .map(|o| (o.output, o.clear, o.fbo_type()))
                .collect(),
        }
    }
}

#[cfg(test)]
#[path = "pass_tests.rs"]
mod tests;
