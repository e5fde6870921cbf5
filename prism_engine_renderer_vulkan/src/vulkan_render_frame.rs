/// RenderFrame - one frame in flight: sync objects, command buffer and the
/// render targets passes draw into when no render texture is named
///
/// Targets are cached per (slot, sample count). A slot may hold a
/// multisampled image and its single-sample twin, nothing more.

use ash::vk;
use prism_engine::prism::render::{Extent2D, FrameState, ImageLayout, OutputMRT, SampleCount, TextureFormat};
use prism_engine::prism::Result;
use prism_engine::{engine_debug, engine_fatal};
use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::vulkan_command_buffer::CommandBuffer;
use crate::vulkan_device::{map_vk_result, Device};
use crate::vulkan_texture::{TextureDesc, TextureImage};

const SOURCE: &str = "prism::frame";

/// Sample-count variants cached per slot
const MAX_TARGET_VARIANTS: usize = 2;

pub struct RenderFrame {
    device: Arc<Device>,
    index: usize,
    image_available: vk::Semaphore,
    render_finished: vk::Semaphore,
    in_flight: vk::Fence,
    command_buffer: CommandBuffer,
    targets: FxHashMap<(OutputMRT, SampleCount), Arc<TextureImage>>,
    state: FrameState,
}

impl RenderFrame {
    pub fn new(device: &Arc<Device>, index: usize) -> Result<Self> {
        let semaphore_info = vk::SemaphoreCreateInfo::default();
        // Unsignaled: the frame ring knows no submission is pending yet
        let fence_info = vk::FenceCreateInfo::default();

        let (image_available, render_finished, in_flight) = unsafe {
            let raw = device.raw();
            let image_available = raw
                .create_semaphore(&semaphore_info, None)
                .map_err(|e| map_vk_result(e, "create image-available semaphore"))?;
            let render_finished = raw
                .create_semaphore(&semaphore_info, None)
                .map_err(|e| map_vk_result(e, "create render-finished semaphore"))?;
            let in_flight = raw
                .create_fence(&fence_info, None)
                .map_err(|e| map_vk_result(e, "create in-flight fence"))?;
            (image_available, render_finished, in_flight)
        };

        Ok(Self {
            device: Arc::clone(device),
            index,
            image_available,
            render_finished,
            in_flight,
            command_buffer: CommandBuffer::new(device)?,
            targets: FxHashMap::default(),
            state: FrameState::Unset,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn image_available(&self) -> vk::Semaphore {
        self.image_available
    }

    pub fn render_finished(&self) -> vk::Semaphore {
        self.render_finished
    }

    pub fn in_flight(&self) -> vk::Fence {
        self.in_flight
    }

    pub fn command_buffer(&self) -> &CommandBuffer {
        &self.command_buffer
    }

    pub fn command_buffer_mut(&mut self) -> &mut CommandBuffer {
        &mut self.command_buffer
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub(crate) fn begin(&mut self) -> Result<()> {
        let state = self.state;
        self.state = state.begin().map_err(|e| engine_fatal!(SOURCE, @ValidationError, "Frame {}: {}", self.index, e))?;
        Ok(())
    }

    pub(crate) fn end(&mut self) -> Result<()> {
        let state = self.state;
        self.state = state.end().map_err(|e| engine_fatal!(SOURCE, @ValidationError, "Frame {}: {}", self.index, e))?;
        Ok(())
    }

    /// Cached render target for `output`, created on first use
    pub fn target(
        &mut self,
        output: OutputMRT,
        samples: SampleCount,
        extent: Extent2D,
        format: TextureFormat,
    ) -> Result<Arc<TextureImage>> {
        if let Some(image) = self.targets.get(&(output, samples)) {
            return Ok(Arc::clone(image));
        }

        let variants = self.targets.keys().filter(|(o, _)| *o == output).count();
        if variants >= MAX_TARGET_VARIANTS {
            return Err(engine_fatal!(
                SOURCE, @PipelineError,
                "Frame {} already caches {} sample-count variants of {}, cannot add {} samples",
                self.index, variants, output, samples.count()
            ));
        }

        let desc = if format.is_depth() {
            TextureDesc::depth_attachment(extent, format, samples)
        } else {
            let mut desc = TextureDesc::color_attachment(extent, format, samples);
            desc.layout = ImageLayout::ColorAttachmentOptimal;
            desc
        };
        let image = Arc::new(TextureImage::new(&self.device, desc)?);
        engine_debug!(
            SOURCE,
            "Frame {}: created {} target {}x{} with {} samples",
            self.index, output, extent.width, extent.height, samples.count()
        );
        self.targets.insert((output, samples), Arc::clone(&image));
        Ok(image)
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }
}

impl Drop for RenderFrame {
    fn drop(&mut self) {
        unsafe {
            let raw = self.device.raw();
            raw.destroy_fence(self.in_flight, None);
            raw.destroy_semaphore(self.render_finished, None);
            raw.destroy_semaphore(self.image_available, None);
        }
    }
}
