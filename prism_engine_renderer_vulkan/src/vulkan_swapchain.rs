/// Swapchain - presentation images, the frames in flight and everything
/// whose lifetime is bound to the surface size
///
/// `init_swapchain` tears down and rebuilds the whole per-resolution state:
/// frames, render texture images and the per-frame caches of every
/// registered pipeline shader.

use ash::vk;
use prism_engine::prism::render::{
    AttachmentKind, AttachmentSlot, Extent2D, FrameAction, FrameRing, ImageLayout, ImageSource, MipmapFilter,
    OutputMRT, RenderSettings, RenderTextureId, SampleCount, SurfaceStatus, TextureFormat,
};
use prism_engine::prism::{Error, Result};
use prism_engine::{engine_bail, engine_debug, engine_err, engine_error, engine_info, engine_warn};
use slotmap::{new_key_type, Key, KeyData, SlotMap};
use std::sync::{Arc, Mutex, Weak};

use crate::vulkan_command_buffer::SubmitSync;
use crate::vulkan_convert::{extent_to_vk, format_from_vk};
use crate::vulkan_device::{map_vk_result, Device};
use crate::vulkan_pipeline_shader::PipelineShader;
use crate::vulkan_render_frame::RenderFrame;
use crate::vulkan_render_texture::RenderTexture;
use crate::vulkan_texture::TextureImage;

const SOURCE: &str = "prism::swapchain";

/// Surface formats in order of preference
const PREFERRED_FORMATS: [vk::Format; 2] = [vk::Format::B8G8R8A8_SRGB, vk::Format::R8G8B8A8_SRGB];

/// Format of frame targets whose slot has no shader-declared format
const FALLBACK_TARGET_FORMAT: TextureFormat = TextureFormat::R16G16B16A16Sfloat;

new_key_type! {
    struct RenderTextureKey;
}

fn render_texture_id(key: RenderTextureKey) -> RenderTextureId {
    RenderTextureId(key.data().as_ffi())
}

fn render_texture_key(id: RenderTextureId) -> RenderTextureKey {
    KeyData::from_ffi(id.0).into()
}

/// Classify a failed acquire or present; `None` for plain errors
fn surface_status(result: vk::Result) -> Option<SurfaceStatus> {
    match result {
        vk::Result::ERROR_OUT_OF_DATE_KHR => Some(SurfaceStatus::OutOfDate),
        vk::Result::SUBOPTIMAL_KHR => Some(SurfaceStatus::Suboptimal),
        vk::Result::TIMEOUT | vk::Result::NOT_READY => Some(SurfaceStatus::NotReady),
        vk::Result::ERROR_DEVICE_LOST => Some(SurfaceStatus::DeviceLost),
        _ => None,
    }
}

pub struct Swapchain {
    device: Arc<Device>,
    settings: RenderSettings,
    swapchain_loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    format: TextureFormat,
    extent: Extent2D,
    images: Vec<Arc<TextureImage>>,
    frames: Vec<RenderFrame>,
    ring: FrameRing,
    /// Swapchain image acquired by the frame in progress
    image_index: Option<u32>,
    out_of_date: bool,
    present_count: u64,
    render_textures: SlotMap<RenderTextureKey, RenderTexture>,
    shaders: Vec<Weak<Mutex<PipelineShader>>>,
}

impl Swapchain {
    /// Create the swapchain for a surface of `extent`
    pub fn new(device: &Arc<Device>, extent: Extent2D, settings: RenderSettings) -> Result<Self> {
        let swapchain_loader = ash::khr::swapchain::Device::new(device.instance(), device.raw());
        let mut swapchain = Self {
            device: Arc::clone(device),
            settings,
            swapchain_loader,
            swapchain: vk::SwapchainKHR::null(),
            format: TextureFormat::B8G8R8A8Srgb,
            extent,
            images: Vec::new(),
            frames: Vec::new(),
            ring: FrameRing::new(1, 0),
            image_index: None,
            out_of_date: false,
            present_count: 0,
            render_textures: SlotMap::with_key(),
            shaders: Vec::new(),
        };
        swapchain.init_swapchain(extent)?;
        Ok(swapchain)
    }

    // ===== LIFECYCLE =====

    /// Rebuild everything that depends on the surface size
    pub fn init_swapchain(&mut self, extent: Extent2D) -> Result<()> {
        self.device.wait_idle()?;
        self.destroy_resources()?;
        self.device.wait_idle()?;

        let Some(extent) = self.create_swapchain(extent)? else {
            // Minimized window: nothing to render until the next resize
            self.out_of_date = true;
            return Ok(());
        };
        self.extent = extent;

        let image_count = self.images.len();
        self.frames = (0..image_count)
            .map(|index| RenderFrame::new(&self.device, index))
            .collect::<Result<_>>()?;
        self.ring = FrameRing::new(image_count, image_count);
        self.image_index = None;

        for (_, texture) in self.render_textures.iter_mut() {
            texture.recreate(&self.device, extent, image_count)?;
        }

        self.shaders.retain(|shader| shader.strong_count() > 0);
        for shader in self.shaders.iter().filter_map(Weak::upgrade) {
            let mut shader = shader
                .lock()
                .map_err(|e| engine_err!(SOURCE, "Failed to lock pipeline shader: {}", e))?;
            shader.rebuild(image_count, &self.settings)?;
        }

        self.out_of_date = false;
        engine_info!(
            SOURCE,
            "Swapchain {}x{}: {} images, {:?}",
            extent.width, extent.height, image_count, self.format
        );
        Ok(())
    }

    /// Release per-resolution state; the swapchain handle goes last
    fn destroy_resources(&mut self) -> Result<()> {
        for shader in self.shaders.iter().filter_map(Weak::upgrade) {
            let mut shader = shader
                .lock()
                .map_err(|e| engine_err!(SOURCE, "Failed to lock pipeline shader: {}", e))?;
            shader.release_frames();
        }
        self.frames.clear();
        self.images.clear();
        if self.swapchain != vk::SwapchainKHR::null() {
            unsafe {
                self.swapchain_loader.destroy_swapchain(self.swapchain, None);
            }
            self.swapchain = vk::SwapchainKHR::null();
        }
        Ok(())
    }

    /// Create the swapchain handle and wrap its images
    ///
    /// Returns the chosen extent, or `None` when the surface has zero size.
    fn create_swapchain(&mut self, requested: Extent2D) -> Result<Option<Extent2D>> {
        let physical_device = self.device.physical_device();
        let surface = self.device.surface();
        let surface_loader = self.device.surface_loader();

        let (capabilities, surface_formats, present_modes) = unsafe {
            let capabilities = surface_loader
                .get_physical_device_surface_capabilities(physical_device, surface)
                .map_err(|e| map_vk_result(e, "get surface capabilities"))?;
            let formats = surface_loader
                .get_physical_device_surface_formats(physical_device, surface)
                .map_err(|e| map_vk_result(e, "get surface formats"))?;
            let present_modes = surface_loader
                .get_physical_device_surface_present_modes(physical_device, surface)
                .map_err(|e| map_vk_result(e, "get surface present modes"))?;
            (capabilities, formats, present_modes)
        };

        let extent = if capabilities.current_extent.width != u32::MAX {
            Extent2D::new(capabilities.current_extent.width, capabilities.current_extent.height)
        } else {
            Extent2D::new(
                requested
                    .width
                    .clamp(capabilities.min_image_extent.width, capabilities.max_image_extent.width),
                requested
                    .height
                    .clamp(capabilities.min_image_extent.height, capabilities.max_image_extent.height),
            )
        };
        if extent.is_empty() {
            engine_warn!(SOURCE, "Surface has zero size, swapchain creation deferred");
            return Ok(None);
        }

        let surface_format = PREFERRED_FORMATS
            .iter()
            .find_map(|preferred| surface_formats.iter().find(|f| f.format == *preferred))
            .or_else(|| surface_formats.iter().find(|f| format_from_vk(f.format).is_some()))
            .copied()
            .ok_or_else(|| engine_err!(SOURCE, "Surface exposes no usable format"))?;
        let format = format_from_vk(surface_format.format)
            .ok_or_else(|| engine_err!(SOURCE, "Unsupported surface format {:?}", surface_format.format))?;

        let present_mode = if !self.settings.vsync && present_modes.contains(&vk::PresentModeKHR::MAILBOX) {
            vk::PresentModeKHR::MAILBOX
        } else {
            vk::PresentModeKHR::FIFO
        };

        let mut image_count = self.settings.preferred_image_count.max(capabilities.min_image_count);
        if capabilities.max_image_count > 0 {
            image_count = image_count.min(capabilities.max_image_count);
        }

        let families = [self.device.graphics_family(), self.device.present_family()];
        let mut create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent_to_vk(extent))
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true);
        create_info = if families[0] != families[1] {
            create_info
                .image_sharing_mode(vk::SharingMode::CONCURRENT)
                .queue_family_indices(&families)
        } else {
            create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        };

        let (swapchain, raw_images) = unsafe {
            let swapchain = self
                .swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(|e| map_vk_result(e, "create swapchain"))?;
            let images = self
                .swapchain_loader
                .get_swapchain_images(swapchain)
                .map_err(|e| map_vk_result(e, "get swapchain images"))?;
            (swapchain, images)
        };
        self.swapchain = swapchain;
        self.format = format;

        self.images = raw_images
            .into_iter()
            .map(|image| TextureImage::from_swapchain(&self.device, image, format, extent).map(Arc::new))
            .collect::<Result<_>>()?;

        // Images start undefined; presentable layout lets passes load them
        let images = self.images.clone();
        self.device.execute_one_time(|_, cb| {
            for image in &images {
                image.record_transition(cb, ImageLayout::Undefined, ImageLayout::PresentSrc);
            }
            Ok(())
        })?;

        engine_debug!(SOURCE, "Present mode {:?}, {} images requested", present_mode, image_count);
        Ok(Some(extent))
    }

    /// Track `shader` so its per-frame caches follow swapchain recreation
    pub fn register_shader(&mut self, mut shader: PipelineShader) -> Result<Arc<Mutex<PipelineShader>>> {
        shader.rebuild(self.frames.len(), &self.settings)?;
        let shader = Arc::new(Mutex::new(shader));
        self.shaders.push(Arc::downgrade(&shader));
        Ok(shader)
    }

    // ===== FRAME LOOP =====

    /// Wait for the fence of `frame`; `false` when the wait timed out
    fn wait_frame_fence(&mut self, frame: usize, timeout: u64) -> Result<bool> {
        let fence = self.frames[frame].in_flight();
        let waited = unsafe { self.device.raw().wait_for_fences(&[fence], true, timeout) };
        match waited {
            Ok(()) => {
                self.ring.fence_waited(frame);
                Ok(true)
            }
            Err(vk::Result::TIMEOUT) => Ok(false),
            Err(e) => Err(map_vk_result(e, "wait for frame fence")),
        }
    }

    /// Start the next frame
    ///
    /// Returns the frame index to render with, or `None` when the frame must
    /// be skipped (swapchain out of date, or not ready under a polling policy).
    pub fn begin_frame(&mut self) -> Result<Option<usize>> {
        if self.image_index.is_some() {
            engine_bail!(SOURCE, @ValidationError, "begin_frame called twice without end_frame");
        }
        if self.out_of_date || self.swapchain == vk::SwapchainKHR::null() {
            return Ok(None);
        }

        let frame_index = self.ring.current();
        let timeout = self.settings.fence_wait.timeout_ns();
        if self.ring.fence_pending(frame_index) && !self.wait_frame_fence(frame_index, timeout)? {
            return Ok(None);
        }

        let acquired = unsafe {
            self.swapchain_loader.acquire_next_image(
                self.swapchain,
                timeout,
                self.frames[frame_index].image_available(),
                vk::Fence::null(),
            )
        };
        let (image_index, status) = match acquired {
            Ok((index, false)) => (index, SurfaceStatus::Optimal),
            Ok((index, true)) => (index, SurfaceStatus::Suboptimal),
            Err(e) => match surface_status(e) {
                Some(status) => (0, status),
                None => return Err(map_vk_result(e, "acquire swapchain image")),
            },
        };

        match status.action() {
            FrameAction::Proceed => {}
            FrameAction::Recreate => {
                engine_debug!(SOURCE, "Swapchain {:?} on acquire, frame skipped", status);
                self.out_of_date = true;
                return Ok(None);
            }
            FrameAction::Skip => return Ok(None),
            FrameAction::Fatal => {
                engine_error!(SOURCE, "Device lost while acquiring a swapchain image");
                return Err(Error::DeviceLost);
            }
        }

        // The image may still be written by another frame's submission
        if let Some(guard) = self.ring.image_guard(image_index as usize) {
            if guard != frame_index {
                self.wait_frame_fence(guard, u64::MAX)?;
            }
        }
        self.ring.assign_image(image_index as usize, frame_index);

        let frame = &mut self.frames[frame_index];
        frame.begin()?;
        frame.command_buffer_mut().begin()?;
        self.image_index = Some(image_index);
        Ok(Some(frame_index))
    }

    /// Submit the current frame and present its image
    ///
    /// Returns `true` when the image was presented. An out-of-date or
    /// suboptimal surface marks the swapchain for recreation.
    pub fn end_frame(&mut self) -> Result<bool> {
        let Some(image_index) = self.image_index else {
            engine_bail!(SOURCE, @ValidationError, "end_frame called without a frame in progress");
        };
        let frame_index = self.ring.current();
        let frame = &mut self.frames[frame_index];

        frame.command_buffer_mut().end()?;
        let fence = frame.in_flight();
        unsafe {
            self.device
                .raw()
                .reset_fences(&[fence])
                .map_err(|e| map_vk_result(e, "reset frame fence"))?;
        }
        let wait = [(frame.image_available(), vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)];
        let signal = [frame.render_finished()];
        frame.command_buffer_mut().submit(&SubmitSync {
            wait: &wait,
            signal: &signal,
            fence: Some(fence),
            wait_idle: false,
        })?;
        self.ring.fence_submitted(frame_index);
        frame.end()?;

        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&signal)
            .swapchains(&swapchains)
            .image_indices(&image_indices);
        let presented = unsafe {
            self.swapchain_loader
                .queue_present(self.device.present_queue(), &present_info)
        };

        self.image_index = None;
        self.ring.advance();

        let status = match presented {
            Ok(false) => SurfaceStatus::Optimal,
            Ok(true) => SurfaceStatus::Suboptimal,
            Err(e) => match surface_status(e) {
                Some(status) => status,
                None => return Err(map_vk_result(e, "present swapchain image")),
            },
        };
        let was_presented = matches!(status, SurfaceStatus::Optimal | SurfaceStatus::Suboptimal);
        if was_presented {
            self.present_count += 1;
        }

        match status.action() {
            FrameAction::Proceed | FrameAction::Skip => {}
            FrameAction::Recreate => {
                engine_debug!(SOURCE, "Swapchain {:?} on present", status);
                self.out_of_date = true;
            }
            FrameAction::Fatal => {
                engine_error!(SOURCE, "Device lost while presenting");
                return Err(Error::DeviceLost);
            }
        }
        Ok(was_presented)
    }

    // ===== RENDER TEXTURES =====

    /// Register a render texture sized like the swapchain
    pub fn create_render_texture(
        &mut self,
        name: &str,
        format: TextureFormat,
        mipmap_filter: MipmapFilter,
    ) -> RenderTextureId {
        let extent = self.extent;
        let frame_count = self.frames.len();
        let key = self.render_textures.insert_with_key(|key| {
            RenderTexture::new(render_texture_id(key), name, format, mipmap_filter, extent, frame_count)
        });
        engine_debug!(SOURCE, "Render texture '{}' registered", name);
        render_texture_id(key)
    }

    pub fn destroy_render_texture(&mut self, id: RenderTextureId) -> bool {
        self.render_textures.remove(render_texture_key(id)).is_some()
    }

    pub fn render_texture(&self, id: RenderTextureId) -> Option<&RenderTexture> {
        self.render_textures.get(render_texture_key(id))
    }

    /// Image of render texture `id` for `frame` and `samples`
    pub fn render_texture_image(
        &mut self,
        id: RenderTextureId,
        frame: usize,
        samples: SampleCount,
    ) -> Result<Arc<TextureImage>> {
        let Some(texture) = self.render_textures.get_mut(render_texture_key(id)) else {
            engine_bail!(SOURCE, @InvalidResource, "Unknown render texture {:?}", id);
        };
        texture.image(&self.device, frame, samples)
    }

    /// Image behind a planned attachment
    ///
    /// `shader_format` is the format the fragment shader declares for the
    /// slot, used for frame targets other than the default color and depth.
    pub fn attachment_image(
        &mut self,
        frame: usize,
        image_index: u32,
        slot: &AttachmentSlot,
        shader_format: Option<TextureFormat>,
    ) -> Result<Arc<TextureImage>> {
        match slot.source {
            ImageSource::SwapchainImage => self.images.get(image_index as usize).cloned().ok_or_else(|| {
                engine_err!(SOURCE, @InvalidResource, "Swapchain has no image {}", image_index)
            }),
            ImageSource::FrameTarget => {
                let format = if slot.kind == AttachmentKind::Depth {
                    self.device.limits().depth_format
                } else if slot.output == OutputMRT::DefaultColor {
                    self.format
                } else {
                    shader_format.unwrap_or(FALLBACK_TARGET_FORMAT)
                };
                let extent = self.extent;
                let Some(render_frame) = self.frames.get_mut(frame) else {
                    engine_bail!(SOURCE, @InvalidResource, "Swapchain has no frame {}", frame);
                };
                render_frame.target(slot.output, slot.samples, extent, format)
            }
            ImageSource::RenderTexture(id) => self.render_texture_image(id, frame, slot.samples),
        }
    }

    // ===== ACCESSORS =====

    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Settings apply from the next `init_swapchain`
    pub fn set_settings(&mut self, settings: RenderSettings) {
        self.settings = settings;
    }

    /// Index of the frame being recorded (or the next one)
    pub fn frame_index(&self) -> usize {
        self.ring.current()
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frame(&self, index: usize) -> Option<&RenderFrame> {
        self.frames.get(index)
    }

    pub fn frame_mut(&mut self, index: usize) -> Option<&mut RenderFrame> {
        self.frames.get_mut(index)
    }

    pub fn image_index(&self) -> Option<u32> {
        self.image_index
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Presentation image `index`
    pub fn image(&self, index: usize) -> Option<&Arc<TextureImage>> {
        self.images.get(index)
    }

    pub fn extent(&self) -> Extent2D {
        self.extent
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    /// True once acquire or present reported a stale surface
    pub fn is_out_of_date(&self) -> bool {
        self.out_of_date
    }

    /// Successful presents since creation
    pub fn present_count(&self) -> u64 {
        self.present_count
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        self.device.wait_idle().ok();
        self.destroy_resources().ok();
        self.render_textures.clear();
    }
}
