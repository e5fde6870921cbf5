/// TextureImage - GPU image, memory, views, optional sampler and mip chain
///
/// The `TextureType` fixes usage flags, aspect and the layout the image rests
/// in between uses. Swapchain images are wrapped view-only: the presentation
/// engine owns the image and its memory.

use ash::vk;
use gpu_allocator::vulkan::Allocation;
use gpu_allocator::MemoryLocation;
use prism_engine::prism::render::{
    mip_level_count, plan_mip_chain, Extent2D, ImageLayout, MipmapFilter, SampleCount, TextureFormat,
    TextureType,
};
use prism_engine::prism::Result;
use prism_engine::{engine_bail, engine_debug, engine_err, engine_warn_once};
use std::sync::Arc;

use crate::vulkan_convert::{
    aspect_of, format_to_vk, image_layout_to_vk, layout_access, mipmap_filter_to_vk, sample_count_to_vk,
};
use crate::vulkan_device::Device;
use crate::vulkan_device_buffer::DeviceBuffer;

const SOURCE: &str = "prism::vulkan";

/// Creation parameters of a [`TextureImage`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureDesc {
    pub extent: Extent2D,
    pub format: TextureFormat,
    pub texture_type: TextureType,
    pub samples: SampleCount,
    pub mipmap_filter: MipmapFilter,
    pub anisotropy: Option<f32>,
    /// Layout the image is left in after creation and after each use
    pub layout: ImageLayout,
}

impl TextureDesc {
    /// Offscreen color attachment; single-sample images are also sampled
    pub fn color_attachment(extent: Extent2D, format: TextureFormat, samples: SampleCount) -> Self {
        let layout = if samples.is_multisampled() {
            ImageLayout::ColorAttachmentOptimal
        } else {
            ImageLayout::ShaderReadOnlyOptimal
        };
        Self {
            extent,
            format,
            texture_type: TextureType::ColorAttachment,
            samples,
            mipmap_filter: MipmapFilter::Disabled,
            anisotropy: None,
            layout,
        }
    }

    pub fn depth_attachment(extent: Extent2D, format: TextureFormat, samples: SampleCount) -> Self {
        Self {
            extent,
            format,
            texture_type: TextureType::DepthAttachment,
            samples,
            mipmap_filter: MipmapFilter::Disabled,
            anisotropy: None,
            layout: ImageLayout::DepthStencilAttachmentOptimal,
        }
    }

    fn usage(&self) -> vk::ImageUsageFlags {
        match self.texture_type {
            TextureType::ColorSampled => {
                vk::ImageUsageFlags::SAMPLED
                    | vk::ImageUsageFlags::TRANSFER_DST
                    | vk::ImageUsageFlags::TRANSFER_SRC
            }
            TextureType::ColorAttachment if self.samples.is_multisampled() => {
                vk::ImageUsageFlags::COLOR_ATTACHMENT
            }
            TextureType::ColorAttachment => {
                vk::ImageUsageFlags::COLOR_ATTACHMENT
                    | vk::ImageUsageFlags::SAMPLED
                    | vk::ImageUsageFlags::TRANSFER_SRC
                    | vk::ImageUsageFlags::TRANSFER_DST
            }
            TextureType::DepthAttachment => vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            TextureType::Swapchain => {
                vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST
            }
        }
    }

    fn is_sampled(&self) -> bool {
        matches!(self.texture_type, TextureType::ColorSampled | TextureType::ColorAttachment)
            && !self.samples.is_multisampled()
    }
}

/// Pixels read back from an image, tightly packed RGBA8
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePixels {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

pub struct TextureImage {
    device: Arc<Device>,
    image: vk::Image,
    /// None for swapchain images
    allocation: Option<Allocation>,
    /// View over every mip level
    view: vk::ImageView,
    /// Level-0 view used as attachment when the image has a mip chain
    attachment_view: Option<vk::ImageView>,
    sampler: Option<vk::Sampler>,
    desc: TextureDesc,
    mip_levels: u32,
}

/// Mip levels an image of `format` and `extent` gets under `filter`
fn mip_levels_for(device: &Device, extent: Extent2D, format: TextureFormat, filter: MipmapFilter) -> u32 {
    if !filter.is_enabled() {
        return 1;
    }
    if !device.supports_linear_blit(format) {
        engine_warn_once!(
            SOURCE,
            "Format {:?} does not support linear blits, mipmaps are disabled",
            format
        );
        return 1;
    }
    mip_level_count(extent.width, extent.height)
}

fn create_view(
    device: &Device,
    image: vk::Image,
    format: TextureFormat,
    base_mip_level: u32,
    level_count: u32,
) -> Result<vk::ImageView> {
    let view_info = vk::ImageViewCreateInfo::default()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format_to_vk(format))
        .components(vk::ComponentMapping {
            r: vk::ComponentSwizzle::IDENTITY,
            g: vk::ComponentSwizzle::IDENTITY,
            b: vk::ComponentSwizzle::IDENTITY,
            a: vk::ComponentSwizzle::IDENTITY,
        })
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask: aspect_of(format),
            base_mip_level,
            level_count,
            base_array_layer: 0,
            layer_count: 1,
        });

    unsafe {
        device
            .raw()
            .create_image_view(&view_info, None)
            .map_err(|e| engine_err!(SOURCE, "Failed to create image view: {:?}", e))
    }
}

impl TextureImage {
    /// Allocate an image and leave it in `desc.layout`
    pub fn new(device: &Arc<Device>, desc: TextureDesc) -> Result<Self> {
        if desc.extent.is_empty() {
            engine_bail!(
                SOURCE, @InvalidResource,
                "Texture of {}x{} pixels is empty",
                desc.extent.width, desc.extent.height
            );
        }
        if desc.texture_type == TextureType::Swapchain {
            engine_bail!(SOURCE, @InvalidResource, "Swapchain images are wrapped with from_swapchain");
        }

        let mip_levels = if desc.samples.is_multisampled() || desc.texture_type.is_depth() {
            1
        } else {
            mip_levels_for(device, desc.extent, desc.format, desc.mipmap_filter)
        };

        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format_to_vk(desc.format))
            .extent(vk::Extent3D {
                width: desc.extent.width,
                height: desc.extent.height,
                depth: 1,
            })
            .mip_levels(mip_levels)
            .array_layers(1)
            .samples(sample_count_to_vk(desc.samples))
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(desc.usage())
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = unsafe {
            device
                .raw()
                .create_image(&image_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create image: {:?}", e))?
        };

        let requirements = unsafe { device.raw().get_image_memory_requirements(image) };
        let allocation = match device.allocate("texture", requirements, MemoryLocation::GpuOnly, false) {
            Ok(allocation) => allocation,
            Err(e) => {
                unsafe { device.raw().destroy_image(image, None) };
                return Err(e);
            }
        };

        // From here on Drop releases whatever was created
        let mut texture = Self {
            device: Arc::clone(device),
            image,
            allocation: None,
            view: vk::ImageView::null(),
            attachment_view: None,
            sampler: None,
            desc,
            mip_levels,
        };

        unsafe {
            let bound = device
                .raw()
                .bind_image_memory(image, allocation.memory(), allocation.offset());
            texture.allocation = Some(allocation);
            bound.map_err(|e| engine_err!(SOURCE, "Failed to bind image memory: {:?}", e))?;
        }

        texture.view = create_view(device, image, desc.format, 0, mip_levels)?;
        if mip_levels > 1 && desc.texture_type == TextureType::ColorAttachment {
            texture.attachment_view = Some(create_view(device, image, desc.format, 0, 1)?);
        }
        if desc.is_sampled() {
            texture.sampler = Some(texture.create_sampler()?);
        }

        if desc.layout != ImageLayout::Undefined {
            device.execute_one_time(|_, cb| {
                texture.record_transition(cb, ImageLayout::Undefined, desc.layout);
                Ok(())
            })?;
        }

        engine_debug!(
            SOURCE,
            "Created {:?} image {}x{} ({:?}, {} samples, {} mips)",
            desc.texture_type, desc.extent.width, desc.extent.height,
            desc.format, desc.samples.count(), mip_levels
        );
        Ok(texture)
    }

    /// Sampled RGBA8 texture uploaded from `rgba` with a generated mip chain
    pub fn from_pixels(
        device: &Arc<Device>,
        rgba: &[u8],
        width: u32,
        height: u32,
        mipmap_filter: MipmapFilter,
        anisotropy: Option<f32>,
    ) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            engine_bail!(
                SOURCE, @InvalidResource,
                "Pixel buffer holds {} bytes, a {}x{} RGBA image needs {}",
                rgba.len(), width, height, expected
            );
        }

        let mut texture = Self::new(
            device,
            TextureDesc {
                extent: Extent2D::new(width, height),
                format: TextureFormat::R8G8B8A8Srgb,
                texture_type: TextureType::ColorSampled,
                samples: SampleCount::S1,
                mipmap_filter,
                anisotropy,
                layout: ImageLayout::Undefined,
            },
        )?;

        let staging = DeviceBuffer::new(device, vk::BufferUsageFlags::TRANSFER_SRC, 4, (expected / 4) as u64, true)?;
        staging.copy_from_host(0, rgba)?;

        device.execute_one_time(|raw, cb| {
            texture.record_transition(cb, ImageLayout::Undefined, ImageLayout::TransferDstOptimal);

            let region = vk::BufferImageCopy::default()
                .buffer_offset(0)
                .buffer_row_length(0)
                .buffer_image_height(0)
                .image_subresource(vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: 0,
                    base_array_layer: 0,
                    layer_count: 1,
                })
                .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
                .image_extent(vk::Extent3D { width, height, depth: 1 });

            unsafe {
                raw.cmd_copy_buffer_to_image(
                    cb,
                    staging.handle(),
                    texture.image,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[region],
                );
            }

            texture.record_mip_chain(cb, ImageLayout::TransferDstOptimal);
            Ok(())
        })?;

        texture.desc.layout = ImageLayout::ShaderReadOnlyOptimal;
        Ok(texture)
    }

    /// Wrap an image owned by the swapchain
    pub fn from_swapchain(
        device: &Arc<Device>,
        image: vk::Image,
        format: TextureFormat,
        extent: Extent2D,
    ) -> Result<Self> {
        let view = create_view(device, image, format, 0, 1)?;
        Ok(Self {
            device: Arc::clone(device),
            image,
            allocation: None,
            view,
            attachment_view: None,
            sampler: None,
            desc: TextureDesc {
                extent,
                format,
                texture_type: TextureType::Swapchain,
                samples: SampleCount::S1,
                mipmap_filter: MipmapFilter::Disabled,
                anisotropy: None,
                layout: ImageLayout::PresentSrc,
            },
            mip_levels: 1,
        })
    }

    fn create_sampler(&self) -> Result<vk::Sampler> {
        let limits = self.device.limits();
        let mipmap_mode = match self.desc.mipmap_filter {
            MipmapFilter::Nearest => vk::SamplerMipmapMode::NEAREST,
            MipmapFilter::Linear | MipmapFilter::Disabled => vk::SamplerMipmapMode::LINEAR,
        };

        let mut sampler_info = vk::SamplerCreateInfo::default()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .mipmap_mode(mipmap_mode)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .mip_lod_bias(0.0)
            .min_lod(0.0)
            .max_lod(self.mip_levels as f32)
            .border_color(vk::BorderColor::FLOAT_OPAQUE_BLACK)
            .unnormalized_coordinates(false)
            .compare_enable(false)
            .compare_op(vk::CompareOp::ALWAYS);

        sampler_info = match self.desc.anisotropy {
            Some(requested) if limits.sampler_anisotropy => sampler_info
                .anisotropy_enable(true)
                .max_anisotropy(requested.min(limits.max_anisotropy)),
            _ => sampler_info.anisotropy_enable(false).max_anisotropy(1.0),
        };

        unsafe {
            self.device
                .raw()
                .create_sampler(&sampler_info, None)
                .map_err(|e| engine_err!(SOURCE, "Failed to create sampler: {:?}", e))
        }
    }

    // ===== ACCESSORS =====

    pub fn handle(&self) -> vk::Image {
        self.image
    }

    /// View over all mip levels, used for sampling
    pub fn view(&self) -> vk::ImageView {
        self.view
    }

    /// View bound as framebuffer attachment (mip level 0)
    pub fn attachment_view(&self) -> vk::ImageView {
        self.attachment_view.unwrap_or(self.view)
    }

    pub fn sampler(&self) -> Option<vk::Sampler> {
        self.sampler
    }

    pub fn extent(&self) -> Extent2D {
        self.desc.extent
    }

    pub fn format(&self) -> TextureFormat {
        self.desc.format
    }

    pub fn texture_type(&self) -> TextureType {
        self.desc.texture_type
    }

    pub fn samples(&self) -> SampleCount {
        self.desc.samples
    }

    pub fn mip_levels(&self) -> u32 {
        self.mip_levels
    }

    /// Layout the image rests in between uses
    pub fn layout(&self) -> ImageLayout {
        self.desc.layout
    }

    // ===== COMMAND RECORDING =====

    fn barrier(
        &self,
        cb: vk::CommandBuffer,
        old: ImageLayout,
        new: ImageLayout,
        base_mip_level: u32,
        level_count: u32,
    ) {
        let (src_access, src_stage) = layout_access(old);
        let (dst_access, dst_stage) = layout_access(new);

        let barrier = vk::ImageMemoryBarrier::default()
            .old_layout(image_layout_to_vk(old))
            .new_layout(image_layout_to_vk(new))
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(self.image)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: aspect_of(self.desc.format),
                base_mip_level,
                level_count,
                base_array_layer: 0,
                layer_count: 1,
            })
            .src_access_mask(src_access)
            .dst_access_mask(dst_access);

        unsafe {
            self.device.raw().cmd_pipeline_barrier(
                cb,
                src_stage,
                dst_stage,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[barrier],
            );
        }
    }

    /// Record a layout transition of every mip level
    pub fn record_transition(&self, cb: vk::CommandBuffer, old: ImageLayout, new: ImageLayout) {
        self.barrier(cb, old, new, 0, self.mip_levels);
    }

    /// Record the downsampling chain from level 0, ending in shader-read layout
    ///
    /// `level0_layout` is the layout level 0 is in when recording starts.
    /// Levels above 0 hold no content and are discarded first.
    pub fn record_mip_chain(&self, cb: vk::CommandBuffer, level0_layout: ImageLayout) {
        let filter = mipmap_filter_to_vk(self.desc.mipmap_filter).unwrap_or(vk::Filter::LINEAR);
        if self.mip_levels <= 1 {
            if level0_layout != ImageLayout::ShaderReadOnlyOptimal {
                self.barrier(cb, level0_layout, ImageLayout::ShaderReadOnlyOptimal, 0, 1);
            }
            return;
        }

        if level0_layout != ImageLayout::TransferDstOptimal {
            self.barrier(cb, level0_layout, ImageLayout::TransferDstOptimal, 0, 1);
        }
        self.barrier(cb, ImageLayout::Undefined, ImageLayout::TransferDstOptimal, 1, self.mip_levels - 1);

        let aspect_mask = aspect_of(self.desc.format);
        for step in plan_mip_chain(self.desc.extent, self.mip_levels) {
            // Source level is complete: hand it to the blit
            self.barrier(cb, ImageLayout::TransferDstOptimal, ImageLayout::TransferSrcOptimal, step.src_level, 1);

            let blit = vk::ImageBlit::default()
                .src_subresource(vk::ImageSubresourceLayers {
                    aspect_mask,
                    mip_level: step.src_level,
                    base_array_layer: 0,
                    layer_count: 1,
                })
                .src_offsets([
                    vk::Offset3D { x: 0, y: 0, z: 0 },
                    vk::Offset3D {
                        x: step.src_extent.width as i32,
                        y: step.src_extent.height as i32,
                        z: 1,
                    },
                ])
                .dst_subresource(vk::ImageSubresourceLayers {
                    aspect_mask,
                    mip_level: step.dst_level,
                    base_array_layer: 0,
                    layer_count: 1,
                })
                .dst_offsets([
                    vk::Offset3D { x: 0, y: 0, z: 0 },
                    vk::Offset3D {
                        x: step.dst_extent.width as i32,
                        y: step.dst_extent.height as i32,
                        z: 1,
                    },
                ]);

            unsafe {
                self.device.raw().cmd_blit_image(
                    cb,
                    self.image,
                    vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    self.image,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[blit],
                    filter,
                );
            }

            self.barrier(cb, ImageLayout::TransferSrcOptimal, ImageLayout::ShaderReadOnlyOptimal, step.src_level, 1);
        }

        self.barrier(
            cb,
            ImageLayout::TransferDstOptimal,
            ImageLayout::ShaderReadOnlyOptimal,
            self.mip_levels - 1,
            1,
        );
    }

    // ===== READBACK =====

    /// Copy level 0 back to the host as RGBA8
    ///
    /// Synchronous. Only 4-byte color formats can be read; BGRA images are
    /// swizzled to RGBA. Swapchain images are rejected: they carry no
    /// transfer usage and belong to the presentation engine between frames.
    pub fn copy_image_from_gpu(&self) -> Result<ImagePixels> {
        if self.desc.texture_type == TextureType::Swapchain {
            engine_bail!(SOURCE, @InvalidResource, "Swapchain images cannot be read back");
        }
        let format = self.desc.format;
        if format.is_depth() || format.bytes_per_pixel() != 4 || self.desc.samples.is_multisampled() {
            engine_bail!(
                SOURCE, @InvalidResource,
                "Cannot read back {:?} image with {} samples",
                format, self.desc.samples.count()
            );
        }

        let Extent2D { width, height } = self.desc.extent;
        let readback = DeviceBuffer::new(
            &self.device,
            vk::BufferUsageFlags::TRANSFER_DST,
            4,
            width as u64 * height as u64,
            true,
        )?;

        let resting = self.desc.layout;
        self.device.execute_one_time(|raw, cb| {
            self.barrier(cb, resting, ImageLayout::TransferSrcOptimal, 0, 1);

            let region = vk::BufferImageCopy::default()
                .image_subresource(vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: 0,
                    base_array_layer: 0,
                    layer_count: 1,
                })
                .image_extent(vk::Extent3D { width, height, depth: 1 });

            unsafe {
                raw.cmd_copy_image_to_buffer(
                    cb,
                    self.image,
                    vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    readback.handle(),
                    &[region],
                );
            }

            if resting != ImageLayout::Undefined {
                self.barrier(cb, ImageLayout::TransferSrcOptimal, resting, 0, 1);
            }
            Ok(())
        })?;

        let mut data = readback.read_to_host()?;
        if matches!(format, TextureFormat::B8G8R8A8Srgb | TextureFormat::B8G8R8A8Unorm) {
            for pixel in data.chunks_exact_mut(4) {
                pixel.swap(0, 2);
            }
        }

        Ok(ImagePixels { width, height, data })
    }
}

impl Drop for TextureImage {
    fn drop(&mut self) {
        unsafe {
            let raw = self.device.raw();
            if let Some(sampler) = self.sampler.take() {
                raw.destroy_sampler(sampler, None);
            }
            if let Some(view) = self.attachment_view.take() {
                raw.destroy_image_view(view, None);
            }
            if self.view != vk::ImageView::null() {
                raw.destroy_image_view(self.view, None);
            }
            if let Some(allocation) = self.allocation.take() {
                raw.destroy_image(self.image, None);
                self.device.free(allocation);
            }
        }
    }
}
