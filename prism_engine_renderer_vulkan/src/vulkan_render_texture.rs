/// RenderTexture - swapchain-lifetime render target sampled by later passes
///
/// Holds at most two sample-count variants (the MSAA image and its
/// single-sample resolve), each with one image per frame in flight. All
/// images are rebuilt when the swapchain is resized.

use prism_engine::prism::render::{Extent2D, MipmapFilter, RenderTextureId, SampleCount, TextureFormat};
use prism_engine::prism::Result;
use prism_engine::{engine_debug, engine_fatal};
use std::sync::Arc;

use crate::vulkan_device::Device;
use crate::vulkan_texture::{TextureDesc, TextureImage};

const SOURCE: &str = "prism::vulkan";

/// Sample-count variants a render texture may hold
const MAX_VARIANTS: usize = 2;

struct Variant {
    samples: SampleCount,
    /// One image per frame
    images: Vec<Arc<TextureImage>>,
}

pub struct RenderTexture {
    id: RenderTextureId,
    name: String,
    format: TextureFormat,
    mipmap_filter: MipmapFilter,
    extent: Extent2D,
    frame_count: usize,
    variants: Vec<Variant>,
}

impl RenderTexture {
    pub(crate) fn new(
        id: RenderTextureId,
        name: &str,
        format: TextureFormat,
        mipmap_filter: MipmapFilter,
        extent: Extent2D,
        frame_count: usize,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            format,
            mipmap_filter,
            extent,
            frame_count,
            variants: Vec::with_capacity(MAX_VARIANTS),
        }
    }

    pub fn id(&self) -> RenderTextureId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn extent(&self) -> Extent2D {
        self.extent
    }

    /// Sample counts with live images
    pub fn sample_counts(&self) -> Vec<SampleCount> {
        self.variants.iter().map(|v| v.samples).collect()
    }

    fn desc(&self, samples: SampleCount) -> TextureDesc {
        if self.format.is_depth() {
            return TextureDesc::depth_attachment(self.extent, self.format, samples);
        }
        let mut desc = TextureDesc::color_attachment(self.extent, self.format, samples);
        if !samples.is_multisampled() {
            desc.mipmap_filter = self.mipmap_filter;
        }
        desc
    }

    fn create_images(&self, device: &Arc<Device>, samples: SampleCount) -> Result<Vec<Arc<TextureImage>>> {
        let desc = self.desc(samples);
        (0..self.frame_count)
            .map(|_| TextureImage::new(device, desc).map(Arc::new))
            .collect()
    }

    /// Image of `frame` for `samples`, created on first use
    pub fn image(&mut self, device: &Arc<Device>, frame: usize, samples: SampleCount) -> Result<Arc<TextureImage>> {
        let index = match self.variants.iter().position(|v| v.samples == samples) {
            Some(index) => index,
            None => {
                if self.variants.len() >= MAX_VARIANTS {
                    return Err(engine_fatal!(
                        SOURCE, @PipelineError,
                        "Render texture '{}' already holds {} sample-count variants, cannot add {} samples",
                        self.name, MAX_VARIANTS, samples.count()
                    ));
                }
                let images = self.create_images(device, samples)?;
                engine_debug!(
                    SOURCE,
                    "Render texture '{}': created {} images with {} samples",
                    self.name, images.len(), samples.count()
                );
                self.variants.push(Variant { samples, images });
                self.variants.len() - 1
            }
        };

        self.variants[index]
            .images
            .get(frame)
            .cloned()
            .ok_or_else(|| {
                engine_fatal!(
                    SOURCE, @InvalidResource,
                    "Render texture '{}' has no image for frame {}",
                    self.name, frame
                )
            })
    }

    /// Rebuild every variant for a new size and frame count
    pub(crate) fn recreate(&mut self, device: &Arc<Device>, extent: Extent2D, frame_count: usize) -> Result<()> {
        self.extent = extent;
        self.frame_count = frame_count;
        let samples: Vec<SampleCount> = self.sample_counts();
        // Old images go first so peak memory does not double
        self.variants.clear();
        for samples in samples {
            let images = self.create_images(device, samples)?;
            self.variants.push(Variant { samples, images });
        }
        Ok(())
    }
}
