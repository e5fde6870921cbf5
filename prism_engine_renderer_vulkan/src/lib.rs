/*!
# Prism Engine - Vulkan Renderer Backend

Vulkan implementation of the Prism rendering engine, built on `ash` with
`gpu-allocator` for memory and `spirq` for SPIR-V reflection.

The backend-neutral logic (pass descriptions, attachment planning, reflection
model, state machines) lives in `prism_engine`; this crate drives it with
real GPU objects.

## Frame loop

```no_run
use prism_engine::prism::render::{
    BlendFunction, BlendMode, Config, Extent2D, OutputDescription, OutputMRT, PrimitiveTopology,
    RenderSettings, SampleCount, VertexFormat,
};
use prism_engine_renderer_vulkan::{Device, PipelineShader, Swapchain};
# fn run<W>(window: &W, vert: &[u8], frag: &[u8]) -> prism_engine::prism::Result<()>
# where W: raw_window_handle::HasDisplayHandle + raw_window_handle::HasWindowHandle {
let device = Device::new(window, Config::default())?;
let mut swapchain = Swapchain::new(&device, Extent2D::new(800, 600), RenderSettings::default())?;
let shader = swapchain.register_shader(PipelineShader::new(&device, &[vert, frag])?)?;

if let Some(frame) = swapchain.begin_frame()? {
    let mut shader = shader.lock().expect("shader lock");
    let mut pass = shader.get_pass(frame, SampleCount::S1, BlendFunction::OPAQUE, BlendMode::Global);
    pass.add_output(OutputDescription::color(OutputMRT::DefaultColor, [0.0, 0.0, 0.0, 1.0]))
        .add_output(OutputDescription::depth());
    if shader.begin_render_pass(&mut swapchain, &pass)? {
        shader.bind_pipeline(PrimitiveTopology::TriangleList, VertexFormat::Empty)?;
        shader.draw(3, 1)?;
        shader.end_render_pass(&mut swapchain)?;
    }
    drop(shader);
    swapchain.end_frame()?;
}
# Ok(())
# }
```
*/

// Vulkan implementation modules
mod debug;
mod vulkan_convert;
mod vulkan_device;
mod vulkan_device_buffer;
mod vulkan_buffer;
mod vulkan_texture;
mod vulkan_render_texture;
mod vulkan_command_buffer;
mod vulkan_shader_module;

// Frame and pass modules
mod vulkan_framebuffer;
mod vulkan_pipeline;
mod vulkan_shader_data;
mod vulkan_pipeline_shader;
mod vulkan_render_frame;
mod vulkan_swapchain;

pub use vulkan_device::{Device, DeviceLimits};
pub use vulkan_device_buffer::DeviceBuffer;
pub use vulkan_buffer::{Buffer, BufferUsage};
pub use vulkan_texture::{ImagePixels, TextureDesc, TextureImage};
pub use vulkan_render_texture::RenderTexture;
pub use vulkan_command_buffer::{CommandBuffer, SubmitSync};
pub use vulkan_shader_module::{reflect_spirv, spirv_words, ShaderModule};
pub use vulkan_framebuffer::{Framebuffer, FramebufferAttachment};
pub use vulkan_pipeline::Pipeline;
pub use vulkan_shader_data::ShaderData;
pub use vulkan_pipeline_shader::PipelineShader;
pub use vulkan_render_frame::RenderFrame;
pub use vulkan_swapchain::Swapchain;

// Re-export debug utilities
pub use debug::{get_validation_stats, print_validation_stats_report};
