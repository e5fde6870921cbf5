//! GPU tests for the Vulkan backend
//!
//! All tests require a GPU and are marked with #[ignore]. They share one
//! device and run serially.
//!
//! Run with: cargo test --test vulkan_renderer_tests -- --ignored

mod gpu_test_utils;

use gpu_test_utils::{
    create_test_swapchain, fragment_shader, fragment_shader_with_resources, get_test_device, install_capture,
    vertex_shader, warnings_containing, SAMPLER_VAR, UBO_VAR,
};
use prism_engine::prism::render::{
    BlendFunction, BlendMode, CompareOp, Extent2D, MipmapFilter, OutputDescription, OutputMRT, PassDescription,
    PrimitiveTopology, Rect2D, RenderTextureId, SampleCount, TextureFormat, VertexFormat,
};
use prism_engine::prism::{Engine, Error};
use prism_engine_renderer_vulkan::{Buffer, BufferUsage, ImagePixels, PipelineShader, Swapchain, TextureImage};
use serial_test::serial;
use std::sync::{Arc, Mutex};

fn create_test_shader(swapchain: &mut Swapchain) -> Arc<Mutex<PipelineShader>> {
    let device = get_test_device();
    let vert = vertex_shader();
    let frag = fragment_shader();
    let shader = PipelineShader::new(&device, &[&vert, &frag]).unwrap();
    swapchain.register_shader(shader).unwrap()
}

/// Shader whose fragment stage declares a uniform block and a sampler
fn create_resource_shader(swapchain: &mut Swapchain) -> Arc<Mutex<PipelineShader>> {
    let device = get_test_device();
    let vert = vertex_shader();
    let frag = fragment_shader_with_resources();
    let shader = PipelineShader::new(&device, &[&vert, &frag]).unwrap();
    swapchain.register_shader(shader).unwrap()
}

/// Begin a frame, retrying a few ticks while the surface settles
fn begin(swapchain: &mut Swapchain) -> usize {
    for _ in 0..8 {
        if let Some(frame) = swapchain.begin_frame().unwrap() {
            return frame;
        }
        if swapchain.is_out_of_date() {
            let extent = swapchain.extent();
            swapchain.init_swapchain(extent).unwrap();
        }
    }
    panic!("No frame could be acquired");
}

fn color_depth_pass(shader: &PipelineShader, frame: usize) -> PassDescription {
    color_depth_pass_with(shader, frame, SampleCount::S1)
}

fn color_depth_pass_with(shader: &PipelineShader, frame: usize, samples: SampleCount) -> PassDescription {
    let mut pass = shader.get_pass(frame, samples, BlendFunction::OPAQUE, BlendMode::Global);
    pass.add_output(OutputDescription::color(OutputMRT::DefaultColor, [0.0, 0.0, 0.0, 1.0]))
        .add_output(OutputDescription::depth());
    pass
}

/// One pass that binds the pipeline and draws zero instances
fn render_empty_pass(swapchain: &mut Swapchain, shader: &mut PipelineShader, pass: &PassDescription) {
    assert!(shader.begin_render_pass(swapchain, pass).unwrap());
    assert!(shader.bind_pipeline(PrimitiveTopology::TriangleList, VertexFormat::Empty).unwrap());
    assert!(shader.draw(3, 0).unwrap());
    assert!(shader.end_render_pass(swapchain).unwrap());
}

/// Color-only pass drawing into a render texture
fn render_texture_pass(shader: &PipelineShader, frame: usize, target: RenderTextureId, clear: [f32; 4]) -> PassDescription {
    let mut pass = shader.get_pass(frame, SampleCount::S1, BlendFunction::OPAQUE, BlendMode::Global);
    pass.add_output(OutputDescription::color(OutputMRT::DefaultColor, clear).with_render_texture(target));
    pass
}

/// RGBA8 pixel at column `x` of row `y`
fn pixel(pixels: &ImagePixels, x: u32, y: u32) -> [u8; 4] {
    let at = ((y * pixels.width + x) * 4) as usize;
    [pixels.data[at], pixels.data[at + 1], pixels.data[at + 2], pixels.data[at + 3]]
}

const RED: [u8; 4] = [255, 0, 0, 255];
const GREEN: [u8; 4] = [0, 255, 0, 255];

// ============================================================================
// BUFFER TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_host_buffer_round_trip() {
    let device = get_test_device();
    for item_count in [1u64, 7, 256] {
        let mut buffer = Buffer::new(&device, BufferUsage::Vertex, 12, item_count, false).unwrap();
        let data: Vec<u8> = (0..buffer.size()).map(|i| (i * 31 % 251) as u8).collect();
        buffer.write_data(&data).unwrap();
        assert_eq!(buffer.read_data().unwrap(), data);
    }
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_staged_upload_reaches_device_memory() {
    let device = get_test_device();
    let mut buffer = Buffer::new(&device, BufferUsage::Index, 4, 64, true).unwrap();
    let indices: Vec<u32> = (0..64).rev().collect();

    buffer.write_pod(&indices).unwrap();
    let read: Vec<u8> = buffer.read_device().unwrap();
    assert_eq!(read, bytemuck::cast_slice::<u32, u8>(&indices));
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_staged_buffer_is_write_once() {
    let device = get_test_device();
    let mut buffer = Buffer::new(&device, BufferUsage::Vertex, 4, 4, true).unwrap();
    buffer.write_data(&[1u8; 16]).unwrap();
    assert!(matches!(buffer.write_data(&[2u8; 16]), Err(Error::ValidationError(_))));
}

// ============================================================================
// TEXTURE TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_texture_pixels_read_back() {
    let device = get_test_device();
    let pixels: Vec<u8> = (0..4 * 4 * 4).map(|i| i as u8).collect();
    let texture = TextureImage::from_pixels(&device, &pixels, 4, 4, MipmapFilter::Disabled, None).unwrap();

    assert_eq!(texture.mip_levels(), 1);
    let read = texture.copy_image_from_gpu().unwrap();
    assert_eq!((read.width, read.height), (4, 4));
    assert_eq!(read.data, pixels);
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_texture_mip_chain_allocated() {
    let device = get_test_device();
    let pixels = vec![200u8; 64 * 32 * 4];
    let texture = TextureImage::from_pixels(&device, &pixels, 64, 32, MipmapFilter::Linear, Some(4.0)).unwrap();

    if device.supports_linear_blit(texture.format()) {
        assert_eq!(texture.mip_levels(), 7);
    } else {
        assert_eq!(texture.mip_levels(), 1);
    }
    assert!(texture.sampler().is_some());
}

// ============================================================================
// SHADER TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_shader_reflects_outputs() {
    let device = get_test_device();
    let vert = vertex_shader();
    let frag = fragment_shader();
    let shader = PipelineShader::new(&device, &[&vert, &frag]).unwrap();

    let bindings = shader.output_bindings();
    assert_eq!(bindings.len(), 2);
    assert_eq!(bindings[0].output, OutputMRT::DefaultColor);
    assert_eq!(bindings[1].output, OutputMRT::DefaultDepth);
    assert_eq!(bindings[1].format, device.limits().depth_format);
    assert!(shader.vertex_layout().is_empty());
    assert!(!shader.valid(), "Unregistered shader has no frame state");
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_shader_requires_fragment_stage() {
    let device = get_test_device();
    let vert = vertex_shader();
    let result = PipelineShader::new(&device, &[&vert]);
    assert!(matches!(result, Err(Error::ShaderError(_))));
}

// ============================================================================
// FRAMEBUFFER CACHE TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_framebuffer_cache_reuses_identical_pass() {
    let mut swapchain = create_test_swapchain();
    let shader = create_test_shader(&mut swapchain);
    let mut shader = shader.lock().unwrap();

    let frame = begin(&mut swapchain);
    let pass = color_depth_pass(&shader, frame);
    render_empty_pass(&mut swapchain, &mut shader, &pass);
    let same = color_depth_pass(&shader, frame);
    render_empty_pass(&mut swapchain, &mut shader, &same);
    assert_eq!(shader.framebuffer_count(frame), 1);
    assert_eq!(shader.pipeline_count(frame), 1);

    // Retaining depth changes the structural key
    let mut other = shader.get_pass(frame, SampleCount::S1, BlendFunction::OPAQUE, BlendMode::Global);
    other
        .add_output(OutputDescription::color(OutputMRT::DefaultColor, [0.0, 0.0, 0.0, 1.0]))
        .add_output(OutputDescription::depth().retain());
    render_empty_pass(&mut swapchain, &mut shader, &other);
    assert_eq!(shader.framebuffer_count(frame), 2);
    assert_eq!(shader.pipeline_count(frame), 2);

    drop(shader);
    swapchain.end_frame().unwrap();
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_pass_state_splits_pipelines_not_framebuffers() {
    let mut swapchain = create_test_swapchain();
    let shader = create_test_shader(&mut swapchain);
    let mut shader = shader.lock().unwrap();

    let frame = begin(&mut swapchain);
    let opaque = color_depth_pass(&shader, frame);
    render_empty_pass(&mut swapchain, &mut shader, &opaque);

    let mut alpha = shader.get_pass(frame, SampleCount::S1, BlendFunction::ALPHA, BlendMode::Global);
    alpha
        .add_output(OutputDescription::color(OutputMRT::DefaultColor, [0.0, 0.0, 0.0, 1.0]))
        .add_output(OutputDescription::depth());
    render_empty_pass(&mut swapchain, &mut shader, &alpha);
    assert_eq!(shader.framebuffer_count(frame), 1);
    assert_eq!(shader.pipeline_count(frame), 2);

    let mut always = shader.get_pass(frame, SampleCount::S1, BlendFunction::OPAQUE, BlendMode::Global);
    always
        .add_output(OutputDescription::color(OutputMRT::DefaultColor, [0.0, 0.0, 0.0, 1.0]))
        .add_output(OutputDescription::depth().with_depth_compare(CompareOp::Always, false));
    render_empty_pass(&mut swapchain, &mut shader, &always);
    assert_eq!(shader.framebuffer_count(frame), 1);
    assert_eq!(shader.pipeline_count(frame), 3);

    // Back to the first state: nothing new is built
    render_empty_pass(&mut swapchain, &mut shader, &opaque);
    assert_eq!(shader.pipeline_count(frame), 3);

    drop(shader);
    swapchain.end_frame().unwrap();
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_shared_framebuffer_clears_with_each_pass_color() {
    let mut swapchain = create_test_swapchain();
    let shader = create_test_shader(&mut swapchain);
    let target = swapchain.create_render_texture("wiped", TextureFormat::R8G8B8A8Unorm, MipmapFilter::Disabled);
    let frame_count = swapchain.frame_count();

    // Two laps over the ring: every frame reuses its framebuffer on the second lap
    for (clear, expected) in [([1.0, 0.0, 0.0, 1.0], RED), ([0.0, 1.0, 0.0, 1.0], GREEN)] {
        for _ in 0..frame_count {
            let frame = begin(&mut swapchain);
            {
                let mut shader = shader.lock().unwrap();
                let pass = render_texture_pass(&shader, frame, target, clear);
                render_empty_pass(&mut swapchain, &mut shader, &pass);
                assert_eq!(shader.framebuffer_count(frame), 1);
            }
            swapchain.end_frame().unwrap();
            get_test_device().wait_idle().unwrap();

            let image = swapchain.render_texture_image(target, frame, SampleCount::S1).unwrap();
            let pixels = image.copy_image_from_gpu().unwrap();
            assert!(pixels.data.chunks_exact(4).all(|p| p == expected), "frame {} not cleared to {:?}", frame, expected);
        }
    }
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_viewport_bounds_the_cleared_area() {
    let mut swapchain = create_test_swapchain();
    let shader = create_test_shader(&mut swapchain);
    let target = swapchain.create_render_texture("halves", TextureFormat::R8G8B8A8Unorm, MipmapFilter::Disabled);
    let Extent2D { width, height } = swapchain.extent();
    let half = width / 2;

    // Left half first, then the right half on the next frame
    for area in [Rect2D::new(0, 0, half, height), Rect2D::new(half as i32, 0, width - half, height)] {
        let frame = begin(&mut swapchain);
        {
            let mut shader = shader.lock().unwrap();
            let full = render_texture_pass(&shader, frame, target, [1.0, 0.0, 0.0, 1.0]);
            render_empty_pass(&mut swapchain, &mut shader, &full);
            let mut partial = render_texture_pass(&shader, frame, target, [0.0, 1.0, 0.0, 1.0]);
            partial.set_viewport(area);
            render_empty_pass(&mut swapchain, &mut shader, &partial);
            assert_eq!(shader.framebuffer_count(frame), 1);
        }
        swapchain.end_frame().unwrap();
        get_test_device().wait_idle().unwrap();

        let image = swapchain.render_texture_image(target, frame, SampleCount::S1).unwrap();
        let pixels = image.copy_image_from_gpu().unwrap();
        for y in [0, height / 2, height - 1] {
            for x in [0, half - 1, half, width - 1] {
                let inside = x as i32 >= area.x && x < area.x as u32 + area.width;
                let expected = if inside { GREEN } else { RED };
                assert_eq!(pixel(&pixels, x, y), expected, "pixel ({}, {}) for area {:?}", x, y, area);
            }
        }
    }
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_invalid_framebuffer_records_nothing() {
    let mut swapchain = create_test_swapchain();
    let shader = create_test_shader(&mut swapchain);
    let mut shader = shader.lock().unwrap();

    let frame = begin(&mut swapchain);
    let empty = shader.get_pass(frame, SampleCount::S1, BlendFunction::OPAQUE, BlendMode::Global);
    assert!(!shader.begin_render_pass(&mut swapchain, &empty).unwrap());
    assert!(!swapchain.frame(frame).unwrap().command_buffer().in_pass());
    assert!(!shader.in_pass());

    // Binding outside a pass is refused without touching the command buffer
    assert!(!shader.draw(3, 1).unwrap());

    drop(shader);
    swapchain.end_frame().unwrap();
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_pass_for_another_frame_rejected() {
    let mut swapchain = create_test_swapchain();
    let shader = create_test_shader(&mut swapchain);
    let mut shader = shader.lock().unwrap();

    let frame = begin(&mut swapchain);
    let wrong = color_depth_pass(&shader, frame + 1);
    assert!(!shader.begin_render_pass(&mut swapchain, &wrong).unwrap());
    assert_eq!(shader.framebuffer_count(frame), 0);

    drop(shader);
    swapchain.end_frame().unwrap();
}

// ============================================================================
// FRAME LOOP TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_ten_frames_round_robin() {
    let mut swapchain = create_test_swapchain();
    let shader = create_test_shader(&mut swapchain);
    let frame_count = swapchain.frame_count();
    assert!(frame_count >= 2);

    let mut frames = Vec::new();
    for _ in 0..10 {
        let frame = swapchain.begin_frame().unwrap().expect("frame skipped");
        frames.push(frame);
        {
            let mut shader = shader.lock().unwrap();
            let pass = color_depth_pass(&shader, frame);
            render_empty_pass(&mut swapchain, &mut shader, &pass);
        }
        assert!(swapchain.end_frame().unwrap());
    }

    let expected: Vec<usize> = (0..10).map(|i| i % frame_count).collect();
    assert_eq!(frames, expected);
    assert_eq!(swapchain.present_count(), 10);

    // One framebuffer per (frame, swapchain image) pair at most
    let shader = shader.lock().unwrap();
    for frame in 0..frame_count {
        assert!(shader.framebuffer_count(frame) >= 1);
        assert!(shader.framebuffer_count(frame) <= swapchain.image_count());
    }
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_end_frame_without_begin_fails() {
    let mut swapchain = create_test_swapchain();
    assert!(matches!(swapchain.end_frame(), Err(Error::ValidationError(_))));
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_resize_clears_and_rebuilds_caches() {
    let mut swapchain = create_test_swapchain();
    let shader = create_test_shader(&mut swapchain);

    let frame = begin(&mut swapchain);
    {
        let mut shader = shader.lock().unwrap();
        let pass = color_depth_pass(&shader, frame);
        render_empty_pass(&mut swapchain, &mut shader, &pass);
        assert_eq!(shader.framebuffer_count(frame), 1);
    }
    swapchain.end_frame().unwrap();

    swapchain.init_swapchain(Extent2D::new(640, 480)).unwrap();
    {
        let shader = shader.lock().unwrap();
        assert_eq!(shader.frame_count(), swapchain.frame_count());
        for f in 0..swapchain.frame_count() {
            assert_eq!(shader.framebuffer_count(f), 0);
            assert_eq!(shader.pipeline_count(f), 0);
        }
    }
    assert_eq!(swapchain.frame_index(), 0);

    let frame = begin(&mut swapchain);
    {
        let mut shader = shader.lock().unwrap();
        let pass = color_depth_pass(&shader, frame);
        render_empty_pass(&mut swapchain, &mut shader, &pass);
        assert_eq!(shader.framebuffer_count(frame), 1);
        assert_eq!(shader.pipeline_count(frame), 1);
    }
    assert!(swapchain.end_frame().unwrap());
}

// ============================================================================
// RENDER TEXTURE TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_render_texture_cleared_and_sampled() {
    let mut swapchain = create_test_swapchain();
    let shader = create_test_shader(&mut swapchain);
    let target = swapchain.create_render_texture("offscreen", TextureFormat::R8G8B8A8Unorm, MipmapFilter::Linear);

    let frame = begin(&mut swapchain);
    {
        let mut shader = shader.lock().unwrap();
        let mut pass = shader.get_pass(frame, SampleCount::S1, BlendFunction::OPAQUE, BlendMode::Global);
        pass.add_output(OutputDescription::color(OutputMRT::DefaultColor, [1.0, 0.0, 0.0, 1.0]).with_render_texture(target));
        render_empty_pass(&mut swapchain, &mut shader, &pass);
    }
    swapchain.end_frame().unwrap();
    get_test_device().wait_idle().unwrap();

    let image = swapchain.render_texture_image(target, frame, SampleCount::S1).unwrap();
    assert_eq!(image.extent(), swapchain.extent());
    assert!(image.sampler().is_some());

    let pixels = image.copy_image_from_gpu().unwrap();
    assert!(pixels.data.chunks_exact(4).all(|p| p == [255, 0, 0, 255]));
    assert_eq!(swapchain.render_texture(target).unwrap().sample_counts(), vec![SampleCount::S1]);
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_unknown_render_texture_rejected() {
    let mut swapchain = create_test_swapchain();
    let target = swapchain.create_render_texture("gone", TextureFormat::R8G8B8A8Unorm, MipmapFilter::Disabled);
    assert!(swapchain.destroy_render_texture(target));
    let result = swapchain.render_texture_image(target, 0, SampleCount::S1);
    assert!(matches!(result, Err(Error::InvalidResource(_))));
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_swapchain_image_readback_rejected() {
    let swapchain = create_test_swapchain();
    assert!(swapchain.image_count() >= 1);
    let image = swapchain.image(0).unwrap();
    assert_eq!(image.extent(), swapchain.extent());
    assert!(matches!(image.copy_image_from_gpu(), Err(Error::InvalidResource(_))));
    assert!(swapchain.image(swapchain.image_count()).is_none());
}

// ============================================================================
// UNIFORM BUFFER AND SAMPLER TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_create_ubo_checks_the_shader_block() {
    let mut swapchain = create_test_swapchain();
    let shader = create_resource_shader(&mut swapchain);
    let mut shader = shader.lock().unwrap();

    let too_big = shader.create_ubo("lights", UBO_VAR, 32, 1);
    assert!(matches!(too_big, Err(Error::InvalidResource(_))));
    let overflow = shader.create_ubo("lights", UBO_VAR, 16, u64::MAX);
    assert!(matches!(overflow, Err(Error::InvalidResource(_))));
    let unknown = shader.create_ubo("lights", "_uboMissing", 16, 1);
    assert!(matches!(unknown, Err(Error::InvalidResource(_))));
    let not_a_block = shader.create_ubo("lights", SAMPLER_VAR, 16, 1);
    assert!(matches!(not_a_block, Err(Error::InvalidResource(_))));
    for frame in 0..shader.frame_count() {
        assert_eq!(shader.ubo_count(frame), 0);
    }

    shader.create_ubo("lights", UBO_VAR, 16, 1).unwrap();
    for frame in 0..shader.frame_count() {
        assert_eq!(shader.ubo_count(frame), 1);
    }
    let twice = shader.create_ubo("lights_again", UBO_VAR, 16, 1);
    assert!(matches!(twice, Err(Error::InvalidResource(_))));
    shader.write_ubo_pod(0, "lights", &[[0.5f32; 4]]).unwrap();
    assert!(matches!(shader.write_ubo(0, "absent", &[0u8; 16]), Err(Error::InvalidResource(_))));
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_binds_refused_without_pass_or_pipeline() {
    let mut swapchain = create_test_swapchain();
    let shader = create_resource_shader(&mut swapchain);
    let mut shader = shader.lock().unwrap();
    shader.create_ubo("lights", UBO_VAR, 16, 1).unwrap();
    let device = get_test_device();
    let texture = TextureImage::from_pixels(&device, &[255u8; 4 * 4 * 4], 4, 4, MipmapFilter::Disabled, None).unwrap();

    // Outside a pass
    assert!(!shader.bind_ubo("lights").unwrap());
    assert!(!shader.bind_sampler(SAMPLER_VAR, &texture).unwrap());

    let frame = begin(&mut swapchain);
    let pass = color_depth_pass(&shader, frame);
    assert!(shader.begin_render_pass(&mut swapchain, &pass).unwrap());

    // In a pass, before a pipeline is bound
    assert!(!shader.bind_ubo("lights").unwrap());
    assert!(!shader.bind_sampler(SAMPLER_VAR, &texture).unwrap());

    assert!(shader.bind_pipeline(PrimitiveTopology::TriangleList, VertexFormat::Empty).unwrap());
    shader.write_ubo_pod(frame, "lights", &[[1.0f32, 0.5, 0.25, 1.0]]).unwrap();
    assert!(shader.bind_ubo("lights").unwrap());
    assert!(shader.bind_sampler(SAMPLER_VAR, &texture).unwrap());
    assert!(!shader.bind_ubo("never_created").unwrap());
    assert!(!shader.bind_sampler(UBO_VAR, &texture).unwrap());
    assert!(shader.draw(3, 0).unwrap());
    assert!(shader.end_render_pass(&mut swapchain).unwrap());

    drop(shader);
    swapchain.end_frame().unwrap();
    device.wait_idle().unwrap();
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_unbound_descriptors_warned_once() {
    let mut swapchain = create_test_swapchain();
    let shader = create_resource_shader(&mut swapchain);
    let mut shader = shader.lock().unwrap();
    let entries = install_capture();

    let frame = begin(&mut swapchain);
    let pass = color_depth_pass(&shader, frame);
    assert!(shader.begin_render_pass(&mut swapchain, &pass).unwrap());
    assert!(shader.bind_pipeline(PrimitiveTopology::TriangleList, VertexFormat::Empty).unwrap());
    assert!(shader.draw(3, 0).unwrap());
    assert!(shader.draw(3, 0).unwrap());
    assert!(shader.end_render_pass(&mut swapchain).unwrap());
    render_empty_pass(&mut swapchain, &mut shader, &pass);
    Engine::reset_logger();

    let warnings = warnings_containing(&entries, "never bound");
    assert_eq!(warnings.len(), 2, "{:?}", warnings);
    assert!(warnings.iter().any(|w| w.contains(UBO_VAR)));
    assert!(warnings.iter().any(|w| w.contains(SAMPLER_VAR)));

    drop(shader);
    swapchain.end_frame().unwrap();
}

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_ubo_definitions_survive_swapchain_recreation() {
    let mut swapchain = create_test_swapchain();
    let shader = create_resource_shader(&mut swapchain);
    shader.lock().unwrap().create_ubo("lights", UBO_VAR, 16, 1).unwrap();

    swapchain.init_swapchain(Extent2D::new(640, 480)).unwrap();
    let mut shader_guard = shader.lock().unwrap();
    assert_eq!(shader_guard.frame_count(), swapchain.frame_count());
    for frame in 0..swapchain.frame_count() {
        assert_eq!(shader_guard.ubo_count(frame), 1);
        shader_guard.write_ubo_pod(frame, "lights", &[[0.0f32; 4]]).unwrap();
    }
    // The definition is still registered, so the name stays taken
    let again = shader_guard.create_ubo("lights_copy", UBO_VAR, 16, 1);
    assert!(matches!(again, Err(Error::InvalidResource(_))));
    drop(shader_guard);

    let frame = begin(&mut swapchain);
    {
        let mut shader = shader.lock().unwrap();
        let pass = color_depth_pass(&shader, frame);
        assert!(shader.begin_render_pass(&mut swapchain, &pass).unwrap());
        assert!(shader.bind_pipeline(PrimitiveTopology::TriangleList, VertexFormat::Empty).unwrap());
        assert!(shader.bind_ubo("lights").unwrap());
        assert!(shader.end_render_pass(&mut swapchain).unwrap());
    }
    swapchain.end_frame().unwrap();
}

// ============================================================================
// MULTISAMPLE TESTS
// ============================================================================

#[test]
#[ignore] // Requires GPU
#[serial]
fn test_msaa_pass_and_target_variant_limit() {
    let device = get_test_device();
    if device.limits().max_samples < SampleCount::S4 {
        eprintln!("Skipping: device supports fewer than 4 samples");
        return;
    }
    let mut swapchain = create_test_swapchain();
    let shader = create_test_shader(&mut swapchain);
    let mut shader = shader.lock().unwrap();

    let frame = begin(&mut swapchain);
    let s4 = color_depth_pass_with(&shader, frame, SampleCount::S4);
    assert_eq!(s4.sample_count(), SampleCount::S4);
    render_empty_pass(&mut swapchain, &mut shader, &s4);
    // Multisampled color and depth; the swapchain image is the resolve target
    assert_eq!(swapchain.frame(frame).unwrap().target_count(), 2);

    // Single-sample depth is the second variant of the depth slot
    let s1 = color_depth_pass(&shader, frame);
    render_empty_pass(&mut swapchain, &mut shader, &s1);
    assert_eq!(swapchain.frame(frame).unwrap().target_count(), 3);
    assert_eq!(shader.framebuffer_count(frame), 2);

    // A third depth variant is refused
    let s2 = color_depth_pass_with(&shader, frame, SampleCount::S2);
    let result = shader.begin_render_pass(&mut swapchain, &s2);
    assert!(matches!(result, Err(Error::PipelineError(_))));
    assert!(!shader.in_pass());

    drop(shader);
    swapchain.end_frame().unwrap();
}
