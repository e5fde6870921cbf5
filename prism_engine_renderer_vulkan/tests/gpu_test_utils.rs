#![allow(dead_code)]
//! GPU test utilities - shared Vulkan device and tiny SPIR-V shaders
//!
//! One window and one device are shared by every GPU test in the process:
//! a surface can only be created once per window, and only one swapchain
//! may exist per surface at a time (tests run `#[serial]`).

use prism_engine::prism::log::{LogEntry, LogSeverity, Logger};
use prism_engine::prism::render::{Config, Extent2D, RenderSettings};
use prism_engine::prism::Engine;
use prism_engine_renderer_vulkan::{Device, Swapchain};
use std::sync::{Arc, Mutex, OnceLock};
use winit::event_loop::{EventLoop, EventLoopBuilder};
use winit::window::Window;

// Platform-specific imports for EventLoop threading
#[cfg(target_os = "windows")]
use winit::platform::windows::EventLoopBuilderExtWindows;
#[cfg(target_os = "linux")]
use winit::platform::x11::EventLoopBuilderExtX11;

static GPU_DEVICE: OnceLock<Arc<Device>> = OnceLock::new();

/// Kept alive for the device surface; the event loop is leaked on purpose
static GPU_WINDOW: OnceLock<Window> = OnceLock::new();

pub const TEST_EXTENT: Extent2D = Extent2D { width: 800, height: 600 };

/// Shared device, created on first call
pub fn get_test_device() -> Arc<Device> {
    GPU_DEVICE
        .get_or_init(|| {
            let (window, event_loop) = create_test_window();
            let device = Device::new(&window, Config::default()).expect("Failed to create Device for tests");
            std::mem::forget(event_loop);
            GPU_WINDOW.set(window).ok();
            device
        })
        .clone()
}

/// Swapchain over the shared device with default settings
pub fn create_test_swapchain() -> Swapchain {
    Swapchain::new(&get_test_device(), TEST_EXTENT, RenderSettings::default())
        .expect("Failed to create Swapchain for tests")
}

/// Hidden 800x600 window whose event loop may live outside the main thread
#[allow(deprecated)]
pub fn create_test_window() -> (Window, EventLoop<()>) {
    let event_loop = {
        #[cfg(any(target_os = "windows", target_os = "linux"))]
        {
            EventLoopBuilder::new().with_any_thread(true).build().unwrap()
        }
        #[cfg(not(any(target_os = "windows", target_os = "linux")))]
        {
            EventLoopBuilder::new().build().unwrap()
        }
    };

    let window_attrs = Window::default_attributes()
        .with_title("Prism GPU Test Window")
        .with_inner_size(winit::dpi::LogicalSize::new(TEST_EXTENT.width, TEST_EXTENT.height))
        .with_visible(false);

    let window = event_loop.create_window(window_attrs).unwrap();
    (window, event_loop)
}

// ============================================================================
// LOG CAPTURE
// ============================================================================

struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

/// Route engine logs into a vector until `Engine::reset_logger`
pub fn install_capture() -> Arc<Mutex<Vec<LogEntry>>> {
    let entries = Arc::new(Mutex::new(Vec::new()));
    Engine::set_logger(CaptureLogger { entries: entries.clone() });
    entries
}

/// Captured warnings whose message contains `needle`
pub fn warnings_containing(entries: &Arc<Mutex<Vec<LogEntry>>>, needle: &str) -> Vec<String> {
    entries
        .lock()
        .unwrap()
        .iter()
        .filter(|e| e.severity == LogSeverity::Warn && e.message.contains(needle))
        .map(|e| e.message.clone())
        .collect()
}

// ============================================================================
// SPIR-V
// ============================================================================

const MAGIC: u32 = 0x0723_0203;

const OP_NAME: u32 = 5;
const OP_MEMORY_MODEL: u32 = 14;
const OP_ENTRY_POINT: u32 = 15;
const OP_EXECUTION_MODE: u32 = 16;
const OP_CAPABILITY: u32 = 17;
const OP_TYPE_VOID: u32 = 19;
const OP_TYPE_FLOAT: u32 = 22;
const OP_TYPE_VECTOR: u32 = 23;
const OP_TYPE_IMAGE: u32 = 25;
const OP_TYPE_SAMPLED_IMAGE: u32 = 27;
const OP_TYPE_STRUCT: u32 = 30;
const OP_TYPE_POINTER: u32 = 32;
const OP_TYPE_FUNCTION: u32 = 33;
const OP_CONSTANT: u32 = 43;
const OP_CONSTANT_COMPOSITE: u32 = 44;
const OP_FUNCTION: u32 = 54;
const OP_FUNCTION_END: u32 = 56;
const OP_VARIABLE: u32 = 59;
const OP_STORE: u32 = 62;
const OP_DECORATE: u32 = 71;
const OP_MEMBER_DECORATE: u32 = 72;
const OP_LABEL: u32 = 248;
const OP_RETURN: u32 = 253;

const EXEC_VERTEX: u32 = 0;
const EXEC_FRAGMENT: u32 = 4;
const ORIGIN_UPPER_LEFT: u32 = 7;
const DECORATION_BLOCK: u32 = 2;
const DECORATION_BUILTIN: u32 = 11;
const DECORATION_LOCATION: u32 = 30;
const DECORATION_BINDING: u32 = 33;
const DECORATION_DESCRIPTOR_SET: u32 = 34;
const DECORATION_OFFSET: u32 = 35;
const BUILTIN_POSITION: u32 = 0;
const DIM_2D: u32 = 1;
const STORAGE_UNIFORM_CONSTANT: u32 = 0;
const STORAGE_UNIFORM: u32 = 2;
const STORAGE_OUTPUT: u32 = 3;

/// Uniform block and combined sampler declared by [`fragment_shader_with_resources`]
pub const UBO_VAR: &str = "_uboLights";
pub const SAMPLER_VAR: &str = "_texAlbedo";

fn string(s: &str) -> Vec<u32> {
    let mut bytes = s.as_bytes().to_vec();
    bytes.push(0);
    while bytes.len() % 4 != 0 {
        bytes.push(0);
    }
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn op(words: &mut Vec<u32>, opcode: u32, operands: &[u32]) {
    words.push(((operands.len() as u32 + 1) << 16) | opcode);
    words.extend_from_slice(operands);
}

fn name(words: &mut Vec<u32>, id: u32, text: &str) {
    let mut operands = vec![id];
    operands.extend(string(text));
    op(words, OP_NAME, &operands);
}

/// Stage whose `main` stores `color` into one vec4 output
///
/// Fragment outputs are named and located; vertex outputs are `gl_Position`.
/// With `resources` the stage also declares a vec4 uniform block at
/// binding 0 and a 2D combined sampler at binding 1, neither read by `main`.
fn constant_output_stage(exec_model: u32, output_name: &str, color: [f32; 4], resources: bool) -> Vec<u8> {
    let (main, void, func, float, vec4, ptr, out, label) = (1, 2, 3, 4, 5, 6, 7, 8);
    let constants = [9, 10, 11, 12];
    let composite = 13;
    let (block, block_ptr, ubo, image, sampled, sampled_ptr, texture) = (14, 15, 16, 17, 18, 19, 20);
    let bound = if resources { 21 } else { 14 };

    let mut words = vec![MAGIC, 0x0001_0000, 0, bound, 0];
    op(&mut words, OP_CAPABILITY, &[1]);
    op(&mut words, OP_MEMORY_MODEL, &[0, 1]);

    let mut entry = vec![exec_model, main];
    entry.extend(string("main"));
    entry.push(out);
    op(&mut words, OP_ENTRY_POINT, &entry);
    if exec_model == EXEC_FRAGMENT {
        op(&mut words, OP_EXECUTION_MODE, &[main, ORIGIN_UPPER_LEFT]);
    }

    name(&mut words, out, output_name);
    if resources {
        name(&mut words, block, "Lights");
        name(&mut words, ubo, UBO_VAR);
        name(&mut words, texture, SAMPLER_VAR);
    }
    if exec_model == EXEC_FRAGMENT {
        op(&mut words, OP_DECORATE, &[out, DECORATION_LOCATION, 0]);
    } else {
        op(&mut words, OP_DECORATE, &[out, DECORATION_BUILTIN, BUILTIN_POSITION]);
    }
    if resources {
        op(&mut words, OP_DECORATE, &[block, DECORATION_BLOCK]);
        op(&mut words, OP_MEMBER_DECORATE, &[block, 0, DECORATION_OFFSET, 0]);
        op(&mut words, OP_DECORATE, &[ubo, DECORATION_DESCRIPTOR_SET, 0]);
        op(&mut words, OP_DECORATE, &[ubo, DECORATION_BINDING, 0]);
        op(&mut words, OP_DECORATE, &[texture, DECORATION_DESCRIPTOR_SET, 0]);
        op(&mut words, OP_DECORATE, &[texture, DECORATION_BINDING, 1]);
    }

    op(&mut words, OP_TYPE_VOID, &[void]);
    op(&mut words, OP_TYPE_FUNCTION, &[func, void]);
    op(&mut words, OP_TYPE_FLOAT, &[float, 32]);
    op(&mut words, OP_TYPE_VECTOR, &[vec4, float, 4]);
    op(&mut words, OP_TYPE_POINTER, &[ptr, STORAGE_OUTPUT, vec4]);
    op(&mut words, OP_VARIABLE, &[ptr, out, STORAGE_OUTPUT]);
    if resources {
        op(&mut words, OP_TYPE_STRUCT, &[block, vec4]);
        op(&mut words, OP_TYPE_POINTER, &[block_ptr, STORAGE_UNIFORM, block]);
        op(&mut words, OP_VARIABLE, &[block_ptr, ubo, STORAGE_UNIFORM]);
        op(&mut words, OP_TYPE_IMAGE, &[image, float, DIM_2D, 0, 0, 0, 1, 0]);
        op(&mut words, OP_TYPE_SAMPLED_IMAGE, &[sampled, image]);
        op(&mut words, OP_TYPE_POINTER, &[sampled_ptr, STORAGE_UNIFORM_CONSTANT, sampled]);
        op(&mut words, OP_VARIABLE, &[sampled_ptr, texture, STORAGE_UNIFORM_CONSTANT]);
    }
    for (id, value) in constants.iter().zip(color) {
        op(&mut words, OP_CONSTANT, &[float, *id, value.to_bits()]);
    }
    op(
        &mut words,
        OP_CONSTANT_COMPOSITE,
        &[vec4, composite, constants[0], constants[1], constants[2], constants[3]],
    );

    op(&mut words, OP_FUNCTION, &[void, main, 0, func]);
    op(&mut words, OP_LABEL, &[label]);
    op(&mut words, OP_STORE, &[out, composite]);
    op(&mut words, OP_RETURN, &[]);
    op(&mut words, OP_FUNCTION_END, &[]);

    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

/// Vertex stage without inputs writing a constant position
pub fn vertex_shader() -> Vec<u8> {
    constant_output_stage(EXEC_VERTEX, "gl_Position", [0.0, 0.0, 0.0, 1.0], false)
}

/// Fragment stage writing white to the default color slot
pub fn fragment_shader() -> Vec<u8> {
    constant_output_stage(EXEC_FRAGMENT, "_outFBODefaultColor", [1.0, 1.0, 1.0, 1.0], false)
}

/// Fragment stage writing white and declaring [`UBO_VAR`] and [`SAMPLER_VAR`]
pub fn fragment_shader_with_resources() -> Vec<u8> {
    constant_output_stage(EXEC_FRAGMENT, "_outFBODefaultColor", [1.0, 1.0, 1.0, 1.0], true)
}
