/*!
# Prism Engine

Backend-neutral core of the Prism Vulkan renderer.

This crate holds everything that does not need a GPU: the error type, the
logging system, render settings, and the pure logic behind the render loop.

## Architecture

- **Pass descriptions**: declarative per-frame description of what a pass renders to
- **Attachment planning**: ordering, MSAA resolve synthesis, layout decisions, validation
- **Reflection model**: vertex layout, output bindings and descriptor tables derived
  from shader reflection
- **State machines**: command buffer recording and frame lifecycle, the frame ring

The Vulkan backend (`prism_engine_renderer_vulkan`) drives these with real GPU objects.
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod render;

// Main prism namespace module
pub mod prism {
    // Error types
    pub use crate::error::{Error, Result, DEVICE_LOST_MESSAGE};

    // Engine-wide services
    pub use crate::engine::{BreakMode, Engine};

    // Logging sub-module (types only, macros live at the crate root)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Render sub-module with all rendering types
    pub mod render {
        pub use crate::render::*;
    }
}

// Re-export math library at crate root
pub use glam;
