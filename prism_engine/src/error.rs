//! Error types for the Prism engine
//!
//! This module defines the error types used throughout the engine,
//! including device setup, shader reflection, framebuffer resolution and
//! frame submission.

use std::fmt;

/// Well-known message carried by [`Error::DeviceLost`].
///
/// Callers driving the render loop match on this (or on
/// [`Error::is_device_lost`]) to unwind and attempt a full re-initialization.
pub const DEVICE_LOST_MESSAGE: &str = "VK_ERROR_DEVICE_LOST";

/// Result type for Prism engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Prism engine errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Backend-specific error (a failed Vulkan call)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (texture, buffer, descriptor, ...)
    InvalidResource(String),

    /// Initialization failed (device, swapchain, subsystems)
    InitializationFailed(String),

    /// Shader authoring or reflection error (duplicate binding, bad output layout, ...)
    ShaderError(String),

    /// Framebuffer or pipeline construction error
    PipelineError(String),

    /// API misuse detected at runtime (illegal state transition, bad argument)
    ValidationError(String),

    /// The logical device was lost; unrecoverable at this layer
    DeviceLost,
}

impl Error {
    /// True if this error reports a lost device.
    pub fn is_device_lost(&self) -> bool {
        matches!(self, Error::DeviceLost)
            || matches!(self, Error::BackendError(msg) if msg.contains(DEVICE_LOST_MESSAGE))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::ShaderError(msg) => write!(f, "Shader error: {}", msg),
            Error::PipelineError(msg) => write!(f, "Pipeline error: {}", msg),
            Error::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Error::DeviceLost => write!(f, "{}", DEVICE_LOST_MESSAGE),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
