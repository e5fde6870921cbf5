/// Device configuration and runtime render settings

use crate::render::types::{CullMode, PolygonMode, SampleCount};

// ===== VALIDATION LAYER CONFIGURATION =====

/// Which validation messages are displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugSeverity {
    /// Only errors
    ErrorsOnly,
    /// Errors and warnings
    ErrorsAndWarnings,
    /// Everything including info and verbose
    All,
}

/// Where validation messages are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugOutput {
    /// stderr with colors
    Console,
    /// Append to a log file (no colors)
    File(String),
    /// Both console and file
    Both(String),
}

/// Validation message categories to display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugMessageFilter {
    pub show_general: bool,
    pub show_validation: bool,
    pub show_performance: bool,
}

impl Default for DebugMessageFilter {
    fn default() -> Self {
        Self {
            show_general: true,
            show_validation: true,
            show_performance: true,
        }
    }
}

/// Per-severity count of validation messages received
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub verbose: u32,
}

impl ValidationStats {
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.verbose
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

/// Device creation configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Enable the Khronos validation layer and the debug messenger
    pub enable_validation: bool,
    /// Application name reported to the driver
    pub app_name: String,
    /// Validation message severity filter
    pub debug_severity: DebugSeverity,
    /// Validation message destination
    pub debug_output: DebugOutput,
    /// Validation message category filter
    pub debug_message_filter: DebugMessageFilter,
    /// Abort the process on the first validation error
    pub break_on_validation_error: bool,
    /// Panic on the first validation error
    pub panic_on_error: bool,
    /// Count validation messages (see `get_validation_stats`)
    pub enable_validation_stats: bool,
    /// Allow depth sample count greater than color sample count
    /// (requires a mixed-samples device extension)
    pub enable_mixed_samples: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            app_name: "Prism Application".to_string(),
            debug_severity: DebugSeverity::ErrorsAndWarnings,
            debug_output: DebugOutput::Console,
            debug_message_filter: DebugMessageFilter::default(),
            break_on_validation_error: false,
            panic_on_error: false,
            enable_validation_stats: false,
            enable_mixed_samples: false,
        }
    }
}

// ===== RENDER SETTINGS =====

/// CPU wait policy for fences and image acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Wait without timeout
    Block,
    /// Zero timeout; a frame that is not ready is skipped this tick
    Poll,
}

impl WaitPolicy {
    /// Timeout in nanoseconds handed to fence waits and image acquisition
    pub fn timeout_ns(&self) -> u64 {
        match self {
            WaitPolicy::Block => u64::MAX,
            WaitPolicy::Poll => 0,
        }
    }
}

/// Filter used when downsampling mip levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MipmapFilter {
    /// Mip chain disabled, textures get a single level
    Disabled,
    Nearest,
    Linear,
}

impl MipmapFilter {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, MipmapFilter::Disabled)
    }
}

/// Runtime render settings
///
/// Passed explicitly to the calls that need them instead of living in
/// process-wide globals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    pub cull_mode: CullMode,
    pub polygon_mode: PolygonMode,
    /// Requested MSAA; clamped to the device maximum when passes are built
    pub msaa: SampleCount,
    pub mipmap_filter: MipmapFilter,
    pub fence_wait: WaitPolicy,
    /// `false` selects MAILBOX when the surface supports it, FIFO otherwise
    pub vsync: bool,
    /// Swapchain image count requested (clamped to surface capabilities)
    pub preferred_image_count: u32,
    /// Anisotropic filtering for samplers when the device supports it
    pub anisotropy: Option<f32>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            cull_mode: CullMode::Back,
            polygon_mode: PolygonMode::Fill,
            msaa: SampleCount::S1,
            mipmap_filter: MipmapFilter::Linear,
            fence_wait: WaitPolicy::Block,
            vsync: true,
            preferred_image_count: 2,
            anisotropy: Some(16.0),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
