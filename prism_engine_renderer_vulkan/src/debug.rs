/// Validation layer messenger
///
/// Routes `VK_EXT_debug_utils` messages through the engine logger (or a log
/// file), filters them by severity and category, and keeps per-severity
/// statistics for `get_validation_stats`.

use ash::vk;
use colored::*;
use prism_engine::prism::log::LogSeverity;
use prism_engine::prism::render::{DebugMessageFilter, DebugOutput, DebugSeverity, ValidationStats};
use prism_engine::prism::Engine;
use rustc_hash::FxHashMap;
use std::ffi::CStr;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

const SOURCE: &str = "prism::validation";

// ===== CONFIGURATION =====

/// Messenger settings, copied from the device `Config`
#[derive(Debug, Clone)]
pub struct Config {
    pub severity: DebugSeverity,
    pub output: DebugOutput,
    pub message_filter: DebugMessageFilter,
    pub break_on_error: bool,
    pub panic_on_error: bool,
    pub enable_stats: bool,
}

static MESSENGER_CONFIG: Mutex<Option<Config>> = Mutex::new(None);

static STATS: MessageCounters = MessageCounters::new();

/// Occurrences of each distinct message text
static REPEATS: Mutex<Option<FxHashMap<String, u32>>> = Mutex::new(None);

struct MessageCounters {
    errors: AtomicU32,
    warnings: AtomicU32,
    info: AtomicU32,
    verbose: AtomicU32,
}

impl MessageCounters {
    const fn new() -> Self {
        Self {
            errors: AtomicU32::new(0),
            warnings: AtomicU32::new(0),
            info: AtomicU32::new(0),
            verbose: AtomicU32::new(0),
        }
    }

    fn counter(&self, severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> &AtomicU32 {
        if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
            &self.errors
        } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
            &self.warnings
        } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
            &self.info
        } else {
            &self.verbose
        }
    }

    fn snapshot(&self) -> ValidationStats {
        ValidationStats {
            errors: self.errors.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            info: self.info.load(Ordering::Relaxed),
            verbose: self.verbose.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.errors.store(0, Ordering::Relaxed);
        self.warnings.store(0, Ordering::Relaxed);
        self.info.store(0, Ordering::Relaxed);
        self.verbose.store(0, Ordering::Relaxed);
    }
}

/// Install the messenger settings and clear previous statistics
pub fn init_debug_config(config: Config) {
    STATS.reset();
    if let Ok(mut repeats) = REPEATS.lock() {
        *repeats = config.enable_stats.then(FxHashMap::default);
    }
    if let Ok(mut guard) = MESSENGER_CONFIG.lock() {
        *guard = Some(config);
    }
}

/// Drop the settings; callbacks arriving afterwards are ignored
pub fn cleanup_debug_config() {
    if let Ok(mut guard) = MESSENGER_CONFIG.lock() {
        *guard = None;
    }
}

/// Severity flags the messenger subscribes to
pub fn severity_flags(severity: DebugSeverity) -> vk::DebugUtilsMessageSeverityFlagsEXT {
    use vk::DebugUtilsMessageSeverityFlagsEXT as S;
    match severity {
        DebugSeverity::ErrorsOnly => S::ERROR,
        DebugSeverity::ErrorsAndWarnings => S::ERROR | S::WARNING,
        DebugSeverity::All => S::ERROR | S::WARNING | S::INFO | S::VERBOSE,
    }
}

// ===== STATISTICS =====

/// Validation messages counted since the device was created
pub fn get_validation_stats() -> ValidationStats {
    STATS.snapshot()
}

/// Print the counters gathered so far
pub fn print_validation_stats_report() {
    let stats = get_validation_stats();

    if stats.total() == 0 {
        println!("\n{}", "No validation messages".green().bold());
        return;
    }

    println!("\n{}", "=== Validation report ===".bright_blue().bold());
    println!("  {} {}", "Errors:".red().bold(), stats.errors);
    println!("  {} {}", "Warnings:".yellow().bold(), stats.warnings);
    println!("  {} {}", "Info:".cyan(), stats.info);
    println!("  {} {}", "Verbose:".bright_black(), stats.verbose);

    let repeated = REPEATS
        .lock()
        .ok()
        .and_then(|guard| guard.as_ref().map(|m| m.values().filter(|&&n| n > 1).count()))
        .unwrap_or(0);
    if repeated > 0 {
        println!("  {} distinct message(s) repeated", repeated);
    }
}

// ===== CALLBACK =====

fn category(message_type: vk::DebugUtilsMessageTypeFlagsEXT) -> &'static str {
    if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "Validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "Performance"
    } else {
        "General"
    }
}

fn category_shown(filter: &DebugMessageFilter, message_type: vk::DebugUtilsMessageTypeFlagsEXT) -> bool {
    match category(message_type) {
        "Validation" => filter.show_validation,
        "Performance" => filter.show_performance,
        _ => filter.show_general,
    }
}

fn log_severity(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> LogSeverity {
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        LogSeverity::Error
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        LogSeverity::Warn
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        LogSeverity::Info
    } else {
        LogSeverity::Trace
    }
}

unsafe fn c_str_or<'a>(ptr: *const std::os::raw::c_char, fallback: &'a str) -> std::borrow::Cow<'a, str> {
    if ptr.is_null() {
        std::borrow::Cow::Borrowed(fallback)
    } else {
        CStr::from_ptr(ptr).to_string_lossy()
    }
}

fn record_repeat(message: &str) -> u32 {
    let Ok(mut guard) = REPEATS.lock() else {
        return 1;
    };
    match guard.as_mut() {
        Some(map) => {
            let count = map.entry(message.to_string()).or_insert(0);
            *count += 1;
            *count
        }
        None => 1,
    }
}

/// Debug messenger callback handed to `vkCreateDebugUtilsMessengerEXT`
pub unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }

    let config = match MESSENGER_CONFIG.lock() {
        Ok(guard) => match guard.as_ref() {
            Some(config) => config.clone(),
            None => return vk::FALSE,
        },
        Err(_) => return vk::FALSE,
    };

    if !severity_flags(config.severity).intersects(message_severity)
        || !category_shown(&config.message_filter, message_type)
    {
        return vk::FALSE;
    }

    let data = &*p_callback_data;
    let message_id = c_str_or(data.p_message_id_name, "Unknown");
    let message = c_str_or(data.p_message, "No message");
    let kind = category(message_type);
    let is_error = message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR);

    let repeat = if config.enable_stats {
        STATS.counter(message_severity).fetch_add(1, Ordering::Relaxed);
        record_repeat(&message)
    } else {
        1
    };
    let repeat_suffix = if repeat > 1 { format!(" [x{}]", repeat) } else { String::new() };

    let line = format!("[{}]{} {}: {}", kind, repeat_suffix, message_id, message);

    match &config.output {
        DebugOutput::Console => Engine::log(log_severity(message_severity), SOURCE, line.clone()),
        DebugOutput::File(path) => append_to_file(path, &line),
        DebugOutput::Both(path) => {
            Engine::log(log_severity(message_severity), SOURCE, line.clone());
            append_to_file(path, &line);
        }
    }

    if is_error && config.panic_on_error {
        panic!("Vulkan validation error: {}", line);
    }
    if is_error && config.break_on_error {
        eprintln!("{} {}", "Aborting on validation error:".red().bold(), line);
        std::process::abort();
    }

    vk::FALSE
}

fn append_to_file(path: &str, line: &str) {
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let _ = writeln!(file, "{}", line);
    }
}
