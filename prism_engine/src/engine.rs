/// Prism Engine - process-wide logger and debug-break hook
///
/// The render core has no global scene state; what remains global is the
/// logger every subsystem writes through and the policy applied when a fatal
/// authoring error is detected.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{OnceLock, RwLock};
use std::time::SystemTime;
use crate::error::Error;
use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};

// ===== INTERNAL STATE =====

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

/// Current [`BreakMode`], stored as its discriminant
static BREAK_MODE: AtomicU8 = AtomicU8::new(BreakMode::Continue as u8);

/// What [`Engine::debug_break`] does after a fatal error was logged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BreakMode {
    /// Keep running, the error is already returned to the caller
    Continue = 0,
    /// Panic with the error message (useful under a debugger or in tests)
    Panic = 1,
    /// Abort the process immediately
    Abort = 2,
}

impl BreakMode {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => BreakMode::Panic,
            2 => BreakMode::Abort,
            _ => BreakMode::Continue,
        }
    }
}

// ===== PUBLIC API =====

/// Engine-wide services
pub struct Engine;

impl Engine {
    /// Set a custom logger
    ///
    /// # Example
    ///
    /// ```no_run
    /// use prism_engine::prism::Engine;
    /// use prism_engine::prism::log::DefaultLogger;
    ///
    /// Engine::set_logger(DefaultLogger);
    /// ```
    pub fn set_logger<L: Logger + 'static>(logger: L) {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(mut lock) = logger_lock.write() {
            *lock = Box::new(logger);
        }
    }

    /// Reset logger to default (DefaultLogger)
    pub fn reset_logger() {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(mut lock) = logger_lock.write() {
            *lock = Box::new(DefaultLogger);
        }
    }

    /// Internal logging method (for simple logs without file:line)
    ///
    /// Used by macros like engine_info!, engine_warn!, etc.
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        Self::dispatch(LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_string(),
            message,
            file: None,
            line: None,
        });
    }

    /// Internal logging method with file:line information (for ERROR logs)
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        Self::dispatch(LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_string(),
            message,
            file: Some(file),
            line: Some(line),
        });
    }

    fn dispatch(entry: LogEntry) {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(lock) = logger_lock.read() {
            lock.log(&entry);
        }
    }

    /// Select what happens when a fatal construction error is hit
    pub fn set_break_mode(mode: BreakMode) {
        BREAK_MODE.store(mode as u8, Ordering::SeqCst);
    }

    /// Current break mode
    pub fn break_mode() -> BreakMode {
        BreakMode::from_u8(BREAK_MODE.load(Ordering::SeqCst))
    }

    /// Debug-break hook, called after a fatal error has been logged
    pub fn debug_break(error: &Error) {
        match Self::break_mode() {
            BreakMode::Continue => {}
            BreakMode::Panic => panic!("prism debug break: {}", error),
            BreakMode::Abort => std::process::abort(),
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
