//! Unit tests for log.rs
//!
//! Tests LogSeverity ordering, LogEntry, and DefaultLogger formatting.

use crate::log::{DefaultLogger, LogEntry, LogSeverity, Logger};
use std::time::SystemTime;

fn entry(severity: LogSeverity, file: Option<&'static str>, line: Option<u32>) -> LogEntry {
    LogEntry {
        severity,
        timestamp: SystemTime::now(),
        source: "prism::vulkan".to_string(),
        message: "swapchain out of date".to_string(),
        file,
        line,
    }
}

// ============================================================================
// LOG SEVERITY TESTS
// ============================================================================

#[test]
fn test_log_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_log_severity_debug() {
    assert_eq!(format!("{:?}", LogSeverity::Trace), "Trace");
    assert_eq!(format!("{:?}", LogSeverity::Error), "Error");
}

// ============================================================================
// DEFAULT LOGGER TESTS
// ============================================================================

#[test]
fn test_format_plain_without_location() {
    let line = DefaultLogger::format_plain(&entry(LogSeverity::Warn, None, None));
    assert!(line.contains("[WARN ]"));
    assert!(line.contains("[prism::vulkan]"));
    assert!(line.ends_with("swapchain out of date"));
}

#[test]
fn test_format_plain_with_location() {
    let line = DefaultLogger::format_plain(&entry(LogSeverity::Error, Some("vulkan_swapchain.rs"), Some(88)));
    assert!(line.contains("[ERROR]"));
    assert!(line.ends_with("(vulkan_swapchain.rs:88)"));
}

#[test]
fn test_format_plain_timestamp_shape() {
    let line = DefaultLogger::format_plain(&entry(LogSeverity::Info, None, None));
    // [YYYY-MM-DD HH:MM:SS.mmm]
    let close = line.find(']').unwrap();
    assert_eq!(close, 24);
}

#[test]
fn test_default_logger_all_severities() {
    let logger = DefaultLogger;
    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        logger.log(&entry(severity, None, None));
        logger.log(&entry(severity, Some("test.rs"), Some(1)));
    }
}

#[test]
fn test_logger_trait_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<DefaultLogger>();
}
