//! Unit tests for log.rs
//!
//! Tests Logger trait, LogEntry, LogSeverity, DefaultLogger and the global
//! logger switch. Tests touching the global logger run with #[serial].

use crate::log::{self, Logger, LogEntry, LogSeverity, DefaultLogger};
use serial_test::serial;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

// ============================================================================
// TEST HELPERS
// ============================================================================

const SOURCE: &str = "orchestra::log_tests";

/// Captures "Severity: message" strings emitted from this test module only,
/// so parallel tests logging elsewhere do not interfere.
#[derive(Clone)]
struct CaptureLogger {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CaptureLogger {
    fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        if entry.source != SOURCE {
            return;
        }
        self.entries
            .lock()
            .unwrap()
            .push(format!("{:?}: {}", entry.severity, entry.message));
    }
}

fn entry(severity: LogSeverity, file: Option<&'static str>, line: Option<u32>) -> LogEntry {
    LogEntry {
        severity,
        timestamp: SystemTime::now(),
        source: "orchestra::tests".to_string(),
        message: format!("{:?} message", severity),
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
// LOG ENTRY TESTS
// ============================================================================

#[test]
fn test_log_entry_with_file_line() {
    let e = entry(LogSeverity::Error, Some("framebuffer.rs"), Some(42));
    assert_eq!(e.severity, LogSeverity::Error);
    assert_eq!(e.file, Some("framebuffer.rs"));
    assert_eq!(e.line, Some(42));
}

#[test]
fn test_log_entry_clone() {
    let e1 = entry(LogSeverity::Warn, None, None);
    let e2 = e1.clone();
    assert_eq!(e1.severity, e2.severity);
    assert_eq!(e1.message, e2.message);
}

// ============================================================================
// DEFAULT LOGGER TESTS
// ============================================================================

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
        // Just verify neither branch panics
        logger.log(&entry(severity, None, None));
        logger.log(&entry(severity, Some("test.rs"), Some(7)));
    }
}

#[test]
fn test_logger_trait_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<DefaultLogger>();
}

// ============================================================================
// GLOBAL LOGGER TESTS
// ============================================================================

#[test]
#[serial]
fn test_set_logger_receives_macro_output() {
    let capture = CaptureLogger::new();
    log::set_logger(capture.clone());

    crate::orchestra_info!(SOURCE, "graph built with {} passes", 3);
    crate::orchestra_error!(SOURCE, "validation failed");

    let entries = capture.entries();
    log::reset_logger();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0], "Info: graph built with 3 passes");
    assert_eq!(entries[1], "Error: validation failed");
}

#[test]
#[serial]
fn test_min_severity_filters_entries() {
    let capture = CaptureLogger::new();
    log::set_logger(capture.clone());
    log::set_min_severity(LogSeverity::Warn);

    crate::orchestra_trace!(SOURCE, "bind");
    crate::orchestra_info!(SOURCE, "built");
    crate::orchestra_warn!(SOURCE, "stale");

    let entries = capture.entries();
    assert_eq!(log::min_severity(), LogSeverity::Warn);
    log::reset_logger();

    assert_eq!(entries, vec!["Warn: stale".to_string()]);
    assert_eq!(log::min_severity(), LogSeverity::Trace);
}

#[test]
#[serial]
fn test_reset_logger_detaches_custom_logger() {
    let capture = CaptureLogger::new();
    log::set_logger(capture.clone());
    log::reset_logger();

    crate::orchestra_info!(SOURCE, "after reset");
    assert!(capture.entries().is_empty());
}
