//! Unit tests for the Engine logging hub
//!
//! IMPORTANT: LOGGER is a global OnceLock shared across all tests.
//! All tests are marked with #[serial] to run sequentially.

use crate::rtt::Engine;
use crate::rtt::log::{Logger, LogEntry, LogSeverity};
use std::sync::{Arc, Mutex};
use serial_test::serial;

// ============================================================================
// TEST HELPERS
// ============================================================================

/// Test logger that captures log entries for verification
struct TestLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl TestLogger {
    fn new() -> (Self, Arc<Mutex<Vec<LogEntry>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (Self { entries: entries.clone() }, entries)
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

// ============================================================================
// LOGGING API TESTS
// ============================================================================

#[test]
#[serial]
fn test_set_logger_receives_entries() {
    let (logger, entries) = TestLogger::new();
    Engine::set_logger(logger);

    Engine::log(LogSeverity::Info, "rtt::test", "hello".to_string());

    Engine::reset_logger();

    let entries = entries.lock().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].source, "rtt::test");
    assert_eq!(entries[0].message, "hello");
    assert!(entries[0].file.is_none());
}

#[test]
#[serial]
fn test_log_detailed_carries_location() {
    let (logger, entries) = TestLogger::new();
    Engine::set_logger(logger);

    Engine::log_detailed(LogSeverity::Error, "rtt::test", "boom".to_string(), "scene.rs", 7);

    Engine::reset_logger();

    let entries = entries.lock().unwrap();
    assert_eq!(entries[0].severity, LogSeverity::Error);
    assert_eq!(entries[0].file, Some("scene.rs"));
    assert_eq!(entries[0].line, Some(7));
}

#[test]
#[serial]
fn test_macros_route_through_engine() {
    let (logger, entries) = TestLogger::new();
    Engine::set_logger(logger);

    crate::engine_trace!("rtt::test", "trace {}", 1);
    crate::engine_debug!("rtt::test", "debug {}", 2);
    crate::engine_info!("rtt::test", "info {}", 3);
    crate::engine_warn!("rtt::test", "warn {}", 4);
    crate::engine_error!("rtt::test", "error {}", 5);

    Engine::reset_logger();

    let entries = entries.lock().unwrap();
    let severities: Vec<LogSeverity> = entries.iter().map(|e| e.severity).collect();
    assert_eq!(severities, vec![
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ]);
    assert_eq!(entries[4].message, "error 5");
    assert!(entries[4].line.is_some());
}

#[test]
#[serial]
fn test_reset_logger_detaches_custom_logger() {
    let (logger, entries) = TestLogger::new();
    Engine::set_logger(logger);
    Engine::reset_logger();

    Engine::log(LogSeverity::Info, "rtt::test", "after reset".to_string());

    assert!(entries.lock().unwrap().is_empty());
}
