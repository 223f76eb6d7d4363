//! Error types for the RTT engine
//!
//! This module defines the error types used throughout the engine,
//! including device calls, scene setup, and frame submission.

use std::fmt;

/// Result type for RTT engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// RTT engine errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (device call failed)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (unknown handle, out of range attachment, etc.)
    InvalidResource(String),

    /// Initialization failed (scene setup, device, subsystems)
    InitializationFailed(String),

    /// A queue submission was rejected
    SubmitFailed(String),

    /// A bounded wait expired before the primitive was signaled
    Timeout(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::SubmitFailed(msg) => write!(f, "Submit failed: {}", msg),
            Error::Timeout(msg) => write!(f, "Timeout: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ===== ERROR MACROS =====

/// Log an ERROR message and build an `Error::BackendError` with the same text
///
/// # Example
///
/// ```no_run
/// # use rtt_engine::engine_err;
/// let err = engine_err!("rtt::headless", "Unknown fence {:?}", 3);
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        $crate::rtt::Error::BackendError(message)
    }};
}

/// Log an ERROR message and return early with `Error::BackendError`
///
/// # Example
///
/// ```no_run
/// # use rtt_engine::engine_bail;
/// # fn check(count: usize) -> rtt_engine::rtt::Result<()> {
/// if count == 0 {
///     engine_bail!("rtt::Scene", "Swapchain has no images");
/// }
/// # Ok(())
/// # }
/// ```
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
