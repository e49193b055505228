//! Error types for GPIOSysV
//!
//! Provides a unified error type for all operations, plus the integer
//! error codes clients report back to their callers.

use thiserror::Error;

/// Result type alias using GpioError
pub type Result<T> = std::result::Result<T, GpioError>;

/// Generic error code for validation failures, dispatch mismatches and timeouts
pub const ERROR_SENTINEL: i32 = 9999;

/// Unified error type for GPIOSysV operations
#[derive(Debug, Error)]
pub enum GpioError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Validation Errors
    // -------------------------------------------------------------------------
    #[error("Invalid command {function}: {reason}")]
    Validation { function: String, reason: String },

    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("{op} failed on queue 0x{key:08x} (errno {errno})")]
    Transport {
        op: &'static str,
        key: i32,
        errno: i32,
    },

    #[error("Message of {size} bytes exceeds the {max} byte limit")]
    MessageTooLarge { size: usize, max: usize },

    #[error("No reply on queue 0x{key:08x} tag {tag} within {waited_ms} ms")]
    Timeout { key: i32, tag: i64, waited_ms: u64 },

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Hardware Errors
    // -------------------------------------------------------------------------
    #[error("Driver error on pin {pin}: {reason}")]
    Driver { pin: u8, reason: String },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl GpioError {
    /// Build a validation error for `function`
    pub fn validation(function: impl Into<String>, reason: impl Into<String>) -> Self {
        GpioError::Validation {
            function: function.into(),
            reason: reason.into(),
        }
    }

    /// Integer code reported to callers
    ///
    /// Transport failures bubble up the native errno; everything the
    /// protocol itself rejects collapses onto [`ERROR_SENTINEL`].
    pub fn code(&self) -> i32 {
        match self {
            GpioError::Transport { errno, .. } => *errno,
            GpioError::Io(e) => e.raw_os_error().unwrap_or(ERROR_SENTINEL),
            GpioError::MessageTooLarge { .. } => libc::EINVAL,
            GpioError::Validation { .. }
            | GpioError::Timeout { .. }
            | GpioError::Protocol(_)
            | GpioError::Serialization(_)
            | GpioError::Driver { .. }
            | GpioError::Config(_) => ERROR_SENTINEL,
        }
    }

    /// Whether the error is a missing-reply timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, GpioError::Timeout { .. })
    }
}

impl From<bincode::Error> for GpioError {
    fn from(e: bincode::Error) -> Self {
        GpioError::Serialization(e.to_string())
    }
}
