//! Error types for fallible construction paths.
//!
//! The hot path (record construction, processing, appending) never returns
//! `Result` to the producer; only configuration-time construction can fail,
//! per the error handling rule in the spec's "Configuration misuse" kind.

use std::fmt;

/// Errors raised while constructing pipeline components.
///
/// All variants correspond to a "construction fails with an argument error;
/// producer code never sees a half-initialized object" case.
#[derive(Debug)]
pub enum LogError {
    /// A ring buffer capacity that was not a power of two, or zero.
    InvalidCapacity(usize),
    /// A rolling appender size limit of zero.
    InvalidSizeLimit(String),
    /// A rolling appender backup count of zero.
    InvalidBackupCount(usize),
    /// A record message that exceeds the 65535-byte wire limit.
    MessageTooLong(usize),
    /// A logger name longer than the 255-byte wire limit.
    LoggerNameTooLong(usize),
    /// An unparseable text-layout or rolling-filename pattern.
    InvalidPattern(String),
    /// An unparseable regex supplied to a filter.
    InvalidRegex(String),
    /// A filesystem operation failed during construction (not on the hot path).
    Io(std::io::Error),
}

impl fmt::Display for LogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogError::InvalidCapacity(c) => {
                write!(f, "ring buffer capacity must be a nonzero power of two, got {c}")
            }
            LogError::InvalidSizeLimit(s) => write!(f, "invalid size limit: {s}"),
            LogError::InvalidBackupCount(n) => {
                write!(f, "backup count must be greater than zero, got {n}")
            }
            LogError::MessageTooLong(n) => {
                write!(f, "message of {n} bytes exceeds the 65535-byte wire limit")
            }
            LogError::LoggerNameTooLong(n) => {
                write!(f, "logger name of {n} bytes exceeds the 255-byte wire limit")
            }
            LogError::InvalidPattern(p) => write!(f, "invalid pattern: {p}"),
            LogError::InvalidRegex(p) => write!(f, "invalid regex: {p}"),
            LogError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for LogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LogError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for LogError {
    fn from(e: std::io::Error) -> Self {
        LogError::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, LogError>;
