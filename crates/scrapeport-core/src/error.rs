//! Shared error type across scrapeport crates.

use thiserror::Error;

/// Stable error codes (safe to match on in callers and tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Incompatible redefinition of a registered metric.
    DuplicateMetric,
    /// Caller supplied an argument the instrument or registry rejects.
    InvalidArgument,
    /// Server construction parameters are unusable.
    Configuration,
    /// `start` called on a server that is not stopped.
    AlreadyRunning,
    /// An on-demand collector failed during collection.
    Collector,
    /// Malformed text exposition input.
    Parse,
    /// Socket or sink I/O failure.
    Io,
}

impl ErrorCode {
    /// String representation used in logs and assertions.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::DuplicateMetric => "DUPLICATE_METRIC",
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::Configuration => "CONFIGURATION",
            ErrorCode::AlreadyRunning => "ALREADY_RUNNING",
            ErrorCode::Collector => "COLLECTOR",
            ErrorCode::Parse => "PARSE",
            ErrorCode::Io => "IO",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("duplicate metric: {0}")]
    DuplicateMetric(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("configuration: {0}")]
    Configuration(String),
    #[error("server is already running")]
    AlreadyRunning,
    #[error("collector {name} failed: {message}")]
    Collector { name: String, message: String },
    #[error("parse error: {0}")]
    Parse(String),
    #[error("io: {0}")]
    Io(String),
}

impl ScrapeError {
    /// Map the error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            ScrapeError::DuplicateMetric(_) => ErrorCode::DuplicateMetric,
            ScrapeError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            ScrapeError::Configuration(_) => ErrorCode::Configuration,
            ScrapeError::AlreadyRunning => ErrorCode::AlreadyRunning,
            ScrapeError::Collector { .. } => ErrorCode::Collector,
            ScrapeError::Parse(_) => ErrorCode::Parse,
            ScrapeError::Io(_) => ErrorCode::Io,
        }
    }

    /// Convenience constructor for collector implementations.
    pub fn collector(name: impl Into<String>, message: impl Into<String>) -> Self {
        ScrapeError::Collector {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for ScrapeError {
    fn from(e: std::io::Error) -> Self {
        ScrapeError::Io(e.to_string())
    }
}
