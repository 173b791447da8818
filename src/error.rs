use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("log_tracebacks_duplicate_limit must be at least 1, got {0}")]
    DuplicateLimit(usize),

    #[error("{field} must be a finite number, got {value}")]
    NotFinite { field: &'static str, value: f64 },
}

#[derive(Debug, Error)]
pub enum InspectError {
    /// A query log entry carried a time value that is not a number of seconds.
    #[error("query #{index} has an unparseable time value: {value:?}")]
    InvalidQueryTime { index: usize, value: String },

    /// Inspection is disabled; the middleware should not be installed.
    #[error("query inspection is disabled")]
    NotUsed,

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, InspectError>;
