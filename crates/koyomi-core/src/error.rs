use thiserror::Error;

/// Core error type with minimal dependencies
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Malformed time token: {0}")]
    MalformedTimeToken(String),

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("Non-existent local time (DST gap): {0}")]
    NonExistentTime(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(&'static str),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
