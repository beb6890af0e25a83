use thiserror::Error;

/// Transformation layer errors - combines all error types
#[derive(Error, Debug)]
pub enum RecurError {
    #[error(transparent)]
    CoreError(#[from] koyomi_core::error::CoreError),

    #[error("Rule syntax error: {0}")]
    RuleSyntax(#[from] rrule::RRuleError),

    #[error("Repository error: {0}")]
    RepositoryError(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(&'static str),
}

pub type RecurResult<T> = std::result::Result<T, RecurError>;
