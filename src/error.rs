use thiserror::Error;

/// Result type to simplify function signatures
pub type GridResult<T> = Result<T, GridError>;

/// Error taxonomy for the engine.
///
/// Every failure is reported synchronously to the caller; nothing is retried
/// internally. A failed view or layout computation leaves the previously
/// published buffer intact, so hosts can skip the frame and carry on.
#[derive(Error, Debug)]
pub enum GridError {
    #[error("not initialized: {0}")]
    NotInitialized(String),

    #[error("bad input: {0}")]
    BadInput(String),

    #[error("out of range: {0}")]
    OutOfRange(String),

    #[error("state misuse: {0}")]
    StateMisuse(String),

    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),
}

impl GridError {
    pub fn not_initialized(msg: impl Into<String>) -> Self {
        GridError::NotInitialized(msg.into())
    }

    pub fn bad_input(msg: impl Into<String>) -> Self {
        GridError::BadInput(msg.into())
    }

    pub fn out_of_range(msg: impl Into<String>) -> Self {
        GridError::OutOfRange(msg.into())
    }

    pub fn state_misuse(msg: impl Into<String>) -> Self {
        GridError::StateMisuse(msg.into())
    }
}
