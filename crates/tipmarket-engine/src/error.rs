//! Engine error types.

use tipmarket_store::StoreError;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by the settlement engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The request was structurally invalid (bad amount, buyer equals
    /// seller, empty reference).
    #[error("validation error: {0}")]
    Validation(String),

    /// Storage-level failure or conflict.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
