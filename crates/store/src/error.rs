use thiserror::Error;

use teller_core::BankError;

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence gateway error.
///
/// These are infrastructure outcomes (guard failures, missing rows, backend
/// unavailability), distinct from domain errors. Engines map them into
/// [`BankError`] at their boundary; `Conflict` is usually intercepted first
/// for an optimistic retry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A commit guard failed (stale version, settled invoice, balance floor).
    #[error("commit guard failed: {0}")]
    Conflict(String),

    /// A referenced row does not exist.
    #[error("row not found: {0}")]
    NotFound(String),

    /// A commit violated the gateway contract (engine-side bug).
    #[error("invalid commit: {0}")]
    Invalid(String),

    /// The backend is unreachable or corrupted; safe to retry.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}

impl From<StoreError> for BankError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => BankError::Conflict(msg),
            StoreError::NotFound(what) => BankError::NotFound(what),
            StoreError::Invalid(msg) => BankError::Unavailable(format!("invalid commit: {msg}")),
            StoreError::Unavailable(msg) => BankError::Unavailable(msg),
        }
    }
}
