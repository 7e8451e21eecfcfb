//! Ledger error taxonomy.

use thiserror::Error;

/// Result type used across the ledger engines.
pub type BankResult<T> = Result<T, BankError>;

/// Error raised by ledger, registry, invoice and reporting operations.
///
/// Permission and validation failures are terminal for the request: the
/// operation did not change any state and must not be retried. `Conflict` and
/// `Unavailable` are the only retryable kinds; a conflicted or unavailable
/// mutation either never committed or fully committed, never half-committed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BankError {
    /// The caller does not hold the required capability on the account.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// A monetary amount was non-positive or otherwise malformed.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The source account balance cannot cover the requested amount.
    #[error("insufficient funds (available {available}, requested {requested})")]
    InsufficientFunds { available: i64, requested: i64 },

    /// Self-transfer, or a recipient/account that cannot be resolved.
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    /// The invoice was already settled.
    #[error("invoice already paid")]
    AlreadyPaid,

    /// A referenced account, invoice or character does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Concurrent mutation kept invalidating the commit guard.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The persistence gateway failed; safe to retry.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl BankError {
    pub fn permission_denied(capability: impl Into<String>) -> Self {
        Self::PermissionDenied(capability.into())
    }

    pub fn invalid_amount(msg: impl Into<String>) -> Self {
        Self::InvalidAmount(msg.into())
    }

    pub fn invalid_target(msg: impl Into<String>) -> Self {
        Self::InvalidTarget(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Whether a caller may safely retry the failed operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::Unavailable(_))
    }
}
