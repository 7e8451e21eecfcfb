//! `teller-engine`: the ledger & access-control core.
//!
//! Four engines over one persistence gateway:
//!
//! - [`AccessControl`] resolves a caller's standing on an account and applies
//!   the capability table (fail closed).
//! - [`AccountRegistry`] owns account lifecycle: create, rename, convert,
//!   delete, ownership transfer, membership.
//! - [`LedgerEngine`] owns balances: deposits, withdrawals, transfers, each
//!   committed atomically with its immutable transaction record.
//! - [`InvoiceEngine`] owns the `sent → paid` invoice lifecycle, moving money
//!   through the same guarded commit as any other transfer.
//!
//! Every operation takes an explicit [`Caller`]; there is no ambient session
//! state. Every mutating operation checks its capability first.

pub mod access;
pub mod context;
pub mod identity;
pub mod invoices;
pub mod ledger;
pub mod registry;

pub use access::AccessControl;
pub use context::Caller;
pub use identity::{IdentityProvider, SessionRef, StaticIdentityProvider};
pub use invoices::InvoiceEngine;
pub use ledger::{LedgerEngine, TransferTarget};
pub use registry::AccountRegistry;

/// Optimistic-guard conflicts are retried this many times before the
/// operation surfaces `BankError::Conflict`.
pub(crate) const MAX_COMMIT_ATTEMPTS: usize = 3;
