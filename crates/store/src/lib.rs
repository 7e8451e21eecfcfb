//! `teller-store`: the Persistence Gateway contract.
//!
//! The engines never touch storage directly: they speak to a
//! [`LedgerGateway`], whose commit operations are atomic multi-row writes
//! guarded by optimistic version checks. Any backend that can apply a
//! [`BalanceCommit`] atomically (row locks, compare-and-swap, a single
//! mutex) satisfies the contract; [`InMemoryGateway`] is the reference
//! implementation used by tests and development.

pub mod error;
pub mod gateway;
pub mod in_memory;
pub mod rows;

pub use error::{StoreError, StoreResult};
pub use gateway::{BalanceCommit, InvoiceSettlement, LedgerGateway, VersionGuard};
pub use in_memory::InMemoryGateway;
pub use rows::{
    AccountAccess, AccountKind, AccountRow, CharacterRow, GrantRow, InvoiceRow, TransactionRow,
};
