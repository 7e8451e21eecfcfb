//! `teller-core`: ledger domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! strongly-typed identifiers, the error taxonomy shared by every engine, and
//! the validated `Amount` value object.

pub mod error;
pub mod id;
pub mod money;

pub use error::{BankError, BankResult};
pub use id::{AccountId, CharacterId, InvoiceId, TransactionId};
pub use money::Amount;
