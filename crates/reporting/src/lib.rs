//! `teller-reporting`: read-side queries over the ledger.
//!
//! Everything here is derived from committed rows at read time; nothing is
//! cached or stored. Account-scoped queries check the caller's capability on
//! the viewed account through the same [`teller_engine::AccessControl`] the
//! engines use; the account list itself is scoped to the caller's access.

pub mod accounts;
pub mod dashboard;
pub mod filter;
pub mod history;
pub mod invoices;
pub mod pagination;
pub mod roster;

pub use accounts::{AccountSummary, AccountsQuery};
pub use dashboard::{AccountOverview, DailyFlow, DashboardQuery};
pub use filter::{DateRange, Direction, TransactionFilter};
pub use history::{HistoryQuery, TransactionEntry};
pub use invoices::{InvoiceEntry, InvoiceQuery, InvoiceStatus, InvoiceView};
pub use pagination::{paginate, Page};
pub use roster::{MemberEntry, RosterQuery};
