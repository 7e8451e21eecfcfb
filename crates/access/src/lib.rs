//! `teller-access`: role-based access policy for accounts.
//!
//! Pure policy layer: role and capability newtypes, the data-driven
//! role → capability table, and the fail-closed authorization check.
//! Resolution of a caller's standing on an account (grant lookup, personal
//! ownership) lives in `teller-engine`; this crate performs no IO.

pub mod capability;
pub mod policy;
pub mod role;
pub mod table;

pub use capability::Capability;
pub use policy::{authorize, ResolvedAccess};
pub use role::Role;
pub use table::CapabilityTable;
