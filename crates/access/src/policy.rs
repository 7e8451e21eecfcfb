use crate::capability::Capability;
use crate::role::Role;
use crate::table::CapabilityTable;

/// A caller's resolved standing on one account.
///
/// Construction is decoupled from storage: the engine resolves the caller
/// against the account record and its grants, then asks this pure policy
/// layer for a decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedAccess {
    /// Caller owns the personal account: every capability is implied.
    PersonalOwner,
    /// Caller holds a role grant on a shared account.
    Granted(Role),
    /// No grant, unknown account, or any resolution failure.
    None,
}

/// Evaluate whether the resolved standing grants `capability`.
///
/// - No IO
/// - No panics
/// - Fail closed: `ResolvedAccess::None` and unknown roles always deny.
pub fn authorize(access: &ResolvedAccess, capability: &Capability, table: &CapabilityTable) -> bool {
    match access {
        ResolvedAccess::PersonalOwner => true,
        ResolvedAccess::Granted(role) => table.grants(role, capability),
        ResolvedAccess::None => false,
    }
}
