//! Account-level access control.
//!
//! Resolution (who is the caller on this account?) happens here against the
//! gateway; the decision itself is the pure policy in `teller-access`. Every
//! mutating operation in the registry, ledger and invoice engines calls
//! through this component before touching state.

use teller_access::{authorize, Capability, CapabilityTable, ResolvedAccess};
use teller_core::{AccountId, BankError, BankResult, CharacterId};
use teller_store::{AccountRow, LedgerGateway};

/// Capability evaluator over one gateway and one capability table.
#[derive(Debug, Clone)]
pub struct AccessControl<G> {
    gateway: G,
    table: CapabilityTable,
}

impl<G: LedgerGateway> AccessControl<G> {
    pub fn new(gateway: G, table: CapabilityTable) -> Self {
        Self { gateway, table }
    }

    pub fn table(&self) -> &CapabilityTable {
        &self.table
    }

    /// Resolve `character`'s standing on an already-loaded account row.
    pub fn resolve(&self, character: CharacterId, account: &AccountRow) -> ResolvedAccess {
        if account.is_personal() {
            return if account.owner == character {
                ResolvedAccess::PersonalOwner
            } else {
                ResolvedAccess::None
            };
        }
        match self.gateway.grant(account.id, character) {
            Ok(Some(grant)) => ResolvedAccess::Granted(grant.role),
            // Missing grant or a failed lookup both deny.
            Ok(None) | Err(_) => ResolvedAccess::None,
        }
    }

    /// `true` iff `character` holds `capability` on `account_id`.
    ///
    /// Fail closed: unknown account, missing grant, unknown role, or any
    /// gateway failure yields `false`, never an error that could bypass the
    /// caller's check.
    pub fn has_capability(
        &self,
        character: CharacterId,
        account_id: AccountId,
        capability: &Capability,
    ) -> bool {
        let Ok(Some(account)) = self.gateway.account(account_id) else {
            return false;
        };
        let access = self.resolve(character, &account);
        authorize(&access, capability, &self.table)
    }

    /// Error-returning form used at the top of every mutating operation.
    ///
    /// Distinguishes a missing account (`NotFound`) and an unreachable store
    /// (`Unavailable`, retryable) from a plain denial; none of them let the
    /// operation proceed.
    pub fn require(
        &self,
        character: CharacterId,
        account_id: AccountId,
        capability: &Capability,
    ) -> BankResult<AccountRow> {
        let account = self
            .gateway
            .account(account_id)?
            .ok_or_else(|| BankError::not_found(format!("account {account_id}")))?;
        let access = self.resolve(character, &account);
        if authorize(&access, capability, &self.table) {
            Ok(account)
        } else {
            Err(BankError::permission_denied(capability.as_str()))
        }
    }
}
