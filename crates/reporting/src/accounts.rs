//! The caller's account list, the entry point of any banking view.

use serde::Serialize;

use teller_access::Role;
use teller_core::{AccountId, BankResult, CharacterId};
use teller_engine::Caller;
use teller_store::{AccountKind, LedgerGateway};

/// One accessible account with the caller's standing on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountSummary {
    pub account_id: AccountId,
    pub label: String,
    pub kind: AccountKind,
    pub balance: i64,
    /// The caller's role on this account.
    pub role: Role,
    pub owner: CharacterId,
    /// Directory name of the owner, when still known.
    pub owner_name: Option<String>,
    pub is_default: bool,
}

pub struct AccountsQuery<G> {
    gateway: G,
}

impl<G: LedgerGateway + Clone> AccountsQuery<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    /// Every account the caller can act on: their personal account plus all
    /// shared accounts they hold a grant on, default account first. No
    /// capability gate: the list is already scoped to the caller's access.
    pub fn accessible(&self, caller: &Caller) -> BankResult<Vec<AccountSummary>> {
        let mut summaries = Vec::new();
        for access in self.gateway.accounts_accessible_to(caller.character_id)? {
            let owner_name = self.gateway.character(access.account.owner)?.map(|c| c.name);
            summaries.push(AccountSummary {
                account_id: access.account.id,
                label: access.account.label,
                kind: access.account.kind,
                balance: access.account.balance,
                role: access.role,
                owner: access.account.owner,
                owner_name,
                is_default: access.account.is_default,
            });
        }
        Ok(summaries)
    }
}
