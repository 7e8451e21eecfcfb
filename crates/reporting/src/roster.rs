//! Member roster for shared accounts.

use serde::Serialize;

use teller_access::capability::names;
use teller_access::Role;
use teller_core::{AccountId, BankError, BankResult, CharacterId};
use teller_engine::{AccessControl, Caller};
use teller_store::LedgerGateway;

use crate::pagination::{paginate, Page, ROSTER_PAGE_SIZE};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberEntry {
    pub character_id: CharacterId,
    /// Directory name; falls back to the raw id for characters that have
    /// left the directory.
    pub name: String,
    pub role: Role,
}

pub struct RosterQuery<G> {
    gateway: G,
    access: AccessControl<G>,
}

impl<G: LedgerGateway + Clone> RosterQuery<G> {
    pub fn new(gateway: G, access: AccessControl<G>) -> Self {
        Self { gateway, access }
    }

    /// Page `page` of the account's members, owner first, then by rank and
    /// name. Requires `manageUser`; personal accounts have no roster.
    pub fn members(
        &self,
        caller: &Caller,
        account_id: AccountId,
        search: Option<&str>,
        page: usize,
    ) -> BankResult<Page<MemberEntry>> {
        let account = self
            .access
            .require(caller.character_id, account_id, &names::manage_user())?;
        if account.is_personal() {
            return Err(BankError::invalid_target(
                "personal accounts have no membership",
            ));
        }

        let mut members = Vec::new();
        for grant in self.gateway.grants_for_account(account_id)? {
            let name = self
                .gateway
                .character(grant.character_id)?
                .map(|c| c.name)
                .unwrap_or_else(|| grant.character_id.to_string());
            members.push(MemberEntry {
                character_id: grant.character_id,
                name,
                role: grant.role,
            });
        }
        if let Some(needle) = search {
            let needle = needle.to_lowercase();
            members.retain(|m| m.name.to_lowercase().contains(&needle));
        }
        members.sort_by(|a, b| {
            b.role
                .rank()
                .cmp(&a.role.rank())
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(paginate(members, page, ROSTER_PAGE_SIZE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::Arc;
    use teller_access::CapabilityTable;
    use teller_store::{AccountKind, AccountRow, CharacterRow, GrantRow, InMemoryGateway};

    fn setup() -> (Arc<InMemoryGateway>, RosterQuery<Arc<InMemoryGateway>>) {
        let gateway = Arc::new(InMemoryGateway::new());
        let access = AccessControl::new(gateway.clone(), CapabilityTable::default_table());
        let query = RosterQuery::new(gateway.clone(), access);
        (gateway, query)
    }

    fn member(gateway: &InMemoryGateway, account: AccountId, name: &str, role: Role) -> CharacterId {
        let id = CharacterId::new();
        gateway
            .upsert_character(CharacterRow {
                id,
                name: name.to_string(),
            })
            .unwrap();
        gateway
            .upsert_grant(GrantRow {
                account_id: account,
                character_id: id,
                role,
            })
            .unwrap();
        id
    }

    fn shared_account(gateway: &InMemoryGateway, owner: CharacterId) -> AccountId {
        let id = AccountId::new();
        gateway
            .create_account(
                AccountRow {
                    id,
                    label: "crew".to_string(),
                    owner,
                    kind: AccountKind::Shared,
                    balance: 0,
                    is_default: false,
                    version: 0,
                    created_at: Utc::now(),
                },
                Some(GrantRow {
                    account_id: id,
                    character_id: owner,
                    role: Role::owner(),
                }),
            )
            .unwrap();
        id
    }

    #[test]
    fn roster_sorts_owner_first_then_rank_then_name() {
        let (gateway, query) = setup();
        let owner = CharacterId::new();
        gateway
            .upsert_character(CharacterRow {
                id: owner,
                name: "Zed Quill".to_string(),
            })
            .unwrap();
        let account = shared_account(&gateway, owner);
        member(&gateway, account, "Bob Mercer", Role::employee());
        member(&gateway, account, "Ada Price", Role::manager());
        member(&gateway, account, "Ann Doyle", Role::employee());

        let page = query.members(&Caller::new(owner), account, None, 0).unwrap();
        let names: Vec<&str> = page.items.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["Zed Quill", "Ada Price", "Ann Doyle", "Bob Mercer"]);
    }

    #[test]
    fn roster_search_filters_by_name_and_pages_at_seven() {
        let (gateway, query) = setup();
        let owner = CharacterId::new();
        gateway
            .upsert_character(CharacterRow {
                id: owner,
                name: "Owner One".to_string(),
            })
            .unwrap();
        let account = shared_account(&gateway, owner);
        for i in 0..9 {
            member(&gateway, account, &format!("Member {i:02}"), Role::employee());
        }

        let page = query.members(&Caller::new(owner), account, None, 0).unwrap();
        assert_eq!(page.items.len(), 7);
        assert_eq!(page.total, 10);
        assert_eq!(page.page_count, 2);

        let page = query
            .members(&Caller::new(owner), account, Some("member 03"), 0)
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].name, "Member 03");
    }

    #[test]
    fn employees_cannot_read_the_roster() {
        let (gateway, query) = setup();
        let owner = CharacterId::new();
        let account = shared_account(&gateway, owner);
        let worker = member(&gateway, account, "Bob Mercer", Role::employee());

        let err = query
            .members(&Caller::new(worker), account, None, 0)
            .unwrap_err();
        assert!(matches!(err, BankError::PermissionDenied(_)));
    }
}
