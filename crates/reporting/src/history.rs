//! Paginated, filterable transaction history for one account.

use chrono::{DateTime, Utc};
use serde::Serialize;

use teller_access::capability::names;
use teller_core::{AccountId, BankResult, CharacterId, TransactionId};
use teller_engine::{AccessControl, Caller};
use teller_store::{LedgerGateway, TransactionRow};

use crate::filter::{Direction, TransactionFilter};
use crate::pagination::{paginate, Page, TRANSACTION_PAGE_SIZE};

/// One history row as seen from a specific account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionEntry {
    pub id: TransactionId,
    pub direction: Direction,
    pub amount: i64,
    /// The viewed account's balance right after this transaction.
    pub balance_after: i64,
    /// The account on the other side, if this was a transfer.
    pub counterparty: Option<AccountId>,
    pub actor: CharacterId,
    /// Directory name of the actor, when still known.
    pub actor_name: Option<String>,
    pub message: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

pub struct HistoryQuery<G> {
    gateway: G,
    access: AccessControl<G>,
}

impl<G: LedgerGateway + Clone> HistoryQuery<G> {
    pub fn new(gateway: G, access: AccessControl<G>) -> Self {
        Self { gateway, access }
    }

    /// Page `page` of the account's history, newest first. Requires
    /// `viewHistory`. Includes transactions from before any grants changed;
    /// visibility is about the account, not about who acted.
    pub fn transactions(
        &self,
        caller: &Caller,
        account_id: AccountId,
        filter: &TransactionFilter,
        page: usize,
    ) -> BankResult<Page<TransactionEntry>> {
        self.access
            .require(caller.character_id, account_id, &names::view_history())?;

        let mut entries = Vec::new();
        for row in self.gateway.transactions_for_account(account_id)? {
            let entry = self.entry_for(account_id, &row)?;
            let mut haystacks: Vec<&str> = Vec::new();
            if let Some(message) = entry.message.as_deref() {
                haystacks.push(message);
            }
            if let Some(name) = entry.actor_name.as_deref() {
                haystacks.push(name);
            }
            if filter.matches(entry.direction, entry.occurred_at, &haystacks) {
                entries.push(entry);
            }
        }
        Ok(paginate(entries, page, TRANSACTION_PAGE_SIZE))
    }

    fn entry_for(&self, account_id: AccountId, row: &TransactionRow) -> BankResult<TransactionEntry> {
        let inbound = row.to_account == Some(account_id);
        let (direction, balance_after, counterparty) = if inbound {
            (
                Direction::Inbound,
                row.to_balance_after.unwrap_or_default(),
                row.from_account,
            )
        } else {
            (
                Direction::Outbound,
                row.from_balance_after.unwrap_or_default(),
                row.to_account,
            )
        };
        let actor_name = self.gateway.character(row.actor)?.map(|c| c.name);
        Ok(TransactionEntry {
            id: row.id,
            direction,
            amount: row.amount,
            balance_after,
            counterparty,
            actor: row.actor,
            actor_name,
            message: row.message.clone(),
            occurred_at: row.occurred_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teller_access::CapabilityTable;
    use teller_core::BankError;
    use teller_store::{
        AccountKind, AccountRow, BalanceCommit, CharacterRow, InMemoryGateway, VersionGuard,
    };
    use std::sync::Arc;

    fn setup() -> (Arc<InMemoryGateway>, HistoryQuery<Arc<InMemoryGateway>>) {
        let gateway = Arc::new(InMemoryGateway::new());
        let access = AccessControl::new(gateway.clone(), CapabilityTable::default_table());
        let query = HistoryQuery::new(gateway.clone(), access);
        (gateway, query)
    }

    fn personal_account(gateway: &InMemoryGateway, owner: CharacterId) -> AccountId {
        let id = AccountId::new();
        gateway
            .create_account(
                AccountRow {
                    id,
                    label: "personal".to_string(),
                    owner,
                    kind: AccountKind::Personal,
                    balance: 0,
                    is_default: false,
                    version: 0,
                    created_at: Utc::now(),
                },
                None,
            )
            .unwrap();
        id
    }

    fn deposit(gateway: &InMemoryGateway, account: AccountId, amount: i64, actor: CharacterId, message: Option<&str>) {
        let row = gateway.account(account).unwrap().unwrap();
        gateway
            .commit_balance(BalanceCommit {
                debit: None,
                credit: Some(VersionGuard::of(&row)),
                amount,
                actor,
                message: message.map(str::to_string),
                settle_invoice: None,
                occurred_at: Utc::now(),
            })
            .unwrap();
    }

    #[test]
    fn history_pages_newest_first_at_nine_rows() {
        let (gateway, query) = setup();
        let owner = CharacterId::new();
        let account = personal_account(&gateway, owner);
        for i in 1..=12 {
            deposit(&gateway, account, i, owner, None);
        }

        let first = query
            .transactions(&Caller::new(owner), account, &TransactionFilter::default(), 0)
            .unwrap();
        assert_eq!(first.total, 12);
        assert_eq!(first.page_count, 2);
        assert_eq!(first.items.len(), 9);
        assert_eq!(first.items[0].amount, 12);
        assert_eq!(first.items[0].direction, Direction::Inbound);

        let second = query
            .transactions(&Caller::new(owner), account, &TransactionFilter::default(), 1)
            .unwrap();
        assert_eq!(second.items.len(), 3);
        assert_eq!(second.items[2].amount, 1);
    }

    #[test]
    fn search_matches_messages_and_actor_names() {
        let (gateway, query) = setup();
        let owner = CharacterId::new();
        let clerk = CharacterId::new();
        gateway
            .upsert_character(CharacterRow {
                id: clerk,
                name: "Bob Mercer".to_string(),
            })
            .unwrap();
        let account = personal_account(&gateway, owner);
        deposit(&gateway, account, 100, clerk, Some("payroll"));
        deposit(&gateway, account, 200, owner, Some("tips"));

        let by_message = query
            .transactions(
                &Caller::new(owner),
                account,
                &TransactionFilter {
                    search: Some("payroll".to_string()),
                    ..Default::default()
                },
                0,
            )
            .unwrap();
        assert_eq!(by_message.total, 1);
        assert_eq!(by_message.items[0].amount, 100);

        let by_name = query
            .transactions(
                &Caller::new(owner),
                account,
                &TransactionFilter {
                    search: Some("mercer".to_string()),
                    ..Default::default()
                },
                0,
            )
            .unwrap();
        assert_eq!(by_name.total, 1);
        assert_eq!(by_name.items[0].actor_name.as_deref(), Some("Bob Mercer"));
    }

    #[test]
    fn history_is_gated_on_view_history() {
        let (gateway, query) = setup();
        let owner = CharacterId::new();
        let account = personal_account(&gateway, owner);

        let err = query
            .transactions(
                &Caller::new(CharacterId::new()),
                account,
                &TransactionFilter::default(),
                0,
            )
            .unwrap_err();
        assert!(matches!(err, BankError::PermissionDenied(_)));
    }
}
