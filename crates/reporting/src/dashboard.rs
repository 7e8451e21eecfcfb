//! Account dashboard: balance, recent activity, and the weekly flow series.

use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;

use teller_access::capability::names;
use teller_core::{AccountId, BankResult};
use teller_engine::{AccessControl, Caller};
use teller_store::LedgerGateway;

use crate::filter::Direction;
use crate::history::TransactionEntry;
use crate::pagination::RECENT_TRANSACTIONS;

/// Income/expense totals for one calendar day (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyFlow {
    pub date: NaiveDate,
    pub income: i64,
    pub expense: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountOverview {
    pub account_id: AccountId,
    pub label: String,
    pub balance: i64,
    /// The most recent transactions, newest first.
    pub recent: Vec<TransactionEntry>,
    /// Seven entries, oldest day first, ending today. Days without activity
    /// are present with zero totals.
    pub series: Vec<DailyFlow>,
}

pub struct DashboardQuery<G> {
    gateway: G,
    access: AccessControl<G>,
}

impl<G: LedgerGateway + Clone> DashboardQuery<G> {
    pub fn new(gateway: G, access: AccessControl<G>) -> Self {
        Self { gateway, access }
    }

    /// Requires `viewHistory` on the account.
    pub fn overview(&self, caller: &Caller, account_id: AccountId) -> BankResult<AccountOverview> {
        let account = self
            .access
            .require(caller.character_id, account_id, &names::view_history())?;

        let rows = self.gateway.transactions_for_account(account_id)?;
        let today = Utc::now().date_naive();
        let mut series: Vec<DailyFlow> = (0..7)
            .rev()
            .map(|back| DailyFlow {
                date: today - Duration::days(back),
                income: 0,
                expense: 0,
            })
            .collect();
        for row in &rows {
            let day = row.occurred_at.date_naive();
            if let Some(flow) = series.iter_mut().find(|f| f.date == day) {
                if row.to_account == Some(account_id) {
                    flow.income += row.amount;
                } else {
                    flow.expense += row.amount;
                }
            }
        }

        let mut recent = Vec::with_capacity(RECENT_TRANSACTIONS);
        for row in rows.iter().take(RECENT_TRANSACTIONS) {
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
            recent.push(TransactionEntry {
                id: row.id,
                direction,
                amount: row.amount,
                balance_after,
                counterparty,
                actor: row.actor,
                actor_name,
                message: row.message.clone(),
                occurred_at: row.occurred_at,
            });
        }

        Ok(AccountOverview {
            account_id,
            label: account.label,
            balance: account.balance,
            recent,
            series,
        })
    }
}
