//! Row types exchanged with the persistence gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use teller_access::Role;
use teller_core::{AccountId, CharacterId, InvoiceId, TransactionId};

/// Account kind: personal accounts have one implicit full-access owner,
/// shared accounts are governed by role grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Personal,
    Shared,
}

/// A balance-holding account.
///
/// `version` increases on every balance change and is the optimistic guard
/// token for [`crate::BalanceCommit`]; metadata updates (label, kind, owner)
/// are last-writer-wins and do not bump it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRow {
    pub id: AccountId,
    pub label: String,
    pub owner: CharacterId,
    pub kind: AccountKind,
    /// Non-negative, in the smallest currency unit.
    pub balance: i64,
    /// Meaningful only in the owner's view.
    pub is_default: bool,
    pub version: u64,
    pub created_at: DateTime<Utc>,
}

impl AccountRow {
    pub fn is_personal(&self) -> bool {
        self.kind == AccountKind::Personal
    }
}

/// A (account, character, role) access binding. Unique per pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantRow {
    pub account_id: AccountId,
    pub character_id: CharacterId,
    pub role: Role,
}

/// An account paired with the role a character holds on it; what the
/// accessible-accounts query returns. Personal ownership reads as `owner`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountAccess {
    pub account: AccountRow,
    pub role: Role,
}

/// Immutable record of a balance-affecting event. Append-only: never updated
/// or deleted, and it outlives the accounts it references.
///
/// Exactly one shape applies: deposit (`to` only), withdrawal (`from` only),
/// transfer (both).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRow {
    pub id: TransactionId,
    pub from_account: Option<AccountId>,
    pub to_account: Option<AccountId>,
    /// Strictly positive.
    pub amount: i64,
    pub from_balance_after: Option<i64>,
    pub to_balance_after: Option<i64>,
    pub actor: CharacterId,
    pub message: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl TransactionRow {
    pub fn is_deposit(&self) -> bool {
        self.from_account.is_none() && self.to_account.is_some()
    }

    pub fn is_withdrawal(&self) -> bool {
        self.from_account.is_some() && self.to_account.is_none()
    }

    pub fn is_transfer(&self) -> bool {
        self.from_account.is_some() && self.to_account.is_some()
    }

    /// Whether the row touches `account` on either side.
    pub fn involves(&self, account: AccountId) -> bool {
        self.from_account == Some(account) || self.to_account == Some(account)
    }
}

/// A bill from `from_account` (the biller) to `to_account` (the payer).
///
/// `paid_at`/`payer` are set exactly once, by the same commit that moves the
/// money. "Overdue" is derived at read time, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRow {
    pub id: InvoiceId,
    pub from_account: AccountId,
    pub to_account: AccountId,
    /// Strictly positive.
    pub amount: i64,
    pub message: String,
    pub due_at: DateTime<Utc>,
    pub sent_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub payer: Option<CharacterId>,
    /// Who issued the invoice.
    pub actor: CharacterId,
}

impl InvoiceRow {
    pub fn is_paid(&self) -> bool {
        self.paid_at.is_some()
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.paid_at.is_none() && now > self.due_at
    }
}

/// Directory entry for a character, used for person-directed transfers and
/// counterparty-name search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterRow {
    pub id: CharacterId,
    pub name: String,
}
