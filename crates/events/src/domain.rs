//! Ledger domain events published after each committed mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use teller_core::{AccountId, CharacterId, InvoiceId, TransactionId};

use crate::event::Event;

/// Event: money entered an account from outside the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositMade {
    pub transaction_id: TransactionId,
    pub account_id: AccountId,
    pub amount: i64,
    pub actor: CharacterId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: money left an account to outside the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalMade {
    pub transaction_id: TransactionId,
    pub account_id: AccountId,
    pub amount: i64,
    pub actor: CharacterId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: money moved between two accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferCompleted {
    pub transaction_id: TransactionId,
    pub from_account: AccountId,
    pub to_account: AccountId,
    pub amount: i64,
    pub actor: CharacterId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: a bill was sent from one account to another. No balance effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceIssued {
    pub invoice_id: InvoiceId,
    pub from_account: AccountId,
    pub to_account: AccountId,
    pub amount: i64,
    pub actor: CharacterId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: an invoice was settled (the transfer has already committed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoicePaid {
    pub invoice_id: InvoiceId,
    pub transaction_id: TransactionId,
    pub from_account: AccountId,
    pub to_account: AccountId,
    pub amount: i64,
    pub payer: CharacterId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: account ownership was reassigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipTransferred {
    pub account_id: AccountId,
    pub previous_owner: CharacterId,
    pub new_owner: CharacterId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BankEvent {
    DepositMade(DepositMade),
    WithdrawalMade(WithdrawalMade),
    TransferCompleted(TransferCompleted),
    InvoiceIssued(InvoiceIssued),
    InvoicePaid(InvoicePaid),
    OwnershipTransferred(OwnershipTransferred),
}

impl Event for BankEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BankEvent::DepositMade(_) => "ledger.deposit.made",
            BankEvent::WithdrawalMade(_) => "ledger.withdrawal.made",
            BankEvent::TransferCompleted(_) => "ledger.transfer.completed",
            BankEvent::InvoiceIssued(_) => "invoicing.invoice.issued",
            BankEvent::InvoicePaid(_) => "invoicing.invoice.paid",
            BankEvent::OwnershipTransferred(_) => "accounts.ownership.transferred",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            BankEvent::DepositMade(e) => e.occurred_at,
            BankEvent::WithdrawalMade(e) => e.occurred_at,
            BankEvent::TransferCompleted(e) => e.occurred_at,
            BankEvent::InvoiceIssued(e) => e.occurred_at,
            BankEvent::InvoicePaid(e) => e.occurred_at,
            BankEvent::OwnershipTransferred(e) => e.occurred_at,
        }
    }
}
