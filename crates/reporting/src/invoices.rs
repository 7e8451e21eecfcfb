//! Invoice listings for one account.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use teller_access::capability::names;
use teller_core::{AccountId, BankResult, InvoiceId};
use teller_engine::{AccessControl, Caller};
use teller_store::{InvoiceRow, LedgerGateway};

use crate::pagination::{paginate, Page, INVOICE_PAGE_SIZE};

/// Which slice of the account's invoices to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceView {
    /// Bills this account still has to pay.
    Unpaid,
    /// Bills this account has paid.
    Paid,
    /// Bills this account issued, paid or not.
    Sent,
}

/// Derived at read time; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Sent,
    Overdue,
    Paid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceEntry {
    pub id: InvoiceId,
    pub status: InvoiceStatus,
    /// The account on the other side of the bill.
    pub counterparty: AccountId,
    pub amount: i64,
    pub message: String,
    pub due_at: DateTime<Utc>,
    pub sent_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

pub struct InvoiceQuery<G> {
    gateway: G,
    access: AccessControl<G>,
}

impl<G: LedgerGateway + Clone> InvoiceQuery<G> {
    pub fn new(gateway: G, access: AccessControl<G>) -> Self {
        Self { gateway, access }
    }

    /// Page `page` of the requested invoice slice, newest first. Requires
    /// `payInvoice` on the account, same as acting on the invoices it shows.
    pub fn invoices(
        &self,
        caller: &Caller,
        account_id: AccountId,
        view: InvoiceView,
        page: usize,
    ) -> BankResult<Page<InvoiceEntry>> {
        self.access
            .require(caller.character_id, account_id, &names::pay_invoice())?;

        let now = Utc::now();
        let entries: Vec<InvoiceEntry> = self
            .gateway
            .invoices_for_account(account_id)?
            .into_iter()
            .filter(|row| match view {
                InvoiceView::Unpaid => row.to_account == account_id && !row.is_paid(),
                InvoiceView::Paid => row.to_account == account_id && row.is_paid(),
                InvoiceView::Sent => row.from_account == account_id,
            })
            .map(|row| entry_for(account_id, row, now))
            .collect();
        Ok(paginate(entries, page, INVOICE_PAGE_SIZE))
    }
}

fn entry_for(account_id: AccountId, row: InvoiceRow, now: DateTime<Utc>) -> InvoiceEntry {
    let status = if row.is_paid() {
        InvoiceStatus::Paid
    } else if row.is_overdue(now) {
        InvoiceStatus::Overdue
    } else {
        InvoiceStatus::Sent
    };
    let counterparty = if row.from_account == account_id {
        row.to_account
    } else {
        row.from_account
    };
    InvoiceEntry {
        id: row.id,
        status,
        counterparty,
        amount: row.amount,
        message: row.message,
        due_at: row.due_at,
        sent_at: row.sent_at,
        paid_at: row.paid_at,
    }
}
