//! The `sent → paid` invoice lifecycle.
//!
//! Issuing writes the invoice row and moves no money. Payment is a transfer
//! from the payer account to the biller account plus the settlement mark,
//! committed as one unit: the store re-checks the invoice is still unpaid
//! inside the commit, so two racing payments cannot both debit the payer.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use teller_access::capability::names;
use teller_core::{AccountId, Amount, BankError, BankResult, InvoiceId};
use teller_events::domain::{InvoiceIssued, InvoicePaid};
use teller_events::{BankEvent, EventBus};
use teller_store::{
    BalanceCommit, InvoiceRow, InvoiceSettlement, LedgerGateway, StoreError, TransactionRow,
    VersionGuard,
};

use crate::access::AccessControl;
use crate::context::Caller;
use crate::MAX_COMMIT_ATTEMPTS;

pub struct InvoiceEngine<G, B> {
    gateway: G,
    access: AccessControl<G>,
    bus: B,
}

impl<G, B> InvoiceEngine<G, B>
where
    G: LedgerGateway + Clone,
    B: EventBus<BankEvent>,
{
    pub fn new(gateway: G, access: AccessControl<G>, bus: B) -> Self {
        Self {
            gateway,
            access,
            bus,
        }
    }

    /// Issue an invoice from `from_account` (the biller) against
    /// `to_account` (the payer). Requires `sendInvoice` on the biller
    /// account. No balance effect.
    pub fn issue(
        &self,
        caller: &Caller,
        from_account: AccountId,
        to_account: AccountId,
        amount: Amount,
        message: impl Into<String>,
        due_at: DateTime<Utc>,
    ) -> BankResult<InvoiceRow> {
        self.access
            .require(caller.character_id, from_account, &names::send_invoice())?;
        if to_account == from_account {
            return Err(BankError::invalid_target("cannot invoice the same account"));
        }
        if self.gateway.account(to_account)?.is_none() {
            return Err(BankError::invalid_target(format!(
                "account {to_account} does not exist"
            )));
        }

        let invoice = InvoiceRow {
            id: InvoiceId::new(),
            from_account,
            to_account,
            amount: amount.get(),
            message: message.into(),
            due_at,
            sent_at: Utc::now(),
            paid_at: None,
            payer: None,
            actor: caller.character_id,
        };
        self.gateway.create_invoice(invoice.clone())?;
        self.publish(BankEvent::InvoiceIssued(InvoiceIssued {
            invoice_id: invoice.id,
            from_account,
            to_account,
            amount: invoice.amount,
            actor: caller.character_id,
            occurred_at: invoice.sent_at,
        }));
        Ok(invoice)
    }

    /// Pay an invoice from its payer account. Requires `payInvoice` on that
    /// account.
    ///
    /// Exactly-once: the settlement guard rides in the balance commit, and a
    /// conflict re-reads the invoice before retrying, so a lost race surfaces
    /// as [`BankError::AlreadyPaid`] rather than a second debit.
    pub fn pay(&self, caller: &Caller, invoice_id: InvoiceId) -> BankResult<TransactionRow> {
        let invoice = self
            .gateway
            .invoice(invoice_id)?
            .ok_or_else(|| BankError::not_found(format!("invoice {invoice_id}")))?;
        self.access
            .require(caller.character_id, invoice.to_account, &names::pay_invoice())?;

        for attempt in 0..MAX_COMMIT_ATTEMPTS {
            let invoice = self
                .gateway
                .invoice(invoice_id)?
                .ok_or_else(|| BankError::not_found(format!("invoice {invoice_id}")))?;
            if invoice.is_paid() {
                return Err(BankError::AlreadyPaid);
            }

            let payer_account = self
                .gateway
                .account(invoice.to_account)?
                .ok_or_else(|| BankError::not_found(format!("account {}", invoice.to_account)))?;
            let biller_account = self
                .gateway
                .account(invoice.from_account)?
                .ok_or_else(|| BankError::not_found(format!("account {}", invoice.from_account)))?;
            if payer_account.balance < invoice.amount {
                return Err(BankError::InsufficientFunds {
                    available: payer_account.balance,
                    requested: invoice.amount,
                });
            }

            let commit = BalanceCommit {
                debit: Some(VersionGuard::of(&payer_account)),
                credit: Some(VersionGuard::of(&biller_account)),
                amount: invoice.amount,
                actor: caller.character_id,
                message: Some(invoice.message.clone()),
                settle_invoice: Some(InvoiceSettlement {
                    invoice_id,
                    payer: caller.character_id,
                }),
                occurred_at: Utc::now(),
            };
            match self.gateway.commit_balance(commit) {
                Ok(record) => {
                    self.publish(BankEvent::InvoicePaid(InvoicePaid {
                        invoice_id,
                        transaction_id: record.id,
                        from_account: invoice.to_account,
                        to_account: invoice.from_account,
                        amount: invoice.amount,
                        payer: caller.character_id,
                        occurred_at: record.occurred_at,
                    }));
                    return Ok(record);
                }
                Err(StoreError::Conflict(reason)) => {
                    debug!(%reason, attempt, "invoice payment guard failed, retrying");
                }
                Err(other) => return Err(other.into()),
            }
        }
        Err(BankError::conflict("invoice payment retries exhausted"))
    }

    fn publish(&self, event: BankEvent) {
        if let Err(err) = self.bus.publish(event) {
            warn!(?err, "domain event publish failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;
    use std::thread;
    use teller_access::{CapabilityTable, Role};
    use teller_core::CharacterId;
    use teller_events::InMemoryEventBus;
    use teller_store::{AccountKind, AccountRow, GrantRow, InMemoryGateway};

    type TestEngine = InvoiceEngine<Arc<InMemoryGateway>, Arc<InMemoryEventBus<BankEvent>>>;

    fn setup() -> (Arc<InMemoryGateway>, Arc<InMemoryEventBus<BankEvent>>, TestEngine) {
        let gateway = Arc::new(InMemoryGateway::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let access = AccessControl::new(gateway.clone(), CapabilityTable::default_table());
        let engine = InvoiceEngine::new(gateway.clone(), access, bus.clone());
        (gateway, bus, engine)
    }

    fn personal_account(gateway: &InMemoryGateway, owner: CharacterId, balance: i64) -> AccountId {
        let id = AccountId::new();
        gateway
            .create_account(
                AccountRow {
                    id,
                    label: "personal".to_string(),
                    owner,
                    kind: AccountKind::Personal,
                    balance,
                    is_default: false,
                    version: 0,
                    created_at: Utc::now(),
                },
                None,
            )
            .unwrap();
        id
    }

    fn amount(v: i64) -> Amount {
        Amount::new(v).unwrap()
    }

    #[test]
    fn issue_then_pay_moves_money_and_settles_once() {
        let (gateway, bus, engine) = setup();
        let biller = CharacterId::new();
        let payer = CharacterId::new();
        let biller_acc = personal_account(&gateway, biller, 0);
        let payer_acc = personal_account(&gateway, payer, 500);

        let sub = bus.subscribe();
        let invoice = engine
            .issue(
                &Caller::new(biller),
                biller_acc,
                payer_acc,
                amount(300),
                "repairs",
                Utc::now() + Duration::days(7),
            )
            .unwrap();
        assert!(!invoice.is_paid());
        assert!(matches!(sub.try_recv().unwrap(), BankEvent::InvoiceIssued(_)));

        let record = engine.pay(&Caller::new(payer), invoice.id).unwrap();
        assert!(record.is_transfer());
        assert_eq!(record.from_account, Some(payer_acc));
        assert_eq!(record.to_account, Some(biller_acc));
        assert_eq!(gateway.account(payer_acc).unwrap().unwrap().balance, 200);
        assert_eq!(gateway.account(biller_acc).unwrap().unwrap().balance, 300);

        let stored = gateway.invoice(invoice.id).unwrap().unwrap();
        assert!(stored.is_paid());
        assert_eq!(stored.payer, Some(payer));
        assert!(matches!(sub.try_recv().unwrap(), BankEvent::InvoicePaid(_)));

        let err = engine.pay(&Caller::new(payer), invoice.id).unwrap_err();
        assert_eq!(err, BankError::AlreadyPaid);
        assert_eq!(gateway.account(payer_acc).unwrap().unwrap().balance, 200);
    }

    #[test]
    fn issue_rejects_self_and_missing_payer_accounts() {
        let (gateway, _bus, engine) = setup();
        let biller = CharacterId::new();
        let biller_acc = personal_account(&gateway, biller, 0);
        let due = Utc::now() + Duration::days(7);

        let err = engine
            .issue(&Caller::new(biller), biller_acc, biller_acc, amount(10), "x", due)
            .unwrap_err();
        assert!(matches!(err, BankError::InvalidTarget(_)));

        let err = engine
            .issue(
                &Caller::new(biller),
                biller_acc,
                AccountId::new(),
                amount(10),
                "x",
                due,
            )
            .unwrap_err();
        assert!(matches!(err, BankError::InvalidTarget(_)));
    }

    #[test]
    fn issuing_requires_send_invoice_on_the_biller_account() {
        let (gateway, _bus, engine) = setup();
        let biller = CharacterId::new();
        let stranger = CharacterId::new();
        let biller_acc = personal_account(&gateway, biller, 0);
        let other_acc = personal_account(&gateway, stranger, 0);

        let err = engine
            .issue(
                &Caller::new(stranger),
                biller_acc,
                other_acc,
                amount(10),
                "x",
                Utc::now() + Duration::days(1),
            )
            .unwrap_err();
        assert!(matches!(err, BankError::PermissionDenied(_)));
    }

    #[test]
    fn underfunded_payment_is_rejected_without_settling() {
        let (gateway, _bus, engine) = setup();
        let biller = CharacterId::new();
        let payer = CharacterId::new();
        let biller_acc = personal_account(&gateway, biller, 0);
        let payer_acc = personal_account(&gateway, payer, 50);

        let invoice = engine
            .issue(
                &Caller::new(biller),
                biller_acc,
                payer_acc,
                amount(300),
                "repairs",
                Utc::now() + Duration::days(7),
            )
            .unwrap();
        let err = engine.pay(&Caller::new(payer), invoice.id).unwrap_err();
        assert_eq!(
            err,
            BankError::InsufficientFunds {
                available: 50,
                requested: 300
            }
        );
        assert!(!gateway.invoice(invoice.id).unwrap().unwrap().is_paid());
    }

    #[test]
    fn paying_needs_pay_invoice_on_the_payer_account() {
        let (gateway, _bus, engine) = setup();
        let biller = CharacterId::new();
        let owner = CharacterId::new();
        let employee = CharacterId::new();
        let biller_acc = personal_account(&gateway, biller, 0);
        let shared = AccountId::new();
        gateway
            .create_account(
                AccountRow {
                    id: shared,
                    label: "crew".to_string(),
                    owner,
                    kind: AccountKind::Shared,
                    balance: 1_000,
                    is_default: false,
                    version: 0,
                    created_at: Utc::now(),
                },
                Some(GrantRow {
                    account_id: shared,
                    character_id: owner,
                    role: Role::owner(),
                }),
            )
            .unwrap();
        gateway
            .upsert_grant(GrantRow {
                account_id: shared,
                character_id: employee,
                role: Role::employee(),
            })
            .unwrap();

        let invoice = engine
            .issue(
                &Caller::new(biller),
                biller_acc,
                shared,
                amount(200),
                "supplies",
                Utc::now() + Duration::days(3),
            )
            .unwrap();

        // Employees hold payInvoice under the default table.
        engine.pay(&Caller::new(employee), invoice.id).unwrap();
        assert_eq!(gateway.account(shared).unwrap().unwrap().balance, 800);

        // A character with no grant at all is denied.
        let second = engine
            .issue(
                &Caller::new(biller),
                biller_acc,
                shared,
                amount(100),
                "supplies",
                Utc::now() + Duration::days(3),
            )
            .unwrap();
        let err = engine
            .pay(&Caller::new(CharacterId::new()), second.id)
            .unwrap_err();
        assert!(matches!(err, BankError::PermissionDenied(_)));
    }

    #[test]
    fn racing_payments_settle_exactly_once() {
        let (gateway, _bus, engine) = setup();
        let biller = CharacterId::new();
        let payer = CharacterId::new();
        let biller_acc = personal_account(&gateway, biller, 0);
        let payer_acc = personal_account(&gateway, payer, 1_000);

        let invoice = engine
            .issue(
                &Caller::new(biller),
                biller_acc,
                payer_acc,
                amount(400),
                "repairs",
                Utc::now() + Duration::days(7),
            )
            .unwrap();

        let engine = Arc::new(engine);
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = engine.clone();
                let invoice_id = invoice.id;
                thread::spawn(move || engine.pay(&Caller::new(payer), invoice_id))
            })
            .collect();

        let mut ok = 0;
        for handle in handles {
            match handle.join().unwrap() {
                Ok(_) => ok += 1,
                Err(BankError::AlreadyPaid) => {}
                Err(other) => panic!("unexpected error {other:?}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(gateway.account(payer_acc).unwrap().unwrap().balance, 600);
        assert_eq!(gateway.account(biller_acc).unwrap().unwrap().balance, 400);
    }
}
