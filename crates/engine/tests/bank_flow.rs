//! End-to-end flow over the in-memory gateway: enrollment, shared-account
//! setup, money movement, invoicing, and the notification stream.

use std::sync::Arc;

use chrono::{Duration, Utc};

use teller_access::{CapabilityTable, Role};
use teller_core::{AccountId, Amount, BankError, CharacterId, InvoiceId};
use teller_engine::{
    AccessControl, AccountRegistry, Caller, IdentityProvider, InvoiceEngine, LedgerEngine,
    SessionRef, StaticIdentityProvider, TransferTarget,
};
use teller_events::event::Event;
use teller_events::{BankEvent, EventBus, InMemoryEventBus};
use teller_store::{
    AccountAccess, AccountKind, AccountRow, BalanceCommit, CharacterRow, GrantRow, InMemoryGateway,
    InvoiceRow, LedgerGateway, StoreError, StoreResult, TransactionRow,
};

struct Bank {
    gateway: Arc<InMemoryGateway>,
    bus: Arc<InMemoryEventBus<BankEvent>>,
    registry: AccountRegistry<Arc<InMemoryGateway>, Arc<InMemoryEventBus<BankEvent>>>,
    ledger: LedgerEngine<Arc<InMemoryGateway>, Arc<InMemoryEventBus<BankEvent>>>,
    invoices: InvoiceEngine<Arc<InMemoryGateway>, Arc<InMemoryEventBus<BankEvent>>>,
}

fn bank() -> Bank {
    let gateway = Arc::new(InMemoryGateway::new());
    let bus = Arc::new(InMemoryEventBus::new());
    let access = || AccessControl::new(gateway.clone(), CapabilityTable::default_table());
    Bank {
        registry: AccountRegistry::new(gateway.clone(), access(), bus.clone()),
        ledger: LedgerEngine::new(gateway.clone(), access(), bus.clone()),
        invoices: InvoiceEngine::new(gateway.clone(), access(), bus.clone()),
        gateway,
        bus,
    }
}

fn enroll(bank: &Bank, name: &str) -> Caller {
    let id = CharacterId::new();
    bank.registry
        .enroll(CharacterRow {
            id,
            name: name.to_string(),
        })
        .unwrap();
    Caller::new(id)
}

fn amount(v: i64) -> Amount {
    Amount::new(v).unwrap()
}

#[test]
fn full_lifecycle_from_enrollment_to_paid_invoice() {
    let bank = bank();
    let ada = enroll(&bank, "Ada Price");
    let bob = enroll(&bank, "Bob Mercer");

    // Ada opens a shared account and hires Bob as manager.
    let crew = bank
        .registry
        .create(&ada, "crew fund", AccountKind::Shared)
        .unwrap();
    bank.registry
        .add_user(&ada, crew.id, bob.character_id, Role::manager())
        .unwrap();

    // Fund Bob's personal account, then move money into the crew fund.
    let bob_personal = bank
        .gateway
        .personal_account_of(bob.character_id)
        .unwrap()
        .unwrap();
    bank.ledger
        .deposit(&bob, bob_personal.id, amount(1_000), None)
        .unwrap();
    bank.ledger
        .transfer(
            &bob,
            bob_personal.id,
            TransferTarget::Account(crew.id),
            amount(600),
            Some("buy-in".to_string()),
        )
        .unwrap();
    assert_eq!(bank.gateway.account(crew.id).unwrap().unwrap().balance, 600);

    // The crew bills Ada personally; she pays from her personal account.
    let ada_personal = bank
        .gateway
        .personal_account_of(ada.character_id)
        .unwrap()
        .unwrap();
    bank.ledger
        .deposit(&ada, ada_personal.id, amount(500), None)
        .unwrap();
    let invoice = bank
        .invoices
        .issue(
            &bob,
            crew.id,
            ada_personal.id,
            amount(250),
            "monthly dues",
            Utc::now() + Duration::days(14),
        )
        .unwrap();
    bank.invoices.pay(&ada, invoice.id).unwrap();

    assert_eq!(bank.gateway.account(crew.id).unwrap().unwrap().balance, 850);
    assert_eq!(
        bank.gateway
            .account(ada_personal.id)
            .unwrap()
            .unwrap()
            .balance,
        250
    );
    assert!(bank.gateway.invoice(invoice.id).unwrap().unwrap().is_paid());

    // Each account saw every transaction touching it, newest first.
    let crew_history = bank.gateway.transactions_for_account(crew.id).unwrap();
    assert_eq!(crew_history.len(), 2);
    assert!(crew_history[0].is_transfer());
}

#[test]
fn the_event_stream_mirrors_committed_operations_in_order() {
    let bank = bank();
    let sub = bank.bus.subscribe();
    let ada = enroll(&bank, "Ada Price");
    let bob = enroll(&bank, "Bob Mercer");

    let ada_personal = bank
        .gateway
        .personal_account_of(ada.character_id)
        .unwrap()
        .unwrap();
    let bob_personal = bank
        .gateway
        .personal_account_of(bob.character_id)
        .unwrap()
        .unwrap();

    bank.ledger
        .deposit(&ada, ada_personal.id, amount(300), None)
        .unwrap();
    bank.ledger
        .withdraw(&ada, ada_personal.id, amount(50), None)
        .unwrap();
    bank.ledger
        .transfer(
            &ada,
            ada_personal.id,
            TransferTarget::Character(bob.character_id),
            amount(100),
            None,
        )
        .unwrap();
    let invoice = bank
        .invoices
        .issue(
            &bob,
            bob_personal.id,
            ada_personal.id,
            amount(25),
            "tip",
            Utc::now() + Duration::days(1),
        )
        .unwrap();
    bank.invoices.pay(&ada, invoice.id).unwrap();

    let types: Vec<&str> = sub.drain().iter().map(|e| e.event_type()).collect();
    assert_eq!(
        types,
        [
            "ledger.deposit.made",
            "ledger.withdrawal.made",
            "ledger.transfer.completed",
            "invoicing.invoice.issued",
            "invoicing.invoice.paid",
        ]
    );
}

#[test]
fn failed_operations_emit_no_events_and_change_no_state() {
    let bank = bank();
    let ada = enroll(&bank, "Ada Price");
    let ada_personal = bank
        .gateway
        .personal_account_of(ada.character_id)
        .unwrap()
        .unwrap();
    bank.ledger
        .deposit(&ada, ada_personal.id, amount(100), None)
        .unwrap();

    let sub = bank.bus.subscribe();
    let err = bank
        .ledger
        .withdraw(&ada, ada_personal.id, amount(500), None)
        .unwrap_err();
    assert!(matches!(err, BankError::InsufficientFunds { .. }));
    let err = bank
        .ledger
        .transfer(
            &ada,
            ada_personal.id,
            TransferTarget::Account(ada_personal.id),
            amount(10),
            None,
        )
        .unwrap_err();
    assert!(matches!(err, BankError::InvalidTarget(_)));

    assert!(sub.try_recv().is_err());
    assert_eq!(
        bank.gateway
            .account(ada_personal.id)
            .unwrap()
            .unwrap()
            .balance,
        100
    );
    assert_eq!(
        bank.gateway
            .transactions_for_account(ada_personal.id)
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn ownership_transfer_hands_off_the_whole_capability_set() {
    let bank = bank();
    let ada = enroll(&bank, "Ada Price");
    let bob = enroll(&bank, "Bob Mercer");
    let crew = bank
        .registry
        .create(&ada, "crew fund", AccountKind::Shared)
        .unwrap();
    bank.registry
        .add_user(&ada, crew.id, bob.character_id, Role::employee())
        .unwrap();

    bank.registry
        .transfer_ownership(&ada, crew.id, bob.character_id)
        .unwrap();

    // Bob, now owner, can close the account; Ada, demoted to manager, cannot.
    let err = bank.registry.delete(&ada, crew.id).unwrap_err();
    assert!(matches!(err, BankError::PermissionDenied(_)));
    bank.registry.delete(&bob, crew.id).unwrap();
}

/// Delegates everything to the wrapped gateway, except that ownership
/// transfers fail as if the backend died mid-request. The engine must
/// surface the failure and the wrapped state must show no partial mutation.
struct CrashingGateway {
    inner: Arc<InMemoryGateway>,
}

impl LedgerGateway for CrashingGateway {
    fn upsert_character(&self, character: CharacterRow) -> StoreResult<()> {
        self.inner.upsert_character(character)
    }

    fn character(&self, id: CharacterId) -> StoreResult<Option<CharacterRow>> {
        self.inner.character(id)
    }

    fn personal_account_of(&self, character: CharacterId) -> StoreResult<Option<AccountRow>> {
        self.inner.personal_account_of(character)
    }

    fn accounts_accessible_to(&self, character: CharacterId) -> StoreResult<Vec<AccountAccess>> {
        self.inner.accounts_accessible_to(character)
    }

    fn create_account(&self, account: AccountRow, owner_grant: Option<GrantRow>) -> StoreResult<()> {
        self.inner.create_account(account, owner_grant)
    }

    fn account(&self, id: AccountId) -> StoreResult<Option<AccountRow>> {
        self.inner.account(id)
    }

    fn rename_account(&self, id: AccountId, label: String) -> StoreResult<()> {
        self.inner.rename_account(id, label)
    }

    fn convert_to_shared(&self, id: AccountId, owner_grant: GrantRow) -> StoreResult<()> {
        self.inner.convert_to_shared(id, owner_grant)
    }

    fn delete_account(&self, id: AccountId) -> StoreResult<()> {
        self.inner.delete_account(id)
    }

    fn transfer_ownership(
        &self,
        _account_id: AccountId,
        _new_owner: CharacterId,
        _previous_owner: CharacterId,
    ) -> StoreResult<()> {
        Err(StoreError::unavailable("backend lost mid-transfer"))
    }

    fn upsert_grant(&self, grant: GrantRow) -> StoreResult<()> {
        self.inner.upsert_grant(grant)
    }

    fn remove_grant(&self, account_id: AccountId, character_id: CharacterId) -> StoreResult<()> {
        self.inner.remove_grant(account_id, character_id)
    }

    fn grant(
        &self,
        account_id: AccountId,
        character_id: CharacterId,
    ) -> StoreResult<Option<GrantRow>> {
        self.inner.grant(account_id, character_id)
    }

    fn grants_for_account(&self, account_id: AccountId) -> StoreResult<Vec<GrantRow>> {
        self.inner.grants_for_account(account_id)
    }

    fn commit_balance(&self, commit: BalanceCommit) -> StoreResult<TransactionRow> {
        self.inner.commit_balance(commit)
    }

    fn transactions_for_account(&self, account: AccountId) -> StoreResult<Vec<TransactionRow>> {
        self.inner.transactions_for_account(account)
    }

    fn create_invoice(&self, invoice: InvoiceRow) -> StoreResult<()> {
        self.inner.create_invoice(invoice)
    }

    fn invoice(&self, id: InvoiceId) -> StoreResult<Option<InvoiceRow>> {
        self.inner.invoice(id)
    }

    fn invoices_for_account(&self, account: AccountId) -> StoreResult<Vec<InvoiceRow>> {
        self.inner.invoices_for_account(account)
    }
}

#[test]
fn a_crashed_ownership_transfer_leaves_no_partial_state() {
    let inner = Arc::new(InMemoryGateway::new());
    let gateway = Arc::new(CrashingGateway {
        inner: inner.clone(),
    });
    let bus = Arc::new(InMemoryEventBus::new());
    let access = AccessControl::new(gateway.clone(), CapabilityTable::default_table());
    let registry = AccountRegistry::new(gateway.clone(), access, bus.clone());

    let ada = CharacterId::new();
    let bob = CharacterId::new();
    for (id, name) in [(ada, "Ada Price"), (bob, "Bob Mercer")] {
        registry
            .enroll(CharacterRow {
                id,
                name: name.to_string(),
            })
            .unwrap();
    }
    let caller = Caller::new(ada);
    let crew = registry
        .create(&caller, "crew fund", AccountKind::Shared)
        .unwrap();
    registry
        .add_user(&caller, crew.id, bob, Role::manager())
        .unwrap();

    let sub = bus.subscribe();
    let err = registry
        .transfer_ownership(&caller, crew.id, bob)
        .unwrap_err();
    assert!(matches!(err, BankError::Unavailable(_)));
    assert!(err.is_retryable());

    // Owner pointer, both grants, and the event stream are all untouched.
    let row = inner.account(crew.id).unwrap().unwrap();
    assert_eq!(row.owner, ada);
    assert!(inner.grant(crew.id, ada).unwrap().unwrap().role.is_owner());
    assert_eq!(inner.grant(crew.id, bob).unwrap().unwrap().role, Role::manager());
    assert!(sub.try_recv().is_err());
}

#[test]
fn sessions_resolve_to_callers_before_any_operation() {
    let bank = bank();
    let ada = enroll(&bank, "Ada Price");

    let identity = StaticIdentityProvider::new();
    identity.register(SessionRef::new("conn-7"), ada.character_id);

    let caller = identity.resolve_caller(&SessionRef::new("conn-7")).unwrap();
    assert_eq!(caller, ada);
    assert!(identity.resolve_caller(&SessionRef::new("conn-8")).is_none());
}
