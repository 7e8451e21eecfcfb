//! The persistence gateway trait.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use teller_access::Role;
use teller_core::{AccountId, CharacterId, InvoiceId};

use crate::error::StoreResult;
use crate::rows::{AccountAccess, AccountRow, CharacterRow, GrantRow, InvoiceRow, TransactionRow};

/// Optimistic guard on one account's balance version.
///
/// A commit carrying a guard only applies if the stored version still equals
/// `expected_version`; any balance change in between bumps the version and
/// fails the guard with `StoreError::Conflict`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VersionGuard {
    pub account_id: AccountId,
    pub expected_version: u64,
}

impl VersionGuard {
    pub fn of(account: &AccountRow) -> Self {
        Self {
            account_id: account.id,
            expected_version: account.version,
        }
    }
}

/// Marks an invoice paid inside the same commit that moves the money.
///
/// The gateway re-checks `paid_at IS NULL` at commit time; a settled invoice
/// fails the whole commit with `Conflict` and nothing is written.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct InvoiceSettlement {
    pub invoice_id: InvoiceId,
    pub payer: CharacterId,
}

/// One atomic balance mutation and its transaction record.
///
/// Exactly one shape applies:
/// - deposit: `credit` set, `debit` unset
/// - withdrawal: `debit` set, `credit` unset
/// - transfer: both set (and for invoice payment, `settle_invoice` too)
///
/// The gateway applies the balance deltas, the appended [`TransactionRow`],
/// and the optional invoice settlement as a single unit, or nothing at all.
/// A reader never observes a balance without its record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceCommit {
    pub debit: Option<VersionGuard>,
    pub credit: Option<VersionGuard>,
    /// Strictly positive, validated by the engine before commit.
    pub amount: i64,
    pub actor: CharacterId,
    pub message: Option<String>,
    pub settle_invoice: Option<InvoiceSettlement>,
    pub occurred_at: DateTime<Utc>,
}

/// The contract the ledger core needs from a relational store.
///
/// Every method is one transaction: it either fully applies or fully no-ops.
/// Implementations must make `commit_balance` serializable against other
/// commits touching the same rows (row locks, compare-and-swap, or a global
/// mutex) so that guard checks and writes are not interleaved.
pub trait LedgerGateway: Send + Sync {
    // ── character directory ────────────────────────────────────────────────

    fn upsert_character(&self, character: CharacterRow) -> StoreResult<()>;

    fn character(&self, id: CharacterId) -> StoreResult<Option<CharacterRow>>;

    /// The character's personal account, if one exists (person-directed
    /// transfer target resolution).
    fn personal_account_of(&self, character: CharacterId) -> StoreResult<Option<AccountRow>>;

    /// Every account the character can act on: their personal account (role
    /// `owner`) plus every shared account they hold a grant on. Default
    /// account first, then oldest first.
    fn accounts_accessible_to(&self, character: CharacterId) -> StoreResult<Vec<AccountAccess>>;

    // ── accounts ───────────────────────────────────────────────────────────

    /// Insert a new account, optionally together with the creator's owner
    /// grant (shared accounts). One transaction.
    fn create_account(&self, account: AccountRow, owner_grant: Option<GrantRow>) -> StoreResult<()>;

    fn account(&self, id: AccountId) -> StoreResult<Option<AccountRow>>;

    fn rename_account(&self, id: AccountId, label: String) -> StoreResult<()>;

    /// Flip a personal account to shared and insert the owner's explicit
    /// grant, atomically. Fails with `Conflict` if the account is no longer
    /// personal at commit time.
    fn convert_to_shared(&self, id: AccountId, owner_grant: GrantRow) -> StoreResult<()>;

    /// Remove an account and its grants. Fails with `Conflict` if the
    /// balance is non-zero at commit time. Transaction history is retained.
    fn delete_account(&self, id: AccountId) -> StoreResult<()>;

    /// Atomically: upsert `new_owner`'s grant to owner, point the account at
    /// `new_owner`, demote `previous_owner`'s grant to manager. All three
    /// commit together or not at all.
    fn transfer_ownership(
        &self,
        account_id: AccountId,
        new_owner: CharacterId,
        previous_owner: CharacterId,
    ) -> StoreResult<()>;

    // ── access grants ──────────────────────────────────────────────────────

    fn upsert_grant(&self, grant: GrantRow) -> StoreResult<()>;

    fn remove_grant(&self, account_id: AccountId, character_id: CharacterId) -> StoreResult<()>;

    fn grant(&self, account_id: AccountId, character_id: CharacterId)
        -> StoreResult<Option<GrantRow>>;

    fn grants_for_account(&self, account_id: AccountId) -> StoreResult<Vec<GrantRow>>;

    // ── ledger ─────────────────────────────────────────────────────────────

    /// Apply a guarded balance mutation and append its transaction record.
    fn commit_balance(&self, commit: BalanceCommit) -> StoreResult<TransactionRow>;

    /// All transactions touching `account`, most recent first. Includes
    /// history of deleted accounts.
    fn transactions_for_account(&self, account: AccountId) -> StoreResult<Vec<TransactionRow>>;

    // ── invoices ───────────────────────────────────────────────────────────

    fn create_invoice(&self, invoice: InvoiceRow) -> StoreResult<()>;

    fn invoice(&self, id: InvoiceId) -> StoreResult<Option<InvoiceRow>>;

    /// All invoices where `account` is biller or payer, most recent first.
    fn invoices_for_account(&self, account: AccountId) -> StoreResult<Vec<InvoiceRow>>;
}

/// Convenience: a demoted owner keeps this role after ownership transfer.
pub fn demoted_owner_role() -> Role {
    Role::manager()
}

impl<G> LedgerGateway for Arc<G>
where
    G: LedgerGateway + ?Sized,
{
    fn upsert_character(&self, character: CharacterRow) -> StoreResult<()> {
        (**self).upsert_character(character)
    }

    fn character(&self, id: CharacterId) -> StoreResult<Option<CharacterRow>> {
        (**self).character(id)
    }

    fn personal_account_of(&self, character: CharacterId) -> StoreResult<Option<AccountRow>> {
        (**self).personal_account_of(character)
    }

    fn accounts_accessible_to(&self, character: CharacterId) -> StoreResult<Vec<AccountAccess>> {
        (**self).accounts_accessible_to(character)
    }

    fn create_account(&self, account: AccountRow, owner_grant: Option<GrantRow>) -> StoreResult<()> {
        (**self).create_account(account, owner_grant)
    }

    fn account(&self, id: AccountId) -> StoreResult<Option<AccountRow>> {
        (**self).account(id)
    }

    fn rename_account(&self, id: AccountId, label: String) -> StoreResult<()> {
        (**self).rename_account(id, label)
    }

    fn convert_to_shared(&self, id: AccountId, owner_grant: GrantRow) -> StoreResult<()> {
        (**self).convert_to_shared(id, owner_grant)
    }

    fn delete_account(&self, id: AccountId) -> StoreResult<()> {
        (**self).delete_account(id)
    }

    fn transfer_ownership(
        &self,
        account_id: AccountId,
        new_owner: CharacterId,
        previous_owner: CharacterId,
    ) -> StoreResult<()> {
        (**self).transfer_ownership(account_id, new_owner, previous_owner)
    }

    fn upsert_grant(&self, grant: GrantRow) -> StoreResult<()> {
        (**self).upsert_grant(grant)
    }

    fn remove_grant(&self, account_id: AccountId, character_id: CharacterId) -> StoreResult<()> {
        (**self).remove_grant(account_id, character_id)
    }

    fn grant(
        &self,
        account_id: AccountId,
        character_id: CharacterId,
    ) -> StoreResult<Option<GrantRow>> {
        (**self).grant(account_id, character_id)
    }

    fn grants_for_account(&self, account_id: AccountId) -> StoreResult<Vec<GrantRow>> {
        (**self).grants_for_account(account_id)
    }

    fn commit_balance(&self, commit: BalanceCommit) -> StoreResult<TransactionRow> {
        (**self).commit_balance(commit)
    }

    fn transactions_for_account(&self, account: AccountId) -> StoreResult<Vec<TransactionRow>> {
        (**self).transactions_for_account(account)
    }

    fn create_invoice(&self, invoice: InvoiceRow) -> StoreResult<()> {
        (**self).create_invoice(invoice)
    }

    fn invoice(&self, id: InvoiceId) -> StoreResult<Option<InvoiceRow>> {
        (**self).invoice(id)
    }

    fn invoices_for_account(&self, account: AccountId) -> StoreResult<Vec<InvoiceRow>> {
        (**self).invoices_for_account(account)
    }
}
