//! In-memory persistence gateway.
//!
//! Intended for tests/dev. A single mutex over the whole state makes every
//! gateway method one serializable transaction: guard checks and writes
//! happen under the same lock acquisition, which is exactly the isolation
//! the contract asks a relational backend to provide with row locks.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use teller_core::{AccountId, CharacterId, InvoiceId, TransactionId};

use crate::error::{StoreError, StoreResult};
use crate::gateway::{demoted_owner_role, BalanceCommit, LedgerGateway};
use crate::rows::{
    AccountAccess, AccountKind, AccountRow, CharacterRow, GrantRow, InvoiceRow, TransactionRow,
};

use teller_access::Role;

#[derive(Debug, Default)]
struct State {
    characters: HashMap<CharacterId, CharacterRow>,
    accounts: HashMap<AccountId, AccountRow>,
    grants: HashMap<(AccountId, CharacterId), GrantRow>,
    /// Append-only, chronological. Survives account deletion.
    transactions: Vec<TransactionRow>,
    invoices: HashMap<InvoiceId, InvoiceRow>,
}

#[derive(Debug, Default)]
pub struct InMemoryGateway {
    state: Mutex<State>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn locked(&self) -> StoreResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| StoreError::unavailable("state lock poisoned"))
    }
}

impl LedgerGateway for InMemoryGateway {
    fn upsert_character(&self, character: CharacterRow) -> StoreResult<()> {
        let mut state = self.locked()?;
        state.characters.insert(character.id, character);
        Ok(())
    }

    fn character(&self, id: CharacterId) -> StoreResult<Option<CharacterRow>> {
        Ok(self.locked()?.characters.get(&id).cloned())
    }

    fn personal_account_of(&self, character: CharacterId) -> StoreResult<Option<AccountRow>> {
        let state = self.locked()?;
        Ok(state
            .accounts
            .values()
            .find(|a| a.kind == AccountKind::Personal && a.owner == character)
            .cloned())
    }

    fn accounts_accessible_to(&self, character: CharacterId) -> StoreResult<Vec<AccountAccess>> {
        let state = self.locked()?;
        let mut rows: Vec<AccountAccess> = state
            .accounts
            .values()
            .filter_map(|account| {
                if account.kind == AccountKind::Personal {
                    return (account.owner == character).then(|| AccountAccess {
                        account: account.clone(),
                        role: Role::owner(),
                    });
                }
                state
                    .grants
                    .get(&(account.id, character))
                    .map(|grant| AccountAccess {
                        account: account.clone(),
                        role: grant.role.clone(),
                    })
            })
            .collect();
        rows.sort_by(|a, b| {
            b.account
                .is_default
                .cmp(&a.account.is_default)
                .then(a.account.created_at.cmp(&b.account.created_at))
                .then(a.account.id.cmp(&b.account.id))
        });
        Ok(rows)
    }

    fn create_account(&self, account: AccountRow, owner_grant: Option<GrantRow>) -> StoreResult<()> {
        let mut state = self.locked()?;
        if state.accounts.contains_key(&account.id) {
            return Err(StoreError::conflict(format!(
                "account {} already exists",
                account.id
            )));
        }
        if let Some(grant) = owner_grant {
            state
                .grants
                .insert((grant.account_id, grant.character_id), grant);
        }
        state.accounts.insert(account.id, account);
        Ok(())
    }

    fn account(&self, id: AccountId) -> StoreResult<Option<AccountRow>> {
        Ok(self.locked()?.accounts.get(&id).cloned())
    }

    fn rename_account(&self, id: AccountId, label: String) -> StoreResult<()> {
        let mut state = self.locked()?;
        let account = state
            .accounts
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(format!("account {id}")))?;
        account.label = label;
        Ok(())
    }

    fn convert_to_shared(&self, id: AccountId, owner_grant: GrantRow) -> StoreResult<()> {
        let mut state = self.locked()?;
        let account = state
            .accounts
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found(format!("account {id}")))?;
        if account.kind != AccountKind::Personal {
            return Err(StoreError::conflict(format!("account {id} is not personal")));
        }
        account.kind = AccountKind::Shared;
        state
            .grants
            .insert((owner_grant.account_id, owner_grant.character_id), owner_grant);
        Ok(())
    }

    fn delete_account(&self, id: AccountId) -> StoreResult<()> {
        let mut state = self.locked()?;
        let account = state
            .accounts
            .get(&id)
            .ok_or_else(|| StoreError::not_found(format!("account {id}")))?;
        if account.balance != 0 {
            return Err(StoreError::conflict(format!(
                "account {id} has a non-zero balance"
            )));
        }
        state.accounts.remove(&id);
        state.grants.retain(|(acct, _), _| *acct != id);
        // Transactions are the audit trail; they stay.
        Ok(())
    }

    fn transfer_ownership(
        &self,
        account_id: AccountId,
        new_owner: CharacterId,
        previous_owner: CharacterId,
    ) -> StoreResult<()> {
        let mut state = self.locked()?;
        let account = state
            .accounts
            .get_mut(&account_id)
            .ok_or_else(|| StoreError::not_found(format!("account {account_id}")))?;

        account.owner = new_owner;
        let shared = account.kind == AccountKind::Shared;

        // Personal accounts carry no grants; ownership there is implicit.
        if shared {
            state.grants.insert(
                (account_id, new_owner),
                GrantRow {
                    account_id,
                    character_id: new_owner,
                    role: Role::owner(),
                },
            );
            if let Some(grant) = state.grants.get_mut(&(account_id, previous_owner)) {
                grant.role = demoted_owner_role();
            }
        }
        Ok(())
    }

    fn upsert_grant(&self, grant: GrantRow) -> StoreResult<()> {
        let mut state = self.locked()?;
        if !state.accounts.contains_key(&grant.account_id) {
            return Err(StoreError::not_found(format!("account {}", grant.account_id)));
        }
        state
            .grants
            .insert((grant.account_id, grant.character_id), grant);
        Ok(())
    }

    fn remove_grant(&self, account_id: AccountId, character_id: CharacterId) -> StoreResult<()> {
        let mut state = self.locked()?;
        state.grants.remove(&(account_id, character_id));
        Ok(())
    }

    fn grant(
        &self,
        account_id: AccountId,
        character_id: CharacterId,
    ) -> StoreResult<Option<GrantRow>> {
        Ok(self.locked()?.grants.get(&(account_id, character_id)).cloned())
    }

    fn grants_for_account(&self, account_id: AccountId) -> StoreResult<Vec<GrantRow>> {
        let state = self.locked()?;
        Ok(state
            .grants
            .values()
            .filter(|g| g.account_id == account_id)
            .cloned()
            .collect())
    }

    fn commit_balance(&self, commit: BalanceCommit) -> StoreResult<TransactionRow> {
        if commit.amount <= 0 {
            return Err(StoreError::invalid("amount must be positive"));
        }
        if commit.debit.is_none() && commit.credit.is_none() {
            return Err(StoreError::invalid("commit touches no account"));
        }
        if let (Some(d), Some(c)) = (commit.debit, commit.credit) {
            if d.account_id == c.account_id {
                return Err(StoreError::invalid("debit and credit are the same account"));
            }
        }

        let mut state = self.locked()?;

        // Phase 1: validate every guard before touching anything.
        if let Some(guard) = commit.debit {
            let account = state
                .accounts
                .get(&guard.account_id)
                .ok_or_else(|| StoreError::not_found(format!("account {}", guard.account_id)))?;
            if account.version != guard.expected_version {
                return Err(StoreError::conflict(format!(
                    "account {} version {} != expected {}",
                    guard.account_id, account.version, guard.expected_version
                )));
            }
            if account.balance < commit.amount {
                // Version matched but the balance cannot cover the debit.
                // The engine pre-checks this; keep the floor here too so no
                // backend path can ever produce a negative balance.
                return Err(StoreError::conflict(format!(
                    "account {} balance below debit",
                    guard.account_id
                )));
            }
        }
        if let Some(guard) = commit.credit {
            let account = state
                .accounts
                .get(&guard.account_id)
                .ok_or_else(|| StoreError::not_found(format!("account {}", guard.account_id)))?;
            if account.version != guard.expected_version {
                return Err(StoreError::conflict(format!(
                    "account {} version {} != expected {}",
                    guard.account_id, account.version, guard.expected_version
                )));
            }
            if account.balance.checked_add(commit.amount).is_none() {
                return Err(StoreError::invalid(format!(
                    "account {} balance would overflow",
                    guard.account_id
                )));
            }
        }
        if let Some(settle) = commit.settle_invoice {
            let invoice = state
                .invoices
                .get(&settle.invoice_id)
                .ok_or_else(|| StoreError::not_found(format!("invoice {}", settle.invoice_id)))?;
            if invoice.paid_at.is_some() {
                return Err(StoreError::conflict(format!(
                    "invoice {} already settled",
                    settle.invoice_id
                )));
            }
        }

        // Phase 2: apply. Nothing below can fail, so the commit is atomic.
        let mut from_balance_after = None;
        let mut to_balance_after = None;

        if let Some(guard) = commit.debit {
            let account = state
                .accounts
                .get_mut(&guard.account_id)
                .ok_or_else(|| StoreError::unavailable("debit row vanished"))?;
            account.balance -= commit.amount;
            account.version += 1;
            from_balance_after = Some(account.balance);
        }
        if let Some(guard) = commit.credit {
            let account = state
                .accounts
                .get_mut(&guard.account_id)
                .ok_or_else(|| StoreError::unavailable("credit row vanished"))?;
            account.balance += commit.amount;
            account.version += 1;
            to_balance_after = Some(account.balance);
        }
        if let Some(settle) = commit.settle_invoice {
            let invoice = state
                .invoices
                .get_mut(&settle.invoice_id)
                .ok_or_else(|| StoreError::unavailable("invoice row vanished"))?;
            invoice.paid_at = Some(commit.occurred_at);
            invoice.payer = Some(settle.payer);
        }

        let record = TransactionRow {
            id: TransactionId::new(),
            from_account: commit.debit.map(|g| g.account_id),
            to_account: commit.credit.map(|g| g.account_id),
            amount: commit.amount,
            from_balance_after,
            to_balance_after,
            actor: commit.actor,
            message: commit.message,
            occurred_at: commit.occurred_at,
        };
        state.transactions.push(record.clone());
        Ok(record)
    }

    fn transactions_for_account(&self, account: AccountId) -> StoreResult<Vec<TransactionRow>> {
        let state = self.locked()?;
        Ok(state
            .transactions
            .iter()
            .rev()
            .filter(|t| t.involves(account))
            .cloned()
            .collect())
    }

    fn create_invoice(&self, invoice: InvoiceRow) -> StoreResult<()> {
        let mut state = self.locked()?;
        if state.invoices.contains_key(&invoice.id) {
            return Err(StoreError::conflict(format!(
                "invoice {} already exists",
                invoice.id
            )));
        }
        state.invoices.insert(invoice.id, invoice);
        Ok(())
    }

    fn invoice(&self, id: InvoiceId) -> StoreResult<Option<InvoiceRow>> {
        Ok(self.locked()?.invoices.get(&id).cloned())
    }

    fn invoices_for_account(&self, account: AccountId) -> StoreResult<Vec<InvoiceRow>> {
        let state = self.locked()?;
        let mut rows: Vec<InvoiceRow> = state
            .invoices
            .values()
            .filter(|i| i.from_account == account || i.to_account == account)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.sent_at.cmp(&a.sent_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }
}
