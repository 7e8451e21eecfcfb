//! The balance-mutation core.
//!
//! Every mutation commits the balance change and its immutable transaction
//! record as one unit through the gateway. Sufficiency checks are re-run
//! against a fresh read on every attempt and enforced at commit time by the
//! account version guard, so two concurrent debits can never both succeed on
//! funds that only cover one.

use chrono::Utc;
use tracing::{debug, warn};

use teller_core::{AccountId, Amount, BankError, BankResult, CharacterId};
use teller_events::domain::{DepositMade, TransferCompleted, WithdrawalMade};
use teller_events::{BankEvent, EventBus};
use teller_store::{BalanceCommit, LedgerGateway, StoreError, TransactionRow, VersionGuard};

use teller_access::capability::names;

use crate::access::AccessControl;
use crate::context::Caller;
use crate::MAX_COMMIT_ATTEMPTS;

/// Where a transfer should land.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TransferTarget {
    /// A known account id.
    Account(AccountId),
    /// A recipient identity; resolves to their personal account.
    Character(CharacterId),
}

pub struct LedgerEngine<G, B> {
    gateway: G,
    access: AccessControl<G>,
    bus: B,
}

impl<G, B> LedgerEngine<G, B>
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

    /// Credit `amount` to an account and append a deposit record.
    ///
    /// Deposits carry no capability check of their own (cash-in is gated
    /// upstream); the account must exist and the amount is already proven
    /// positive by [`Amount`].
    pub fn deposit(
        &self,
        caller: &Caller,
        account_id: AccountId,
        amount: Amount,
        message: Option<String>,
    ) -> BankResult<TransactionRow> {
        for attempt in 0..MAX_COMMIT_ATTEMPTS {
            let account = self
                .gateway
                .account(account_id)?
                .ok_or_else(|| BankError::not_found(format!("account {account_id}")))?;

            let commit = BalanceCommit {
                debit: None,
                credit: Some(VersionGuard::of(&account)),
                amount: amount.get(),
                actor: caller.character_id,
                message: message.clone(),
                settle_invoice: None,
                occurred_at: Utc::now(),
            };
            match self.gateway.commit_balance(commit) {
                Ok(record) => {
                    self.publish(BankEvent::DepositMade(DepositMade {
                        transaction_id: record.id,
                        account_id,
                        amount: record.amount,
                        actor: caller.character_id,
                        occurred_at: record.occurred_at,
                    }));
                    return Ok(record);
                }
                Err(StoreError::Conflict(reason)) => {
                    debug!(%reason, attempt, "deposit guard failed, retrying");
                }
                Err(other) => return Err(other.into()),
            }
        }
        Err(BankError::conflict("deposit retries exhausted"))
    }

    /// Debit `amount` from an account and append a withdrawal record.
    /// Requires the `withdraw` capability.
    pub fn withdraw(
        &self,
        caller: &Caller,
        account_id: AccountId,
        amount: Amount,
        message: Option<String>,
    ) -> BankResult<TransactionRow> {
        self.access
            .require(caller.character_id, account_id, &names::withdraw())?;

        for attempt in 0..MAX_COMMIT_ATTEMPTS {
            let account = self
                .gateway
                .account(account_id)?
                .ok_or_else(|| BankError::not_found(format!("account {account_id}")))?;
            if account.balance < amount.get() {
                return Err(BankError::InsufficientFunds {
                    available: account.balance,
                    requested: amount.get(),
                });
            }

            let commit = BalanceCommit {
                debit: Some(VersionGuard::of(&account)),
                credit: None,
                amount: amount.get(),
                actor: caller.character_id,
                message: message.clone(),
                settle_invoice: None,
                occurred_at: Utc::now(),
            };
            match self.gateway.commit_balance(commit) {
                Ok(record) => {
                    self.publish(BankEvent::WithdrawalMade(WithdrawalMade {
                        transaction_id: record.id,
                        account_id,
                        amount: record.amount,
                        actor: caller.character_id,
                        occurred_at: record.occurred_at,
                    }));
                    return Ok(record);
                }
                Err(StoreError::Conflict(reason)) => {
                    debug!(%reason, attempt, "withdrawal guard failed, retrying");
                }
                Err(other) => return Err(other.into()),
            }
        }
        Err(BankError::conflict("withdrawal retries exhausted"))
    }

    /// Move `amount` between two accounts atomically, appending one transfer
    /// record carrying both sides. Requires `withdraw` on the source.
    pub fn transfer(
        &self,
        caller: &Caller,
        from_account: AccountId,
        target: TransferTarget,
        amount: Amount,
        message: Option<String>,
    ) -> BankResult<TransactionRow> {
        self.access
            .require(caller.character_id, from_account, &names::withdraw())?;

        let to_account = self.resolve_target(target)?;
        if to_account == from_account {
            return Err(BankError::invalid_target(
                "cannot transfer an account to itself",
            ));
        }

        for attempt in 0..MAX_COMMIT_ATTEMPTS {
            let from = self
                .gateway
                .account(from_account)?
                .ok_or_else(|| BankError::not_found(format!("account {from_account}")))?;
            let to = self
                .gateway
                .account(to_account)?
                .ok_or_else(|| BankError::invalid_target(format!("account {to_account}")))?;
            if from.balance < amount.get() {
                return Err(BankError::InsufficientFunds {
                    available: from.balance,
                    requested: amount.get(),
                });
            }

            let commit = BalanceCommit {
                debit: Some(VersionGuard::of(&from)),
                credit: Some(VersionGuard::of(&to)),
                amount: amount.get(),
                actor: caller.character_id,
                message: message.clone(),
                settle_invoice: None,
                occurred_at: Utc::now(),
            };
            match self.gateway.commit_balance(commit) {
                Ok(record) => {
                    self.publish(BankEvent::TransferCompleted(TransferCompleted {
                        transaction_id: record.id,
                        from_account,
                        to_account,
                        amount: record.amount,
                        actor: caller.character_id,
                        occurred_at: record.occurred_at,
                    }));
                    return Ok(record);
                }
                Err(StoreError::Conflict(reason)) => {
                    debug!(%reason, attempt, "transfer guard failed, retrying");
                }
                Err(other) => return Err(other.into()),
            }
        }
        Err(BankError::conflict("transfer retries exhausted"))
    }

    fn resolve_target(&self, target: TransferTarget) -> BankResult<AccountId> {
        match target {
            TransferTarget::Account(id) => match self.gateway.account(id)? {
                Some(account) => Ok(account.id),
                None => Err(BankError::invalid_target(format!(
                    "account {id} does not exist"
                ))),
            },
            TransferTarget::Character(character) => {
                match self.gateway.personal_account_of(character)? {
                    Some(account) => Ok(account.id),
                    None => Err(BankError::invalid_target(format!(
                        "character {character} has no personal account"
                    ))),
                }
            }
        }
    }

    fn publish(&self, event: BankEvent) {
        if let Err(err) = self.bus.publish(event) {
            // The mutation is committed; a lost notification must not fail it.
            warn!(?err, "domain event publish failed");
        }
    }
}
