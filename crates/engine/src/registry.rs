//! Account lifecycle and membership.
//!
//! Everything here is metadata: balances are only read (the zero-balance
//! closure check), never mutated. Multi-row changes (ownership transfer,
//! conversion to shared) go through single gateway methods so they commit
//! atomically.

use chrono::Utc;
use tracing::warn;

use teller_access::capability::names;
use teller_access::Role;
use teller_core::{AccountId, BankError, BankResult, CharacterId};
use teller_events::domain::OwnershipTransferred;
use teller_events::{BankEvent, EventBus};
use teller_store::{AccountKind, AccountRow, CharacterRow, GrantRow, LedgerGateway, StoreError};

use crate::access::AccessControl;
use crate::context::Caller;

const MAX_LABEL_LEN: usize = 64;

pub struct AccountRegistry<G, B> {
    gateway: G,
    access: AccessControl<G>,
    bus: B,
}

impl<G, B> AccountRegistry<G, B>
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

    /// Register a character in the directory and open their default personal
    /// account. Idempotent on the directory entry; a second enrollment with a
    /// personal account already open is a conflict.
    pub fn enroll(&self, character: CharacterRow) -> BankResult<AccountRow> {
        let character_id = character.id;
        self.gateway.upsert_character(character)?;
        if self.gateway.personal_account_of(character_id)?.is_some() {
            return Err(BankError::conflict(format!(
                "character {character_id} already has a personal account"
            )));
        }
        let account = AccountRow {
            id: AccountId::new(),
            label: "Personal".to_string(),
            owner: character_id,
            kind: AccountKind::Personal,
            balance: 0,
            is_default: true,
            version: 0,
            created_at: Utc::now(),
        };
        self.gateway.create_account(account.clone(), None)?;
        Ok(account)
    }

    /// Open a new account owned by the caller.
    ///
    /// Shared accounts get the creator's explicit owner grant in the same
    /// commit; personal accounts carry implicit owner access and at most one
    /// may exist per character.
    pub fn create(
        &self,
        caller: &Caller,
        label: impl Into<String>,
        kind: AccountKind,
    ) -> BankResult<AccountRow> {
        let label = validated_label(label.into())?;
        if self.gateway.character(caller.character_id)?.is_none() {
            return Err(BankError::not_found(format!(
                "character {}",
                caller.character_id
            )));
        }
        if kind == AccountKind::Personal
            && self.gateway.personal_account_of(caller.character_id)?.is_some()
        {
            return Err(BankError::conflict(
                "character already has a personal account",
            ));
        }

        let account = AccountRow {
            id: AccountId::new(),
            label,
            owner: caller.character_id,
            kind,
            balance: 0,
            is_default: false,
            version: 0,
            created_at: Utc::now(),
        };
        let owner_grant = (kind == AccountKind::Shared).then(|| GrantRow {
            account_id: account.id,
            character_id: caller.character_id,
            role: Role::owner(),
        });
        self.gateway.create_account(account.clone(), owner_grant)?;
        Ok(account)
    }

    /// Relabel an account. Requires `manageAccount`.
    pub fn rename(
        &self,
        caller: &Caller,
        account_id: AccountId,
        label: impl Into<String>,
    ) -> BankResult<()> {
        let label = validated_label(label.into())?;
        self.access
            .require(caller.character_id, account_id, &names::manage_account())?;
        self.gateway.rename_account(account_id, label)?;
        Ok(())
    }

    /// Flip the caller's personal account to shared, materializing their
    /// owner grant. Only the personal owner can do this; an account that is
    /// already shared is a conflict.
    pub fn convert_to_shared(&self, caller: &Caller, account_id: AccountId) -> BankResult<()> {
        let account = self
            .gateway
            .account(account_id)?
            .ok_or_else(|| BankError::not_found(format!("account {account_id}")))?;
        if !account.is_personal() {
            return Err(BankError::conflict("account is already shared"));
        }
        if account.owner != caller.character_id {
            return Err(BankError::permission_denied("convert"));
        }

        let owner_grant = GrantRow {
            account_id,
            character_id: caller.character_id,
            role: Role::owner(),
        };
        self.gateway.convert_to_shared(account_id, owner_grant)?;
        Ok(())
    }

    /// Close an account. Requires `closeAccount`; the store refuses unless
    /// the balance is exactly zero. Transaction history survives the account.
    ///
    /// A funded account surfaces as `InvalidTarget`, a terminal validation
    /// failure; the balance must reach zero before closure.
    pub fn delete(&self, caller: &Caller, account_id: AccountId) -> BankResult<()> {
        self.access
            .require(caller.character_id, account_id, &names::close_account())?;
        match self.gateway.delete_account(account_id) {
            Err(StoreError::Conflict(msg)) => Err(BankError::invalid_target(msg)),
            other => Ok(other?),
        }
    }

    /// Reassign a shared account to `new_owner`. Requires
    /// `transferOwnership` (owner-only under the default table).
    ///
    /// One atomic unit in the store: the new owner's grant is upserted to
    /// `owner`, the account row is repointed, and the previous owner is
    /// demoted to manager. Failure leaves all three untouched.
    pub fn transfer_ownership(
        &self,
        caller: &Caller,
        account_id: AccountId,
        new_owner: CharacterId,
    ) -> BankResult<()> {
        let account = self.access.require(
            caller.character_id,
            account_id,
            &names::transfer_ownership(),
        )?;
        if account.is_personal() {
            return Err(BankError::invalid_target(
                "personal accounts cannot change owner",
            ));
        }
        if account.owner == new_owner {
            return Err(BankError::invalid_target(
                "target already owns this account",
            ));
        }
        if self.gateway.character(new_owner)?.is_none() {
            return Err(BankError::not_found(format!("character {new_owner}")));
        }

        let previous_owner = account.owner;
        self.gateway
            .transfer_ownership(account_id, new_owner, previous_owner)?;
        self.publish(BankEvent::OwnershipTransferred(OwnershipTransferred {
            account_id,
            previous_owner,
            new_owner,
            occurred_at: Utc::now(),
        }));
        Ok(())
    }

    /// Add a member to a shared account. Requires `addUser`.
    pub fn add_user(
        &self,
        caller: &Caller,
        account_id: AccountId,
        character_id: CharacterId,
        role: Role,
    ) -> BankResult<()> {
        let account = self
            .access
            .require(caller.character_id, account_id, &names::add_user())?;
        self.check_membership_target(&account, &role)?;
        if self.gateway.character(character_id)?.is_none() {
            return Err(BankError::not_found(format!("character {character_id}")));
        }
        if self.gateway.grant(account_id, character_id)?.is_some() {
            return Err(BankError::conflict("character is already a member"));
        }

        self.gateway.upsert_grant(GrantRow {
            account_id,
            character_id,
            role,
        })?;
        Ok(())
    }

    /// Change an existing member's role. Requires `manageUser`. The owner's
    /// grant can only change through [`Self::transfer_ownership`].
    pub fn set_user_role(
        &self,
        caller: &Caller,
        account_id: AccountId,
        character_id: CharacterId,
        role: Role,
    ) -> BankResult<()> {
        let account = self
            .access
            .require(caller.character_id, account_id, &names::manage_user())?;
        self.check_membership_target(&account, &role)?;
        let grant = self
            .gateway
            .grant(account_id, character_id)?
            .ok_or_else(|| BankError::not_found(format!("grant for {character_id}")))?;
        if grant.role.is_owner() {
            return Err(BankError::invalid_target(
                "the owner's role cannot be changed here",
            ));
        }

        self.gateway.upsert_grant(GrantRow {
            account_id,
            character_id,
            role,
        })?;
        Ok(())
    }

    /// Remove a member from a shared account. Requires `removeUser`; the
    /// owner cannot be removed.
    pub fn remove_user(
        &self,
        caller: &Caller,
        account_id: AccountId,
        character_id: CharacterId,
    ) -> BankResult<()> {
        self.access
            .require(caller.character_id, account_id, &names::remove_user())?;
        let grant = self
            .gateway
            .grant(account_id, character_id)?
            .ok_or_else(|| BankError::not_found(format!("grant for {character_id}")))?;
        if grant.role.is_owner() {
            return Err(BankError::invalid_target("the owner cannot be removed"));
        }

        self.gateway.remove_grant(account_id, character_id)?;
        Ok(())
    }

    fn check_membership_target(&self, account: &AccountRow, role: &Role) -> BankResult<()> {
        if account.is_personal() {
            return Err(BankError::invalid_target(
                "personal accounts have no membership",
            ));
        }
        if role.is_owner() {
            return Err(BankError::invalid_target(
                "ownership is assigned via transfer, not membership",
            ));
        }
        if !self.access.table().known_role(role) {
            return Err(BankError::invalid_target(format!("unknown role {role}")));
        }
        Ok(())
    }

    fn publish(&self, event: BankEvent) {
        if let Err(err) = self.bus.publish(event) {
            warn!(?err, "domain event publish failed");
        }
    }
}

fn validated_label(label: String) -> BankResult<String> {
    let label = label.trim().to_string();
    if label.is_empty() {
        return Err(BankError::invalid_target("account label cannot be empty"));
    }
    if label.len() > MAX_LABEL_LEN {
        return Err(BankError::invalid_target("account label too long"));
    }
    Ok(label)
}
