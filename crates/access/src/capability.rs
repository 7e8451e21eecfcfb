use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Capability identifier.
///
/// Capabilities are modeled as opaque strings (e.g. "withdraw") so new ones
/// can be introduced through configuration without touching engine logic.
/// A special wildcard capability `"*"` is used by the policy layer to mean
/// "allow all" (personal-account owners, the `owner` role).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capability(Cow<'static, str>);

impl Capability {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The capability names the engines check. Deployments may extend the table
/// with additional names; these are the ones wired to operations.
pub mod names {
    use super::Capability;

    pub const WILDCARD: &str = "*";
    pub const WITHDRAW: &str = "withdraw";
    pub const CLOSE_ACCOUNT: &str = "closeAccount";
    pub const MANAGE_ACCOUNT: &str = "manageAccount";
    pub const MANAGE_USER: &str = "manageUser";
    pub const ADD_USER: &str = "addUser";
    pub const REMOVE_USER: &str = "removeUser";
    pub const TRANSFER_OWNERSHIP: &str = "transferOwnership";
    pub const VIEW_HISTORY: &str = "viewHistory";
    pub const PAY_INVOICE: &str = "payInvoice";
    pub const SEND_INVOICE: &str = "sendInvoice";

    pub fn withdraw() -> Capability {
        Capability::new(WITHDRAW)
    }

    pub fn close_account() -> Capability {
        Capability::new(CLOSE_ACCOUNT)
    }

    pub fn manage_account() -> Capability {
        Capability::new(MANAGE_ACCOUNT)
    }

    pub fn manage_user() -> Capability {
        Capability::new(MANAGE_USER)
    }

    pub fn add_user() -> Capability {
        Capability::new(ADD_USER)
    }

    pub fn remove_user() -> Capability {
        Capability::new(REMOVE_USER)
    }

    pub fn transfer_ownership() -> Capability {
        Capability::new(TRANSFER_OWNERSHIP)
    }

    pub fn view_history() -> Capability {
        Capability::new(VIEW_HISTORY)
    }

    pub fn pay_invoice() -> Capability {
        Capability::new(PAY_INVOICE)
    }

    pub fn send_invoice() -> Capability {
        Capability::new(SEND_INVOICE)
    }
}
