use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier on a shared account.
///
/// Roles are opaque strings at this layer; the mapping from role to
/// capabilities is carried by [`crate::CapabilityTable`]. The three built-in
/// roles are ordered `owner > manager > employee`, which drives roster
/// sorting and the rule that ownership moves only through the dedicated
/// ownership-transfer operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

pub const OWNER: &str = "owner";
pub const MANAGER: &str = "manager";
pub const EMPLOYEE: &str = "employee";

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn owner() -> Self {
        Self::new(OWNER)
    }

    pub fn manager() -> Self {
        Self::new(MANAGER)
    }

    pub fn employee() -> Self {
        Self::new(EMPLOYEE)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_owner(&self) -> bool {
        self.as_str() == OWNER
    }

    /// Ordering rank for the built-in roles (higher outranks lower).
    /// Unknown roles rank below every built-in one.
    pub fn rank(&self) -> u8 {
        match self.as_str() {
            OWNER => 3,
            MANAGER => 2,
            EMPLOYEE => 1,
            _ => 0,
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
