use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::capability::{names, Capability};
use crate::role::{Role, EMPLOYEE, MANAGER, OWNER};

/// Data-driven role → capability mapping.
///
/// The table is configuration, not code: it deserializes from any serde
/// source, so deployments can add roles or capabilities without touching the
/// engines. Lookups fail closed: an unknown role grants nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityTable {
    roles: HashMap<String, HashSet<String>>,
}

impl CapabilityTable {
    pub fn new(roles: HashMap<String, HashSet<String>>) -> Self {
        Self { roles }
    }

    /// The canonical built-in table: `owner` holds the wildcard, `manager`
    /// everything except closure/ownership transfer, `employee` the
    /// read-and-pay slice.
    pub fn default_table() -> Self {
        let mut roles: HashMap<String, HashSet<String>> = HashMap::new();

        roles.insert(
            OWNER.to_string(),
            [names::WILDCARD].iter().map(|s| s.to_string()).collect(),
        );
        roles.insert(
            MANAGER.to_string(),
            [
                names::WITHDRAW,
                names::MANAGE_ACCOUNT,
                names::MANAGE_USER,
                names::ADD_USER,
                names::REMOVE_USER,
                names::VIEW_HISTORY,
                names::PAY_INVOICE,
                names::SEND_INVOICE,
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        );
        roles.insert(
            EMPLOYEE.to_string(),
            [names::VIEW_HISTORY, names::PAY_INVOICE, names::SEND_INVOICE]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );

        Self { roles }
    }

    /// Whether `role` grants `capability`. Unknown roles grant nothing.
    pub fn grants(&self, role: &Role, capability: &Capability) -> bool {
        let Some(caps) = self.roles.get(role.as_str()) else {
            return false;
        };
        caps.contains(names::WILDCARD) || caps.contains(capability.as_str())
    }

    pub fn known_role(&self, role: &Role) -> bool {
        self.roles.contains_key(role.as_str())
    }

    pub fn role_names(&self) -> impl Iterator<Item = &str> {
        self.roles.keys().map(String::as_str)
    }
}

impl Default for CapabilityTable {
    fn default() -> Self {
        Self::default_table()
    }
}
