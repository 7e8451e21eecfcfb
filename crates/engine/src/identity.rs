//! Identity provider contract.
//!
//! The session/connection layer is an external collaborator; the core only
//! needs it to turn an opaque session reference into a stable character
//! identity.

use std::collections::HashMap;
use std::sync::RwLock;

use teller_core::CharacterId;

use crate::context::Caller;

/// Opaque reference to a live session/connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionRef(String);

impl SessionRef {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Resolves a session to the character it belongs to.
///
/// `None` means the session is unknown or expired; callers treat that as a
/// terminal rejection, never as an anonymous caller.
pub trait IdentityProvider: Send + Sync {
    fn resolve_caller(&self, session: &SessionRef) -> Option<Caller>;
}

/// Table-backed identity provider for tests/dev.
#[derive(Debug, Default)]
pub struct StaticIdentityProvider {
    sessions: RwLock<HashMap<SessionRef, CharacterId>>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, session: SessionRef, character_id: CharacterId) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.insert(session, character_id);
        }
    }
}

impl IdentityProvider for StaticIdentityProvider {
    fn resolve_caller(&self, session: &SessionRef) -> Option<Caller> {
        let sessions = self.sessions.read().ok()?;
        sessions.get(session).copied().map(Caller::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_session_resolves_to_none() {
        let provider = StaticIdentityProvider::new();
        let character = CharacterId::new();
        provider.register(SessionRef::new("s-1"), character);

        assert_eq!(
            provider.resolve_caller(&SessionRef::new("s-1")),
            Some(Caller::new(character))
        );
        assert_eq!(provider.resolve_caller(&SessionRef::new("s-2")), None);
    }
}
