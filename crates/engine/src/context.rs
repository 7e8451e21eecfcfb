use teller_core::CharacterId;

/// The resolved identity an operation runs as.
///
/// Always passed explicitly; engines never look identity up from ambient
/// state. Obtain one from an [`crate::IdentityProvider`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Caller {
    pub character_id: CharacterId,
}

impl Caller {
    pub fn new(character_id: CharacterId) -> Self {
        Self { character_id }
    }
}
