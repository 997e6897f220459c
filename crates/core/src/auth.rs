use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Principal information persisted in the authenticated session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalIdentity {
    principal_id: Uuid,
    display_name: String,
    email: String,
}

impl PrincipalIdentity {
    /// Creates a principal identity from authentication data.
    #[must_use]
    pub fn new(principal_id: Uuid, display_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            principal_id,
            display_name: display_name.into(),
            email: email.into(),
        }
    }

    /// Returns the stable principal identifier.
    #[must_use]
    pub fn principal_id(&self) -> Uuid {
        self.principal_id
    }

    /// Returns the display name for the current principal.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the canonical email address.
    #[must_use]
    pub fn email(&self) -> &str {
        self.email.as_str()
    }
}
