use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A unified identity produced by any authentication strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Who vouched for the identity, e.g. "basic", "jwt" or an issuer URL.
    pub provider_id: String,
    /// Subject identifier within the provider.
    pub external_id: String,
    /// Email address, when known.
    pub email: Option<String>,
    /// Display or login name, when known.
    pub username: Option<String>,
    /// Granted authorities, e.g. `ROLE_USER`.
    #[serde(default)]
    pub authorities: Vec<String>,
    /// Free-form provider attributes.
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl Identity {
    /// Create an identity with only the provider and subject set.
    pub fn new(provider_id: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            external_id: external_id.into(),
            email: None,
            username: None,
            authorities: Vec::new(),
            attributes: HashMap::new(),
        }
    }

    /// Set the username.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Add a granted authority.
    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authorities.push(authority.into());
        self
    }

    /// Key identifying the principal across providers.
    ///
    /// Used to group sessions that belong to the same user.
    pub fn principal(&self) -> String {
        format!("{}:{}", self.provider_id, self.external_id)
    }

    /// Whether the identity carries the given authority.
    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|a| a == authority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_combines_provider_and_subject() {
        let identity = Identity::new("basic", "alice");
        assert_eq!(identity.principal(), "basic:alice");
    }

    #[test]
    fn authorities_are_checked_exactly() {
        let identity = Identity::new("basic", "alice").with_authority("ROLE_USER");
        assert!(identity.has_authority("ROLE_USER"));
        assert!(!identity.has_authority("ROLE_ADMIN"));
    }
}
