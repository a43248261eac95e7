//! Server state.

use crate::identity::Identity;
use snipvault_core::{AccessPolicy, Layout, Snippet, Vault};
use snipvault_store::StoreConnector;
use std::sync::Arc;

/// Shared state for all handlers.
///
/// Holds no snippet data: every request connects to the store with the
/// caller's own credential and reads fresh.
#[derive(Clone)]
pub struct AppState {
    pub connector: Arc<dyn StoreConnector>,
    pub layout: Layout,
    pub policy: Arc<AccessPolicy>,
}

impl AppState {
    pub fn new(connector: Arc<dyn StoreConnector>, layout: Layout, policy: AccessPolicy) -> Self {
        Self {
            connector,
            layout,
            policy: Arc::new(policy),
        }
    }

    /// Snippet operations bound to the caller's credential.
    pub fn vault(&self, identity: &Identity) -> Vault {
        Vault::new(
            self.connector.connect(identity.credential.as_ref()),
            self.layout.clone(),
        )
    }

    /// Whether the caller may write and see private snippets.
    ///
    /// A username without a credential is never authorized: the username
    /// header alone is not proof of sign-in.
    pub fn is_authorized(&self, identity: &Identity) -> bool {
        identity.is_signed_in() && self.policy.is_authorized(identity.username.as_deref())
    }

    /// Whether the caller may read `snippet`.
    pub fn can_view(&self, identity: &Identity, snippet: &Snippet) -> bool {
        snippet.is_public || self.is_authorized(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snipvault_store::{Credential, MemoryStore};

    #[test]
    fn test_authorization_follows_policy() {
        let state = AppState::new(
            Arc::new(Arc::new(MemoryStore::new())),
            Layout::default(),
            AccessPolicy::from_allow_list(["alice"]),
        );
        let alice = Identity {
            username: Some("alice".to_string()),
            credential: Some(Credential::new("t")),
        };
        let bob = Identity {
            username: Some("bob".to_string()),
            credential: None,
        };
        assert!(state.is_authorized(&alice));
        assert!(!state.is_authorized(&bob));
        assert!(!state.is_authorized(&Identity::anonymous()));
    }

    #[test]
    fn test_username_without_credential_is_not_authorized() {
        let state = AppState::new(
            Arc::new(Arc::new(MemoryStore::new())),
            Layout::default(),
            AccessPolicy::from_allow_list(["alice"]),
        );
        let claimed = Identity {
            username: Some("alice".to_string()),
            credential: None,
        };
        assert!(!state.is_authorized(&claimed));
    }
}
