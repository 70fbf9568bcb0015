use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// What the registry knows about one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInformation {
    /// Session identifier.
    pub session_id: String,
    /// Principal key of the owner.
    pub principal: String,
    /// Registration time, used to pick the oldest session to expire.
    pub registered_at: DateTime<Utc>,
}

/// In-memory index of live sessions per principal.
#[derive(Default)]
pub struct SessionRegistry {
    by_principal: RwLock<HashMap<String, Vec<SessionInformation>>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `session_id` as belonging to `principal`. Re-registering is a no-op.
    pub async fn register_new_session(&self, session_id: &str, principal: &str) {
        let mut by_principal = self.by_principal.write().await;
        let sessions = by_principal.entry(principal.to_string()).or_default();
        if sessions.iter().any(|s| s.session_id == session_id) {
            return;
        }
        sessions.push(SessionInformation {
            session_id: session_id.to_string(),
            principal: principal.to_string(),
            registered_at: Utc::now(),
        });
    }

    /// Sessions of `principal`, oldest first.
    pub async fn sessions_for(&self, principal: &str) -> Vec<SessionInformation> {
        self.by_principal
            .read()
            .await
            .get(principal)
            .cloned()
            .unwrap_or_default()
    }

    /// Forget a session wherever it is registered.
    pub async fn remove_session(&self, session_id: &str) {
        let mut by_principal = self.by_principal.write().await;
        by_principal.retain(|_, sessions| {
            sessions.retain(|s| s.session_id != session_id);
            !sessions.is_empty()
        });
    }

    /// Move the registration of `old_id` to `new_id`, keeping its registration time.
    pub async fn session_id_changed(&self, old_id: &str, new_id: &str) {
        let mut by_principal = self.by_principal.write().await;
        for info in by_principal.values_mut().flatten() {
            if info.session_id == old_id {
                info.session_id = new_id.to_string();
            }
        }
    }

    /// Principals with at least one registered session.
    pub async fn principals(&self) -> Vec<String> {
        self.by_principal.read().await.keys().cloned().collect()
    }
}
