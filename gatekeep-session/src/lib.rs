//! # Gatekeep Session
//!
//! Server-side sessions and the strategies that run when a request authenticates:
//! session-fixation protection, concurrent session control and registration.

#![warn(missing_docs)]

use async_trait::async_trait;
use gatekeep_core::{AuthError, Identity, SameSite};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Errors raised by session authentication strategies.
pub mod error;
/// Tracks which sessions belong to which principal.
pub mod registry;
/// Session authentication strategies.
pub mod strategy;

pub use error::SessionAuthenticationError;
pub use registry::{SessionInformation, SessionRegistry};
pub use strategy::{
    ChangeSessionIdStrategy, CompositeSessionStrategy, ConcurrentSessionControlStrategy,
    NullSessionStrategy, RegisterSessionStrategy, SessionAuthenticationStrategy,
    SessionCookieStrategy,
};

/// A server-side session bound to an identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque session identifier, sent to the client in a cookie.
    pub id: String,
    /// The identity that owns the session.
    pub identity: Identity,
    /// Arbitrary values stored alongside the identity.
    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,
    /// When the session was created.
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// When the session stops being valid.
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

impl Session {
    /// Create a session with a fresh random id.
    pub fn new(identity: Identity, ttl: chrono::Duration) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: new_session_id(),
            identity,
            attributes: HashMap::new(),
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// Whether the session has passed its expiry time.
    pub fn is_expired(&self) -> bool {
        self.expires_at <= chrono::Utc::now()
    }
}

pub(crate) fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Configuration for session cookies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// The name of the session cookie.
    pub cookie_name: String,
    /// Whether the cookie should only be sent over HTTPS.
    pub secure: bool,
    /// Whether the cookie is hidden from scripts.
    pub http_only: bool,
    /// Cross-site policy for the cookie.
    pub same_site: SameSite,
    /// Session lifetime in seconds.
    pub max_age_secs: i64,
}

impl SessionConfig {
    /// Session lifetime.
    pub fn max_age(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.max_age_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "GATEKEEP_SESSION".to_string(),
            secure: true,
            http_only: true,
            same_site: SameSite::Lax,
            max_age_secs: 24 * 60 * 60,
        }
    }
}

/// Storage backend for sessions.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Load a live session. Expired sessions are reported as missing.
    async fn load_session(&self, id: &str) -> Result<Option<Session>, AuthError>;
    /// Insert or replace a session.
    async fn save_session(&self, session: &Session) -> Result<(), AuthError>;
    /// Remove a session. Removing an unknown id is not an error.
    async fn delete_session(&self, id: &str) -> Result<(), AuthError>;
}

/// In-process session store.
#[derive(Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemoryStore {
    /// Number of stored sessions, expired ones included.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether the store holds no sessions.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load_session(&self, id: &str) -> Result<Option<Session>, AuthError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(id).filter(|s| !s.is_expired()).cloned())
    }

    async fn save_session(&self, session: &Session) -> Result<(), AuthError> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn delete_session(&self, id: &str) -> Result<(), AuthError> {
        self.sessions.write().await.remove(id);
        Ok(())
    }
}
