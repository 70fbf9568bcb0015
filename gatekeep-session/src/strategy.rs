use crate::error::SessionAuthenticationError;
use crate::registry::SessionRegistry;
use crate::{new_session_id, Session, SessionConfig, SessionStore};
use async_trait::async_trait;
use gatekeep_core::strategy::{utils, AuthenticationStrategy};
use gatekeep_core::{AuthError, Identity};
use http::request::Parts;
use std::sync::Arc;

/// Session behaviour that runs when a new authentication occurs.
///
/// Typical uses are making sure a session exists, or changing the session id to
/// guard against session-fixation attacks. `session` is the session attached to the
/// current request, if any; strategies may create, replace or leave it alone.
#[async_trait]
pub trait SessionAuthenticationStrategy: Send + Sync {
    /// Apply the strategy.
    ///
    /// Returns an error when the authentication is not allowed for this session,
    /// typically because the principal already has too many sessions open.
    async fn on_authentication(
        &self,
        identity: &Identity,
        parts: &Parts,
        session: &mut Option<Session>,
    ) -> Result<(), SessionAuthenticationError>;
}

#[async_trait]
impl<T: SessionAuthenticationStrategy + ?Sized> SessionAuthenticationStrategy for Arc<T> {
    async fn on_authentication(
        &self,
        identity: &Identity,
        parts: &Parts,
        session: &mut Option<Session>,
    ) -> Result<(), SessionAuthenticationError> {
        (**self).on_authentication(identity, parts, session).await
    }
}

/// Does nothing. Used when sessions are not involved in authentication.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSessionStrategy;

#[async_trait]
impl SessionAuthenticationStrategy for NullSessionStrategy {
    async fn on_authentication(
        &self,
        _identity: &Identity,
        _parts: &Parts,
        _session: &mut Option<Session>,
    ) -> Result<(), SessionAuthenticationError> {
        Ok(())
    }
}

/// Session-fixation protection.
///
/// An existing session is moved to a fresh id and bound to the new identity; the old
/// id is deleted from the store and, when a registry is attached, renamed there.
/// Without a session, a new one is created.
pub struct ChangeSessionIdStrategy {
    store: Arc<dyn SessionStore>,
    registry: Option<Arc<SessionRegistry>>,
    config: SessionConfig,
    migrate_attributes: bool,
}

impl ChangeSessionIdStrategy {
    /// Create the strategy over `store`.
    pub fn new(store: Arc<dyn SessionStore>, config: SessionConfig) -> Self {
        Self {
            store,
            registry: None,
            config,
            migrate_attributes: true,
        }
    }

    /// Keep `registry` in step with id changes.
    pub fn registry(mut self, registry: Arc<SessionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Whether attributes of the old session survive the id change. Defaults to `true`.
    pub fn migrate_attributes(mut self, migrate: bool) -> Self {
        self.migrate_attributes = migrate;
        self
    }
}

#[async_trait]
impl SessionAuthenticationStrategy for ChangeSessionIdStrategy {
    async fn on_authentication(
        &self,
        identity: &Identity,
        _parts: &Parts,
        session: &mut Option<Session>,
    ) -> Result<(), SessionAuthenticationError> {
        match session {
            Some(current) => {
                let old_id = std::mem::replace(&mut current.id, new_session_id());
                current.identity = identity.clone();
                if !self.migrate_attributes {
                    current.attributes.clear();
                }
                self.store.save_session(current).await?;
                self.store.delete_session(&old_id).await?;
                if let Some(registry) = &self.registry {
                    registry.session_id_changed(&old_id, &current.id).await;
                }
                log::debug!("changed session id for {}", identity.principal());
            }
            None => {
                let created = Session::new(identity.clone(), self.config.max_age());
                self.store.save_session(&created).await?;
                log::debug!("created session for {}", identity.principal());
                *session = Some(created);
            }
        }
        Ok(())
    }
}

/// Limits how many sessions a principal may hold at once.
///
/// Only sessions still present in the store count; registrations whose session
/// expired or was deleted are dropped from the registry first. When the limit is reached the new authentication is either rejected or the
/// principal's oldest sessions are expired to make room.
pub struct ConcurrentSessionControlStrategy {
    registry: Arc<SessionRegistry>,
    store: Arc<dyn SessionStore>,
    maximum_sessions: i32,
    error_if_maximum_exceeded: bool,
}

impl ConcurrentSessionControlStrategy {
    /// Allow one session per principal, expiring the older one.
    pub fn new(registry: Arc<SessionRegistry>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            registry,
            store,
            maximum_sessions: 1,
            error_if_maximum_exceeded: false,
        }
    }

    /// Sessions allowed per principal. A negative value means unlimited.
    pub fn maximum_sessions(mut self, maximum: i32) -> Self {
        self.maximum_sessions = maximum;
        self
    }

    /// Reject the new authentication instead of expiring older sessions.
    pub fn error_if_maximum_exceeded(mut self, error: bool) -> Self {
        self.error_if_maximum_exceeded = error;
        self
    }
}

#[async_trait]
impl SessionAuthenticationStrategy for ConcurrentSessionControlStrategy {
    async fn on_authentication(
        &self,
        identity: &Identity,
        _parts: &Parts,
        session: &mut Option<Session>,
    ) -> Result<(), SessionAuthenticationError> {
        if self.maximum_sessions < 0 {
            return Ok(());
        }

        let principal = identity.principal();
        let mut sessions = Vec::new();
        for info in self.registry.sessions_for(&principal).await {
            if self.store.load_session(&info.session_id).await?.is_some() {
                sessions.push(info);
            } else {
                log::debug!("dropping dead session {} of {}", info.session_id, principal);
                self.registry.remove_session(&info.session_id).await;
            }
        }
        let allowed = self.maximum_sessions as usize;

        if sessions.len() < allowed {
            return Ok(());
        }
        // re-authenticating inside an already counted session
        if sessions.len() == allowed {
            if let Some(current) = session.as_ref() {
                if sessions.iter().any(|s| s.session_id == current.id) {
                    return Ok(());
                }
            }
        }

        if self.error_if_maximum_exceeded || allowed == 0 {
            log::warn!("rejecting authentication of {}: session limit reached", principal);
            return Err(SessionAuthenticationError::MaximumSessionsExceeded {
                principal,
                max: self.maximum_sessions,
            });
        }

        let excess = sessions.len() + 1 - allowed;
        for stale in sessions.iter().take(excess) {
            log::debug!("expiring session {} of {}", stale.session_id, principal);
            self.store.delete_session(&stale.session_id).await?;
            self.registry.remove_session(&stale.session_id).await;
        }
        Ok(())
    }
}

/// Records the request's session in the registry under the authenticated principal.
pub struct RegisterSessionStrategy {
    registry: Arc<SessionRegistry>,
}

impl RegisterSessionStrategy {
    /// Register into `registry`.
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl SessionAuthenticationStrategy for RegisterSessionStrategy {
    async fn on_authentication(
        &self,
        identity: &Identity,
        _parts: &Parts,
        session: &mut Option<Session>,
    ) -> Result<(), SessionAuthenticationError> {
        if let Some(current) = session.as_ref() {
            self.registry
                .register_new_session(&current.id, &identity.principal())
                .await;
        }
        Ok(())
    }
}

/// Runs several strategies in order, stopping at the first error.
#[derive(Default)]
pub struct CompositeSessionStrategy {
    delegates: Vec<Box<dyn SessionAuthenticationStrategy>>,
}

impl CompositeSessionStrategy {
    /// Create an empty composite.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a delegate.
    pub fn with<S>(mut self, strategy: S) -> Self
    where
        S: SessionAuthenticationStrategy + 'static,
    {
        self.delegates.push(Box::new(strategy));
        self
    }
}

#[async_trait]
impl SessionAuthenticationStrategy for CompositeSessionStrategy {
    async fn on_authentication(
        &self,
        identity: &Identity,
        parts: &Parts,
        session: &mut Option<Session>,
    ) -> Result<(), SessionAuthenticationError> {
        for delegate in &self.delegates {
            delegate.on_authentication(identity, parts, session).await?;
        }
        Ok(())
    }
}

/// Authenticates a request from the session named in its session cookie.
pub struct SessionCookieStrategy {
    store: Arc<dyn SessionStore>,
    cookie_name: String,
}

impl SessionCookieStrategy {
    /// Read the cookie named in `config` and look it up in `store`.
    pub fn new(store: Arc<dyn SessionStore>, config: &SessionConfig) -> Self {
        Self {
            store,
            cookie_name: config.cookie_name.clone(),
        }
    }

    /// Load the session referenced by the request, if any.
    pub async fn load(&self, parts: &Parts) -> Result<Option<Session>, AuthError> {
        match utils::extract_cookie(&parts.headers, &self.cookie_name) {
            Some(session_id) => self.store.load_session(session_id).await,
            None => Ok(None),
        }
    }
}

#[async_trait]
impl AuthenticationStrategy<Identity> for SessionCookieStrategy {
    fn name(&self) -> &str {
        "session"
    }

    async fn authenticate(&self, parts: &Parts) -> Result<Option<Identity>, AuthError> {
        Ok(self.load(parts).await?.map(|session| session.identity))
    }
}
