use gatekeep_core::{AuthError, AuthenticationStrategy, Identity};
use gatekeep_session::{
    ChangeSessionIdStrategy, CompositeSessionStrategy, ConcurrentSessionControlStrategy,
    MemoryStore, NullSessionStrategy, RegisterSessionStrategy, Session,
    SessionAuthenticationError, SessionAuthenticationStrategy, SessionConfig,
    SessionCookieStrategy, SessionRegistry, SessionStore,
};
use http::request::Parts;
use std::sync::Arc;

fn request() -> Parts {
    http::Request::builder()
        .uri("/login")
        .body(())
        .unwrap()
        .into_parts()
        .0
}

fn alice() -> Identity {
    Identity::new("basic", "alice").with_authority("ROLE_USER")
}

struct Fixture {
    store: Arc<MemoryStore>,
    registry: Arc<SessionRegistry>,
}

impl Fixture {
    fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::default()),
            registry: Arc::new(SessionRegistry::new()),
        }
    }

    fn composite(&self, maximum: i32, error_if_exceeded: bool) -> CompositeSessionStrategy {
        self.composite_with(maximum, error_if_exceeded, SessionConfig::default())
    }

    fn composite_with(
        &self,
        maximum: i32,
        error_if_exceeded: bool,
        config: SessionConfig,
    ) -> CompositeSessionStrategy {
        CompositeSessionStrategy::new()
            .with(
                ConcurrentSessionControlStrategy::new(self.registry.clone(), self.store.clone())
                    .maximum_sessions(maximum)
                    .error_if_maximum_exceeded(error_if_exceeded),
            )
            .with(
                ChangeSessionIdStrategy::new(self.store.clone(), config)
                    .registry(self.registry.clone()),
            )
            .with(RegisterSessionStrategy::new(self.registry.clone()))
    }

    async fn registered_ids(&self) -> Vec<String> {
        self.registry
            .sessions_for(&alice().principal())
            .await
            .into_iter()
            .map(|s| s.session_id)
            .collect()
    }

    async fn login(
        &self,
        strategy: &dyn SessionAuthenticationStrategy,
    ) -> Result<Session, SessionAuthenticationError> {
        let mut session = None;
        strategy
            .on_authentication(&alice(), &request(), &mut session)
            .await?;
        Ok(session.expect("strategy creates a session"))
    }
}

#[tokio::test]
async fn null_strategy_leaves_session_untouched() {
    let mut session = None;
    NullSessionStrategy
        .on_authentication(&alice(), &request(), &mut session)
        .await
        .unwrap();
    assert!(session.is_none());
}

#[tokio::test]
async fn change_session_id_protects_against_fixation() {
    let fixture = Fixture::new();
    let mut anonymous = Session::new(Identity::new("anonymous", "guest"), chrono::Duration::hours(1));
    anonymous
        .attributes
        .insert("cart".to_string(), serde_json::json!(["book"]));
    fixture.store.save_session(&anonymous).await.unwrap();
    let fixated_id = anonymous.id.clone();

    let strategy = ChangeSessionIdStrategy::new(fixture.store.clone(), SessionConfig::default());
    let mut session = Some(anonymous);
    strategy
        .on_authentication(&alice(), &request(), &mut session)
        .await
        .unwrap();

    let session = session.unwrap();
    assert_ne!(session.id, fixated_id);
    assert_eq!(session.identity, alice());
    assert_eq!(session.attributes["cart"], serde_json::json!(["book"]));
    assert!(fixture.store.load_session(&fixated_id).await.unwrap().is_none());
    assert!(fixture.store.load_session(&session.id).await.unwrap().is_some());
}

#[tokio::test]
async fn change_session_id_can_drop_attributes() {
    let fixture = Fixture::new();
    let mut existing = Session::new(alice(), chrono::Duration::hours(1));
    existing
        .attributes
        .insert("cart".to_string(), serde_json::json!([]));

    let strategy = ChangeSessionIdStrategy::new(fixture.store.clone(), SessionConfig::default())
        .migrate_attributes(false);
    let mut session = Some(existing);
    strategy
        .on_authentication(&alice(), &request(), &mut session)
        .await
        .unwrap();

    assert!(session.unwrap().attributes.is_empty());
}

#[tokio::test]
async fn oldest_session_is_expired_when_limit_reached() {
    let fixture = Fixture::new();
    let strategy = fixture.composite(1, false);

    let first = fixture.login(&strategy).await.unwrap();
    let second = fixture.login(&strategy).await.unwrap();

    let registered: Vec<_> = fixture
        .registry
        .sessions_for(&alice().principal())
        .await
        .into_iter()
        .map(|s| s.session_id)
        .collect();
    assert_eq!(registered, vec![second.id.clone()]);
    assert!(fixture.store.load_session(&first.id).await.unwrap().is_none());
    assert!(fixture.store.load_session(&second.id).await.unwrap().is_some());
}

#[tokio::test]
async fn limit_can_reject_new_authentication() {
    let fixture = Fixture::new();
    let strategy = fixture.composite(2, true);

    fixture.login(&strategy).await.unwrap();
    fixture.login(&strategy).await.unwrap();
    let err = fixture.login(&strategy).await.unwrap_err();

    assert!(matches!(
        err,
        SessionAuthenticationError::MaximumSessionsExceeded { max: 2, .. }
    ));
    let auth_error: AuthError = err.into();
    assert_eq!(auth_error.status_code(), http::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn repeated_logins_in_one_session_count_once() {
    let fixture = Fixture::new();
    let strategy = fixture.composite(1, true);

    let mut session = None;
    for _ in 0..3 {
        strategy
            .on_authentication(&alice(), &request(), &mut session)
            .await
            .unwrap();
    }

    let current = session.unwrap();
    assert_eq!(fixture.registered_ids().await, vec![current.id.clone()]);
    assert_eq!(fixture.store.len().await, 1);
}

#[tokio::test]
async fn id_change_without_registry_hook_does_not_lock_out() {
    let fixture = Fixture::new();
    let strategy = CompositeSessionStrategy::new()
        .with(
            ConcurrentSessionControlStrategy::new(fixture.registry.clone(), fixture.store.clone())
                .error_if_maximum_exceeded(true),
        )
        .with(ChangeSessionIdStrategy::new(
            fixture.store.clone(),
            SessionConfig::default(),
        ))
        .with(RegisterSessionStrategy::new(fixture.registry.clone()));

    let mut session = None;
    for _ in 0..3 {
        strategy
            .on_authentication(&alice(), &request(), &mut session)
            .await
            .unwrap();
    }
    let current = session.unwrap();
    assert!(fixture.registered_ids().await.contains(&current.id));
}

#[tokio::test]
async fn expired_sessions_do_not_count_toward_limit() {
    let fixture = Fixture::new();
    let expired = SessionConfig {
        max_age_secs: -1,
        ..SessionConfig::default()
    };

    let first = fixture
        .login(&fixture.composite_with(1, true, expired))
        .await
        .unwrap();
    assert!(fixture.store.load_session(&first.id).await.unwrap().is_none());

    let second = fixture.login(&fixture.composite(1, true)).await.unwrap();
    assert_eq!(fixture.registered_ids().await, vec![second.id]);
}

#[tokio::test]
async fn negative_limit_is_unlimited() {
    let fixture = Fixture::new();
    let strategy = fixture.composite(-1, true);

    for _ in 0..5 {
        fixture.login(&strategy).await.unwrap();
    }
    assert_eq!(fixture.registry.sessions_for(&alice().principal()).await.len(), 5);
}

#[tokio::test]
async fn session_cookie_authenticates_request() {
    let fixture = Fixture::new();
    let config = SessionConfig::default();
    let session = Session::new(alice(), chrono::Duration::hours(1));
    fixture.store.save_session(&session).await.unwrap();

    let parts = http::Request::builder()
        .uri("/")
        .header("cookie", format!("{}={}", config.cookie_name, session.id))
        .body(())
        .unwrap()
        .into_parts()
        .0;

    let strategy = SessionCookieStrategy::new(fixture.store.clone(), &config);
    let identity = strategy.authenticate(&parts).await.unwrap();
    assert_eq!(identity, Some(alice()));
    assert!(strategy.authenticate(&request()).await.unwrap().is_none());
}
