use crate::matcher::RequestMatcher;
use async_trait::async_trait;
use base64::Engine;
use gatekeep_core::strategy::utils;
use gatekeep_core::{AuthError, Authenticator, Identity, LOWEST_PRECEDENCE};
use gatekeep_session::{
    NullSessionStrategy, Session, SessionAuthenticationStrategy, SessionCookieStrategy,
};
use http::request::Parts;
use http::Method;
use rand::Rng;
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// One step of a security filter chain.
///
/// A filter may enrich the request (e.g. attach the authenticated [`Identity`] to its
/// extensions) or stop it with an error carrying the response status.
#[async_trait]
pub trait SecurityFilter: Send + Sync {
    /// Short name used in log output.
    fn name(&self) -> &str;

    /// Inspect or enrich the request.
    async fn do_filter(&self, parts: &mut Parts) -> Result<(), AuthError>;
}

/// The filters applied to the requests selected by one matcher.
#[derive(Clone)]
pub struct SecurityFilterChain {
    matcher: RequestMatcher,
    filters: Vec<Arc<dyn SecurityFilter>>,
    order: i32,
}

impl SecurityFilterChain {
    /// Create an empty chain for `matcher`.
    pub fn new(matcher: RequestMatcher) -> Self {
        Self {
            matcher,
            filters: Vec::new(),
            order: LOWEST_PRECEDENCE,
        }
    }

    /// Append a filter.
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: SecurityFilter + 'static,
    {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Position among other chains; lower runs first.
    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub(crate) fn push(&mut self, filter: Arc<dyn SecurityFilter>) {
        self.filters.push(filter);
    }

    /// Whether this chain handles the request.
    pub fn matches(&self, parts: &Parts) -> bool {
        self.matcher.matches(parts)
    }

    /// The chain's matcher.
    pub fn matcher(&self) -> &RequestMatcher {
        &self.matcher
    }

    /// The chain's order.
    pub fn order_value(&self) -> i32 {
        self.order
    }

    /// Names of the filters, in execution order.
    pub fn filter_names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    pub(crate) fn filters(&self) -> &[Arc<dyn SecurityFilter>] {
        &self.filters
    }
}

impl std::fmt::Debug for SecurityFilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityFilterChain")
            .field("matcher", &self.matcher)
            .field("filters", &self.filter_names())
            .field("order", &self.order)
            .finish()
    }
}

/// Where the CSRF filter looks for the token pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfConfig {
    /// Cookie holding the expected token.
    pub cookie_name: String,
    /// Header the client echoes the token in.
    pub header_name: String,
    /// Paths exempt from the check.
    pub ignored: Vec<RequestMatcher>,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            cookie_name: "XSRF-TOKEN".to_string(),
            header_name: "X-XSRF-TOKEN".to_string(),
            ignored: Vec::new(),
        }
    }
}

/// A freshly issued token the web adapter should send back as a cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfToken {
    /// Cookie name to set.
    pub cookie_name: String,
    /// Token value.
    pub value: String,
}

impl CsrfToken {
    /// Generate a random 256-bit token.
    pub fn generate(cookie_name: impl Into<String>) -> Self {
        let bytes: [u8; 32] = rand::rng().random();
        Self {
            cookie_name: cookie_name.into(),
            value: base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes),
        }
    }
}

/// Double-submit cookie CSRF protection.
///
/// Safe methods pass. Any other method must echo the token cookie in the token header.
#[derive(Debug, Clone, Default)]
pub struct CsrfFilter {
    config: CsrfConfig,
}

impl CsrfFilter {
    /// Create the filter.
    pub fn new(config: CsrfConfig) -> Self {
        Self { config }
    }

    fn is_safe(method: &Method) -> bool {
        matches!(
            *method,
            Method::GET | Method::HEAD | Method::TRACE | Method::OPTIONS
        )
    }
}

#[async_trait]
impl SecurityFilter for CsrfFilter {
    fn name(&self) -> &str {
        "csrf"
    }

    async fn do_filter(&self, parts: &mut Parts) -> Result<(), AuthError> {
        let expected = utils::extract_cookie(&parts.headers, &self.config.cookie_name)
            .map(str::to_string);

        if expected.is_none() {
            parts
                .extensions
                .insert(CsrfToken::generate(&self.config.cookie_name));
        }

        if Self::is_safe(&parts.method) || self.config.ignored.iter().any(|m| m.matches(parts)) {
            return Ok(());
        }

        let actual = parts
            .headers
            .get(&self.config.header_name)
            .and_then(|v| v.to_str().ok());

        match (expected.as_deref(), actual) {
            (Some(expected), Some(actual)) if constant_time_eq(expected, actual) => Ok(()),
            _ => {
                log::warn!(
                    "invalid CSRF token for {} {}",
                    parts.method,
                    parts.uri.path()
                );
                Err(AuthError::CsrfMismatch)
            }
        }
    }
}

/// Restores the authenticated identity from the session cookie.
///
/// Puts both the [`Session`] and its [`Identity`] into the request extensions.
/// Credentials presented on the same request still go through
/// [`AuthenticationFilter`], which then rotates the restored session.
pub struct SessionManagementFilter {
    loader: SessionCookieStrategy,
}

impl SessionManagementFilter {
    /// Restore sessions with `loader`.
    pub fn new(loader: SessionCookieStrategy) -> Self {
        Self { loader }
    }
}

#[async_trait]
impl SecurityFilter for SessionManagementFilter {
    fn name(&self) -> &str {
        "session-management"
    }

    async fn do_filter(&self, parts: &mut Parts) -> Result<(), AuthError> {
        if let Some(session) = self.loader.load(parts).await? {
            parts.extensions.insert(session.identity.clone());
            parts.extensions.insert(session);
        }
        Ok(())
    }
}

/// Runs the configured authentication strategies.
///
/// On success the identity is attached to the request extensions and the session
/// strategy runs against the session restored for the request, if any. Fresh
/// credentials replace an identity restored from a session. An identity attached
/// without a session is taken as already authenticated.
pub struct AuthenticationFilter {
    authenticator: Authenticator<Identity>,
    session_strategy: Arc<dyn SessionAuthenticationStrategy>,
    required: bool,
}

impl AuthenticationFilter {
    /// Authenticate with `authenticator`; anonymous requests pass.
    pub fn new(authenticator: Authenticator<Identity>) -> Self {
        Self {
            authenticator,
            session_strategy: Arc::new(NullSessionStrategy),
            required: false,
        }
    }

    /// Run `strategy` whenever a new authentication succeeds.
    pub fn session_strategy(mut self, strategy: Arc<dyn SessionAuthenticationStrategy>) -> Self {
        self.session_strategy = strategy;
        self
    }

    /// Reject anonymous requests with [`AuthError::Unauthenticated`].
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }
}

#[async_trait]
impl SecurityFilter for AuthenticationFilter {
    fn name(&self) -> &str {
        "authentication"
    }

    async fn do_filter(&self, parts: &mut Parts) -> Result<(), AuthError> {
        let restored = parts.extensions.get::<Session>().is_some();
        let authenticated = parts.extensions.get::<Identity>().is_some();
        if authenticated && !restored {
            return Ok(());
        }

        let Some(identity) = self.authenticator.authenticate(parts).await? else {
            if self.required && !authenticated {
                log::debug!("anonymous request to {} rejected", parts.uri.path());
                return Err(AuthError::Unauthenticated);
            }
            return Ok(());
        };

        let mut session = parts.extensions.remove::<Session>();
        self.session_strategy
            .on_authentication(&identity, parts, &mut session)
            .await?;
        if let Some(session) = session {
            parts.extensions.insert(session);
        }
        parts.extensions.insert(identity);
        Ok(())
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.len() == b.len() && bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{csrf, MockRequest};

    #[tokio::test]
    async fn safe_methods_skip_the_check_but_get_a_token() {
        let filter = CsrfFilter::default();
        let mut parts = MockRequest::get("/").into_parts();

        filter.do_filter(&mut parts).await.unwrap();
        let token = parts.extensions.get::<CsrfToken>().unwrap();
        assert_eq!(token.cookie_name, "XSRF-TOKEN");
        assert_eq!(token.value.len(), 43);
    }

    #[tokio::test]
    async fn ignored_paths_skip_the_check() {
        let filter = CsrfFilter::new(CsrfConfig {
            ignored: vec![RequestMatcher::prefix("/webhooks")],
            ..CsrfConfig::default()
        });
        let mut parts = MockRequest::post("/webhooks/github").into_parts();
        assert!(filter.do_filter(&mut parts).await.is_ok());
    }

    #[tokio::test]
    async fn token_must_match_cookie() {
        let filter = CsrfFilter::default();

        let mut parts = MockRequest::delete("/").with(csrf()).into_parts();
        assert!(filter.do_filter(&mut parts).await.is_ok());

        let mut parts = MockRequest::delete("/").with(csrf().invalid()).into_parts();
        assert!(matches!(
            filter.do_filter(&mut parts).await,
            Err(AuthError::CsrfMismatch)
        ));
    }

    #[test]
    fn compares_tokens_exactly() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
    }
}
