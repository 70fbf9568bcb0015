use async_trait::async_trait;
use gatekeep_config::testing::{csrf, http_basic, MockRequest};
use gatekeep_config::{FilterChainProxy, HttpSecurity, WebSecurityConfiguration, WebSecurityConfigurer};
use gatekeep_core::strategy::{BasicAuthenticator, BasicStrategy};
use gatekeep_core::{AuthError, Authenticator, Identity};
use http::StatusCode;

struct InMemoryUsers;

#[async_trait]
impl BasicAuthenticator for InMemoryUsers {
    type Identity = Identity;

    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Identity>, AuthError> {
        if username == "user" && password == "password" {
            Ok(Some(Identity::new("basic", "user").with_authority("ROLE_USER")))
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}

struct ShowcaseConfig;

impl WebSecurityConfigurer for ShowcaseConfig {
    fn configure(&self, http: &mut HttpSecurity) {
        http.authenticate_with(
            Authenticator::builder()
                .with_strategy(BasicStrategy::new(InMemoryUsers))
                .build(),
        );
    }
}

fn proxy() -> FilterChainProxy {
    WebSecurityConfiguration::new()
        .configurer(ShowcaseConfig)
        .build()
        .unwrap()
}

/// No handlers are mounted, so a request that clears security is a 404.
async fn dispatch(proxy: &FilterChainProxy, request: MockRequest) -> StatusCode {
    let mut parts = request.into_parts();
    match proxy.filter(&mut parts).await {
        Ok(()) => StatusCode::NOT_FOUND,
        Err(err) => err.status_code(),
    }
}

#[tokio::test]
async fn post_with_csrf_token_passes() {
    let proxy = proxy();
    let status = dispatch(&proxy, MockRequest::post("/").with(csrf())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn put_with_csrf_token_passes() {
    let proxy = proxy();
    let status = dispatch(&proxy, MockRequest::put("/").with(csrf())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn post_without_csrf_token_is_forbidden() {
    let proxy = proxy();
    let status = dispatch(&proxy, MockRequest::post("/")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn post_with_invalid_csrf_token_is_forbidden() {
    let proxy = proxy();
    let status = dispatch(&proxy, MockRequest::post("/").with(csrf().invalid())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn get_needs_no_token() {
    let proxy = proxy();
    let status = dispatch(&proxy, MockRequest::get("/")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn csrf_is_checked_before_credentials() {
    let proxy = proxy();

    let status = dispatch(
        &proxy,
        MockRequest::post("/").with(http_basic("user", "password")),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let status = dispatch(
        &proxy,
        MockRequest::post("/")
            .with(csrf())
            .with(http_basic("user", "wrong")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
