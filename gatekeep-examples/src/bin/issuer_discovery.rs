//! Resolve an issuer's metadata and protect `/api` with JWTs signed by it.
//!
//! ```text
//! GATEKEEP_ISSUER=https://idp.example.com/realms/main \
//! GATEKEEP_TOKEN=eyJ... \
//!     cargo run --bin issuer_discovery
//! ```

use gatekeep::config::testing::MockRequest;
use gatekeep::config::{HttpSecurity, RequestMatcher, WebSecurityConfiguration};
use gatekeep::oidc::candidate_endpoints;
use gatekeep::{Authenticator, Identity, IssuerMetadataResolver, JwtStrategy, JwtValidator};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let issuer = std::env::var("GATEKEEP_ISSUER")?;

    println!("Metadata locations for {issuer}:");
    for endpoint in candidate_endpoints(&issuer)? {
        println!("  {endpoint}");
    }

    let metadata = IssuerMetadataResolver::new().resolve_issuer(&issuer).await?;
    println!("Resolved issuer {}", metadata.display_issuer());
    if let Ok(provider) = metadata.provider_metadata() {
        println!("  jwks_uri: {}", provider.jwks_uri);
        if let Some(token_endpoint) = provider.token_endpoint {
            println!("  token_endpoint: {token_endpoint}");
        }
    }

    let validator = JwtValidator::from_issuer_location(&issuer).await?;
    println!("Validating tokens against {}", validator.jwks_uri());

    let mut http = HttpSecurity::new();
    http.security_matcher(RequestMatcher::prefix("/api"))
        .disable_csrf()
        .authenticate_with(
            Authenticator::builder()
                .with_strategy(JwtStrategy::new(validator))
                .build(),
        )
        .require_authentication(true);
    let proxy = WebSecurityConfiguration::new()
        .filter_chain(http.build())
        .build()?;

    let mut request = MockRequest::get("/api/me");
    if let Ok(token) = std::env::var("GATEKEEP_TOKEN") {
        request = request.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let mut parts = request.into_parts();

    match proxy.filter(&mut parts).await {
        Ok(()) => match parts.extensions.get::<Identity>() {
            Some(identity) => println!(
                "GET /api/me authenticated as {} {:?}",
                identity.principal(),
                identity.authorities
            ),
            None => println!("GET /api/me passed anonymously"),
        },
        Err(err) => println!("GET /api/me rejected with {}: {err}", err.status_code()),
    }

    Ok(())
}
