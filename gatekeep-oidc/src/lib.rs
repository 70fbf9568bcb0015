//! # Gatekeep OIDC
//!
//! Resolves the metadata document of an OpenID Connect provider or OAuth 2.0
//! authorization server from its issuer identifier.
//!
//! Three well-known locations are tried in a fixed order:
//!
//! 1. `{issuer}/.well-known/openid-configuration` (OpenID Connect Discovery 1.0)
//! 2. `/.well-known/openid-configuration{issuer-path}` (RFC 8414 compatibility form)
//! 3. `/.well-known/oauth-authorization-server{issuer-path}` (RFC 8414)
//!
//! ```no_run
//! use gatekeep_oidc::{validate_issuer, IssuerMetadataResolver};
//!
//! # async fn example() -> Result<(), gatekeep_oidc::DiscoveryError> {
//! let resolver = IssuerMetadataResolver::new();
//! let issuer = "https://idp.example.com/realms/main";
//! let metadata = resolver.resolve_issuer(issuer).await?;
//! validate_issuer(&metadata, issuer)?;
//! println!("keys live at {:?}", metadata.jwks_uri());
//! # Ok(())
//! # }
//! ```

pub mod discovery;
pub mod error;
pub mod metadata;

pub use discovery::{candidate_endpoints, validate_issuer, IssuerMetadataResolver, WellKnown};
pub use error::DiscoveryError;
pub use metadata::{IssuerMetadata, ProviderMetadata};
