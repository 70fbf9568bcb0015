//! # Gatekeep
//!
//! Umbrella crate for the gatekeep workspace. Each piece sits behind a feature:
//!
//! | feature   | crate              | provides                                          |
//! |-----------|--------------------|---------------------------------------------------|
//! | (always)  | `gatekeep-core`    | [`Identity`], [`AuthError`], strategies           |
//! | `oidc`    | `gatekeep-oidc`    | issuer metadata discovery                         |
//! | `guard`   | `gatekeep-guard`   | JWT validation bootstrapped from an issuer        |
//! | `session` | `gatekeep-session` | sessions and session authentication strategies    |
//! | `config`  | `gatekeep-config`  | filter chains, CSRF, method-security options      |
//!
//! `full` enables everything.

pub use gatekeep_core::{
    AuthError, AuthPolicy, AuthenticationStrategy, Authenticator, Identity, TokenValidator,
};

#[cfg(feature = "oidc")]
pub use gatekeep_oidc as oidc;
#[cfg(feature = "oidc")]
pub use gatekeep_oidc::{DiscoveryError, IssuerMetadata, IssuerMetadataResolver};

#[cfg(feature = "guard")]
pub use gatekeep_guard as guard;
#[cfg(feature = "guard")]
pub use gatekeep_guard::{JwtStrategy, JwtValidator};

#[cfg(feature = "session")]
pub use gatekeep_session as session;

#[cfg(feature = "config")]
pub use gatekeep_config as config;
#[cfg(feature = "config")]
pub use gatekeep_config::{FilterChainProxy, SecurityConfig, WebSecurityConfiguration};
