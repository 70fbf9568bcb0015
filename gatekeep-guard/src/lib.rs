//! # Gatekeep Guard
//!
//! Bearer-token validation for resource servers. A [`jwt::JwtValidator`] can be
//! configured straight from an issuer location: the issuer metadata is resolved,
//! the declared issuer is checked, and the signing keys are loaded from the
//! advertised `jwks_uri`.

pub mod jwt;

pub use jwt::{Claims, JwksCache, JwtValidator, JwtValidatorBuilder, ValidationError};

/// Bearer strategy backed by a [`JwtValidator`].
pub type JwtStrategy<C = Claims> =
    gatekeep_core::strategy::TokenStrategy<JwtValidator<C>, gatekeep_core::Identity>;
