use gatekeep_core::AuthError;
use thiserror::Error;

/// Errors raised while resolving or validating issuer metadata.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The issuer is not an absolute, hierarchical URI. No request was made.
    #[error("Invalid issuer \"{issuer}\": {reason}")]
    InvalidIssuer { issuer: String, reason: String },

    /// A candidate answered successfully but its document has no `jwks_uri`.
    #[error("The public JWK set URI must not be null")]
    MissingJwksUri,

    /// Every candidate answered with a client error, or a request failed outright.
    #[error("Unable to resolve the Configuration with the provided Issuer of \"{issuer}\"")]
    Unresolved {
        issuer: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The document was fetched but names a different issuer.
    #[error("The Issuer \"{actual}\" provided in the configuration did not match the requested issuer \"{expected}\"")]
    IssuerMismatch { actual: String, expected: String },
}

impl DiscoveryError {
    pub(crate) fn unresolved(issuer: &str, source: Option<reqwest::Error>) -> Self {
        DiscoveryError::Unresolved {
            issuer: issuer.to_string(),
            source,
        }
    }

    /// Whether this is a configuration problem on the authorization server side,
    /// as opposed to a bad argument supplied by the caller.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            DiscoveryError::Unresolved { .. } | DiscoveryError::IssuerMismatch { .. }
        )
    }
}

impl From<DiscoveryError> for AuthError {
    fn from(err: DiscoveryError) -> Self {
        AuthError::Configuration(err.to_string())
    }
}
