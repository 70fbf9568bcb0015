use crate::error::DiscoveryError;
use crate::metadata::IssuerMetadata;
use reqwest::header::ACCEPT;
use serde_json::{Map, Value};
use url::Url;

const OIDC_METADATA_PATH: &str = "/.well-known/openid-configuration";
const OAUTH_METADATA_PATH: &str = "/.well-known/oauth-authorization-server";

/// The well-known metadata locations derived from an issuer, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WellKnown {
    /// `{issuer}/.well-known/openid-configuration`
    Oidc,
    /// `/.well-known/openid-configuration{issuer-path}`
    OidcRfc8414,
    /// `/.well-known/oauth-authorization-server{issuer-path}`
    OAuth,
}

impl WellKnown {
    /// All locations, highest priority first.
    pub const ALL: [WellKnown; 3] = [WellKnown::Oidc, WellKnown::OidcRfc8414, WellKnown::OAuth];

    /// Build the endpoint for `issuer`. Only the path changes; the query is kept.
    pub fn endpoint(self, issuer: &Url) -> Url {
        let issuer_path = issuer.path().trim_end_matches('/');
        let path = match self {
            WellKnown::Oidc => format!("{issuer_path}{OIDC_METADATA_PATH}"),
            WellKnown::OidcRfc8414 => format!("{OIDC_METADATA_PATH}{issuer_path}"),
            WellKnown::OAuth => format!("{OAUTH_METADATA_PATH}{issuer_path}"),
        };
        let mut endpoint = issuer.clone();
        endpoint.set_path(&path);
        endpoint.set_fragment(None);
        endpoint
    }
}

/// Derive every candidate endpoint for `issuer`, highest priority first.
pub fn candidate_endpoints(issuer: &str) -> Result<Vec<Url>, DiscoveryError> {
    let uri = parse_issuer(issuer)?;
    Ok(WellKnown::ALL.iter().map(|w| w.endpoint(&uri)).collect())
}

/// Check that the metadata was published by the issuer that was asked for.
///
/// A non-string `issuer` is compared in its JSON text form.
pub fn validate_issuer(metadata: &IssuerMetadata, issuer: &str) -> Result<(), DiscoveryError> {
    let actual = metadata.display_issuer();
    let declared = !matches!(metadata.as_map().get("issuer"), None | Some(Value::Null));
    if declared && actual == issuer {
        return Ok(());
    }
    Err(DiscoveryError::IssuerMismatch {
        actual,
        expected: issuer.to_string(),
    })
}

fn parse_issuer(issuer: &str) -> Result<Url, DiscoveryError> {
    let invalid = |reason: String| DiscoveryError::InvalidIssuer {
        issuer: issuer.to_string(),
        reason,
    };
    let uri = Url::parse(issuer).map_err(|e| invalid(e.to_string()))?;
    if uri.cannot_be_a_base() {
        return Err(invalid("issuer must be a hierarchical URI".to_string()));
    }
    Ok(uri)
}

/// Fetches authorization server metadata for an issuer.
///
/// The resolver is stateless apart from the HTTP client, so one instance can be
/// shared for any number of resolutions.
#[derive(Debug, Clone, Default)]
pub struct IssuerMetadataResolver {
    client: reqwest::Client,
}

impl IssuerMetadataResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client (timeouts, proxies, TLS roots).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Resolve metadata from the OpenID Connect location only.
    pub async fn resolve_oidc_issuer(&self, issuer: &str) -> Result<IssuerMetadata, DiscoveryError> {
        let uri = parse_issuer(issuer)?;
        self.fetch_first(issuer, &[WellKnown::Oidc.endpoint(&uri)])
            .await
    }

    /// Resolve metadata trying the OpenID Connect, RFC 8414 and OAuth locations in turn.
    ///
    /// A 4xx answer moves on to the next location. Any other failure ends the
    /// resolution immediately.
    pub async fn resolve_issuer(&self, issuer: &str) -> Result<IssuerMetadata, DiscoveryError> {
        let candidates = candidate_endpoints(issuer)?;
        self.fetch_first(issuer, &candidates).await
    }

    async fn fetch_first(
        &self,
        issuer: &str,
        candidates: &[Url],
    ) -> Result<IssuerMetadata, DiscoveryError> {
        for candidate in candidates {
            log::debug!("requesting issuer metadata from {}", candidate);
            let response = self
                .client
                .get(candidate.clone())
                .header(ACCEPT, "application/json")
                .send()
                .await
                .map_err(|e| DiscoveryError::unresolved(issuer, Some(e)))?;

            if response.status().is_client_error() {
                log::debug!(
                    "{} answered {}, trying next location",
                    candidate,
                    response.status()
                );
                continue;
            }

            let document = response
                .error_for_status()
                .map_err(|e| DiscoveryError::unresolved(issuer, Some(e)))?
                .json::<Map<String, Value>>()
                .await
                .map_err(|e| DiscoveryError::unresolved(issuer, Some(e)))?;

            let metadata = IssuerMetadata::from(document);
            if !metadata.has_jwks_uri() {
                return Err(DiscoveryError::MissingJwksUri);
            }
            return Ok(metadata);
        }

        log::warn!("no metadata location answered for issuer {}", issuer);
        Err(DiscoveryError::unresolved(issuer, None))
    }
}
