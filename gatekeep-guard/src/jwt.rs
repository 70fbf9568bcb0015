use async_trait::async_trait;
use gatekeep_core::{AuthError, Identity, TokenValidator};
use gatekeep_oidc::{validate_issuer, DiscoveryError, IssuerMetadata, IssuerMetadataResolver};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors that can occur during JWT validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Key not found in JWKS")]
    KeyNotFound,
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// `aud` may be a single string or an array.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Many(Vec<String>),
}

/// Registered claims plus the OAuth2 `scope` claim.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Claims {
    pub iss: Option<String>,
    pub sub: Option<String>,
    pub aud: Option<Audience>,
    pub exp: Option<u64>,
    pub nbf: Option<u64>,
    pub iat: Option<u64>,
    pub jti: Option<String>,
    pub scope: Option<String>,
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        let mut identity = Identity::new(
            claims.iss.unwrap_or_else(|| "jwt".to_string()),
            claims.sub.unwrap_or_default(),
        );
        identity.authorities = claims
            .scope
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(|s| format!("SCOPE_{s}"))
            .collect();
        if let Some(jti) = claims.jti {
            identity.attributes.insert("jti".to_string(), jti);
        }
        identity
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    pub kid: Option<String>,
    pub kty: String,
    pub alg: Option<String>,
    pub n: Option<String>,
    pub e: Option<String>,
    pub crv: Option<String>,
    pub x: Option<String>,
    pub y: Option<String>,
}

impl Jwk {
    pub fn to_decoding_key(&self) -> Result<DecodingKey, ValidationError> {
        match self.kty.as_str() {
            "RSA" => Ok(DecodingKey::from_rsa_components(
                component(&self.n, "n")?,
                component(&self.e, "e")?,
            )?),
            "EC" => Ok(DecodingKey::from_ec_components(
                component(&self.x, "x")?,
                component(&self.y, "y")?,
            )?),
            other => Err(ValidationError::Validation(format!(
                "Unsupported key type '{other}'"
            ))),
        }
    }
}

fn component<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, ValidationError> {
    value
        .as_deref()
        .ok_or_else(|| ValidationError::Validation(format!("Missing '{name}' component in JWK")))
}

#[derive(Debug, Clone, Deserialize)]
pub struct Jwks {
    pub keys: Vec<Jwk>,
}

impl Jwks {
    pub async fn fetch(jwks_uri: &str, client: &reqwest::Client) -> Result<Self, ValidationError> {
        let jwks = client
            .get(jwks_uri)
            .send()
            .await?
            .error_for_status()?
            .json::<Jwks>()
            .await?;
        Ok(jwks)
    }

    pub fn find_key(&self, kid: Option<&str>) -> Option<&Jwk> {
        match kid {
            Some(id) => self.keys.iter().find(|k| k.kid.as_deref() == Some(id)),
            None => self.keys.first(),
        }
    }
}

/// Caches the key set behind a `jwks_uri` for a fixed time.
///
/// A token naming an unknown `kid` triggers a refetch, at most once per
/// `min_refresh_interval`.
pub struct JwksCache {
    jwks_uri: String,
    http_client: reqwest::Client,
    jwks: RwLock<Option<(Jwks, Instant)>>,
    ttl: Duration,
    min_refresh_interval: Duration,
}

impl JwksCache {
    /// Cache the keys at `jwks_uri`, refetching them once `ttl` has passed.
    pub fn new(jwks_uri: impl Into<String>, http_client: reqwest::Client, ttl: Duration) -> Self {
        Self {
            jwks_uri: jwks_uri.into(),
            http_client,
            jwks: RwLock::new(None),
            ttl,
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
        }
    }

    /// Shortest gap between two fetches caused by unknown key ids.
    pub fn min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    /// Where the keys are fetched from.
    pub fn jwks_uri(&self) -> &str {
        &self.jwks_uri
    }

    /// The cached key set, fetched when missing or stale.
    pub async fn get_jwks(&self) -> Result<Jwks, ValidationError> {
        let cached = self
            .jwks
            .read()
            .await
            .as_ref()
            .filter(|(_, fetched_at)| fetched_at.elapsed() < self.ttl)
            .map(|(jwks, _)| jwks.clone());

        match cached {
            Some(jwks) => Ok(jwks),
            None => self.refresh().await,
        }
    }

    /// The key for `kid`. An unknown `kid` refetches the set unless it was fetched
    /// within the last `min_refresh_interval`.
    pub async fn get_key(&self, kid: Option<&str>) -> Result<Option<Jwk>, ValidationError> {
        if let Some(key) = self.get_jwks().await?.find_key(kid) {
            return Ok(Some(key.clone()));
        }

        // the provider may have rotated its keys
        let mut slot = self.jwks.write().await;
        if let Some((jwks, fetched_at)) = slot.as_ref() {
            if fetched_at.elapsed() < self.min_refresh_interval {
                log::debug!("key {:?} not in JWKS, fetched too recently to refresh", kid);
                return Ok(jwks.find_key(kid).cloned());
            }
        }
        log::debug!("key {:?} not in cached JWKS, refreshing {}", kid, self.jwks_uri);
        let fresh = Jwks::fetch(&self.jwks_uri, &self.http_client).await?;
        let key = fresh.find_key(kid).cloned();
        *slot = Some((fresh, Instant::now()));
        Ok(key)
    }

    /// Refetch the key set unconditionally.
    pub async fn refresh(&self) -> Result<Jwks, ValidationError> {
        let mut slot = self.jwks.write().await;
        let fresh = Jwks::fetch(&self.jwks_uri, &self.http_client).await?;
        *slot = Some((fresh.clone(), Instant::now()));
        Ok(fresh)
    }
}

const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Configures a [`JwtValidator`].
pub struct JwtValidatorBuilder {
    jwks_uri: String,
    http_client: reqwest::Client,
    refresh_interval: Duration,
    min_refresh_interval: Duration,
    issuer: Option<String>,
    audience: Option<String>,
    algorithms: Vec<Algorithm>,
    leeway: u64,
}

impl JwtValidatorBuilder {
    /// Start from a known JWKS URI.
    pub fn new(jwks_uri: impl Into<String>) -> Self {
        Self {
            jwks_uri: jwks_uri.into(),
            http_client: reqwest::Client::new(),
            refresh_interval: Duration::from_secs(3600),
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
            issuer: None,
            audience: None,
            algorithms: vec![Algorithm::RS256],
            leeway: 60,
        }
    }

    /// Start from an issuer, trying the OpenID Connect, RFC 8414 and OAuth
    /// metadata locations. The issuer becomes the required `iss` claim.
    pub async fn from_issuer_location(
        resolver: &IssuerMetadataResolver,
        issuer: &str,
    ) -> Result<Self, ValidationError> {
        let metadata = resolver.resolve_issuer(issuer).await?;
        Self::from_metadata(resolver, &metadata, issuer)
    }

    /// Like [`Self::from_issuer_location`] but only the OpenID Connect location is tried.
    pub async fn from_oidc_issuer_location(
        resolver: &IssuerMetadataResolver,
        issuer: &str,
    ) -> Result<Self, ValidationError> {
        let metadata = resolver.resolve_oidc_issuer(issuer).await?;
        Self::from_metadata(resolver, &metadata, issuer)
    }

    fn from_metadata(
        resolver: &IssuerMetadataResolver,
        metadata: &IssuerMetadata,
        issuer: &str,
    ) -> Result<Self, ValidationError> {
        validate_issuer(metadata, issuer)?;
        let jwks_uri = metadata
            .jwks_uri()
            .ok_or_else(|| ValidationError::Validation("jwks_uri is not a string".to_string()))?;
        Ok(Self::new(jwks_uri)
            .http_client(resolver.client().clone())
            .issuer(issuer))
    }

    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = client;
        self
    }

    /// Set the refresh interval for the JWKS cache.
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Shortest gap between refetches caused by unknown key ids. Defaults to 30 seconds.
    pub fn min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Set the allowed signature algorithms. An empty list keeps the current one.
    pub fn algorithms(mut self, algorithms: Vec<Algorithm>) -> Self {
        if !algorithms.is_empty() {
            self.algorithms = algorithms;
        }
        self
    }

    /// Clock skew tolerated on `exp` and `nbf`, in seconds.
    pub fn leeway(mut self, seconds: u64) -> Self {
        self.leeway = seconds;
        self
    }

    /// Finish the validator. `C` is the claims type tokens decode into.
    pub fn build<C>(self) -> JwtValidator<C> {
        let cache = JwksCache::new(self.jwks_uri, self.http_client, self.refresh_interval)
            .min_refresh_interval(self.min_refresh_interval);
        let mut validation = Validation::default();
        validation.algorithms = self.algorithms;
        validation.leeway = self.leeway;

        if let Some(iss) = &self.issuer {
            validation.set_issuer(&[iss]);
        }

        match &self.audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        JwtValidator {
            cache,
            validation,
            _marker: PhantomData,
        }
    }
}

/// Validates JWTs against the keys of one issuer.
///
/// `C` is the claims type decoded from the token; it must convert into an
/// [`Identity`] to be used as a bearer strategy.
pub struct JwtValidator<C = Claims> {
    cache: JwksCache,
    validation: Validation,
    _marker: PhantomData<C>,
}

impl JwtValidator<Claims> {
    /// Resolve `issuer` through every well-known location and build a validator for it.
    pub async fn from_issuer_location(issuer: &str) -> Result<Self, ValidationError> {
        let resolver = IssuerMetadataResolver::new();
        Ok(JwtValidatorBuilder::from_issuer_location(&resolver, issuer)
            .await?
            .build())
    }

    /// Resolve `issuer` through the OpenID Connect location only and build a validator for it.
    pub async fn from_oidc_issuer_location(issuer: &str) -> Result<Self, ValidationError> {
        let resolver = IssuerMetadataResolver::new();
        Ok(JwtValidatorBuilder::from_oidc_issuer_location(&resolver, issuer)
            .await?
            .build())
    }
}

impl<C> JwtValidator<C> {
    pub fn jwks_uri(&self) -> &str {
        self.cache.jwks_uri()
    }

    /// The issuer every token must carry, if one was configured.
    pub fn required_issuer(&self) -> Option<&str> {
        self.validation
            .iss
            .as_ref()
            .and_then(|set| set.iter().next())
            .map(String::as_str)
    }

    /// Decode and verify `token`.
    pub async fn decode_claims(&self, token: &str) -> Result<C, ValidationError>
    where
        C: DeserializeOwned,
    {
        let header = decode_header(token)?;
        if !self.validation.algorithms.contains(&header.alg) {
            return Err(ValidationError::InvalidToken(format!(
                "algorithm {:?} is not allowed",
                header.alg
            )));
        }

        let jwk = self
            .cache
            .get_key(header.kid.as_deref())
            .await?
            .ok_or(ValidationError::KeyNotFound)?;
        let decoding_key = jwk.to_decoding_key()?;

        // a key only verifies its own family, so narrow to the header's algorithm
        let mut validation = self.validation.clone();
        validation.algorithms = vec![header.alg];

        Ok(decode::<C>(token, &decoding_key, &validation)?.claims)
    }
}

#[async_trait]
impl<C> TokenValidator for JwtValidator<C>
where
    C: DeserializeOwned + Into<Identity> + Send + Sync + 'static,
{
    type Identity = Identity;

    async fn validate(&self, token: &str) -> Result<Option<Identity>, AuthError> {
        match self.decode_claims(token).await {
            Ok(claims) => Ok(Some(claims.into())),
            Err(ValidationError::InvalidToken(reason)) => {
                log::debug!("rejected bearer token: {}", reason);
                Ok(None)
            }
            Err(ValidationError::Jwt(e)) => {
                log::debug!("rejected bearer token: {}", e);
                Ok(None)
            }
            Err(e) => Err(AuthError::Token(e.to_string())),
        }
    }
}
