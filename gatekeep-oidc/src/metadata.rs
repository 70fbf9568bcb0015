use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const UNAVAILABLE: &str = "(unavailable)";

/// Raw authorization server metadata, exactly as the server returned it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssuerMetadata(Map<String, Value>);

impl IssuerMetadata {
    /// Look up any metadata field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The declared `issuer`, if it is a string.
    pub fn issuer(&self) -> Option<&str> {
        self.0.get("issuer").and_then(Value::as_str)
    }

    /// The `jwks_uri`, if it is a string.
    pub fn jwks_uri(&self) -> Option<&str> {
        self.0.get("jwks_uri").and_then(Value::as_str)
    }

    /// Whether `jwks_uri` is present and not JSON `null`.
    pub fn has_jwks_uri(&self) -> bool {
        self.0.get("jwks_uri").is_some_and(|v| !v.is_null())
    }

    /// The declared issuer for messages; `(unavailable)` when absent.
    pub fn display_issuer(&self) -> String {
        match self.0.get("issuer") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => UNAVAILABLE.to_string(),
            Some(other) => other.to_string(),
        }
    }

    /// Convert into the typed view of the well-known fields.
    pub fn provider_metadata(&self) -> Result<ProviderMetadata, serde_json::Error> {
        serde_json::from_value(Value::Object(self.0.clone()))
    }

    /// Borrow the underlying map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Take the underlying map.
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for IssuerMetadata {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Typed view of the fields shared by OpenID Provider Metadata and
/// RFC 8414 Authorization Server Metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    pub issuer: String,
    pub jwks_uri: String,
    pub authorization_endpoint: Option<String>,
    pub token_endpoint: Option<String>,
    pub userinfo_endpoint: Option<String>,
    pub revocation_endpoint: Option<String>,
    pub introspection_endpoint: Option<String>,
    pub scopes_supported: Option<Vec<String>>,
    pub response_types_supported: Option<Vec<String>>,
    pub grant_types_supported: Option<Vec<String>>,
    pub id_token_signing_alg_values_supported: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata(value: Value) -> IssuerMetadata {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn display_issuer_falls_back_to_unavailable() {
        assert_eq!(metadata(json!({})).display_issuer(), "(unavailable)");
        assert_eq!(
            metadata(json!({ "issuer": null })).display_issuer(),
            "(unavailable)"
        );
        assert_eq!(
            metadata(json!({ "issuer": "https://idp" })).display_issuer(),
            "https://idp"
        );
    }

    #[test]
    fn null_jwks_uri_counts_as_missing() {
        assert!(!metadata(json!({ "jwks_uri": null })).has_jwks_uri());
        assert!(metadata(json!({ "jwks_uri": "https://idp/jwks" })).has_jwks_uri());
    }

    #[test]
    fn typed_view_tolerates_oauth_only_documents() {
        let typed = metadata(json!({
            "issuer": "https://idp",
            "jwks_uri": "https://idp/jwks",
            "token_endpoint": "https://idp/token",
            "grant_types_supported": ["client_credentials"],
        }))
        .provider_metadata()
        .unwrap();

        assert_eq!(typed.token_endpoint.as_deref(), Some("https://idp/token"));
        assert!(typed.authorization_endpoint.is_none());
    }
}
