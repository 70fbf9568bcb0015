//! Build request parts for exercising a [`FilterChainProxy`](crate::FilterChainProxy)
//! without a web server.
//!
//! ```
//! use gatekeep_config::testing::{csrf, MockRequest};
//!
//! let parts = MockRequest::post("/transfer").with(csrf()).into_parts();
//! assert!(parts.headers.contains_key("x-xsrf-token"));
//! ```

use crate::filter::{CsrfConfig, CsrfToken};
use base64::Engine;
use gatekeep_core::Identity;
use http::header::{AUTHORIZATION, COOKIE};
use http::request::Parts;
use http::{Extensions, HeaderMap, HeaderName, HeaderValue, Method, Request, Uri};

/// Modifies a [`MockRequest`] before it is dispatched.
pub trait RequestPostProcessor {
    /// Apply the modification.
    fn post_process(&self, request: MockRequest) -> MockRequest;
}

/// A request under construction.
#[derive(Debug)]
pub struct MockRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    extensions: Extensions,
}

impl MockRequest {
    /// Start a request.
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            extensions: Extensions::new(),
        }
    }

    /// `GET path`.
    pub fn get(path: &'static str) -> Self {
        Self::new(Method::GET, Uri::from_static(path))
    }

    /// `POST path`.
    pub fn post(path: &'static str) -> Self {
        Self::new(Method::POST, Uri::from_static(path))
    }

    /// `PUT path`.
    pub fn put(path: &'static str) -> Self {
        Self::new(Method::PUT, Uri::from_static(path))
    }

    /// `DELETE path`.
    pub fn delete(path: &'static str) -> Self {
        Self::new(Method::DELETE, Uri::from_static(path))
    }

    /// Append a header. Invalid names or values are skipped with a warning.
    pub fn header<K, V>(mut self, name: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        V: TryInto<HeaderValue>,
    {
        match (name.try_into(), value.try_into()) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => log::warn!("skipping invalid header on mock request"),
        }
        self
    }

    /// Attach a value to the request extensions.
    pub fn extension<T>(mut self, value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        self.extensions.insert(value);
        self
    }

    /// Apply a post-processor.
    pub fn with<P: RequestPostProcessor>(self, processor: P) -> Self {
        processor.post_process(self)
    }

    /// Finish the request.
    pub fn into_parts(self) -> Parts {
        let mut request = Request::new(());
        *request.method_mut() = self.method;
        *request.uri_mut() = self.uri;
        *request.headers_mut() = self.headers;
        *request.extensions_mut() = self.extensions;
        request.into_parts().0
    }
}

/// Adds a CSRF cookie and the matching header.
#[derive(Debug, Clone)]
pub struct CsrfPostProcessor {
    config: CsrfConfig,
    invalid: bool,
}

impl CsrfPostProcessor {
    /// Send a header that does not match the cookie.
    pub fn invalid(mut self) -> Self {
        self.invalid = true;
        self
    }

    /// Use custom cookie and header names.
    pub fn config(mut self, config: CsrfConfig) -> Self {
        self.config = config;
        self
    }
}

impl RequestPostProcessor for CsrfPostProcessor {
    fn post_process(&self, request: MockRequest) -> MockRequest {
        let token = CsrfToken::generate(self.config.cookie_name.as_str());
        let header = if self.invalid {
            format!("{}-invalid", token.value)
        } else {
            token.value.clone()
        };
        request
            .header(COOKIE, format!("{}={}", token.cookie_name, token.value))
            .header(self.config.header_name.as_str(), header)
    }
}

/// A valid CSRF cookie/header pair.
pub fn csrf() -> CsrfPostProcessor {
    CsrfPostProcessor {
        config: CsrfConfig::default(),
        invalid: false,
    }
}

/// Marks the request as already authenticated.
#[derive(Debug, Clone)]
pub struct IdentityPostProcessor(Identity);

impl RequestPostProcessor for IdentityPostProcessor {
    fn post_process(&self, request: MockRequest) -> MockRequest {
        request.extension(self.0.clone())
    }
}

/// Run the request as `identity`.
pub fn with_identity(identity: Identity) -> IdentityPostProcessor {
    IdentityPostProcessor(identity)
}

/// Adds an HTTP Basic `Authorization` header.
#[derive(Debug, Clone)]
pub struct HttpBasicPostProcessor {
    username: String,
    password: String,
}

impl RequestPostProcessor for HttpBasicPostProcessor {
    fn post_process(&self, request: MockRequest) -> MockRequest {
        let credentials = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", self.username, self.password));
        request.header(AUTHORIZATION, format!("Basic {credentials}"))
    }
}

/// Authenticate with HTTP Basic credentials.
pub fn http_basic(username: impl Into<String>, password: impl Into<String>) -> HttpBasicPostProcessor {
    HttpBasicPostProcessor {
        username: username.into(),
        password: password.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatekeep_core::strategy::utils;

    #[test]
    fn csrf_sets_cookie_and_header() {
        let parts = MockRequest::post("/").with(csrf()).into_parts();
        let cookie = utils::extract_cookie(&parts.headers, "XSRF-TOKEN").unwrap();
        assert_eq!(parts.headers["x-xsrf-token"], cookie);
    }

    #[test]
    fn invalid_csrf_differs() {
        let parts = MockRequest::post("/").with(csrf().invalid()).into_parts();
        let cookie = utils::extract_cookie(&parts.headers, "XSRF-TOKEN").unwrap();
        assert_ne!(parts.headers["x-xsrf-token"], cookie);
    }

    #[test]
    fn http_basic_is_readable() {
        let parts = MockRequest::get("/")
            .with(http_basic("user", "password"))
            .into_parts();
        assert_eq!(
            utils::extract_basic_credentials(&parts.headers),
            Some(("user".to_string(), "password".to_string()))
        );
    }

    #[test]
    fn identity_lands_in_extensions() {
        let parts = MockRequest::get("/")
            .with(with_identity(Identity::new("test", "alice")))
            .into_parts();
        assert_eq!(
            parts.extensions.get::<Identity>().map(Identity::principal),
            Some("test:alice".to_string())
        );
    }
}
