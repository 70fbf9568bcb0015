use http::StatusCode;

/// The error type surfaced by strategies, filters and session handling.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Credentials were presented but rejected.
    #[error("Invalid credentials")]
    InvalidCredentials,
    /// The request requires authentication and none succeeded.
    #[error("Full authentication is required to access this resource")]
    Unauthenticated,
    /// The request was authenticated but is not allowed.
    #[error("Access denied: {0}")]
    Forbidden(String),
    /// The CSRF token was missing or did not match.
    #[error("Invalid CSRF token")]
    CsrfMismatch,
    /// A session could not be created, loaded or was rejected.
    #[error("Session error: {0}")]
    Session(String),
    /// A bearer token could not be validated.
    #[error("Token error: {0}")]
    Token(String),
    /// The security setup itself is broken (discovery, filter chains, ...).
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl AuthError {
    /// HTTP status a web adapter should answer with for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials
            | AuthError::Unauthenticated
            | AuthError::Session(_)
            | AuthError::Token(_) => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden(_) | AuthError::CsrfMismatch => StatusCode::FORBIDDEN,
            AuthError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
