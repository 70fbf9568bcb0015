use gatekeep_core::AuthError;
use thiserror::Error;

/// Raised when a new authentication is not allowed for the session.
#[derive(Debug, Error)]
pub enum SessionAuthenticationError {
    /// The principal already holds the maximum number of sessions.
    #[error("Maximum sessions of {max} for this principal exceeded")]
    MaximumSessionsExceeded {
        /// Principal key, see [`gatekeep_core::Identity::principal`].
        principal: String,
        /// Configured limit.
        max: i32,
    },
    /// The session store failed.
    #[error("Session store error: {0}")]
    Store(#[from] AuthError),
}

impl From<SessionAuthenticationError> for AuthError {
    fn from(err: SessionAuthenticationError) -> Self {
        match err {
            SessionAuthenticationError::Store(inner) => inner,
            other => AuthError::Session(other.to_string()),
        }
    }
}
