use gatekeep_core::AuthError;
use thiserror::Error;

/// Errors raised while assembling the security configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Configurers and prebuilt filter chains were both supplied.
    #[error("Found WebSecurityConfigurer as well as SecurityFilterChain. Please select just one.")]
    ConflictingSources,
    /// Two configurers declared the same order.
    #[error("Order on WebSecurityConfigurers must be unique. Order of {order} was already used on {previous}, so it cannot be used on {current} too.")]
    DuplicateOrder {
        /// The shared order value.
        order: i32,
        /// Name of the configurer that claimed it first.
        previous: String,
        /// Name of the configurer that claimed it again.
        current: String,
    },
    /// An option value is inconsistent.
    #[error("Invalid security configuration: {0}")]
    Invalid(String),
}

impl From<ConfigError> for AuthError {
    fn from(err: ConfigError) -> Self {
        AuthError::Configuration(err.to_string())
    }
}
