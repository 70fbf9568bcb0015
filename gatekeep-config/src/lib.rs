//! # Gatekeep Config
//!
//! Assembles the request-filtering pipeline from ordered configuration objects.
//!
//! - **[`WebSecurityConfiguration`]**: collects [`WebSecurityConfigurer`]s or prebuilt
//!   [`SecurityFilterChain`]s plus [`WebSecurityCustomizer`]s and builds a [`FilterChainProxy`].
//! - **[`HttpSecurity`]**: the per-chain builder a configurer fills in.
//! - **[`MethodSecurityConfig`]**: the global method-security switches.
//! - **[`testing`]**: request post-processors for exercising a proxy in tests.

#![warn(missing_docs)]

use gatekeep_session::SessionConfig;
use serde::{Deserialize, Serialize};

/// Configuration errors.
pub mod error;
/// Security filters and filter chains.
pub mod filter;
/// Request matchers.
pub mod matcher;
/// Global method-security options.
pub mod method;
/// Request post-processors for tests.
pub mod testing;
/// Web security assembly.
pub mod web;

pub use error::ConfigError;
pub use filter::{
    AuthenticationFilter, CsrfConfig, CsrfFilter, CsrfToken, SecurityFilter, SecurityFilterChain,
    SessionManagementFilter,
};
pub use matcher::RequestMatcher;
pub use method::{AdviceMode, AnnotationFamily, MethodSecurityConfig};
pub use web::{
    FilterChainProxy, HttpSecurity, WebSecurity, WebSecurityConfiguration,
    WebSecurityConfigurer, WebSecurityCustomizer,
};

/// Options of the web security pipeline itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSecurityConfig {
    /// Log every request and the chain that handled it at `info`.
    pub debug: bool,
}

/// Top-level configuration, typically deserialized from a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Web pipeline options.
    pub web: WebSecurityConfig,
    /// Method security switches.
    pub method: MethodSecurityConfig,
    /// Session cookie options.
    pub session: SessionConfig,
}

impl SecurityConfig {
    /// Check the parts that can be inconsistent on their own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.method.any_enabled() {
            self.method.validate()?;
        }
        if self.session.max_age_secs <= 0 {
            return Err(ConfigError::Invalid(
                "session max_age_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
