//! # Gatekeep Core
//!
//! `gatekeep-core` provides the foundational traits and types shared by every gatekeep crate.
//! It defines identities, the error type, and the authentication strategies that the
//! web security pipeline chains together.

#![warn(missing_docs)]

use serde::{Deserialize, Serialize};

/// Errors that can occur while securing a request.
pub mod error;
pub use crate::error::AuthError;

/// The authenticated identity shared across strategies, sessions and filters.
pub mod state;
pub use crate::state::Identity;

/// Authentication strategies and the authenticator that chains them.
pub mod strategy;
pub use crate::strategy::{AuthPolicy, AuthenticationStrategy, Authenticator, TokenValidator};

/// Lowest precedence for ordered configuration objects.
///
/// Objects that do not declare an order sort after everything else.
pub const LOWEST_PRECEDENCE: i32 = i32::MAX;

/// Highest precedence for ordered configuration objects.
pub const HIGHEST_PRECEDENCE: i32 = i32::MIN;

/// Controls whether a cookie is sent with cross-site requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    /// The cookie is sent with "safe" cross-site requests (e.g., following a link).
    Lax,
    /// The cookie is only sent for same-site requests.
    Strict,
    /// The cookie is sent with all requests, including cross-site. Requires `Secure`.
    None,
}
