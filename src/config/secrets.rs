//! Secret handling utilities.
//!
//! Re-exports secrecy types and exposes an optional secret as a plain
//! string slice for connection setup.

pub use secrecy::{ExposeSecret, SecretBox, SecretString};

/// Borrow the inner value of an optional secret.
pub fn expose_optional(secret: &Option<SecretString>) -> Option<&str> {
    secret.as_ref().map(|s| s.expose_secret())
}
