//! Authentication token handling
//!
//! The token is an opaque bearer credential for the artifact host. It is
//! supplied once per run, passed explicitly into the fetcher (no ambient
//! global), transmitted only as an `Authorization` header value, and never
//! written to logs, URLs, or serialized output.

use crate::error::{Error, Result};

/// Environment variable consulted for the API token
pub const TOKEN_ENV_VAR: &str = "CIVITAI_API_TOKEN";

/// Opaque bearer token for the artifact host
///
/// `Debug` and `Display` redact the wrapped value; there is no `Serialize`
/// impl. The only way the secret leaves this type is the crate-private
/// accessor used to build the `Authorization` header.
#[derive(Clone)]
pub struct AuthToken(String);

impl AuthToken {
    /// Validate and wrap a raw token string
    ///
    /// The value is trimmed; it must be non-empty and free of control
    /// characters (it has to survive as an HTTP header value).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidToken`] for empty or unprintable input.
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidToken("token is empty".to_string()));
        }
        if trimmed.chars().any(|c| c.is_control()) {
            return Err(Error::InvalidToken(
                "token contains control characters".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Read the token from environment variable `var`
    ///
    /// Returns `Ok(None)` when the variable is unset or blank, so callers can
    /// fall back to an interactive prompt.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidToken`] when the variable is set but unusable.
    pub fn from_env(var: &str) -> Result<Option<Self>> {
        match std::env::var(var) {
            Ok(value) if !value.trim().is_empty() => Self::new(value).map(Some),
            _ => Ok(None),
        }
    }

    /// Expose the secret for header construction
    pub(crate) fn reveal(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

impl std::fmt::Display for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("***")
    }
}
