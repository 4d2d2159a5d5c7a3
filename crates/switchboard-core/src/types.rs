//! Validated domain types.

use crate::error::{GatewayError, GatewayResult};
use serde::Serialize;
use std::fmt;

/// Normalized provider identifier.
///
/// Identifiers are trimmed and lowercased on construction, so the registry
/// can never hold two entries differing only by case or surrounding
/// whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    /// Create a normalized provider identifier.
    ///
    /// # Errors
    /// Returns a validation error if the identifier is empty after trimming.
    pub fn new(raw: &str) -> GatewayResult<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        if normalized.is_empty() {
            return Err(GatewayError::validation(
                "provider identifier cannot be empty",
                Some("provider".to_string()),
            ));
        }
        Ok(Self(normalized))
    }

    /// The normalized identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the identifier, yielding the normalized string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProviderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
