//! Error types for the gateway.
//!
//! One taxonomy covers configuration faults, readiness, soft not-found
//! conversions, upstream provider failures, and key-store failures.

use thiserror::Error;

/// Result alias used throughout the gateway.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Unified gateway error type.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Invalid configuration at construction or registration time.
    #[error("configuration error: {message}")]
    Configuration {
        /// What was wrong with the configuration.
        message: String,
    },

    /// A call-path operation was invoked before any provider became active.
    #[error("gateway is not initialized")]
    NotInitialized,

    /// The provider identifier is not in the compiled-in supported set.
    #[error("provider not supported: {provider}")]
    UnsupportedProvider {
        /// The offending provider identifier.
        provider: String,
    },

    /// No active adapter is registered for the provider.
    ///
    /// This is the hard-error conversion of the registry's soft `None`.
    #[error("no adapter available for provider {provider}")]
    NoAdapter {
        /// The provider that was requested.
        provider: String,
    },

    /// A parameter or request field failed validation.
    #[error("validation error: {message}")]
    Validation {
        /// Description of the violation.
        message: String,
        /// The offending field, when known.
        field: Option<String>,
    },

    /// The upstream rejected the credential.
    #[error("authentication failed for {provider}: {message}")]
    Authentication {
        /// Provider that rejected the call.
        provider: String,
        /// Upstream error message.
        message: String,
    },

    /// The upstream rate-limited the call.
    #[error("rate limited by {provider}")]
    RateLimited {
        /// Provider that rate-limited the call.
        provider: String,
        /// Suggested retry delay in seconds, when the upstream sent one.
        retry_after: Option<u64>,
    },

    /// Any other upstream provider failure.
    #[error("provider {provider} error: {message}")]
    Provider {
        /// Provider that failed.
        provider: String,
        /// Upstream error message.
        message: String,
        /// HTTP status, when the failure came with one.
        status: Option<u16>,
        /// Whether retrying the same call may succeed.
        retryable: bool,
    },

    /// The streaming transport failed mid-stream.
    #[error("stream error from {provider}: {message}")]
    Stream {
        /// Provider whose stream failed.
        provider: String,
        /// What went wrong.
        message: String,
    },

    /// The per-call deadline elapsed before the provider answered.
    #[error("call to {provider} timed out")]
    Timeout {
        /// Provider that did not answer in time.
        provider: String,
    },

    /// The key manager failed to persist or mutate a credential.
    #[error("key store error: {message}")]
    KeyStore {
        /// What the store reported.
        message: String,
    },

    /// A local fault (client construction, serialization of own types).
    #[error("internal error: {message}")]
    Internal {
        /// Description of the fault.
        message: String,
    },
}

impl GatewayError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>, field: Option<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field,
        }
    }

    /// Create an authentication error.
    pub fn authentication(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Authentication {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a rate-limit error.
    pub fn rate_limit(provider: impl Into<String>, retry_after: Option<u64>) -> Self {
        Self::RateLimited {
            provider: provider.into(),
            retry_after,
        }
    }

    /// Create a generic provider error.
    pub fn provider(
        provider: impl Into<String>,
        message: impl Into<String>,
        status: Option<u16>,
        retryable: bool,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
            status,
            retryable,
        }
    }

    /// Create a stream error.
    pub fn stream(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Stream {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(provider: impl Into<String>) -> Self {
        Self::Timeout {
            provider: provider.into(),
        }
    }

    /// Create a key-store error.
    pub fn key_store(message: impl Into<String>) -> Self {
        Self::KeyStore {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether a retry of the same call may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout { .. } => true,
            Self::Provider { retryable, .. } => *retryable,
            _ => false,
        }
    }

    /// Short stable label for metrics and logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration",
            Self::NotInitialized => "not_initialized",
            Self::UnsupportedProvider { .. } => "unsupported_provider",
            Self::NoAdapter { .. } => "no_adapter",
            Self::Validation { .. } => "validation",
            Self::Authentication { .. } => "authentication",
            Self::RateLimited { .. } => "rate_limited",
            Self::Provider { .. } => "provider",
            Self::Stream { .. } => "stream",
            Self::Timeout { .. } => "timeout",
            Self::KeyStore { .. } => "key_store",
            Self::Internal { .. } => "internal",
        }
    }
}
