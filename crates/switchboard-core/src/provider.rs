//! The provider capability contract and adapter construction boundary.

use crate::error::GatewayResult;
use crate::params::CompletionParams;
use crate::response::{CompletionResponse, UsageData};
use crate::streaming::CompletionChunk;
use async_trait::async_trait;
use futures::stream::BoxStream;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Duration;

/// Default HTTP timeout for adapter clients.
pub const DEFAULT_ADAPTER_TIMEOUT: Duration = Duration::from_secs(120);

/// Stream of completion chunks from a single streaming call.
pub type ChunkStream = BoxStream<'static, GatewayResult<CompletionChunk>>;

/// Immutable configuration handed to adapter construction.
///
/// Rotating a credential requires building a new configuration and a new
/// adapter; live adapters are never re-keyed.
#[derive(Clone)]
pub struct AdapterConfig {
    credential: SecretString,
    default_model: String,
    base_url: Option<String>,
    timeout: Duration,
}

impl AdapterConfig {
    /// Create a configuration from a credential and default model.
    #[must_use]
    pub fn new(credential: impl Into<String>, default_model: impl Into<String>) -> Self {
        Self {
            credential: SecretString::new(credential.into()),
            default_model: default_model.into(),
            base_url: None,
            timeout: DEFAULT_ADAPTER_TIMEOUT,
        }
    }

    /// Override the provider endpoint (self-hosted deployments, tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the HTTP timeout for the adapter's client.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The credential.
    #[must_use]
    pub fn credential(&self) -> &SecretString {
        &self.credential
    }

    /// Whether the credential is non-empty.
    #[must_use]
    pub fn has_credential(&self) -> bool {
        !self.credential.expose_secret().is_empty()
    }

    /// The default model for this adapter.
    #[must_use]
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// The endpoint override, if any.
    #[must_use]
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// The HTTP timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl std::fmt::Debug for AdapterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterConfig")
            .field("credential", &"[REDACTED]")
            .field("default_model", &self.default_model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Capability contract every provider adapter implements.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Normalized provider identifier ("openai", "anthropic", ...).
    fn name(&self) -> &str;

    /// Generate a completion for the prompt.
    async fn generate_completion(
        &self,
        prompt: &str,
        params: &CompletionParams,
    ) -> GatewayResult<CompletionResponse>;

    /// Open a streaming completion.
    ///
    /// The stream yields zero or more chunks in provider emission order and
    /// surfaces failure as an `Err` item instead of completing normally.
    async fn stream_completion(
        &self,
        prompt: &str,
        params: &CompletionParams,
    ) -> GatewayResult<ChunkStream>;

    /// Minimal round-trip verifying credential and connectivity.
    ///
    /// Never errors; every failure collapses to `false`.
    async fn health_check(&self) -> bool;

    /// Models this adapter can serve.
    async fn available_models(&self) -> GatewayResult<Vec<String>>;

    /// Consumption snapshot, when the adapter has one to report.
    async fn usage_statistics(&self) -> Option<UsageData>;
}

/// Pure, stateless adapter construction.
///
/// Implementations never perform network I/O; connectivity is verified by
/// the adapter's own `health_check`.
pub trait AdapterFactory: Send + Sync {
    /// Compiled-in list of supported provider identifiers.
    fn supported_providers(&self) -> &[&'static str];

    /// Whether the identifier names a supported provider (case-insensitive).
    fn is_supported(&self, provider: &str) -> bool {
        let normalized = provider.trim().to_ascii_lowercase();
        self.supported_providers().contains(&normalized.as_str())
    }

    /// Static default model for a supported provider.
    ///
    /// # Errors
    /// Returns an unsupported-provider error otherwise.
    fn default_model(&self, provider: &str) -> GatewayResult<&'static str>;

    /// Construct the adapter for a supported provider.
    ///
    /// # Errors
    /// Returns a configuration error if the provider is unsupported or the
    /// credential is empty.
    fn create_adapter(
        &self,
        provider: &str,
        config: AdapterConfig,
    ) -> GatewayResult<Arc<dyn CompletionProvider>>;
}
