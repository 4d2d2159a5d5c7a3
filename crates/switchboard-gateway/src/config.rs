//! Gateway configuration.

use std::collections::HashMap;
use std::time::Duration;

/// Configuration for [`crate::CompletionGateway`].
#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    /// Per-provider default-model overrides. Providers without an override
    /// fall back to the factory's compiled-in default.
    pub default_models: HashMap<String, String>,

    /// Per-provider endpoint overrides (proxies, self-hosted deployments,
    /// tests). Providers without an override use their adapter's built-in
    /// endpoint.
    pub base_urls: HashMap<String, String>,

    /// Deadline applied to every completion and streaming call that does
    /// not carry its own. `None` leaves calls bounded only by the adapters'
    /// HTTP timeouts.
    pub call_timeout: Option<Duration>,
}

impl GatewayConfig {
    /// Create an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the default model for a provider.
    #[must_use]
    pub fn with_default_model(
        mut self,
        provider: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        self.default_models.insert(
            provider.into().trim().to_ascii_lowercase(),
            model.into(),
        );
        self
    }

    /// Override the endpoint for a provider.
    #[must_use]
    pub fn with_base_url(
        mut self,
        provider: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        self.base_urls.insert(
            provider.into().trim().to_ascii_lowercase(),
            base_url.into(),
        );
        self
    }

    /// Set the gateway-wide call deadline.
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }
}
