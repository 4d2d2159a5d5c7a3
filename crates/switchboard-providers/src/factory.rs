//! Static adapter construction.

use crate::anthropic::AnthropicProvider;
use crate::gemini::GeminiProvider;
use crate::openai::OpenAIProvider;
use std::sync::Arc;
use switchboard_core::{
    AdapterConfig, AdapterFactory, CompletionProvider, GatewayError, GatewayResult,
};

/// Compiled-in list of supported provider identifiers.
pub const SUPPORTED_PROVIDERS: [&str; 3] = ["openai", "anthropic", "gemini"];

/// Pure, stateless factory over the compiled-in provider set.
///
/// Construction never performs network I/O; connectivity is verified by the
/// adapter's own `health_check`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderFactory;

impl ProviderFactory {
    /// Create the factory.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn normalize(provider: &str) -> String {
    provider.trim().to_ascii_lowercase()
}

impl AdapterFactory for ProviderFactory {
    fn supported_providers(&self) -> &[&'static str] {
        &SUPPORTED_PROVIDERS
    }

    fn default_model(&self, provider: &str) -> GatewayResult<&'static str> {
        match normalize(provider).as_str() {
            "openai" => Ok("gpt-4o-mini"),
            "anthropic" => Ok("claude-3-5-sonnet-latest"),
            "gemini" => Ok("gemini-1.5-flash"),
            other => Err(GatewayError::UnsupportedProvider {
                provider: other.to_string(),
            }),
        }
    }

    fn create_adapter(
        &self,
        provider: &str,
        config: AdapterConfig,
    ) -> GatewayResult<Arc<dyn CompletionProvider>> {
        if !config.has_credential() {
            return Err(GatewayError::configuration(format!(
                "credential for {provider} cannot be empty"
            )));
        }

        match normalize(provider).as_str() {
            "openai" => Ok(Arc::new(OpenAIProvider::new(config)?)),
            "anthropic" => Ok(Arc::new(AnthropicProvider::new(config)?)),
            "gemini" => Ok(Arc::new(GeminiProvider::new(config)?)),
            other => Err(GatewayError::configuration(format!(
                "unsupported provider: {other}"
            ))),
        }
    }
}
