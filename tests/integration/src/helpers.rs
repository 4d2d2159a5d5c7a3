//! Shared test fixtures.

use crate::mock_providers::{MockAnthropic, MockGemini, MockOpenAI};
use std::sync::Arc;
use switchboard_gateway::{CompletionGateway, GatewayConfig};
use switchboard_keys::{InMemoryKeyStore, KeyStore};
use switchboard_providers::ProviderFactory;
use switchboard_telemetry::{InMemorySink, PerformanceTracker};

/// A gateway wired to three mock provider backends.
pub struct TestStack {
    /// The gateway under test.
    pub gateway: CompletionGateway,
    /// The key store backing the gateway.
    pub keys: Arc<InMemoryKeyStore>,
    /// The metrics sink behind the performance tracker.
    pub sink: Arc<InMemorySink>,
    /// Mock OpenAI backend.
    pub openai: MockOpenAI,
    /// Mock Anthropic backend.
    pub anthropic: MockAnthropic,
    /// Mock Gemini backend.
    pub gemini: MockGemini,
}

impl TestStack {
    /// Start three mock backends and build an uninitialized gateway
    /// pointing at them. No credentials are stored yet.
    pub async fn new() -> Self {
        let openai = MockOpenAI::new().await;
        let anthropic = MockAnthropic::new().await;
        let gemini = MockGemini::new().await;

        let keys = Arc::new(InMemoryKeyStore::new());
        let sink = Arc::new(InMemorySink::default());
        let config = GatewayConfig::new()
            .with_base_url("openai", openai.url())
            .with_base_url("anthropic", anthropic.url())
            .with_base_url("gemini", gemini.url());

        let gateway = CompletionGateway::new(
            Arc::new(ProviderFactory::new()),
            keys.clone(),
            PerformanceTracker::new(sink.clone()),
            config,
        );

        Self {
            gateway,
            keys,
            sink,
            openai,
            anthropic,
            gemini,
        }
    }

    /// Store credentials for all three providers.
    pub async fn store_all_keys(&self) {
        self.keys.store_key("openai", "sk-openai-test").await;
        self.keys.store_key("anthropic", "sk-ant-test").await;
        self.keys.store_key("gemini", "gm-test").await;
    }

    /// Mount healthy models endpoints on all three backends.
    pub async fn mount_all_health(&self) {
        self.openai.mock_models_list().await;
        self.anthropic.mock_models_list().await;
        self.gemini.mock_models_list().await;
    }

    /// Full setup: healthy backends, stored credentials, initialized
    /// gateway.
    pub async fn ready() -> Self {
        let stack = Self::new().await;
        stack.mount_all_health().await;
        stack.store_all_keys().await;
        assert!(stack.gateway.initialize().await);
        stack
    }
}
