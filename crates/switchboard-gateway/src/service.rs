//! Gateway orchestration.
//!
//! Owns the registry of live provider adapters and the default-model table,
//! and exposes the unified completion, streaming, fan-out, lifecycle, and
//! introspection operations.
//!
//! Per provider the lifecycle is Unregistered, then HealthChecking, then
//! Active: an adapter enters the registry only after its health check
//! passes. The gateway as a whole is Ready iff at least one provider is
//! Active; call-path operations fail fast until then, while lifecycle
//! operations (`initialize`, `add_provider`, `remove_provider`,
//! `rotate_api_key`) and introspection stay available so a NotReady
//! gateway can become Ready.

use futures::future::join_all;
use futures_util::StreamExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use switchboard_core::{
    AdapterConfig, AdapterFactory, CompletionChunk, CompletionParams, CompletionProvider,
    CompletionResponse, GatewayError, GatewayResult, ProviderId, UsageData,
};
use switchboard_keys::KeyStore;
use switchboard_telemetry::{CallContext, Operation, PerformanceTracker};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::GatewayConfig;

/// The multi-provider completion gateway.
///
/// Explicitly constructed and dependency-injected: the composition root
/// owns the instance and passes it by reference to request handlers.
pub struct CompletionGateway {
    factory: Arc<dyn AdapterFactory>,
    keys: Arc<dyn KeyStore>,
    tracker: PerformanceTracker,
    call_timeout: Option<Duration>,
    base_urls: HashMap<ProviderId, String>,
    registry: RwLock<HashMap<ProviderId, Arc<dyn CompletionProvider>>>,
    default_models: RwLock<HashMap<ProviderId, String>>,
    ready: AtomicBool,
}

impl CompletionGateway {
    /// Create a gateway with an empty registry.
    ///
    /// The default-model table is seeded from the configuration's overrides
    /// falling back to the factory's compiled-in defaults. Call
    /// [`initialize`](Self::initialize) or
    /// [`add_provider`](Self::add_provider) to activate providers.
    #[must_use]
    pub fn new(
        factory: Arc<dyn AdapterFactory>,
        keys: Arc<dyn KeyStore>,
        tracker: PerformanceTracker,
        config: GatewayConfig,
    ) -> Self {
        let mut defaults = HashMap::new();
        for &provider in factory.supported_providers() {
            let Ok(id) = ProviderId::new(provider) else {
                continue;
            };
            let model = config
                .default_models
                .get(id.as_str())
                .cloned()
                .or_else(|| {
                    factory
                        .default_model(id.as_str())
                        .ok()
                        .map(ToString::to_string)
                });
            if let Some(model) = model {
                defaults.insert(id, model);
            }
        }

        let base_urls = config
            .base_urls
            .into_iter()
            .filter_map(|(provider, url)| ProviderId::new(&provider).ok().map(|id| (id, url)))
            .collect();

        Self {
            factory,
            keys,
            tracker,
            call_timeout: config.call_timeout,
            base_urls,
            registry: RwLock::new(HashMap::new()),
            default_models: RwLock::new(defaults),
            ready: AtomicBool::new(false),
        }
    }

    /// Best-effort bulk registration of every supported provider.
    ///
    /// Providers without a stored credential are skipped silently; a
    /// provider whose construction or health check fails is logged and
    /// skipped. One provider's failure never aborts the rest. Returns the
    /// resulting readiness.
    pub async fn initialize(&self) -> bool {
        for &provider in self.factory.supported_providers() {
            let Ok(id) = ProviderId::new(provider) else {
                continue;
            };

            let Some(key) = self.keys.get_key(id.as_str()).await else {
                debug!(provider = %id, "no stored credential, skipping");
                continue;
            };

            let model = self.registered_default_model(&id).await.unwrap_or_default();
            let config = self.adapter_config(&id, key.as_str(), model);

            match self.register(&id, config).await {
                Ok(()) => info!(provider = %id, "provider initialized"),
                Err(error) => {
                    warn!(provider = %id, error = %error, "provider initialization failed, skipping");
                }
            }
        }

        self.is_ready()
    }

    /// Whether at least one provider is Active.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Case-insensitive registry lookup.
    ///
    /// `None` for an unknown provider is a valid negative result, not an
    /// error; callers on the completion path convert it themselves.
    ///
    /// # Errors
    /// Fails fast when the gateway is not ready.
    pub async fn adapter(
        &self,
        provider: &str,
    ) -> GatewayResult<Option<Arc<dyn CompletionProvider>>> {
        self.ensure_ready()?;
        let id = ProviderId::new(provider)?;
        let registry = self.registry.read().await;
        Ok(registry.get(&id).cloned())
    }

    /// Execute a completion against one provider.
    ///
    /// Fills parameter defaults (temperature 0.7, max_tokens 1000, top_p
    /// 1.0), resolves the model from the caller's value or the provider's
    /// registered default, and dispatches through the performance tracker.
    /// The per-call deadline is `params.timeout`, falling back to the
    /// gateway-wide one.
    pub async fn execute_completion(
        &self,
        provider: &str,
        prompt: &str,
        params: CompletionParams,
        caller_id: Option<&str>,
    ) -> GatewayResult<CompletionResponse> {
        self.ensure_ready()?;
        let id = ProviderId::new(provider)?;
        let adapter = self.require_adapter(&id).await?;

        let params = params.resolved(self.registered_default_model(&id).await.as_deref());
        params.validate()?;

        let ctx = CallContext::new(
            id.as_str(),
            params.model.clone().unwrap_or_default(),
            Operation::Completion,
        )
        .with_caller_id(caller_id.map(ToString::to_string))
        .with_params(&params);

        let deadline = params.timeout.or(self.call_timeout);
        let provider_name = id.into_string();

        self.tracker
            .track(ctx, async move {
                let call = adapter.generate_completion(prompt, &params);
                match deadline {
                    Some(limit) => tokio::time::timeout(limit, call)
                        .await
                        .unwrap_or_else(|_| Err(GatewayError::timeout(&provider_name))),
                    None => call.await,
                }
            })
            .await
    }

    /// Execute a streaming completion, forwarding chunks to `on_chunk`.
    ///
    /// Resolution and defaulting match [`execute_completion`]
    /// (Self::execute_completion). The tracker interposes between the
    /// adapter and the callback without changing chunk content or ordering.
    /// The per-call deadline bounds opening the stream; chunk delivery
    /// stays bounded by the adapter's HTTP timeout.
    pub async fn execute_streaming_completion<F>(
        &self,
        provider: &str,
        prompt: &str,
        params: CompletionParams,
        caller_id: Option<&str>,
        mut on_chunk: F,
    ) -> GatewayResult<()>
    where
        F: FnMut(CompletionChunk) + Send,
    {
        self.ensure_ready()?;
        let id = ProviderId::new(provider)?;
        let adapter = self.require_adapter(&id).await?;

        let params = params.resolved(self.registered_default_model(&id).await.as_deref());
        params.validate()?;

        let ctx = CallContext::new(
            id.as_str(),
            params.model.clone().unwrap_or_default(),
            Operation::StreamingCompletion,
        )
        .with_caller_id(caller_id.map(ToString::to_string))
        .with_params(&params);

        let deadline = params.timeout.or(self.call_timeout);
        let open = adapter.stream_completion(prompt, &params);
        let stream = match deadline {
            Some(limit) => tokio::time::timeout(limit, open)
                .await
                .map_err(|_| GatewayError::timeout(id.as_str()))??,
            None => open.await?,
        };

        let mut stream = self.tracker.track_stream(ctx, stream);
        while let Some(item) = stream.next().await {
            on_chunk(item?);
        }
        Ok(())
    }

    /// Fan the same prompt out to several providers concurrently.
    ///
    /// Targets default to every Active provider. Each provider's failure is
    /// logged and that provider is simply absent from the result; partial
    /// success is the normal outcome. The result maps each succeeding
    /// provider to its own response; no cross-provider ordering exists.
    pub async fn compare_completions(
        &self,
        prompt: &str,
        providers: Option<Vec<String>>,
        params: CompletionParams,
        caller_id: Option<&str>,
    ) -> GatewayResult<HashMap<String, CompletionResponse>> {
        self.ensure_ready()?;
        let targets = match providers {
            Some(list) => list,
            None => self.available_providers().await,
        };

        let tasks = targets.into_iter().map(|provider| {
            let params = params.clone();
            async move {
                let result = self
                    .execute_completion(&provider, prompt, params, caller_id)
                    .await;
                (provider, result)
            }
        });

        let mut responses = HashMap::new();
        for (provider, result) in join_all(tasks).await {
            match result {
                Ok(response) => {
                    let key = match ProviderId::new(&provider) {
                        Ok(id) => id.into_string(),
                        Err(_) => provider,
                    };
                    responses.insert(key, response);
                }
                Err(error) => {
                    warn!(provider = %provider, error = %error, "fan-out completion failed");
                }
            }
        }
        Ok(responses)
    }

    /// Snapshot of Active provider identifiers, sorted.
    pub async fn available_providers(&self) -> Vec<String> {
        let registry = self.registry.read().await;
        let mut providers: Vec<String> =
            registry.keys().map(|id| id.as_str().to_string()).collect();
        providers.sort();
        providers
    }

    /// Models the provider's adapter can serve.
    ///
    /// # Errors
    /// Fails when the gateway is not ready or no adapter is registered for
    /// the provider.
    pub async fn available_models(&self, provider: &str) -> GatewayResult<Vec<String>> {
        self.ensure_ready()?;
        let id = ProviderId::new(provider)?;
        let adapter = self.require_adapter(&id).await?;
        adapter.available_models().await
    }

    /// Usage snapshots from every Active adapter, queried concurrently.
    ///
    /// A provider that has nothing to report maps to `None`; one adapter's
    /// inability to report never aborts the whole call.
    pub async fn usage_statistics(&self) -> GatewayResult<HashMap<String, Option<UsageData>>> {
        self.ensure_ready()?;
        let adapters: Vec<(String, Arc<dyn CompletionProvider>)> = {
            let registry = self.registry.read().await;
            registry
                .iter()
                .map(|(id, adapter)| (id.as_str().to_string(), Arc::clone(adapter)))
                .collect()
        };

        let tasks = adapters
            .into_iter()
            .map(|(name, adapter)| async move { (name, adapter.usage_statistics().await) });

        Ok(join_all(tasks).await.into_iter().collect())
    }

    /// Register a provider with a fresh credential.
    ///
    /// Stores the key, optionally updates the default-model table, then
    /// constructs and health-checks the adapter. On health-check failure
    /// the provider is not registered but the key remains stored; the
    /// caller decides whether to retry or remove it.
    pub async fn add_provider(
        &self,
        provider: &str,
        key: &str,
        default_model: Option<&str>,
    ) -> GatewayResult<()> {
        let id = ProviderId::new(provider)?;
        if !self.factory.is_supported(id.as_str()) {
            return Err(GatewayError::UnsupportedProvider {
                provider: id.as_str().to_string(),
            });
        }

        if !self.keys.store_key(id.as_str(), key).await {
            return Err(GatewayError::key_store(format!(
                "failed to store key for {id}"
            )));
        }

        if let Some(model) = default_model {
            let mut defaults = self.default_models.write().await;
            defaults.insert(id.clone(), model.to_string());
        }

        let model = match self.registered_default_model(&id).await {
            Some(model) => model,
            None => self.factory.default_model(id.as_str())?.to_string(),
        };

        self.register(&id, self.adapter_config(&id, key, model))
            .await?;
        info!(provider = %id, "provider registered");
        Ok(())
    }

    /// Remove a provider's registry entry and stored key.
    ///
    /// Returns whether key removal succeeded. Emptying the registry is the
    /// only path back to NotReady.
    pub async fn remove_provider(&self, provider: &str) -> GatewayResult<bool> {
        let id = ProviderId::new(provider)?;

        {
            let mut registry = self.registry.write().await;
            if registry.remove(&id).is_some() {
                info!(provider = %id, "provider removed");
            }
            if registry.is_empty() {
                self.ready.store(false, Ordering::SeqCst);
            }
        }

        Ok(self.keys.remove_key(id.as_str()).await)
    }

    /// Rotate a provider's credential, two-phase.
    ///
    /// Phase 1 rotates the stored key (abort if that fails). Phase 2, when
    /// the provider has an Active adapter, builds a replacement with the
    /// new key and health-checks it before atomically swapping the registry
    /// entry. On verification failure the previous key is re-stored
    /// (best-effort) and the old adapter stays in place. Without an Active
    /// adapter, the key rotation alone is success.
    pub async fn rotate_api_key(&self, provider: &str, new_key: &str) -> GatewayResult<()> {
        let id = ProviderId::new(provider)?;

        // Capture the previous key so a failed verification can restore it.
        let previous_key = self.keys.get_key(id.as_str()).await;
        let previous = previous_key.as_ref().map(|k| k.as_str());

        if !self.keys.rotate_key(id.as_str(), new_key).await {
            return Err(GatewayError::key_store(format!(
                "failed to rotate key for {id}"
            )));
        }

        let has_active = self.registry.read().await.contains_key(&id);
        if !has_active {
            info!(provider = %id, "key rotated; no active adapter to replace");
            return Ok(());
        }

        let model = match self.registered_default_model(&id).await {
            Some(model) => model,
            None => match self.factory.default_model(id.as_str()) {
                Ok(model) => model.to_string(),
                Err(error) => {
                    self.rollback_key(&id, previous).await;
                    return Err(error);
                }
            },
        };

        let replacement = match self
            .factory
            .create_adapter(id.as_str(), self.adapter_config(&id, new_key, model))
        {
            Ok(adapter) => adapter,
            Err(error) => {
                self.rollback_key(&id, previous).await;
                return Err(error);
            }
        };

        if !replacement.health_check().await {
            self.rollback_key(&id, previous).await;
            warn!(provider = %id, "rotated key failed verification; previous key restored");
            return Err(GatewayError::provider(
                id.as_str(),
                "health check failed for rotated key",
                None,
                true,
            ));
        }

        let mut registry = self.registry.write().await;
        registry.insert(id.clone(), replacement);
        info!(provider = %id, "api key rotated and adapter replaced");
        Ok(())
    }

    fn ensure_ready(&self) -> GatewayResult<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(GatewayError::NotInitialized)
        }
    }

    async fn require_adapter(
        &self,
        id: &ProviderId,
    ) -> GatewayResult<Arc<dyn CompletionProvider>> {
        let registry = self.registry.read().await;
        registry
            .get(id)
            .cloned()
            .ok_or_else(|| GatewayError::NoAdapter {
                provider: id.as_str().to_string(),
            })
    }

    async fn registered_default_model(&self, id: &ProviderId) -> Option<String> {
        let defaults = self.default_models.read().await;
        defaults.get(id).cloned()
    }

    fn adapter_config(&self, id: &ProviderId, key: &str, model: String) -> AdapterConfig {
        let mut config = AdapterConfig::new(key, model);
        if let Some(base_url) = self.base_urls.get(id) {
            config = config.with_base_url(base_url.clone());
        }
        config
    }

    /// Construct, health-check, and activate an adapter.
    async fn register(&self, id: &ProviderId, config: AdapterConfig) -> GatewayResult<()> {
        let adapter = self.factory.create_adapter(id.as_str(), config)?;
        if !adapter.health_check().await {
            return Err(GatewayError::provider(
                id.as_str(),
                "health check failed",
                None,
                true,
            ));
        }

        let mut registry = self.registry.write().await;
        registry.insert(id.clone(), adapter);
        self.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Best-effort revert after a failed rotation.
    ///
    /// On failure the stored key no longer matches the live adapter; the
    /// operator signal is the error log plus the failed rotation result.
    async fn rollback_key(&self, id: &ProviderId, previous: Option<&str>) {
        let restored = match previous {
            Some(key) => self.keys.store_key(id.as_str(), key).await,
            None => self.keys.remove_key(id.as_str()).await,
        };
        if !restored {
            tracing::error!(
                provider = %id,
                "key rollback failed; stored key may not match the active adapter"
            );
        }
    }
}

impl std::fmt::Debug for CompletionGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionGateway")
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}
