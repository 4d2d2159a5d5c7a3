//! Anthropic provider implementation.
//!
//! Speaks the messages API: `POST {base}/v1/messages` with `x-api-key`
//! authentication and a pinned `anthropic-version`. Streaming uses typed
//! SSE events (`content_block_delta`, `message_delta`, `message_stop`).

use crate::usage::UsageCounters;
use async_stream::try_stream;
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use switchboard_core::{
    AdapterConfig, ChunkStream, CompletionChunk, CompletionParams, CompletionProvider,
    CompletionResponse, FinishReason, GatewayError, GatewayResult, Usage, UsageData,
};
use tracing::{debug, error, trace, warn};

const PROVIDER_NAME: &str = "anthropic";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

// The messages API requires max_tokens; used when the gateway-side default
// did not fill it.
const FALLBACK_MAX_TOKENS: u32 = 1000;

/// Anthropic messages adapter.
pub struct AnthropicProvider {
    api_key: SecretString,
    client: Client,
    base_url: String,
    usage: UsageCounters,
}

impl AnthropicProvider {
    /// Create a new Anthropic adapter.
    ///
    /// # Errors
    /// Returns a configuration error for an empty credential, or an internal
    /// error if the HTTP client cannot be created.
    pub fn new(config: AdapterConfig) -> GatewayResult<Self> {
        if !config.has_credential() {
            return Err(GatewayError::configuration(
                "API key is required for Anthropic",
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .pool_max_idle_per_host(100)
            .build()
            .map_err(|e| GatewayError::internal(format!("Failed to create HTTP client: {e}")))?;

        let base_url = config
            .base_url()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            api_key: config.credential().clone(),
            client,
            base_url,
            usage: UsageCounters::new(),
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    fn models_url(&self) -> String {
        format!("{}/v1/models", self.base_url)
    }

    fn request_builder(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
    }

    fn build_request(
        prompt: &str,
        params: &CompletionParams,
        model: &str,
        stream: bool,
    ) -> AnthropicRequest {
        AnthropicRequest {
            model: model.to_string(),
            max_tokens: params.max_tokens.unwrap_or(FALLBACK_MAX_TOKENS),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: params.temperature,
            top_p: params.top_p,
            stop_sequences: params.stop_sequences.clone(),
            stream,
        }
    }

    fn transform_response(
        &self,
        response: AnthropicResponse,
        model: &str,
        raw: serde_json::Value,
    ) -> CompletionResponse {
        let text = response
            .content
            .iter()
            .filter_map(|block| match block {
                AnthropicContentBlock::Text { text } => Some(text.as_str()),
                AnthropicContentBlock::Unknown => None,
            })
            .collect::<Vec<_>>()
            .join("");

        let finish_reason = response
            .stop_reason
            .as_deref()
            .map(Self::map_stop_reason);
        let usage = response
            .usage
            .map(|u| Usage::new(u.input_tokens, u.output_tokens));

        self.usage.record(usage);

        let mut result = CompletionResponse::new(PROVIDER_NAME, model, text).with_raw(raw);
        if let Some(reason) = finish_reason {
            result = result.with_finish_reason(reason);
        }
        if let Some(usage) = usage {
            result = result.with_usage(usage);
        }
        result
    }

    fn map_stop_reason(reason: &str) -> FinishReason {
        match reason {
            "end_turn" | "stop_sequence" => FinishReason::Stop,
            "max_tokens" => FinishReason::Length,
            _ => FinishReason::Other,
        }
    }

    fn parse_error(status: u16, body: &str) -> GatewayError {
        #[derive(Deserialize)]
        struct AnthropicErrorResponse {
            error: AnthropicErrorDetail,
        }

        #[derive(Deserialize)]
        struct AnthropicErrorDetail {
            message: String,
        }

        if let Ok(error_response) = serde_json::from_str::<AnthropicErrorResponse>(body) {
            let message = error_response.error.message;
            match status {
                400 => GatewayError::validation(message, None),
                401 | 403 => GatewayError::authentication(PROVIDER_NAME, message),
                429 => GatewayError::rate_limit(PROVIDER_NAME, None),
                500..=599 => GatewayError::provider(PROVIDER_NAME, message, Some(status), true),
                _ => GatewayError::provider(PROVIDER_NAME, message, Some(status), false),
            }
        } else {
            GatewayError::provider(
                PROVIDER_NAME,
                format!("HTTP {status}: {body}"),
                Some(status),
                status >= 500,
            )
        }
    }
}

#[async_trait]
impl CompletionProvider for AnthropicProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn generate_completion(
        &self,
        prompt: &str,
        params: &CompletionParams,
    ) -> GatewayResult<CompletionResponse> {
        let model = params.require_model()?;
        let url = self.messages_url();
        let request = Self::build_request(prompt, params, model, false);

        debug!(provider = PROVIDER_NAME, model = %model, url = %url, "Sending completion request");

        let response = self
            .request_builder(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Anthropic API request failed");
                GatewayError::provider(PROVIDER_NAME, format!("Request failed: {e}"), None, true)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            GatewayError::provider(
                PROVIDER_NAME,
                format!("Failed to read response: {e}"),
                None,
                false,
            )
        })?;

        trace!(status = %status, body = %body, "Received Anthropic response");

        if !status.is_success() {
            return Err(Self::parse_error(status.as_u16(), &body));
        }

        let raw: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            GatewayError::provider(
                PROVIDER_NAME,
                format!("Invalid response JSON: {e}"),
                None,
                false,
            )
        })?;
        let parsed: AnthropicResponse = serde_json::from_value(raw.clone()).map_err(|e| {
            GatewayError::provider(
                PROVIDER_NAME,
                format!("Unexpected response shape: {e}"),
                None,
                false,
            )
        })?;

        Ok(self.transform_response(parsed, model, raw))
    }

    async fn stream_completion(
        &self,
        prompt: &str,
        params: &CompletionParams,
    ) -> GatewayResult<ChunkStream> {
        let model = params.require_model()?.to_string();
        let url = self.messages_url();
        let request = Self::build_request(prompt, params, &model, true);

        debug!(provider = PROVIDER_NAME, model = %model, url = %url, "Sending streaming completion request");

        let response = self
            .request_builder(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Anthropic API streaming request failed");
                GatewayError::provider(
                    PROVIDER_NAME,
                    format!("Streaming request failed: {e}"),
                    None,
                    true,
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::parse_error(status.as_u16(), &body));
        }

        let stream = try_stream! {
            let mut byte_stream = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk_result) = byte_stream.next().await {
                let chunk = chunk_result.map_err(|e| {
                    GatewayError::stream(PROVIDER_NAME, format!("Stream read failed: {e}"))
                })?;

                buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(pos) = buffer.find("\n\n") {
                    let event = buffer[..pos].to_string();
                    buffer = buffer[pos + 2..].to_string();

                    for line in event.lines() {
                        let Some(data) = line.strip_prefix("data: ") else {
                            continue;
                        };

                        match serde_json::from_str::<AnthropicStreamEvent>(data) {
                            Ok(AnthropicStreamEvent::ContentBlockDelta { delta }) => {
                                if let Some(text) = delta.text {
                                    yield CompletionChunk::delta(text);
                                }
                            }
                            Ok(AnthropicStreamEvent::MessageDelta { delta }) => {
                                if let Some(reason) = delta.stop_reason.as_deref() {
                                    yield CompletionChunk::finished(
                                        Self::map_stop_reason(reason),
                                    );
                                }
                            }
                            Ok(AnthropicStreamEvent::MessageStop) => {
                                return;
                            }
                            Ok(AnthropicStreamEvent::Error { error }) => {
                                let failure: GatewayResult<()> =
                                    Err(GatewayError::stream(PROVIDER_NAME, error.message));
                                failure?;
                            }
                            Ok(AnthropicStreamEvent::Other) => {}
                            Err(e) => {
                                warn!(error = %e, "Skipping malformed Anthropic stream event");
                            }
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }

    async fn health_check(&self) -> bool {
        let url = self.models_url();
        match self
            .client
            .get(&url)
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .timeout(HEALTH_CHECK_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn available_models(&self) -> GatewayResult<Vec<String>> {
        let url = self.models_url();
        let response = self
            .client
            .get(&url)
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .send()
            .await
            .map_err(|e| {
                GatewayError::provider(
                    PROVIDER_NAME,
                    format!("Model listing failed: {e}"),
                    None,
                    true,
                )
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(Self::parse_error(status.as_u16(), &body));
        }

        let models: AnthropicModelsResponse = serde_json::from_str(&body).map_err(|e| {
            GatewayError::provider(
                PROVIDER_NAME,
                format!("Invalid models JSON: {e}"),
                None,
                false,
            )
        })?;

        Ok(models.data.into_iter().map(|m| m.id).collect())
    }

    async fn usage_statistics(&self) -> Option<UsageData> {
        self.usage.snapshot()
    }
}

// Anthropic API types

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicStreamEvent {
    ContentBlockDelta {
        delta: AnthropicTextDelta,
    },
    MessageDelta {
        delta: AnthropicMessageDelta,
    },
    MessageStop,
    Error {
        error: AnthropicStreamError,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicTextDelta {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicMessageDelta {
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicStreamError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicModelsResponse {
    data: Vec<AnthropicModel>,
}

#[derive(Debug, Deserialize)]
struct AnthropicModel {
    id: String,
}
