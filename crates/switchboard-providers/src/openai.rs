//! OpenAI provider implementation.
//!
//! Speaks the chat completions API: `POST {base}/v1/chat/completions` with
//! bearer authentication, SSE streaming via the same endpoint.

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

const PROVIDER_NAME: &str = "openai";
const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// OpenAI chat-completions adapter.
pub struct OpenAIProvider {
    api_key: SecretString,
    client: Client,
    base_url: String,
    usage: UsageCounters,
}

impl OpenAIProvider {
    /// Create a new OpenAI adapter.
    ///
    /// # Errors
    /// Returns a configuration error for an empty credential, or an internal
    /// error if the HTTP client cannot be created.
    pub fn new(config: AdapterConfig) -> GatewayResult<Self> {
        if !config.has_credential() {
            return Err(GatewayError::configuration(
                "API key is required for OpenAI",
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

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn models_url(&self) -> String {
        format!("{}/v1/models", self.base_url)
    }

    fn build_request(prompt: &str, params: &CompletionParams, model: &str, stream: bool) -> OpenAIRequest {
        OpenAIRequest {
            model: model.to_string(),
            messages: vec![OpenAIMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            top_p: params.top_p,
            stop: params.stop_sequences.clone(),
            presence_penalty: params.presence_penalty,
            frequency_penalty: params.frequency_penalty,
            stream,
        }
    }

    fn transform_response(
        &self,
        response: OpenAIResponse,
        model: &str,
        raw: serde_json::Value,
    ) -> GatewayResult<CompletionResponse> {
        let choice = response.choices.into_iter().next().ok_or_else(|| {
            GatewayError::provider(PROVIDER_NAME, "No choices in response", None, false)
        })?;

        let text = choice.message.content.unwrap_or_default();
        let finish_reason = choice.finish_reason.as_deref().map(Self::map_finish_reason);
        let usage = response
            .usage
            .map(|u| Usage::new(u.prompt_tokens, u.completion_tokens));

        self.usage.record(usage);

        let mut result = CompletionResponse::new(PROVIDER_NAME, model, text).with_raw(raw);
        if let Some(reason) = finish_reason {
            result = result.with_finish_reason(reason);
        }
        if let Some(usage) = usage {
            result = result.with_usage(usage);
        }
        Ok(result)
    }

    fn map_finish_reason(reason: &str) -> FinishReason {
        match reason {
            "stop" => FinishReason::Stop,
            "length" => FinishReason::Length,
            "content_filter" => FinishReason::ContentFilter,
            _ => FinishReason::Other,
        }
    }

    fn parse_error(status: u16, body: &str) -> GatewayError {
        #[derive(Deserialize)]
        struct OpenAIErrorResponse {
            error: OpenAIErrorDetail,
        }

        #[derive(Deserialize)]
        struct OpenAIErrorDetail {
            message: String,
        }

        if let Ok(error_response) = serde_json::from_str::<OpenAIErrorResponse>(body) {
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
impl CompletionProvider for OpenAIProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn generate_completion(
        &self,
        prompt: &str,
        params: &CompletionParams,
    ) -> GatewayResult<CompletionResponse> {
        let model = params.require_model()?;
        let url = self.completions_url();
        let request = Self::build_request(prompt, params, model, false);

        debug!(provider = PROVIDER_NAME, model = %model, url = %url, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "OpenAI API request failed");
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

        trace!(status = %status, body = %body, "Received OpenAI response");

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
        let parsed: OpenAIResponse = serde_json::from_value(raw.clone()).map_err(|e| {
            GatewayError::provider(
                PROVIDER_NAME,
                format!("Unexpected response shape: {e}"),
                None,
                false,
            )
        })?;

        self.transform_response(parsed, model, raw)
    }

    async fn stream_completion(
        &self,
        prompt: &str,
        params: &CompletionParams,
    ) -> GatewayResult<ChunkStream> {
        let model = params.require_model()?.to_string();
        let url = self.completions_url();
        let request = Self::build_request(prompt, params, &model, true);

        debug!(provider = PROVIDER_NAME, model = %model, url = %url, "Sending streaming completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "OpenAI API streaming request failed");
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

                // Process complete SSE events
                while let Some(pos) = buffer.find("\n\n") {
                    let event = buffer[..pos].to_string();
                    buffer = buffer[pos + 2..].to_string();

                    for line in event.lines() {
                        if let Some(data) = line.strip_prefix("data: ") {
                            if data == "[DONE]" {
                                return;
                            }

                            match serde_json::from_str::<OpenAIStreamChunk>(data) {
                                Ok(parsed) => {
                                    if let Some(choice) = parsed.choices.into_iter().next() {
                                        let finish_reason = choice
                                            .finish_reason
                                            .as_deref()
                                            .map(Self::map_finish_reason);
                                        yield CompletionChunk {
                                            delta: choice.delta.content.unwrap_or_default(),
                                            finish_reason,
                                        };
                                    }
                                }
                                Err(e) => {
                                    warn!(error = %e, "Skipping malformed OpenAI stream event");
                                }
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
            .bearer_auth(self.api_key.expose_secret())
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
            .bearer_auth(self.api_key.expose_secret())
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

        let models: OpenAIModelsResponse = serde_json::from_str(&body).map_err(|e| {
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

// OpenAI API types

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f32>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    #[serde(default)]
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAIStreamChunk {
    choices: Vec<OpenAIStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIStreamChoice {
    delta: OpenAIDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIModelsResponse {
    data: Vec<OpenAIModel>,
}

#[derive(Debug, Deserialize)]
struct OpenAIModel {
    id: String,
}
