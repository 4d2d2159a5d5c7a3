//! Google Gemini provider implementation.
//!
//! Speaks the Google AI Studio API:
//! `POST {base}/v1beta/models/{model}:generateContent?key=...`, streaming
//! via `:streamGenerateContent?alt=sse`.

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

const PROVIDER_NAME: &str = "gemini";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Google Gemini adapter.
pub struct GeminiProvider {
    api_key: SecretString,
    client: Client,
    base_url: String,
    usage: UsageCounters,
}

impl GeminiProvider {
    /// Create a new Gemini adapter.
    ///
    /// # Errors
    /// Returns a configuration error for an empty credential, or an internal
    /// error if the HTTP client cannot be created.
    pub fn new(config: AdapterConfig) -> GatewayResult<Self> {
        if !config.has_credential() {
            return Err(GatewayError::configuration(
                "API key is required for Gemini",
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

    fn generate_url(&self, model: &str, streaming: bool) -> String {
        let action = if streaming {
            "streamGenerateContent"
        } else {
            "generateContent"
        };
        let mut url = format!(
            "{}/v1beta/models/{}:{}?key={}",
            self.base_url,
            model,
            action,
            self.api_key.expose_secret()
        );
        if streaming {
            url.push_str("&alt=sse");
        }
        url
    }

    fn models_url(&self) -> String {
        format!(
            "{}/v1beta/models?key={}",
            self.base_url,
            self.api_key.expose_secret()
        )
    }

    fn build_request(prompt: &str, params: &CompletionParams) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: Some(GeminiGenerationConfig {
                temperature: params.temperature,
                top_p: params.top_p,
                max_output_tokens: params.max_tokens,
                stop_sequences: params.stop_sequences.clone(),
            }),
        }
    }

    fn transform_response(
        &self,
        response: GeminiResponse,
        model: &str,
        raw: serde_json::Value,
    ) -> GatewayResult<CompletionResponse> {
        let candidate = response.candidates.into_iter().next().ok_or_else(|| {
            GatewayError::provider(PROVIDER_NAME, "No candidates in response", None, false)
        })?;

        let text = candidate
            .content
            .parts
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("");

        let finish_reason = candidate
            .finish_reason
            .as_deref()
            .map(Self::map_finish_reason);
        let usage = response.usage_metadata.map(|u| {
            Usage::new(
                u.prompt_token_count,
                u.candidates_token_count.unwrap_or(0),
            )
        });

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
            "STOP" => FinishReason::Stop,
            "MAX_TOKENS" => FinishReason::Length,
            "SAFETY" | "RECITATION" => FinishReason::ContentFilter,
            _ => FinishReason::Other,
        }
    }

    fn parse_error(status: u16, body: &str) -> GatewayError {
        #[derive(Deserialize)]
        struct GeminiErrorResponse {
            error: GeminiErrorDetail,
        }

        #[derive(Deserialize)]
        struct GeminiErrorDetail {
            message: String,
        }

        if let Ok(error_response) = serde_json::from_str::<GeminiErrorResponse>(body) {
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
impl CompletionProvider for GeminiProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn generate_completion(
        &self,
        prompt: &str,
        params: &CompletionParams,
    ) -> GatewayResult<CompletionResponse> {
        let model = params.require_model()?;
        let url = self.generate_url(model, false);
        let request = Self::build_request(prompt, params);

        debug!(provider = PROVIDER_NAME, model = %model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Gemini API request failed");
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

        trace!(status = %status, body = %body, "Received Gemini response");

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
        let parsed: GeminiResponse = serde_json::from_value(raw.clone()).map_err(|e| {
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
        let url = self.generate_url(&model, true);
        let request = Self::build_request(prompt, params);

        debug!(provider = PROVIDER_NAME, model = %model, "Sending streaming completion request");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Gemini API streaming request failed");
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

                        match serde_json::from_str::<GeminiResponse>(data) {
                            Ok(parsed) => {
                                if let Some(candidate) = parsed.candidates.into_iter().next() {
                                    let text = candidate
                                        .content
                                        .parts
                                        .iter()
                                        .map(|p| p.text.as_str())
                                        .collect::<Vec<_>>()
                                        .join("");
                                    let finish_reason = candidate
                                        .finish_reason
                                        .as_deref()
                                        .map(Self::map_finish_reason);
                                    yield CompletionChunk {
                                        delta: text,
                                        finish_reason,
                                    };
                                }
                            }
                            Err(e) => {
                                warn!(error = %e, "Skipping malformed Gemini stream event");
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
        let response = self.client.get(&url).send().await.map_err(|e| {
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

        let models: GeminiModelsResponse = serde_json::from_str(&body).map_err(|e| {
            GatewayError::provider(
                PROVIDER_NAME,
                format!("Invalid models JSON: {e}"),
                None,
                false,
            )
        })?;

        Ok(models
            .models
            .into_iter()
            .map(|m| {
                m.name
                    .strip_prefix("models/")
                    .map_or(m.name.clone(), ToString::to_string)
            })
            .collect())
    }

    async fn usage_statistics(&self) -> Option<UsageData> {
        self.usage.snapshot()
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: GeminiContent,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GeminiModelsResponse {
    #[serde(default)]
    models: Vec<GeminiModel>,
}

#[derive(Debug, Deserialize)]
struct GeminiModel {
    name: String,
}
