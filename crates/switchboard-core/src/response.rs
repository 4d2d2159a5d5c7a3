//! Response types for the gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provider-agnostic completion result.
///
/// The gateway treats this as an opaque pass-through value; only adapters
/// construct it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Unique response identifier.
    pub id: String,

    /// Provider that produced the completion.
    pub provider: String,

    /// Model that produced the completion.
    pub model: String,

    /// Generated text.
    pub text: String,

    /// Why generation stopped, when the provider reported it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,

    /// Token accounting, when the provider reported it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    /// Raw provider metadata, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,

    /// When the response was assembled.
    pub created_at: DateTime<Utc>,
}

impl CompletionResponse {
    /// Create a response with a generated identifier.
    #[must_use]
    pub fn new(
        provider: impl Into<String>,
        model: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        let provider = provider.into();
        Self {
            id: format!("{}-{}", provider, uuid::Uuid::new_v4()),
            provider,
            model: model.into(),
            text: text.into(),
            finish_reason: None,
            usage: None,
            raw: None,
            created_at: Utc::now(),
        }
    }

    /// Set the finish reason.
    #[must_use]
    pub fn with_finish_reason(mut self, finish_reason: FinishReason) -> Self {
        self.finish_reason = Some(finish_reason);
        self
    }

    /// Set token accounting.
    #[must_use]
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Attach raw provider metadata.
    #[must_use]
    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = Some(raw);
        self
    }
}

/// Why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural stop or stop sequence hit.
    Stop,
    /// Generation budget exhausted.
    Length,
    /// Provider-side content filter intervened.
    ContentFilter,
    /// Anything else the provider reported.
    Other,
}

/// Token accounting for a single completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens consumed by the prompt.
    pub prompt_tokens: u32,
    /// Tokens generated.
    pub completion_tokens: u32,
    /// Total tokens billed.
    pub total_tokens: u32,
}

impl Usage {
    /// Create usage from prompt/completion counts.
    #[must_use]
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Provider-reported consumption snapshot.
///
/// Absent (`None` at the trait boundary) when a provider has nothing to
/// report yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageData {
    /// Completed requests observed.
    pub requests: u64,
    /// Accumulated prompt tokens.
    pub prompt_tokens: u64,
    /// Accumulated completion tokens.
    pub completion_tokens: u64,
    /// Accumulated total tokens.
    pub total_tokens: u64,
}
