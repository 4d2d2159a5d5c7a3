//! Completion parameters shared by every provider adapter.

use crate::error::{GatewayError, GatewayResult};
use std::time::Duration;

/// Default sampling temperature applied by the gateway when unset.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
/// Default generation budget applied by the gateway when unset.
pub const DEFAULT_MAX_TOKENS: u32 = 1000;
/// Default nucleus-sampling parameter applied by the gateway when unset.
pub const DEFAULT_TOP_P: f32 = 1.0;

/// Unified completion parameters.
///
/// Adapters translate these into their own wire format; fields a backend
/// does not support are dropped there. `model` must be resolved to a
/// concrete value before dispatch; adapters reject an unset or empty one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionParams {
    /// Target model. Resolved by the gateway from the caller's value or the
    /// provider's registered default.
    pub model: Option<String>,

    /// Sampling temperature (0.0 - 2.0; a provider may narrow the range).
    pub temperature: Option<f32>,

    /// Maximum tokens to generate (must be positive).
    pub max_tokens: Option<u32>,

    /// Top-p (nucleus sampling) parameter (0.0 - 1.0).
    pub top_p: Option<f32>,

    /// Stop sequences, in caller order.
    pub stop_sequences: Option<Vec<String>>,

    /// Presence penalty (-2.0 to 2.0; OpenAI-style backends only).
    pub presence_penalty: Option<f32>,

    /// Frequency penalty (-2.0 to 2.0; OpenAI-style backends only).
    pub frequency_penalty: Option<f32>,

    /// Per-call deadline, propagated from the gateway's public methods.
    pub timeout: Option<Duration>,
}

impl CompletionParams {
    /// Create empty parameters; the gateway fills defaults at dispatch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the generation budget.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the nucleus-sampling parameter.
    #[must_use]
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Set stop sequences.
    #[must_use]
    pub fn with_stop_sequences(mut self, stop_sequences: Vec<String>) -> Self {
        self.stop_sequences = Some(stop_sequences);
        self
    }

    /// Set the presence penalty.
    #[must_use]
    pub fn with_presence_penalty(mut self, presence_penalty: f32) -> Self {
        self.presence_penalty = Some(presence_penalty);
        self
    }

    /// Set the frequency penalty.
    #[must_use]
    pub fn with_frequency_penalty(mut self, frequency_penalty: f32) -> Self {
        self.frequency_penalty = Some(frequency_penalty);
        self
    }

    /// Set the per-call deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Validate all present fields against their ranges.
    ///
    /// # Errors
    /// Returns a validation error naming the offending field.
    pub fn validate(&self) -> GatewayResult<()> {
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(GatewayError::validation(
                    format!("temperature must be between 0.0 and 2.0, got {t}"),
                    Some("temperature".to_string()),
                ));
            }
        }

        if let Some(m) = self.max_tokens {
            if m == 0 {
                return Err(GatewayError::validation(
                    "max_tokens must be positive",
                    Some("max_tokens".to_string()),
                ));
            }
        }

        if let Some(p) = self.top_p {
            if !(0.0..=1.0).contains(&p) {
                return Err(GatewayError::validation(
                    format!("top_p must be between 0.0 and 1.0, got {p}"),
                    Some("top_p".to_string()),
                ));
            }
        }

        if let Some(pp) = self.presence_penalty {
            if !(-2.0..=2.0).contains(&pp) {
                return Err(GatewayError::validation(
                    format!("presence_penalty must be between -2.0 and 2.0, got {pp}"),
                    Some("presence_penalty".to_string()),
                ));
            }
        }

        if let Some(fp) = self.frequency_penalty {
            if !(-2.0..=2.0).contains(&fp) {
                return Err(GatewayError::validation(
                    format!("frequency_penalty must be between -2.0 and 2.0, got {fp}"),
                    Some("frequency_penalty".to_string()),
                ));
            }
        }

        Ok(())
    }

    /// Fill gateway defaults and resolve the model.
    ///
    /// The caller-supplied model wins; otherwise the provider's registered
    /// default is used; otherwise the field stays unset and the adapter
    /// rejects it.
    #[must_use]
    pub fn resolved(mut self, default_model: Option<&str>) -> Self {
        if self.temperature.is_none() {
            self.temperature = Some(DEFAULT_TEMPERATURE);
        }
        if self.max_tokens.is_none() {
            self.max_tokens = Some(DEFAULT_MAX_TOKENS);
        }
        if self.top_p.is_none() {
            self.top_p = Some(DEFAULT_TOP_P);
        }
        if self.model.as_deref().map_or(true, str::is_empty) {
            self.model = default_model
                .filter(|m| !m.is_empty())
                .map(ToString::to_string);
        }
        self
    }

    /// The resolved model, if any non-empty value is set.
    ///
    /// # Errors
    /// Returns a validation error when the model is unset or empty.
    pub fn require_model(&self) -> GatewayResult<&str> {
        match self.model.as_deref() {
            Some(m) if !m.is_empty() => Ok(m),
            _ => Err(GatewayError::validation(
                "model must be resolved before dispatch",
                Some("model".to_string()),
            )),
        }
    }
}
