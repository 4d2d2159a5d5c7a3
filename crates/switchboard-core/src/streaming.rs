//! Streaming delivery types.

use crate::response::FinishReason;
use serde::{Deserialize, Serialize};

/// One incremental piece of a streaming completion.
///
/// Chunks are delivered in the order the adapter emits them; a chunk
/// carrying a finish reason is the terminal signal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionChunk {
    /// Text delta for this chunk (may be empty on the terminal chunk).
    pub delta: String,

    /// Present on the terminal chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

impl CompletionChunk {
    /// Create a text delta chunk.
    #[must_use]
    pub fn delta(text: impl Into<String>) -> Self {
        Self {
            delta: text.into(),
            finish_reason: None,
        }
    }

    /// Create a terminal chunk.
    #[must_use]
    pub fn finished(finish_reason: FinishReason) -> Self {
        Self {
            delta: String::new(),
            finish_reason: Some(finish_reason),
        }
    }

    /// Whether this chunk terminates the stream.
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.finish_reason.is_some()
    }
}
