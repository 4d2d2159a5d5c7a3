//! # Switchboard Providers
//!
//! Provider adapter implementations for the completion gateway:
//! - OpenAI (chat completions API)
//! - Anthropic (messages API)
//! - Google Gemini (generateContent API)
//!
//! Plus the static [`ProviderFactory`] that constructs them.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod anthropic;
pub mod factory;
pub mod gemini;
pub mod openai;

mod usage;

// Re-export main types
pub use anthropic::AnthropicProvider;
pub use factory::{ProviderFactory, SUPPORTED_PROVIDERS};
pub use gemini::GeminiProvider;
pub use openai::OpenAIProvider;
