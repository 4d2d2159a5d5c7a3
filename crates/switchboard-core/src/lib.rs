//! # Switchboard Core
//!
//! Core types, traits, and error handling for the Switchboard completion
//! gateway.
//!
//! This crate provides the foundational types used throughout the gateway:
//! - Completion parameters and the provider-agnostic response record
//! - The `CompletionProvider` capability trait and `AdapterFactory` boundary
//! - Error types and handling
//! - Normalized provider identifiers

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod params;
pub mod provider;
pub mod response;
pub mod streaming;
pub mod types;

// Re-export commonly used types
pub use error::{GatewayError, GatewayResult};
pub use params::CompletionParams;
pub use provider::{AdapterConfig, AdapterFactory, ChunkStream, CompletionProvider};
pub use response::{CompletionResponse, FinishReason, Usage, UsageData};
pub use streaming::CompletionChunk;
pub use types::ProviderId;
