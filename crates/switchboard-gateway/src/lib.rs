//! # Switchboard Gateway
//!
//! The orchestration core of the completion gateway: one registry of live
//! provider adapters behind a unified completion, streaming, and fan-out
//! surface, with credential lifecycle and performance instrumentation.
//!
//! The gateway is an explicitly constructed, dependency-injected instance:
//! the composition root owns it and hands out references; there is no
//! process-wide singleton.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod service;

// Re-export main types
pub use config::GatewayConfig;
pub use service::CompletionGateway;
