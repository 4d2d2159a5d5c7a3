//! # Switchboard Telemetry
//!
//! Performance instrumentation for the completion gateway.
//!
//! This crate provides:
//! - The `PerformanceTracker` measure-and-forward wrapper around completion
//!   and streaming-completion calls
//! - The `MetricsSink` boundary an external metrics store plugs into
//! - A bounded in-memory sink for tests and single-process deployments
//! - Structured-logging initialization

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod logging;
pub mod tracker;

// Re-export main types
pub use logging::{init_logging, LoggingConfig};
pub use tracker::{
    CallContext, CallSample, InMemorySink, MetricsSink, Operation, PerformanceTracker,
    ProviderTotals,
};
