//! Timing and outcome instrumentation for provider-facing calls.
//!
//! The tracker wraps a unit of work, measures it, forwards a sample to the
//! configured sink, and returns exactly what the wrapped call returned;
//! errors are never swallowed or altered.

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use switchboard_core::{ChunkStream, CompletionParams, GatewayResult};

/// Which gateway operation a sample describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// A whole-response completion.
    Completion,
    /// A chunked streaming completion.
    StreamingCompletion,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completion => f.write_str("completion"),
            Self::StreamingCompletion => f.write_str("streaming_completion"),
        }
    }
}

/// Context describing the unit of work being measured.
///
/// Caller identity is an explicit parameter here; there is no ambient
/// "current user" lookup anywhere in the gateway.
#[derive(Debug, Clone)]
pub struct CallContext {
    /// Normalized provider identifier.
    pub provider: String,
    /// Resolved model.
    pub model: String,
    /// Operation tag.
    pub operation: Operation,
    /// Caller identity, when the request layer supplied one.
    pub caller_id: Option<String>,
    /// Sampling temperature in effect.
    pub temperature: Option<f32>,
    /// Generation budget in effect.
    pub max_tokens: Option<u32>,
    /// Nucleus-sampling parameter in effect.
    pub top_p: Option<f32>,
}

impl CallContext {
    /// Create a context for a provider call.
    #[must_use]
    pub fn new(
        provider: impl Into<String>,
        model: impl Into<String>,
        operation: Operation,
    ) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            operation,
            caller_id: None,
            temperature: None,
            max_tokens: None,
            top_p: None,
        }
    }

    /// Attach the caller identity.
    #[must_use]
    pub fn with_caller_id(mut self, caller_id: Option<String>) -> Self {
        self.caller_id = caller_id;
        self
    }

    /// Capture the parameter set in effect for the call.
    #[must_use]
    pub fn with_params(mut self, params: &CompletionParams) -> Self {
        self.temperature = params.temperature;
        self.max_tokens = params.max_tokens;
        self.top_p = params.top_p;
        self
    }
}

/// One recorded provider call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSample {
    /// When the call finished.
    pub timestamp: DateTime<Utc>,
    /// Provider called.
    pub provider: String,
    /// Model called.
    pub model: String,
    /// Operation tag.
    pub operation: Operation,
    /// Caller identity, when supplied.
    pub caller_id: Option<String>,
    /// Whether the call succeeded.
    pub success: bool,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Latency to the first streamed chunk, for streaming calls.
    pub time_to_first_chunk_ms: Option<u64>,
    /// Chunks delivered, for streaming calls.
    pub chunks: Option<usize>,
    /// Stable error label, on failure.
    pub error: Option<String>,
    /// Sampling temperature in effect.
    pub temperature: Option<f32>,
    /// Generation budget in effect.
    pub max_tokens: Option<u32>,
    /// Nucleus-sampling parameter in effect.
    pub top_p: Option<f32>,
}

/// Sink the tracker forwards samples to.
///
/// The metrics store behind this boundary is an external collaborator; the
/// gateway only calls `record`.
pub trait MetricsSink: Send + Sync {
    /// Accept one finished-call sample.
    fn record(&self, sample: CallSample);
}

/// Per-provider aggregate counters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ProviderTotals {
    /// Calls recorded.
    pub calls: u64,
    /// Calls that failed.
    pub failures: u64,
    /// Summed wall-clock duration in milliseconds.
    pub total_duration_ms: u64,
}

/// Bounded in-memory sink.
///
/// Keeps the most recent samples plus running per-provider totals.
#[derive(Debug)]
pub struct InMemorySink {
    max_samples: usize,
    samples: Mutex<VecDeque<CallSample>>,
    totals: Mutex<HashMap<String, ProviderTotals>>,
}

impl InMemorySink {
    /// Create a sink retaining up to `max_samples` recent samples.
    #[must_use]
    pub fn new(max_samples: usize) -> Self {
        Self {
            max_samples,
            samples: Mutex::new(VecDeque::new()),
            totals: Mutex::new(HashMap::new()),
        }
    }

    /// Recent samples, oldest first.
    #[must_use]
    pub fn recent(&self) -> Vec<CallSample> {
        self.samples.lock().iter().cloned().collect()
    }

    /// Aggregate counters per provider.
    #[must_use]
    pub fn totals(&self) -> HashMap<String, ProviderTotals> {
        self.totals.lock().clone()
    }
}

impl Default for InMemorySink {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl MetricsSink for InMemorySink {
    fn record(&self, sample: CallSample) {
        {
            let mut totals = self.totals.lock();
            let entry = totals.entry(sample.provider.clone()).or_default();
            entry.calls += 1;
            if !sample.success {
                entry.failures += 1;
            }
            entry.total_duration_ms += sample.duration_ms;
        }

        let mut samples = self.samples.lock();
        if samples.len() == self.max_samples {
            samples.pop_front();
        }
        samples.push_back(sample);
    }
}

/// Measure-and-forward wrapper for provider-facing calls.
#[derive(Clone)]
pub struct PerformanceTracker {
    sink: Arc<dyn MetricsSink>,
}

impl PerformanceTracker {
    /// Create a tracker forwarding to the given sink.
    #[must_use]
    pub fn new(sink: Arc<dyn MetricsSink>) -> Self {
        Self { sink }
    }

    /// Measure a completion call.
    ///
    /// Returns the wrapped future's result untouched.
    pub async fn track<T, F>(&self, ctx: CallContext, fut: F) -> GatewayResult<T>
    where
        F: Future<Output = GatewayResult<T>>,
    {
        let started = Instant::now();
        let result = fut.await;
        let duration = started.elapsed();

        self.sink.record(CallSample {
            timestamp: Utc::now(),
            provider: ctx.provider,
            model: ctx.model,
            operation: ctx.operation,
            caller_id: ctx.caller_id,
            success: result.is_ok(),
            duration_ms: duration.as_millis() as u64,
            time_to_first_chunk_ms: None,
            chunks: None,
            error: result.as_ref().err().map(|e| e.label().to_string()),
            temperature: ctx.temperature,
            max_tokens: ctx.max_tokens,
            top_p: ctx.top_p,
        });

        result
    }

    /// Interpose on a streaming call.
    ///
    /// Every item passes through with content and ordering unchanged; the
    /// wrapper times first-chunk latency and total duration and counts
    /// chunks. Exactly one sample is recorded per stream, even when the
    /// consumer drops it early after an error.
    #[must_use]
    pub fn track_stream(&self, ctx: CallContext, inner: ChunkStream) -> ChunkStream {
        let mut guard = StreamSampleGuard::new(Arc::clone(&self.sink), ctx);

        Box::pin(async_stream::stream! {
            let mut inner = inner;

            while let Some(item) = inner.next().await {
                match &item {
                    Ok(_) => guard.observe_chunk(),
                    Err(e) => guard.observe_error(e.label()),
                }
                yield item;
            }
            // The sample is recorded when the guard drops, here or on an
            // early consumer abort.
        })
    }
}

/// Records one sample when dropped, covering both natural stream end and
/// early aborts.
struct StreamSampleGuard {
    sink: Arc<dyn MetricsSink>,
    ctx: CallContext,
    started: Instant,
    first_chunk_ms: Option<u64>,
    chunks: usize,
    error: Option<String>,
}

impl StreamSampleGuard {
    fn new(sink: Arc<dyn MetricsSink>, ctx: CallContext) -> Self {
        Self {
            sink,
            ctx,
            started: Instant::now(),
            first_chunk_ms: None,
            chunks: 0,
            error: None,
        }
    }

    fn observe_chunk(&mut self) {
        if self.first_chunk_ms.is_none() {
            self.first_chunk_ms = Some(self.started.elapsed().as_millis() as u64);
        }
        self.chunks += 1;
    }

    fn observe_error(&mut self, label: &str) {
        self.error = Some(label.to_string());
    }
}

impl Drop for StreamSampleGuard {
    fn drop(&mut self) {
        self.sink.record(CallSample {
            timestamp: Utc::now(),
            provider: std::mem::take(&mut self.ctx.provider),
            model: std::mem::take(&mut self.ctx.model),
            operation: self.ctx.operation,
            caller_id: self.ctx.caller_id.take(),
            success: self.error.is_none(),
            duration_ms: self.started.elapsed().as_millis() as u64,
            time_to_first_chunk_ms: self.first_chunk_ms,
            chunks: Some(self.chunks),
            error: self.error.take(),
            temperature: self.ctx.temperature,
            max_tokens: self.ctx.max_tokens,
            top_p: self.ctx.top_p,
        });
    }
}

impl std::fmt::Debug for PerformanceTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PerformanceTracker").finish_non_exhaustive()
    }
}
