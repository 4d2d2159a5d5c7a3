//! Cumulative usage accounting shared by the adapters.

use std::sync::atomic::{AtomicU64, Ordering};
use switchboard_core::{Usage, UsageData};

/// Lock-free accumulation of provider-reported token usage.
#[derive(Debug, Default)]
pub(crate) struct UsageCounters {
    requests: AtomicU64,
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
}

impl UsageCounters {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record one successful completion and its reported usage, if any.
    pub(crate) fn record(&self, usage: Option<Usage>) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if let Some(usage) = usage {
            self.prompt_tokens
                .fetch_add(u64::from(usage.prompt_tokens), Ordering::Relaxed);
            self.completion_tokens
                .fetch_add(u64::from(usage.completion_tokens), Ordering::Relaxed);
        }
    }

    /// Snapshot of the counters; `None` until the first recorded request.
    pub(crate) fn snapshot(&self) -> Option<UsageData> {
        let requests = self.requests.load(Ordering::Relaxed);
        if requests == 0 {
            return None;
        }
        let prompt_tokens = self.prompt_tokens.load(Ordering::Relaxed);
        let completion_tokens = self.completion_tokens.load(Ordering::Relaxed);
        Some(UsageData {
            requests,
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        })
    }
}
