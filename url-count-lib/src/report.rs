//! Per-URL result sinks.

use crate::types::UrlCount;
use std::sync::Mutex;

/// Receives one result per successfully processed URL.
///
/// Workers call `report` concurrently and in completion order.
pub trait Reporter: Send + Sync + 'static {
    fn report(&self, result: &UrlCount);
}

/// Reporter that keeps every result in memory.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    results: Mutex<Vec<UrlCount>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Results received so far, in the order they were reported.
    pub fn results(&self) -> Vec<UrlCount> {
        self.results
            .lock()
            .map(|results| results.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Results sorted by URL, for order-independent comparisons.
    pub fn sorted_results(&self) -> Vec<UrlCount> {
        let mut results = self.results();
        results.sort_by(|a, b| a.url.cmp(&b.url));
        results
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, result: &UrlCount) {
        match self.results.lock() {
            Ok(mut results) => results.push(result.clone()),
            Err(poisoned) => poisoned.into_inner().push(result.clone()),
        }
    }
}

/// Reporter that ignores every result.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&self, _result: &UrlCount) {}
}
