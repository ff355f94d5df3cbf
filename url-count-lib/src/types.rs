//! Core data types for URL counting runs.
//!
//! This module defines the run configuration, the per-URL result handed to
//! reporters, and the final report produced once every fetch has finished.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default maximum number of simultaneous fetches.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Upper bound accepted for the concurrency cap.
pub const MAX_CONCURRENCY: usize = 1000;

/// Default query substring.
pub const DEFAULT_QUERY: &str = "go";

/// Count of query occurrences for one successfully fetched URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlCount {
    /// The URL exactly as it was read (after trimming)
    pub url: String,

    /// Number of non-overlapping, case-insensitive occurrences of the query
    pub count: u64,
}

/// Totals accumulated by the workers of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    /// Sum of the per-URL counts of every successful fetch
    pub total: u64,

    /// Number of URLs fetched and counted
    pub succeeded: usize,

    /// Number of URLs whose fetch failed and were dropped from the total
    pub failed: usize,
}

/// Final report of a run, produced after every dispatched fetch finished.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Sum of all per-URL counts
    pub total: u64,

    /// Number of URLs that contributed to the total
    pub succeeded: usize,

    /// Number of URLs dropped because their fetch failed
    pub failed: usize,

    /// Wall-clock duration of the run
    #[serde(skip)]
    pub elapsed: Duration,
}

impl RunReport {
    pub(crate) fn from_tally(tally: Tally, elapsed: Duration) -> Self {
        Self {
            total: tally.total,
            succeeded: tally.succeeded,
            failed: tally.failed,
            elapsed,
        }
    }

    /// Number of URLs that were dispatched to a worker.
    pub fn dispatched(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Configuration for a counting run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Maximum number of simultaneous fetches (the worker pool capacity)
    /// Default: 5, Range: 1-1000
    pub concurrency: usize,

    /// Substring counted in every fetched body, case-insensitively
    /// Default: "go"
    pub query: String,

    /// Optional per-request timeout. `None` lets fetches run to completion.
    #[serde(skip)]
    pub timeout: Option<Duration>,

    /// Custom URL recognition pattern. `None` uses the built-in pattern.
    pub url_pattern: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            query: DEFAULT_QUERY.to_string(),
            timeout: None,
            url_pattern: None,
        }
    }
}

impl RunConfig {
    /// Set the concurrency cap.
    ///
    /// Values are kept as given; `validate` rejects anything outside 1-1000.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the query substring.
    pub fn with_query<Q: Into<String>>(mut self, query: Q) -> Self {
        self.query = query.into();
        self
    }

    /// Set a per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Replace the built-in URL pattern.
    pub fn with_url_pattern<P: Into<String>>(mut self, pattern: P) -> Self {
        self.url_pattern = Some(pattern.into());
        self
    }

    /// Check the configuration before starting a run.
    pub fn validate(&self) -> Result<(), crate::UrlCountError> {
        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            return Err(crate::UrlCountError::config(format!(
                "Concurrency must be between 1 and {}",
                MAX_CONCURRENCY
            )));
        }

        if self.query.is_empty() {
            return Err(crate::UrlCountError::invalid_query(
                "query must not be empty",
            ));
        }

        if let Some(timeout) = self.timeout {
            if timeout.is_zero() {
                return Err(crate::UrlCountError::config("Timeout must be positive"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RunConfig::default();
        assert_eq!(config.concurrency, 5);
        assert_eq!(config.query, "go");
        assert!(config.timeout.is_none());
        assert!(config.url_pattern.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(RunConfig::default().with_concurrency(0).validate().is_err());
        assert!(RunConfig::default()
            .with_concurrency(MAX_CONCURRENCY + 1)
            .validate()
            .is_err());
        assert!(RunConfig::default().with_query("").validate().is_err());
        assert!(RunConfig::default()
            .with_timeout(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn test_report_from_tally() {
        let tally = Tally {
            total: 7,
            succeeded: 2,
            failed: 1,
        };
        let report = RunReport::from_tally(tally, Duration::from_millis(10));
        assert_eq!(report.total, 7);
        assert_eq!(report.dispatched(), 3);

        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(json, r#"{"total":7,"succeeded":2,"failed":1}"#);
    }
}
