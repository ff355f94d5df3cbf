//! # url-count library
//!
//! Reads candidate lines, fetches every line that looks like a URL through a
//! bounded worker pool, and counts case-insensitive occurrences of a query
//! substring in each body.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use url_count_lib::{MemoryReporter, RunConfig, UrlCounter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let counter = UrlCounter::with_config(RunConfig::default().with_concurrency(2))?;
//!     let reporter = Arc::new(MemoryReporter::new());
//!     let input = tokio::io::BufReader::new(tokio::io::stdin());
//!     let report = counter.run(input, reporter.clone()).await?;
//!
//!     for result in reporter.results() {
//!         println!("Count for {}: {}", result.url, result.count);
//!     }
//!     println!("Total: {}", report.total);
//!     Ok(())
//! }
//! ```
//!
//! ## Guarantees
//!
//! - At most `concurrency` fetches are in flight at any time.
//! - The report is produced only after every dispatched fetch has finished.
//! - Failed fetches are logged, counted in [`RunReport::failed`] and
//!   contribute nothing to the total.

// Re-export main public API types and functions
pub use concurrent::{Accumulator, CompletionGroup, CompletionToken, Drained, Slot, WorkerPool};
pub use config::{
    load_env_config, parse_timeout_string, ConfigManager, DefaultsConfig, EnvConfig, FileConfig,
};
pub use counter::UrlCounter;
pub use error::UrlCountError;
pub use fetch::{Fetch, HttpFetcher};
pub use report::{MemoryReporter, NullReporter, Reporter};
pub use types::{
    RunConfig, RunReport, Tally, UrlCount, DEFAULT_CONCURRENCY, DEFAULT_QUERY, MAX_CONCURRENCY,
};
pub use utils::{Query, UrlMatcher, URL_PATTERN};

mod concurrent;
mod config;
mod counter;
mod error;
mod fetch;
mod report;
mod types;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, UrlCountError>;

// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
