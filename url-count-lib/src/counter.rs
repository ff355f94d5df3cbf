//! Main URL counter implementation.
//!
//! A run is made of three parts connected by a handoff channel:
//!
//! 1. The producer reads input lines, keeps the ones that look like URLs and
//!    sends one work item per URL. Each item carries a completion token.
//!    Once the input is exhausted it waits for every token, then sends the
//!    resulting [`Drained`] proof and closes the channel.
//! 2. The dispatcher takes one slot from the worker pool per item and spawns
//!    a worker. When it receives the proof it reads the accumulator.
//! 3. Each worker fetches its URL, counts the query, updates the accumulator,
//!    reports the per-URL count, signals its token and releases its slot.

use crate::concurrent::{Accumulator, CompletionGroup, CompletionToken, Drained, Slot, WorkerPool};
use crate::error::UrlCountError;
use crate::fetch::{Fetch, HttpFetcher};
use crate::report::Reporter;
use crate::types::{RunConfig, RunReport, Tally, UrlCount};
use crate::utils::{Query, UrlMatcher};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

/// One accepted URL on its way to a worker.
#[derive(Debug)]
struct WorkItem {
    url: String,
    token: CompletionToken,
}

/// Messages on the producer to dispatcher channel.
#[derive(Debug)]
enum Handoff {
    Work(WorkItem),
    Drained(Drained),
}

/// Everything a worker needs besides its item and slot.
struct WorkerContext<F: Fetch> {
    fetcher: Arc<F>,
    accumulator: Arc<Accumulator>,
    query: Query,
    reporter: Arc<dyn Reporter>,
}

impl<F: Fetch> Clone for WorkerContext<F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            accumulator: Arc::clone(&self.accumulator),
            query: self.query.clone(),
            reporter: Arc::clone(&self.reporter),
        }
    }
}

/// Counts a query substring across URLs read from a line source.
///
/// Every call to [`UrlCounter::run`] creates its own accumulator, worker pool
/// and completion group, so one counter can run any number of times.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use url_count_lib::{MemoryReporter, RunConfig, UrlCounter};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let counter = UrlCounter::with_config(RunConfig::default().with_query("rust"))?;
///     let reporter = Arc::new(MemoryReporter::new());
///     let report = counter
///         .run_lines(["https://www.rust-lang.org"], reporter.clone())
///         .await?;
///     println!("Total: {}", report.total);
///     Ok(())
/// }
/// ```
pub struct UrlCounter<F: Fetch = HttpFetcher> {
    config: RunConfig,
    matcher: UrlMatcher,
    query: Query,
    fetcher: Arc<F>,
}

impl UrlCounter<HttpFetcher> {
    /// Counter with the default configuration (5 workers, query "go").
    pub fn new() -> Result<Self, UrlCountError> {
        Self::with_config(RunConfig::default())
    }

    /// Counter fetching over HTTP with the given configuration.
    pub fn with_config(config: RunConfig) -> Result<Self, UrlCountError> {
        config.validate()?;
        let fetcher = HttpFetcher::with_timeout(config.timeout)?;
        Self::with_fetcher(config, fetcher)
    }
}

impl<F: Fetch> UrlCounter<F> {
    /// Counter using a custom fetcher.
    pub fn with_fetcher(config: RunConfig, fetcher: F) -> Result<Self, UrlCountError> {
        config.validate()?;
        let matcher = UrlMatcher::from_config(config.url_pattern.as_deref())?;
        let query = Query::new(&config.query)?;

        Ok(Self {
            config,
            matcher,
            query,
            fetcher: Arc::new(fetcher),
        })
    }

    /// Replace the URL predicate.
    pub fn with_matcher(mut self, matcher: UrlMatcher) -> Self {
        self.matcher = matcher;
        self
    }

    /// Get the configuration of this counter.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Read `input` to the end, fetch every URL and return the final report.
    ///
    /// Per-URL results go to `reporter` as workers finish. The report is
    /// returned only after every dispatched fetch has completed or failed.
    pub async fn run<R>(
        &self,
        input: R,
        reporter: Arc<dyn Reporter>,
    ) -> Result<RunReport, UrlCountError>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let started = Instant::now();
        let accumulator = Arc::new(Accumulator::new());
        let pool = WorkerPool::new(self.config.concurrency);
        let (handoff_tx, handoff_rx) = mpsc::channel(1);

        let producer = tokio::spawn(produce(input, self.matcher.clone(), handoff_tx));

        let context = WorkerContext {
            fetcher: Arc::clone(&self.fetcher),
            accumulator,
            query: self.query.clone(),
            reporter,
        };
        let dispatched = dispatch(handoff_rx, pool, context).await;

        if let Err(e) = producer.await {
            return Err(UrlCountError::internal(format!(
                "input producer failed: {}",
                e
            )));
        }

        let tally = dispatched?;
        debug!(
            total = tally.total,
            succeeded = tally.succeeded,
            failed = tally.failed,
            "run finished"
        );
        Ok(RunReport::from_tally(tally, started.elapsed()))
    }

    /// Convenience wrapper around [`UrlCounter::run`] for in-memory lines.
    pub async fn run_lines<I, S>(
        &self,
        lines: I,
        reporter: Arc<dyn Reporter>,
    ) -> Result<RunReport, UrlCountError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut buffer = String::new();
        for line in lines {
            buffer.push_str(line.as_ref());
            buffer.push('\n');
        }
        self.run(std::io::Cursor::new(buffer.into_bytes()), reporter)
            .await
    }
}

/// Producer: turn input lines into work items, then drain and close.
async fn produce<R>(mut input: R, matcher: UrlMatcher, handoff: mpsc::Sender<Handoff>)
where
    R: AsyncBufRead + Unpin,
{
    let group = CompletionGroup::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match input.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "failed to read input, treating as end of stream");
                break;
            }
        }

        let line = String::from_utf8_lossy(&buf);
        let url = line.trim();
        if !matcher.is_match(url) {
            trace!(line = %url, "skipping line");
            continue;
        }

        let item = WorkItem {
            url: url.to_string(),
            token: group.add(),
        };
        // The item, and with it the token, is dropped if the dispatcher is gone.
        if handoff.send(Handoff::Work(item)).await.is_err() {
            return;
        }
    }

    let drained = group.wait().await;
    let _ = handoff.send(Handoff::Drained(drained)).await;
}

/// Dispatcher: start one worker per item, bounded by the pool.
async fn dispatch<F: Fetch>(
    mut handoff: mpsc::Receiver<Handoff>,
    pool: WorkerPool,
    context: WorkerContext<F>,
) -> Result<Tally, UrlCountError> {
    while let Some(message) = handoff.recv().await {
        match message {
            Handoff::Work(item) => {
                let slot = pool.acquire().await?;
                debug!(url = %item.url, in_use = pool.in_use(), "dispatching worker");
                tokio::spawn(work(item, slot, context.clone()));
            }
            Handoff::Drained(drained) => {
                return Ok(context.accumulator.tally(&drained));
            }
        }
    }

    Err(UrlCountError::internal(
        "handoff channel closed before the run was drained",
    ))
}

/// Worker: fetch, count, accumulate, report, signal, release.
async fn work<F: Fetch>(item: WorkItem, slot: Slot, context: WorkerContext<F>) {
    let WorkItem { url, token } = item;

    match context.fetcher.fetch(&url).await {
        Ok(body) => {
            let count = context.query.count_in(&body);
            context.accumulator.add(count);
            context.reporter.report(&UrlCount { url, count });
        }
        Err(e) => {
            warn!(url = %url, error = %e, "fetch failed, dropping url");
            context.accumulator.record_failure();
        }
    }

    token.done();
    slot.release();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{MemoryReporter, NullReporter};
    use std::collections::HashMap;

    struct MapFetcher {
        bodies: HashMap<String, String>,
    }

    impl MapFetcher {
        fn new(bodies: &[(&str, &str)]) -> Self {
            Self {
                bodies: bodies
                    .iter()
                    .map(|(url, body)| (url.to_string(), body.to_string()))
                    .collect(),
            }
        }
    }

    impl Fetch for MapFetcher {
        async fn fetch(&self, url: &str) -> Result<String, UrlCountError> {
            self.bodies
                .get(url)
                .cloned()
                .ok_or_else(|| UrlCountError::network(url, "no such host"))
        }
    }

    #[tokio::test]
    async fn test_lines_are_trimmed_before_matching() {
        let fetcher = MapFetcher::new(&[("http://a.test", "go")]);
        let counter = UrlCounter::with_fetcher(RunConfig::default(), fetcher).unwrap();
        let reporter = Arc::new(MemoryReporter::new());

        let report = counter
            .run_lines(["   http://a.test \t", "\r"], reporter.clone())
            .await
            .unwrap();

        assert_eq!(report.total, 1);
        assert_eq!(reporter.results()[0].url, "http://a.test");
    }

    #[tokio::test]
    async fn test_crlf_input() {
        let fetcher = MapFetcher::new(&[("http://a.test", "gogo")]);
        let counter = UrlCounter::with_fetcher(RunConfig::default(), fetcher).unwrap();

        let input = std::io::Cursor::new(b"http://a.test\r\nnot a url\r\n".to_vec());
        let report = counter.run(input, Arc::new(NullReporter)).await.unwrap();
        assert_eq!(report.total, 2);
        assert_eq!(report.succeeded, 1);
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_does_not_stop_input() {
        let fetcher = MapFetcher::new(&[("http://b.test", "go")]);
        let counter = UrlCounter::with_fetcher(RunConfig::default(), fetcher).unwrap();

        let mut input = vec![0xff, 0xfe, b'\n'];
        input.extend_from_slice(b"http://b.test\n");
        let report = counter
            .run(std::io::Cursor::new(input), Arc::new(NullReporter))
            .await
            .unwrap();
        assert_eq!(report.total, 1);
    }

    #[test]
    fn test_with_fetcher_validates_config() {
        let fetcher = MapFetcher::new(&[]);
        let result = UrlCounter::with_fetcher(RunConfig::default().with_query(""), fetcher);
        assert!(matches!(result, Err(UrlCountError::InvalidQuery { .. })));

        let fetcher = MapFetcher::new(&[]);
        let result = UrlCounter::with_fetcher(
            RunConfig::default().with_url_pattern("(unclosed"),
            fetcher,
        );
        assert!(matches!(result, Err(UrlCountError::InvalidPattern { .. })));
    }
}
