//! url-count CLI Application
//!
//! Reads candidate URLs from stdin, one per line, fetches each one with a
//! bounded number of concurrent requests and prints how often the query
//! substring occurs in every body, followed by the grand total.

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use console::{style, Term};
use std::io::{IsTerminal, Write};
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use url_count_lib::{
    load_env_config, parse_timeout_string, ConfigManager, Reporter, RunConfig, RunReport,
    UrlCount, UrlCountError, UrlCounter, MAX_CONCURRENCY,
};

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for url-count
#[derive(Parser, Debug)]
#[command(name = "url-count")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Count a query substring across URLs read from stdin")]
#[command(
    long_about = "Read lines from stdin, fetch every line that looks like an http(s) URL and count case-insensitive occurrences of the query in each response body.\n\nPrints one 'Count for <url>: <n>' line per fetched URL as it completes, then 'Total: <n>'."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Maximum concurrent fetches [default: 5]
    #[arg(
        short = 'k',
        long = "concurrency",
        value_name = "K",
        help_heading = "Fetching"
    )]
    pub concurrency: Option<usize>,

    /// Per-request timeout, e.g. "5s", "2m" or "30"
    #[arg(long = "timeout", value_name = "DURATION", help_heading = "Fetching")]
    pub timeout: Option<String>,

    /// Substring to count, case-insensitive [default: go]
    #[arg(
        short = 'q',
        long = "query",
        value_name = "QUERY",
        help_heading = "Matching"
    )]
    pub query: Option<String>,

    /// Regular expression a line must match to be fetched
    #[arg(long = "url-pattern", value_name = "REGEX", help_heading = "Matching")]
    pub url_pattern: Option<String>,

    /// Print the final report as JSON instead of the "Total:" line
    #[arg(short = 'j', long = "json", help_heading = "Output Format")]
    pub json: bool,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Verbose logging on stderr
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

/// Prints one line per URL as workers finish.
struct StdoutReporter;

impl Reporter for StdoutReporter {
    fn report(&self, result: &UrlCount) {
        // A closed stdout must not take the workers down.
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{}", format_count_line(result));
    }
}

fn format_count_line(result: &UrlCount) -> String {
    format!("Count for {}: {}", result.url, result.count)
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = validate_args(&args) {
        print_error(&e);
        process::exit(1);
    }

    init_logging(args.verbose);

    if let Err(e) = run_url_count(args).await {
        print_error(&e.to_string());
        process::exit(1);
    }
}

fn print_error(message: &str) {
    if Term::stderr().is_term() {
        eprintln!("{} {}", style("Error:").red().bold().for_stderr(), message);
    } else {
        eprintln!("Error: {}", message);
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .init();
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    if let Some(concurrency) = args.concurrency {
        if concurrency == 0 || concurrency > MAX_CONCURRENCY {
            return Err(format!(
                "Concurrency must be between 1 and {}",
                MAX_CONCURRENCY
            ));
        }
    }

    if let Some(query) = &args.query {
        if query.is_empty() {
            return Err("Query must not be empty".to_string());
        }
    }

    if let Some(timeout) = &args.timeout {
        if parse_timeout_string(timeout).is_none() {
            return Err(format!(
                "Invalid timeout '{}', use format like '5s', '30s', '2m'",
                timeout
            ));
        }
    }

    Ok(())
}

/// Main counting logic
async fn run_url_count(args: Args) -> Result<(), UrlCountError> {
    let config = build_config(&args)?;
    tracing::debug!(
        concurrency = config.concurrency,
        query = %config.query,
        timeout = ?config.timeout,
        "starting run"
    );

    let counter = UrlCounter::with_config(config)?;

    if std::io::stdin().is_terminal() {
        let _ = Term::stderr()
            .write_line("Reading URLs from stdin, one per line. Press Ctrl-D to finish.");
    }

    let input = tokio::io::BufReader::new(tokio::io::stdin());
    let report = counter.run(input, Arc::new(StdoutReporter)).await?;

    print_report(&report, args.json)
}

fn print_report(report: &RunReport, json: bool) -> Result<(), UrlCountError> {
    let rendered = render_report(report, json)?;
    let mut out = std::io::stdout().lock();
    writeln!(out, "{}", rendered)?;
    out.flush()?;
    Ok(())
}

fn render_report(report: &RunReport, json: bool) -> Result<String, UrlCountError> {
    if json {
        serde_json::to_string_pretty(report)
            .map_err(|e| UrlCountError::internal(format!("Failed to serialize report: {}", e)))
    } else {
        Ok(format!("Total: {}", report.total))
    }
}

/// Build RunConfig from CLI arguments with config file integration.
///
/// Precedence order (highest to lowest):
/// 1. CLI arguments
/// 2. Environment variables (UC_*)
/// 3. Explicit config file (--config, then UC_CONFIG) or discovered files
/// 4. Built-in defaults
fn build_config(args: &Args) -> Result<RunConfig, UrlCountError> {
    let mut config = RunConfig::default();
    let config_manager = ConfigManager::new(args.verbose);
    let env_config = load_env_config();

    let explicit_path = args.config.as_ref().or(env_config.config.as_ref());
    if let Some(path) = explicit_path {
        tracing::debug!(path = %path, "using explicit config file");
        let file_config = config_manager.load_file(path).map_err(|e| {
            UrlCountError::config(format!("Failed to load config file '{}': {}", path, e))
        })?;
        config = file_config.apply_to(config);
    } else {
        config = config_manager.discover_and_load().apply_to(config);
    }

    config = env_config.apply_to(config);
    config = apply_cli_args_to_config(config, args);

    config.validate()?;
    Ok(config)
}

/// Apply CLI arguments to config (highest precedence).
///
/// Only flags the user actually passed override earlier layers.
fn apply_cli_args_to_config(mut config: RunConfig, args: &Args) -> RunConfig {
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(query) = &args.query {
        config.query = query.clone();
    }
    if let Some(secs) = args.timeout.as_deref().and_then(parse_timeout_string) {
        config.timeout = Some(Duration::from_secs(secs));
    }
    if let Some(pattern) = &args.url_pattern {
        config.url_pattern = Some(pattern.clone());
    }
    config
}
