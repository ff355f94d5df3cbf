//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files and
//! environment variables, and merging them with proper precedence rules:
//! defaults < config files < `UC_*` environment variables < CLI flags.

use crate::error::UrlCountError;
use crate::types::{RunConfig, MAX_CONCURRENCY};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Default values for CLI options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,
}

/// Default configuration values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DefaultsConfig {
    /// Default concurrency cap
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// Default query substring
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    /// Default per-request timeout (as string, e.g., "5s", "2m")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// Default URL recognition pattern
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_pattern: Option<String>,
}

/// Configuration discovery and loading functionality.
pub struct ConfigManager {
    /// Whether to emit warnings for config issues
    pub verbose: bool,
}

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Load configuration from a specific file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, UrlCountError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(UrlCountError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            UrlCountError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            UrlCountError::config(format!("Failed to parse TOML configuration: {}", e))
        })?;

        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// The XDG config file is loaded first, a file in the current directory
    /// last; later files override earlier ones field by field. Files that
    /// fail to load are skipped with a warning.
    pub fn discover_and_load(&self) -> FileConfig {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [self.get_xdg_config_path(), self.get_local_config_path()];
        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged_config = self.merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "ignoring config file");
                }
            }
        }

        if self.verbose {
            for path in &loaded_files {
                tracing::info!(path = %path.display(), "loaded config file");
            }
        }

        merged_config
    }

    /// Get the local configuration file path.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        let candidates = ["./url-count.toml", "./.url-count.toml"];

        candidates
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    /// Get the XDG configuration file path.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("url-count").join("config.toml");
        if path.exists() {
            Some(path)
        } else {
            None
        }
    }

    /// Merge two configurations; values from `higher` win.
    fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(mut lower_defaults), Some(higher_defaults)) => {
                    if higher_defaults.concurrency.is_some() {
                        lower_defaults.concurrency = higher_defaults.concurrency;
                    }
                    if higher_defaults.query.is_some() {
                        lower_defaults.query = higher_defaults.query;
                    }
                    if higher_defaults.timeout.is_some() {
                        lower_defaults.timeout = higher_defaults.timeout;
                    }
                    if higher_defaults.url_pattern.is_some() {
                        lower_defaults.url_pattern = higher_defaults.url_pattern;
                    }
                    Some(lower_defaults)
                }
                (None, Some(higher_defaults)) => Some(higher_defaults),
                (Some(lower_defaults), None) => Some(lower_defaults),
                (None, None) => None,
            },
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), UrlCountError> {
        if let Some(defaults) = &config.defaults {
            if let Some(concurrency) = defaults.concurrency {
                if concurrency == 0 || concurrency > MAX_CONCURRENCY {
                    return Err(UrlCountError::config(format!(
                        "Concurrency must be between 1 and {}",
                        MAX_CONCURRENCY
                    )));
                }
            }

            if let Some(query) = &defaults.query {
                if query.is_empty() {
                    return Err(UrlCountError::config("Query must not be empty"));
                }
            }

            if let Some(timeout_str) = &defaults.timeout {
                if parse_timeout_string(timeout_str).is_none() {
                    return Err(UrlCountError::config(format!(
                        "Invalid timeout format '{}'. Use format like '5s', '30s', '2m'",
                        timeout_str
                    )));
                }
            }

            if let Some(pattern) = &defaults.url_pattern {
                regex::Regex::new(pattern)
                    .map_err(|e| UrlCountError::invalid_pattern(pattern, e.to_string()))?;
            }
        }

        Ok(())
    }
}

impl FileConfig {
    /// Apply the `[defaults]` table on top of `config`.
    pub fn apply_to(&self, mut config: RunConfig) -> RunConfig {
        if let Some(defaults) = &self.defaults {
            if let Some(concurrency) = defaults.concurrency {
                config.concurrency = concurrency;
            }
            if let Some(query) = &defaults.query {
                config.query = query.clone();
            }
            if let Some(timeout) = defaults.timeout.as_deref().and_then(parse_timeout_string) {
                config.timeout = Some(Duration::from_secs(timeout));
            }
            if let Some(pattern) = &defaults.url_pattern {
                config.url_pattern = Some(pattern.clone());
            }
        }
        config
    }
}

/// Environment variable configuration that mirrors CLI options.
///
/// This represents configuration values that can be set via UC_* environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub concurrency: Option<usize>,
    pub query: Option<String>,
    pub timeout: Option<String>,
    pub url_pattern: Option<String>,
    pub config: Option<String>,
}

impl EnvConfig {
    /// Apply the environment values on top of `config`.
    pub fn apply_to(&self, mut config: RunConfig) -> RunConfig {
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(query) = &self.query {
            config.query = query.clone();
        }
        if let Some(timeout) = self.timeout.as_deref().and_then(parse_timeout_string) {
            config.timeout = Some(Duration::from_secs(timeout));
        }
        if let Some(pattern) = &self.url_pattern {
            config.url_pattern = Some(pattern.clone());
        }
        config
    }
}

/// Load configuration from environment variables.
///
/// Parses all UC_* environment variables. Invalid values are logged as
/// warnings and ignored.
pub fn load_env_config() -> EnvConfig {
    env_config_from(|key| env::var(key).ok())
}

fn env_config_from<F>(lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    // UC_CONCURRENCY - concurrent fetches
    if let Some(val) = lookup("UC_CONCURRENCY") {
        match val.trim().parse::<usize>() {
            Ok(concurrency) if concurrency > 0 && concurrency <= MAX_CONCURRENCY => {
                tracing::debug!(concurrency, "using UC_CONCURRENCY");
                env_config.concurrency = Some(concurrency);
            }
            _ => {
                tracing::warn!(
                    "Invalid UC_CONCURRENCY='{}', must be 1-{}",
                    val,
                    MAX_CONCURRENCY
                );
            }
        }
    }

    // UC_QUERY - query substring
    if let Some(query) = lookup("UC_QUERY") {
        if query.is_empty() {
            tracing::warn!("Ignoring empty UC_QUERY");
        } else {
            tracing::debug!(query = %query, "using UC_QUERY");
            env_config.query = Some(query);
        }
    }

    // UC_TIMEOUT - per-request timeout
    if let Some(timeout_str) = lookup("UC_TIMEOUT") {
        if parse_timeout_string(&timeout_str).is_some() {
            tracing::debug!(timeout = %timeout_str, "using UC_TIMEOUT");
            env_config.timeout = Some(timeout_str);
        } else {
            tracing::warn!(
                "Invalid UC_TIMEOUT='{}', use format like '5s', '30s', '2m'",
                timeout_str
            );
        }
    }

    // UC_URL_PATTERN - URL recognition regex
    if let Some(pattern) = lookup("UC_URL_PATTERN") {
        match regex::Regex::new(&pattern) {
            Ok(_) => env_config.url_pattern = Some(pattern),
            Err(e) => tracing::warn!("Invalid UC_URL_PATTERN='{}': {}", pattern, e),
        }
    }

    // UC_CONFIG - explicit config file
    if let Some(path) = lookup("UC_CONFIG") {
        if !path.trim().is_empty() {
            env_config.config = Some(path);
        }
    }

    env_config
}

/// Parse a timeout string like "5s", "30s", "2m" into seconds.
///
/// Returns `None` for unparsable strings and for zero.
pub fn parse_timeout_string(timeout_str: &str) -> Option<u64> {
    let timeout_str = timeout_str.trim().to_lowercase();

    let seconds = if let Some(secs) = timeout_str.strip_suffix('s') {
        secs.parse::<u64>().ok()
    } else if let Some(mins) = timeout_str.strip_suffix('m') {
        mins.parse::<u64>().ok().and_then(|m| m.checked_mul(60))
    } else {
        // Assume seconds if no unit
        timeout_str.parse::<u64>().ok()
    };

    seconds.filter(|s| *s > 0)
}
