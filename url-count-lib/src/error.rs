//! Error handling for URL counting runs.
//!
//! Fetch errors never abort a run: the worker records them and drops the
//! item. The remaining variants describe configuration problems detected
//! before a run starts, or a broken run protocol.

use std::fmt;

/// Main error type for url-count operations.
#[derive(Debug, Clone)]
pub enum UrlCountError {
    /// The URL recognition pattern failed to compile
    InvalidPattern {
        pattern: String,
        reason: String,
    },

    /// The query substring cannot be used for counting
    InvalidQuery {
        reason: String,
    },

    /// Network-related errors (connection refused, DNS, body read, etc.)
    NetworkError {
        url: String,
        message: String,
    },

    /// The server answered with a non-success status
    HttpStatus {
        url: String,
        status_code: u16,
    },

    /// A fetch exceeded the configured per-request timeout
    Timeout {
        url: String,
        duration: std::time::Duration,
    },

    /// Configuration errors (invalid settings, unparsable files, etc.)
    ConfigError {
        message: String,
    },

    /// File I/O errors when reading configuration
    FileError {
        path: String,
        message: String,
    },

    /// Generic internal errors, including a broken completion protocol
    Internal {
        message: String,
    },
}

impl UrlCountError {
    /// Create a new invalid pattern error.
    pub fn invalid_pattern<P: Into<String>, R: Into<String>>(pattern: P, reason: R) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Create a new invalid query error.
    pub fn invalid_query<R: Into<String>>(reason: R) -> Self {
        Self::InvalidQuery {
            reason: reason.into(),
        }
    }

    /// Create a new network error for `url`.
    pub fn network<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::NetworkError {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a new HTTP status error.
    pub fn http_status<U: Into<String>>(url: U, status_code: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status_code,
        }
    }

    /// Create a new timeout error.
    pub fn timeout<U: Into<String>>(url: U, duration: std::time::Duration) -> Self {
        Self::Timeout {
            url: url.into(),
            duration,
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error came from fetching a single URL.
    ///
    /// Fetch errors are absorbed by the worker; everything else is fatal
    /// for the run.
    pub fn is_fetch_error(&self) -> bool {
        matches!(
            self,
            Self::NetworkError { .. } | Self::HttpStatus { .. } | Self::Timeout { .. }
        )
    }
}

impl fmt::Display for UrlCountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPattern { pattern, reason } => {
                write!(f, "Invalid URL pattern '{}': {}", pattern, reason)
            }
            Self::InvalidQuery { reason } => {
                write!(f, "Invalid query: {}", reason)
            }
            Self::NetworkError { url, message } => {
                write!(f, "Network error for '{}': {}", url, message)
            }
            Self::HttpStatus { url, status_code } => {
                write!(f, "HTTP {} from '{}'", status_code, url)
            }
            Self::Timeout { url, duration } => {
                write!(f, "Timeout after {:?} fetching '{}'", duration, url)
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for UrlCountError {}

impl From<std::io::Error> for UrlCountError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}
