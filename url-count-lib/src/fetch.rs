//! Body fetching.
//!
//! Workers only depend on the [`Fetch`] trait. [`HttpFetcher`] is the
//! production implementation: a plain HTTP GET whose full body is buffered.

use crate::error::UrlCountError;
use std::future::Future;
use std::time::Duration;

/// Fetches the full body of a URL.
pub trait Fetch: Send + Sync + 'static {
    /// Return the body as text, or an error for any failed fetch.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, UrlCountError>> + Send;
}

/// HTTP GET fetcher backed by `reqwest`.
#[derive(Clone)]
pub struct HttpFetcher {
    /// HTTP client shared by all workers
    http_client: reqwest::Client,
    /// Per-request timeout, if any
    timeout: Option<Duration>,
}

impl HttpFetcher {
    /// Create a fetcher without a request timeout.
    pub fn new() -> Result<Self, UrlCountError> {
        Self::with_timeout(None)
    }

    /// Create a fetcher with an optional per-request timeout.
    pub fn with_timeout(timeout: Option<Duration>) -> Result<Self, UrlCountError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("url-count/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let http_client = builder.build().map_err(|e| {
            UrlCountError::internal(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            http_client,
            timeout,
        })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn classify(&self, url: &str, err: reqwest::Error) -> UrlCountError {
        match self.timeout {
            Some(duration) if err.is_timeout() => UrlCountError::timeout(url, duration),
            _ => UrlCountError::network(url, err.to_string()),
        }
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, UrlCountError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UrlCountError::http_status(url, status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| self.classify(url, e))?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetcher_keeps_timeout() {
        let fetcher = HttpFetcher::with_timeout(Some(Duration::from_secs(3))).unwrap();
        assert_eq!(fetcher.timeout(), Some(Duration::from_secs(3)));
        assert_eq!(HttpFetcher::new().unwrap().timeout(), None);
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        // Bind then drop a listener so the port is very likely closed.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher
            .fetch(&format!("http://127.0.0.1:{}/", port))
            .await
            .unwrap_err();
        assert!(matches!(err, UrlCountError::NetworkError { .. }));
        assert!(err.is_fetch_error());
    }
}
