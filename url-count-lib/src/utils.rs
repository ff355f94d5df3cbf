//! Line recognition and query counting helpers.
//!
//! `UrlMatcher` decides which input lines are dispatched as work items and
//! `Query` counts occurrences of the query substring in a fetched body.

use crate::error::UrlCountError;
use regex::Regex;

/// Built-in pattern for http(s) URLs.
///
/// The match is unanchored: any line containing a URL-shaped substring is
/// accepted and the whole trimmed line becomes the work item.
pub const URL_PATTERN: &str =
    r"https?://(www\.)?[-a-zA-Z0-9@:%._+~#=]{1,256}\.[a-z]{2,4}\b([-a-zA-Z0-9@:%_+.~#?&/=]*)";

lazy_static::lazy_static! {
    static ref DEFAULT_URL_REGEX: Regex =
        Regex::new(URL_PATTERN).expect("built-in URL pattern must compile");
}

/// Predicate deciding whether an input line looks like a URL.
#[derive(Debug, Clone)]
pub struct UrlMatcher {
    regex: Regex,
}

impl UrlMatcher {
    /// Matcher using the built-in http(s) pattern.
    pub fn new() -> Self {
        Self {
            regex: DEFAULT_URL_REGEX.clone(),
        }
    }

    /// Matcher using a caller supplied regular expression.
    pub fn with_pattern(pattern: &str) -> Result<Self, UrlCountError> {
        let regex = Regex::new(pattern)
            .map_err(|e| UrlCountError::invalid_pattern(pattern, e.to_string()))?;
        Ok(Self { regex })
    }

    /// Build the matcher described by an optional pattern override.
    pub fn from_config(pattern: Option<&str>) -> Result<Self, UrlCountError> {
        match pattern {
            Some(pattern) => Self::with_pattern(pattern),
            None => Ok(Self::new()),
        }
    }

    /// Whether `line` is recognized as a URL.
    pub fn is_match(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }

    /// The pattern this matcher uses.
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }
}

impl Default for UrlMatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Case-insensitive query substring.
///
/// The needle is lowercased once; bodies are lowercased per count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    needle: String,
}

impl Query {
    /// Create a query. Empty queries are rejected since every position of a
    /// body would match.
    pub fn new(query: &str) -> Result<Self, UrlCountError> {
        if query.is_empty() {
            return Err(UrlCountError::invalid_query("query must not be empty"));
        }

        Ok(Self {
            needle: query.to_lowercase(),
        })
    }

    /// Count non-overlapping occurrences of the query in `body`, ignoring case.
    pub fn count_in(&self, body: &str) -> u64 {
        body.to_lowercase().matches(self.needle.as_str()).count() as u64
    }

    /// The normalized (lowercased) query.
    pub fn as_str(&self) -> &str {
        &self.needle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matcher_accepts_urls() {
        let matcher = UrlMatcher::new();
        assert!(matcher.is_match("http://a.test"));
        assert!(matcher.is_match("https://golang.org"));
        assert!(matcher.is_match("https://www.rust-lang.org/learn?x=1&y=2"));
        assert!(matcher.is_match("http://example.com:8080/path/to/page"));
    }

    #[test]
    fn test_default_matcher_rejects_non_urls() {
        let matcher = UrlMatcher::new();
        assert!(!matcher.is_match("hello world"));
        assert!(!matcher.is_match("ftp://x.com"));
        assert!(!matcher.is_match("not a url"));
        assert!(!matcher.is_match(""));
        assert!(!matcher.is_match("http://"));
        assert!(!matcher.is_match("example.com"));
    }

    #[test]
    fn test_custom_pattern() {
        let matcher = UrlMatcher::with_pattern(r"^http://127\.0\.0\.1:\d+/").unwrap();
        assert!(matcher.is_match("http://127.0.0.1:8080/a"));
        assert!(!matcher.is_match("http://a.test"));
        assert_eq!(matcher.pattern(), r"^http://127\.0\.0\.1:\d+/");
    }

    #[test]
    fn test_invalid_pattern() {
        let err = UrlMatcher::with_pattern("http://(unclosed").unwrap_err();
        assert!(matches!(err, UrlCountError::InvalidPattern { .. }));
    }

    #[test]
    fn test_from_config() {
        assert_eq!(UrlMatcher::from_config(None).unwrap().pattern(), URL_PATTERN);
        assert_eq!(
            UrlMatcher::from_config(Some("^x$")).unwrap().pattern(),
            "^x$"
        );
    }

    #[test]
    fn test_count_is_case_insensitive() {
        let query = Query::new("go").unwrap();
        assert_eq!(query.count_in("go Go gO GO"), 4);

        let upper = Query::new("GO").unwrap();
        assert_eq!(upper.count_in("go Go gO GO"), 4);
        assert_eq!(upper.as_str(), "go");
    }

    #[test]
    fn test_count_is_non_overlapping() {
        assert_eq!(Query::new("go").unwrap().count_in("gogogo"), 3);
        assert_eq!(Query::new("aa").unwrap().count_in("aaaa"), 2);
        assert_eq!(Query::new("aa").unwrap().count_in("aaa"), 1);
    }

    #[test]
    fn test_count_without_matches() {
        let query = Query::new("rust").unwrap();
        assert_eq!(query.count_in(""), 0);
        assert_eq!(query.count_in("golang"), 0);
    }

    #[test]
    fn test_empty_query_rejected() {
        assert!(Query::new("").is_err());
    }
}
