//! Core collector trait and error taxonomy.

use std::time::Duration;

use strum_macros::{AsRefStr, Display};
use thiserror::Error;

use crate::metrics::{MetricDefinition, Sample};

/// Minimum allowed collection interval (1 second).
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Errors that can occur during a fetch.
///
/// Every failure a source can produce is folded into one of these variants
/// at the adapter boundary; the retry layer decides what to do based on the
/// variant's [`ErrorClass`] and nothing else.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// Source unreachable: connect/read timeout, refused or reset connection.
    #[error("connection error: {0}")]
    Connection(String),

    /// Bad or missing credentials (HTTP 401/403, database auth failure).
    #[error("authorization error: {0}")]
    Authorization(String),

    /// Target identifier does not exist (HTTP 404, unknown relation).
    #[error("target not found: {0}")]
    NotFound(String),

    /// Malformed or unexpected response shape.
    #[error("parse error: {0}")]
    Parse(String),

    /// Some expected fields were absent but the fetch otherwise succeeded.
    #[error("partial data: missing {}", .missing.join(", "))]
    PartialData { missing: Vec<String> },

    /// Anything that does not fit the classes above.
    #[error("unclassified error: {0}")]
    Other(String),
}

/// Closed classification of collector errors.
///
/// Only [`ErrorClass::Connection`] is retryable; every other class gets a
/// single attempt per cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorClass {
    Connection,
    Authorization,
    NotFound,
    Parse,
    PartialData,
    Other,
}

impl ErrorClass {
    /// Whether errors of this class are worth another attempt this cycle.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::Connection)
    }
}

impl CollectorError {
    /// Classify this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Connection(_) => ErrorClass::Connection,
            Self::Authorization(_) => ErrorClass::Authorization,
            Self::NotFound(_) => ErrorClass::NotFound,
            Self::Parse(_) => ErrorClass::Parse,
            Self::PartialData { .. } => ErrorClass::PartialData,
            Self::Other(_) => ErrorClass::Other,
        }
    }
}

/// Map a PostgreSQL SQLSTATE code to an error class.
///
/// 28xxx covers invalid authorization and bad passwords; 42P01 and 3D000
/// cover unknown relations and databases.
fn classify_sqlstate(code: &str) -> ErrorClass {
    if code.starts_with("28") {
        ErrorClass::Authorization
    } else if code == "42P01" || code == "3D000" {
        ErrorClass::NotFound
    } else {
        ErrorClass::Other
    }
}

impl From<sqlx::Error> for CollectorError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed => Self::Connection(err.to_string()),
            sqlx::Error::Database(db) => match db.code().as_deref().map(classify_sqlstate) {
                Some(ErrorClass::Authorization) => Self::Authorization(err.to_string()),
                Some(ErrorClass::NotFound) => Self::NotFound(err.to_string()),
                _ => Self::Other(err.to_string()),
            },
            sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::Decode(_)
            | sqlx::Error::TypeNotFound { .. } => Self::Parse(err.to_string()),
            _ => Self::Other(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for CollectorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            Self::Connection(err.to_string())
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Other(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CollectorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Core trait for implementing source adapters.
///
/// A collector declares its metrics once and is then polled by the
/// scheduler. `fetch()` returns whatever samples the source yielded this
/// cycle; returning a subset of the declared metrics is valid and leaves
/// the registry's existing values for the missing keys untouched.
///
/// Collectors hold their own connection handles (HTTP client, connection
/// pool) and are responsible for per-call timeouts. They never touch the
/// registry directly; the scheduler merges whatever they return.
#[async_trait::async_trait]
pub trait Collector: Send + Sync + 'static {
    /// Unique identifier for this collector instance.
    fn name(&self) -> &str;

    /// Metric definitions this collector can report.
    ///
    /// Declared once at startup; the registry is built from the union of
    /// all collectors' definitions.
    fn definitions(&self) -> Vec<MetricDefinition>;

    /// Perform one fetch against the source.
    async fn fetch(&self) -> Result<Vec<Sample>, CollectorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_class_retryable() {
        assert!(ErrorClass::Connection.is_retryable());
        assert!(!ErrorClass::Authorization.is_retryable());
        assert!(!ErrorClass::NotFound.is_retryable());
        assert!(!ErrorClass::Parse.is_retryable());
        assert!(!ErrorClass::PartialData.is_retryable());
        assert!(!ErrorClass::Other.is_retryable());
    }

    #[test]
    fn test_error_classification() {
        assert_eq!(
            CollectorError::Connection("refused".into()).class(),
            ErrorClass::Connection
        );
        assert_eq!(
            CollectorError::Authorization("401".into()).class(),
            ErrorClass::Authorization
        );
        assert_eq!(
            CollectorError::PartialData {
                missing: vec!["a".into()]
            }
            .class(),
            ErrorClass::PartialData
        );
    }

    #[test]
    fn test_classify_sqlstate() {
        assert_eq!(classify_sqlstate("28P01"), ErrorClass::Authorization);
        assert_eq!(classify_sqlstate("28000"), ErrorClass::Authorization);
        assert_eq!(classify_sqlstate("42P01"), ErrorClass::NotFound);
        assert_eq!(classify_sqlstate("3D000"), ErrorClass::NotFound);
        assert_eq!(classify_sqlstate("23505"), ErrorClass::Other);
    }

    #[test]
    fn test_class_display() {
        assert_eq!(ErrorClass::Connection.to_string(), "connection");
        assert_eq!(ErrorClass::NotFound.to_string(), "not_found");
        assert_eq!(ErrorClass::PartialData.to_string(), "partial_data");
    }

    #[test]
    fn test_partial_data_message() {
        let err = CollectorError::PartialData {
            missing: vec!["total_kills".into(), "matches_total".into()],
        };
        assert_eq!(
            err.to_string(),
            "partial data: missing total_kills, matches_total"
        );
    }
}
