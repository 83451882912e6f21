use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Remote authority endpoints, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `GET /stats/` - change marker
    Stats,
    /// `GET /door/` - full card directory
    Door,
    /// `POST /door/{card}/seen/` - scan notification
    Seen,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stats => "stats",
            Self::Door => "door",
            Self::Seen => "seen",
        };
        write!(f, "{name}")
    }
}

/// Errors that can occur while talking to the remote authority.
///
/// Every variant is transient from the controller's point of view: the
/// failed operation is logged and retried on the next cycle.
#[derive(Debug, Error)]
pub enum AuthorityError {
    /// The HTTP client could not be built
    #[error("HTTP client setup failed: {0}")]
    Client(#[source] reqwest::Error),

    /// The request did not complete in time
    #[error("{endpoint} request timed out after {}ms", .after.as_millis())]
    Timeout { endpoint: Endpoint, after: Duration },

    /// Connection, TLS or transport failure
    #[error("{endpoint} request failed: {source}")]
    Request {
        endpoint: Endpoint,
        #[source]
        source: reqwest::Error,
    },

    /// The authority answered with a non-success status
    #[error("{endpoint} request returned HTTP {status}")]
    Status { endpoint: Endpoint, status: u16 },

    /// The response body is not the JSON we expect
    #[error("{endpoint} response could not be decoded: {source}")]
    Decode {
        endpoint: Endpoint,
        #[source]
        source: serde_json::Error,
    },

    /// The status response lacks the change marker field
    #[error("{endpoint} response has no `{field}` field")]
    MissingField {
        endpoint: Endpoint,
        field: &'static str,
    },
}

impl AuthorityError {
    /// Endpoint the failure belongs to, if any.
    pub fn endpoint(&self) -> Option<Endpoint> {
        match self {
            Self::Client(_) => None,
            Self::Timeout { endpoint, .. }
            | Self::Request { endpoint, .. }
            | Self::Status { endpoint, .. }
            | Self::Decode { endpoint, .. }
            | Self::MissingField { endpoint, .. } => Some(*endpoint),
        }
    }
}

/// Specialized result type for authority operations
pub type AuthorityResult<T> = Result<T, AuthorityError>;
