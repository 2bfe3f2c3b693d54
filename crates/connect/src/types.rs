//! Types shared by the dispatcher and its listeners.

use serde::{Deserialize, Serialize};

/// Identifier the dispatcher assigns to every issued call.
///
/// Ids start at 1 and strictly increase for the lifetime of one
/// [`Connection`](crate::Connection). [`NOT_ISSUED`] is returned when the
/// connection is disabled.
pub type RequestId = u64;

/// Sentinel id for a call that was never issued.
pub const NOT_ISSUED: RequestId = 0;

/// One JSON object row as delivered by the API.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Expected shape of a successful response.
///
/// Calls carrying a response type are parsed and delivered as the matching
/// typed [`ConnectionEvent`](crate::ConnectionEvent); untagged calls are
/// delivered as a generic `Reply`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    StaticData,
    StatusInformation,
    SubscriptionData,
    SubscriptionChecksData,
    MissedSubscriptionChecksData,
    SingleUrlQueueData,
    ApiVersion,
}

/// Per-call metadata created at issuance and moved into the completion task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub id: RequestId,
    pub endpoint: String,
    pub response_type: Option<ResponseType>,
}

/// Classification of a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The server answered with a status other than 200
    Http,
    /// The transfer timeout elapsed
    Timeout,
    /// Connection, DNS or TLS handshake failure
    Connect,
    /// The request could not be built or sent
    Request,
    /// The response body could not be read
    Body,
    /// A 200 response whose body did not have the expected shape
    Parse,
    Other,
}

/// Why a call did not produce a successful completion event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFailure {
    /// HTTP status, when the server answered at all
    pub status: Option<u16>,
    pub kind: FailureKind,
    pub message: String,
}

impl RequestFailure {
    pub fn new(status: Option<u16>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
        }
    }

    /// Non-200 answer from the server.
    pub fn http(status: u16, body: &[u8]) -> Self {
        let text = String::from_utf8_lossy(body);
        let message = if text.trim().is_empty() {
            format!("HTTP {}", status)
        } else {
            format!("HTTP {}: {}", status, text.chars().take(200).collect::<String>())
        };
        Self::new(Some(status), FailureKind::Http, message)
    }

    /// 200 answer whose body did not parse.
    pub fn parse(status: u16, error: &serde_json::Error) -> Self {
        Self::new(
            Some(status),
            FailureKind::Parse,
            format!("Failed to parse response: {}", error),
        )
    }
}

impl std::fmt::Display for RequestFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{:?} ({}): {}", self.kind, status, self.message),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_failure_message_truncates_body() {
        let body = "x".repeat(500);
        let failure = RequestFailure::http(500, body.as_bytes());
        assert_eq!(failure.status, Some(500));
        assert_eq!(failure.kind, FailureKind::Http);
        assert!(failure.message.len() < 220);
    }

    #[test]
    fn test_http_failure_empty_body() {
        let failure = RequestFailure::http(404, b"");
        assert_eq!(failure.message, "HTTP 404");
    }
}
