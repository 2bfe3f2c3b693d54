//! HTTP transport used by the dispatcher.
//!
//! The dispatcher only ever hands a fully described [`HttpCall`] to a
//! [`Transport`]; the default implementation executes it with `reqwest`.

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{ConnectError, Result};
use crate::types::{FailureKind, RequestFailure};

/// Header carrying the hydownloader access key.
pub const ACCESS_KEY_HEADER: &str = "HyDownloader-Access-Key";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// A fully described call, snapshotting the connection settings at issuance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpCall {
    pub method: HttpMethod,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub access_key: String,
    /// JSON body for POST calls
    pub body: Option<Vec<u8>>,
    pub verify_certificates: bool,
    pub https_only: bool,
    pub timeout: Duration,
}

impl HttpCall {
    /// Parsed JSON body, if any.
    pub fn json_body(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .and_then(|body| serde_json::from_slice(body).ok())
    }
}

/// Raw answer from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok_json(value: &serde_json::Value) -> Self {
        Self::new(200, value.to_string())
    }
}

/// Executes calls issued by the dispatcher.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the call. Any HTTP answer, including non-200 ones, is `Ok`;
    /// `Err` means no usable answer was received.
    async fn execute(&self, call: HttpCall) -> Result<HttpResponse>;
}

/// Map a transport error onto the failure reported to listeners.
pub fn classify_error(error: &ConnectError) -> RequestFailure {
    let kind = match error {
        ConnectError::Http(e) if e.is_timeout() => FailureKind::Timeout,
        ConnectError::Http(e) if e.is_connect() => FailureKind::Connect,
        ConnectError::Http(e) if e.is_body() || e.is_decode() => FailureKind::Body,
        ConnectError::Http(e) if e.is_request() || e.is_builder() => FailureKind::Request,
        ConnectError::Http(_) => FailureKind::Other,
        ConnectError::Json(_) => FailureKind::Parse,
        ConnectError::InvalidUrl(_) | ConnectError::InvalidHeader(_) => FailureKind::Request,
        ConnectError::Transport(_) => FailureKind::Connect,
        ConnectError::Runtime(_) => FailureKind::Other,
    };
    RequestFailure::new(None, kind, error.to_string())
}

/// `reqwest`-backed transport.
///
/// `reqwest` fixes TLS policy per client, so one client is kept for each
/// (verify, https-only) combination the connection has used.
#[derive(Debug, Default)]
pub struct HttpTransport {
    clients: Mutex<HashMap<(bool, bool), reqwest::Client>>,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn client(&self, verify_certificates: bool, https_only: bool) -> Result<reqwest::Client> {
        let mut clients = self
            .clients
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(client) = clients.get(&(verify_certificates, https_only)) {
            return Ok(client.clone());
        }
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(!verify_certificates)
            .https_only(https_only)
            .build()?;
        clients.insert((verify_certificates, https_only), client.clone());
        Ok(client)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, call: HttpCall) -> Result<HttpResponse> {
        let client = self.client(call.verify_certificates, call.https_only)?;

        let mut url = reqwest::Url::parse(&call.url)
            .map_err(|e| ConnectError::invalid_url(format!("{}: {}", call.url, e)))?;
        if !call.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &call.query {
                pairs.append_pair(key, value);
            }
        }

        let access_key = HeaderValue::from_str(&call.access_key)
            .map_err(|_| ConnectError::invalid_header("Invalid access key format"))?;

        debug!("[HttpTransport] {:?} {}", call.method, url);

        let request = match call.method {
            HttpMethod::Get => client.get(url),
            HttpMethod::Post => client
                .post(url)
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(call.body.unwrap_or_else(|| b"{}".to_vec())),
        };

        let response = request
            .header(ACCESS_KEY_HEADER, access_key)
            .timeout(call.timeout)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?;
        debug!("[HttpTransport] Response ({}): {} bytes", status, body.len());

        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_invalid_header_as_request_failure() {
        let failure = classify_error(&ConnectError::invalid_header("bad"));
        assert_eq!(failure.kind, FailureKind::Request);
        assert_eq!(failure.status, None);
    }

    #[test]
    fn test_classify_json_as_parse_failure() {
        let error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let failure = classify_error(&ConnectError::Json(error));
        assert_eq!(failure.kind, FailureKind::Parse);
    }

    #[test]
    fn test_classify_transport_as_connect_failure() {
        let failure = classify_error(&ConnectError::transport("connection reset by peer"));
        assert_eq!(failure.kind, FailureKind::Connect);
        assert!(failure.message.contains("connection reset by peer"));
    }

    #[tokio::test]
    async fn test_invalid_url_is_reported() {
        let transport = HttpTransport::new();
        let call = HttpCall {
            method: HttpMethod::Post,
            url: "not a url/get_status_info".to_string(),
            query: Vec::new(),
            access_key: "key".to_string(),
            body: None,
            verify_certificates: true,
            https_only: false,
            timeout: Duration::from_secs(1),
        };
        let error = transport.execute(call).await.unwrap_err();
        assert!(matches!(error, ConnectError::InvalidUrl(_)));
    }

    #[test]
    fn test_json_body_roundtrips() {
        let call = HttpCall {
            method: HttpMethod::Post,
            url: "http://localhost/x".to_string(),
            query: Vec::new(),
            access_key: String::new(),
            body: Some(br#"{"ids":[1]}"#.to_vec()),
            verify_certificates: true,
            https_only: false,
            timeout: Duration::from_secs(1),
        };
        assert_eq!(call.json_body(), Some(serde_json::json!({"ids": [1]})));
    }
}
