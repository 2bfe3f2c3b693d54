//! Request dispatcher for the hydownloader API.
//!
//! Every issuing method returns a [`RequestId`] immediately and performs the
//! call in the background; the outcome arrives later as exactly one
//! [`ConnectionEvent`] on every [`EventReceiver`] obtained from
//! [`Connection::subscribe`].

use log::{debug, warn};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::runtime::Handle;

use crate::config::ConnectionConfig;
use crate::error::{ConnectError, Result};
use crate::events::{ConnectionEvent, EventHub, EventReceiver};
use crate::transport::{classify_error, HttpCall, HttpMethod, HttpResponse, HttpTransport, Transport};
use crate::types::{Record, RequestContext, RequestFailure, RequestId, ResponseType, NOT_ISSUED};

/// Dispatcher for hydownloader API calls.
///
/// Cloning is cheap and yields a handle to the same connection: same request
/// id counter, same configuration, same listeners.
///
/// # Example
///
/// ```ignore
/// let connection = Connection::new(ConnectionConfig::new("https://127.0.0.1:53211", "key"))?;
/// let mut events = connection.subscribe();
/// let id = connection.request_status_information();
/// while let Some(event) = events.recv().await {
///     if event.request_id() == Some(id) {
///         break;
///     }
/// }
/// ```
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

struct ConnectionInner {
    config: RwLock<ConnectionConfig>,
    transport: Arc<dyn Transport>,
    runtime: Handle,
    request_id_counter: AtomicU64,
    events: EventHub,
}

#[derive(Debug, serde::Deserialize)]
struct ApiVersionResponse {
    version: i64,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("api_url", &self.api_url())
            .field("enabled", &self.enabled())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Create a connection that talks HTTP through `reqwest`.
    ///
    /// Must be called from within a Tokio runtime; that runtime drives every
    /// call the connection issues.
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        Self::with_transport(config, Arc::new(HttpTransport::new()))
    }

    /// Create a connection on top of a custom transport.
    pub fn with_transport(config: ConnectionConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| ConnectError::Runtime(format!("No Tokio runtime available: {}", e)))?;

        Ok(Self {
            inner: Arc::new(ConnectionInner {
                config: RwLock::new(config),
                transport,
                runtime,
                request_id_counter: AtomicU64::new(0),
                events: EventHub::default(),
            }),
        })
    }

    /// Start listening to this connection's events.
    pub fn subscribe(&self) -> EventReceiver {
        self.inner.events.subscribe()
    }

    /// Whether both handles refer to the same underlying connection.
    pub fn same_connection(&self, other: &Connection) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration
    // ─────────────────────────────────────────────────────────────────────────

    pub fn config(&self) -> ConnectionConfig {
        self.read_config().clone()
    }

    pub fn enabled(&self) -> bool {
        self.read_config().enabled
    }

    pub fn api_url(&self) -> String {
        self.read_config().api_url.clone()
    }

    pub fn access_key(&self) -> String {
        self.read_config().access_key.clone()
    }

    pub fn is_strict_transport_security_enabled(&self) -> bool {
        self.read_config().strict_transport_security
    }

    pub fn is_certificate_verification_enabled(&self) -> bool {
        self.read_config().verify_certificates
    }

    pub fn transfer_timeout(&self) -> Duration {
        self.read_config().transfer_timeout
    }

    pub fn set_api_url(&self, url: impl Into<String>) {
        self.write_config().api_url = url.into();
    }

    pub fn set_access_key(&self, key: impl Into<String>) {
        self.write_config().access_key = key.into();
    }

    pub fn set_strict_transport_security_enabled(&self, enabled: bool) {
        self.write_config().strict_transport_security = enabled;
    }

    pub fn set_certificate_verification_enabled(&self, enabled: bool) {
        self.write_config().verify_certificates = enabled;
    }

    pub fn set_transfer_timeout(&self, timeout: Duration) {
        self.write_config().transfer_timeout = timeout;
    }

    /// Flip the master switch. Emits `EnabledChanged` only on an actual change.
    ///
    /// Disabling only stops new calls; calls already in flight still complete.
    pub fn set_enabled(&self, enabled: bool) {
        let changed = {
            let mut config = self.write_config();
            let changed = config.enabled != enabled;
            config.enabled = enabled;
            changed
        };
        if changed {
            debug!("[Connection] enabled = {}", enabled);
            self.inner.events.publish(ConnectionEvent::EnabledChanged(enabled));
        }
    }

    /// Replace the whole configuration, keeping the `EnabledChanged` contract.
    pub fn set_config(&self, config: ConnectionConfig) {
        let enabled = config.enabled;
        {
            let mut current = self.write_config();
            let keep_enabled = current.enabled;
            *current = ConnectionConfig {
                enabled: keep_enabled,
                ..config
            };
        }
        self.set_enabled(enabled);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Data Requests
    // ─────────────────────────────────────────────────────────────────────────

    /// POST /subscription_data_to_url
    pub fn request_url_for_subscription_data(&self, downloader: &str, keywords: &str) -> RequestId {
        self.post(
            "/subscription_data_to_url",
            Some(json!({ "downloader": downloader, "keywords": keywords })),
            None,
        )
    }

    /// POST /urls_last_files
    pub fn request_last_files_for_urls(&self, url_ids: &[i64]) -> RequestId {
        self.post("/urls_last_files", Some(json!({ "ids": url_ids })), None)
    }

    /// POST /subscriptions_last_files
    pub fn request_last_files_for_subscriptions(&self, subscription_ids: &[i64]) -> RequestId {
        self.post(
            "/subscriptions_last_files",
            Some(json!({ "ids": subscription_ids })),
            None,
        )
    }

    /// GET /{file_path}; a missing leading slash is added.
    pub fn request_static_data(&self, file_path: &str) -> RequestId {
        let path = if file_path.starts_with('/') {
            file_path.to_string()
        } else {
            format!("/{}", file_path)
        };
        self.get(&path, Vec::new(), Some(ResponseType::StaticData))
    }

    /// POST /get_status_info
    pub fn request_status_information(&self) -> RequestId {
        self.post("/get_status_info", None, Some(ResponseType::StatusInformation))
    }

    /// POST /get_subscriptions
    pub fn request_subscription_data(&self) -> RequestId {
        self.post("/get_subscriptions", None, Some(ResponseType::SubscriptionData))
    }

    /// POST /get_subscription_checks
    pub fn request_subscription_checks_data(
        &self,
        subscription_ids: &[i64],
        show_archived: bool,
    ) -> RequestId {
        self.post(
            "/get_subscription_checks",
            Some(json!({ "ids": subscription_ids, "archived": show_archived })),
            Some(ResponseType::SubscriptionChecksData),
        )
    }

    /// POST /get_missed_subscription_checks
    pub fn request_missed_subscription_checks_data(
        &self,
        subscription_ids: &[i64],
        show_archived: bool,
    ) -> RequestId {
        self.post(
            "/get_missed_subscription_checks",
            Some(json!({ "ids": subscription_ids, "archived": show_archived })),
            Some(ResponseType::MissedSubscriptionChecksData),
        )
    }

    /// POST /get_queued_urls
    pub fn request_single_url_queue_data(&self, show_archived: bool) -> RequestId {
        self.post(
            "/get_queued_urls",
            Some(json!({ "archived": show_archived })),
            Some(ResponseType::SingleUrlQueueData),
        )
    }

    /// POST /api_version
    pub fn request_api_version(&self) -> RequestId {
        self.post("/api_version", None, Some(ResponseType::ApiVersion))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// POST /delete_urls
    pub fn delete_urls(&self, ids: &[i64]) -> RequestId {
        self.post("/delete_urls", Some(json!({ "ids": ids })), None)
    }

    /// POST /delete_subscriptions
    pub fn delete_subscriptions(&self, ids: &[i64]) -> RequestId {
        self.post("/delete_subscriptions", Some(json!({ "ids": ids })), None)
    }

    /// POST /add_or_update_urls
    pub fn add_or_update_urls(&self, records: Vec<Record>) -> RequestId {
        self.post("/add_or_update_urls", Some(records_body(records)), None)
    }

    /// POST /add_or_update_subscriptions
    pub fn add_or_update_subscriptions(&self, records: Vec<Record>) -> RequestId {
        self.post("/add_or_update_subscriptions", Some(records_body(records)), None)
    }

    /// POST /add_or_update_subscription_checks
    pub fn add_or_update_subscription_checks(&self, records: Vec<Record>) -> RequestId {
        self.post(
            "/add_or_update_subscription_checks",
            Some(records_body(records)),
            None,
        )
    }

    /// POST /add_or_update_missed_subscription_checks
    pub fn add_or_update_missed_subscription_checks(&self, records: Vec<Record>) -> RequestId {
        self.post(
            "/add_or_update_missed_subscription_checks",
            Some(records_body(records)),
            None,
        )
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Daemon Control
    // ─────────────────────────────────────────────────────────────────────────

    pub fn pause_subscriptions(&self) -> RequestId {
        self.post("/pause_subscriptions", None, None)
    }

    pub fn resume_subscriptions(&self) -> RequestId {
        self.post("/resume_subscriptions", None, None)
    }

    pub fn pause_single_url_queue(&self) -> RequestId {
        self.post("/pause_single_urls", None, None)
    }

    pub fn resume_single_url_queue(&self) -> RequestId {
        self.post("/resume_single_urls", None, None)
    }

    /// POST /run_tests with the site list joined by commas.
    pub fn run_tests<S: AsRef<str>>(&self, sites: &[S]) -> RequestId {
        let sites = sites.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(",");
        self.post("/run_tests", Some(json!({ "sites": sites })), None)
    }

    pub fn run_report(&self, verbose: bool) -> RequestId {
        self.post("/run_report", Some(json!({ "verbose": verbose })), None)
    }

    pub fn stop_current_subscription(&self) -> RequestId {
        self.post("/kill_current_sub", None, None)
    }

    pub fn stop_current_url(&self) -> RequestId {
        self.post("/kill_current_url", None, None)
    }

    pub fn shutdown(&self) -> RequestId {
        self.post("/shutdown", None, None)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Dispatch
    // ─────────────────────────────────────────────────────────────────────────

    fn post(&self, endpoint: &str, body: Option<Value>, response_type: Option<ResponseType>) -> RequestId {
        let body = body.unwrap_or_else(|| json!({})).to_string().into_bytes();
        self.issue(endpoint, HttpMethod::Post, Vec::new(), Some(body), response_type)
    }

    fn get(
        &self,
        endpoint: &str,
        query: Vec<(String, String)>,
        response_type: Option<ResponseType>,
    ) -> RequestId {
        self.issue(endpoint, HttpMethod::Get, query, None, response_type)
    }

    fn issue(
        &self,
        endpoint: &str,
        method: HttpMethod,
        query: Vec<(String, String)>,
        body: Option<Vec<u8>>,
        response_type: Option<ResponseType>,
    ) -> RequestId {
        let call = {
            let config = self.read_config();
            if !config.enabled {
                debug!("[Connection] Disabled, not issuing {}", endpoint);
                return NOT_ISSUED;
            }
            HttpCall {
                method,
                url: format!("{}{}", config.base_url(), endpoint),
                query,
                access_key: config.access_key.clone(),
                body,
                verify_certificates: config.verify_certificates,
                https_only: config.strict_transport_security,
                timeout: config.transfer_timeout,
            }
        };

        let context = RequestContext {
            id: self.inner.request_id_counter.fetch_add(1, Ordering::SeqCst) + 1,
            endpoint: endpoint.to_string(),
            response_type,
        };
        let request_id = context.id;
        debug!(
            "[Connection] #{} {:?} {} ({:?})",
            request_id, method, endpoint, response_type
        );

        let inner = Arc::clone(&self.inner);
        self.inner.runtime.spawn(async move {
            let outcome = inner.transport.execute(call).await;
            let event = completion_event(&context, outcome);
            inner.events.publish(event);
        });

        request_id
    }

    fn read_config(&self) -> RwLockReadGuard<'_, ConnectionConfig> {
        self.inner
            .config
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_config(&self) -> RwLockWriteGuard<'_, ConnectionConfig> {
        self.inner
            .config
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn records_body(records: Vec<Record>) -> Value {
    Value::Array(records.into_iter().map(Value::Object).collect())
}

/// Turn the outcome of one call into the single event reported for it.
pub(crate) fn completion_event(
    context: &RequestContext,
    outcome: Result<HttpResponse>,
) -> ConnectionEvent {
    let request_id = context.id;

    let response = match outcome {
        Ok(response) => response,
        Err(error) => {
            warn!("[Connection] #{} {} failed: {}", request_id, context.endpoint, error);
            return ConnectionEvent::Failed {
                request_id,
                failure: classify_error(&error),
            };
        }
    };

    if response.status != 200 {
        warn!(
            "[Connection] #{} {} answered HTTP {}",
            request_id, context.endpoint, response.status
        );
        return ConnectionEvent::Failed {
            request_id,
            failure: RequestFailure::http(response.status, &response.body),
        };
    }

    match parse_payload(request_id, context.response_type, &response.body) {
        Ok(event) => event,
        Err(ConnectError::Json(error)) => {
            warn!(
                "[Connection] #{} {} returned an unparsable body: {}",
                request_id, context.endpoint, error
            );
            ConnectionEvent::Failed {
                request_id,
                failure: RequestFailure::parse(response.status, &error),
            }
        }
        Err(error) => ConnectionEvent::Failed {
            request_id,
            failure: classify_error(&error),
        },
    }
}

fn parse_payload(
    request_id: RequestId,
    response_type: Option<ResponseType>,
    body: &[u8],
) -> Result<ConnectionEvent> {
    let event = match response_type {
        Some(ResponseType::StaticData) => ConnectionEvent::StaticData {
            request_id,
            data: body.to_vec(),
        },
        Some(ResponseType::StatusInformation) => ConnectionEvent::StatusInformation {
            request_id,
            info: serde_json::from_slice(body)?,
        },
        Some(ResponseType::SubscriptionData) => ConnectionEvent::SubscriptionData {
            request_id,
            records: serde_json::from_slice(body)?,
        },
        Some(ResponseType::SingleUrlQueueData) => ConnectionEvent::SingleUrlQueueData {
            request_id,
            records: serde_json::from_slice(body)?,
        },
        Some(ResponseType::SubscriptionChecksData) => ConnectionEvent::SubscriptionChecksData {
            request_id,
            records: serde_json::from_slice(body)?,
        },
        Some(ResponseType::MissedSubscriptionChecksData) => {
            ConnectionEvent::MissedSubscriptionChecksData {
                request_id,
                records: serde_json::from_slice(body)?,
            }
        }
        Some(ResponseType::ApiVersion) => {
            let response: ApiVersionResponse = serde_json::from_slice(body)?;
            ConnectionEvent::ApiVersion {
                request_id,
                version: response.version,
            }
        }
        None => {
            let data = if body.iter().all(u8::is_ascii_whitespace) {
                Value::Null
            } else {
                serde_json::from_slice(body)?
            };
            ConnectionEvent::Reply { request_id, data }
        }
    };
    Ok(event)
}
