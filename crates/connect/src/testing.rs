//! Scripted transport for tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use crate::error::{ConnectError, Result};
use crate::transport::{HttpCall, HttpResponse, Transport};

enum MockOutcome {
    Respond(HttpResponse),
    TransportError(String),
    Deferred(oneshot::Receiver<HttpResponse>),
}

/// Transport that answers from a per-endpoint script and records every call.
///
/// Endpoints without a scripted outcome answer `200 {}`.
#[derive(Clone, Default)]
pub struct MockTransport {
    calls: Arc<Mutex<Vec<HttpCall>>>,
    script: Arc<Mutex<HashMap<String, VecDeque<MockOutcome>>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the next call to `endpoint`.
    pub fn respond(&self, endpoint: &str, response: HttpResponse) {
        self.push(endpoint, MockOutcome::Respond(response));
    }

    /// Queue a `200` JSON response for the next call to `endpoint`.
    pub fn respond_json(&self, endpoint: &str, value: serde_json::Value) {
        self.respond(endpoint, HttpResponse::ok_json(&value));
    }

    /// Make the next call to `endpoint` fail without an HTTP answer.
    pub fn fail(&self, endpoint: &str, message: &str) {
        self.push(endpoint, MockOutcome::TransportError(message.to_string()));
    }

    /// Hold the next call to `endpoint` until the returned sender fires.
    pub fn respond_later(&self, endpoint: &str) -> oneshot::Sender<HttpResponse> {
        let (sender, receiver) = oneshot::channel();
        self.push(endpoint, MockOutcome::Deferred(receiver));
        sender
    }

    /// All calls executed so far, in order.
    pub fn calls(&self) -> Vec<HttpCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls whose URL ends with `endpoint`.
    pub fn calls_to(&self, endpoint: &str) -> Vec<HttpCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.url.ends_with(endpoint))
            .collect()
    }

    fn push(&self, endpoint: &str, outcome: MockOutcome) {
        self.script
            .lock()
            .unwrap()
            .entry(endpoint.to_string())
            .or_default()
            .push_back(outcome);
    }

    fn next_outcome(&self, url: &str) -> Option<MockOutcome> {
        let mut script = self.script.lock().unwrap();
        script
            .iter_mut()
            .find(|(endpoint, queue)| url.ends_with(endpoint.as_str()) && !queue.is_empty())
            .and_then(|(_, queue)| queue.pop_front())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, call: HttpCall) -> Result<HttpResponse> {
        self.calls.lock().unwrap().push(call.clone());
        match self.next_outcome(&call.url) {
            Some(MockOutcome::Respond(response)) => Ok(response),
            Some(MockOutcome::TransportError(message)) => Err(ConnectError::transport(message)),
            Some(MockOutcome::Deferred(receiver)) => receiver
                .await
                .map_err(|_| ConnectError::transport("deferred response dropped")),
            None => Ok(HttpResponse::new(200, "{}")),
        }
    }
}
