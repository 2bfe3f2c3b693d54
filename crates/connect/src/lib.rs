//! hydownloader Connect - asynchronous dispatcher for the hydownloader API.
//!
//! This crate issues calls against a hydownloader daemon, tags each one with a
//! request id and reports every outcome as a [`ConnectionEvent`] so callers can
//! correlate responses with the calls that caused them.
//!
//! # Usage
//!
//! ```rust,ignore
//! use hydownloader_connect::{Connection, ConnectionConfig, ConnectionEvent};
//!
//! let connection = Connection::new(ConnectionConfig::from_env())?;
//! let mut events = connection.subscribe();
//! let id = connection.request_api_version();
//! if let Some(ConnectionEvent::ApiVersion { request_id, version }) = events.recv().await {
//!     assert_eq!(request_id, id);
//!     println!("API version {}", version);
//! }
//! ```

mod client;
mod config;
mod error;
mod events;
mod transport;
mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;


pub use client::Connection;
pub use config::{ConnectionConfig, DEFAULT_API_URL};
pub use error::{ConnectError, Result};
pub use events::{ConnectionEvent, EventReceiver};
pub use transport::{
    classify_error, HttpCall, HttpMethod, HttpResponse, HttpTransport, Transport,
    ACCESS_KEY_HEADER,
};
pub use types::*;
