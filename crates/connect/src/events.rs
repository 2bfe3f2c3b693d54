//! Completion events and their fan-out to listeners.

use log::debug;
use std::sync::Mutex;
use tokio::sync::mpsc;

use crate::types::{Record, RequestFailure, RequestId, ResponseType};

/// Everything a [`Connection`](crate::Connection) reports to its listeners.
///
/// Each issued request produces exactly one of the per-request variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    StaticData {
        request_id: RequestId,
        data: Vec<u8>,
    },
    StatusInformation {
        request_id: RequestId,
        info: Record,
    },
    SubscriptionData {
        request_id: RequestId,
        records: Vec<Record>,
    },
    SingleUrlQueueData {
        request_id: RequestId,
        records: Vec<Record>,
    },
    SubscriptionChecksData {
        request_id: RequestId,
        records: Vec<Record>,
    },
    MissedSubscriptionChecksData {
        request_id: RequestId,
        records: Vec<Record>,
    },
    ApiVersion {
        request_id: RequestId,
        version: i64,
    },
    /// Successful completion of an untagged call
    Reply {
        request_id: RequestId,
        data: serde_json::Value,
    },
    /// Non-200 status, transport failure or unparsable body
    Failed {
        request_id: RequestId,
        failure: RequestFailure,
    },
    /// The connection's master switch flipped
    EnabledChanged(bool),
}

impl ConnectionEvent {
    /// Request this event completes, `None` for connection-level events.
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            Self::StaticData { request_id, .. }
            | Self::StatusInformation { request_id, .. }
            | Self::SubscriptionData { request_id, .. }
            | Self::SingleUrlQueueData { request_id, .. }
            | Self::SubscriptionChecksData { request_id, .. }
            | Self::MissedSubscriptionChecksData { request_id, .. }
            | Self::ApiVersion { request_id, .. }
            | Self::Reply { request_id, .. }
            | Self::Failed { request_id, .. } => Some(*request_id),
            Self::EnabledChanged(_) => None,
        }
    }

    /// Response type of a typed completion, `None` for everything else.
    pub fn response_type(&self) -> Option<ResponseType> {
        match self {
            Self::StaticData { .. } => Some(ResponseType::StaticData),
            Self::StatusInformation { .. } => Some(ResponseType::StatusInformation),
            Self::SubscriptionData { .. } => Some(ResponseType::SubscriptionData),
            Self::SingleUrlQueueData { .. } => Some(ResponseType::SingleUrlQueueData),
            Self::SubscriptionChecksData { .. } => Some(ResponseType::SubscriptionChecksData),
            Self::MissedSubscriptionChecksData { .. } => {
                Some(ResponseType::MissedSubscriptionChecksData)
            }
            Self::ApiVersion { .. } => Some(ResponseType::ApiVersion),
            _ => None,
        }
    }
}

/// Fans every event out to all live receivers.
///
/// Channels are unbounded so a slow listener never loses a completion; a
/// receiver that has been dropped is pruned on the next publish.
#[derive(Debug, Default)]
pub(crate) struct EventHub {
    senders: Mutex<Vec<mpsc::UnboundedSender<ConnectionEvent>>>,
}

impl EventHub {
    pub fn subscribe(&self) -> EventReceiver {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.lock().push(sender);
        EventReceiver { receiver }
    }

    pub fn publish(&self, event: ConnectionEvent) {
        let mut senders = self.lock();
        senders.retain(|sender| sender.send(event.clone()).is_ok());
        if senders.is_empty() {
            debug!("[Connection] No listeners for event {:?}", event.request_id());
        }
    }

    #[cfg(test)]
    pub fn listener_count(&self) -> usize {
        let mut senders = self.lock();
        senders.retain(|sender| !sender.is_closed());
        senders.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<mpsc::UnboundedSender<ConnectionEvent>>> {
        // A panicking listener cannot leave the sender list inconsistent.
        self.senders.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Listener end of a connection's event stream.
#[derive(Debug)]
pub struct EventReceiver {
    receiver: mpsc::UnboundedReceiver<ConnectionEvent>,
}

impl EventReceiver {
    /// Wait for the next event. `None` once the connection is gone.
    pub async fn recv(&mut self) -> Option<ConnectionEvent> {
        self.receiver.recv().await
    }

    /// Take an already-queued event without waiting.
    pub fn try_recv(&mut self) -> Option<ConnectionEvent> {
        self.receiver.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_receiver_gets_every_event() {
        let hub = EventHub::default();
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();

        hub.publish(ConnectionEvent::EnabledChanged(false));

        assert_eq!(a.try_recv(), Some(ConnectionEvent::EnabledChanged(false)));
        assert_eq!(b.try_recv(), Some(ConnectionEvent::EnabledChanged(false)));
        assert_eq!(a.try_recv(), None);
    }

    #[test]
    fn test_dropped_receiver_is_pruned() {
        let hub = EventHub::default();
        let a = hub.subscribe();
        let _b = hub.subscribe();
        assert_eq!(hub.listener_count(), 2);

        drop(a);
        hub.publish(ConnectionEvent::EnabledChanged(true));
        assert_eq!(hub.listener_count(), 1);
    }

    #[test]
    fn test_request_id_and_type_accessors() {
        let event = ConnectionEvent::SubscriptionChecksData {
            request_id: 4,
            records: Vec::new(),
        };
        assert_eq!(event.request_id(), Some(4));
        assert_eq!(
            event.response_type(),
            Some(ResponseType::SubscriptionChecksData)
        );

        let reply = ConnectionEvent::Reply {
            request_id: 5,
            data: serde_json::Value::Null,
        };
        assert_eq!(reply.response_type(), None);
        assert_eq!(ConnectionEvent::EnabledChanged(true).request_id(), None);
    }
}
