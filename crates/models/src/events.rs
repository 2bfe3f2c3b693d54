//! Change notifications emitted by list models.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// What changed in a model. Row and column bounds are inclusive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelEvent {
    /// All rows were dropped.
    Reset,
    RowsInserted {
        first: usize,
        last: usize,
    },
    /// Rows `first..=last`, in indices valid just before the removal.
    RowsRemoved {
        first: usize,
        last: usize,
    },
    RowsChanged {
        first_row: usize,
        last_row: usize,
        first_column: usize,
        last_column: usize,
    },
    StatusTextChanged {
        text: String,
    },
    ShowArchivedChanged {
        show: bool,
    },
}

/// Receives model notifications, typically the presentation layer.
///
/// `emit()` is called synchronously while the model mutates; it must not
/// call back into the model.
pub trait ModelEventSink: Send + Sync {
    fn emit(&self, event: ModelEvent);
}

/// Discards every notification.
#[derive(Clone, Default)]
pub struct NoOpModelEventSink;

impl ModelEventSink for NoOpModelEventSink {
    fn emit(&self, _event: ModelEvent) {}
}

/// Collects notifications for inspection in tests.
#[derive(Clone, Default)]
pub struct MockModelEventSink {
    events: Arc<Mutex<Vec<ModelEvent>>>,
}

impl MockModelEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ModelEvent> {
        self.lock().clone()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Only the row-structure notifications, without status chatter.
    pub fn row_events(&self) -> Vec<ModelEvent> {
        self.lock()
            .iter()
            .filter(|event| {
                !matches!(
                    event,
                    ModelEvent::StatusTextChanged { .. } | ModelEvent::ShowArchivedChanged { .. }
                )
            })
            .cloned()
            .collect()
    }

    /// Most recent status text announced, if any.
    pub fn last_status_text(&self) -> Option<String> {
        self.lock().iter().rev().find_map(|event| match event {
            ModelEvent::StatusTextChanged { text } => Some(text.clone()),
            _ => None,
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ModelEvent>> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ModelEventSink for MockModelEventSink {
    fn emit(&self, event: ModelEvent) {
        self.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_sink_filters_row_events() {
        let sink = MockModelEventSink::new();
        sink.emit(ModelEvent::StatusTextChanged {
            text: "Loading".into(),
        });
        sink.emit(ModelEvent::Reset);

        assert_eq!(sink.events().len(), 2);
        assert_eq!(sink.row_events(), vec![ModelEvent::Reset]);
        assert_eq!(sink.last_status_text().as_deref(), Some("Loading"));

        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_string(&ModelEvent::RowsInserted { first: 2, last: 3 }).unwrap();
        assert!(json.contains("rows_inserted"));
    }
}
