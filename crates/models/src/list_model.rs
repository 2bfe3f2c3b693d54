//! Generic synchronized list model.
//!
//! Holds the server's records in server order, lets the presentation layer
//! edit them optimistically and reconciles against fresh snapshots with the
//! prefix diff from [`crate::diff`].
//!
//! The model is single-threaded: connection events are queued on its
//! [`EventReceiver`] and only applied from [`ListModel::process_events`] or
//! [`ListModel::next_event`], so record and pending-set mutation never race.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

use hydownloader_connect::{
    Connection, ConnectionEvent, EventReceiver, Record, RequestFailure, RequestId, NOT_ISSUED,
};

use crate::column::ColumnDescriptor;
use crate::diff::{contiguous_runs, prefix_diff};
use crate::events::{ModelEvent, ModelEventSink, NoOpModelEventSink};
use crate::schema::{Filter, ListSchema, NO_DATA_TEXT};
use crate::value::CellValue;

/// Lifecycle of a model instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelState {
    /// No filter has been set, or it was forgotten by a full clear
    Uninitialized,
    /// A load call is in flight
    Loading,
    /// Records reflect the latest applied snapshot (possibly empty)
    Loaded,
}

pub struct ListModel<S: ListSchema> {
    schema: S,
    columns: Vec<ColumnDescriptor>,
    id_field: &'static str,
    records: Vec<Record>,
    pending_updates: HashSet<RequestId>,
    filter: Option<Filter>,
    show_archived: bool,
    status_text: String,
    state: ModelState,
    latest_load: Option<RequestId>,
    connection: Connection,
    events: EventReceiver,
    sink: Arc<dyn ModelEventSink>,
}

impl<S: ListSchema> ListModel<S> {
    /// Create a model listening to `connection`.
    ///
    /// The model receives every event the connection publishes, including
    /// other listeners' replies, on an unbounded queue. The owner must keep
    /// draining it with [`process_events`](Self::process_events) or
    /// [`next_event`](Self::next_event), otherwise the queue grows without bound.
    pub fn new(schema: S, connection: Connection) -> Self {
        Self::with_sink(schema, connection, Arc::new(NoOpModelEventSink))
    }

    pub fn with_sink(schema: S, connection: Connection, sink: Arc<dyn ModelEventSink>) -> Self {
        let columns = schema.columns();
        let id_field = schema.id_field();
        let events = connection.subscribe();
        Self {
            schema,
            columns,
            id_field,
            records: Vec::new(),
            pending_updates: HashSet::new(),
            filter: None,
            show_archived: false,
            status_text: NO_DATA_TEXT.to_string(),
            state: ModelState::Uninitialized,
            latest_load: None,
            connection,
            events,
            sink,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Read access
    // ─────────────────────────────────────────────────────────────────────────

    pub fn row_count(&self) -> usize {
        self.records.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    pub fn header(&self, column: usize) -> Option<&'static str> {
        self.columns.get(column).map(|c| c.label)
    }

    pub fn is_editable(&self, column: usize) -> bool {
        self.columns.get(column).is_some_and(|c| c.editable)
    }

    /// Display value at `(row, column)`, `None` outside the table.
    pub fn cell(&self, row: usize, column: usize) -> Option<CellValue> {
        let record = self.records.get(row)?;
        Some(self.columns.get(column)?.display(record))
    }

    pub fn record(&self, row: usize) -> Option<&Record> {
        self.records.get(row)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Just the identity of the record at `row`, suitable as a patch base.
    pub fn basic_record(&self, row: usize) -> Option<Record> {
        let record = self.records.get(row)?;
        let mut basic = Record::new();
        basic.insert(self.id_field.to_string(), self.record_id(record));
        Some(basic)
    }

    /// Integer ids of the given rows, skipping rows without one.
    pub fn ids(&self, rows: &[usize]) -> Vec<i64> {
        rows.iter()
            .filter_map(|&row| self.records.get(row))
            .filter_map(|record| record.get(self.id_field).and_then(Value::as_i64))
            .collect()
    }

    pub fn id_field(&self) -> &'static str {
        self.id_field
    }

    pub fn pending_updates(&self) -> &HashSet<RequestId> {
        &self.pending_updates
    }

    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    pub fn show_archived(&self) -> bool {
        self.show_archived
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn state(&self) -> ModelState {
        self.state
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn schema(&self) -> &S {
        &self.schema
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Local edits
    // ─────────────────────────────────────────────────────────────────────────

    /// Optimistically write one cell and send the change upstream.
    ///
    /// Returns `false` without touching anything when the column is read-only
    /// or the position is outside the table.
    pub fn set_cell(&mut self, row: usize, column: usize, value: CellValue) -> bool {
        let Some(descriptor) = self.columns.get(column).copied() else {
            return false;
        };
        if !descriptor.editable || row >= self.records.len() {
            return false;
        }

        let stored = (descriptor.to_storage)(&value);
        let record = &mut self.records[row];
        record.insert(descriptor.key.to_string(), stored.clone());

        let mut patch = Record::new();
        patch.insert(self.id_field.to_string(), self.record_id(&self.records[row]));
        patch.insert(descriptor.key.to_string(), stored);

        self.emit(ModelEvent::RowsChanged {
            first_row: row,
            last_row: row,
            first_column: column,
            last_column: column,
        });

        let request_id = self.schema.add_or_update(&self.connection, vec![patch]);
        self.track_update(request_id);
        true
    }

    /// Merge `patches[i]` into row `rows[i]`, send the batch upstream and
    /// optionally drop the rows afterwards.
    ///
    /// Rejected (returns `false`) if the lengths differ, nothing is given or
    /// a row is outside the table.
    pub fn update_rows(&mut self, rows: &[usize], patches: Vec<Record>, remove_after: bool) -> bool {
        if rows.is_empty() || rows.len() != patches.len() {
            return false;
        }
        if rows.iter().any(|&row| row >= self.records.len()) {
            return false;
        }

        for (&row, patch) in rows.iter().zip(&patches) {
            let record = &mut self.records[row];
            for (key, value) in patch {
                record.insert(key.clone(), value.clone());
            }
        }

        let first_row = rows.iter().copied().min().unwrap_or_default();
        let last_row = rows.iter().copied().max().unwrap_or_default();
        self.emit(ModelEvent::RowsChanged {
            first_row,
            last_row,
            first_column: 0,
            last_column: self.columns.len().saturating_sub(1),
        });

        let request_id = self.schema.add_or_update(&self.connection, patches);
        self.track_update(request_id);

        if remove_after {
            // Highest run first so earlier runs keep their indices.
            for (first, last) in contiguous_runs(rows).into_iter().rev() {
                self.records.drain(first..=last);
                self.emit(ModelEvent::RowsRemoved { first, last });
            }
        }
        true
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reconciliation
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace all records with an authoritative snapshot.
    ///
    /// An empty snapshot drops every row but keeps the filter and pending
    /// writes. Otherwise see [`prefix_diff`] for the notifications emitted.
    pub fn replace_records(&mut self, records: Vec<Record>) {
        let events = prefix_diff(&self.records, &records, self.columns.len());
        self.records = records;
        for event in events {
            self.emit(event);
        }
    }

    /// Apply one connection event.
    pub fn handle_event(&mut self, event: &ConnectionEvent) {
        match event {
            ConnectionEvent::Reply { request_id, .. } => self.confirm_update(*request_id),
            ConnectionEvent::Failed {
                request_id,
                failure,
            } => self.handle_failure(*request_id, failure),
            other => {
                if let Some((request_id, records)) = self.schema.data_records(other) {
                    self.apply_data(request_id, records.to_vec());
                }
            }
        }
    }

    /// Apply every event already queued, without waiting. Returns how many
    /// were applied.
    pub fn process_events(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.events.try_recv() {
            self.handle_event(&event);
            applied += 1;
        }
        applied
    }

    /// Wait for the next connection event and apply it.
    pub async fn next_event(&mut self) -> Option<ConnectionEvent> {
        let event = self.events.recv().await?;
        self.handle_event(&event);
        Some(event)
    }

    fn confirm_update(&mut self, request_id: RequestId) {
        if self.pending_updates.remove(&request_id) {
            debug!("[ListModel] Update #{} confirmed, refreshing", request_id);
            self.refresh(false);
        }
    }

    fn handle_failure(&mut self, request_id: RequestId, failure: &RequestFailure) {
        if self.pending_updates.remove(&request_id) {
            warn!(
                "[ListModel] Update #{} failed ({}), reloading affected rows",
                request_id, failure
            );
            self.refresh(false);
        } else if self.latest_load == Some(request_id) {
            warn!("[ListModel] Load #{} failed: {}", request_id, failure);
            self.latest_load = None;
            self.state = ModelState::Loaded;
            let text = self.schema.labels().failed.to_string();
            self.set_status_text(text);
        }
    }

    fn apply_data(&mut self, request_id: RequestId, records: Vec<Record>) {
        let Some(filter) = &self.filter else {
            debug!("[ListModel] No filter set, ignoring data #{}", request_id);
            return;
        };
        if self.latest_load != Some(request_id) {
            debug!(
                "[ListModel] Ignoring data #{} (latest load {:?})",
                request_id, self.latest_load
            );
            return;
        }

        let text = filter.describe(self.schema.labels().subject);
        self.latest_load = None;
        self.state = ModelState::Loaded;
        self.set_status_text(text);
        self.replace_records(records);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Loading
    // ─────────────────────────────────────────────────────────────────────────

    /// Remember `subscription_ids` as the filter and reload from scratch.
    ///
    /// An empty list loads records for all subscriptions.
    pub fn load_for_subscriptions(&mut self, subscription_ids: Vec<i64>) {
        self.filter = Some(Filter::new(subscription_ids, self.show_archived));
        self.refresh(true);
    }

    /// Re-issue the load for the remembered filter; no-op without one.
    ///
    /// A full refresh clears the records first; a partial one keeps them on
    /// screen until the new snapshot arrives.
    pub fn refresh(&mut self, full: bool) {
        if full {
            self.clear(false);
        }
        let Some(filter) = self.filter.clone() else {
            return;
        };

        // Supersedes any load still in flight.
        self.latest_load = None;
        let request_id = self.schema.request_data(&self.connection, &filter);
        if request_id == NOT_ISSUED {
            debug!("[ListModel] Connection disabled, load not issued");
            if self.state == ModelState::Loading {
                self.state = ModelState::Loaded;
            }
            return;
        }
        self.latest_load = Some(request_id);
        self.state = ModelState::Loading;
        let text = self.schema.labels().loading.to_string();
        self.set_status_text(text);
    }

    /// Drop all records. A full clear also forgets the filter and pending
    /// writes, returning the model to `Uninitialized`.
    pub fn clear(&mut self, full: bool) {
        self.records.clear();
        self.emit(ModelEvent::Reset);
        if full {
            self.pending_updates.clear();
            self.filter = None;
            self.latest_load = None;
        }
        self.state = if self.filter.is_some() {
            ModelState::Loaded
        } else {
            ModelState::Uninitialized
        };
        self.set_status_text(NO_DATA_TEXT.to_string());
    }

    /// Include archived records from the next load on.
    pub fn set_show_archived(&mut self, show: bool) {
        if self.show_archived == show {
            return;
        }
        self.show_archived = show;
        if let Some(filter) = &mut self.filter {
            filter.include_archived = show;
        }
        self.emit(ModelEvent::ShowArchivedChanged { show });
    }

    /// Switch to another connection.
    ///
    /// Listens to the new connection only, re-announces the status text and
    /// clears the records without issuing any call. Pending writes are
    /// dropped since their ids belong to the old connection.
    pub fn set_connection(&mut self, connection: Connection) {
        self.events = connection.subscribe();
        self.connection = connection;
        self.pending_updates.clear();
        self.latest_load = None;
        self.emit(ModelEvent::StatusTextChanged {
            text: self.status_text.clone(),
        });
        self.clear(false);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn track_update(&mut self, request_id: RequestId) {
        if request_id == NOT_ISSUED {
            debug!("[ListModel] Connection disabled, update not sent");
            return;
        }
        self.pending_updates.insert(request_id);
    }

    fn record_id(&self, record: &Record) -> Value {
        record.get(self.id_field).cloned().unwrap_or(Value::Null)
    }

    fn set_status_text(&mut self, text: String) {
        self.status_text = text;
        self.emit(ModelEvent::StatusTextChanged {
            text: self.status_text.clone(),
        });
    }

    fn emit(&self, event: ModelEvent) {
        self.sink.emit(event);
    }
}
