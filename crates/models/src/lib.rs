//! hydownloader Models - synchronized table models over the hydownloader API.
//!
//! A [`ListModel`] keeps an ordered list of JSON records in step with the
//! server: it loads snapshots through a [`Connection`](hydownloader_connect::Connection),
//! applies cell edits optimistically, tracks the writes awaiting confirmation
//! and reconciles each new snapshot with a prefix diff.
//!
//! Concrete record kinds plug in through [`ListSchema`]; this crate ships the
//! subscription check history and missed subscription check logs.

pub mod checks;
pub mod column;
pub mod diff;
pub mod events;
pub mod list_model;
pub mod schema;
pub mod value;


pub use checks::{
    MissedSubscriptionChecks, MissedSubscriptionChecksModel, SubscriptionChecks,
    SubscriptionChecksModel, ROWID_FIELD,
};
pub use column::{ColumnDescriptor, ToDisplay, ToStorage};
pub use events::{MockModelEventSink, ModelEvent, ModelEventSink, NoOpModelEventSink};
pub use list_model::{ListModel, ModelState};
pub use schema::{Filter, ListSchema, StatusLabels, DEFAULT_ID_FIELD, NO_DATA_TEXT};
pub use value::CellValue;
