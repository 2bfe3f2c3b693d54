//! The seam between the generic list engine and a concrete record kind.

use hydownloader_connect::{Connection, ConnectionEvent, Record, RequestId};
use serde::{Deserialize, Serialize};

use crate::column::ColumnDescriptor;

/// Id field used when a schema does not name another one.
pub const DEFAULT_ID_FIELD: &str = "id";

/// Status text shown before anything is loaded and after a clear.
pub const NO_DATA_TEXT: &str = "No data loaded";

/// Which records a filtered model loads.
///
/// An empty id list means "all subscriptions".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub subscription_ids: Vec<i64>,
    pub include_archived: bool,
}

impl Filter {
    pub fn new(subscription_ids: Vec<i64>, include_archived: bool) -> Self {
        Self {
            subscription_ids,
            include_archived,
        }
    }

    /// Status line for data loaded with this filter, e.g.
    /// "Missed subscription checks for 3 subscriptions".
    pub fn describe(&self, subject: &str) -> String {
        match self.subscription_ids.as_slice() {
            [] => format!("{} for all subscriptions", subject),
            [id] => format!("{} for subscription {}", subject, id),
            ids => format!("{} for {} subscriptions", subject, ids.len()),
        }
    }
}

/// Human-readable texts a schema contributes to its model's status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusLabels {
    /// Capitalised subject, e.g. "Subscription check history"
    pub subject: &'static str,
    /// Shown while a load is in flight
    pub loading: &'static str,
    /// Shown when the latest load failed
    pub failed: &'static str,
}

/// Binds a column schema and its API verbs to [`ListModel`](crate::ListModel).
pub trait ListSchema {
    /// Visible columns, in display order.
    fn columns(&self) -> Vec<ColumnDescriptor>;

    /// Record field holding the row identity.
    fn id_field(&self) -> &'static str {
        DEFAULT_ID_FIELD
    }

    fn labels(&self) -> StatusLabels;

    /// Issue the load call for `filter`.
    fn request_data(&self, connection: &Connection, filter: &Filter) -> RequestId;

    /// Send patched records upstream.
    fn add_or_update(&self, connection: &Connection, records: Vec<Record>) -> RequestId;

    /// The authoritative snapshot carried by `event`, if it is this schema's
    /// typed data event.
    fn data_records<'a>(&self, event: &'a ConnectionEvent) -> Option<(RequestId, &'a [Record])>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_singular_plural_and_all() {
        let subject = "Subscription check history";

        assert_eq!(
            Filter::new(vec![7], false).describe(subject),
            "Subscription check history for subscription 7"
        );
        assert_eq!(
            Filter::new(vec![7, 9], false).describe(subject),
            "Subscription check history for 2 subscriptions"
        );
        assert_eq!(
            Filter::default().describe(subject),
            "Subscription check history for all subscriptions"
        );
    }
}
