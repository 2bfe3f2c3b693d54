//! Subscription check history and missed subscription checks.
//!
//! Both logs are keyed by SQLite `rowid` and filtered by subscription.

use hydownloader_connect::{Connection, ConnectionEvent, Record, RequestId};

use crate::column::ColumnDescriptor;
use crate::list_model::ListModel;
use crate::schema::{Filter, ListSchema, StatusLabels};

/// Id field of the check logs.
pub const ROWID_FIELD: &str = "rowid";

/// Rows of `/get_subscription_checks`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubscriptionChecks;

pub type SubscriptionChecksModel = ListModel<SubscriptionChecks>;

impl ListSchema for SubscriptionChecks {
    fn columns(&self) -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::plain("subscription_id", "Subscription ID"),
            ColumnDescriptor::timestamp("time_started", "Time started"),
            ColumnDescriptor::timestamp("time_finished", "Time finished"),
            ColumnDescriptor::plain("status", "Result status"),
            ColumnDescriptor::plain("new_files", "New files"),
            ColumnDescriptor::plain("already_seen_files", "Already seen files"),
            ColumnDescriptor::flag("archived", "Archived").editable(),
        ]
    }

    fn id_field(&self) -> &'static str {
        ROWID_FIELD
    }

    fn labels(&self) -> StatusLabels {
        StatusLabels {
            subject: "Subscription check history",
            loading: "Loading subscription check history...",
            failed: "Failed to load subscription check history",
        }
    }

    fn request_data(&self, connection: &Connection, filter: &Filter) -> RequestId {
        connection.request_subscription_checks_data(&filter.subscription_ids, filter.include_archived)
    }

    fn add_or_update(&self, connection: &Connection, records: Vec<Record>) -> RequestId {
        connection.add_or_update_subscription_checks(records)
    }

    fn data_records<'a>(&self, event: &'a ConnectionEvent) -> Option<(RequestId, &'a [Record])> {
        match event {
            ConnectionEvent::SubscriptionChecksData {
                request_id,
                records,
            } => Some((*request_id, records.as_slice())),
            _ => None,
        }
    }
}

/// Rows of `/get_missed_subscription_checks`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MissedSubscriptionChecks;

pub type MissedSubscriptionChecksModel = ListModel<MissedSubscriptionChecks>;

impl ListSchema for MissedSubscriptionChecks {
    fn columns(&self) -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::plain("subscription_id", "Subscription ID"),
            ColumnDescriptor::plain("reason", "Reason"),
            ColumnDescriptor::timestamp("time", "Time"),
            ColumnDescriptor::plain("data", "Data").editable(),
            ColumnDescriptor::flag("archived", "Archived").editable(),
        ]
    }

    fn id_field(&self) -> &'static str {
        ROWID_FIELD
    }

    fn labels(&self) -> StatusLabels {
        StatusLabels {
            subject: "Missed subscription checks",
            loading: "Loading missed subscription checks...",
            failed: "Failed to load missed subscription checks",
        }
    }

    fn request_data(&self, connection: &Connection, filter: &Filter) -> RequestId {
        connection
            .request_missed_subscription_checks_data(&filter.subscription_ids, filter.include_archived)
    }

    fn add_or_update(&self, connection: &Connection, records: Vec<Record>) -> RequestId {
        connection.add_or_update_missed_subscription_checks(records)
    }

    fn data_records<'a>(&self, event: &'a ConnectionEvent) -> Option<(RequestId, &'a [Record])> {
        match event {
            ConnectionEvent::MissedSubscriptionChecksData {
                request_id,
                records,
            } => Some((*request_id, records.as_slice())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_history_schema() {
        let schema = SubscriptionChecks;
        let columns = schema.columns();

        assert_eq!(schema.id_field(), "rowid");
        assert_eq!(columns.len(), 7);
        assert_eq!(columns[1].label, "Time started");
        let editable: Vec<_> = columns.iter().filter(|c| c.editable).map(|c| c.key).collect();
        assert_eq!(editable, vec!["archived"]);
    }

    #[test]
    fn test_missed_checks_schema() {
        let schema = MissedSubscriptionChecks;
        let editable: Vec<_> = schema
            .columns()
            .iter()
            .filter(|c| c.editable)
            .map(|c| c.key)
            .collect();

        assert_eq!(schema.id_field(), "rowid");
        assert_eq!(editable, vec!["data", "archived"]);
    }

    #[test]
    fn test_schemas_only_claim_their_own_data() {
        let checks = ConnectionEvent::SubscriptionChecksData {
            request_id: 1,
            records: vec![Record::new()],
        };
        let missed = ConnectionEvent::MissedSubscriptionChecksData {
            request_id: 2,
            records: Vec::new(),
        };

        assert_eq!(
            SubscriptionChecks.data_records(&checks).map(|(id, r)| (id, r.len())),
            Some((1, 1))
        );
        assert!(SubscriptionChecks.data_records(&missed).is_none());
        assert!(MissedSubscriptionChecks.data_records(&checks).is_none());
        assert_eq!(
            MissedSubscriptionChecks.data_records(&missed).map(|(id, _)| id),
            Some(2)
        );
    }
}
