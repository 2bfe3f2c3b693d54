//! Column descriptors.

use serde_json::Value;

use crate::value::{
    bool_to_display, bool_to_storage, plain_to_display, plain_to_storage, timestamp_to_display,
    timestamp_to_storage, CellValue,
};

/// Converts a stored JSON field into what the table shows.
pub type ToDisplay = fn(&Value) -> CellValue;

/// Converts an edited display value back into a JSON field.
pub type ToStorage = fn(&CellValue) -> Value;

/// One visible column: which record field it shows and how.
#[derive(Debug, Clone, Copy)]
pub struct ColumnDescriptor {
    pub key: &'static str,
    pub label: &'static str,
    pub editable: bool,
    pub to_display: ToDisplay,
    pub to_storage: ToStorage,
}

impl ColumnDescriptor {
    pub fn new(
        key: &'static str,
        label: &'static str,
        editable: bool,
        to_display: ToDisplay,
        to_storage: ToStorage,
    ) -> Self {
        Self {
            key,
            label,
            editable,
            to_display,
            to_storage,
        }
    }

    /// Read-only column showing the field as-is.
    pub fn plain(key: &'static str, label: &'static str) -> Self {
        Self::new(key, label, false, plain_to_display, plain_to_storage)
    }

    /// Read-only column showing an epoch-seconds field as a timestamp.
    pub fn timestamp(key: &'static str, label: &'static str) -> Self {
        Self::new(key, label, false, timestamp_to_display, timestamp_to_storage)
    }

    /// Read-only column showing a flag.
    pub fn flag(key: &'static str, label: &'static str) -> Self {
        Self::new(key, label, false, bool_to_display, bool_to_storage)
    }

    pub fn editable(mut self) -> Self {
        self.editable = true;
        self
    }

    /// Display value of this column's field in `record`; a missing field is `Null`.
    pub fn display(&self, record: &serde_json::Map<String, Value>) -> CellValue {
        (self.to_display)(record.get(self.key).unwrap_or(&Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_uses_column_conversion() {
        let record = json!({"archived": 1, "status": "ok"})
            .as_object()
            .cloned()
            .unwrap();

        assert_eq!(
            ColumnDescriptor::flag("archived", "Archived").display(&record),
            CellValue::Bool(true)
        );
        assert_eq!(
            ColumnDescriptor::plain("status", "Status").display(&record),
            CellValue::Text("ok".into())
        );
        assert_eq!(
            ColumnDescriptor::timestamp("time", "Time").display(&record),
            CellValue::Null
        );
    }

    #[test]
    fn test_editable_builder() {
        let column = ColumnDescriptor::plain("data", "Data");
        assert!(!column.editable);
        assert!(column.editable().editable);
    }
}
