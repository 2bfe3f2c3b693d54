//! Display values and the conversions between them and JSON fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// A cell as the presentation layer sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    Null,
    Text(String),
    Integer(i64),
    Number(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Text(text) => f.write_str(text),
            Self::Integer(value) => write!(f, "{}", value),
            Self::Number(value) => write!(f, "{}", value),
            Self::Bool(value) => write!(f, "{}", value),
            Self::Timestamp(time) => write!(f, "{}", time.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Plain fields
// ─────────────────────────────────────────────────────────────────────────────

/// Field shown as-is. Nested arrays and objects are shown as JSON text.
pub fn plain_to_display(value: &Value) -> CellValue {
    match value {
        Value::Null => CellValue::Null,
        Value::Bool(b) => CellValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => CellValue::Integer(i),
            None => n.as_f64().map_or(CellValue::Null, CellValue::Number),
        },
        Value::String(s) => CellValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => CellValue::Text(value.to_string()),
    }
}

pub fn plain_to_storage(value: &CellValue) -> Value {
    match value {
        CellValue::Null => Value::Null,
        CellValue::Text(text) => Value::String(text.clone()),
        CellValue::Integer(i) => Value::from(*i),
        CellValue::Number(n) => float_value(*n),
        CellValue::Bool(b) => Value::Bool(*b),
        CellValue::Timestamp(_) => timestamp_to_storage(value),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Timestamps (Unix epoch seconds on the wire)
// ─────────────────────────────────────────────────────────────────────────────

pub fn timestamp_to_display(value: &Value) -> CellValue {
    let Some(seconds) = value.as_f64() else {
        return CellValue::Null;
    };
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
    DateTime::<Utc>::from_timestamp(whole as i64, nanos)
        .map_or(CellValue::Null, CellValue::Timestamp)
}

pub fn timestamp_to_storage(value: &CellValue) -> Value {
    match value {
        CellValue::Timestamp(time) => {
            let nanos = time.timestamp_subsec_nanos();
            if nanos == 0 {
                Value::from(time.timestamp())
            } else {
                float_value(time.timestamp() as f64 + f64::from(nanos) / 1e9)
            }
        }
        CellValue::Integer(i) => Value::from(*i),
        CellValue::Number(n) => float_value(*n),
        _ => Value::Null,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Flags (stored as booleans or 0/1 integers)
// ─────────────────────────────────────────────────────────────────────────────

pub fn bool_to_display(value: &Value) -> CellValue {
    let flag = match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(s.as_str(), "true" | "1"),
        _ => false,
    };
    CellValue::Bool(flag)
}

pub fn bool_to_storage(value: &CellValue) -> Value {
    let flag = match value {
        CellValue::Bool(b) => *b,
        CellValue::Integer(i) => *i != 0,
        CellValue::Number(n) => *n != 0.0,
        CellValue::Text(text) => matches!(text.trim(), "true" | "1"),
        CellValue::Null | CellValue::Timestamp(_) => false,
    };
    Value::Bool(flag)
}

fn float_value(value: f64) -> Value {
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_plain_conversions() {
        assert_eq!(plain_to_display(&json!(5)), CellValue::Integer(5));
        assert_eq!(plain_to_display(&json!(1.5)), CellValue::Number(1.5));
        assert_eq!(plain_to_display(&json!("ok")), CellValue::Text("ok".into()));
        assert_eq!(plain_to_display(&json!(null)), CellValue::Null);
        assert_eq!(plain_to_display(&json!([1])), CellValue::Text("[1]".into()));

        assert_eq!(plain_to_storage(&CellValue::Text("x".into())), json!("x"));
        assert_eq!(plain_to_storage(&CellValue::Integer(3)), json!(3));
        assert_eq!(plain_to_storage(&CellValue::Number(f64::NAN)), Value::Null);
    }

    #[test]
    fn test_timestamp_from_epoch_seconds() {
        let expected = Utc.with_ymd_and_hms(2021, 3, 1, 12, 0, 0).unwrap();
        let seconds = expected.timestamp();

        assert_eq!(
            timestamp_to_display(&json!(seconds)),
            CellValue::Timestamp(expected)
        );
        assert_eq!(
            timestamp_to_storage(&CellValue::Timestamp(expected)),
            json!(seconds)
        );
    }

    #[test]
    fn test_fractional_timestamp_keeps_subseconds() {
        match timestamp_to_display(&json!(1614600000.5)) {
            CellValue::Timestamp(time) => {
                assert_eq!(time.timestamp(), 1614600000);
                assert_eq!(time.timestamp_subsec_millis(), 500);
                assert_eq!(
                    timestamp_to_storage(&CellValue::Timestamp(time)),
                    json!(1614600000.5)
                );
            }
            other => panic!("Expected Timestamp, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_timestamp_is_null() {
        assert_eq!(timestamp_to_display(&Value::Null), CellValue::Null);
        assert_eq!(timestamp_to_display(&json!("soon")), CellValue::Null);
        assert_eq!(timestamp_to_storage(&CellValue::Null), Value::Null);
    }

    #[test]
    fn test_bool_accepts_integer_flags() {
        assert_eq!(bool_to_display(&json!(1)), CellValue::Bool(true));
        assert_eq!(bool_to_display(&json!(0)), CellValue::Bool(false));
        assert_eq!(bool_to_display(&json!(true)), CellValue::Bool(true));
        assert_eq!(bool_to_display(&Value::Null), CellValue::Bool(false));

        assert_eq!(bool_to_storage(&CellValue::Bool(true)), json!(true));
        assert_eq!(bool_to_storage(&CellValue::Integer(0)), json!(false));
        assert_eq!(bool_to_storage(&CellValue::Text("1".into())), json!(true));
    }

    #[test]
    fn test_display_formatting() {
        let time = Utc.with_ymd_and_hms(2021, 3, 1, 8, 5, 9).unwrap();
        assert_eq!(CellValue::Timestamp(time).to_string(), "2021-03-01 08:05:09");
        assert_eq!(CellValue::Null.to_string(), "");
        assert_eq!(CellValue::Integer(12).to_string(), "12");
    }
}
