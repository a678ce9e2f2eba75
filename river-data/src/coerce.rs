//! The Column Coercer: pure functions mapping a raw, wire-decoded column
//! value to an indexable value, according to the column's type category
//! (spec §4.1).

use chrono::{Local, NaiveDate, NaiveDateTime, TimeZone};
use tracing::warn;

use crate::column::{ColumnDescriptor, ColumnKind};
use crate::value::{CoercedValue, RawValue};

const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FMT: &str = "%Y-%m-%d";
const ZERO_DATETIME: &str = "0000-00-00 00:00:00";
const ZERO_DATE: &str = "0000-00-00";

/// Coerce a raw value according to `col`'s type category. Never fails: an
/// invalid enum index or an unparseable date logs a warning and substitutes
/// the documented fallback (empty string or null) rather than erroring.
pub fn coerce(col: &ColumnDescriptor, v: &RawValue) -> CoercedValue {
    match col.kind {
        ColumnKind::Enum => coerce_enum(col, v),
        ColumnKind::Set => coerce_set(col, v),
        ColumnKind::Bit => coerce_bit(v),
        ColumnKind::String => coerce_string(v),
        ColumnKind::Json => coerce_json(v),
        ColumnKind::Datetime | ColumnKind::Timestamp => coerce_datetime(col, v),
        ColumnKind::Date => coerce_date(col, v),
        ColumnKind::Number | ColumnKind::Float | ColumnKind::Other => CoercedValue::from_raw(v),
    }
}

fn coerce_enum(col: &ColumnDescriptor, v: &RawValue) -> CoercedValue {
    if let RawValue::Text(s) = v {
        return CoercedValue::Text(s.clone());
    }
    match v.as_i64() {
        Some(n) if n >= 1 && (n as usize) <= col.enum_values.len() => {
            CoercedValue::Text(col.enum_values[(n - 1) as usize].clone())
        }
        Some(n) => {
            warn!(column = %col.name, index = n, "enum index out of range");
            CoercedValue::Text(String::new())
        }
        None => CoercedValue::from_raw(v),
    }
}

fn coerce_set(col: &ColumnDescriptor, v: &RawValue) -> CoercedValue {
    let Some(mask) = v.as_i64() else {
        return CoercedValue::from_raw(v);
    };
    let joined = col
        .set_values
        .iter()
        .enumerate()
        .filter(|(i, _)| mask & (1 << i) != 0)
        .map(|(_, name)| name.as_str())
        .collect::<Vec<_>>()
        .join(",");
    CoercedValue::Text(joined)
}

fn coerce_bit(v: &RawValue) -> CoercedValue {
    match v {
        RawValue::Bytes(b) if b.as_slice() == [1] => CoercedValue::Int(1),
        RawValue::Bytes(_) => CoercedValue::Int(0),
        other => CoercedValue::from_raw(other),
    }
}

fn coerce_string(v: &RawValue) -> CoercedValue {
    match v.as_text() {
        Some(s) => CoercedValue::Text(s),
        None => CoercedValue::Null,
    }
}

fn coerce_json(v: &RawValue) -> CoercedValue {
    let Some(text) = v.as_text() else {
        return CoercedValue::from_raw(v);
    };
    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(serde_json::Value::Null) => CoercedValue::from_raw(v),
        Ok(json) => CoercedValue::Json(json),
        Err(_) => CoercedValue::from_raw(v),
    }
}

fn coerce_datetime(col: &ColumnDescriptor, v: &RawValue) -> CoercedValue {
    let Some(text) = v.as_text() else {
        return CoercedValue::Null;
    };
    if text == ZERO_DATETIME {
        return CoercedValue::Null;
    }
    match NaiveDateTime::parse_from_str(&text, DATETIME_FMT) {
        Ok(dt) => CoercedValue::Text(dt.and_utc().to_rfc3339()),
        Err(e) => {
            warn!(column = %col.name, value = %text, error = %e, "failed to parse datetime");
            CoercedValue::Null
        }
    }
}

fn coerce_date(col: &ColumnDescriptor, v: &RawValue) -> CoercedValue {
    let Some(text) = v.as_text() else {
        return CoercedValue::Null;
    };
    if text == ZERO_DATE {
        return CoercedValue::Null;
    }
    match NaiveDate::parse_from_str(&text, DATE_FMT) {
        Ok(_) => CoercedValue::Text(text),
        Err(e) => {
            warn!(column = %col.name, value = %text, error = %e, "failed to parse date");
            CoercedValue::Null
        }
    }
}

/// A typed projection composing [`coerce`] with a field-mapping type hint
/// (spec §4.1's "typed projection"). `hint` comes from the second,
/// optional token of a field-mapping entry (`target_field[,hint]`).
pub fn project(col: &ColumnDescriptor, hint: &str, v: &RawValue) -> CoercedValue {
    match hint {
        "list" => project_list(col, v),
        "string" => project_string(col, v),
        "date" => project_date(col, v),
        "timestamp" => project_timestamp(col, v),
        _ => coerce(col, v),
    }
}

fn project_list(col: &ColumnDescriptor, v: &RawValue) -> CoercedValue {
    match coerce(col, v) {
        CoercedValue::Text(s) => CoercedValue::List(
            s.split(',')
                .map(|item| CoercedValue::Text(item.to_string()))
                .collect(),
        ),
        other => other,
    }
}

fn project_string(col: &ColumnDescriptor, v: &RawValue) -> CoercedValue {
    match v.as_text() {
        Some(s) => CoercedValue::Text(s),
        None => {
            warn!(column = %col.name, "expected textual value for string projection");
            coerce(col, v)
        }
    }
}

fn project_date(col: &ColumnDescriptor, v: &RawValue) -> CoercedValue {
    if matches!(col.kind, ColumnKind::Number) {
        let Some(epoch) = v.as_i64() else {
            return coerce(col, v);
        };
        let Some(dt) = chrono::DateTime::from_timestamp(epoch, 0) else {
            warn!(column = %col.name, epoch, "timestamp out of range for date projection");
            return CoercedValue::Null;
        };
        let text = dt.naive_utc().format(DATETIME_FMT).to_string();
        return coerce_datetime(col, &RawValue::Text(text));
    }
    coerce(col, v)
}

fn project_timestamp(col: &ColumnDescriptor, v: &RawValue) -> CoercedValue {
    if !matches!(col.kind, ColumnKind::Date | ColumnKind::Datetime | ColumnKind::Timestamp) {
        return coerce(col, v);
    }
    let Some(text) = v.as_text() else {
        return coerce(col, v);
    };
    let naive = match col.kind {
        ColumnKind::Date => NaiveDate::parse_from_str(&text, DATE_FMT)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0)),
        _ => NaiveDateTime::parse_from_str(&text, DATETIME_FMT).ok(),
    };
    let local = naive.and_then(|naive| Local.from_local_datetime(&naive).single());
    match local {
        Some(local) => CoercedValue::Int(local.timestamp()),
        None => {
            warn!(column = %col.name, value = %text, "failed to parse timestamp projection, falling back to raw value");
            CoercedValue::from_raw(v)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enum_col() -> ColumnDescriptor {
        ColumnDescriptor::new("status", ColumnKind::Enum)
            .with_enum_values(vec!["x".into(), "y".into(), "z".into()])
    }

    fn set_col() -> ColumnDescriptor {
        ColumnDescriptor::new("flags", ColumnKind::Set).with_set_values(vec![
            "a".into(),
            "b".into(),
            "c".into(),
            "d".into(),
        ])
    }

    #[test]
    fn enum_in_range() {
        assert_eq!(
            coerce(&enum_col(), &RawValue::Int(2)),
            CoercedValue::Text("y".into())
        );
    }

    #[test]
    fn enum_out_of_range_is_empty_string() {
        assert_eq!(
            coerce(&enum_col(), &RawValue::Int(0)),
            CoercedValue::Text(String::new())
        );
    }

    #[test]
    fn enum_string_is_unchanged() {
        assert_eq!(
            coerce(&enum_col(), &RawValue::Text("y".into())),
            CoercedValue::Text("y".into())
        );
    }

    #[test]
    fn set_bitmask_is_comma_joined() {
        // bits 1 and 3 -> "b" and "d"
        assert_eq!(
            coerce(&set_col(), &RawValue::Int(0b1010)),
            CoercedValue::Text("b,d".into())
        );
    }

    #[test]
    fn bit_one_byte() {
        let col = ColumnDescriptor::new("flag", ColumnKind::Bit);
        assert_eq!(coerce(&col, &RawValue::Bytes(vec![1])), CoercedValue::Int(1));
        assert_eq!(coerce(&col, &RawValue::Bytes(vec![0])), CoercedValue::Int(0));
    }

    #[test]
    fn datetime_zero_is_null() {
        let col = ColumnDescriptor::new("created_at", ColumnKind::Datetime);
        assert_eq!(
            coerce(&col, &RawValue::Text(ZERO_DATETIME.into())),
            CoercedValue::Null
        );
    }

    #[test]
    fn datetime_valid_is_rfc3339() {
        let col = ColumnDescriptor::new("created_at", ColumnKind::Datetime);
        let out = coerce(&col, &RawValue::Text("2024-01-02 03:04:05".into()));
        assert_eq!(out, CoercedValue::Text("2024-01-02T03:04:05+00:00".into()));
    }

    #[test]
    fn list_hint_splits_on_comma() {
        let col = ColumnDescriptor::new("tags", ColumnKind::String);
        let out = project(&col, "list", &RawValue::Text("a,b,c".into()));
        assert_eq!(
            out,
            CoercedValue::List(vec![
                CoercedValue::Text("a".into()),
                CoercedValue::Text("b".into()),
                CoercedValue::Text("c".into()),
            ])
        );
    }

    #[test]
    fn list_hint_on_non_string_passes_through() {
        let col = ColumnDescriptor::new("n", ColumnKind::Number);
        let out = project(&col, "list", &RawValue::Int(7));
        assert_eq!(out, CoercedValue::Int(7));
    }

    #[test]
    fn coercing_an_already_coerced_text_value_is_a_fixed_point() {
        let col = ColumnDescriptor::new("name", ColumnKind::String);
        let once = coerce(&col, &RawValue::Text("hello".into()));
        let text = match &once {
            CoercedValue::Text(s) => s.clone(),
            _ => panic!("expected text"),
        };
        let twice = coerce(&col, &RawValue::Text(text));
        assert_eq!(once, twice);
    }
}
