//! The two value shapes that flow through the Column Coercer: a [`RawValue`]
//! decoded straight off the wire by the replication client, and the
//! [`CoercedValue`] produced by applying a column's type semantics to it.

use std::fmt;

/// A column value in its undigested, wire-decoded form. The replication
/// client hands these to the river; they carry no knowledge of MySQL
/// column-type semantics (that's the Coercer's job).
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    /// Opaque bytes, used for `BIT`, binary strings, and anything the
    /// replication client did not interpret further.
    Bytes(Vec<u8>),
    Text(String),
}

impl RawValue {
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    /// Best-effort decode as UTF-8 text, used by categories (`string`,
    /// `json`, date/time) whose wire representation is textual.
    pub fn as_text(&self) -> Option<String> {
        match self {
            RawValue::Text(s) => Some(s.clone()),
            RawValue::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
            RawValue::Int(n) => Some(n.to_string()),
            RawValue::UInt(n) => Some(n.to_string()),
            RawValue::Float(f) => Some(f.to_string()),
            RawValue::Null => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RawValue::Int(n) => Some(*n),
            RawValue::UInt(n) => i64::try_from(*n).ok(),
            RawValue::Text(s) => s.parse().ok(),
            RawValue::Bytes(b) => std::str::from_utf8(b).ok()?.parse().ok(),
            _ => None,
        }
    }

    /// The canonical textual form used to build document ids (spec §4.3.1):
    /// every non-null component is joined with `":"` using this format.
    pub fn canonical_string(&self) -> Option<String> {
        match self {
            RawValue::Null => None,
            RawValue::Int(n) => Some(n.to_string()),
            RawValue::UInt(n) => Some(n.to_string()),
            RawValue::Float(f) => Some(f.to_string()),
            RawValue::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
            RawValue::Text(s) => Some(s.clone()),
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.canonical_string() {
            Some(s) => write!(f, "{s}"),
            None => write!(f, "NULL"),
        }
    }
}

/// The result of coercing a [`RawValue`] through a column's type semantics.
/// This is the shape stored in a [`crate::row::RowEvent`]'s projected field
/// map and ultimately serialized into a bulk request body.
#[derive(Debug, Clone, PartialEq)]
pub enum CoercedValue {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    List(Vec<CoercedValue>),
    Json(serde_json::Value),
}

impl CoercedValue {
    /// Passthrough conversion used by the `any other` coercion category and
    /// by fallback paths that hand back the original value unchanged.
    pub fn from_raw(v: &RawValue) -> Self {
        match v {
            RawValue::Null => CoercedValue::Null,
            RawValue::Int(n) => CoercedValue::Int(*n),
            RawValue::UInt(n) => CoercedValue::UInt(*n),
            RawValue::Float(f) => CoercedValue::Float(*f),
            RawValue::Bytes(b) => CoercedValue::Text(String::from_utf8_lossy(b).into_owned()),
            RawValue::Text(s) => CoercedValue::Text(s.clone()),
        }
    }

    /// Returns the text payload if this value is textual, used by `list`
    /// projection to decide whether to split on commas.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CoercedValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<CoercedValue> for serde_json::Value {
    fn from(v: CoercedValue) -> Self {
        match v {
            CoercedValue::Null => serde_json::Value::Null,
            CoercedValue::Int(n) => serde_json::Value::from(n),
            CoercedValue::UInt(n) => serde_json::Value::from(n),
            CoercedValue::Float(f) => serde_json::Value::from(f),
            CoercedValue::Text(s) => serde_json::Value::from(s),
            CoercedValue::List(items) => {
                serde_json::Value::Array(items.into_iter().map(Into::into).collect())
            }
            CoercedValue::Json(v) => v,
        }
    }
}
