//! Column metadata as discovered from the source's schema.

use serde::{Deserialize, Serialize};

/// The type category a source column falls into, for the purposes of value
/// coercion. This is a coarser classification than MySQL's full type
/// system: it only distinguishes categories the Coercer treats differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Any integer type (`TINYINT` through `BIGINT`).
    Number,
    /// `FLOAT`, `DOUBLE`, `DECIMAL`.
    Float,
    /// `CHAR`, `VARCHAR`, `TEXT`, and binary string types.
    String,
    /// `ENUM(...)`, value list in [`ColumnDescriptor::enum_values`].
    Enum,
    /// `SET(...)`, value list in [`ColumnDescriptor::set_values`].
    Set,
    /// `BIT(n)`.
    Bit,
    /// `JSON`.
    Json,
    /// `DATE`.
    Date,
    /// `DATETIME`.
    Datetime,
    /// `TIMESTAMP`.
    Timestamp,
    /// Anything not covered above: passed through unchanged.
    Other,
}

/// Metadata about one column of a source table, as discovered from
/// `information_schema` (or supplied directly in tests).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub kind: ColumnKind,
    /// Populated for `ColumnKind::Enum`, ordered 1-indexed per MySQL's
    /// enum encoding (`enum_values[n-1]` is the value for wire integer `n`).
    #[serde(default)]
    pub enum_values: Vec<String>,
    /// Populated for `ColumnKind::Set`, ordered so bit `i` of the wire
    /// bitmask corresponds to `set_values[i]`.
    #[serde(default)]
    pub set_values: Vec<String>,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        ColumnDescriptor {
            name: name.into(),
            kind,
            enum_values: Vec::new(),
            set_values: Vec::new(),
        }
    }

    pub fn with_enum_values(mut self, values: Vec<String>) -> Self {
        self.enum_values = values;
        self
    }

    pub fn with_set_values(mut self, values: Vec<String>) -> Self {
        self.set_values = values;
        self
    }
}
