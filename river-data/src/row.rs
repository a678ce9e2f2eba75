//! The row-event shape handed to the Request Builder (spec §3's `RowEvent`).

use crate::value::RawValue;

/// The kind of change a [`RowEvent`] carries, matching the replication
/// client's action vocabulary (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    Insert,
    Update,
    Delete,
}

/// One batch of row changes for a single `(schema, table)`, as delivered by
/// the replication client for one binlog event.
///
/// For `Update`, `rows` holds before/after pairs: `rows[2k]` is the
/// before-image and `rows[2k + 1]` is the after-image of the `k`th changed
/// row. For `Insert` and `Delete`, each entry is a complete row image.
#[derive(Debug, Clone)]
pub struct RowEvent {
    pub schema: String,
    pub table: String,
    pub action: RowAction,
    pub rows: Vec<Vec<RawValue>>,
}

impl RowEvent {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        action: RowAction,
        rows: Vec<Vec<RawValue>>,
    ) -> Self {
        RowEvent {
            schema: schema.into(),
            table: table.into(),
            action,
            rows,
        }
    }
}
