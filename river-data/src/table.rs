//! Cached table metadata, as produced by schema discovery and consulted by
//! the Rule Table and Request Builder.

use crate::column::ColumnDescriptor;

/// The column layout and primary key of one source table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSchema {
    pub columns: Vec<ColumnDescriptor>,
    /// Primary-key column names, in declared order. Used as the default
    /// identity-column list when a rule does not specify one.
    pub primary_key: Vec<String>,
}

impl TableSchema {
    pub fn new(columns: Vec<ColumnDescriptor>, primary_key: Vec<String>) -> Self {
        TableSchema {
            columns,
            primary_key,
        }
    }

    /// Position of `name` in the table's column order, used both to align
    /// row-tuple values and as the backing store for a rule's
    /// column-name-to-index map.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }
}
