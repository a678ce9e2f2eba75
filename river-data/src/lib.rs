//! Column-level value representation and coercion: the pure, table-driven
//! mapping from a raw, wire-decoded row value to the indexable value the
//! Request Builder stores in a bulk request body.

pub mod coerce;
pub mod column;
pub mod row;
pub mod table;
pub mod value;

pub use coerce::{coerce, project};
pub use column::{ColumnDescriptor, ColumnKind};
pub use row::{RowAction, RowEvent};
pub use table::TableSchema;
pub use value::{CoercedValue, RawValue};
