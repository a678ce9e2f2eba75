//! The Rule Table: per-table configuration binding a source MySQL table to
//! a target search-store index (spec §4.2).

pub mod config;
pub mod rule;
pub mod schema_provider;
pub mod table;

pub use config::{ActionMapConfig, RuleConfig, RuleFile};
pub use rule::{ActionMap, BulkAction, FieldMapping, Rule};
pub use schema_provider::SchemaProvider;
pub use table::RuleTable;
