//! The schema-discovery collaborator the Rule Table consults on load and on
//! DDL (spec §4.2's `refresh`). Implemented against the source database by
//! `river-mysql`; tests use an in-memory stand-in.

use async_trait::async_trait;
use river_data::TableSchema;
use river_errors::RiverResult;

/// Discovers column metadata and primary-key order for one source table.
#[async_trait]
pub trait SchemaProvider: Send + Sync {
    async fn table_schema(&self, schema: &str, table: &str) -> RiverResult<TableSchema>;
}
