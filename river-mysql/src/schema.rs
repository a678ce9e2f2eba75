//! Schema discovery against the source's `information_schema` (SPEC_FULL
//! §4.7): the [`river_rules::SchemaProvider`] implementation backing
//! `RuleTable` preparation and DDL-triggered refresh.

use async_trait::async_trait;
use mysql_async::prelude::*;
use mysql_async::Pool;
use river_data::{ColumnDescriptor, ColumnKind, TableSchema};
use river_errors::{RiverError, RiverResult};
use river_rules::SchemaProvider;

/// Discovers [`TableSchema`]s by querying `information_schema.columns` and
/// `information_schema.key_column_usage` on the source connection pool.
/// Cheap to clone: `Pool` is itself a handle onto a shared connection pool.
#[derive(Clone)]
pub struct TableMetadataProvider {
    pool: Pool,
}

impl TableMetadataProvider {
    pub fn new(pool: Pool) -> Self {
        TableMetadataProvider { pool }
    }
}

fn column_kind(data_type: &str) -> ColumnKind {
    match data_type {
        "tinyint" | "smallint" | "mediumint" | "int" | "bigint" | "year" => ColumnKind::Number,
        "float" | "double" | "decimal" => ColumnKind::Float,
        "char" | "varchar" | "text" | "tinytext" | "mediumtext" | "longtext" | "binary"
        | "varbinary" | "blob" | "tinyblob" | "mediumblob" | "longblob" => ColumnKind::String,
        "enum" => ColumnKind::Enum,
        "set" => ColumnKind::Set,
        "bit" => ColumnKind::Bit,
        "json" => ColumnKind::Json,
        "date" => ColumnKind::Date,
        "datetime" => ColumnKind::Datetime,
        "timestamp" => ColumnKind::Timestamp,
        _ => ColumnKind::Other,
    }
}

/// Parse the quoted value list out of a `COLUMN_TYPE` like
/// `enum('x','y','z')` or `set('a','b')`, in declared (wire) order.
fn parse_value_list(column_type: &str) -> Vec<String> {
    let Some(start) = column_type.find('(') else {
        return Vec::new();
    };
    let Some(end) = column_type.rfind(')') else {
        return Vec::new();
    };
    if end <= start {
        return Vec::new();
    }
    column_type[start + 1..end]
        .split(',')
        .map(|token| token.trim().trim_matches('\'').to_string())
        .collect()
}

#[async_trait]
impl SchemaProvider for TableMetadataProvider {
    async fn table_schema(&self, schema: &str, table: &str) -> RiverResult<TableSchema> {
        let mut conn = self
            .pool
            .get_conn()
            .await
            .map_err(|e| RiverError::Transport(format!("connecting for schema discovery: {e}")))?;

        let rows: Vec<(String, String, String)> = conn
            .exec(
                "SELECT COLUMN_NAME, DATA_TYPE, COLUMN_TYPE FROM information_schema.columns \
                 WHERE table_schema = ? AND table_name = ? ORDER BY ORDINAL_POSITION",
                (schema, table),
            )
            .await
            .map_err(|e| RiverError::Transport(format!("querying column metadata: {e}")))?;

        if rows.is_empty() {
            return Err(RiverError::Config(format!(
                "table {schema}.{table} has no columns (does it exist?)"
            )));
        }

        let columns = rows
            .into_iter()
            .map(|(name, data_type, column_type)| {
                let kind = column_kind(&data_type);
                let mut descriptor = ColumnDescriptor::new(name, kind);
                match kind {
                    ColumnKind::Enum => descriptor = descriptor.with_enum_values(parse_value_list(&column_type)),
                    ColumnKind::Set => descriptor = descriptor.with_set_values(parse_value_list(&column_type)),
                    _ => {}
                }
                descriptor
            })
            .collect();

        let primary_key: Vec<String> = conn
            .exec(
                "SELECT COLUMN_NAME FROM information_schema.key_column_usage \
                 WHERE table_schema = ? AND table_name = ? AND constraint_name = 'PRIMARY' \
                 ORDER BY ORDINAL_POSITION",
                (schema, table),
            )
            .await
            .map_err(|e| RiverError::Transport(format!("querying primary key metadata: {e}")))?;

        Ok(TableSchema::new(columns, primary_key))
    }
}
