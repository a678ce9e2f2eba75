//! A single `(schema, table) -> index` mapping: the Rule (spec §3/§4.2).

use std::collections::HashMap;

use river_data::{CoercedValue, TableSchema};
use river_errors::{RiverError, RiverResult};

use crate::config::{ActionMapConfig, RuleConfig};

/// The search-store action a row change maps to. `None` (an empty string in
/// config) disables the corresponding action entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    Index,
    Update,
    Delete,
}

impl BulkAction {
    fn parse(s: &str) -> RiverResult<Option<BulkAction>> {
        match s {
            "" => Ok(None),
            "index" => Ok(Some(BulkAction::Index)),
            "update" => Ok(Some(BulkAction::Update)),
            "delete" => Ok(Some(BulkAction::Delete)),
            other => Err(RiverError::Config(format!(
                "invalid action mapping value {other:?}"
            ))),
        }
    }
}

/// The insert/update/delete -> search-store-action mapping, fully populated
/// with defaults by `Rule::prepare`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionMap {
    pub insert: Option<BulkAction>,
    pub update: Option<BulkAction>,
    pub delete: Option<BulkAction>,
}

impl ActionMap {
    fn prepare(config: &ActionMapConfig) -> RiverResult<Self> {
        let insert = match &config.insert {
            Some(s) => BulkAction::parse(s)?,
            None => Some(BulkAction::Index),
        };
        let update = match &config.update {
            Some(s) => BulkAction::parse(s)?,
            None => Some(BulkAction::Update),
        };
        let delete = match &config.delete {
            Some(s) => BulkAction::parse(s)?,
            None => Some(BulkAction::Delete),
        };
        Ok(ActionMap {
            insert,
            update,
            delete,
        })
    }
}

/// One parsed `source column -> target_field[,hint]` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub source_column: String,
    pub target_field: String,
    /// One of `"list"`, `"string"`, `"date"`, `"timestamp"`, or `""`.
    pub hint: String,
}

fn parse_field_mapping(source_column: &str, raw: &str) -> RiverResult<FieldMapping> {
    let tokens: Vec<&str> = raw.split(',').collect();
    if tokens.is_empty() || tokens.len() > 2 {
        return Err(RiverError::Config(format!(
            "field mapping for {source_column:?} must have 1 or 2 comma-separated tokens, got {raw:?}"
        )));
    }
    let target_field = if tokens[0].is_empty() {
        source_column.to_string()
    } else {
        tokens[0].to_string()
    };
    let hint = tokens.get(1).copied().unwrap_or("").to_string();
    Ok(FieldMapping {
        source_column: source_column.to_string(),
        target_field,
        hint,
    })
}

/// A fully prepared rule: defaults filled, table metadata cached, ready to
/// drive the Request Builder.
#[derive(Debug, Clone)]
pub struct Rule {
    pub schema: String,
    pub table: String,
    pub index: String,
    pub doc_type: String,
    pub parent_column: Option<String>,
    pub identity_columns: Vec<String>,
    pub wheres: HashMap<String, serde_json::Value>,
    pub fields: Vec<FieldMapping>,
    pub actions: ActionMap,
    pub filter: Vec<String>,
    pub pipeline: Option<String>,
    pub table_schema: TableSchema,
    pub column_index: HashMap<String, usize>,
}

impl Rule {
    /// Preparation on load (spec §4.2): fills default action mapping,
    /// lowercases index/type, resolves identity columns (explicit list or
    /// the table's primary key), and rebuilds the column-name-to-index map.
    pub fn prepare(config: RuleConfig, table_schema: TableSchema) -> RiverResult<Self> {
        let identity_columns = match config.id {
            Some(cols) if !cols.is_empty() => cols,
            _ => table_schema.primary_key.clone(),
        };
        for col in &identity_columns {
            if !table_schema.has_column(col) {
                return Err(RiverError::Config(format!(
                    "identity column {col:?} does not exist on {}.{}",
                    config.schema, config.table
                )));
            }
        }

        let mut fields = Vec::with_capacity(config.fields.len());
        for (source_column, raw) in &config.fields {
            fields.push(parse_field_mapping(source_column, raw)?);
        }

        let column_index = table_schema
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();

        Ok(Rule {
            schema: config.schema,
            table: config.table,
            index: config.index.to_lowercase(),
            doc_type: config.doc_type.to_lowercase(),
            parent_column: config.parent,
            identity_columns,
            wheres: config.wheres,
            fields,
            actions: ActionMap::prepare(&config.actions)?,
            filter: config.filter,
            pipeline: config.pipeline,
            table_schema,
            column_index,
        })
    }

    /// Rebuild cached table metadata after a DDL change (spec §4.2's
    /// `refresh`). Identity columns are re-validated; a column the rule
    /// depended on disappearing is a config error during streaming.
    pub fn refresh(&mut self, table_schema: TableSchema) -> RiverResult<()> {
        for col in &self.identity_columns {
            if !table_schema.has_column(col) {
                return Err(RiverError::Config(format!(
                    "identity column {col:?} no longer exists on {}.{} after schema change",
                    self.schema, self.table
                )));
            }
        }
        self.column_index = table_schema
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();
        self.table_schema = table_schema;
        Ok(())
    }

    /// Where-clause check (spec §4.2): `exists` is true iff `field` is
    /// constrained by this rule; `pass` is true iff `value` deep-equals the
    /// configured requirement (or `field` is unconstrained).
    pub fn check_where(&self, field: &str, value: &CoercedValue) -> (bool, bool) {
        match self.wheres.get(field) {
            Some(required) => {
                let actual: serde_json::Value = value.clone().into();
                (true, &actual == required)
            }
            None => (false, true),
        }
    }

    /// Allow-list check (spec §4.2): an empty filter allows every column.
    pub fn check_filter(&self, field: &str) -> bool {
        self.filter.is_empty() || self.filter.iter().any(|f| f == field)
    }
}
