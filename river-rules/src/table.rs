//! The Rule Table: a `(schema, table) -> Rule` map, reloadable on DDL
//! (spec §4.2).

use std::collections::HashMap;
use std::path::Path;

use river_errors::{RiverError, RiverResult};
use tracing::info;

use crate::config::RuleFile;
use crate::rule::Rule;
use crate::schema_provider::SchemaProvider;

/// Owns every rule for the current deployment. Mutated only by
/// [`RuleTable::refresh`], which is called from the event-handler callback
/// for table-changed events — already serialized with row events on the
/// replication consumer task, so no internal locking is required (spec §9).
#[derive(Debug, Default)]
pub struct RuleTable {
    rules: HashMap<(String, String), Rule>,
}

impl RuleTable {
    pub fn new() -> Self {
        RuleTable {
            rules: HashMap::new(),
        }
    }

    /// Load a rule file from `path` and prepare each rule against schema
    /// metadata fetched through `provider`.
    pub async fn load(path: impl AsRef<Path>, provider: &dyn SchemaProvider) -> RiverResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| RiverError::Config(format!("reading rule file: {e}")))?;
        let file: RuleFile = toml::from_str(&text)
            .map_err(|e| RiverError::Config(format!("parsing rule file: {e}")))?;
        Self::from_configs(file.rules, provider).await
    }

    async fn from_configs(
        configs: Vec<crate::config::RuleConfig>,
        provider: &dyn SchemaProvider,
    ) -> RiverResult<Self> {
        let mut table = RuleTable::new();
        for config in configs {
            let schema_meta = provider.table_schema(&config.schema, &config.table).await?;
            let key = (config.schema.clone(), config.table.clone());
            let rule = Rule::prepare(config, schema_meta)?;
            info!(schema = %rule.schema, table = %rule.table, index = %rule.index, "loaded rule");
            table.rules.insert(key, rule);
        }
        Ok(table)
    }

    /// `lookup(schema, table) -> Rule | not-found` (spec §4.2).
    pub fn lookup(&self, schema: &str, table: &str) -> Option<&Rule> {
        self.rules.get(&(schema.to_string(), table.to_string()))
    }

    /// Re-read `table`'s schema metadata and rebuild its rule's
    /// column-index map. A table with no matching rule is not an error
    /// (spec §4.2).
    pub async fn refresh(
        &mut self,
        schema: &str,
        table: &str,
        provider: &dyn SchemaProvider,
    ) -> RiverResult<()> {
        let key = (schema.to_string(), table.to_string());
        let Some(rule) = self.rules.get_mut(&key) else {
            return Ok(());
        };
        let schema_meta = provider.table_schema(schema, table).await?;
        rule.refresh(schema_meta)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
