//! The on-disk (TOML) shape of a rule, before preparation fills in defaults
//! and resolves table metadata.

use std::collections::HashMap;

use serde::Deserialize;

/// One `[[rule]]` entry as read from the rule file.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleConfig {
    pub schema: String,
    pub table: String,
    pub index: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    #[serde(default)]
    pub parent: Option<String>,
    /// Identity column list; defaults to the table's primary key when
    /// absent.
    #[serde(default)]
    pub id: Option<Vec<String>>,
    /// Field (column, value) that must match for a row to be indexed at
    /// all; see `Rule::check_where`.
    #[serde(default, rename = "where")]
    pub wheres: HashMap<String, serde_json::Value>,
    /// Source column name -> `"target_field[,hint]"`.
    #[serde(default)]
    pub fields: HashMap<String, String>,
    #[serde(default)]
    pub actions: ActionMapConfig,
    /// Column allow-list; empty allows all.
    #[serde(default)]
    pub filter: Vec<String>,
    #[serde(default)]
    pub pipeline: Option<String>,
}

/// Action-mapping strings straight from the config: `"index" | "update" |
/// "delete" | ""`, with `""` (and unset fields) disabling that action
/// until `Rule::prepare` fills in the default.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionMapConfig {
    #[serde(default)]
    pub insert: Option<String>,
    #[serde(default)]
    pub update: Option<String>,
    #[serde(default)]
    pub delete: Option<String>,
}

/// A rule file: a sequence of `[[rule]]` tables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleFile {
    #[serde(default, rename = "rule")]
    pub rules: Vec<RuleConfig>,
}
