//! The Request Builder (spec §4.3): per-event routines turning decoded rows
//! into zero or more [`BulkRequest`]s, using a [`Rule`] and the Column
//! Coercer.

use std::collections::HashMap;

use river_data::{coerce, project, CoercedValue, ColumnDescriptor, RawValue, RowAction};
use river_errors::{RiverError, RiverResult};
use river_rules::{BulkAction, Rule};

use crate::request::BulkRequest;

fn column_for<'a>(rule: &'a Rule, source_column: &str) -> RiverResult<(&'a ColumnDescriptor, usize)> {
    let index = *rule.column_index.get(source_column).ok_or_else(|| {
        RiverError::Config(format!(
            "column {source_column:?} not found on {}.{}",
            rule.schema, rule.table
        ))
    })?;
    let col = rule
        .table_schema
        .columns
        .get(index)
        .ok_or_else(|| RiverError::Config(format!("column index out of range for {source_column:?}")))?;
    Ok((col, index))
}

/// Document id derivation (spec §4.3.1): identity-column values, in order,
/// joined with `":"`. Any null component is an [`RiverError::Id`].
pub fn doc_id(rule: &Rule, row: &[RawValue]) -> RiverResult<String> {
    let mut parts = Vec::with_capacity(rule.identity_columns.len());
    for col_name in &rule.identity_columns {
        let (_, index) = column_for(rule, col_name)?;
        let value = row.get(index).ok_or_else(|| {
            RiverError::Id(format!("row too short for identity column {col_name:?}"))
        })?;
        let part = value
            .canonical_string()
            .ok_or_else(|| RiverError::Id(format!("identity column {col_name:?} is null")))?;
        parts.push(part);
    }
    Ok(parts.join(":"))
}

/// Parent id derivation (spec §4.3.2): the configured parent column,
/// formatted as text. A null parent value yields `None`.
pub fn parent_id(rule: &Rule, row: &[RawValue]) -> RiverResult<Option<String>> {
    let Some(col_name) = &rule.parent_column else {
        return Ok(None);
    };
    let (_, index) = column_for(rule, col_name)?;
    let value = row
        .get(index)
        .ok_or_else(|| RiverError::Config(format!("row too short for parent column {col_name:?}")))?;
    Ok(value.canonical_string())
}

/// Field projection (spec §4.3.3): apply every field mapping, consulting
/// `check_where` along the way. Any existing-and-failing where check filters
/// out the whole row (`Ok(None)`).
pub fn project_row(
    rule: &Rule,
    row: &[RawValue],
) -> RiverResult<Option<HashMap<String, CoercedValue>>> {
    let mut out = HashMap::with_capacity(rule.fields.len());
    for mapping in &rule.fields {
        let (col, index) = column_for(rule, &mapping.source_column)?;
        let raw = row.get(index).ok_or_else(|| {
            RiverError::Config(format!("row too short for column {:?}", mapping.source_column))
        })?;
        let value = if mapping.hint.is_empty() {
            coerce(col, raw)
        } else {
            project(col, &mapping.hint, raw)
        };
        let (exists, pass) = rule.check_where(&mapping.source_column, &value);
        if exists && !pass {
            return Ok(None);
        }
        out.insert(mapping.target_field.clone(), value);
    }
    Ok(Some(out))
}

/// `build_ins_del` (spec §4.3): insert and delete events. `action` must be
/// [`RowAction::Insert`] or [`RowAction::Delete`].
pub fn build_ins_del(
    rule: &Rule,
    action: RowAction,
    rows: &[Vec<RawValue>],
) -> RiverResult<Vec<BulkRequest>> {
    let mapped = match action {
        RowAction::Insert => rule.actions.insert,
        RowAction::Delete => rule.actions.delete,
        RowAction::Update => {
            return Err(RiverError::Config(
                "build_ins_del called with an update action".into(),
            ))
        }
    };
    let Some(mapped) = mapped else {
        return Ok(Vec::new());
    };

    let mut requests = Vec::with_capacity(rows.len());
    for row in rows {
        let id = doc_id(rule, row)?;
        let parent = parent_id(rule, row)?;
        if mapped == BulkAction::Delete {
            requests.push(BulkRequest::delete(rule.index.clone(), rule.doc_type.clone(), id, parent));
            continue;
        }
        let Some(fields) = project_row(rule, row)? else {
            continue;
        };
        requests.push(BulkRequest::write(
            rule.index.clone(),
            rule.doc_type.clone(),
            id,
            parent,
            rule.pipeline.clone(),
            mapped,
            fields,
        ));
    }
    Ok(requests)
}

/// The outcome of diffing one before/after pair with stable identity (spec
/// §4.3.4), before identity-change handling is even considered.
enum DiffOutcome {
    Delete,
    Write(BulkAction, HashMap<String, CoercedValue>),
    Nothing,
}

fn diff_update(rule: &Rule, before: &[RawValue], after: &[RawValue]) -> RiverResult<DiffOutcome> {
    let mut projected = Vec::with_capacity(rule.fields.len());

    for mapping in &rule.fields {
        let (col, index) = column_for(rule, &mapping.source_column)?;
        let raw_before = before.get(index).ok_or_else(|| {
            RiverError::Config(format!("row too short for column {:?}", mapping.source_column))
        })?;
        let raw_after = after.get(index).ok_or_else(|| {
            RiverError::Config(format!("row too short for column {:?}", mapping.source_column))
        })?;

        let (before_value, after_value) = if mapping.hint.is_empty() {
            (coerce(col, raw_before), coerce(col, raw_after))
        } else {
            (
                project(col, &mapping.hint, raw_before),
                project(col, &mapping.hint, raw_after),
            )
        };

        let (exists, pass) = rule.check_where(&mapping.source_column, &after_value);
        if exists && !pass {
            return Ok(DiffOutcome::Delete);
        }

        let changed = before_value != after_value;
        projected.push((mapping.target_field.clone(), after_value, changed, exists));
    }

    // Upgrade to a full index only when a where-configured field's value
    // changed: the row may not have existed in the target under its old
    // value, so a delta-only update would leave the rest of the document
    // unset (spec §4.3.4, scenario 7's counterpart).
    let action = if projected.iter().any(|(_, _, changed, exists)| *changed && *exists) {
        BulkAction::Index
    } else {
        BulkAction::Update
    };

    let body: HashMap<String, CoercedValue> = match action {
        BulkAction::Index => projected.into_iter().map(|(field, value, ..)| (field, value)).collect(),
        _ => projected
            .into_iter()
            .filter(|(_, _, changed, _)| *changed)
            .map(|(field, value, ..)| (field, value))
            .collect(),
    };

    if body.is_empty() {
        Ok(DiffOutcome::Nothing)
    } else {
        Ok(DiffOutcome::Write(action, body))
    }
}

/// `build_update` (spec §4.3): require an even row count (before/after
/// pairs); the identity-change, pipeline, and plain-diff paths of §4.3.4.
pub fn build_update(rule: &Rule, rows: &[Vec<RawValue>]) -> RiverResult<Vec<BulkRequest>> {
    if rows.len() % 2 != 0 {
        return Err(RiverError::Config(format!(
            "update event for {}.{} has an odd row count",
            rule.schema, rule.table
        )));
    }
    if rule.actions.update.is_none() {
        return Ok(Vec::new());
    }

    let mut requests = Vec::new();
    for pair in rows.chunks_exact(2) {
        let (before, after) = (&pair[0], &pair[1]);
        let before_id = doc_id(rule, before)?;
        let after_id = doc_id(rule, after)?;
        let before_parent = parent_id(rule, before)?;
        let after_parent = parent_id(rule, after)?;

        if before_id != after_id || before_parent != after_parent {
            requests.push(BulkRequest::delete(
                rule.index.clone(),
                rule.doc_type.clone(),
                before_id.clone(),
                before_parent,
            ));
            if let Some(fields) = project_row(rule, after)? {
                requests.push(BulkRequest::write(
                    rule.index.clone(),
                    rule.doc_type.clone(),
                    after_id.clone(),
                    after_parent,
                    rule.pipeline.clone(),
                    BulkAction::Index,
                    fields,
                ));
            }
            continue;
        }

        if rule.pipeline.is_some() {
            if let Some(fields) = project_row(rule, after)? {
                requests.push(BulkRequest::write(
                    rule.index.clone(),
                    rule.doc_type.clone(),
                    after_id.clone(),
                    after_parent,
                    rule.pipeline.clone(),
                    BulkAction::Index,
                    fields,
                ));
            }
            continue;
        }

        match diff_update(rule, before, after)? {
            DiffOutcome::Delete => {
                requests.push(BulkRequest::delete(
                    rule.index.clone(),
                    rule.doc_type.clone(),
                    after_id.clone(),
                    after_parent,
                ));
            }
            DiffOutcome::Write(action, body) => {
                requests.push(BulkRequest::write(
                    rule.index.clone(),
                    rule.doc_type.clone(),
                    after_id.clone(),
                    after_parent,
                    None,
                    action,
                    body,
                ));
            }
            DiffOutcome::Nothing => {}
        }
    }
    Ok(requests)
}

#[cfg(test)]
mod tests {
    use river_data::{ColumnDescriptor, ColumnKind, TableSchema};
    use river_rules::{ActionMapConfig, RuleConfig};
    use std::collections::HashMap as Map;

    use super::*;

    fn schema() -> TableSchema {
        TableSchema::new(
            vec![
                ColumnDescriptor::new("k", ColumnKind::Number),
                ColumnDescriptor::new("v", ColumnKind::String),
            ],
            vec!["k".into()],
        )
    }

    fn config() -> RuleConfig {
        let mut fields = Map::new();
        fields.insert("k".to_string(), String::new());
        fields.insert("v".to_string(), String::new());
        RuleConfig {
            schema: "s".into(),
            table: "t".into(),
            index: "t".into(),
            doc_type: "t".into(),
            parent: None,
            id: Some(vec!["k".into()]),
            wheres: Map::new(),
            fields,
            actions: ActionMapConfig::default(),
            filter: Vec::new(),
            pipeline: None,
        }
    }

    fn row(k: i64, v: &str) -> Vec<RawValue> {
        vec![RawValue::Int(k), RawValue::Text(v.to_string())]
    }

    // Scenario 1
    #[test]
    fn insert_builds_one_index_request() {
        let rule = Rule::prepare(config(), schema()).unwrap();
        let rows = vec![row(7, "hi")];
        let requests = build_ins_del(&rule, RowAction::Insert, &rows).unwrap();
        assert_eq!(requests.len(), 1);
        let req = &requests[0];
        assert_eq!(req.id, "7");
        assert_eq!(req.action, BulkAction::Index);
        let fields = req.fields.as_ref().unwrap();
        assert_eq!(fields.get("k"), Some(&CoercedValue::Int(7)));
        assert_eq!(fields.get("v"), Some(&CoercedValue::Text("hi".into())));
    }

    // Scenario 2
    #[test]
    fn stable_identity_update_emits_delta_only_body() {
        let rule = Rule::prepare(config(), schema()).unwrap();
        let rows = vec![row(7, "a"), row(7, "b")];
        let requests = build_update(&rule, &rows).unwrap();
        assert_eq!(requests.len(), 1);
        let req = &requests[0];
        assert_eq!(req.id, "7");
        assert_eq!(req.action, BulkAction::Update);
        let fields = req.fields.as_ref().unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields.get("v"), Some(&CoercedValue::Text("b".into())));
    }

    // Scenario 3
    #[test]
    fn pipeline_forces_full_index_body() {
        let mut config = config();
        config.pipeline = Some("enrich".into());
        let rule = Rule::prepare(config, schema()).unwrap();
        let rows = vec![row(7, "a"), row(7, "b")];
        let requests = build_update(&rule, &rows).unwrap();
        assert_eq!(requests.len(), 1);
        let req = &requests[0];
        assert_eq!(req.action, BulkAction::Index);
        assert_eq!(req.pipeline.as_deref(), Some("enrich"));
        let fields = req.fields.as_ref().unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields.get("v"), Some(&CoercedValue::Text("b".into())));
    }

    // Scenario 4
    #[test]
    fn identity_change_emits_delete_then_index() {
        let rule = Rule::prepare(config(), schema()).unwrap();
        let rows = vec![row(7, "a"), row(8, "a")];
        let requests = build_update(&rule, &rows).unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].action, BulkAction::Delete);
        assert_eq!(requests[0].id, "7");
        assert_eq!(requests[1].action, BulkAction::Index);
        assert_eq!(requests[1].id, "8");
    }

    // Scenario 7
    #[test]
    fn where_clause_failure_on_after_image_downgrades_to_delete() {
        let status_schema = TableSchema::new(
            vec![
                ColumnDescriptor::new("id", ColumnKind::Number),
                ColumnDescriptor::new("status", ColumnKind::Number),
            ],
            vec!["id".into()],
        );
        let mut fields = Map::new();
        fields.insert("id".to_string(), String::new());
        fields.insert("status".to_string(), String::new());
        let mut wheres = Map::new();
        wheres.insert("status".to_string(), serde_json::json!(1));
        let config = RuleConfig {
            schema: "s".into(),
            table: "t".into(),
            index: "t".into(),
            doc_type: "t".into(),
            parent: None,
            id: Some(vec!["id".into()]),
            wheres,
            fields,
            actions: ActionMapConfig::default(),
            filter: Vec::new(),
            pipeline: None,
        };
        let rule = Rule::prepare(config, status_schema).unwrap();
        let rows = vec![
            vec![RawValue::Int(1), RawValue::Int(1)],
            vec![RawValue::Int(1), RawValue::Int(0)],
        ];
        let requests = build_update(&rule, &rows).unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].action, BulkAction::Delete);
        assert_eq!(requests[0].id, "1");
    }

    #[test]
    fn where_field_newly_passing_upgrades_to_index_with_full_body() {
        let status_schema = TableSchema::new(
            vec![
                ColumnDescriptor::new("id", ColumnKind::Number),
                ColumnDescriptor::new("status", ColumnKind::Number),
            ],
            vec!["id".into()],
        );
        let mut fields = Map::new();
        fields.insert("id".to_string(), String::new());
        fields.insert("status".to_string(), String::new());
        let mut wheres = Map::new();
        wheres.insert("status".to_string(), serde_json::json!(1));
        let config = RuleConfig {
            schema: "s".into(),
            table: "t".into(),
            index: "t".into(),
            doc_type: "t".into(),
            parent: None,
            id: Some(vec!["id".into()]),
            wheres,
            fields,
            actions: ActionMapConfig::default(),
            filter: Vec::new(),
            pipeline: None,
        };
        let rule = Rule::prepare(config, status_schema).unwrap();
        let rows = vec![
            vec![RawValue::Int(1), RawValue::Int(0)],
            vec![RawValue::Int(1), RawValue::Int(1)],
        ];
        let requests = build_update(&rule, &rows).unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].action, BulkAction::Index);
        let fields = requests[0].fields.as_ref().unwrap();
        assert_eq!(fields.get("id"), Some(&CoercedValue::Int(1)));
        assert_eq!(fields.get("status"), Some(&CoercedValue::Int(1)));
    }

    #[test]
    fn no_observable_change_emits_nothing() {
        let rule = Rule::prepare(config(), schema()).unwrap();
        let rows = vec![row(7, "a"), row(7, "a")];
        let requests = build_update(&rule, &rows).unwrap();
        assert!(requests.is_empty());
    }

    #[test]
    fn null_identity_component_is_id_error() {
        let rule = Rule::prepare(config(), schema()).unwrap();
        let rows = vec![vec![RawValue::Null, RawValue::Text("hi".into())]];
        assert!(build_ins_del(&rule, RowAction::Insert, &rows).is_err());
    }

    #[test]
    fn disabled_action_skips_whole_batch() {
        let mut config = config();
        config.actions.insert = Some("".into());
        let rule = Rule::prepare(config, schema()).unwrap();
        let rows = vec![row(7, "hi")];
        let requests = build_ins_del(&rule, RowAction::Insert, &rows).unwrap();
        assert!(requests.is_empty());
    }
}
