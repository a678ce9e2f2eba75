//! The Request Builder's output shape: a single document-level operation
//! bound for the search store (spec §3's `BulkRequest`).

use std::collections::HashMap;

use river_data::CoercedValue;
use river_rules::BulkAction;

/// One document operation, already resolved against a [`river_rules::Rule`]:
/// target index/type, document id, and (for non-delete) a field body.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkRequest {
    pub index: String,
    pub doc_type: String,
    pub id: String,
    pub parent_id: Option<String>,
    pub pipeline: Option<String>,
    pub action: BulkAction,
    pub fields: Option<HashMap<String, CoercedValue>>,
}

impl BulkRequest {
    pub fn delete(
        index: impl Into<String>,
        doc_type: impl Into<String>,
        id: impl Into<String>,
        parent_id: Option<String>,
    ) -> Self {
        BulkRequest {
            index: index.into(),
            doc_type: doc_type.into(),
            id: id.into(),
            parent_id,
            pipeline: None,
            action: BulkAction::Delete,
            fields: None,
        }
    }

    pub fn write(
        index: impl Into<String>,
        doc_type: impl Into<String>,
        id: impl Into<String>,
        parent_id: Option<String>,
        pipeline: Option<String>,
        action: BulkAction,
        fields: HashMap<String, CoercedValue>,
    ) -> Self {
        debug_assert_ne!(action, BulkAction::Delete);
        BulkRequest {
            index: index.into(),
            doc_type: doc_type.into(),
            id: id.into(),
            parent_id,
            pipeline,
            action,
            fields: Some(fields),
        }
    }
}
