//! The search-store bulk HTTP client (SPEC_FULL §4.8): posts
//! newline-delimited JSON to the target's `_bulk` endpoint, matching the
//! wire shape `spec.md` §6 describes.

use river_errors::{RiverError, RiverResult};
use river_rules::BulkAction;
use river_sync::{BulkItemResult, BulkOutcome, BulkRequest, SearchStore};
use serde_json::{json, Value};

/// A bulk-API client over one Elasticsearch-family base URL.
pub struct BulkClient {
    base_url: String,
    client: reqwest::Client,
}

impl BulkClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        BulkClient {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn bulk_url(&self) -> String {
        format!("{}/_bulk", self.base_url.trim_end_matches('/'))
    }
}

fn action_name(action: BulkAction) -> &'static str {
    match action {
        BulkAction::Index => "index",
        BulkAction::Update => "update",
        BulkAction::Delete => "delete",
    }
}

/// Render one request as its one (delete) or two (index/update) NDJSON
/// lines.
fn render(request: &BulkRequest) -> String {
    let mut meta = serde_json::Map::new();
    meta.insert("_index".to_string(), json!(request.index));
    meta.insert("_type".to_string(), json!(request.doc_type));
    meta.insert("_id".to_string(), json!(request.id));
    if let Some(parent) = &request.parent_id {
        meta.insert("_parent".to_string(), json!(parent));
    }
    if let Some(pipeline) = &request.pipeline {
        meta.insert("pipeline".to_string(), json!(pipeline));
    }
    let action_line = json!({ (action_name(request.action)): meta });

    match (&request.action, &request.fields) {
        (BulkAction::Delete, _) => format!("{action_line}\n"),
        (_, Some(fields)) => {
            let body: Value = serde_json::Map::from_iter(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from(v.clone()))),
            )
            .into();
            let source_line = if matches!(request.action, BulkAction::Update) {
                json!({ "doc": body })
            } else {
                body
            };
            format!("{action_line}\n{source_line}\n")
        }
        (_, None) => format!("{action_line}\n"),
    }
}

fn parse_item(value: &Value) -> Option<BulkItemResult> {
    let (action, body) = value.as_object()?.iter().next()?;
    let status = body.get("status").and_then(Value::as_u64).unwrap_or(0) as u16;
    let error = if status >= 300 {
        body.get("error").map(|e| e.to_string()).unwrap_or_default()
    } else {
        String::new()
    };
    Some(BulkItemResult {
        action: action.clone(),
        index: body.get("_index").and_then(Value::as_str).unwrap_or_default().to_string(),
        doc_type: body.get("_type").and_then(Value::as_str).unwrap_or_default().to_string(),
        id: body.get("_id").and_then(Value::as_str).unwrap_or_default().to_string(),
        status,
        error,
    })
}

#[async_trait::async_trait]
impl SearchStore for BulkClient {
    async fn bulk(&self, requests: &[BulkRequest]) -> RiverResult<BulkOutcome> {
        if requests.is_empty() {
            return Ok(BulkOutcome::default());
        }

        let mut body = String::new();
        for request in requests {
            body.push_str(&render(request));
        }

        let response = self
            .client
            .post(self.bulk_url())
            .header("Content-Type", "application/x-ndjson")
            .body(body)
            .send()
            .await
            .map_err(|e| RiverError::Transport(format!("submitting bulk request: {e}")))?;

        if !response.status().is_success() {
            return Err(RiverError::Transport(format!(
                "bulk request rejected with status {}",
                response.status()
            )));
        }

        let parsed: Value = response
            .json()
            .await
            .map_err(|e| RiverError::Transport(format!("decoding bulk response: {e}")))?;

        let errors = parsed.get("errors").and_then(Value::as_bool).unwrap_or(false);
        let items = parsed
            .get("items")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(parse_item).collect())
            .unwrap_or_default();

        Ok(BulkOutcome { errors, items })
    }
}
