//! The search-store bulk API collaborator (spec §4.6, §6): submit a batch
//! of [`BulkRequest`]s, get back per-item outcomes. Implemented over HTTP
//! by `river::es::BulkClient`; tests use an in-memory stand-in.

use std::sync::Arc;

use async_trait::async_trait;
use river_errors::RiverResult;

use crate::request::BulkRequest;

/// One item's outcome within a bulk response (spec §6: per-item
/// `{action -> {index, type, id, status, error}}`).
#[derive(Debug, Clone, PartialEq)]
pub struct BulkItemResult {
    pub action: String,
    pub index: String,
    pub doc_type: String,
    pub id: String,
    pub status: u16,
    /// Empty when the item succeeded.
    pub error: String,
}

impl BulkItemResult {
    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }
}

/// The whole batch's outcome: whether the store reported `errors=true` and
/// the individual item results (spec §4.6). A non-empty `items` with no
/// transport failure is not itself a fatal condition — per-item errors are
/// logged and the batch is still considered complete.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkOutcome {
    pub errors: bool,
    pub items: Vec<BulkItemResult>,
}

/// The search store's bulk submission endpoint (spec §4.6, §6).
#[async_trait]
pub trait SearchStore: Send + Sync {
    /// Submit `requests` as one bulk call. A transport-level failure is
    /// returned as `Err` and is fatal to the caller; per-item rejections are
    /// reported inside `Ok(BulkOutcome)` and are not fatal.
    async fn bulk(&self, requests: &[BulkRequest]) -> RiverResult<BulkOutcome>;
}

#[async_trait]
impl<T: SearchStore + ?Sized> SearchStore for Arc<T> {
    async fn bulk(&self, requests: &[BulkRequest]) -> RiverResult<BulkOutcome> {
        (**self).bulk(requests).await
    }
}
