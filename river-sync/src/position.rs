//! The replication position and its durable store (spec §3's
//! `ReplicationPosition`, §6's "Position store" external interface).

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use river_errors::RiverResult;
use serde::{Deserialize, Serialize};

/// A point in the replication stream: a binlog file name and byte offset
/// within it, totally ordered lexicographically by `log_name` then
/// `offset` (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationPosition {
    pub log_name: String,
    pub offset: u32,
}

impl ReplicationPosition {
    pub fn new(log_name: impl Into<String>, offset: u32) -> Self {
        ReplicationPosition {
            log_name: log_name.into(),
            offset,
        }
    }
}

impl PartialOrd for ReplicationPosition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ReplicationPosition {
    fn cmp(&self, other: &Self) -> Ordering {
        self.log_name
            .cmp(&other.log_name)
            .then(self.offset.cmp(&other.offset))
    }
}

/// Durable storage for the last-synced [`ReplicationPosition`] (spec §6).
/// The Sync Loop calls `save` only after the preceding bulk flush has
/// already succeeded, so a persisted position never leads un-committed
/// document operations.
#[async_trait]
pub trait PositionStore: Send + Sync {
    /// `None` signals a fresh start (no prior position on disk).
    async fn load(&self) -> RiverResult<Option<ReplicationPosition>>;
    async fn save(&self, position: &ReplicationPosition) -> RiverResult<()>;
}

#[async_trait]
impl<T: PositionStore + ?Sized> PositionStore for Arc<T> {
    async fn load(&self) -> RiverResult<Option<ReplicationPosition>> {
        (**self).load().await
    }

    async fn save(&self, position: &ReplicationPosition) -> RiverResult<()> {
        (**self).save(position).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_lexicographic_by_log_then_offset() {
        let a = ReplicationPosition::new("bin.000001", 100);
        let b = ReplicationPosition::new("bin.000001", 200);
        let c = ReplicationPosition::new("bin.000002", 0);
        assert!(a < b);
        assert!(b < c);
    }
}
