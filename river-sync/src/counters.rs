//! River-scoped counters (spec §6's "Counters exposed", §9's "Global
//! counters" design note): atomics owned by one river instance, not process
//! globals, so tests can assert on a fresh instance without cross-test
//! interference.

use std::sync::atomic::{AtomicU64, Ordering};

use river_rules::BulkAction;

/// `InsertNum` / `UpdateNum` / `DeleteNum` from spec §6, mirrored to the
/// `metrics` crate's `counter!` macro on every increment (SPEC_FULL §9.5).
#[derive(Debug, Default)]
pub struct Counters {
    insert: AtomicU64,
    update: AtomicU64,
    delete: AtomicU64,
}

impl Counters {
    pub fn new() -> Self {
        Counters::default()
    }

    /// Attribute one built request to the counter matching its final
    /// action, after every upgrade/downgrade in the Request Builder has
    /// already been applied.
    pub fn record(&self, action: BulkAction) {
        match action {
            BulkAction::Index => {
                self.insert.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("river_insert_total").increment(1);
            }
            BulkAction::Update => {
                self.update.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("river_update_total").increment(1);
            }
            BulkAction::Delete => {
                self.delete.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("river_delete_total").increment(1);
            }
        }
    }

    pub fn insert_num(&self) -> u64 {
        self.insert.load(Ordering::Relaxed)
    }

    pub fn update_num(&self) -> u64 {
        self.update.load(Ordering::Relaxed)
    }

    pub fn delete_num(&self) -> u64 {
        self.delete.load(Ordering::Relaxed)
    }
}
