//! The streaming transformation and batching pipeline: the Request
//! Builder, Event Handler, and Sync Loop (spec §1's "hard engineering"
//! core).

pub mod builder;
pub mod counters;
pub mod handler;
pub mod position;
pub mod request;
pub mod search_store;
pub mod syncer;

pub use builder::{build_ins_del, build_update, doc_id, parent_id, project_row};
pub use counters::Counters;
pub use handler::{EventHandler, PosSaver, SyncMessage};
pub use position::{PositionStore, ReplicationPosition};
pub use request::BulkRequest;
pub use search_store::{BulkItemResult, BulkOutcome, SearchStore};
pub use syncer::{SyncLoop, SyncLoopConfig, DEFAULT_BULK_SIZE, DEFAULT_FLUSH_INTERVAL};
