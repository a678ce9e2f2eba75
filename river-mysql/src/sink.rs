//! The callback surface a [`crate::client::BinlogClient`] drives on every
//! decoded event (spec §4.4/§6, concretized by SPEC_FULL §4.7). `river-
//! sync::EventHandler` is the production implementation; tests use a
//! recording stand-in.

use async_trait::async_trait;
use river_data::RowEvent;
use river_errors::RiverResult;

use crate::position::BinlogPosition;

/// The event-handler callback surface the replication client drives,
/// serially, in binlog arrival order.
#[async_trait]
pub trait RiverEventSink: Send {
    async fn on_row(&mut self, event: RowEvent) -> RiverResult<()>;
    async fn on_rotate(&mut self, position: BinlogPosition) -> RiverResult<()>;
    async fn on_ddl(&mut self, schema: &str, position: BinlogPosition) -> RiverResult<()>;
    async fn on_xid(&mut self, position: BinlogPosition) -> RiverResult<()>;
    async fn on_gtid(&mut self, gno: u64) -> RiverResult<()>;
    async fn on_table_changed(&mut self, schema: &str, table: &str) -> RiverResult<()>;
    async fn on_position_synced(&mut self, position: BinlogPosition) -> RiverResult<()>;
}
