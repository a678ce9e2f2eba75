//! Adapts `river_sync::EventHandler`'s callback surface onto
//! `river_mysql::RiverEventSink`, the shape the replication client drives.
//! The two are independently shaped (the handler deals in
//! `river_sync::ReplicationPosition`; the client in its own
//! `BinlogPosition`), so this is a thin translation layer, not logic.

use async_trait::async_trait;
use river_data::RowEvent;
use river_errors::RiverResult;
use river_mysql::{BinlogPosition, RiverEventSink};
use river_rules::SchemaProvider;
use river_sync::EventHandler;

pub struct EventSinkAdapter<P: SchemaProvider> {
    handler: EventHandler<P>,
}

impl<P: SchemaProvider> EventSinkAdapter<P> {
    pub fn new(handler: EventHandler<P>) -> Self {
        EventSinkAdapter { handler }
    }
}

#[async_trait]
impl<P: SchemaProvider + Send + Sync> RiverEventSink for EventSinkAdapter<P> {
    async fn on_row(&mut self, event: RowEvent) -> RiverResult<()> {
        self.handler.on_row(event).await
    }

    async fn on_rotate(&mut self, position: BinlogPosition) -> RiverResult<()> {
        self.handler.on_rotate(position.into()).await
    }

    async fn on_ddl(&mut self, _schema: &str, position: BinlogPosition) -> RiverResult<()> {
        self.handler.on_ddl(position.into()).await
    }

    async fn on_xid(&mut self, position: BinlogPosition) -> RiverResult<()> {
        self.handler.on_xid(position.into()).await
    }

    async fn on_gtid(&mut self, _gno: u64) -> RiverResult<()> {
        self.handler.on_gtid();
        Ok(())
    }

    async fn on_table_changed(&mut self, schema: &str, table: &str) -> RiverResult<()> {
        self.handler.on_table_changed(schema, table).await
    }

    async fn on_position_synced(&mut self, _position: BinlogPosition) -> RiverResult<()> {
        self.handler.on_position_synced();
        Ok(())
    }
}
