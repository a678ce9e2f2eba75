//! The Event Handler (spec §4.4): adapts the replication client's callback
//! surface to typed messages on the sync channel.

use river_data::RowEvent;
use river_errors::{RiverError, RiverResult};
use river_rules::{RuleTable, SchemaProvider};
use river_util::Shutdown;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::builder::{build_ins_del, build_update};
use crate::position::ReplicationPosition;
use crate::request::BulkRequest;

/// The internal position-save marker (spec §3's `PosSaver`).
#[derive(Debug, Clone, PartialEq)]
pub struct PosSaver {
    pub position: ReplicationPosition,
    pub force: bool,
}

/// The tagged sum carried by the sync channel (spec §9's "Mixed-variant
/// channel message" design note): a batch of built requests, or a position
/// checkpoint. Deliberately an enum rather than two channels or an unsafe
/// cast, so the Sync Loop dispatches on it with an ordinary `match`.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncMessage {
    Requests(Vec<BulkRequest>),
    Pos(PosSaver),
}

/// Adapts row/rotate/DDL/XID/table-changed/GTID callbacks from the
/// replication client into [`SyncMessage`]s, serially, in arrival order
/// (spec §4.4, §5). Owns the [`RuleTable`] outright: refreshes happen on
/// this same task, interleaved with row events, so no lock is needed.
pub struct EventHandler<P: SchemaProvider> {
    rules: RuleTable,
    schema_provider: P,
    sender: mpsc::Sender<SyncMessage>,
    shutdown: Shutdown,
}

impl<P: SchemaProvider> EventHandler<P> {
    pub fn new(rules: RuleTable, schema_provider: P, sender: mpsc::Sender<SyncMessage>, shutdown: Shutdown) -> Self {
        EventHandler {
            rules,
            schema_provider,
            sender,
            shutdown,
        }
    }

    pub fn rule_table(&self) -> &RuleTable {
        &self.rules
    }

    async fn send(&self, message: SyncMessage) -> RiverResult<()> {
        if self.sender.send(message).await.is_err() {
            let err = RiverError::Transport("sync channel closed".to_string());
            self.fail(&err);
            return Err(err);
        }
        Ok(())
    }

    fn fail(&self, err: &RiverError) {
        error!(error = %err, "event handler error, tripping cancellation");
        self.shutdown.trip();
    }

    /// Row event (spec §4.4): look up the rule; drop silently if absent.
    /// Dispatch on action to the matching builder; a builder failure trips
    /// cancellation and is returned.
    pub async fn on_row(&self, event: RowEvent) -> RiverResult<()> {
        let Some(rule) = self.rules.lookup(&event.schema, &event.table) else {
            debug!(schema = %event.schema, table = %event.table, "no rule for table, dropping row event");
            return Ok(());
        };

        let built = match event.action {
            river_data::RowAction::Update => build_update(rule, &event.rows),
            action => build_ins_del(rule, action, &event.rows),
        };
        let requests = match built {
            Ok(requests) => requests,
            Err(e) => {
                self.fail(&e);
                return Err(e);
            }
        };
        if requests.is_empty() {
            return Ok(());
        }
        self.send(SyncMessage::Requests(requests)).await
    }

    /// Rotate event: force-save the new position (spec §4.4).
    pub async fn on_rotate(&self, position: ReplicationPosition) -> RiverResult<()> {
        self.send(SyncMessage::Pos(PosSaver { position, force: true })).await
    }

    /// DDL event: force-save the next position (spec §4.4).
    pub async fn on_ddl(&self, position: ReplicationPosition) -> RiverResult<()> {
        self.send(SyncMessage::Pos(PosSaver { position, force: true })).await
    }

    /// Transaction commit (XID): save the next position without forcing
    /// (spec §4.4); the Sync Loop applies the 3-second staleness check.
    pub async fn on_xid(&self, position: ReplicationPosition) -> RiverResult<()> {
        self.send(SyncMessage::Pos(PosSaver { position, force: false })).await
    }

    /// Table-changed: re-read schema metadata and rebuild the rule's
    /// column-index map (spec §4.2, §4.4). Absence of a matching rule is
    /// not an error.
    pub async fn on_table_changed(&mut self, schema: &str, table: &str) -> RiverResult<()> {
        if let Err(e) = self.rules.refresh(schema, table, &self.schema_provider).await {
            self.fail(&e);
            return Err(e);
        }
        Ok(())
    }

    /// GTID events carry no actionable state for this river; the sync loop
    /// is authoritative for position tracking (spec §4.4).
    pub fn on_gtid(&self) {}

    /// Position-synced notifications are likewise a no-op (spec §4.4).
    pub fn on_position_synced(&self) {}
}
