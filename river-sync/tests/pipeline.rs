//! Cross-crate integration test (SPEC_FULL §9.4): drives a row event
//! through the real `EventHandler` -> sync channel -> `SyncLoop` wiring,
//! the same path `river`'s binary assembles at startup, with fakes standing
//! in for the MySQL schema source and the search store.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use river_data::{ColumnDescriptor, ColumnKind, RawValue, RowAction, RowEvent, TableSchema};
use river_errors::RiverResult;
use river_rules::{RuleTable, SchemaProvider};
use river_sync::{
    BulkOutcome, BulkRequest, Counters, EventHandler, PositionStore, ReplicationPosition, SyncLoop,
    SyncLoopConfig,
};
use river_util::Shutdown;
use tokio::sync::mpsc;

struct FixedSchema(TableSchema);

#[async_trait]
impl SchemaProvider for FixedSchema {
    async fn table_schema(&self, _schema: &str, _table: &str) -> RiverResult<TableSchema> {
        Ok(self.0.clone())
    }
}

fn users_schema() -> TableSchema {
    TableSchema::new(
        vec![
            ColumnDescriptor::new("id", ColumnKind::Number),
            ColumnDescriptor::new("name", ColumnKind::String),
        ],
        vec!["id".into()],
    )
}

#[derive(Default)]
struct RecordingStore {
    batches: Mutex<Vec<Vec<BulkRequest>>>,
}

#[async_trait]
impl river_sync::SearchStore for RecordingStore {
    async fn bulk(&self, requests: &[BulkRequest]) -> RiverResult<BulkOutcome> {
        self.batches.lock().unwrap().push(requests.to_vec());
        Ok(BulkOutcome::default())
    }
}

#[derive(Default)]
struct RecordingPositionStore {
    saved: Mutex<Vec<ReplicationPosition>>,
}

#[async_trait]
impl PositionStore for RecordingPositionStore {
    async fn load(&self) -> RiverResult<Option<ReplicationPosition>> {
        Ok(self.saved.lock().unwrap().last().cloned())
    }

    async fn save(&self, position: &ReplicationPosition) -> RiverResult<()> {
        self.saved.lock().unwrap().push(position.clone());
        Ok(())
    }
}

fn write_rule_file(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("rules.toml");
    std::fs::write(
        &path,
        r#"
[[rule]]
schema = "app"
table = "users"
index = "users_idx"
type = "_doc"
"#,
    )
    .unwrap();
    path
}

#[tokio::test(start_paused = true)]
async fn row_event_flows_from_handler_through_sync_loop_to_the_store() {
    let tmp = std::env::temp_dir().join("river-sync-pipeline-test");
    std::fs::create_dir_all(&tmp).unwrap();
    let rule_path = write_rule_file(&tmp);

    let provider = FixedSchema(users_schema());
    let rules = RuleTable::load(&rule_path, &provider).await.unwrap();
    assert_eq!(rules.len(), 1);

    let (tx, rx) = mpsc::channel(16);
    let shutdown = Shutdown::new();
    let handler = EventHandler::new(rules, provider, tx, shutdown.clone());

    let store = Arc::new(RecordingStore::default());
    let positions = Arc::new(RecordingPositionStore::default());
    let counters = Arc::new(Counters::new());
    let config = SyncLoopConfig {
        bulk_size: 128,
        flush_interval: Duration::from_millis(50),
    };
    let sync_loop = SyncLoop::new(
        rx,
        Arc::clone(&store),
        Arc::clone(&positions),
        shutdown.clone(),
        Arc::clone(&counters),
        config,
    );
    let sync_handle = tokio::spawn(sync_loop.run());

    let event = RowEvent::new(
        "app",
        "users",
        RowAction::Insert,
        vec![vec![RawValue::Int(1), RawValue::Text("alice".into())]],
    );
    handler.on_row(event).await.unwrap();
    handler
        .on_xid(ReplicationPosition::new("bin.1", 100))
        .await
        .unwrap();

    // The XID isn't force-saved and the staleness window hasn't elapsed,
    // so the ticker is what eventually flushes the pending request.
    tokio::time::sleep(Duration::from_millis(120)).await;

    let batches = store.batches.lock().unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 1);
    assert_eq!(batches[0][0].id, "1");
    assert_eq!(counters.insert_num(), 1);
    assert!(positions.saved.lock().unwrap().is_empty());

    shutdown.trip();
    sync_handle.await.unwrap().unwrap();

    std::fs::remove_dir_all(&tmp).ok();
}

#[tokio::test(start_paused = true)]
async fn ddl_event_forces_a_position_save_even_with_no_pending_rows() {
    let tmp = std::env::temp_dir().join("river-sync-pipeline-ddl-test");
    std::fs::create_dir_all(&tmp).unwrap();
    let rule_path = write_rule_file(&tmp);

    let provider = FixedSchema(users_schema());
    let rules = RuleTable::load(&rule_path, &provider).await.unwrap();

    let (tx, rx) = mpsc::channel(16);
    let shutdown = Shutdown::new();
    let handler = EventHandler::new(rules, provider, tx, shutdown.clone());

    let store = Arc::new(RecordingStore::default());
    let positions = Arc::new(RecordingPositionStore::default());
    let counters = Arc::new(Counters::new());
    let config = SyncLoopConfig {
        bulk_size: 128,
        flush_interval: Duration::from_secs(3600),
    };
    let sync_loop = SyncLoop::new(
        rx,
        Arc::clone(&store),
        Arc::clone(&positions),
        shutdown.clone(),
        Arc::clone(&counters),
        config,
    );
    let sync_handle = tokio::spawn(sync_loop.run());

    handler
        .on_ddl(ReplicationPosition::new("bin.2", 4))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(positions.saved.lock().unwrap().len(), 1);
    assert!(store.batches.lock().unwrap().is_empty());

    shutdown.trip();
    sync_handle.await.unwrap().unwrap();

    std::fs::remove_dir_all(&tmp).ok();
}
