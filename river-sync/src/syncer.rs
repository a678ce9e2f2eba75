//! The Sync Loop (spec §4.5): the single long-lived consumer that drains
//! the sync channel, batches requests, submits them to the search store,
//! and checkpoints the replication position.

use std::sync::Arc;
use std::time::Duration;

use river_errors::RiverResult;
use river_util::{retry::with_backoff, Shutdown};
use tokio::sync::mpsc;
use tokio::time::{interval, Instant};
use tracing::{error, info};

use crate::counters::Counters;
use crate::handler::{PosSaver, SyncMessage};
use crate::position::{PositionStore, ReplicationPosition};
use crate::request::BulkRequest;
use crate::search_store::SearchStore;

/// Default batch size and flush cadence (spec §4.5).
pub const DEFAULT_BULK_SIZE: usize = 128;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(200);

/// How long a non-forced position is allowed to sit un-persisted (spec
/// §4.5, §5).
const STALENESS_THRESHOLD: Duration = Duration::from_secs(3);

/// Tunables for one Sync Loop run.
#[derive(Debug, Clone, Copy)]
pub struct SyncLoopConfig {
    pub bulk_size: usize,
    pub flush_interval: Duration,
}

impl Default for SyncLoopConfig {
    fn default() -> Self {
        SyncLoopConfig {
            bulk_size: DEFAULT_BULK_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
        }
    }
}

/// The single consumer of the sync channel (spec §4.5, §5). Owns the
/// pending-batch buffer and the last-saved-position clock; nothing about
/// it is shared with the replication consumer task except the channel, the
/// [`Shutdown`] signal, and [`Counters`].
pub struct SyncLoop<S: SearchStore, P: PositionStore> {
    receiver: mpsc::Receiver<SyncMessage>,
    search_store: S,
    position_store: P,
    shutdown: Shutdown,
    counters: Arc<Counters>,
    config: SyncLoopConfig,
}

impl<S: SearchStore, P: PositionStore> SyncLoop<S, P> {
    pub fn new(
        receiver: mpsc::Receiver<SyncMessage>,
        search_store: S,
        position_store: P,
        shutdown: Shutdown,
        counters: Arc<Counters>,
        config: SyncLoopConfig,
    ) -> Self {
        SyncLoop {
            receiver,
            search_store,
            position_store,
            shutdown,
            counters,
            config,
        }
    }

    /// Run until cancelled. Returns `Ok(())` on a clean shutdown (the
    /// signal tripped or the channel closed) and `Err` if a flush or
    /// position save failed fatally (cancellation has already been
    /// tripped by the time this returns).
    pub async fn run(mut self) -> RiverResult<()> {
        let mut pending: Vec<BulkRequest> = Vec::new();
        let mut pos: Option<ReplicationPosition> = None;
        let mut last_saved = Instant::now();
        let mut ticker = interval(self.config.flush_interval);
        ticker.tick().await; // first tick fires immediately; discard it

        loop {
            let mut flush = false;
            let mut save_pos = false;

            tokio::select! {
                biased;

                _ = self.shutdown.tripped() => {
                    return Ok(());
                }

                message = self.receiver.recv() => {
                    let Some(message) = message else {
                        return Ok(());
                    };
                    match message {
                        SyncMessage::Requests(requests) => {
                            pending.extend(requests);
                            flush = pending.len() >= self.config.bulk_size;
                        }
                        SyncMessage::Pos(saver) => {
                            let stale = last_saved.elapsed() > STALENESS_THRESHOLD;
                            if saver.force || stale {
                                flush = true;
                                save_pos = true;
                                pos = Some(saver.position);
                                last_saved = Instant::now();
                            }
                        }
                    }
                }

                _ = ticker.tick() => {
                    flush = true;
                }
            }

            if flush && !pending.is_empty() {
                if let Err(e) = self.flush(&pending, pos.as_ref()).await {
                    error!(error = %e, position = ?pos, "flush failed, tripping cancellation");
                    self.shutdown.trip();
                    return Err(e);
                }
                pending.clear();
            }

            if save_pos {
                if let Some(position) = &pos {
                    if let Err(e) = self.position_store.save(position).await {
                        error!(error = %e, position = ?pos, "position save failed, tripping cancellation");
                        self.shutdown.trip();
                        return Err(e);
                    }
                }
            }
        }
    }

    async fn flush(&self, pending: &[BulkRequest], pos: Option<&ReplicationPosition>) -> RiverResult<()> {
        let outcome = with_backoff("bulk flush", || self.search_store.bulk(pending)).await?;
        for item in outcome.items.iter().filter(|item| item.is_error()) {
            error!(
                action = %item.action,
                index = %item.index,
                doc_type = %item.doc_type,
                id = %item.id,
                status = item.status,
                error = %item.error,
                "bulk item rejected"
            );
        }
        for request in pending {
            self.counters.record(request.action);
        }
        info!(count = pending.len(), position = ?pos, "flushed batch");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::search_store::BulkOutcome;

    #[derive(Default)]
    struct RecordingStore {
        batches: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl SearchStore for RecordingStore {
        async fn bulk(&self, requests: &[BulkRequest]) -> RiverResult<BulkOutcome> {
            self.batches.lock().unwrap().push(requests.len());
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

    fn delete_request(id: &str) -> BulkRequest {
        BulkRequest::delete("idx", "t", id, None)
    }

    // Scenario 8: a batch at bulk_size flushes without waiting for the
    // ticker, and a forced position-save after the flush persists exactly
    // once.
    #[tokio::test(start_paused = true)]
    async fn bulk_size_triggers_an_immediate_flush() {
        let (tx, rx) = mpsc::channel(256);
        let store = Arc::new(RecordingStore::default());
        let positions = Arc::new(RecordingPositionStore::default());
        let shutdown = Shutdown::new();
        let counters = Arc::new(Counters::new());
        let config = SyncLoopConfig {
            bulk_size: 4,
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
        let handle = tokio::spawn(sync_loop.run());

        let batch: Vec<BulkRequest> = (0..4).map(|i| delete_request(&i.to_string())).collect();
        tx.send(SyncMessage::Requests(batch)).await.unwrap();
        tx.send(SyncMessage::Pos(PosSaver {
            position: ReplicationPosition::new("bin.1", 10),
            force: true,
        }))
        .await
        .unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(*store.batches.lock().unwrap(), vec![4]);
        assert_eq!(positions.saved.lock().unwrap().len(), 1);

        shutdown.trip();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn non_forced_pos_saver_within_staleness_window_is_ignored() {
        let (tx, rx) = mpsc::channel(256);
        let store = Arc::new(RecordingStore::default());
        let positions = Arc::new(RecordingPositionStore::default());
        let shutdown = Shutdown::new();
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
        let handle = tokio::spawn(sync_loop.run());

        tx.send(SyncMessage::Pos(PosSaver {
            position: ReplicationPosition::new("bin.1", 1),
            force: false,
        }))
        .await
        .unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(positions.saved.lock().unwrap().is_empty());

        shutdown.trip();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_flushes_a_non_empty_pending_batch() {
        let (tx, rx) = mpsc::channel(256);
        let store = Arc::new(RecordingStore::default());
        let positions = Arc::new(RecordingPositionStore::default());
        let shutdown = Shutdown::new();
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
        let handle = tokio::spawn(sync_loop.run());

        tx.send(SyncMessage::Requests(vec![delete_request("1")]))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(*store.batches.lock().unwrap(), vec![1]);
        assert_eq!(counters.delete_num(), 1);

        shutdown.trip();
        handle.await.unwrap().unwrap();
    }
}
