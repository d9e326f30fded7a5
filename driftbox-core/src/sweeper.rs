use crate::storage::BlobStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Periodically evicts expired blobs, independent of any caller.
pub struct Sweeper {
    store: Arc<BlobStore>,
    interval: Duration,
}

/// Running sweeper task. Dropping the handle leaves the task running; call
/// `shutdown` to stop it.
pub struct SweeperHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Sweeper {
    pub fn new(store: Arc<BlobStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    pub fn spawn(self) -> SweeperHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut timer = tokio::time::interval(self.interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; nothing can have expired yet.
            timer.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = timer.tick() => {
                        let report = self.store.sweep_expired().await;
                        if report.evicted > 0 {
                            tracing::info!(
                                "Sweep evicted {} blobs, released {} bytes of memory, {} unlink failures",
                                report.evicted,
                                report.memory_bytes_released,
                                report.unlink_failures
                            );
                        }
                    }
                }
            }

            tracing::debug!("Sweeper stopped");
        });

        SweeperHandle { cancel, task }
    }
}

impl SweeperHandle {
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the task and wait for the current tick, if any, to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(error) = self.task.await {
            tracing::warn!("Sweeper task ended abnormally: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::StoreConfig;
    use bytes::Bytes;

    async fn wait_until_empty(store: &BlobStore) -> bool {
        for _ in 0..200 {
            if store.stats().await.records == 0 {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_sweeper_evicts_without_reads() {
        let temp_dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::default());
        let config = StoreConfig::new(temp_dir.path())
            .with_memory_budget(8)
            .with_ttl(Duration::from_secs(60));
        let store = Arc::new(BlobStore::with_clock(&config, clock.clone()).unwrap());

        store.put(Bytes::from_static(b"tiny"), "mem", "").await.unwrap();
        store.put(Bytes::from_static(b"larger than budget"), "disk", "").await.unwrap();

        let handle = Sweeper::new(Arc::clone(&store), Duration::from_millis(10)).spawn();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.stats().await.records, 2);

        clock.advance(chrono::Duration::seconds(60));
        assert!(wait_until_empty(&store).await);

        let stats = store.stats().await;
        assert_eq!(stats.memory_used_bytes, 0);
        assert!(store.disk_path().read_dir().unwrap().next().is_none());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_task() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = Arc::new(BlobStore::open(&StoreConfig::new(temp_dir.path())).unwrap());

        let handle = Sweeper::new(store, Duration::from_secs(3600)).spawn();
        let token = handle.cancellation_token();
        assert!(!handle.is_finished());

        handle.shutdown().await;
        assert!(token.is_cancelled());
    }
}
