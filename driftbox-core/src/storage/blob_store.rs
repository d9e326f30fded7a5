use super::disk_store::DiskStore;
use super::placement::choose_placement;
use super::record::{BlobLocation, BlobRecord, Tier};
use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::error::{DriftError, Result};
use crate::id::generate_id;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Metadata table, content table and memory counter. Always mutated together
/// under one lock.
#[derive(Debug, Default)]
struct StoreState {
    records: HashMap<String, BlobRecord>,
    contents: HashMap<String, Bytes>,
    memory_used: u64,
}

impl StoreState {
    fn insert_memory(&mut self, record: BlobRecord, key: String, content: Bytes) {
        self.memory_used += record.size_bytes;
        self.contents.insert(key, content);
        self.records.insert(record.id.clone(), record);
    }

    /// The one deletion routine. Releases memory-tier content and returns the
    /// record so the caller can unlink a disk-tier file outside the lock.
    fn remove(&mut self, id: &str) -> Option<BlobRecord> {
        let record = self.records.remove(id)?;
        if let BlobLocation::Memory { key } = &record.location {
            if self.contents.remove(key).is_some() {
                debug_assert!(self.memory_used >= record.size_bytes);
                self.memory_used = self.memory_used.saturating_sub(record.size_bytes);
            }
        }
        Some(record)
    }

    fn expired_ids(&self, now: DateTime<Utc>) -> Vec<String> {
        self.records
            .values()
            .filter(|record| record.is_expired_at(now))
            .map(|record| record.id.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub records: usize,
    pub memory_records: usize,
    pub disk_records: usize,
    pub memory_used_bytes: u64,
    pub memory_budget_bytes: u64,
}

/// Outcome of one reclamation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub evicted: usize,
    pub memory_bytes_released: u64,
    pub disk_files_removed: usize,
    pub unlink_failures: usize,
}

/// Tiered, expiring blob store.
///
/// Blobs are admitted to memory while they fit in the memory budget and to
/// disk otherwise. Every blob expires `ttl` after it was stored, whether or
/// not it was read. Expired blobs disappear on the next lookup or sweep,
/// whichever comes first.
pub struct BlobStore {
    state: Arc<Mutex<StoreState>>,
    disk: DiskStore,
    clock: Arc<dyn Clock>,
    memory_budget: u64,
    ttl: chrono::Duration,
}

impl BlobStore {
    pub fn open(config: &StoreConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &StoreConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let ttl = config.ttl_chrono()?;
        let disk = DiskStore::open(&config.disk_path)?;

        tracing::info!(
            "Blob store ready: memory budget {} bytes, disk path {:?}, ttl {}s",
            config.memory_budget_bytes,
            disk.base_path(),
            ttl.num_seconds()
        );

        Ok(Self {
            state: Arc::new(Mutex::new(StoreState::default())),
            disk,
            clock,
            memory_budget: config.memory_budget_bytes,
            ttl,
        })
    }

    pub fn memory_budget(&self) -> u64 {
        self.memory_budget
    }

    pub fn ttl(&self) -> chrono::Duration {
        self.ttl
    }

    pub fn disk_path(&self) -> &Path {
        self.disk.base_path()
    }

    /// Store `content` and return its record.
    ///
    /// Memory-tier admission happens entirely under the store lock. Disk-tier
    /// content is written and synced before the record is inserted, so a
    /// failed write leaves nothing behind. The disk write runs in its own task
    /// and finishes even if the caller stops waiting.
    pub async fn put(
        &self,
        content: Bytes,
        display_name: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Result<BlobRecord> {
        let id = generate_id()?;
        let display_name = display_name.into();
        let content_type = content_type.into();
        let size_bytes = content.len() as u64;
        let created_at = self.clock.now();
        let expires_at = created_at + self.ttl;

        {
            let mut state = self.state.lock().await;
            if state.records.contains_key(&id) {
                return Err(DriftError::Internal(format!(
                    "generated identifier {} is already live",
                    id
                )));
            }

            if choose_placement(size_bytes, state.memory_used, self.memory_budget) == Tier::Memory
            {
                let record = BlobRecord {
                    id: id.clone(),
                    display_name,
                    size_bytes,
                    created_at,
                    expires_at,
                    location: BlobLocation::Memory { key: id.clone() },
                    content_type,
                };
                state.insert_memory(record.clone(), id, content);

                tracing::debug!(
                    "Stored blob {} ({}, {} bytes) in memory. Memory usage: {} / {} bytes",
                    record.id,
                    record.display_name,
                    size_bytes,
                    state.memory_used,
                    self.memory_budget
                );
                return Ok(record);
            }
        }

        let state = Arc::clone(&self.state);
        let disk = self.disk.clone();
        let task = tokio::spawn(async move {
            let path = disk.write(&id, &content).await?;
            let record = BlobRecord {
                id: id.clone(),
                display_name,
                size_bytes,
                created_at,
                expires_at,
                location: BlobLocation::Disk { path },
                content_type,
            };
            state.lock().await.records.insert(id, record.clone());
            Ok::<_, DriftError>(record)
        });

        let record = task
            .await
            .map_err(|e| DriftError::Internal(format!("disk write task failed: {}", e)))??;

        tracing::debug!(
            "Stored blob {} ({}, {} bytes) on disk. Memory budget exhausted",
            record.id,
            record.display_name,
            size_bytes
        );
        Ok(record)
    }

    /// Fetch a live blob.
    ///
    /// Unknown and expired ids both fail with `NotFound`. An expired record is
    /// evicted in the same critical section that noticed it.
    pub async fn get(&self, id: &str) -> Result<(BlobRecord, Bytes)> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;

        let record = match state.records.get(id) {
            Some(record) => record.clone(),
            None => return Err(DriftError::NotFound(id.to_string())),
        };

        if record.is_expired_at(now) {
            let evicted = state.remove(id);
            drop(state);
            if let Some(evicted) = evicted {
                tracing::debug!("Evicted expired blob {} on read", id);
                self.release(&evicted).await;
            }
            return Err(DriftError::NotFound(id.to_string()));
        }

        let path = match &record.location {
            BlobLocation::Memory { key } => {
                let content = state.contents.get(key).cloned().ok_or_else(|| {
                    DriftError::Internal(format!("memory content missing for blob {}", id))
                })?;
                drop(state);
                return Ok((record, content));
            }
            BlobLocation::Disk { path } => path.clone(),
        };
        drop(state);

        match self.disk.read(&path).await {
            Ok(content) => Ok((record, content)),
            Err(error) => {
                // A concurrent delete or sweep may have unlinked the file after
                // the lookup above.
                if self.state.lock().await.records.contains_key(id) {
                    tracing::error!("Disk content unreadable for live blob {}: {}", id, error);
                    Err(error)
                } else {
                    Err(DriftError::NotFound(id.to_string()))
                }
            }
        }
    }

    /// Remove a blob. Unknown and already-removed ids are a no-op.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let (removed, memory_used) = {
            let mut state = self.state.lock().await;
            let removed = state.remove(id);
            (removed, state.memory_used)
        };

        if let Some(record) = removed {
            self.release(&record).await;
            tracing::debug!(
                "Deleted blob {} ({}). Memory usage: {} bytes",
                record.id,
                record.display_name,
                memory_used
            );
        }
        Ok(())
    }

    /// Evict every record whose expiry has passed.
    pub async fn sweep_expired(&self) -> SweepReport {
        let now = self.clock.now();
        let evicted: Vec<BlobRecord> = {
            let mut state = self.state.lock().await;
            let expired = state.expired_ids(now);
            expired.iter().filter_map(|id| state.remove(id)).collect()
        };

        let mut report = SweepReport::default();
        for record in &evicted {
            tracing::info!(
                "Cleaning up expired blob: {} ({})",
                record.id,
                record.display_name
            );
            report.evicted += 1;
            match record.tier() {
                Tier::Memory => report.memory_bytes_released += record.size_bytes,
                Tier::Disk => {
                    if self.release(record).await {
                        report.disk_files_removed += 1;
                    } else {
                        report.unlink_failures += 1;
                    }
                }
            }
        }

        report
    }

    /// Remove `.blob` files that no live record points at. Metadata does not
    /// survive a restart, so anything found at startup is unreachable.
    pub async fn purge_orphaned_files(&self) -> Result<usize> {
        let files = self.disk.list_blob_files().await?;
        let live: Vec<_> = {
            let state = self.state.lock().await;
            state
                .records
                .values()
                .filter_map(|record| match &record.location {
                    BlobLocation::Disk { path } => Some(path.clone()),
                    BlobLocation::Memory { .. } => None,
                })
                .collect()
        };

        let mut purged = 0;
        for file in files.into_iter().filter(|file| !live.contains(file)) {
            match self.disk.remove(&file).await {
                Ok(()) => purged += 1,
                Err(error) => {
                    tracing::warn!("Failed to purge orphaned file {:?}: {}", file, error)
                }
            }
        }

        if purged > 0 {
            tracing::info!("Purged {} orphaned blob files from {:?}", purged, self.disk_path());
        }
        Ok(purged)
    }

    pub async fn stats(&self) -> StoreStats {
        let state = self.state.lock().await;
        let memory_records = state
            .records
            .values()
            .filter(|record| record.tier() == Tier::Memory)
            .count();

        StoreStats {
            records: state.records.len(),
            memory_records,
            disk_records: state.records.len() - memory_records,
            memory_used_bytes: state.memory_used,
            memory_budget_bytes: self.memory_budget,
        }
    }

    /// Copy of every record in the metadata table, expired ones included.
    pub async fn snapshot(&self) -> Vec<BlobRecord> {
        self.state.lock().await.records.values().cloned().collect()
    }

    /// Release disk-tier resources for a record already removed from the
    /// table. Failures are logged, never returned.
    async fn release(&self, record: &BlobRecord) -> bool {
        let BlobLocation::Disk { path } = &record.location else {
            return true;
        };

        match self.disk.remove(path).await {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!("Error deleting file {:?} from disk: {}", path, error);
                false
            }
        }
    }
}
