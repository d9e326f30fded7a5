use crate::error::{DriftError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Directory used for disk-tier blobs when nothing else is configured, and
/// the fallback when the configured directory cannot be created.
pub const DEFAULT_DISK_PATH: &str = "temp_files";
pub const DEFAULT_MEMORY_BUDGET_BYTES: u64 = 16 * 1024 * 1024 * 1024;
pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub disk_path: PathBuf,
    pub memory_budget_bytes: u64,
    pub ttl: Duration,
    pub sweep_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            disk_path: PathBuf::from(DEFAULT_DISK_PATH),
            memory_budget_bytes: DEFAULT_MEMORY_BUDGET_BYTES,
            ttl: DEFAULT_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl StoreConfig {
    pub fn new(disk_path: impl Into<PathBuf>) -> Self {
        Self {
            disk_path: disk_path.into(),
            ..Self::default()
        }
    }

    pub fn with_memory_budget(mut self, bytes: u64) -> Self {
        self.memory_budget_bytes = bytes;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.ttl.is_zero() {
            return Err(DriftError::Config("ttl must be greater than zero".to_string()));
        }
        if self.sweep_interval.is_zero() {
            return Err(DriftError::Config(
                "sweep interval must be greater than zero".to_string(),
            ));
        }
        if self.disk_path.as_os_str().is_empty() {
            return Err(DriftError::Config("disk path cannot be empty".to_string()));
        }
        Ok(())
    }

    pub(crate) fn ttl_chrono(&self) -> Result<chrono::Duration> {
        chrono::Duration::from_std(self.ttl)
            .map_err(|e| DriftError::Config(format!("ttl out of range: {}", e)))
    }
}
