use driftbox_core::{
    DEFAULT_DISK_PATH, DEFAULT_MEMORY_BUDGET_BYTES, DEFAULT_SWEEP_INTERVAL, DEFAULT_TTL,
    DriftError, Result, StoreConfig,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub disk_path: PathBuf,
    pub memory_budget_bytes: u64,
    pub ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            disk_path: PathBuf::from(DEFAULT_DISK_PATH),
            memory_budget_bytes: DEFAULT_MEMORY_BUDGET_BYTES,
            ttl_secs: DEFAULT_TTL.as_secs(),
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL.as_secs(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            max_upload_bytes: default_max_upload_bytes(),
            storage: StorageConfig::default(),
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_upload_bytes() -> usize {
    500 * 1024 * 1024
}

impl Config {
    /// Load from an optional config file, overridden by `DRIFTBOX__*`
    /// environment variables (e.g. `DRIFTBOX__STORAGE__DISK_PATH`).
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name(path).required(false))
            .add_source(
                ::config::Environment::with_prefix("DRIFTBOX")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| DriftError::Config(e.to_string()))?;

        let config: Config = settings
            .try_deserialize()
            .map_err(|e| DriftError::Config(e.to_string()))?;

        config.store_config()?;
        Ok(config)
    }

    pub fn store_config(&self) -> Result<StoreConfig> {
        let store = StoreConfig::new(self.storage.disk_path.clone())
            .with_memory_budget(self.storage.memory_budget_bytes)
            .with_ttl(Duration::from_secs(self.storage.ttl_secs))
            .with_sweep_interval(Duration::from_secs(self.storage.sweep_interval_secs));
        store.validate()?;
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");
        let config = Config::from_file(path.to_str().unwrap()).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.max_upload_bytes, 500 * 1024 * 1024);
        assert_eq!(config.storage.ttl_secs, 600);
        assert_eq!(config.storage.sweep_interval_secs, 60);
    }

    #[test]
    fn test_yaml_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("driftbox.yaml");
        std::fs::write(
            &path,
            "bind_addr: \"127.0.0.1:9000\"\nstorage:\n  disk_path: /dev/shm/driftbox\n  memory_budget_bytes: 1048576\n  ttl_secs: 30\n",
        )
        .unwrap();

        let config = Config::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.storage.disk_path, PathBuf::from("/dev/shm/driftbox"));
        assert_eq!(config.storage.memory_budget_bytes, 1_048_576);
        assert_eq!(config.storage.sweep_interval_secs, 60);

        let store = config.store_config().unwrap();
        assert_eq!(store.ttl, Duration::from_secs(30));
    }

    #[test]
    fn test_zero_ttl_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "storage:\n  ttl_secs: 0\n").unwrap();

        let err = Config::from_file(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, DriftError::Config(_)));
    }
}
