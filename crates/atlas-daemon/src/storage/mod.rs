mod atlas;
mod config;
mod metrics;
mod submissions;

pub use atlas::AtlasUpdate;
pub use config::*;
pub use metrics::*;
pub use submissions::InsertOutcome;

use atlas_types::{AtlasError, AtlasResult};
use sled::transaction::TransactionError;
use sled::{Db, Tree};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

const CURRENT_SCHEMA_VERSION: u32 = 1;
const SCHEMA_KEY: &[u8] = b"__schema_version__";

pub const TREE_SUBMISSIONS: &str = "submissions";
pub const TREE_SUBMISSION_NULLIFIERS: &str = "submission_nullifiers";
pub const TREE_SUBMISSION_IDEMPOTENCY: &str = "submission_idempotency";
pub const TREE_ROOT_HISTORY: &str = "atlas_root_history";
pub const TREE_VERSIONS: &str = "atlas_versions";
pub const TREE_JURISDICTIONS: &str = "atlas_jurisdictions";
pub const TREE_LEAVES: &str = "atlas_leaves";

/// sled-backed persistence for the atlas and the submission registry.
///
/// Unique constraints (one submission per nullifier, one per idempotency key)
/// live in index trees that are only written inside multi-tree transactions.
pub struct AtlasStorage {
    db: Db,
    schema: Tree,
    submissions: Tree,
    submission_nullifiers: Tree,
    submission_idempotency: Tree,
    root_history: Tree,
    versions: Tree,
    jurisdictions: Tree,
    leaves: Tree,
    storage_config: StorageConfig,
    metrics: Arc<StorageMetrics>,
    opened_at: Instant,
}

impl AtlasStorage {
    pub fn open(config: StorageConfig) -> AtlasResult<Self> {
        let path = &config.path;
        info!("Opening storage at {:?}", path);

        let sled_config = sled::Config::new()
            .path(path)
            .cache_capacity(config.cache_capacity_bytes)
            .flush_every_ms(config.flush_every_ms)
            .mode(sled::Mode::HighThroughput);

        let db = sled_config
            .open()
            .map_err(|e| AtlasError::Storage(format!("Failed to open database: {}", e)))?;

        let storage = Self::create_from_db(db, config)?;
        storage.ensure_schema()?;

        info!("Storage opened (schema version {})", CURRENT_SCHEMA_VERSION);
        Ok(storage)
    }

    pub fn in_memory() -> AtlasResult<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| AtlasError::Storage(format!("Failed to open temp database: {}", e)))?;

        let config = StorageConfig {
            path: std::path::PathBuf::new(),
            sync_submissions: false,
            ..Default::default()
        };

        let storage = Self::create_from_db(db, config)?;
        storage.ensure_schema()?;
        Ok(storage)
    }

    fn create_from_db(db: Db, config: StorageConfig) -> AtlasResult<Self> {
        Ok(Self {
            schema: Self::open_tree(&db, "schema")?,
            submissions: Self::open_tree(&db, TREE_SUBMISSIONS)?,
            submission_nullifiers: Self::open_tree(&db, TREE_SUBMISSION_NULLIFIERS)?,
            submission_idempotency: Self::open_tree(&db, TREE_SUBMISSION_IDEMPOTENCY)?,
            root_history: Self::open_tree(&db, TREE_ROOT_HISTORY)?,
            versions: Self::open_tree(&db, TREE_VERSIONS)?,
            jurisdictions: Self::open_tree(&db, TREE_JURISDICTIONS)?,
            leaves: Self::open_tree(&db, TREE_LEAVES)?,
            db,
            storage_config: config,
            metrics: Arc::new(StorageMetrics::new()),
            opened_at: Instant::now(),
        })
    }

    fn open_tree(db: &Db, name: &str) -> AtlasResult<Tree> {
        db.open_tree(name)
            .map_err(|e| AtlasError::Storage(format!("Failed to open {} tree: {}", name, e)))
    }

    fn ensure_schema(&self) -> AtlasResult<()> {
        match self.schema_version()? {
            0 => {
                info!("Initializing new database with schema version {}", CURRENT_SCHEMA_VERSION);
                let info = SchemaInfo {
                    version: CURRENT_SCHEMA_VERSION,
                    created_at: chrono::Utc::now().timestamp(),
                };
                let bytes = bincode::serialize(&info)
                    .map_err(|e| AtlasError::Storage(format!("Failed to serialize schema: {}", e)))?;
                self.schema
                    .insert(SCHEMA_KEY, bytes)
                    .map_err(|e| AtlasError::Storage(format!("Failed to store schema: {}", e)))?;
                self.flush()
            }
            CURRENT_SCHEMA_VERSION => Ok(()),
            version => Err(AtlasError::Storage(format!(
                "Database schema version {} is not supported (expected {})",
                version, CURRENT_SCHEMA_VERSION
            ))),
        }
    }

    pub fn schema_version(&self) -> AtlasResult<u32> {
        let stored = self
            .schema
            .get(SCHEMA_KEY)
            .map_err(|e| AtlasError::Storage(format!("Failed to read schema: {}", e)))?;
        match stored {
            Some(bytes) => {
                let info: SchemaInfo = bincode::deserialize(&bytes)
                    .map_err(|e| AtlasError::Storage(format!("Failed to deserialize schema: {}", e)))?;
                Ok(info.version)
            }
            None => Ok(0),
        }
    }

    pub fn flush(&self) -> AtlasResult<()> {
        self.metrics.flushes.fetch_add(1, Ordering::Relaxed);
        self.db
            .flush()
            .map_err(|e| AtlasError::Storage(format!("Flush error: {}", e)))?;
        Ok(())
    }

    pub async fn flush_async(&self) -> AtlasResult<()> {
        self.metrics.flushes.fetch_add(1, Ordering::Relaxed);
        self.db
            .flush_async()
            .await
            .map_err(|e| AtlasError::Storage(format!("Flush error: {}", e)))?;
        Ok(())
    }

    pub fn size_on_disk(&self) -> AtlasResult<u64> {
        self.db
            .size_on_disk()
            .map_err(|e| AtlasError::Storage(format!("Size error: {}", e)))
    }

    pub fn storage_metrics(&self) -> Arc<StorageMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn uptime(&self) -> std::time::Duration {
        self.opened_at.elapsed()
    }

    pub fn config(&self) -> &StorageConfig {
        &self.storage_config
    }

    pub fn is_in_memory(&self) -> bool {
        self.storage_config.path.as_os_str().is_empty()
    }

    fn read_error(&self, what: &str, e: impl std::fmt::Display) -> AtlasError {
        self.metrics.errors.fetch_add(1, Ordering::Relaxed);
        AtlasError::Storage(format!("Failed to read {}: {}", what, e))
    }

    fn transaction_error(&self, e: TransactionError<AtlasError>) -> AtlasError {
        match e {
            TransactionError::Abort(err) => {
                self.metrics.aborts.fetch_add(1, Ordering::Relaxed);
                err
            }
            TransactionError::Storage(err) => {
                self.metrics.errors.fetch_add(1, Ordering::Relaxed);
                AtlasError::Storage(format!("Transaction failed: {}", err))
            }
        }
    }
}

pub(crate) fn encode<T: serde::Serialize>(value: &T, what: &str) -> AtlasResult<Vec<u8>> {
    bincode::serialize(value)
        .map_err(|e| AtlasError::Serialization(format!("Failed to serialize {}: {}", what, e)))
}

pub(crate) fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8], what: &str) -> AtlasResult<T> {
    bincode::deserialize(bytes)
        .map_err(|e| AtlasError::Serialization(format!("Failed to deserialize {}: {}", what, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_schema() {
        let storage = AtlasStorage::in_memory().unwrap();
        assert!(storage.is_in_memory());
        assert_eq!(storage.schema_version().unwrap(), CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_reopen_keeps_schema() {
        let dir = std::env::temp_dir().join(format!("atlas-storage-{}", uuid::Uuid::new_v4()));
        {
            let storage = AtlasStorage::open(StorageConfig::at(&dir)).unwrap();
            assert_eq!(storage.schema_version().unwrap(), 1);
        }
        let storage = AtlasStorage::open(StorageConfig::at(&dir)).unwrap();
        assert_eq!(storage.schema_version().unwrap(), 1);
        drop(storage);
        let _ = std::fs::remove_dir_all(dir);
    }
}
