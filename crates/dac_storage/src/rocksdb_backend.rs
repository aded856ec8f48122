use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, Options, DB};

use crate::adapter::{Namespace, StorageAdapter};
use crate::error::{StorageError, StorageResult};
use crate::retry::RetryPolicy;

const FACTS_CF: &str = "facts";
const ROOT_POINTERS_CF: &str = "root_pointers";

/// Embedded, durable backend: one RocksDB column family per [`Namespace`]. Stands in for
/// "a replicated KV store is assumed" (spec.md §1) — the node depends only on
/// [`StorageAdapter`], so a real replicated store can be substituted without touching the
/// core.
pub struct RocksDbStorage {
    db: Arc<DB>,
    // RocksDB has no native CAS; this guards the read-modify-write in `cas_set` so two
    // concurrent callers on this process can't interleave between the get and the put.
    cas_lock: Arc<Mutex<()>>,
    retry: RetryPolicy,
}

impl RocksDbStorage {
    pub fn open(path: impl AsRef<Path>, retry: RetryPolicy) -> StorageResult<Self> {
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        let cfs = vec![
            ColumnFamilyDescriptor::new(FACTS_CF, Options::default()),
            ColumnFamilyDescriptor::new(ROOT_POINTERS_CF, Options::default()),
        ];
        let db = DB::open_cf_descriptors(&db_opts, path, cfs)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(Self { db: Arc::new(db), cas_lock: Arc::new(Mutex::new(())), retry })
    }

    fn cf_name(namespace: Namespace) -> &'static str {
        match namespace {
            Namespace::Facts => FACTS_CF,
            Namespace::RootPointers => ROOT_POINTERS_CF,
        }
    }

    /// Runs a blocking RocksDB operation on the blocking pool, retrying transient faults
    /// with the configured backoff (spec.md §4.1: "transient failures... are retried with
    /// exponential backoff... exhaustion surfaces a storage-unavailable error"). `action`
    /// must be safe to call more than once: every [`StorageAdapter`] method is idempotent.
    async fn run_with_retry<T, F>(&self, action: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: Fn() -> StorageResult<T> + Send + Sync + 'static,
    {
        let action = Arc::new(action);
        self.retry
            .run(move || {
                let action = action.clone();
                async move {
                    match tokio::task::spawn_blocking(move || action()).await {
                        Ok(result) => result,
                        Err(e) => Err(StorageError::Backend(format!("blocking task panicked: {e}"))),
                    }
                }
            })
            .await
    }
}

#[async_trait]
impl StorageAdapter for RocksDbStorage {
    async fn get(&self, namespace: Namespace, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let db = self.db.clone();
        let key = key.to_vec();
        self.run_with_retry(move || {
            let cf = db.cf_handle(Self::cf_name(namespace)).expect("column family exists");
            db.get_cf(&cf, &key).map_err(|e| StorageError::Transient(e.to_string()))
        })
        .await
    }

    async fn multi_get(
        &self,
        namespace: Namespace,
        keys: &[Vec<u8>],
    ) -> StorageResult<HashMap<Vec<u8>, Vec<u8>>> {
        let db = self.db.clone();
        let keys = keys.to_vec();
        self.run_with_retry(move || {
            let cf = db.cf_handle(Self::cf_name(namespace)).expect("column family exists");
            let mut result = HashMap::with_capacity(keys.len());
            for key in &keys {
                if let Some(value) =
                    db.get_cf(&cf, key).map_err(|e| StorageError::Transient(e.to_string()))?
                {
                    result.insert(key.clone(), value);
                }
            }
            Ok(result)
        })
        .await
    }

    async fn set(&self, namespace: Namespace, key: &[u8], value: &[u8]) -> StorageResult<()> {
        let db = self.db.clone();
        let key = key.to_vec();
        let value = value.to_vec();
        self.run_with_retry(move || {
            let cf = db.cf_handle(Self::cf_name(namespace)).expect("column family exists");
            db.put_cf(&cf, &key, &value).map_err(|e| StorageError::Transient(e.to_string()))
        })
        .await
    }

    async fn multi_set(
        &self,
        namespace: Namespace,
        entries: &[(Vec<u8>, Vec<u8>)],
    ) -> StorageResult<()> {
        let db = self.db.clone();
        let entries = entries.to_vec();
        self.run_with_retry(move || {
            let cf = db.cf_handle(Self::cf_name(namespace)).expect("column family exists");
            let mut batch = rocksdb::WriteBatch::default();
            for (key, value) in &entries {
                batch.put_cf(&cf, key, value);
            }
            db.write(batch).map_err(|e| StorageError::Transient(e.to_string()))
        })
        .await
    }

    async fn cas_set(
        &self,
        namespace: Namespace,
        key: &[u8],
        expected: Option<&[u8]>,
        new: &[u8],
    ) -> StorageResult<bool> {
        // Cross-process CAS is a replicated-store concern, out of scope here; within this
        // process `cas_lock` serializes the read-modify-write against other `cas_set` calls.
        let db = self.db.clone();
        let cas_lock = self.cas_lock.clone();
        let key = key.to_vec();
        let expected = expected.map(|e| e.to_vec());
        let new = new.to_vec();
        self.run_with_retry(move || {
            let _guard = cas_lock.lock().unwrap();
            let cf = db.cf_handle(Self::cf_name(namespace)).expect("column family exists");
            let current = db.get_cf(&cf, &key).map_err(|e| StorageError::Transient(e.to_string()))?;
            if current != expected {
                return Ok(false);
            }
            db.put_cf(&cf, &key, &new).map_err(|e| StorageError::Transient(e.to_string()))?;
            Ok(true)
        })
        .await
    }
}
