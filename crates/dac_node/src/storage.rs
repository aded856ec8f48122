use std::collections::HashMap;

use async_trait::async_trait;
use dac_config::StorageConfig;
use dac_storage::{MemoryStorage, Namespace, RetryPolicy, RocksDbStorage, StorageAdapter, StorageResult};

use crate::error::NodeResult;

/// The concrete backend selected by `NodeConfig::storage` (spec.md §4.8). A thin enum
/// rather than a trait object: `CommitteeLoop<S, _, _>` is generic over `S`, so the node
/// only needs one concrete type to hand it, not dynamic dispatch.
pub enum NodeStorage {
    Memory(MemoryStorage),
    RocksDb(RocksDbStorage),
}

/// `retry` is `NodeConfig::storage_retry` converted to a [`RetryPolicy`] (spec.md §4.1);
/// the in-memory backend has no transient faults to retry and ignores it.
pub fn open(config: &StorageConfig, retry: RetryPolicy) -> NodeResult<NodeStorage> {
    Ok(match config {
        StorageConfig::Memory => NodeStorage::Memory(MemoryStorage::new()),
        StorageConfig::RocksDb { path } => NodeStorage::RocksDb(RocksDbStorage::open(path, retry)?),
    })
}

#[async_trait]
impl StorageAdapter for NodeStorage {
    async fn get(&self, namespace: Namespace, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        match self {
            NodeStorage::Memory(s) => s.get(namespace, key).await,
            NodeStorage::RocksDb(s) => s.get(namespace, key).await,
        }
    }

    async fn multi_get(
        &self,
        namespace: Namespace,
        keys: &[Vec<u8>],
    ) -> StorageResult<HashMap<Vec<u8>, Vec<u8>>> {
        match self {
            NodeStorage::Memory(s) => s.multi_get(namespace, keys).await,
            NodeStorage::RocksDb(s) => s.multi_get(namespace, keys).await,
        }
    }

    async fn set(&self, namespace: Namespace, key: &[u8], value: &[u8]) -> StorageResult<()> {
        match self {
            NodeStorage::Memory(s) => s.set(namespace, key, value).await,
            NodeStorage::RocksDb(s) => s.set(namespace, key, value).await,
        }
    }

    async fn multi_set(
        &self,
        namespace: Namespace,
        entries: &[(Vec<u8>, Vec<u8>)],
    ) -> StorageResult<()> {
        match self {
            NodeStorage::Memory(s) => s.multi_set(namespace, entries).await,
            NodeStorage::RocksDb(s) => s.multi_set(namespace, entries).await,
        }
    }

    async fn cas_set(
        &self,
        namespace: Namespace,
        key: &[u8],
        expected: Option<&[u8]>,
        new: &[u8],
    ) -> StorageResult<bool> {
        match self {
            NodeStorage::Memory(s) => s.cas_set(namespace, key, expected, new).await,
            NodeStorage::RocksDb(s) => s.cas_set(namespace, key, expected, new).await,
        }
    }
}
