use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use dac_storage::{Namespace, StorageAdapter};
use dac_types::{Felt, LeafValue};
use lru::LruCache;

use crate::error::{FactStoreError, FactStoreResult};

/// A single persisted fact: either an internal node (two child hashes) or a leaf
/// (profile-serialized value). Facts are content-addressed and write-once (spec.md §3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fact {
    Internal { left: Felt, right: Felt },
    Leaf(LeafValue),
}

impl Fact {
    fn encode(&self) -> Vec<u8> {
        match self {
            Fact::Internal { left, right } => {
                let mut bytes = Vec::with_capacity(65);
                bytes.push(b'I');
                bytes.extend_from_slice(&left.to_bytes_be());
                bytes.extend_from_slice(&right.to_bytes_be());
                bytes
            }
            Fact::Leaf(value) => {
                let mut bytes = Vec::with_capacity(1 + value.0.len());
                bytes.push(b'L');
                bytes.extend_from_slice(&value.0);
                bytes
            }
        }
    }

    fn decode(hash: Felt, bytes: &[u8]) -> FactStoreResult<Self> {
        match bytes.split_first() {
            Some((b'I', rest)) if rest.len() == 64 => {
                let left = Felt::from_be_slice(&rest[..32])
                    .map_err(|e| FactStoreError::Malformed { hash, reason: e.to_string() })?;
                let right = Felt::from_be_slice(&rest[32..])
                    .map_err(|e| FactStoreError::Malformed { hash, reason: e.to_string() })?;
                Ok(Fact::Internal { left, right })
            }
            Some((b'L', rest)) => Ok(Fact::Leaf(LeafValue(rest.to_vec()))),
            _ => Err(FactStoreError::Malformed { hash, reason: "unrecognized fact tag".into() }),
        }
    }
}

/// Content-addressed Merkle fact store (spec.md §4.2): a thin, deduplicating layer over
/// a [`StorageAdapter`] with a read-through LRU cache of internal-node facts. Facts are
/// immutable once written, so cached entries never need invalidation.
pub struct FactStore<S: StorageAdapter> {
    storage: S,
    node_cache: Mutex<LruCache<Felt, (Felt, Felt)>>,
}

const DEFAULT_NODE_CACHE_CAPACITY: usize = 300_000;

impl<S: StorageAdapter> FactStore<S> {
    pub fn new(storage: S) -> Self {
        Self::with_cache_capacity(storage, DEFAULT_NODE_CACHE_CAPACITY)
    }

    pub fn with_cache_capacity(storage: S, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self { storage, node_cache: Mutex::new(LruCache::new(capacity)) }
    }

    /// Batched, durable write of content-addressed facts. Must complete before the
    /// caller may treat the corresponding root as persisted (spec.md §4.3 step 5).
    pub async fn put_facts(&self, facts: &HashMap<Felt, Fact>) -> FactStoreResult<()> {
        if facts.is_empty() {
            return Ok(());
        }
        let entries: Vec<(Vec<u8>, Vec<u8>)> = facts
            .iter()
            .map(|(hash, fact)| (hash.to_bytes_be().to_vec(), fact.encode()))
            .collect();
        self.storage.multi_set(Namespace::Facts, &entries).await?;
        for (hash, fact) in facts {
            if let Fact::Internal { left, right } = fact {
                self.node_cache.lock().unwrap().put(*hash, (*left, *right));
            }
        }
        Ok(())
    }

    /// Looks up an internal node's children. `expected_height` is an unused cache hint
    /// today (a single flat LRU suffices at this scale) but is part of the contract so a
    /// future height-partitioned cache can be dropped in without an API break.
    pub async fn get_node(
        &self,
        hash: Felt,
        _expected_height: u32,
    ) -> FactStoreResult<(Felt, Felt)> {
        if let Some(children) = self.node_cache.lock().unwrap().get(&hash) {
            return Ok(*children);
        }
        let bytes = self
            .storage
            .get(Namespace::Facts, &hash.to_bytes_be())
            .await?
            .ok_or(FactStoreError::Missing(hash))?;
        match Fact::decode(hash, &bytes)? {
            Fact::Internal { left, right } => {
                self.node_cache.lock().unwrap().put(hash, (left, right));
                Ok((left, right))
            }
            Fact::Leaf(_) => {
                Err(FactStoreError::Malformed { hash, reason: "expected internal node, found leaf".into() })
            }
        }
    }

    /// Exposes the underlying adapter for callers that need to share one storage
    /// instance across the fact store and another namespace (e.g. the committee loop's
    /// root-pointer cursor, which lives in [`Namespace::RootPointers`]).
    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub async fn get_leaf(&self, hash: Felt) -> FactStoreResult<LeafValue> {
        let bytes = self
            .storage
            .get(Namespace::Facts, &hash.to_bytes_be())
            .await?
            .ok_or(FactStoreError::Missing(hash))?;
        match Fact::decode(hash, &bytes)? {
            Fact::Leaf(value) => Ok(value),
            Fact::Internal { .. } => {
                Err(FactStoreError::Malformed { hash, reason: "expected leaf, found internal node".into() })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use dac_storage::MemoryStorage;

    use super::*;

    #[tokio::test]
    async fn put_then_get_node_round_trips() {
        let store = FactStore::new(MemoryStorage::new());
        let left = Felt::from_u64(1);
        let right = Felt::from_u64(2);
        let hash = Felt::from_u64(3);
        let mut facts = HashMap::new();
        facts.insert(hash, Fact::Internal { left, right });
        store.put_facts(&facts).await.unwrap();
        assert_eq!(store.get_node(hash, 5).await.unwrap(), (left, right));
    }

    #[tokio::test]
    async fn put_then_get_leaf_round_trips() {
        let store = FactStore::new(MemoryStorage::new());
        let hash = Felt::from_u64(9);
        let mut facts = HashMap::new();
        facts.insert(hash, Fact::Leaf(LeafValue(vec![1, 2, 3])));
        store.put_facts(&facts).await.unwrap();
        assert_eq!(store.get_leaf(hash).await.unwrap(), LeafValue(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn missing_fact_is_reported() {
        let store = FactStore::new(MemoryStorage::new());
        let err = store.get_node(Felt::from_u64(404), 1).await.unwrap_err();
        assert!(matches!(err, FactStoreError::Missing(_)));
    }

    #[tokio::test]
    async fn cache_serves_node_without_storage_round_trip() {
        let store = FactStore::with_cache_capacity(MemoryStorage::new(), 4);
        let hash = Felt::from_u64(11);
        let mut facts = HashMap::new();
        facts.insert(hash, Fact::Internal { left: Felt::from_u64(1), right: Felt::from_u64(2) });
        store.put_facts(&facts).await.unwrap();
        // A second read must agree with the first even if we could no longer see
        // storage (we can't easily sever it here, but equality across repeated reads
        // exercises the cache path deterministically).
        let first = store.get_node(hash, 1).await.unwrap();
        let second = store.get_node(hash, 1).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn empty_put_facts_is_a_no_op() {
        let store = FactStore::new(MemoryStorage::new());
        store.put_facts(&HashMap::new()).await.unwrap();
    }
}
