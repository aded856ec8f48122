use dac_storage::{Namespace, StorageAdapter};
use dac_types::{BatchId, Felt, RootSet};
use serde::{Deserialize, Serialize};

use crate::error::{CommitteeLoopError, CommitteeLoopResult};

fn root_key(batch_id: BatchId) -> Vec<u8> {
    format!("root:{}", batch_id.0).into_bytes()
}

fn submitted_key(batch_id: BatchId) -> Vec<u8> {
    format!("submitted:{}", batch_id.0).into_bytes()
}

const CURSOR_KEY: &[u8] = b"cursor:next_id";

#[derive(Clone, Debug, Serialize, Deserialize)]
struct StoredRoots {
    state_root: Felt,
    order_root: Option<Felt>,
}

impl From<RootSet> for StoredRoots {
    fn from(roots: RootSet) -> Self {
        Self { state_root: roots.state_root, order_root: roots.order_root }
    }
}

impl From<StoredRoots> for RootSet {
    fn from(stored: StoredRoots) -> Self {
        RootSet { state_root: stored.state_root, order_root: stored.order_root }
    }
}

/// Persisted view of "what the loop has already committed", namespaced alongside fact
/// storage (spec.md §6: `root:<batch_id>`, `cursor:next_id`). A thin wrapper so the loop
/// never encodes a storage key by hand outside this module.
pub struct CursorStore<'a, S: StorageAdapter> {
    storage: &'a S,
}

impl<'a, S: StorageAdapter> CursorStore<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Self { storage }
    }

    pub async fn get_root(&self, batch_id: BatchId) -> CommitteeLoopResult<Option<RootSet>> {
        let bytes = self.storage.get(Namespace::RootPointers, &root_key(batch_id)).await?;
        // An empty value is a tombstone left by `rewind_from`, since the adapter has no
        // delete primitive (spec.md §4.1 only defines get/set/multi_set/cas_set).
        Ok(match bytes {
            Some(b) if !b.is_empty() => Some(
                serde_json::from_slice::<StoredRoots>(&b)
                    .map_err(|e| dac_storage::StorageError::Backend(e.to_string()))?
                    .into(),
            ),
            _ => None,
        })
    }

    pub async fn set_root(&self, batch_id: BatchId, roots: RootSet) -> CommitteeLoopResult<()> {
        let encoded = serde_json::to_vec(&StoredRoots::from(roots))
            .map_err(|e| dac_storage::StorageError::Backend(e.to_string()))?;
        self.storage.set(Namespace::RootPointers, &root_key(batch_id), &encoded).await?;
        Ok(())
    }

    /// Deletes every root pointer for `batch_id` and everything after it, in descending
    /// order, as part of a reorg rewind (spec.md §7, §8 scenario 4). Callers are expected
    /// to have already checked `from <= current_head` (see
    /// `CommitteeLoopError::InvalidReference`); `checked_sub` here is a second line of
    /// defense against a `u64` underflow rather than the primary guard.
    pub async fn rewind_from(&self, from: BatchId, current_head: BatchId) -> CommitteeLoopResult<()> {
        let mut id = current_head;
        loop {
            self.storage.set(Namespace::RootPointers, &root_key(id), &[]).await?;
            self.storage.set(Namespace::RootPointers, &submitted_key(id), &[]).await?;
            if id == from {
                break;
            }
            id = BatchId(id.0.checked_sub(1).ok_or(CommitteeLoopError::RewindUnderflow {
                from,
                current_head,
            })?);
        }
        Ok(())
    }

    pub async fn get_next_id(&self) -> CommitteeLoopResult<BatchId> {
        let bytes = self.storage.get(Namespace::RootPointers, CURSOR_KEY).await?;
        Ok(match bytes {
            Some(b) if b.len() == 8 => BatchId(u64::from_be_bytes(b.try_into().unwrap())),
            _ => BatchId(0),
        })
    }

    pub async fn set_next_id(&self, next_id: BatchId) -> CommitteeLoopResult<()> {
        self.storage.set(Namespace::RootPointers, CURSOR_KEY, &next_id.0.to_be_bytes()).await?;
        Ok(())
    }

    pub async fn is_submitted(&self, batch_id: BatchId) -> CommitteeLoopResult<bool> {
        Ok(self
            .storage
            .get(Namespace::RootPointers, &submitted_key(batch_id))
            .await?
            .is_some_and(|b| !b.is_empty()))
    }

    pub async fn mark_submitted(&self, batch_id: BatchId) -> CommitteeLoopResult<()> {
        self.storage.set(Namespace::RootPointers, &submitted_key(batch_id), &[1]).await?;
        Ok(())
    }
}
