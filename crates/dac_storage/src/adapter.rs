use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::StorageResult;

/// Separates facts (write-once, long retention) from root pointers and the loop cursor
/// (overwritable, short retention) so the two can carry different retention policies
/// (spec.md §4.1).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Namespace {
    Facts,
    RootPointers,
}

impl Namespace {
    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::Facts => "fact",
            Namespace::RootPointers => "root",
        }
    }
}

/// Idempotent key-value operations over opaque byte keys. Every method is safe to call
/// more than once with the same arguments (spec.md §4.1); callers that need retries
/// should wrap calls with a [`crate::retry::RetryPolicy`].
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    async fn get(&self, namespace: Namespace, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    async fn multi_get(
        &self,
        namespace: Namespace,
        keys: &[Vec<u8>],
    ) -> StorageResult<HashMap<Vec<u8>, Vec<u8>>>;

    async fn set(&self, namespace: Namespace, key: &[u8], value: &[u8]) -> StorageResult<()>;

    async fn multi_set(
        &self,
        namespace: Namespace,
        entries: &[(Vec<u8>, Vec<u8>)],
    ) -> StorageResult<()>;

    /// Compare-and-set: writes `new` only if the current value equals `expected` (`None`
    /// meaning "absent"). Returns whether the write happened.
    async fn cas_set(
        &self,
        namespace: Namespace,
        key: &[u8],
        expected: Option<&[u8]>,
        new: &[u8],
    ) -> StorageResult<bool>;
}
