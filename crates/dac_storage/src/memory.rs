use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::adapter::{Namespace, StorageAdapter};
use crate::error::StorageResult;

/// In-memory backend used by tests and by the in-process fact-store test suite. Never
/// returns a transient error, so it exercises the "happy path" of a retry policy without
/// ever triggering a retry.
#[derive(Default)]
pub struct MemoryStorage {
    facts: Mutex<HashMap<Vec<u8>, Vec<u8>>>,
    root_pointers: Mutex<HashMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, namespace: Namespace) -> &Mutex<HashMap<Vec<u8>, Vec<u8>>> {
        match namespace {
            Namespace::Facts => &self.facts,
            Namespace::RootPointers => &self.root_pointers,
        }
    }
}

#[async_trait]
impl StorageAdapter for MemoryStorage {
    async fn get(&self, namespace: Namespace, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.table(namespace).lock().unwrap().get(key).cloned())
    }

    async fn multi_get(
        &self,
        namespace: Namespace,
        keys: &[Vec<u8>],
    ) -> StorageResult<HashMap<Vec<u8>, Vec<u8>>> {
        let table = self.table(namespace).lock().unwrap();
        Ok(keys
            .iter()
            .filter_map(|k| table.get(k).map(|v| (k.clone(), v.clone())))
            .collect())
    }

    async fn set(&self, namespace: Namespace, key: &[u8], value: &[u8]) -> StorageResult<()> {
        self.table(namespace).lock().unwrap().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    async fn multi_set(
        &self,
        namespace: Namespace,
        entries: &[(Vec<u8>, Vec<u8>)],
    ) -> StorageResult<()> {
        let mut table = self.table(namespace).lock().unwrap();
        for (key, value) in entries {
            table.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    async fn cas_set(
        &self,
        namespace: Namespace,
        key: &[u8],
        expected: Option<&[u8]>,
        new: &[u8],
    ) -> StorageResult<bool> {
        let mut table = self.table(namespace).lock().unwrap();
        let current = table.get(key).map(|v| v.as_slice());
        if current != expected {
            return Ok(false);
        }
        table.insert(key.to_vec(), new.to_vec());
        Ok(true)
    }
}
