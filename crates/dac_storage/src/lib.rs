pub mod adapter;
pub mod error;
pub mod memory;
pub mod retry;

#[cfg(feature = "rocksdb_storage")]
pub mod rocksdb_backend;

pub use adapter::{Namespace, StorageAdapter};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryStorage;
pub use retry::RetryPolicy;

#[cfg(feature = "rocksdb_storage")]
pub use rocksdb_backend::RocksDbStorage;
