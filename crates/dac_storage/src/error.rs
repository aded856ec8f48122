/// Storage-layer failures. `Transient` variants are produced by a backend and are safe
/// to retry at the [`crate::retry`] boundary; `Unavailable` is what the caller actually
/// sees once the retry budget is exhausted.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("transient storage fault: {0}")]
    Transient(String),
    #[error("storage unavailable after retries: {0}")]
    Unavailable(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StorageResult<T> = Result<T, StorageError>;
