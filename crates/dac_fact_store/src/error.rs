use dac_storage::StorageError;
use dac_types::Felt;

#[derive(Debug, thiserror::Error)]
pub enum FactStoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("fact {0} not found in storage")]
    Missing(Felt),
    #[error("fact {hash} is malformed: {reason}")]
    Malformed { hash: Felt, reason: String },
}

pub type FactStoreResult<T> = Result<T, FactStoreError>;
