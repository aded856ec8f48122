use dac_fact_store::FactStoreError;
use dac_types::Index;

#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("index {index} is out of range for a tree of height {height} (valid range [0, {bound}))")]
    InvalidIndex { index: Index, height: u32, bound: u64 },
    #[error(transparent)]
    FactStore(#[from] FactStoreError),
}

pub type TreeResult<T> = Result<T, TreeError>;
