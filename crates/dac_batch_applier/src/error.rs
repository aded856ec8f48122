use dac_tree::TreeError;
use dac_types::{BatchId, Felt, ReferenceBatchId, RootSet};

/// Every variant here is unconditionally fatal for the batch it names (spec.md §4.4):
/// the committee loop must not retain facts, sign, or retry on any of these.
#[derive(Debug, thiserror::Error)]
pub enum BatchApplierError {
    #[error("delta of size {size} exceeds the configured maximum of {max}")]
    DeltaTooLarge { size: usize, max: usize },
    #[error("reference batch {reference_batch_id:?} is not the committed head: expected {expected:?}, descriptor declares {declared:?}")]
    ReferenceRootMismatch { reference_batch_id: ReferenceBatchId, expected: RootSet, declared: RootSet },
    #[error("batch {batch_id} {tree} root mismatch: computed {computed}, operator declared {declared}")]
    RootMismatch { batch_id: BatchId, tree: &'static str, computed: Felt, declared: Felt },
    #[error("batch {0} declares an order_root but the active profile has no order tree")]
    UnexpectedOrderRoot(BatchId),
    #[error("batch {0} omits order_root but the active profile requires one")]
    MissingOrderRoot(BatchId),
    #[error(transparent)]
    Tree(#[from] TreeError),
}

pub type BatchApplierResult<T> = Result<T, BatchApplierError>;
