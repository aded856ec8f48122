pub mod batch;
pub mod felt;
pub mod profile;

pub use batch::{BatchDescriptor, BatchId, Delta, Index, LeafValue, ReferenceBatchId, RootSet};
pub use felt::{Felt, FeltError};
pub use profile::Profile;
