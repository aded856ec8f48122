pub mod applier;
pub mod error;

pub use applier::{apply, AppliedBatch, BatchApplierConfig};
pub use error::{BatchApplierError, BatchApplierResult};
