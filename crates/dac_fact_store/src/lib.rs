pub mod error;
pub mod store;

pub use error::{FactStoreError, FactStoreResult};
pub use store::{Fact, FactStore};
