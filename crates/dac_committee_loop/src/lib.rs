pub mod cursor;
pub mod engine;
pub mod error;
pub mod state;

pub use engine::{CommitteeLoop, CommitteeLoopConfig};
pub use error::{CommitteeLoopError, CommitteeLoopResult};
pub use state::LoopState;
