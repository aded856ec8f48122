use dac_committee_loop::CommitteeLoopError;
use dac_config::ConfigError;
use dac_fact_store::FactStoreError;
use dac_gateway_client::GatewayClientError;
use dac_signer::SignerError;
use dac_storage::StorageError;

/// Top-level failure of the `dac_node` process. Every variant maps to a non-zero exit
/// code (spec.md §6); `Config` and key/cert loading failures are startup-only, before any
/// gateway or storage I/O has happened (spec.md §7).
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("I/O error at {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error(transparent)]
    Signer(#[from] SignerError),
    #[error(transparent)]
    Gateway(#[from] GatewayClientError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    FactStore(#[from] FactStoreError),
    #[error(transparent)]
    CommitteeLoop(#[from] CommitteeLoopError),
    #[error("archive error: {0}")]
    Archive(String),
}

impl NodeError {
    /// Exit status per spec.md §6: 0 is reserved for clean shutdown, everything else
    /// exits `1`. There is no richer taxonomy an operator script depends on today.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

pub type NodeResult<T> = Result<T, NodeError>;
