use dac_batch_applier::BatchApplierError;
use dac_fact_store::FactStoreError;
use dac_gateway_client::GatewayClientError;
use dac_signer::SignerError;
use dac_storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum CommitteeLoopError {
    #[error(transparent)]
    Gateway(#[from] GatewayClientError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    FactStore(#[from] FactStoreError),
    #[error(transparent)]
    Signer(#[from] SignerError),
    #[error("batch rejected: {0}")]
    BatchRejected(#[from] BatchApplierError),
    #[error("gateway rejected submission for batch {batch_id}: {reason}")]
    SubmissionRejected { batch_id: dac_types::BatchId, reason: String },
    #[error(
        "gateway-declared reference batch {reference_id} is ahead of the current head {current_head}"
    )]
    InvalidReference { reference_id: dac_types::BatchId, current_head: dac_types::BatchId },
    #[error("reorg rewind from {current_head} would walk past batch 0 trying to reach {from}")]
    RewindUnderflow { from: dac_types::BatchId, current_head: dac_types::BatchId },
}

impl CommitteeLoopError {
    /// Root mismatch, invalid delta, and a rejected submission are fatal (spec.md §7); a
    /// gateway/storage call that merely timed out or hit a 5xx is recoverable and the
    /// loop's caller should sleep and retry the same state transition.
    pub fn is_fatal(&self) -> bool {
        match self {
            CommitteeLoopError::Gateway(e) => !e.is_retryable(),
            CommitteeLoopError::Storage(e) => !matches!(e, StorageError::Transient(_)),
            CommitteeLoopError::FactStore(FactStoreError::Storage(e)) => {
                !matches!(e, StorageError::Transient(_))
            }
            CommitteeLoopError::FactStore(_) => true,
            CommitteeLoopError::Signer(_) => true,
            CommitteeLoopError::BatchRejected(_) => true,
            CommitteeLoopError::SubmissionRejected { .. } => true,
            CommitteeLoopError::InvalidReference { .. } => true,
            CommitteeLoopError::RewindUnderflow { .. } => true,
        }
    }
}

pub type CommitteeLoopResult<T> = Result<T, CommitteeLoopError>;
