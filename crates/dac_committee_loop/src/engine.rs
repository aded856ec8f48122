use std::time::Duration;

use dac_batch_applier::{apply, BatchApplierConfig, BatchApplierError};
use dac_fact_store::FactStore;
use dac_gateway_client::{GatewayClient, GatewayClientError, SubmittedSignature};
use dac_signer::AttestationSigner;
use dac_storage::StorageAdapter;
use dac_tree::EmptySubtreeTable;
use dac_types::{BatchDescriptor, BatchId, Profile, ReferenceBatchId};
use tracing::{info, warn};

use crate::cursor::CursorStore;
use crate::error::{CommitteeLoopError, CommitteeLoopResult};
use crate::state::LoopState;

pub struct CommitteeLoopConfig {
    pub profile: Profile,
    pub max_delta_size: usize,
    pub polling_interval: Duration,
    pub recoverable_error_sleep: Duration,
    pub signer_id: String,
}

/// Drives the poll / verify / sign / submit cycle against one gateway, one signer, and
/// one storage backend (spec.md §4.7). Owns no resources it doesn't itself mutate: the
/// storage adapter and the fact cache belong entirely to this loop (spec.md §5).
pub struct CommitteeLoop<S, G, A> {
    fact_store: FactStore<S>,
    gateway: G,
    signer: A,
    config: CommitteeLoopConfig,
    empty_state_table: EmptySubtreeTable,
    empty_order_table: Option<EmptySubtreeTable>,
    state: LoopState,
}

impl<S, G, A> CommitteeLoop<S, G, A>
where
    S: StorageAdapter,
    G: GatewayClient,
    A: AttestationSigner,
{
    pub fn new(storage: S, gateway: G, signer: A, config: CommitteeLoopConfig) -> Self {
        let empty_state_table = EmptySubtreeTable::new(config.profile.state_tree_height());
        let empty_order_table = config.profile.order_tree_height().map(EmptySubtreeTable::new);
        Self {
            fact_store: FactStore::new(storage),
            gateway,
            signer,
            config,
            empty_state_table,
            empty_order_table,
            state: LoopState::Idle,
        }
    }

    pub fn state(&self) -> &LoopState {
        &self.state
    }

    fn cursor(&self) -> CursorStore<'_, S> {
        CursorStore::new(self.fact_store.storage())
    }

    /// Runs indefinitely, sleeping between polls and on recoverable errors, returning
    /// only on a fatal condition (spec.md §5/§7). Mirrors the reference workspace's
    /// "retry the outer loop, only a whitelisted error is recoverable" shape.
    pub async fn run(&mut self) -> CommitteeLoopResult<()> {
        let (_tx, rx) = tokio::sync::watch::channel(false);
        self.run_until_shutdown(rx).await
    }

    /// Like [`Self::run`], but also exits cleanly once `shutdown` is set, and only while
    /// the loop sits in `Idle` or `Committed` (spec.md §5: a signal received mid-
    /// `Submitting` does not cut the transition short; the next suspension point is the
    /// end of that `step()` call).
    pub async fn run_until_shutdown(
        &mut self,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> CommitteeLoopResult<()> {
        loop {
            if *shutdown.borrow() && matches!(self.state, LoopState::Idle | LoopState::Committed(_)) {
                return Ok(());
            }
            match self.step().await {
                Ok(true) => continue,
                Ok(false) => {
                    tokio::select! {
                        _ = tokio::time::sleep(self.config.polling_interval) => {}
                        _ = shutdown.changed() => {}
                    }
                }
                Err(err) if !err.is_fatal() => {
                    warn!(error = %err, "recoverable error in committee loop, retrying");
                    tokio::select! {
                        _ = tokio::time::sleep(self.config.recoverable_error_sleep) => {}
                        _ = shutdown.changed() => {}
                    }
                }
                Err(err) => {
                    self.state = LoopState::Fatal(err.to_string());
                    return Err(err);
                }
            }
        }
    }

    /// Processes exactly one batch if the gateway has one ready. Returns `Ok(true)` if
    /// progress was made — a batch was committed, or a stale submission was discarded
    /// after the descriptor changed underneath it — and the caller should poll again
    /// immediately; `Ok(false)` if there was nothing to do (caller should sleep).
    pub async fn step(&mut self) -> CommitteeLoopResult<bool> {
        self.state = LoopState::Fetching;
        let next_id = self.cursor().get_next_id().await?;
        let Some(descriptor) = self.gateway.get_batch_info(next_id).await? else {
            self.state = LoopState::Idle;
            return Ok(false);
        };

        self.reconcile_reference(&descriptor).await?;
        self.commit_batch(descriptor).await?;
        Ok(true)
    }

    /// Rewinds locally-committed root pointers if the gateway's descriptor no longer
    /// chains from what we last committed (spec.md §8 scenario 4, §9 design note:
    /// "reorg handling via an explicit sum type"). A no-op on the fresh-head path: a
    /// reorg is exactly "reference batch no longer matches" our current head (spec.md
    /// §7), not merely "we once committed this reference" — an older-but-still-known
    /// reference still means everything after it must be discarded.
    async fn reconcile_reference(&mut self, descriptor: &BatchDescriptor) -> CommitteeLoopResult<()> {
        let ReferenceBatchId::Batch(reference_id) = descriptor.reference_batch_id else {
            return Ok(());
        };
        let Some(current_head) = self.cursor().get_next_id().await?.prev() else {
            return Ok(());
        };
        if reference_id == current_head {
            return Ok(());
        }
        // A reference ahead of anything we've locally committed is a protocol violation
        // by the gateway, not a reorg: rewinding from it would walk `rewind_from` past
        // `current_head` without ever reaching `from`, underflowing the `BatchId`.
        if reference_id > current_head {
            return Err(CommitteeLoopError::InvalidReference { reference_id, current_head });
        }
        self.state = LoopState::ReorgRewind(reference_id);
        warn!(%reference_id, %current_head, "reorg detected, rewinding root pointers");
        self.cursor().rewind_from(reference_id.next(), current_head).await?;
        self.cursor().set_next_id(reference_id.next()).await?;
        Ok(())
    }

    async fn commit_batch(&mut self, descriptor: BatchDescriptor) -> CommitteeLoopResult<()> {
        let batch_id = descriptor.batch_id;
        self.state = LoopState::Applying(batch_id);

        let reference_roots = match descriptor.reference_batch_id {
            ReferenceBatchId::Genesis => None,
            ReferenceBatchId::Batch(reference_id) => {
                Some(self.cursor().get_root(reference_id).await?.ok_or_else(|| {
                    CommitteeLoopError::BatchRejected(BatchApplierError::ReferenceRootMismatch {
                        reference_batch_id: descriptor.reference_batch_id,
                        expected: descriptor.prev_root.clone(),
                        declared: descriptor.prev_root.clone(),
                    })
                })?)
            }
        };

        let applier_config = BatchApplierConfig { max_delta_size: self.config.max_delta_size };
        let applied = apply(
            &self.fact_store,
            &self.empty_state_table,
            self.empty_order_table.as_ref(),
            self.config.profile,
            applier_config,
            reference_roots,
            &descriptor,
        )
        .await
        .map_err(CommitteeLoopError::BatchRejected)?;

        self.fact_store.put_facts(&applied.new_facts).await?;

        self.state = LoopState::Signing(batch_id);
        let roots = self.config.profile.signed_roots(applied.roots.state_root, applied.roots.order_root);

        if !self.cursor().is_submitted(batch_id).await? {
            let attestation = self.signer.sign_attestation(batch_id, roots.clone()).await?;
            let claim_hash = *roots.last().expect("signed_roots is never empty");
            let signature = SubmittedSignature { r: attestation.signature.r, s: attestation.signature.s };

            self.state = LoopState::Submitting(batch_id);
            if let Err(err) = self
                .gateway
                .send_signature(batch_id, claim_hash, signature, &self.config.signer_id)
                .await
            {
                return self.handle_submission_rejection(&descriptor, err).await;
            }
            self.cursor().mark_submitted(batch_id).await?;
        }

        self.cursor().set_root(batch_id, applied.roots).await?;
        self.cursor().set_next_id(batch_id.next()).await?;
        self.state = LoopState::Committed(batch_id);
        info!(%batch_id, "committed batch");
        Ok(())
    }

    /// Handles a `send_signature` failure per spec.md §7's "Gateway 4xx on submit:
    /// re-fetch the batch; on reorg, rewind; otherwise fatal". A still-retryable error
    /// (the gateway client's own backoff budget exhausted on a network fault or 5xx) is
    /// passed through as a recoverable `Gateway` error rather than treated as fatal here.
    /// A genuine structural rejection (4xx) re-fetches the same batch id: if the
    /// operator's descriptor is unchanged, the rejection is a persistent disagreement and
    /// fatal; if it has changed (an in-flight reorg retracted or replaced this batch),
    /// the signature is discarded and the next `step()` re-reconciles against the fresh
    /// descriptor instead of killing the node over an already-stale submission.
    async fn handle_submission_rejection(
        &mut self,
        descriptor: &BatchDescriptor,
        err: GatewayClientError,
    ) -> CommitteeLoopResult<()> {
        if err.is_retryable() {
            return Err(CommitteeLoopError::Gateway(err));
        }
        let batch_id = descriptor.batch_id;
        let refetched = self.gateway.get_batch_info(batch_id).await?;
        if refetched.as_ref() == Some(descriptor) {
            return Err(CommitteeLoopError::SubmissionRejected { batch_id, reason: err.to_string() });
        }
        warn!(
            %batch_id,
            "gateway rejected submission and the batch descriptor has since changed, \
             discarding signature and retrying"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use dac_gateway_client::MockGatewayClient;
    use dac_signer::{Attestation, MockAttestationSigner, Signature};
    use dac_storage::MemoryStorage;
    use dac_tree::apply_updates;
    use dac_types::{Felt, LeafValue, RootSet};

    use super::*;

    fn test_config() -> CommitteeLoopConfig {
        CommitteeLoopConfig {
            profile: Profile::StarkEx,
            max_delta_size: 100,
            polling_interval: Duration::from_millis(1),
            recoverable_error_sleep: Duration::from_millis(1),
            signer_id: "committee-member-0".into(),
        }
    }

    fn mock_signer() -> MockAttestationSigner {
        let mut signer = MockAttestationSigner::new();
        signer.expect_sign_attestation().returning(|batch_id, roots| {
            Ok(Attestation { batch_id, roots, signature: Signature { r: Felt::from_u64(1), s: Felt::from_u64(2) } })
        });
        signer
    }

    #[tokio::test]
    async fn commits_a_genesis_batch_and_advances_the_cursor() {
        let table = EmptySubtreeTable::new(Profile::StarkEx.state_tree_height());
        let delta = vec![(3u64, LeafValue(vec![9]))];
        let storage = MemoryStorage::new();
        let trial = apply_updates(
            &FactStore::new(MemoryStorage::new()),
            &table,
            Profile::StarkEx,
            Profile::StarkEx.state_tree_height(),
            table.root(),
            delta.clone(),
        )
        .await
        .unwrap();

        let descriptor = BatchDescriptor {
            batch_id: BatchId(0),
            reference_batch_id: ReferenceBatchId::Genesis,
            delta,
            order_delta: vec![],
            prev_root: RootSet { state_root: table.root(), order_root: None },
            next_root: RootSet { state_root: trial.new_root, order_root: None },
        };

        let mut gateway = MockGatewayClient::new();
        gateway.expect_get_batch_info().times(1).returning(move |_| Ok(Some(descriptor.clone())));
        gateway.expect_send_signature().times(1).returning(|_, _, _, _| Ok(()));

        let mut loop_ = CommitteeLoop::new(storage, gateway, mock_signer(), test_config());
        let progressed = loop_.step().await.unwrap();
        assert!(progressed);
        assert_eq!(*loop_.state(), LoopState::Committed(BatchId(0)));
        assert_eq!(loop_.cursor().get_next_id().await.unwrap(), BatchId(1));
    }

    #[tokio::test]
    async fn idle_when_the_gateway_has_nothing_new() {
        let mut gateway = MockGatewayClient::new();
        gateway.expect_get_batch_info().times(1).returning(|_| Ok(None));
        let mut loop_ = CommitteeLoop::new(MemoryStorage::new(), gateway, mock_signer(), test_config());
        let progressed = loop_.step().await.unwrap();
        assert!(!progressed);
        assert_eq!(*loop_.state(), LoopState::Idle);
    }

    #[tokio::test]
    async fn a_root_mismatch_is_reported_and_nothing_is_submitted() {
        let table = EmptySubtreeTable::new(Profile::StarkEx.state_tree_height());
        let descriptor = BatchDescriptor {
            batch_id: BatchId(0),
            reference_batch_id: ReferenceBatchId::Genesis,
            delta: vec![(1u64, LeafValue(vec![1]))],
            order_delta: vec![],
            prev_root: RootSet { state_root: table.root(), order_root: None },
            next_root: RootSet { state_root: Felt::from_u64(0xBAD), order_root: None },
        };

        let mut gateway = MockGatewayClient::new();
        gateway.expect_get_batch_info().times(1).returning(move |_| Ok(Some(descriptor.clone())));
        gateway.expect_send_signature().times(0);

        let mut loop_ =
            CommitteeLoop::new(MemoryStorage::new(), gateway, mock_signer(), test_config());
        let err = loop_.step().await.unwrap_err();
        assert!(err.is_fatal());
    }

    /// A reference batch older than (but still known to) our committed head is exactly
    /// the reorg case (spec.md §7): batches 1 and 2 must be discarded in favor of a new
    /// batch 3 that references batch 0, even though we still hold batch 2's root.
    #[tokio::test]
    async fn a_reference_behind_the_current_head_triggers_a_rewind() {
        let height = Profile::StarkEx.state_tree_height();
        let table = EmptySubtreeTable::new(height);
        let trial_store = FactStore::new(MemoryStorage::new());

        async fn advance(
            trial_store: &FactStore<MemoryStorage>,
            table: &EmptySubtreeTable,
            height: u32,
            from_root: Felt,
            index: u64,
            value: u8,
        ) -> Felt {
            let outcome = apply_updates(
                trial_store,
                table,
                Profile::StarkEx,
                height,
                from_root,
                vec![(index, LeafValue(vec![value]))],
            )
            .await
            .unwrap();
            trial_store.put_facts(&outcome.new_facts).await.unwrap();
            outcome.new_root
        }

        let root0 = advance(&trial_store, &table, height, table.root(), 1, 1).await;
        let root1 = advance(&trial_store, &table, height, root0, 2, 2).await;
        let root2 = advance(&trial_store, &table, height, root1, 3, 3).await;
        let root3 = advance(&trial_store, &table, height, root0, 4, 9).await;

        let descriptor_for = |id: u64, reference: ReferenceBatchId, prev: Felt, next: Felt, index: u64, value: u8| {
            BatchDescriptor {
                batch_id: BatchId(id),
                reference_batch_id: reference,
                delta: vec![(index, LeafValue(vec![value]))],
                order_delta: vec![],
                prev_root: RootSet { state_root: prev, order_root: None },
                next_root: RootSet { state_root: next, order_root: None },
            }
        };
        let d0 = descriptor_for(0, ReferenceBatchId::Genesis, table.root(), root0, 1, 1);
        let d1 = descriptor_for(1, ReferenceBatchId::Batch(BatchId(0)), root0, root1, 2, 2);
        let d2 = descriptor_for(2, ReferenceBatchId::Batch(BatchId(1)), root1, root2, 3, 3);
        let d3 = descriptor_for(3, ReferenceBatchId::Batch(BatchId(0)), root0, root3, 4, 9);

        let mut gateway = MockGatewayClient::new();
        gateway.expect_get_batch_info().returning(move |id| {
            Ok(match id.0 {
                0 => Some(d0.clone()),
                1 => Some(d1.clone()),
                2 => Some(d2.clone()),
                3 => Some(d3.clone()),
                _ => None,
            })
        });
        gateway.expect_send_signature().returning(|_, _, _, _| Ok(()));

        let mut loop_ =
            CommitteeLoop::new(MemoryStorage::new(), gateway, mock_signer(), test_config());
        assert!(loop_.step().await.unwrap());
        assert!(loop_.step().await.unwrap());
        assert!(loop_.step().await.unwrap());
        assert_eq!(loop_.cursor().get_next_id().await.unwrap(), BatchId(3));
        assert_eq!(
            loop_.cursor().get_root(BatchId(2)).await.unwrap(),
            Some(RootSet { state_root: root2, order_root: None })
        );

        assert!(loop_.step().await.unwrap());
        assert_eq!(*loop_.state(), LoopState::Committed(BatchId(3)));
        assert_eq!(loop_.cursor().get_next_id().await.unwrap(), BatchId(4));
        assert_eq!(
            loop_.cursor().get_root(BatchId(3)).await.unwrap(),
            Some(RootSet { state_root: root3, order_root: None })
        );
        // Batches 1 and 2 belonged to the retracted fork and must be tombstoned.
        assert_eq!(loop_.cursor().get_root(BatchId(1)).await.unwrap(), None);
        assert_eq!(loop_.cursor().get_root(BatchId(2)).await.unwrap(), None);
    }

    /// A gateway-declared reference ahead of anything we've committed is a protocol
    /// violation, not a reorg to rewind into: treating it as one would walk
    /// `rewind_from` past `current_head` and underflow. It must be rejected outright.
    #[tokio::test]
    async fn a_reference_ahead_of_the_current_head_is_rejected_as_invalid() {
        let table = EmptySubtreeTable::new(Profile::StarkEx.state_tree_height());
        let delta = vec![(3u64, LeafValue(vec![9]))];
        let storage = MemoryStorage::new();
        let trial = apply_updates(
            &FactStore::new(MemoryStorage::new()),
            &table,
            Profile::StarkEx,
            Profile::StarkEx.state_tree_height(),
            table.root(),
            delta.clone(),
        )
        .await
        .unwrap();

        let genesis = BatchDescriptor {
            batch_id: BatchId(0),
            reference_batch_id: ReferenceBatchId::Genesis,
            delta,
            order_delta: vec![],
            prev_root: RootSet { state_root: table.root(), order_root: None },
            next_root: RootSet { state_root: trial.new_root, order_root: None },
        };
        let bogus = BatchDescriptor {
            batch_id: BatchId(1),
            reference_batch_id: ReferenceBatchId::Batch(BatchId(5)),
            delta: vec![],
            order_delta: vec![],
            prev_root: RootSet { state_root: trial.new_root, order_root: None },
            next_root: RootSet { state_root: trial.new_root, order_root: None },
        };

        let mut gateway = MockGatewayClient::new();
        gateway.expect_get_batch_info().returning(move |id| {
            Ok(match id.0 {
                0 => Some(genesis.clone()),
                1 => Some(bogus.clone()),
                _ => None,
            })
        });
        gateway.expect_send_signature().returning(|_, _, _, _| Ok(()));

        let mut loop_ = CommitteeLoop::new(storage, gateway, mock_signer(), test_config());
        assert!(loop_.step().await.unwrap());

        let err = loop_.step().await.unwrap_err();
        assert!(matches!(err, CommitteeLoopError::InvalidReference { .. }));
        assert!(err.is_fatal());
    }

    /// A gateway rejection on submit that turns out to be the operator having already
    /// reorged the batch out from under us (the re-fetched descriptor differs from the
    /// one we signed) must be discarded, not treated as fatal (spec.md §7).
    #[tokio::test]
    async fn a_rejected_submission_whose_descriptor_changed_is_discarded_not_fatal() {
        let table = EmptySubtreeTable::new(Profile::StarkEx.state_tree_height());
        let delta = vec![(3u64, LeafValue(vec![9]))];
        let trial = apply_updates(
            &FactStore::new(MemoryStorage::new()),
            &table,
            Profile::StarkEx,
            Profile::StarkEx.state_tree_height(),
            table.root(),
            delta.clone(),
        )
        .await
        .unwrap();

        let original = BatchDescriptor {
            batch_id: BatchId(0),
            reference_batch_id: ReferenceBatchId::Genesis,
            delta: delta.clone(),
            order_delta: vec![],
            prev_root: RootSet { state_root: table.root(), order_root: None },
            next_root: RootSet { state_root: trial.new_root, order_root: None },
        };
        let superseded = BatchDescriptor {
            batch_id: BatchId(0),
            reference_batch_id: ReferenceBatchId::Genesis,
            delta: vec![(3u64, LeafValue(vec![7]))],
            order_delta: vec![],
            prev_root: RootSet { state_root: table.root(), order_root: None },
            next_root: RootSet { state_root: Felt::from_u64(0xCAFE), order_root: None },
        };

        let call_count = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let count_for_gateway = call_count.clone();
        let mut gateway = MockGatewayClient::new();
        gateway.expect_get_batch_info().returning(move |_| {
            let n = count_for_gateway.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(Some(if n == 0 { original.clone() } else { superseded.clone() }))
        });
        gateway.expect_send_signature().times(1).returning(|_, _, _, _| {
            Err(GatewayClientError::Rejected("submission no longer matches chain state".into()))
        });

        let mut loop_ = CommitteeLoop::new(MemoryStorage::new(), gateway, mock_signer(), test_config());
        let progressed = loop_.step().await.unwrap();
        assert!(progressed);
        // Discarded, not committed: the cursor must not have advanced past the batch.
        assert_eq!(loop_.cursor().get_next_id().await.unwrap(), BatchId(0));
        assert!(!loop_.cursor().is_submitted(BatchId(0)).await.unwrap());
    }
}
