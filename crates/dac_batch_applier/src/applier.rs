use std::collections::HashMap;

use dac_fact_store::{Fact, FactStore};
use dac_storage::StorageAdapter;
use dac_tree::{apply_updates, EmptySubtreeTable};
use dac_types::{BatchDescriptor, Felt, Profile, ReferenceBatchId, RootSet};

use crate::error::{BatchApplierError, BatchApplierResult};

#[derive(Clone, Copy, Debug)]
pub struct BatchApplierConfig {
    pub max_delta_size: usize,
}

/// Computed roots plus every new fact the caller must persist (via `FactStore::put_facts`)
/// before it may treat `roots` as committed. `apply` itself never writes (spec.md §4.4:
/// "the batch applier does not write the root pointer; that is the loop's commit step").
pub struct AppliedBatch {
    pub roots: RootSet,
    pub new_facts: HashMap<Felt, Fact>,
}

/// Validates `descriptor` against the reference state and recomputes its declared roots.
///
/// `reference_roots` must be `None` exactly when `descriptor.reference_batch_id` is
/// [`ReferenceBatchId::Genesis`], and otherwise the roots the caller already resolved for
/// that reference batch (typically its own last-committed root pointer). The caller owns
/// storage lookups; this function is a pure computation over the inputs it's given.
pub async fn apply<S>(
    store: &FactStore<S>,
    empty_state_table: &EmptySubtreeTable,
    empty_order_table: Option<&EmptySubtreeTable>,
    profile: Profile,
    config: BatchApplierConfig,
    reference_roots: Option<RootSet>,
    descriptor: &BatchDescriptor,
) -> BatchApplierResult<AppliedBatch>
where
    S: StorageAdapter,
{
    let total_delta_size = descriptor.delta.len() + descriptor.order_delta.len();
    if total_delta_size > config.max_delta_size {
        return Err(BatchApplierError::DeltaTooLarge { size: total_delta_size, max: config.max_delta_size });
    }

    let expected_prev = match (descriptor.reference_batch_id, reference_roots) {
        (ReferenceBatchId::Genesis, None) => RootSet {
            state_root: empty_state_table.root(),
            order_root: empty_order_table.map(EmptySubtreeTable::root),
        },
        (ReferenceBatchId::Batch(_), Some(roots)) => roots,
        _ => {
            return Err(BatchApplierError::ReferenceRootMismatch {
                reference_batch_id: descriptor.reference_batch_id,
                expected: RootSet { state_root: Felt::ZERO, order_root: None },
                declared: descriptor.prev_root.clone(),
            });
        }
    };
    if expected_prev != descriptor.prev_root {
        return Err(BatchApplierError::ReferenceRootMismatch {
            reference_batch_id: descriptor.reference_batch_id,
            expected: expected_prev,
            declared: descriptor.prev_root.clone(),
        });
    }

    let mut new_facts = HashMap::new();

    let state_outcome = apply_updates(
        store,
        empty_state_table,
        profile,
        profile.state_tree_height(),
        expected_prev.state_root,
        descriptor.delta.clone(),
    )
    .await?;
    if state_outcome.new_root != descriptor.next_root.state_root {
        return Err(BatchApplierError::RootMismatch {
            batch_id: descriptor.batch_id,
            tree: "state",
            computed: state_outcome.new_root,
            declared: descriptor.next_root.state_root,
        });
    }
    new_facts.extend(state_outcome.new_facts);

    let order_root = match (empty_order_table, descriptor.next_root.order_root) {
        (None, Some(_)) => return Err(BatchApplierError::UnexpectedOrderRoot(descriptor.batch_id)),
        (Some(_), None) => return Err(BatchApplierError::MissingOrderRoot(descriptor.batch_id)),
        (None, None) => None,
        (Some(empty_order_table), Some(declared_order_root)) => {
            let order_outcome = apply_updates(
                store,
                empty_order_table,
                profile,
                profile.order_tree_height().expect("order tree present implies a height"),
                expected_prev.order_root.unwrap_or_else(|| empty_order_table.root()),
                descriptor.order_delta.clone(),
            )
            .await?;
            if order_outcome.new_root != declared_order_root {
                return Err(BatchApplierError::RootMismatch {
                    batch_id: descriptor.batch_id,
                    tree: "order",
                    computed: order_outcome.new_root,
                    declared: declared_order_root,
                });
            }
            new_facts.extend(order_outcome.new_facts);
            Some(order_outcome.new_root)
        }
    };

    Ok(AppliedBatch { roots: RootSet { state_root: state_outcome.new_root, order_root }, new_facts })
}
