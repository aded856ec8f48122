use std::collections::{BTreeMap, HashMap};

use async_recursion::async_recursion;
use dac_fact_store::{Fact, FactStore};
use dac_storage::StorageAdapter;
use dac_types::{Delta, Felt, Index, LeafValue, Profile};

use crate::empty::EmptySubtreeTable;
use crate::error::{TreeError, TreeResult};
use crate::hash::{encode_leaf, hash_leaf_fact, hash_node};

/// Result of applying a batch of updates to one tree: the new root and every new fact
/// that must be persisted before the root may be returned to the caller (spec.md §4.3).
pub struct UpdateOutcome {
    pub new_root: Felt,
    pub new_facts: HashMap<Felt, Fact>,
}

/// Applies `updates` to the tree of the given `height` rooted at `old_root`. Pure aside
/// from reads through `store` for subtrees not covered by `updates`; the fact store is a
/// capability, not hidden state (spec.md §9 redesign hint).
///
/// Deduplicates by index (last write in input order wins), rejects out-of-range indices
/// before any I/O, and never fetches or writes a subtree unaffected by `updates`.
pub async fn apply_updates<S>(
    store: &FactStore<S>,
    empty_table: &EmptySubtreeTable,
    profile: Profile,
    height: u32,
    old_root: Felt,
    updates: Delta,
) -> TreeResult<UpdateOutcome>
where
    S: StorageAdapter + Sync + Send,
{
    let bound = 1u64 << height;
    // Dedup by index; a BTreeMap insert with later entries overwriting earlier ones
    // gives "last write wins" for free while also sorting by index.
    let mut deduped: BTreeMap<Index, Felt> = BTreeMap::new();
    for (index, value) in updates {
        if index >= bound {
            return Err(TreeError::InvalidIndex { index, height, bound });
        }
        deduped.insert(index, encode_leaf(profile, &value));
    }
    let sorted: Vec<(Index, Felt)> = deduped.into_iter().collect();

    let mut new_facts = HashMap::new();
    let new_root = update_subtree(
        store,
        empty_table,
        old_root,
        height,
        0,
        bound,
        &sorted,
        &mut new_facts,
    )
    .await?;

    Ok(UpdateOutcome { new_root, new_facts })
}

#[async_recursion]
async fn update_subtree<S>(
    store: &FactStore<S>,
    empty_table: &EmptySubtreeTable,
    node_hash: Felt,
    height: u32,
    lo: u64,
    hi: u64,
    updates: &[(Index, Felt)],
    new_facts: &mut HashMap<Felt, Fact>,
) -> TreeResult<Felt>
where
    S: StorageAdapter + Sync + Send,
{
    if updates.is_empty() {
        return Ok(node_hash);
    }

    if height == 0 {
        debug_assert_eq!(updates.len(), 1, "a leaf range must carry exactly one update");
        let (_, leaf_felt) = updates[0];
        let new_leaf_hash = hash_leaf_fact(leaf_felt);
        if new_leaf_hash != node_hash {
            new_facts.insert(new_leaf_hash, Fact::Leaf(LeafValue(leaf_felt.to_bytes_be().to_vec())));
        }
        return Ok(new_leaf_hash);
    }

    let mid = lo + (hi - lo) / 2;
    let split = updates.partition_point(|(index, _)| *index < mid);
    let (left_updates, right_updates) = updates.split_at(split);

    let (left_hash, right_hash) = if node_hash == empty_table.at(height) {
        let child_empty = empty_table.at(height - 1);
        (child_empty, child_empty)
    } else {
        store.get_node(node_hash, height).await?
    };

    let new_left =
        update_subtree(store, empty_table, left_hash, height - 1, lo, mid, left_updates, new_facts)
            .await?;
    let new_right = update_subtree(
        store,
        empty_table,
        right_hash,
        height - 1,
        mid,
        hi,
        right_updates,
        new_facts,
    )
    .await?;

    let new_hash = hash_node(new_left, new_right);
    if new_hash != node_hash {
        new_facts.insert(new_hash, Fact::Internal { left: new_left, right: new_right });
    }
    Ok(new_hash)
}

#[cfg(test)]
mod tests {
    use dac_storage::MemoryStorage;
    use dac_types::LeafValue;

    use super::*;

    fn store() -> FactStore<MemoryStorage> {
        FactStore::new(MemoryStorage::new())
    }

    #[tokio::test]
    async fn empty_batch_yields_empty_root_and_no_facts() {
        let store = store();
        let table = EmptySubtreeTable::new(4);
        let outcome =
            apply_updates(&store, &table, Profile::StarkEx, 4, table.root(), vec![]).await.unwrap();
        assert_eq!(outcome.new_root, table.root());
        assert!(outcome.new_facts.is_empty());
    }

    #[tokio::test]
    async fn single_update_writes_exactly_one_leaf_and_h_internal_facts() {
        let store = store();
        let table = EmptySubtreeTable::new(4);
        let outcome = apply_updates(
            &store,
            &table,
            Profile::StarkEx,
            4,
            table.root(),
            vec![(3, LeafValue(vec![1]))],
        )
        .await
        .unwrap();
        assert_ne!(outcome.new_root, table.root());
        // 1 leaf fact + 4 internal node facts on the path from leaf 3 to the root.
        assert_eq!(outcome.new_facts.len(), 5);
    }

    #[tokio::test]
    async fn later_duplicate_update_wins() {
        let store = store();
        let table = EmptySubtreeTable::new(4);
        let with_both = apply_updates(
            &store,
            &table,
            Profile::StarkEx,
            4,
            table.root(),
            vec![(3, LeafValue(vec![1])), (3, LeafValue(vec![2]))],
        )
        .await
        .unwrap();
        let with_final_only = apply_updates(
            &store,
            &table,
            Profile::StarkEx,
            4,
            table.root(),
            vec![(3, LeafValue(vec![2]))],
        )
        .await
        .unwrap();
        assert_eq!(with_both.new_root, with_final_only.new_root);
        assert_eq!(with_both.new_facts, with_final_only.new_facts);
    }

    #[tokio::test]
    async fn rewriting_same_value_is_a_no_op() {
        let store = store();
        let table = EmptySubtreeTable::new(4);
        let first = apply_updates(
            &store,
            &table,
            Profile::StarkEx,
            4,
            table.root(),
            vec![(3, LeafValue(vec![9]))],
        )
        .await
        .unwrap();
        store.put_facts(&first.new_facts).await.unwrap();

        let second = apply_updates(
            &store,
            &table,
            Profile::StarkEx,
            4,
            first.new_root,
            vec![(3, LeafValue(vec![9]))],
        )
        .await
        .unwrap();
        assert_eq!(second.new_root, first.new_root);
        assert!(second.new_facts.is_empty());
    }

    #[tokio::test]
    async fn out_of_range_index_is_rejected_before_any_io() {
        let store = store();
        let table = EmptySubtreeTable::new(4);
        let err = apply_updates(
            &store,
            &table,
            Profile::StarkEx,
            4,
            table.root(),
            vec![(16, LeafValue(vec![1]))],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, TreeError::InvalidIndex { index: 16, height: 4, bound: 16 }));
    }

    #[tokio::test]
    async fn disjoint_updates_share_untouched_sibling_hashes() {
        let store = store();
        let table = EmptySubtreeTable::new(4);
        let left_update = apply_updates(
            &store,
            &table,
            Profile::StarkEx,
            4,
            table.root(),
            vec![(1, LeafValue(vec![1]))],
        )
        .await
        .unwrap();
        store.put_facts(&left_update.new_facts).await.unwrap();

        let right_update = apply_updates(
            &store,
            &table,
            Profile::StarkEx,
            4,
            left_update.new_root,
            vec![(14, LeafValue(vec![2]))],
        )
        .await
        .unwrap();

        // The right_update's new facts must not re-derive anything on the left half's
        // path (indices 0..8), since that update only touches index 14.
        let left_half_internal = hash_node(
            hash_leaf_fact(Felt::from_be_slice(&[1]).unwrap()),
            table.at(0),
        );
        assert!(!right_update.new_facts.contains_key(&left_half_internal));
        assert_ne!(right_update.new_root, left_update.new_root);
    }
}
