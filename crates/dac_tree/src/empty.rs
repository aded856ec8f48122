use dac_types::Felt;

use crate::hash::{hash_leaf_fact, hash_node};

/// Precomputed empty-subtree hashes, indexed by height (`table[0]` is the empty leaf's
/// fact hash, `table[H]` is the empty tree's root). Built once at construction and
/// shared immutably; unreferenced subtrees resolve to these constants without I/O
/// (spec.md §4.3).
#[derive(Clone, Debug)]
pub struct EmptySubtreeTable {
    levels: Vec<Felt>,
}

impl EmptySubtreeTable {
    pub fn new(height: u32) -> Self {
        let mut levels = Vec::with_capacity(height as usize + 1);
        levels.push(hash_leaf_fact(Felt::ZERO));
        for h in 1..=height {
            let prev = levels[h as usize - 1];
            levels.push(hash_node(prev, prev));
        }
        Self { levels }
    }

    pub fn at(&self, height: u32) -> Felt {
        self.levels[height as usize]
    }

    pub fn root(&self) -> Felt {
        *self.levels.last().expect("table always has at least the leaf level")
    }
}
