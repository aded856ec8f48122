use serde::{Deserialize, Serialize};

use crate::felt::Felt;

/// Selects the leaf serialization, tree heights, and auxiliary roots a committee node
/// signs over. Fixed in code rather than read from an operator-supplied schema (open
/// question in spec.md §9 — there is no such schema feed in this implementation).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    StarkEx,
    Perpetual,
}

impl Profile {
    /// Height of the primary account-state tree.
    pub const fn state_tree_height(self) -> u32 {
        match self {
            Profile::StarkEx => 31,
            Profile::Perpetual => 64,
        }
    }

    /// Height of the auxiliary order tree, if this profile carries one.
    pub const fn order_tree_height(self) -> Option<u32> {
        match self {
            Profile::StarkEx => None,
            Profile::Perpetual => Some(64),
        }
    }

    /// The roots included in the signed attestation message, in the order they must
    /// appear (see dac_signer). `stark_ex` signs the state root alone; `perpetual` also
    /// binds the order-tree root.
    pub fn signed_roots(self, state_root: Felt, order_root: Option<Felt>) -> Vec<Felt> {
        match self {
            Profile::StarkEx => vec![state_root],
            Profile::Perpetual => {
                vec![state_root, order_root.expect("perpetual profile requires an order root")]
            }
        }
    }
}
