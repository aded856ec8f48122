use dac_types::{Felt, LeafValue, Profile};
use starknet_crypto::pedersen_hash;

/// The application's Stark-friendly field hash, shared by the tree's internal nodes and
/// (with a fixed domain prefix) by the attestation signer (spec.md §4.6).
pub fn hash_node(left: Felt, right: Felt) -> Felt {
    Felt(pedersen_hash(&left.0, &right.0))
}

fn hash_single(value: Felt) -> Felt {
    Felt(pedersen_hash(&value.0, &Felt::ZERO.0))
}

/// Profile-defined leaf serialization: a value that already fits a field element is
/// taken verbatim; a composite (multi-field) leaf value is folded down to one field
/// element by Pedersen-chaining its 32-byte words (spec.md §3: "leaves are composite
/// structures serialized to a canonical byte form").
pub fn encode_leaf(profile: Profile, value: &LeafValue) -> Felt {
    let _ = profile; // both profiles share the same canonical encoding today.
    if value.0.len() <= 32 {
        return Felt::from_be_slice(&value.0).expect("<=32 bytes always fits a field element");
    }
    let mut acc = Felt::ZERO;
    for chunk in value.0.chunks(32) {
        let word = Felt::from_be_slice(chunk).unwrap_or(Felt::ZERO);
        acc = hash_node(acc, word);
    }
    acc
}

/// Content-address key of a leaf fact: `H(serialized leaf value)` (spec.md §3/§4.2).
pub fn hash_leaf_fact(leaf_felt: Felt) -> Felt {
    hash_single(leaf_felt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_leaf_is_identity_encoded() {
        let value = LeafValue(vec![1, 2, 3]);
        let encoded = encode_leaf(Profile::StarkEx, &value);
        assert_eq!(encoded, Felt::from_be_slice(&[1, 2, 3]).unwrap());
    }

    #[test]
    fn composite_leaf_is_folded() {
        let value = LeafValue(vec![7u8; 64]);
        let encoded = encode_leaf(Profile::Perpetual, &value);
        assert_ne!(encoded, Felt::ZERO);
    }

    #[test]
    fn node_hash_is_order_sensitive() {
        let a = Felt::from_u64(1);
        let b = Felt::from_u64(2);
        assert_ne!(hash_node(a, b), hash_node(b, a));
    }
}
