use dac_types::{BatchId, Felt};
use starknet_crypto::pedersen_hash;

/// Domain tag separating attestation messages from any other Pedersen-hashed structure
/// in this system (the tree's node hashes in particular — dac_tree::hash_node).
const ATTESTATION_DOMAIN: &str = "DAC_ATTESTATION";

/// Binds the signed message to exactly one batch and its declared roots, in order. Two
/// batches that happen to produce the same roots still sign distinct messages because
/// `batch_id` is folded in first.
pub fn attestation_message_hash(batch_id: BatchId, roots: &[Felt]) -> Felt {
    let domain = Felt::from_be_slice(ATTESTATION_DOMAIN.as_bytes())
        .expect("domain tag fits in 32 bytes");
    let mut acc = pedersen_hash(&domain.0, &Felt::from_u64(batch_id.0).0);
    for root in roots {
        acc = pedersen_hash(&acc, &root.0);
    }
    Felt(acc)
}
