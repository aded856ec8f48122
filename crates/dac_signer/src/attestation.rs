use dac_types::{BatchId, Felt};
use serde::{Deserialize, Serialize};

/// A committee member's signed claim that it holds the data underlying `next_root` for
/// `batch_id`. `roots` is the profile-ordered list the signature actually covers
/// (dac_types::Profile::signed_roots) so a verifier never has to guess the profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation {
    pub batch_id: BatchId,
    pub roots: Vec<Felt>,
    pub signature: Signature,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub r: Felt,
    pub s: Felt,
}
