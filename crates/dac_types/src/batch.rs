use serde::{Deserialize, Serialize};

use crate::felt::Felt;

/// Monotonically assigned, non-negative batch identifier. Not guaranteed to be dense or
/// monotonic after a reorg (spec.md §3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BatchId(pub u64);

impl BatchId {
    pub fn next(self) -> BatchId {
        BatchId(self.0 + 1)
    }

    pub fn prev(self) -> Option<BatchId> {
        self.0.checked_sub(1).map(BatchId)
    }
}

impl std::fmt::Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The predecessor a batch's delta is applied to. Replaces the wire-level `-1` sentinel
/// with an explicit sum type (spec.md §9 redesign hint), while still round-tripping to
/// `-1` on the wire for gateway compatibility.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReferenceBatchId {
    /// The empty initial state; no prior batch exists.
    Genesis,
    Batch(BatchId),
}

impl Serialize for ReferenceBatchId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ReferenceBatchId::Genesis => serializer.serialize_i64(-1),
            ReferenceBatchId::Batch(id) => serializer.serialize_i64(
                i64::try_from(id.0).map_err(serde::ser::Error::custom)?,
            ),
        }
    }
}

impl<'de> Deserialize<'de> for ReferenceBatchId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        match raw {
            -1 => Ok(ReferenceBatchId::Genesis),
            n if n >= 0 => Ok(ReferenceBatchId::Batch(BatchId(n as u64))),
            other => Err(serde::de::Error::custom(format!(
                "reference_batch_id must be -1 or non-negative, got {other}"
            ))),
        }
    }
}

/// An index into a fixed-height tree, in `[0, 2^H)`.
pub type Index = u64;

/// An opaque, profile-serialized leaf value. Interpretation (and conversion to a field
/// element) is owned by the tree layer, which knows the active profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafValue(pub Vec<u8>);

impl LeafValue {
    pub fn empty() -> Self {
        LeafValue(Vec::new())
    }
}

/// An ordered sequence of index/value pairs; later entries overwrite earlier ones at the
/// same index within a batch (spec.md §3).
pub type Delta = Vec<(Index, LeafValue)>;

/// The operator-declared roots before and after applying a batch's delta, plus whatever
/// auxiliary roots the active profile carries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootSet {
    pub state_root: Felt,
    pub order_root: Option<Felt>,
}

/// An immutable, operator-published batch descriptor (spec.md §3).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchDescriptor {
    pub batch_id: BatchId,
    pub reference_batch_id: ReferenceBatchId,
    pub delta: Delta,
    /// Delta for the auxiliary order tree, if the active profile carries one.
    pub order_delta: Delta,
    pub prev_root: RootSet,
    pub next_root: RootSet,
}
