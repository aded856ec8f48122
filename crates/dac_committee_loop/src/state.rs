use dac_types::BatchId;

/// The committee loop's state machine (spec.md §4.7: `IDLE → FETCHING → APPLYING →
/// SIGNING → SUBMITTING → COMMITTED → IDLE`, plus `REORG_REWIND` and `FATAL`). Named one
/// variant per state so an external observer of `CommitteeLoop::state()` can tell "about
/// to fetch" from "computing a tree" from "mid-reorg-rewind" (spec.md §2: the loop
/// "reports liveness... via structured logs" keyed on this state). A clean shutdown is
/// only honored in `Idle` or `Committed`; if interrupted mid-`Submitting`, restart
/// re-enters `Submitting` for the same batch and re-signs deterministically rather than
/// skipping it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Fetching,
    ReorgRewind(BatchId),
    Applying(BatchId),
    Signing(BatchId),
    Submitting(BatchId),
    Committed(BatchId),
    Fatal(String),
}
