// gate.rs
use crate::models::{LightId, LightStatusSnapshot};

/// Whether a state-changing call against `id` may go out: the light must be
/// in the snapshot and reported reachable.
pub fn permits(snapshot: &LightStatusSnapshot, id: &LightId) -> bool {
    snapshot.get(id).is_some_and(|record| record.reachable)
}
