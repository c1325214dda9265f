use crate::detector::Detection;
use crate::tracking::{PersonId, TrackedPerson};
use std::collections::BTreeMap;

/// Maps one tick's detections to person identities.
///
/// Must return one id per detection, in detection order. Identities missing
/// from the result are dropped by the tracker after the tick.
pub trait IdentityAssigner: Send + std::fmt::Debug {
    fn assign(
        &mut self,
        detections: &[Detection],
        tracked: &BTreeMap<PersonId, TrackedPerson>,
    ) -> Vec<PersonId>;
}

/// Identity is the 1-based slot of the detection in the batch.
///
/// Two faces swapping positions between frames swap histories.
#[derive(Debug, Default, Clone, Copy)]
pub struct PositionalAssigner;

impl IdentityAssigner for PositionalAssigner {
    fn assign(
        &mut self,
        detections: &[Detection],
        _tracked: &BTreeMap<PersonId, TrackedPerson>,
    ) -> Vec<PersonId> {
        (1..=detections.len()).map(|slot| slot as PersonId).collect()
    }
}
