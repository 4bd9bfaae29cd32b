use dkg_crypto::Point;
use serde::{Deserialize, Serialize};

/// A peer in the DKG round, immutable once collected from the contract's
/// participant list.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Participant {
    /// 1-based position in the group, as assigned by the contract.
    pub index: u32,
    pub public_key: Point,
}

impl Participant {
    pub fn new(index: u32, public_key: Point) -> Self {
        assert!(index >= 1, "participant indices are 1-based");
        Participant { index, public_key }
    }
}

/// The full set of participants for a round, plus the contract-reported
/// threshold. Built once, after the RegistrationEnd event, and never
/// mutated afterwards.
#[derive(Clone, Debug)]
pub struct ParticipantSet {
    participants: Vec<Participant>,
    threshold: usize,
}

impl ParticipantSet {
    pub fn new(participants: Vec<Participant>, threshold: usize) -> Self {
        ParticipantSet {
            participants,
            threshold,
        }
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter()
    }

    pub fn get(&self, index: u32) -> Option<&Participant> {
        self.participants.iter().find(|p| p.index == index)
    }

    pub fn index_of(&self, public_key: &Point) -> Option<u32> {
        self.participants
            .iter()
            .find(|p| &p.public_key == public_key)
            .map(|p| p.index)
    }
}
