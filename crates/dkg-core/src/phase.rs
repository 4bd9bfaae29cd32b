//! The node's shadow phase machine and the re-armable dispute deadline.
//!
//! The authoritative phase machine lives in the contract; this is a local
//! replica. Every transition here is driven by an observed contract event —
//! local timers only gate optional actions (filing a dispute, re-reading the
//! phase end) and never force a transition by themselves.

use std::time::{Duration, Instant};

/// Small buffer added to a contract-reported deadline to absorb clock skew
/// and block-propagation delay before the local timer fires.
pub const DEADLINE_BUFFER: Duration = Duration::from_secs(2);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhaseState {
    NotStarted,
    Registering,
    AwaitingRegistrationEnd,
    Distributing,
    AwaitingDistributionEnd,
    Disputing,
    DisputeDeadlinePending,
    Submitting,
    Done,
    Aborted,
}

impl PhaseState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PhaseState::Done | PhaseState::Aborted)
    }
}

/// A wall-clock deadline derived from the contract's phase-end timestamp
/// plus [`DEADLINE_BUFFER`]. Re-armable: each observed dispute event during
/// the Dispute phase extends it to the contract's newly reported end.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    /// `phase_end_unix` is the contract's phase-end timestamp; `now_unix` is
    /// the caller's notion of current on-chain time, both in seconds. The
    /// returned deadline is anchored to the local `Instant` clock so the
    /// timer can be awaited without re-querying the chain.
    pub fn from_phase_end(phase_end_unix: u64, now_unix: u64) -> Self {
        let remaining = phase_end_unix.saturating_sub(now_unix);
        Deadline {
            at: Instant::now() + Duration::from_secs(remaining) + DEADLINE_BUFFER,
        }
    }

    pub fn instant(&self) -> Instant {
        self.at
    }

    pub fn has_elapsed(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Re-arms the deadline to a newly reported phase end, as happens every
    /// time a DisputeShare event is observed during the Dispute phase.
    pub fn extend_to(&mut self, phase_end_unix: u64, now_unix: u64) {
        *self = Self::from_phase_end(phase_end_unix, now_unix);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_moves_the_deadline_forward() {
        let mut d = Deadline::from_phase_end(100, 0);
        let first = d.instant();
        d.extend_to(200, 0);
        assert!(d.instant() > first);
    }

    #[test]
    fn terminal_states() {
        assert!(PhaseState::Done.is_terminal());
        assert!(PhaseState::Aborted.is_terminal());
        assert!(!PhaseState::Disputing.is_terminal());
    }
}
