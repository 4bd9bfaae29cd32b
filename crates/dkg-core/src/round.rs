//! The node's protocol state, decoupled from chain I/O.
//!
//! [`Round`] is the thing §3's "Ownership" section describes as owned
//! exclusively by the Orchestrator's single logical task: every method here
//! is pure — no chain call, no subscription, no clock read — so the
//! Orchestrator (in `dkg-node`) is the only thing that ever talks to a
//! chain, and `Round` itself is fully exercised by the in-process tests
//! below.

use crate::{
    dealer::{combine, sanity_check_share, DealerStatus, DecryptedShareTable},
    dispute::PendingDispute,
    error::DkgError,
    participant::ParticipantSet,
    secret::LocalSecret,
    share_engine::{encrypt_share, verify_share, PrivatePolynomial},
};
use dkg_crypto::{Point, Scalar};
use rand::RngCore;

/// This node's own contribution for the round it is dealing: the Feldman
/// commitment vector to broadcast, and the per-recipient encrypted shares
/// (every participant except the dealer itself), keyed by 1-based index.
#[derive(Clone, Debug)]
pub struct OwnContribution {
    pub commitments: Vec<Point>,
    pub shares: Vec<(u32, Scalar)>,
}

pub struct Round {
    own_index: u32,
    own_secret: LocalSecret,
    threshold: usize,
    participants: ParticipantSet,
    table: DecryptedShareTable,
    own_poly: Option<PrivatePolynomial>,
    pending_disputes: Vec<PendingDispute>,
    ignore_invalid: bool,
}

impl Round {
    pub fn new(own_index: u32, own_secret: LocalSecret, participants: ParticipantSet) -> Self {
        let threshold = participants.threshold();
        Round {
            own_index,
            own_secret,
            threshold,
            participants,
            table: DecryptedShareTable::new(),
            own_poly: None,
            pending_disputes: Vec::new(),
            ignore_invalid: false,
        }
    }

    /// With `-ignore-invalid` (§6), an invalid broadcast is still recorded
    /// as `Excluded` locally so `combine()` stays well-defined, but no
    /// dispute is ever enqueued (§4.4).
    pub fn set_ignore_invalid(&mut self, ignore_invalid: bool) {
        self.ignore_invalid = ignore_invalid;
    }

    pub fn own_index(&self) -> u32 {
        self.own_index
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn participants(&self) -> &ParticipantSet {
        &self.participants
    }

    pub fn own_public_key(&self) -> Point {
        self.own_secret.public_key()
    }

    pub fn own_secret_scalar(&self) -> Scalar {
        self.own_secret.scalar()
    }

    /// Generates this node's own polynomial, commitments, and the encrypted
    /// shares for every other participant. `rogue` negates the first
    /// commitment before it is recorded or returned — the §4.3 test hook
    /// for exercising the dispute path end-to-end. Because the negation
    /// happens before this node records its own `Valid` entry, its local
    /// bookkeeping always matches exactly what it broadcasts.
    pub fn generate_own_contribution<R: RngCore>(
        &mut self,
        rogue: bool,
        rng: &mut R,
    ) -> OwnContribution {
        let poly = PrivatePolynomial::generate(self.threshold, rng);
        let mut commitments = poly.commit();
        if rogue {
            commitments[0] = commitments[0].neg();
        }

        let mut shares = Vec::with_capacity(self.participants.len().saturating_sub(1));
        for p in self.participants.iter() {
            if p.index == self.own_index {
                continue;
            }
            let enc = encrypt_share(&poly, self.own_secret.scalar(), &p.public_key, p.index);
            shares.push((p.index, enc));
        }

        self.table.set(
            self.own_index,
            DealerStatus::Valid {
                share: poly.share_for(self.own_index),
                commits: commitments.clone(),
            },
        );
        self.own_poly = Some(poly);

        OwnContribution { commitments, shares }
    }

    /// Processes a dealer's mined `broadcastShares` transaction. Returns
    /// `true` if the share verified. On failure the dealer is left
    /// `Pending` (unless `-ignore-invalid`, in which case it is excluded
    /// immediately) and — unless ignored — a [`PendingDispute`] is enqueued
    /// for the Orchestrator to drain once DistributionEnd is observed
    /// (§4.4: disputes are never filed ahead of that event).
    pub fn on_broadcast(
        &mut self,
        dealer_index: u32,
        dealer_pubkey: Point,
        commitments: Vec<Point>,
        encrypted_share_for_me: Scalar,
    ) -> bool {
        if dealer_index == self.own_index {
            // Already recorded by `generate_own_contribution`.
            return true;
        }

        match verify_share(
            dealer_index,
            &dealer_pubkey,
            self.own_index,
            self.own_secret.scalar(),
            self.threshold,
            &commitments,
            encrypted_share_for_me,
        ) {
            Ok(share) => {
                self.table.set(
                    dealer_index,
                    DealerStatus::Valid { share, commits: commitments },
                );
                true
            }
            Err(_) => {
                if self.ignore_invalid {
                    self.table.exclude(dealer_index);
                } else {
                    self.table.set(dealer_index, DealerStatus::Pending);
                    self.pending_disputes.push(PendingDispute {
                        dealer_index,
                        dealer_pubkey,
                        commitments,
                        alleged_share: encrypted_share_for_me,
                    });
                }
                false
            }
        }
    }

    /// Drains every dispute discovered since the last drain. Call exactly
    /// once, when DistributionEnd is observed.
    pub fn drain_pending_disputes(&mut self) -> Vec<PendingDispute> {
        std::mem::take(&mut self.pending_disputes)
    }

    /// Applies an on-chain `Exclusion(index)` event, or a locally-detected
    /// dispute-expiry. Idempotent (§8 property 6).
    pub fn on_exclusion(&mut self, dealer_index: u32) {
        self.table.exclude(dealer_index);
    }

    /// Applies every index the contract reports as an expired, unresolved
    /// dispute (§4.1 step 7).
    pub fn on_expired_disputes(&mut self, indices: &[u32]) {
        for &i in indices {
            self.on_exclusion(i);
        }
    }

    pub fn table(&self) -> &DecryptedShareTable {
        &self.table
    }

    /// This node's own recorded commitment vector, for constructing a
    /// `DefendShare` proof.
    pub fn own_commitments(&self) -> Option<&[Point]> {
        match self.table.get(self.own_index) {
            Some(DealerStatus::Valid { commits, .. }) => Some(commits),
            _ => None,
        }
    }

    /// The raw (unencrypted) share this node dealt to `recipient_index`,
    /// for constructing a `DefendShare` proof against a disputer.
    pub fn own_share_for(&self, recipient_index: u32) -> Option<Scalar> {
        self.own_poly.as_ref().map(|p| p.share_for(recipient_index))
    }

    /// Every participant's first commitment coefficient `C_d[0]`, ordered
    /// by participant index, for the `key_deriv` circuit's public inputs
    /// (§4.4). An unresolved or excluded dealer contributes the identity.
    pub fn first_coefficients_ordered(&self) -> Vec<Point> {
        self.participants
            .iter()
            .map(|p| match self.table.get(p.index) {
                Some(DealerStatus::Valid { commits, .. }) => commits[0],
                _ => Point::identity(),
            })
            .collect()
    }

    /// Combines every dealer's contribution into the master public key and
    /// this node's own combined share, and performs the local sanity check
    /// of §4.1 step 8 / §8 property 2. Fails only if this node's own
    /// bookkeeping is inconsistent — never due to a peer's misbehaviour,
    /// since an invalid/excluded dealer always contributes a well-defined
    /// identity/zero pair.
    pub fn finalize(&self) -> Result<(Point, Scalar), DkgError> {
        let (master_pk, own_share) = combine(&self.table, self.threshold);
        if !sanity_check_share(&self.table, self.own_index, self.threshold, own_share) {
            return Err(DkgError::ShareSanityCheckFailed);
        }
        Ok((master_pk, own_share))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dkg_crypto::{random_scalar, scalar_from_bytes_be};
    use rand::thread_rng;

    fn make_round(index: u32, sk: Scalar, participants: ParticipantSet) -> Round {
        Round::new(index, LocalSecret::new(sk), participants)
    }

    /// Scenario A (§8): three honest nodes, t=2, secrets 1/2/3. Every node's
    /// `finalize()` agrees on `master_pk = (1+2+3)*G`.
    #[test]
    fn three_honest_nodes_converge() {
        let mut rng = thread_rng();
        let secrets = [Scalar::from(1u64), Scalar::from(2u64), Scalar::from(3u64)];
        let pubkeys: Vec<Point> = secrets.iter().map(|s| Point::generator().mul_scalar(*s)).collect();

        let participants = ParticipantSet::new(
            (1u32..=3)
                .map(|i| crate::Participant::new(i, pubkeys[(i - 1) as usize]))
                .collect(),
            2,
        );

        let mut rounds: Vec<Round> = (1u32..=3)
            .map(|i| make_round(i, secrets[(i - 1) as usize], participants.clone()))
            .collect();

        let contributions: Vec<OwnContribution> = rounds
            .iter_mut()
            .map(|r| r.generate_own_contribution(false, &mut rng))
            .collect();

        // Every node processes every other dealer's broadcast.
        for (dealer_idx_zero, contribution) in contributions.iter().enumerate() {
            let dealer_index = (dealer_idx_zero + 1) as u32;
            let dealer_pubkey = pubkeys[dealer_idx_zero];
            for round in rounds.iter_mut() {
                if round.own_index() == dealer_index {
                    continue;
                }
                let (_, enc) = contribution
                    .shares
                    .iter()
                    .copied()
                    .find(|(idx, _)| *idx == round.own_index())
                    .unwrap();
                let ok = round.on_broadcast(
                    dealer_index,
                    dealer_pubkey,
                    contribution.commitments.clone(),
                    enc,
                );
                assert!(ok, "honest broadcast must verify");
            }
        }

        let results: Vec<(Point, Scalar)> =
            rounds.iter().map(|r| r.finalize().unwrap()).collect();

        let expected_pk = Point::generator().mul_scalar(Scalar::from(6u64));
        for (pk, _) in &results {
            assert_eq!(*pk, expected_pk);
        }
    }

    /// Scenario B (§8): node 2 broadcasts a negated `C[0]`. Nodes 1 and 3
    /// detect the mismatch and enqueue a dispute rather than failing
    /// outright; `combine()` still needs the disputed dealer resolved
    /// (here, by exclusion) to produce a well-defined master key.
    #[test]
    fn rogue_dealer_is_disputed_then_excluded() {
        let mut rng = thread_rng();
        let secrets = [Scalar::from(1u64), Scalar::from(2u64), Scalar::from(3u64)];
        let pubkeys: Vec<Point> = secrets.iter().map(|s| Point::generator().mul_scalar(*s)).collect();
        let participants = ParticipantSet::new(
            (1u32..=3)
                .map(|i| crate::Participant::new(i, pubkeys[(i - 1) as usize]))
                .collect(),
            2,
        );

        let mut rounds: Vec<Round> = (1u32..=3)
            .map(|i| make_round(i, secrets[(i - 1) as usize], participants.clone()))
            .collect();

        let contributions: Vec<OwnContribution> = rounds
            .iter_mut()
            .enumerate()
            .map(|(i, r)| r.generate_own_contribution(i == 1, &mut rng)) // node 2 (index 1) is rogue
            .collect();

        let mut disputes_filed = 0;
        for (dealer_idx_zero, contribution) in contributions.iter().enumerate() {
            let dealer_index = (dealer_idx_zero + 1) as u32;
            let dealer_pubkey = pubkeys[dealer_idx_zero];
            for round in rounds.iter_mut() {
                if round.own_index() == dealer_index {
                    continue;
                }
                let (_, enc) = contribution
                    .shares
                    .iter()
                    .copied()
                    .find(|(idx, _)| *idx == round.own_index())
                    .unwrap();
                let ok = round.on_broadcast(
                    dealer_index,
                    dealer_pubkey,
                    contribution.commitments.clone(),
                    enc,
                );
                if dealer_index == 2 {
                    assert!(!ok, "rogue broadcast must fail verification");
                } else {
                    assert!(ok);
                }
            }
        }

        for round in rounds.iter_mut() {
            if round.own_index() == 2 {
                continue;
            }
            let pending = round.drain_pending_disputes();
            assert_eq!(pending.len(), 1);
            assert_eq!(pending[0].dealer_index, 2);
            disputes_filed += 1;
            // Dispute lost (node 2 can't produce a valid defence): exclude.
            round.on_exclusion(2);
        }
        assert_eq!(disputes_filed, 2);

        for round in &rounds {
            if round.own_index() == 2 {
                continue;
            }
            let (pk, _) = round.finalize().unwrap();
            assert_eq!(pk, Point::generator().mul_scalar(Scalar::from(1u64 + 3u64)));
        }
    }

    /// Scenario C (§8): node 3 never broadcasts. Nodes 1 and 2 learn its
    /// index is an expired dispute (in practice, `expiredDisputes`) and
    /// exclude it; their shares for dealer 3 are zeroed.
    #[test]
    fn silent_dealer_is_excluded_via_expiry() {
        let mut rng = thread_rng();
        let secrets = [Scalar::from(1u64), Scalar::from(2u64), Scalar::from(3u64)];
        let pubkeys: Vec<Point> = secrets.iter().map(|s| Point::generator().mul_scalar(*s)).collect();
        let participants = ParticipantSet::new(
            (1u32..=3)
                .map(|i| crate::Participant::new(i, pubkeys[(i - 1) as usize]))
                .collect(),
            2,
        );

        let mut rounds: Vec<Round> = (1u32..=2)
            .map(|i| make_round(i, secrets[(i - 1) as usize], participants.clone()))
            .collect();

        let contributions: Vec<OwnContribution> = rounds
            .iter_mut()
            .map(|r| r.generate_own_contribution(false, &mut rng))
            .collect();

        for (dealer_idx_zero, contribution) in contributions.iter().enumerate() {
            let dealer_index = (dealer_idx_zero + 1) as u32;
            let dealer_pubkey = pubkeys[dealer_idx_zero];
            for round in rounds.iter_mut() {
                if round.own_index() == dealer_index {
                    continue;
                }
                let (_, enc) = contribution
                    .shares
                    .iter()
                    .copied()
                    .find(|(idx, _)| *idx == round.own_index())
                    .unwrap();
                assert!(round.on_broadcast(dealer_index, dealer_pubkey, contribution.commitments.clone(), enc));
            }
        }

        // Node 3 never broadcast: `expiredDisputes` reports it excluded.
        for round in rounds.iter_mut() {
            round.on_expired_disputes(&[3]);
        }

        for round in &rounds {
            let (pk, _) = round.finalize().unwrap();
            assert_eq!(pk, Point::generator().mul_scalar(Scalar::from(1u64 + 2u64)));
        }
    }

    #[test]
    fn config_roundtrip_scalar_from_bytes() {
        // A sanity cross-check that the config-loading helper in dkg-crypto
        // and `LocalSecret` agree on scalar encoding.
        let mut rng = thread_rng();
        let sk = random_scalar(&mut rng);
        let bytes = dkg_crypto::scalar_to_bytes_be(sk);
        assert_eq!(scalar_from_bytes_be(&bytes), sk);
    }
}
