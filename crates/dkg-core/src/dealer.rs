//! Per-dealer bookkeeping.
//!
//! The source this was distilled from tracked dealer validity with a mix of
//! zeroed points, negated commitments, and simply-missing map entries.
//! [`DealerStatus`] replaces all three with one discriminated enum so that
//! accumulation ([`combine`]) is total: every dealer index always has an
//! entry, and `Excluded` contributes the identity without a special case.

use dkg_crypto::{eval_commitments_at_index, Point, Scalar};
use std::collections::BTreeMap;

/// The state of a single dealer's contribution, from this node's point of
/// view.
#[derive(Clone, Debug)]
pub enum DealerStatus {
    /// Broadcast observed, not yet processed (or dispute outcome pending).
    Pending,
    /// Share decrypted and Feldman-verified.
    Valid { share: Scalar, commits: Vec<Point> },
    /// Dealer excluded (silent, disputed-and-lost, or abandoned). Contributes
    /// the scalar zero and the identity commitment vector.
    Excluded,
}

impl DealerStatus {
    fn contribution(&self, threshold: usize) -> (Scalar, Vec<Point>) {
        match self {
            DealerStatus::Valid { share, commits } => (*share, commits.clone()),
            DealerStatus::Excluded | DealerStatus::Pending => {
                (Scalar::from(0u64), vec![Point::identity(); threshold])
            }
        }
    }
}

/// Map from dealer index to this node's decrypted, verified share.
#[derive(Clone, Debug, Default)]
pub struct DecryptedShareTable(BTreeMap<u32, DealerStatus>);

/// Map from dealer index to that dealer's Feldman commitment vector.
/// Always paired with a [`DecryptedShareTable`] — the two tables are kept in
/// lock-step because they're built from the same `DealerStatus` per dealer.
pub type CommitmentTable = DecryptedShareTable;

impl DecryptedShareTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, dealer_index: u32, status: DealerStatus) {
        self.0.insert(dealer_index, status);
    }

    pub fn get(&self, dealer_index: u32) -> Option<&DealerStatus> {
        self.0.get(&dealer_index)
    }

    /// Marks a dealer excluded. Idempotent: re-applying to an already
    /// excluded dealer is a no-op, and applying after a `Valid` entry
    /// downgrades it (an exclusion observed on chain always wins, since the
    /// contract's exclusion decision is authoritative over this node's
    /// local bookkeeping).
    pub fn exclude(&mut self, dealer_index: u32) {
        self.0.insert(dealer_index, DealerStatus::Excluded);
    }

    pub fn is_excluded(&self, dealer_index: u32) -> bool {
        matches!(self.0.get(&dealer_index), Some(DealerStatus::Excluded))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &DealerStatus)> {
        self.0.iter().map(|(k, v)| (*k, v))
    }
}

/// Combines every dealer's contribution into the master public key and this
/// node's own combined share: `master_public_key = Σ_d C_d[0]`,
/// `own_share = Σ_d dec[d]`. Total over `DealerStatus`: a `Pending` or
/// `Excluded` dealer contributes the identity and zero, so a caller that
/// forgot to resolve every dealer to `Valid`/`Excluded` still gets a
/// well-defined (if wrong) answer rather than a missing-entry error.
pub fn combine(table: &DecryptedShareTable, threshold: usize) -> (Point, Scalar) {
    let mut master_pk = Point::identity();
    let mut own_share = Scalar::from(0u64);
    for (_, status) in table.iter() {
        let (share, commits) = status.contribution(threshold);
        master_pk = master_pk.add(&commits[0]);
        own_share += share;
    }
    (master_pk, own_share)
}

/// The local sanity check of §4.1 step 8 / §8 property 2:
/// `Σ_d C_d(own_index) == own_combined_share · G`. Unlike [`combine`], which
/// only ever looks at `C_d[0]` (the master public key's contribution), this
/// evaluates every dealer's full commitment vector at `own_index` — a
/// dealer whose `C[0]` is correct but whose higher coefficients don't match
/// the share it actually dealt would pass `combine` but fail this check.
pub fn sanity_check_share(
    table: &DecryptedShareTable,
    own_index: u32,
    threshold: usize,
    own_share: Scalar,
) -> bool {
    let mut expected = Point::identity();
    for (_, status) in table.iter() {
        let (_, commits) = status.contribution(threshold);
        expected = expected.add(&eval_commitments_at_index(&commits, own_index));
    }
    expected == Point::generator().mul_scalar(own_share)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusion_is_idempotent() {
        let mut table = DecryptedShareTable::new();
        table.set(
            1,
            DealerStatus::Valid {
                share: Scalar::from(5u64),
                commits: vec![Point::generator()],
            },
        );
        table.exclude(1);
        let (pk1, share1) = combine(&table, 1);
        table.exclude(1);
        let (pk2, share2) = combine(&table, 1);
        assert_eq!(pk1, pk2);
        assert_eq!(share1, share2);
        assert!(table.is_excluded(1));
    }

    #[test]
    fn excluded_dealer_contributes_identity() {
        let mut table = DecryptedShareTable::new();
        table.set(
            1,
            DealerStatus::Valid {
                share: Scalar::from(3u64),
                commits: vec![Point::generator().mul_scalar(Scalar::from(3u64))],
            },
        );
        table.exclude(2);
        let (master_pk, own_share) = combine(&table, 1);
        assert_eq!(master_pk, Point::generator().mul_scalar(Scalar::from(3u64)));
        assert_eq!(own_share, Scalar::from(3u64));
    }

    #[test]
    fn sanity_check_passes_for_consistent_share() {
        use dkg_crypto::eval_commitments_at_index;

        let commits = vec![
            Point::generator().mul_scalar(Scalar::from(7u64)),
            Point::generator().mul_scalar(Scalar::from(2u64)),
        ];
        let own_index = 3;
        let own_share = eval_commitments_at_index(&commits, own_index);
        // We only have the commitment side here, so fabricate a scalar whose
        // image under `G` matches by reusing the evaluated point's scalar
        // multiple indirectly: construct a table with a single dealer whose
        // share is the discrete log of `own_share`, i.e. 7 + 2*(own_index-1).
        let share_scalar = Scalar::from(7u64) + Scalar::from(2u64) * Scalar::from(own_index - 1);
        assert_eq!(Point::generator().mul_scalar(share_scalar), own_share);

        let mut table = DecryptedShareTable::new();
        table.set(1, DealerStatus::Valid { share: share_scalar, commits });
        assert!(sanity_check_share(&table, own_index, 2, share_scalar));
        assert!(!sanity_check_share(&table, own_index, 2, share_scalar + Scalar::from(1u64)));
    }
}
