//! Dispute Manager: decides when to dispute or defend, and builds the exact
//! public-input vectors the on-chain `poly_eval`/`key_deriv` circuits
//! expect. The ordering here is a wire-level contract with the verifier
//! circuit — reordering any field breaks on-chain verification, so every
//! field is pushed in the order written down in the module docs below
//! rather than built up via a generic/derive mechanism that could silently
//! reorder a struct's fields.

use dkg_crypto::{
    scalar_to_base_field, scalar_to_bytes_be, truncated_hash_to_base_field, Fq, Point, Scalar,
};

/// A dealer whose broadcast looked invalid during Distribution. The source
/// this was distilled from captured a closure over a channel to fire the
/// dispute once DistributionEnd arrived; the equivalent here is a plain
/// record the Orchestrator enqueues and drains once that event is observed,
/// preserving the contract's phase ordering (disputes are never filed
/// early).
#[derive(Clone, Debug)]
pub struct PendingDispute {
    pub dealer_index: u32,
    pub dealer_pubkey: Point,
    pub commitments: Vec<Point>,
    pub alleged_share: Scalar,
}

/// Builds the `poly_eval` public-input vector for `disputeShare`, in the
/// exact order required by the circuit. Every element is an `Fq` — the
/// circuit's field, `r` — not a BabyJubJub `Scalar` (`l < r`): `own_secret`
/// and `alleged_share` are widened losslessly into `Fq` via
/// [`scalar_to_base_field`], commitment/public-key coordinates are already
/// `Fq` and pass straight through, and the hash is computed directly in
/// `Fq` by [`truncated_hash_to_base_field`].
///
/// 1. `t` commitment points as `(x, y)` pairs — `2t` field elements.
/// 2. own `LocalSecret` as a field element.
/// 3. own public key as `(x, y)`.
/// 4. disputer's (own) public key as `(x, y)`.
/// 5. dealer's public key as `(x, y)`.
/// 6. disputer index as a field element.
/// 7. alleged encrypted share `f_ie` as a field element.
/// 8. the truncated-Keccak256 hash described below.
pub fn dispute_share_inputs(
    commitments: &[Point],
    own_secret: Scalar,
    own_pubkey: &Point,
    dealer_pubkey: &Point,
    disputer_index: u32,
    alleged_share: Scalar,
    stored_commitments_hash: &[u8; 32],
) -> Vec<Fq> {
    let mut inputs = Vec::with_capacity(commitments.len() * 2 + 8);

    for c in commitments {
        push_xy(&mut inputs, c);
    }
    inputs.push(scalar_to_base_field(own_secret));
    push_xy(&mut inputs, own_pubkey);
    push_xy(&mut inputs, own_pubkey); // disputer == own, per the resolved layout
    push_xy(&mut inputs, dealer_pubkey);
    inputs.push(Fq::from(disputer_index));
    inputs.push(scalar_to_base_field(alleged_share));
    inputs.push(truncated_hash_to_base_field(&dispute_hash_preimage(
        stored_commitments_hash,
        own_pubkey,
        dealer_pubkey,
        disputer_index,
        alleged_share,
    )));
    inputs
}

/// `DefendShare` proves correct derivation of the same `f_d(disputer_index-1)`
/// share for a disputer; the input layout is the same `poly_eval` vector,
/// just reconstructed from this node's own commitments and polynomial
/// rather than from a received broadcast.
pub fn defend_share_inputs(
    commitments: &[Point],
    own_secret: Scalar,
    own_pubkey: &Point,
    disputer_pubkey: &Point,
    disputer_index: u32,
    share_for_disputer: Scalar,
    stored_commitments_hash: &[u8; 32],
) -> Vec<Fq> {
    dispute_share_inputs(
        commitments,
        own_secret,
        own_pubkey,
        disputer_pubkey,
        disputer_index,
        share_for_disputer,
        stored_commitments_hash,
    )
}

/// Builds the `key_deriv` public-input vector for `submitPublicKey`: every
/// participant's first commitment coefficient `C_d[0]` as `(x, y)` (ordered
/// by participant index), the truncated hash of their concatenated 32-byte
/// marshals, and the submitted master public key as `(x, y)`. Every element
/// is `Fq`, per [`dispute_share_inputs`]'s field note.
pub fn submit_public_key_inputs(
    first_coefficients: &[Point],
    master_pk: &Point,
) -> Vec<Fq> {
    let mut inputs = Vec::with_capacity(first_coefficients.len() * 2 + 3);
    for c in first_coefficients {
        push_xy(&mut inputs, c);
    }
    let mut preimage = Vec::with_capacity(first_coefficients.len() * 32);
    for c in first_coefficients {
        preimage.extend_from_slice(&c.to_compressed());
    }
    inputs.push(truncated_hash_to_base_field(&preimage));
    push_xy(&mut inputs, master_pk);
    inputs
}

/// `x`/`y` already live in `Fq`, the curve's base field and the circuit's
/// public-input field, so this pushes them through unchanged — no folding
/// into `Scalar` (the smaller BabyJubJub subgroup order) involved.
fn push_xy(inputs: &mut Vec<Fq>, p: &Point) {
    let (x, y) = p.affine_xy();
    inputs.push(x);
    inputs.push(y);
}

fn dispute_hash_preimage(
    stored_commitments_hash: &[u8; 32],
    own_pubkey: &Point,
    dealer_pubkey: &Point,
    disputer_index: u32,
    alleged_share: Scalar,
) -> Vec<u8> {
    let mut preimage = Vec::with_capacity(32 * 5);
    preimage.extend_from_slice(stored_commitments_hash);
    preimage.extend_from_slice(&own_pubkey.to_compressed());
    preimage.extend_from_slice(&dealer_pubkey.to_compressed());
    let mut index_word = [0u8; 32];
    index_word[24..].copy_from_slice(&(disputer_index as u64).to_be_bytes());
    preimage.extend_from_slice(&index_word);
    preimage.extend_from_slice(&scalar_to_bytes_be(alleged_share));
    preimage
}

#[cfg(test)]
mod tests {
    use super::*;
    use dkg_crypto::random_scalar;
    use rand::thread_rng;

    #[test]
    fn dispute_inputs_are_deterministic() {
        let mut rng = thread_rng();
        let commits = vec![Point::generator(); 3];
        let own_sk = random_scalar(&mut rng);
        let own_pk = Point::generator().mul_scalar(own_sk);
        let dealer_pk = Point::generator().mul_scalar(random_scalar(&mut rng));
        let hash = [7u8; 32];

        let a = dispute_share_inputs(&commits, own_sk, &own_pk, &dealer_pk, 3, Scalar::from(9u64), &hash);
        let b = dispute_share_inputs(&commits, own_sk, &own_pk, &dealer_pk, 3, Scalar::from(9u64), &hash);
        assert_eq!(a, b);
        // 2t commitment field elements + secret + own*2 + disputer*2 + dealer*2 + index + share + hash
        assert_eq!(a.len(), 2 * 3 + 1 + 2 + 2 + 2 + 1 + 1 + 1);
    }

    #[test]
    fn commitment_coordinates_survive_into_fq_unreduced() {
        // A regression guard for the Fq/Scalar field mix-up: the pushed
        // coordinate must be the point's actual Fq coordinate, not that
        // coordinate folded down into the (smaller) Scalar field and back.
        let mut rng = thread_rng();
        let p = Point::generator().mul_scalar(random_scalar(&mut rng));
        let (x, y) = p.affine_xy();
        let mut inputs = Vec::new();
        push_xy(&mut inputs, &p);
        assert_eq!(inputs, vec![x, y]);
    }

    #[test]
    fn key_deriv_inputs_length() {
        let coeffs = vec![Point::generator(); 4];
        let master_pk = Point::generator();
        let inputs = submit_public_key_inputs(&coeffs, &master_pk);
        assert_eq!(inputs.len(), 4 * 2 + 1 + 2);
    }
}
