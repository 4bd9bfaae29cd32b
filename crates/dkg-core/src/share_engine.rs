//! Generation and verification of Feldman-committed Shamir shares, and the
//! additive Poseidon-keyed encryption used to carry them on chain.
//!
//! `generate`/`verify` correspond directly to §4.3 of the protocol: this
//! module does not know about the contract, events, or phases — it is
//! invoked as pure functions against state the Orchestrator owns.

use crate::error::ShareError;
use dkg_crypto::{eval_commitments_at_index, pre_shared_key, Point, Poly, Scalar};
use rand::RngCore;

#[cfg(test)]
use dkg_crypto::random_scalar;

/// This node's degree-`(t-1)` polynomial for the round it is dealing.
/// Retained only until its own share is derived; never leaves the process.
/// Zeroized on drop.
pub struct PrivatePolynomial(Poly);

impl PrivatePolynomial {
    /// Picks a uniformly random secret and the `t-1` higher coefficients.
    pub fn generate<R: RngCore>(t: usize, rng: &mut R) -> Self {
        PrivatePolynomial(Poly::random(t, rng))
    }

    pub fn secret(&self) -> Scalar {
        self.0.secret()
    }

    /// The public Feldman commitment vector for this polynomial, `[a_k * G]`.
    pub fn commit(&self) -> Vec<Point> {
        self.0.commit()
    }

    /// The raw (unencrypted) share for a 1-based recipient index, `f(j-1)`.
    pub fn share_for(&self, recipient_index: u32) -> Scalar {
        self.0.eval_at_index(recipient_index).value
    }
}

impl Drop for PrivatePolynomial {
    fn drop(&mut self) {
        self.0.zero_out();
    }
}

/// Encrypts a raw share for transmission: `f(j-1) + PSK(j)`, where
/// `PSK(j) = Poseidon(DH(sk, pk_j).x, C_0.x)`.
pub fn encrypt_share(
    poly: &PrivatePolynomial,
    own_sk: Scalar,
    recipient_pk: &Point,
    recipient_index: u32,
) -> Scalar {
    let c0 = poly.commit()[0];
    let psk = pre_shared_key(own_sk, recipient_pk, &c0);
    poly.share_for(recipient_index) + psk
}

/// Verifies and decrypts a share received from dealer `d`.
///
/// Checks, in order: the commitment vector has the expected length, the
/// dealer's share decrypts and satisfies the Feldman equality
/// `f_d(own_index-1) * G == Σ_k (own_index-1)^k * C_k`. Any failure is
/// reported as the share being invalid — this check never panics on
/// attacker-controlled input.
pub fn verify_share(
    dealer_index: u32,
    dealer_pk: &Point,
    own_index: u32,
    own_sk: Scalar,
    expected_threshold: usize,
    commitments: &[Point],
    encrypted_share: Scalar,
) -> Result<Scalar, ShareError> {
    if commitments.len() != expected_threshold {
        return Err(ShareError::WrongCommitmentLength(
            dealer_index,
            commitments.len(),
            expected_threshold,
        ));
    }

    let psk = pre_shared_key(own_sk, dealer_pk, &commitments[0]);
    let decrypted = encrypted_share - psk;

    let expected = Point::generator().mul_scalar(decrypted);
    let committed = eval_commitments_at_index(commitments, own_index);
    if expected != committed {
        return Err(ShareError::FeldmanCheckFailed(dealer_index));
    }
    Ok(decrypted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::thread_rng;

    fn keypair(rng: &mut impl RngCore) -> (Scalar, Point) {
        let sk = random_scalar(rng);
        (sk, Point::generator().mul_scalar(sk))
    }

    #[test]
    fn round_trip_encryption() {
        let mut rng = thread_rng();
        let (dealer_sk, _dealer_pk) = keypair(&mut rng);
        let (recipient_sk, recipient_pk) = keypair(&mut rng);

        let poly = PrivatePolynomial::generate(3, &mut rng);
        let encrypted = encrypt_share(&poly, dealer_sk, &recipient_pk, 2);

        let decrypted = verify_share(
            1,
            &Point::generator().mul_scalar(dealer_sk),
            2,
            recipient_sk,
            3,
            &poly.commit(),
            encrypted,
        )
        .unwrap();

        assert_eq!(decrypted, poly.share_for(2));
    }

    #[test]
    fn tampered_share_is_rejected() {
        let mut rng = thread_rng();
        let (dealer_sk, _dealer_pk) = keypair(&mut rng);
        let (recipient_sk, recipient_pk) = keypair(&mut rng);

        let poly = PrivatePolynomial::generate(3, &mut rng);
        let encrypted = encrypt_share(&poly, dealer_sk, &recipient_pk, 2) + Scalar::from(1u64);

        let result = verify_share(
            1,
            &Point::generator().mul_scalar(dealer_sk),
            2,
            recipient_sk,
            3,
            &poly.commit(),
            encrypted,
        );
        assert_eq!(result, Err(ShareError::FeldmanCheckFailed(1)));
    }

    #[test]
    fn wrong_commitment_length_is_rejected() {
        let mut rng = thread_rng();
        let (recipient_sk, recipient_pk) = keypair(&mut rng);
        let poly = PrivatePolynomial::generate(3, &mut rng);
        let mut commits = poly.commit();
        commits.pop();

        let result = verify_share(
            1,
            &recipient_pk,
            2,
            recipient_sk,
            3,
            &commits,
            Scalar::from(0u64),
        );
        assert_eq!(result, Err(ShareError::WrongCommitmentLength(1, 2, 3)));
    }
}
