use crate::point::{Point, Scalar};
use ark_ff::{UniformRand, Zero};
use rand_core::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A value evaluated at a participant index, along with the index itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Eval<A> {
    pub index: u32,
    pub value: A,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolyError {
    #[error("not enough shares to recover the polynomial: got {0}, need {1}")]
    NotEnoughShares(usize, usize),
    #[error("two shares were given for the same index {0}")]
    DuplicateIndex(u32),
}

/// A degree-`(t-1)` univariate polynomial over the BabyJubJub scalar field.
///
/// `a_0` is the constant term: for a dealer's private polynomial this is the
/// contributed secret, and `commit()` of `a_0` is the dealer's contribution
/// to the master public key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Poly(Vec<Scalar>);

impl Poly {
    /// Draws a random degree-`(t-1)` polynomial, i.e. `t` uniform coefficients.
    pub fn random<R: RngCore>(t: usize, rng: &mut R) -> Self {
        Poly((0..t).map(|_| Scalar::rand(rng)).collect())
    }

    pub fn coefficients(&self) -> &[Scalar] {
        &self.0
    }

    pub fn degree(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    pub fn secret(&self) -> Scalar {
        self.0[0]
    }

    /// Evaluates `f(x)` via Horner's method.
    pub fn eval(&self, x: Scalar) -> Scalar {
        let mut result = Scalar::zero();
        for coeff in self.0.iter().rev() {
            result = result * x + coeff;
        }
        result
    }

    /// Evaluates at the polynomial sample point for a 1-based participant
    /// index, i.e. `f(index - 1)`. Participant indices are 1-based on chain;
    /// sample points are 0-based. Mixing the two up silently produces a
    /// share for the wrong party, so every call site goes through this
    /// helper instead of converting the index by hand.
    pub fn eval_at_index(&self, index: u32) -> Eval<Scalar> {
        assert!(index >= 1, "participant indices are 1-based");
        Eval {
            index,
            value: self.eval(Scalar::from(index - 1)),
        }
    }

    /// The Feldman commitment vector `[a_k * G]`.
    pub fn commit(&self) -> Vec<Point> {
        let g = Point::generator();
        self.0.iter().map(|a| g.mul_scalar(*a)).collect()
    }

    /// Overwrites every coefficient with zero. Called from `Drop` by owners
    /// that hold a secret polynomial; never call this and keep using the
    /// polynomial afterwards.
    pub fn zero_out(&mut self) {
        for c in self.0.iter_mut() {
            *c = Scalar::zero();
        }
    }
}

/// Evaluates a Feldman commitment vector at a 1-based participant index:
/// `Σ_k (index-1)^k * C_k`. This is the public-side counterpart of
/// [`Poly::eval_at_index`] and must use the same sample point.
pub fn eval_commitments_at_index(commits: &[Point], index: u32) -> Point {
    assert!(index >= 1, "participant indices are 1-based");
    let x = Scalar::from(index - 1);
    let mut power = Scalar::from(1u64);
    let mut acc = Point::identity();
    for c in commits {
        acc = acc.add(&c.mul_scalar(power));
        power *= x;
    }
    acc
}

/// Recovers the constant term of a degree-`(t-1)` polynomial from `t`
/// evaluations via Lagrange interpolation at `x = 0`.
///
/// `index` fields in `shares` are the 1-based participant indices; the
/// interpolation itself is carried out on the underlying 0-based sample
/// points (`index - 1`), consistent with [`Poly::eval_at_index`].
pub fn recover_secret(t: usize, shares: &[Eval<Scalar>]) -> Result<Scalar, PolyError> {
    if shares.len() < t {
        return Err(PolyError::NotEnoughShares(shares.len(), t));
    }
    let chosen = &shares[..t];
    let mut seen = std::collections::HashSet::new();
    for s in chosen {
        if !seen.insert(s.index) {
            return Err(PolyError::DuplicateIndex(s.index));
        }
    }

    let xs: Vec<Scalar> = chosen.iter().map(|s| Scalar::from(s.index - 1)).collect();

    let mut secret = Scalar::zero();
    for (i, share) in chosen.iter().enumerate() {
        let mut num = Scalar::from(1u64);
        let mut den = Scalar::from(1u64);
        for (j, xj) in xs.iter().enumerate() {
            if i == j {
                continue;
            }
            num *= *xj;
            den *= *xj - xs[i];
        }
        let den_inv = den.inverse().expect("distinct sample points are invertible");
        secret += share.value * num * den_inv;
    }
    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::thread_rng;

    #[test]
    fn eval_zero_is_secret() {
        let p = Poly::random(3, &mut thread_rng());
        assert_eq!(p.eval(Scalar::from(0u64)), p.secret());
    }

    #[test]
    fn commit_matches_eval_via_commitments() {
        let p = Poly::random(4, &mut thread_rng());
        let commits = p.commit();
        for index in 1u32..=6 {
            let eval = p.eval_at_index(index);
            let committed = eval_commitments_at_index(&commits, index);
            assert_eq!(Point::generator().mul_scalar(eval.value), committed);
        }
    }

    #[test]
    fn recovers_secret_from_threshold_shares() {
        let t = 3;
        let p = Poly::random(t, &mut thread_rng());
        let shares: Vec<_> = (1u32..=5).map(|i| p.eval_at_index(i)).collect();
        let recovered = recover_secret(t, &shares[..t]).unwrap();
        assert_eq!(recovered, p.secret());

        // Also recoverable from a different subset of the same size.
        let recovered2 = recover_secret(t, &shares[2..5]).unwrap();
        assert_eq!(recovered2, p.secret());
    }

    #[test]
    fn insufficient_shares_error() {
        let t = 3;
        let p = Poly::random(t, &mut thread_rng());
        let shares: Vec<_> = (1u32..=2).map(|i| p.eval_at_index(i)).collect();
        assert_eq!(
            recover_secret(t, &shares),
            Err(PolyError::NotEnoughShares(2, 3))
        );
    }
}
