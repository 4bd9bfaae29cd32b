//! Marshalling between `dkg-crypto`'s curve types and the `U256` words the
//! contract ABI speaks. Two distinct encodings are in play, both wire-exact
//! per §6: a single compressed `uint256` for slots that carry one curve
//! point (`register`'s `publicKey`, `broadcastShares`'s `commitments`), and
//! an `(x, y)` pair of `uint256`s for `submitPublicKey`'s `publicKey` slot.

use dkg_crypto::{scalar_from_bytes_be, scalar_to_bytes_be, CurveError, Point, Scalar};
use ethers::core::types::U256;

pub fn point_to_u256(p: &Point) -> U256 {
    U256::from_big_endian(&p.to_compressed())
}

pub fn u256_to_point(u: U256) -> Result<Point, CurveError> {
    let mut bytes = [0u8; 32];
    u.to_big_endian(&mut bytes);
    Point::from_compressed(&bytes)
}

pub fn point_to_xy_u256(p: &Point) -> [U256; 2] {
    let (x, y) = p.affine_xy_bytes_be();
    [U256::from_big_endian(&x), U256::from_big_endian(&y)]
}

pub fn xy_u256_to_point(xy: [U256; 2]) -> Result<Point, CurveError> {
    let mut x = [0u8; 32];
    let mut y = [0u8; 32];
    xy[0].to_big_endian(&mut x);
    xy[1].to_big_endian(&mut y);
    Point::from_xy_bytes_be(&x, &y)
}

pub fn scalar_to_u256(s: Scalar) -> U256 {
    U256::from_big_endian(&scalar_to_bytes_be(s))
}

pub fn u256_to_scalar(u: U256) -> Scalar {
    let mut bytes = [0u8; 32];
    u.to_big_endian(&mut bytes);
    scalar_from_bytes_be(&bytes)
}

/// The 0-based slot of `recipient_index`'s share within a dealer's
/// `broadcastShares` `shares` array, which omits the dealer's own slot
/// (§6: "ordered so that recipients skip the sender's slot").
pub fn recipient_slot(dealer_index: u32, recipient_index: u32, n: usize) -> Option<usize> {
    if recipient_index == dealer_index {
        return None;
    }
    let mut slot = 0usize;
    for idx in 1..=n as u32 {
        if idx == dealer_index {
            continue;
        }
        if idx == recipient_index {
            return Some(slot);
        }
        slot += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use dkg_crypto::random_scalar;
    use rand::thread_rng;

    #[test]
    fn point_roundtrips_through_u256() {
        let mut rng = thread_rng();
        let p = Point::generator().mul_scalar(random_scalar(&mut rng));
        assert_eq!(u256_to_point(point_to_u256(&p)).unwrap(), p);
    }

    #[test]
    fn point_roundtrips_through_xy_pair() {
        let mut rng = thread_rng();
        let p = Point::generator().mul_scalar(random_scalar(&mut rng));
        assert_eq!(xy_u256_to_point(point_to_xy_u256(&p)).unwrap(), p);
    }

    #[test]
    fn scalar_roundtrips_through_u256() {
        let mut rng = thread_rng();
        let s = random_scalar(&mut rng);
        assert_eq!(u256_to_scalar(scalar_to_u256(s)), s);
    }

    #[test]
    fn recipient_slot_skips_dealer() {
        // n=4, dealer=2: recipients 1,3,4 map to slots 0,1,2.
        assert_eq!(recipient_slot(2, 1, 4), Some(0));
        assert_eq!(recipient_slot(2, 3, 4), Some(1));
        assert_eq!(recipient_slot(2, 4, 4), Some(2));
        assert_eq!(recipient_slot(2, 2, 4), None);
    }
}
