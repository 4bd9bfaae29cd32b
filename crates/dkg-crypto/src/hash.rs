use crate::point::Fq;
use ark_ff::PrimeField;
use tiny_keccak::{Hasher, Keccak};

/// Keccak-256 with the top three bits of the first byte cleared, so the
/// result always fits in 253 bits — below both `Fq` (the circuit field,
/// `r`, ~2^253.97) and safe to embed into it without reduction.
pub fn truncated_keccak256(input: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut hasher = Keccak::v256();
    hasher.update(input);
    hasher.finalize(&mut out);
    out[0] &= 0x1f;
    out
}

/// [`truncated_keccak256`] decoded as a big-endian element of `Fq`, the
/// field the `poly_eval`/`key_deriv` circuits' hash public input is
/// expressed in. Since the truncation guarantees a value below `2^253 < r`,
/// this is a true no-op embedding, not a reduction — circuit inputs built
/// this way are bit-identical to the hash value itself. (Embedding into
/// `Scalar`, the smaller BabyJubJub subgroup order `l`, would reduce the
/// ~81% of hashes that land at or above `l` and is never the right target
/// field for a circuit input.)
pub fn truncated_hash_to_base_field(input: &[u8]) -> Fq {
    let bytes = truncated_keccak256(input);
    Fq::from_be_bytes_mod_order(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_clears_top_three_bits() {
        for seed in 0u8..50 {
            let h = truncated_keccak256(&[seed]);
            assert_eq!(h[0] & 0xe0, 0, "top three bits must be zero");
        }
    }

    #[test]
    fn fits_in_253_bits() {
        let h = truncated_keccak256(b"anything");
        let value = num_bigint_value(&h);
        assert!(value < (num_bigint::BigUint::from(1u8) << 253u32));
    }

    fn num_bigint_value(bytes: &[u8; 32]) -> num_bigint::BigUint {
        num_bigint::BigUint::from_bytes_be(bytes)
    }
}
