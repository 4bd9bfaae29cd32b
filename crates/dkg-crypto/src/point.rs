use crate::error::CurveError;
use ark_ec::{AffineRepr, CurveGroup};
use ark_ed_on_bn254::EdwardsAffine;
use ark_ff::{BigInteger, PrimeField, UniformRand, Zero};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use rand_core::RngCore;
use serde::{Deserialize, Serialize};

/// A scalar modulo the BabyJubJub subgroup order `l` (~2^251.38).
pub type Scalar = ark_ed_on_bn254::Fr;

/// The curve's base field, `Fq` (BN254's scalar field `r`, ~2^253.97) —
/// also the field the `poly_eval`/`key_deriv` circuits' public inputs live
/// in. Re-exported so callers marshalling circuit inputs or prover I/O can
/// name it without depending on `ark-ed-on-bn254` directly. `l < r`, so an
/// `Fq` value is not generally a valid `Scalar` without reduction, and vice
/// versa an `Fq` value is never the right encoding to narrow a `Scalar`
/// into — see [`scalar_to_base_field`] and [`base_field_to_scalar`].
pub use ark_ed_on_bn254::Fq;

/// A uniformly random scalar. `dkg-core` and `dkg-node` use this instead of
/// depending on arkworks directly, so the concrete curve crate stays an
/// implementation detail of `dkg-crypto`.
pub fn random_scalar<R: RngCore>(rng: &mut R) -> Scalar {
    Scalar::rand(rng)
}

/// A point on the BabyJubJub curve.
///
/// The affine representation is kept private; callers that need the raw
/// coordinates (circuit-input construction, calldata marshalling) go through
/// [`Point::affine_xy`] rather than matching on the representation, so a
/// future change to projective/Montgomery form stays contained here.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point(#[serde(with = "point_serde")] EdwardsAffine);

impl Point {
    pub fn generator() -> Self {
        Point(EdwardsAffine::generator())
    }

    pub fn identity() -> Self {
        Point(EdwardsAffine::zero())
    }

    pub fn is_identity(&self) -> bool {
        self.0.is_zero()
    }

    /// The affine `(x, y)` coordinates, each an element of the base field.
    pub fn affine_xy(&self) -> (Fq, Fq) {
        (self.0.x, self.0.y)
    }

    /// `(x, y)` as raw big-endian bytes, each a lossless marshal of the
    /// base-field coordinate itself — for contract ABI slots that want the
    /// coordinate directly (`submitPublicKey`'s `[uint256, uint256]`), as
    /// opposed to [`base_field_to_scalar`]'s genuine field-changing fold.
    pub fn affine_xy_bytes_be(&self) -> ([u8; 32], [u8; 32]) {
        let (x, y) = self.affine_xy();
        (fq_to_bytes_be(x), fq_to_bytes_be(y))
    }

    /// Inverse of [`Point::affine_xy_bytes_be`], reducing each coordinate
    /// modulo the base field before validating the resulting point is on
    /// curve and in the correct subgroup.
    pub fn from_xy_bytes_be(x: &[u8], y: &[u8]) -> Result<Self, CurveError> {
        Self::from_affine_xy(Fq::from_be_bytes_mod_order(x), Fq::from_be_bytes_mod_order(y))
    }

    /// Reconstructs a point from wire coordinates, rejecting anything not on
    /// the curve or outside the prime-order subgroup. A received commitment
    /// or public key is attacker-controlled calldata — never trust it
    /// without this check.
    pub fn from_affine_xy(x: Fq, y: Fq) -> Result<Self, CurveError> {
        let p = EdwardsAffine::new_unchecked(x, y);
        if !p.is_on_curve() {
            return Err(CurveError::NotOnCurve);
        }
        if !p.is_in_correct_subgroup_assuming_on_curve() {
            return Err(CurveError::NotInSubgroup);
        }
        Ok(Point(p))
    }

    pub fn add(&self, other: &Point) -> Point {
        Point((self.0.into_group() + other.0.into_group()).into_affine())
    }

    pub fn neg(&self) -> Point {
        Point(-self.0)
    }

    pub fn mul_scalar(&self, s: Scalar) -> Point {
        Point((self.0.into_group() * s).into_affine())
    }

    /// 32-byte compressed encoding (y-coordinate plus the sign of x).
    pub fn to_compressed(&self) -> [u8; 32] {
        let mut buf = [0u8; 32];
        self.0
            .serialize_compressed(&mut buf[..])
            .expect("EdwardsAffine always fits in 32 bytes");
        buf
    }

    pub fn from_compressed(bytes: &[u8]) -> Result<Self, CurveError> {
        if bytes.len() != 32 {
            return Err(CurveError::WrongLength(bytes.len()));
        }
        let p = EdwardsAffine::deserialize_compressed(bytes)
            .map_err(|_| CurveError::NotOnCurve)?;
        if !p.is_in_correct_subgroup_assuming_on_curve() {
            return Err(CurveError::NotInSubgroup);
        }
        Ok(Point(p))
    }
}

impl std::fmt::Debug for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Point({})", hex::encode(self.to_compressed()))
    }
}

/// Folds a base-field element into the BabyJubJub scalar field by its
/// little-endian byte representation. This is a genuine reduction mod `l`
/// (`Fq`'s `r` is larger than `l`) — used *only* where the target really is
/// a BabyJubJub scalar, namely folding a Poseidon digest (which lives in
/// `Fq`) into the PSK (§4.3). Do not reuse this for circuit-input
/// marshalling: a circuit's public inputs live in `Fq`, and reducing a
/// commitment coordinate or hash through this function would silently
/// corrupt it for the overwhelming majority of values. See
/// [`scalar_to_base_field`] for carrying a value the other way.
pub fn base_field_to_scalar(x: Fq) -> Scalar {
    Scalar::from_le_bytes_mod_order(&x.into_bigint().to_bytes_le())
}

/// Widens a BabyJubJub scalar (`< l`) into the curve's base field `Fq`
/// (`< r`, the field every circuit's public inputs are expressed in).
/// Because `l < r`, every `Scalar` value is already below `r`: this is a
/// lossless embedding, never a reduction, unlike [`base_field_to_scalar`]'s
/// fold in the other direction. Used to carry a secret, a share, or a
/// small index into a `poly_eval`/`key_deriv` input vector (§4.4).
pub fn scalar_to_base_field(s: Scalar) -> Fq {
    Fq::from_le_bytes_mod_order(&s.into_bigint().to_bytes_le())
}

/// Big-endian 32-byte encoding of a scalar, for hash preimages and calldata.
pub fn scalar_to_bytes_be(s: Scalar) -> [u8; 32] {
    let mut out = [0u8; 32];
    let be = s.into_bigint().to_bytes_be();
    out[32 - be.len()..].copy_from_slice(&be);
    out
}

/// Big-endian 32-byte encoding of a base-field element, for calldata and
/// circuit-input marshalling.
pub fn fq_to_bytes_be(x: Fq) -> [u8; 32] {
    let mut out = [0u8; 32];
    let be = x.into_bigint().to_bytes_be();
    out[32 - be.len()..].copy_from_slice(&be);
    out
}

/// Inverse of [`fq_to_bytes_be`]'s encoding, reducing modulo the base
/// field. For the truncated-hash bytes this crate feeds it (§6: top three
/// bits cleared, so the value is always below `2^253 < r`), the reduction
/// never actually fires — a true no-op, not a fold.
pub fn fq_from_bytes_be(bytes: &[u8]) -> Fq {
    Fq::from_be_bytes_mod_order(bytes)
}

/// Parses a configured private key: arbitrary-length big-endian bytes,
/// reduced modulo the subgroup order. Accepts any length up to 32 bytes so a
/// config value with or without leading zero bytes trimmed still parses.
pub fn scalar_from_bytes_be(bytes: &[u8]) -> Scalar {
    Scalar::from_be_bytes_mod_order(bytes)
}

/// Decimal encoding of a base-field element, for passing a circuit's
/// public inputs as `zokrates` CLI arguments (it reads `-a` values as
/// base-10 integers, not hex).
pub fn fq_to_decimal(x: Fq) -> String {
    num_bigint::BigUint::from_bytes_be(&fq_to_bytes_be(x)).to_string()
}

/// Inverse of [`fq_to_decimal`], for decoding a prover's echoed `inputs`
/// back from the hex strings its `proof.json` actually uses (the prover
/// itself round-trips through hex, not decimal, on the way out).
pub fn fq_from_hex_be(hex_str: &str) -> Result<Fq, CurveError> {
    let trimmed = hex_str.trim_start_matches("0x");
    let bytes = hex::decode(trimmed).map_err(|_| CurveError::WrongLength(trimmed.len()))?;
    Ok(fq_from_bytes_be(&bytes))
}

mod point_serde {
    use super::EdwardsAffine;
    use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(p: &EdwardsAffine, s: S) -> Result<S::Ok, S::Error> {
        let mut buf = Vec::new();
        p.serialize_compressed(&mut buf)
            .map_err(serde::ser::Error::custom)?;
        s.serialize_bytes(&buf)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<EdwardsAffine, D::Error> {
        let buf: Vec<u8> = serde::de::Deserialize::deserialize(d)?;
        EdwardsAffine::deserialize_compressed(&buf[..]).map_err(serde::de::Error::custom)
    }
}
