use thiserror::Error;

/// Failures decoding a wire-level `(x, y)` pair into a curve point.
///
/// A received commitment or public key is attacker-controlled calldata; any
/// of these is reported as an *invalid-shaped* point rather than panicking.
#[derive(Debug, Error)]
pub enum CurveError {
    #[error("coordinate {0} is not a member of the base field")]
    CoordinateOutOfRange(&'static str),
    #[error("point is not on the BabyJubJub curve")]
    NotOnCurve,
    #[error("point is not in the prime-order subgroup")]
    NotInSubgroup,
    #[error("serialized point has the wrong length: expected 32 bytes, got {0}")]
    WrongLength(usize),
}
