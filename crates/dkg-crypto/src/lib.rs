//! BabyJubJub curve primitives, Feldman-committed polynomials, and the
//! Poseidon-keyed additive share encryption used by the DKG participant
//! node.
//!
//! This crate intentionally supports a single concrete curve. Earlier
//! revisions of the code this was distilled from abstracted over several
//! pairing-friendly curves behind `Element`/`Point`/`Scalar` traits; that
//! generality has no customer here, since the on-chain verifier contract is
//! wired to one curve and one set of circuits. A single concrete [`Point`]
//! type with an explicit [`Point::affine_xy`] accessor is easier to audit
//! than a duck-typed one.

mod error;
mod hash;
mod point;
mod poly;
mod psk;

pub use error::CurveError;
pub use hash::{truncated_hash_to_base_field, truncated_keccak256};
pub use point::{
    base_field_to_scalar, fq_from_bytes_be, fq_from_hex_be, fq_to_bytes_be, fq_to_decimal,
    random_scalar, scalar_from_bytes_be, scalar_to_base_field, scalar_to_bytes_be, Fq, Point,
    Scalar,
};
pub use poly::{eval_commitments_at_index, recover_secret, Eval, Poly, PolyError};
pub use psk::{dh_exchange, pre_shared_key};
