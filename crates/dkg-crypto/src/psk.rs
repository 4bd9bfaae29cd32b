use crate::point::{base_field_to_scalar, Point, Scalar};

/// Diffie-Hellman exchange over BabyJubJub: `sk * pk`.
pub fn dh_exchange(sk: Scalar, pk: &Point) -> Point {
    pk.mul_scalar(sk)
}

/// The symmetric pre-shared key used to additively mask a share in transit:
/// `Poseidon(DH(sk, pk).x, C_0.x) mod q`.
///
/// `c0` is the dealer's own first commitment, `C_0 = a_0 * G`; mixing it in
/// binds the PSK to the specific polynomial being dealt, so replaying an
/// old encrypted share against a new polynomial decrypts to garbage instead
/// of silently reusing the previous round's key.
pub fn pre_shared_key(sk: Scalar, peer_pk: &Point, c0: &Point) -> Scalar {
    let shared = dh_exchange(sk, peer_pk);
    let (shared_x, _) = shared.affine_xy();
    let (c0_x, _) = c0.affine_xy();
    let digest = poseidon2(shared_x, c0_x);
    base_field_to_scalar(digest)
}

fn poseidon2(a: ark_ed_on_bn254::Fq, b: ark_ed_on_bn254::Fq) -> ark_ed_on_bn254::Fq {
    use light_poseidon::{Poseidon, PoseidonHasher};
    let mut hasher = Poseidon::<ark_ed_on_bn254::Fq>::new_circom(2)
        .expect("width-2 Poseidon parameters are bundled with light-poseidon");
    hasher.hash(&[a, b]).expect("two field elements hash cleanly")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::UniformRand;
    use rand::thread_rng;

    #[test]
    fn dh_is_symmetric() {
        let mut rng = thread_rng();
        let a = Scalar::rand(&mut rng);
        let b = Scalar::rand(&mut rng);
        let g = Point::generator();
        let pa = g.mul_scalar(a);
        let pb = g.mul_scalar(b);

        assert_eq!(dh_exchange(a, &pb), dh_exchange(b, &pa));
    }

    #[test]
    fn psk_depends_on_all_three_inputs() {
        let mut rng = thread_rng();
        let sk = Scalar::rand(&mut rng);
        let pk = Point::generator().mul_scalar(Scalar::rand(&mut rng));
        let c0 = Point::generator().mul_scalar(Scalar::rand(&mut rng));
        let c0_other = Point::generator().mul_scalar(Scalar::rand(&mut rng));

        assert_ne!(pre_shared_key(sk, &pk, &c0), pre_shared_key(sk, &pk, &c0_other));
    }
}
