//! The Wesolowski-shape verifiable-delay function.
//!
//! Evaluation computes `y = x^(2^T) mod N` by `T` sequential squarings (the
//! delay), plus the proof `π = x^⌊2^T / L⌋ mod N`. Verification checks
//!
//! `π^L · x^r ≡ y (mod N)` with `r = 2^T mod L`
//!
//! using only two small-exponent modpows, so it is orders of magnitude
//! cheaper than evaluation. `x` and the odd challenge `L` derive from the
//! round aggregate; `N` is the fixed RSA-style modulus `2^2048 − 159`.

use animica_types::error::RandomnessError;
use animica_types::hash::{sha3_256_multi, Hash32};
use num_bigint::BigUint;
use num_traits::One;
use serde::{Deserialize, Serialize};

/// Derivation tag for the group element `x`.
const DOMAIN_VDF_X: &[u8] = b"rand:vdf:x|";
/// Derivation tag for the challenge `L`.
const DOMAIN_VDF_L: &[u8] = b"rand:vdf:l|";

/// VDF difficulty parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VdfParams {
    /// The number of sequential squarings `T`.
    pub iterations: u32,
}

impl Default for VdfParams {
    fn default() -> Self {
        Self { iterations: 512 }
    }
}

/// A VDF output with its proof of correct evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VdfProof {
    /// `y = x^(2^T) mod N`, big-endian.
    pub y: Vec<u8>,
    /// `π = x^⌊2^T / L⌋ mod N`, big-endian.
    pub pi: Vec<u8>,
}

/// The fixed 2048-bit RSA-style modulus `2^2048 − 159`.
fn modulus() -> BigUint {
    (BigUint::one() << 2048u32) - BigUint::from(159u32)
}

/// Derives the group element `x ∈ [2, N−2]` from the aggregate.
fn derive_x(aggregate: &Hash32, n: &BigUint) -> BigUint {
    // Expand the 32-byte aggregate to modulus width with counter hashing.
    let mut material = Vec::with_capacity(32 * 8);
    for counter in 0u8..8 {
        material.extend_from_slice(&sha3_256_multi(DOMAIN_VDF_X, &[&[counter], aggregate]));
    }
    let raw = BigUint::from_bytes_be(&material);
    raw % (n - BigUint::from(3u32)) + BigUint::from(2u32)
}

/// Derives the odd 256-bit challenge `L` from the aggregate.
fn derive_l(aggregate: &Hash32) -> BigUint {
    let mut bytes = sha3_256_multi(DOMAIN_VDF_L, &[aggregate]);
    bytes[0] |= 0x80; // full 256-bit magnitude
    bytes[31] |= 0x01; // odd
    BigUint::from_bytes_be(&bytes)
}

/// Evaluates the VDF over a round aggregate. This is the slow path: cost is
/// linear in `iterations`.
pub fn eval(aggregate: &Hash32, params: &VdfParams) -> VdfProof {
    let n = modulus();
    let x = derive_x(aggregate, &n);
    let l = derive_l(aggregate);

    let e = BigUint::one() << params.iterations;
    let y = x.modpow(&e, &n);
    let q = &e / &l;
    let pi = x.modpow(&q, &n);

    VdfProof {
        y: y.to_bytes_be(),
        pi: pi.to_bytes_be(),
    }
}

/// Verifies a VDF proof against the aggregate it claims to delay.
pub fn verify(
    aggregate: &Hash32,
    params: &VdfParams,
    proof: &VdfProof,
) -> Result<(), RandomnessError> {
    let n = modulus();
    let x = derive_x(aggregate, &n);
    let l = derive_l(aggregate);

    let y = BigUint::from_bytes_be(&proof.y);
    let pi = BigUint::from_bytes_be(&proof.pi);
    if y >= n || pi >= n {
        return Err(RandomnessError::VdfInvalid);
    }

    // r = 2^T mod L, computed without materializing 2^T.
    let r = BigUint::from(2u32).modpow(&BigUint::from(params.iterations), &l);
    let lhs = (pi.modpow(&l, &n) * x.modpow(&r, &n)) % &n;
    if lhs == y {
        Ok(())
    } else {
        Err(RandomnessError::VdfInvalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agg(byte: u8) -> Hash32 {
        [byte; 32]
    }

    #[test]
    fn eval_then_verify_roundtrips() {
        let params = VdfParams { iterations: 64 };
        let proof = eval(&agg(0x11), &params);
        verify(&agg(0x11), &params, &proof).unwrap();
    }

    #[test]
    fn proof_is_bound_to_the_aggregate() {
        let params = VdfParams { iterations: 64 };
        let proof = eval(&agg(0x11), &params);
        assert!(matches!(
            verify(&agg(0x22), &params, &proof),
            Err(RandomnessError::VdfInvalid)
        ));
    }

    #[test]
    fn proof_is_bound_to_the_iteration_count() {
        let proof = eval(&agg(0x33), &VdfParams { iterations: 64 });
        assert!(matches!(
            verify(&agg(0x33), &VdfParams { iterations: 65 }, &proof),
            Err(RandomnessError::VdfInvalid)
        ));
    }

    #[test]
    fn tampered_output_or_proof_fails() {
        let params = VdfParams { iterations: 64 };
        let proof = eval(&agg(0x44), &params);

        let mut bad_y = proof.clone();
        bad_y.y[0] ^= 0x01;
        assert!(verify(&agg(0x44), &params, &bad_y).is_err());

        let mut bad_pi = proof.clone();
        bad_pi.pi[0] ^= 0x01;
        assert!(verify(&agg(0x44), &params, &bad_pi).is_err());
    }

    #[test]
    fn out_of_range_elements_are_rejected() {
        let params = VdfParams { iterations: 16 };
        let n = modulus();
        let proof = VdfProof {
            y: n.to_bytes_be(),
            pi: vec![0x02],
        };
        assert!(verify(&agg(0x55), &params, &proof).is_err());
    }

    #[test]
    fn evaluation_is_deterministic() {
        let params = VdfParams { iterations: 32 };
        assert_eq!(eval(&agg(0x66), &params), eval(&agg(0x66), &params));
        assert_ne!(eval(&agg(0x66), &params), eval(&agg(0x67), &params));
    }
}
