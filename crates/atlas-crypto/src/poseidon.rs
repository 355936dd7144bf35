//! Canonical Poseidon over the BN254 scalar field.
//!
//! Every commitment, tree node and nullifier in the atlas goes through
//! [`poseidon_hash`]; the circuit uses the same configuration through
//! [`crate::circuit::poseidon_hash_gadget`].
//!
//! ## Parameters
//! - Width 3 (rate 2, capacity 1)
//! - 8 full rounds, 57 partial rounds
//! - S-box x^5
//! - Round constants and MDS from the arkworks Grain LFSR
//!
//! The output is the first squeezed element.

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::{
    poseidon::{find_poseidon_ark_and_mds, PoseidonConfig, PoseidonSponge},
    CryptographicSponge,
};
use std::sync::OnceLock;

use crate::domain::DomainTag;

static CANONICAL_CONFIG: OnceLock<PoseidonConfig<Fr>> = OnceLock::new();

/// Shared Poseidon configuration, built once.
pub fn canonical_config() -> &'static PoseidonConfig<Fr> {
    CANONICAL_CONFIG.get_or_init(|| {
        let rate = 2;
        let alpha = 5u64;
        let full_rounds = 8;
        let partial_rounds = 57;
        let field_bits = 254;

        let (ark, mds) =
            find_poseidon_ark_and_mds::<Fr>(field_bits, rate, full_rounds, partial_rounds, 0);

        PoseidonConfig {
            full_rounds: full_rounds as usize,
            partial_rounds: partial_rounds as usize,
            alpha,
            ark,
            mds,
            rate,
            capacity: 1,
        }
    })
}

/// Absorb `inputs` in order and squeeze one element.
pub fn poseidon_hash(inputs: &[Fr]) -> Fr {
    let mut sponge = PoseidonSponge::new(canonical_config());
    for input in inputs {
        sponge.absorb(input);
    }
    let output: Vec<Fr> = sponge.squeeze_field_elements(1);
    output[0]
}

/// Hash `inputs` followed by a domain tag.
pub fn poseidon_hash_tagged(inputs: &[Fr], tag: DomainTag) -> Fr {
    let mut sponge = PoseidonSponge::new(canonical_config());
    for input in inputs {
        sponge.absorb(input);
    }
    sponge.absorb(&tag.to_field());
    let output: Vec<Fr> = sponge.squeeze_field_elements(1);
    output[0]
}
