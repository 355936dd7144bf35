#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

//! Cryptography for Shadow Atlas: Poseidon commitments and nullifiers, the
//! fixed-depth Merkle tree, the membership circuit and its Groth16 prover and
//! verifier over BN254.

pub mod circuit;
pub mod commitment;
pub mod domain;
pub mod field;
pub mod keys;
pub mod merkle;
pub mod nullifier;
pub mod poseidon;
pub mod proof;
pub mod prover;
pub mod verifier;

pub use circuit::{CircuitParams, MembershipCircuit, MembershipWitness};
pub use commitment::{derive_commitment, derive_commitment_field, derive_commitment_from_bytes, IdentitySecret};
pub use domain::DomainTag;
pub use field::{bytes_to_fr_checked, field_bytes_to_fr, fr_to_bytes, fr_to_field_bytes};
pub use keys::{load_verifier, vk_fingerprint, KeyMetadata, MembershipKeys};
pub use merkle::{compute_root, empty_leaf, hash_pair, FixedMerkleTree};
pub use nullifier::{action_context_hash, action_context_hash_bytes, derive_nullifier, derive_nullifier_field};
pub use poseidon::{canonical_config, poseidon_hash, poseidon_hash_tagged};
pub use proof::{decode_proof, decode_proof_base64, encode_proof, MembershipProof};
pub use prover::{prepare_witness, MembershipProver};
pub use verifier::{decode_public_inputs, MembershipVerifier};

pub use ark_bn254::Fr;
