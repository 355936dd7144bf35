//! Conversions between BN254 scalars and their 32-byte big-endian wire form.
//!
//! Decoding is strict: a value at or above the modulus is an error and is
//! never reduced.

use ark_bn254::Fr;
use ark_ff::{BigInt, BigInteger, PrimeField};
use atlas_types::{AtlasError, AtlasResult, FieldBytes, FIELD_BYTES_SIZE};

/// Encode a field element as 32 big-endian bytes.
pub fn fr_to_bytes(f: &Fr) -> [u8; FIELD_BYTES_SIZE] {
    let be = f.into_bigint().to_bytes_be();
    let mut out = [0u8; FIELD_BYTES_SIZE];
    out[FIELD_BYTES_SIZE - be.len()..].copy_from_slice(&be);
    out
}

/// Encode a field element as [`FieldBytes`].
pub fn fr_to_field_bytes(f: &Fr) -> FieldBytes {
    FieldBytes::from_bytes(fr_to_bytes(f))
}

/// Decode 32 big-endian bytes, returning `None` when the value is not canonical.
pub fn bytes_to_fr_checked(bytes: &[u8; FIELD_BYTES_SIZE]) -> Option<Fr> {
    let mut limbs = [0u64; 4];
    for (i, limb) in limbs.iter_mut().enumerate() {
        let start = FIELD_BYTES_SIZE - 8 * (i + 1);
        let mut chunk = [0u8; 8];
        chunk.copy_from_slice(&bytes[start..start + 8]);
        *limb = u64::from_be_bytes(chunk);
    }
    Fr::from_bigint(BigInt::new(limbs))
}

/// Decode a public value, failing with `FieldOverflow` when it is not below the modulus.
pub fn field_bytes_to_fr(value: &FieldBytes, what: &str) -> AtlasResult<Fr> {
    bytes_to_fr_checked(value.as_bytes())
        .ok_or_else(|| AtlasError::FieldOverflow(format!("{} is not below the field modulus", what)))
}

/// Decode a list of public values, naming the offending position on failure.
pub fn field_bytes_slice_to_fr(values: &[FieldBytes], what: &str) -> AtlasResult<Vec<Fr>> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| field_bytes_to_fr(v, &format!("{}[{}]", what, i)))
        .collect()
}
