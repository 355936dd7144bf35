use ark_bn254::Fr;
use ark_ff::{PrimeField, Zero};
use atlas_types::{AtlasError, AtlasResult, FieldBytes, FIELD_BYTES_SIZE};
use rand::{CryptoRng, RngCore};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::domain::DomainTag;
use crate::field::{bytes_to_fr_checked, fr_to_field_bytes};
use crate::poseidon::poseidon_hash_tagged;

/// Per-identity secret: a canonical, non-zero field element.
///
/// Held as big-endian bytes and wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct IdentitySecret([u8; FIELD_BYTES_SIZE]);

impl IdentitySecret {
    /// Sample a uniformly random secret, re-sampling until it is canonical and non-zero.
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut bytes = [0u8; FIELD_BYTES_SIZE];
        loop {
            rng.fill_bytes(&mut bytes);
            // modulus is below 2^254
            bytes[0] &= 0x3f;
            if let Ok(secret) = Self::from_bytes(bytes) {
                bytes.zeroize();
                return secret;
            }
        }
    }

    /// Wrap existing secret bytes.
    ///
    /// Fails with `InvalidFieldElement` when the value is zero or not below
    /// the modulus. The value is never reduced.
    pub fn from_bytes(bytes: [u8; FIELD_BYTES_SIZE]) -> AtlasResult<Self> {
        match bytes_to_fr_checked(&bytes) {
            None => Err(AtlasError::InvalidFieldElement(
                "secret is not below the field modulus".into(),
            )),
            Some(f) if f.is_zero() => {
                Err(AtlasError::InvalidFieldElement("secret must be non-zero".into()))
            }
            Some(_) => Ok(Self(bytes)),
        }
    }

    /// Raw big-endian bytes.
    pub fn as_bytes(&self) -> &[u8; FIELD_BYTES_SIZE] {
        &self.0
    }

    /// Secret as a field element.
    pub fn to_field(&self) -> Fr {
        // canonical by construction, so this never reduces
        Fr::from_be_bytes_mod_order(&self.0)
    }

    /// Identity commitment of this secret.
    pub fn commitment(&self) -> Fr {
        commitment_of(self.to_field())
    }
}

impl fmt::Debug for IdentitySecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdentitySecret([REDACTED])")
    }
}

impl PartialEq for IdentitySecret {
    fn eq(&self, other: &Self) -> bool {
        use subtle::ConstantTimeEq;
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for IdentitySecret {}

fn commitment_of(secret: Fr) -> Fr {
    poseidon_hash_tagged(&[secret], DomainTag::Commitment)
}

/// `Hash(secret, DOMAIN_COMMIT)`.
pub fn derive_commitment(secret: &IdentitySecret) -> FieldBytes {
    fr_to_field_bytes(&secret.commitment())
}

/// Commitment of raw secret bytes, rejecting zero and out-of-range secrets.
pub fn derive_commitment_from_bytes(secret: [u8; FIELD_BYTES_SIZE]) -> AtlasResult<FieldBytes> {
    let secret = IdentitySecret::from_bytes(secret)?;
    Ok(derive_commitment(&secret))
}

/// Commitment of a secret already in field form.
pub fn derive_commitment_field(secret: Fr) -> AtlasResult<Fr> {
    if secret.is_zero() {
        return Err(AtlasError::InvalidFieldElement("secret must be non-zero".into()));
    }
    Ok(commitment_of(secret))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::fr_to_bytes;
    use ark_std::rand::{rngs::StdRng, SeedableRng};
    use atlas_types::BN254_SCALAR_MODULUS_BE;

    #[test]
    fn test_random_secrets_are_canonical_and_distinct() {
        let mut rng = StdRng::seed_from_u64(1);
        let a = IdentitySecret::random(&mut rng);
        let b = IdentitySecret::random(&mut rng);

        assert_ne!(a, b);
        assert!(!a.to_field().is_zero());
        assert_eq!(fr_to_bytes(&a.to_field()), *a.as_bytes());
    }

    #[test]
    fn test_commitment_deterministic() {
        let secret = IdentitySecret::from_bytes(fr_to_bytes(&Fr::from(42u64))).unwrap();
        assert_eq!(derive_commitment(&secret), derive_commitment(&secret));
        assert_eq!(
            derive_commitment(&secret),
            derive_commitment_from_bytes(*secret.as_bytes()).unwrap()
        );
    }

    #[test]
    fn test_commitment_differs_from_plain_hash() {
        let secret = Fr::from(42u64);
        let plain = crate::poseidon::poseidon_hash(&[secret]);
        assert_ne!(derive_commitment_field(secret).unwrap(), plain);
    }

    #[test]
    fn test_rejects_zero_secret() {
        let err = IdentitySecret::from_bytes([0u8; 32]).unwrap_err();
        assert_eq!(err.code(), "INVALID_FIELD_ELEMENT");
        assert!(derive_commitment_field(Fr::from(0u64)).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_secret_without_reducing() {
        let err = derive_commitment_from_bytes(BN254_SCALAR_MODULUS_BE).unwrap_err();
        assert!(matches!(err, AtlasError::InvalidFieldElement(_)));

        let err = derive_commitment_from_bytes([0xff; 32]).unwrap_err();
        assert!(matches!(err, AtlasError::InvalidFieldElement(_)));
    }

    #[test]
    fn test_debug_redacts() {
        let mut rng = StdRng::seed_from_u64(2);
        let secret = IdentitySecret::random(&mut rng);
        assert_eq!(format!("{:?}", secret), "IdentitySecret([REDACTED])");
    }
}
