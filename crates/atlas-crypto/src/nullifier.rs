use ark_bn254::Fr;
use ark_ff::PrimeField;
use atlas_types::FieldBytes;

use crate::commitment::IdentitySecret;
use crate::domain::{DomainTag, DOMAIN_ACTION_BYTES};
use crate::field::fr_to_field_bytes;
use crate::poseidon::poseidon_hash_tagged;

/// Map a free-form action context (e.g. `petition-42`) to a field element.
///
/// BLAKE3 over the action prefix and the context, reduced modulo the field order.
pub fn action_context_hash(context: &str) -> Fr {
    let mut hasher = blake3::Hasher::new();
    hasher.update(DOMAIN_ACTION_BYTES);
    hasher.update(context.as_bytes());
    Fr::from_be_bytes_mod_order(hasher.finalize().as_bytes())
}

/// [`action_context_hash`] in wire form.
pub fn action_context_hash_bytes(context: &str) -> FieldBytes {
    fr_to_field_bytes(&action_context_hash(context))
}

/// `Hash(secret, action_context_hash, DOMAIN_NULLIFIER)`.
pub fn derive_nullifier_field(secret: Fr, action_context_hash: Fr) -> Fr {
    poseidon_hash_tagged(&[secret, action_context_hash], DomainTag::Nullifier)
}

/// Nullifier of `secret` for one action.
pub fn derive_nullifier(secret: &IdentitySecret, action_context_hash: Fr) -> FieldBytes {
    fr_to_field_bytes(&derive_nullifier_field(secret.to_field(), action_context_hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_std::rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_same_inputs_same_nullifier() {
        let mut rng = StdRng::seed_from_u64(3);
        let secret = IdentitySecret::random(&mut rng);
        let ach = action_context_hash("petition-42");

        let n1 = derive_nullifier(&secret, ach);
        let n2 = derive_nullifier(&secret, ach);
        assert_eq!(n1.as_bytes(), n2.as_bytes());
    }

    #[test]
    fn test_different_action_different_nullifier() {
        let mut rng = StdRng::seed_from_u64(4);
        let secret = IdentitySecret::random(&mut rng);

        let n1 = derive_nullifier(&secret, action_context_hash("petition-42"));
        let n2 = derive_nullifier(&secret, action_context_hash("petition-43"));
        assert_ne!(n1, n2);
    }

    #[test]
    fn test_different_identity_different_nullifier() {
        let mut rng = StdRng::seed_from_u64(5);
        let a = IdentitySecret::random(&mut rng);
        let b = IdentitySecret::random(&mut rng);
        let ach = action_context_hash("petition-42");
        assert_ne!(derive_nullifier(&a, ach), derive_nullifier(&b, ach));
    }

    #[test]
    fn test_nullifier_unrelated_to_commitment() {
        let mut rng = StdRng::seed_from_u64(6);
        let secret = IdentitySecret::random(&mut rng);
        let commitment = crate::commitment::derive_commitment(&secret);
        let nullifier = derive_nullifier(&secret, action_context_hash("petition-42"));
        assert_ne!(commitment, nullifier);
    }

    #[test]
    fn test_action_hash_is_canonical() {
        for ctx in ["", "petition-42", "a much longer action context string"] {
            assert!(action_context_hash_bytes(ctx).is_canonical());
        }
        assert_ne!(action_context_hash("a"), action_context_hash("b"));
    }
}
