//! Domain separation tags.
//!
//! Each tag is an ASCII label mapped into the field by big-endian reduction.
//! Labels are public constants, so reduction is fine here.

use ark_bn254::Fr;
use ark_ff::PrimeField;

/// Label of identity commitments.
pub const DOMAIN_COMMIT: &[u8] = b"shadow-atlas/commitment/v1";

/// Label of internal Merkle nodes.
pub const DOMAIN_PAIR: &[u8] = b"shadow-atlas/node-pair/v1";

/// Label of nullifiers.
pub const DOMAIN_NULLIFIER: &[u8] = b"shadow-atlas/nullifier/v1";

/// Label of the canonical empty leaf.
pub const DOMAIN_EMPTY_LEAF: &[u8] = b"shadow-atlas/empty-leaf/v1";

/// BLAKE3 prefix for action context strings.
pub const DOMAIN_ACTION_BYTES: &[u8] = b"shadow-atlas/action-context/v1";

/// Hash purposes that must never collide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DomainTag {
    /// `H(secret, tag)`
    Commitment,
    /// `H(left, right, tag)`
    Pair,
    /// `H(secret, action_context_hash, tag)`
    Nullifier,
    /// `H(tag)`
    EmptyLeaf,
}

impl DomainTag {
    /// ASCII label.
    pub fn label(&self) -> &'static [u8] {
        match self {
            Self::Commitment => DOMAIN_COMMIT,
            Self::Pair => DOMAIN_PAIR,
            Self::Nullifier => DOMAIN_NULLIFIER,
            Self::EmptyLeaf => DOMAIN_EMPTY_LEAF,
        }
    }

    /// Tag as a field element.
    pub fn to_field(&self) -> Fr {
        Fr::from_be_bytes_mod_order(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_are_distinct() {
        let tags = [
            DomainTag::Commitment,
            DomainTag::Pair,
            DomainTag::Nullifier,
            DomainTag::EmptyLeaf,
        ];
        for (i, a) in tags.iter().enumerate() {
            for b in &tags[i + 1..] {
                assert_ne!(a.to_field(), b.to_field());
            }
        }
    }

    #[test]
    fn test_labels_fit_without_reduction() {
        for label in [DOMAIN_COMMIT, DOMAIN_PAIR, DOMAIN_NULLIFIER, DOMAIN_EMPTY_LEAF] {
            assert!(label.len() < 31);
        }
    }
}
