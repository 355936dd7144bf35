//! Fixed-depth Poseidon Merkle tree.
//!
//! Only the populated prefix of each level is stored; everything to the right
//! of it is the precomputed empty subtree of that level. Inserting or
//! updating a leaf rehashes one node per level.

use ark_bn254::Fr;
use atlas_types::{AtlasError, AtlasResult, MAX_DISTRICT_DEPTH};
use std::sync::OnceLock;

use crate::domain::DomainTag;
use crate::poseidon::poseidon_hash_tagged;

/// Deepest tree this module will build.
pub const MAX_TREE_DEPTH: usize = MAX_DISTRICT_DEPTH;

static ZERO_HASHES: OnceLock<Vec<Fr>> = OnceLock::new();

/// The canonical empty leaf, `Hash(DOMAIN_EMPTY_LEAF)`.
pub fn empty_leaf() -> Fr {
    zero_hash(0)
}

/// Root of an all-empty subtree of the given height.
pub fn zero_hash(level: usize) -> Fr {
    let zeros = ZERO_HASHES.get_or_init(|| {
        let mut zeros = Vec::with_capacity(MAX_TREE_DEPTH + 1);
        let mut current = poseidon_hash_tagged(&[], DomainTag::EmptyLeaf);
        zeros.push(current);
        for _ in 0..MAX_TREE_DEPTH {
            current = hash_pair(current, current);
            zeros.push(current);
        }
        zeros
    });
    zeros[level]
}

/// Internal node, `Hash(left, right, DOMAIN_PAIR)`.
pub fn hash_pair(left: Fr, right: Fr) -> Fr {
    poseidon_hash_tagged(&[left, right], DomainTag::Pair)
}

/// Walk from `leaf` to the root. Bit `k` of `index` set means the node at
/// level `k` is a right child.
pub fn compute_root(leaf: Fr, index: u64, siblings: &[Fr]) -> Fr {
    let mut current = leaf;
    for (level, sibling) in siblings.iter().enumerate() {
        current = if (index >> level) & 1 == 1 {
            hash_pair(*sibling, current)
        } else {
            hash_pair(current, *sibling)
        };
    }
    current
}

/// Selector bits of `index`, lowest level first.
pub fn index_bits(index: u64, depth: usize) -> Vec<bool> {
    (0..depth).map(|level| (index >> level) & 1 == 1).collect()
}

/// A Merkle tree of fixed depth with empty-leaf padding.
#[derive(Clone, Debug)]
pub struct FixedMerkleTree {
    depth: usize,
    // layers[0] holds leaves, layers[depth] holds the root once anything is set
    layers: Vec<Vec<Fr>>,
}

impl FixedMerkleTree {
    /// Empty tree of `depth` levels.
    pub fn new(depth: usize) -> AtlasResult<Self> {
        if depth == 0 || depth > MAX_TREE_DEPTH {
            return Err(AtlasError::Validation(format!(
                "tree depth must be 1..={}, got {}",
                MAX_TREE_DEPTH, depth
            )));
        }
        Ok(Self {
            depth,
            layers: vec![Vec::new(); depth + 1],
        })
    }

    /// Build a tree from leaves in index order.
    pub fn from_leaves(depth: usize, leaves: &[Fr]) -> AtlasResult<Self> {
        let mut tree = Self::new(depth)?;
        if leaves.len() as u64 > tree.capacity() {
            return Err(AtlasError::CapacityExceeded(format!(
                "{} leaves do not fit a depth-{} tree",
                leaves.len(),
                depth
            )));
        }
        tree.layers[0] = leaves.to_vec();
        for level in 0..depth {
            let below = &tree.layers[level];
            let next: Vec<Fr> = below
                .chunks(2)
                .map(|pair| hash_pair(pair[0], pair.get(1).copied().unwrap_or(zero_hash(level))))
                .collect();
            tree.layers[level + 1] = next;
        }
        Ok(tree)
    }

    /// Number of levels.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of populated leaf slots.
    pub fn len(&self) -> u64 {
        self.layers[0].len() as u64
    }

    /// Whether no leaf has been set.
    pub fn is_empty(&self) -> bool {
        self.layers[0].is_empty()
    }

    /// Maximum number of leaves.
    pub fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    /// Current root.
    pub fn root(&self) -> Fr {
        self.node(self.depth, 0)
    }

    /// Leaf at `index`, if populated.
    pub fn leaf(&self, index: u64) -> Option<Fr> {
        self.layers[0].get(index as usize).copied()
    }

    /// Populated leaves in index order.
    pub fn leaves(&self) -> &[Fr] {
        &self.layers[0]
    }

    /// Append a leaf at the next free slot.
    pub fn push(&mut self, leaf: Fr) -> AtlasResult<u64> {
        let index = self.len();
        if index >= self.capacity() {
            return Err(AtlasError::CapacityExceeded(format!(
                "depth-{} tree holds {} leaves",
                self.depth,
                self.capacity()
            )));
        }
        self.set(index, leaf)?;
        Ok(index)
    }

    /// Overwrite a populated leaf, or append when `index == len()`.
    pub fn set(&mut self, index: u64, leaf: Fr) -> AtlasResult<()> {
        if index > self.len() || index >= self.capacity() {
            return Err(AtlasError::Validation(format!(
                "leaf index {} out of range (len {}, capacity {})",
                index,
                self.len(),
                self.capacity()
            )));
        }

        let mut idx = index as usize;
        self.write(0, idx, leaf);
        for level in 0..self.depth {
            let left = self.node(level, (idx & !1) as u64);
            let right = self.node(level, (idx | 1) as u64);
            idx >>= 1;
            let parent = hash_pair(left, right);
            self.write(level + 1, idx, parent);
        }
        Ok(())
    }

    /// Sibling hashes from the leaf level upward.
    pub fn path(&self, index: u64) -> AtlasResult<Vec<Fr>> {
        if index >= self.len() {
            return Err(AtlasError::NotFound(format!(
                "leaf {} not populated (len {})",
                index,
                self.len()
            )));
        }
        let mut siblings = Vec::with_capacity(self.depth);
        let mut idx = index;
        for level in 0..self.depth {
            siblings.push(self.node(level, idx ^ 1));
            idx >>= 1;
        }
        Ok(siblings)
    }

    /// Whether `siblings` lead from `leaf` at `index` to `root`.
    pub fn verify_path(leaf: Fr, index: u64, siblings: &[Fr], root: Fr) -> bool {
        compute_root(leaf, index, siblings) == root
    }

    fn node(&self, level: usize, index: u64) -> Fr {
        self.layers[level]
            .get(index as usize)
            .copied()
            .unwrap_or_else(|| zero_hash(level))
    }

    fn write(&mut self, level: usize, index: usize, value: Fr) {
        let layer = &mut self.layers[level];
        if index < layer.len() {
            layer[index] = value;
        } else {
            layer.push(value);
        }
    }
}
