//! Fixed-depth incremental Merkle tree
//!
//! The tree follows the incremental Merkle tree used by the session circuit's
//! JavaScript tooling: binary, fixed depth, empty subtrees hashed from a zero
//! leaf, leaves appended left to right. Given the same configuration and the
//! same insertion sequence the root is bit-for-bit reproducible, which is what
//! allows an off-chain tree to match a root registered on-chain.

use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::field::FieldElement;
use crate::hasher::NodeHasher;

/// Depth of the allow-list trees in the deployed session circuit
pub const DEFAULT_ALLOWLIST_DEPTH: usize = 17;

/// Depth of the session claims tree (4 leaves)
pub const DEFAULT_CLAIMS_DEPTH: usize = 2;

/// Shape parameters of an incremental Merkle tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Number of levels between the leaves and the root
    pub depth: usize,
    /// Children per node (only 2 is supported)
    pub arity: usize,
    /// Value of an empty leaf
    pub zero: FieldElement,
}

impl TreeConfig {
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            arity: 2,
            zero: FieldElement::ZERO,
        }
    }

    /// Configuration of the session allow-list trees
    pub fn allowlist() -> Self {
        Self::new(DEFAULT_ALLOWLIST_DEPTH)
    }

    /// Configuration of the session claims tree
    pub fn claims() -> Self {
        Self::new(DEFAULT_CLAIMS_DEPTH)
    }

    /// Maximum number of leaves
    pub fn capacity(&self) -> u64 {
        1u64 << self.depth
    }

    fn validate(&self) -> Result<(), SessionError> {
        if self.arity != 2 {
            return Err(SessionError::InvalidConfig(format!(
                "only binary trees are supported, got arity {}",
                self.arity
            )));
        }
        if self.depth == 0 || self.depth > 32 {
            return Err(SessionError::InvalidConfig(format!(
                "depth must be between 1 and 32, got {}",
                self.depth
            )));
        }
        Ok(())
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self::allowlist()
    }
}

/// Proof that `leaf` sits at `index` under `root`
///
/// `siblings[level]` is the sibling node at `level` (leaf level first) and
/// `path_indices[level]` is 1 when the path node is a right child. A witness
/// describes one tree snapshot; it is stale once the tree grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleWitness {
    pub leaf: FieldElement,
    pub index: usize,
    pub root: FieldElement,
    pub siblings: Vec<FieldElement>,
    pub path_indices: Vec<u8>,
}

impl MerkleWitness {
    /// Canonical all-zero witness of the given depth
    ///
    /// Used for permission dimensions that are inactive for a transaction so
    /// the circuit always receives inputs of the same arity.
    pub fn placeholder(depth: usize) -> Self {
        Self {
            leaf: FieldElement::ZERO,
            index: 0,
            root: FieldElement::ZERO,
            siblings: vec![FieldElement::ZERO; depth],
            path_indices: vec![0; depth],
        }
    }

    pub fn depth(&self) -> usize {
        self.siblings.len()
    }

    /// Recompute the root from the leaf and path
    pub fn compute_root<H: NodeHasher>(&self, hasher: &H) -> Result<FieldElement, SessionError> {
        if self.path_indices.len() != self.siblings.len() {
            return Err(SessionError::WitnessShape {
                expected: self.siblings.len(),
                actual: self.path_indices.len(),
            });
        }
        let mut node = self.leaf;
        for (sibling, bit) in self.siblings.iter().zip(&self.path_indices) {
            node = if *bit == 0 {
                hasher.hash_pair(node, *sibling)?
            } else {
                hasher.hash_pair(*sibling, node)?
            };
        }
        Ok(node)
    }

    /// Replay the witness and compare against its root
    pub fn verify<H: NodeHasher>(&self, hasher: &H) -> bool {
        matches!(self.compute_root(hasher), Ok(root) if root == self.root)
    }
}

/// Append-only binary Merkle tree of fixed depth
#[derive(Debug, Clone)]
pub struct IncrementalMerkleTree<H> {
    config: TreeConfig,
    /// `zeroes[level]` is the root of an empty subtree of height `level`
    zeroes: Vec<FieldElement>,
    /// Non-empty nodes per level, leaves at level 0
    nodes: Vec<Vec<FieldElement>>,
    root: FieldElement,
    hasher: H,
}

impl<H: NodeHasher> IncrementalMerkleTree<H> {
    /// Create an empty tree
    pub fn new(config: TreeConfig, hasher: H) -> Result<Self, SessionError> {
        config.validate()?;

        let mut zeroes = Vec::with_capacity(config.depth + 1);
        let mut zero = config.zero;
        for _ in 0..config.depth {
            zeroes.push(zero);
            zero = hasher.hash_pair(zero, zero)?;
        }
        zeroes.push(zero);

        Ok(Self {
            config,
            root: zero,
            zeroes,
            nodes: vec![Vec::new(); config.depth],
            hasher,
        })
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn depth(&self) -> usize {
        self.config.depth
    }

    pub fn root(&self) -> FieldElement {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn leaves(&self) -> &[FieldElement] {
        &self.nodes[0]
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Append a leaf and return its index
    pub fn insert(&mut self, leaf: FieldElement) -> Result<usize, SessionError> {
        let index = self.len();
        if index as u64 >= self.config.capacity() {
            return Err(SessionError::TreeFull {
                capacity: self.config.capacity(),
            });
        }

        let mut node = leaf;
        let mut position = index;
        for level in 0..self.config.depth {
            if position == self.nodes[level].len() {
                self.nodes[level].push(node);
            } else {
                self.nodes[level][position] = node;
            }

            node = if position % 2 == 0 {
                let right = self.node_or_zero(level, position + 1);
                self.hasher.hash_pair(node, right)?
            } else {
                let left = self.nodes[level][position - 1];
                self.hasher.hash_pair(left, node)?
            };
            position /= 2;
        }

        self.root = node;
        Ok(index)
    }

    /// Index of the first leaf equal to `leaf`
    pub fn index_of(&self, leaf: FieldElement) -> Option<usize> {
        self.nodes[0].iter().position(|l| *l == leaf)
    }

    /// Membership witness for the leaf at `index` against the current root
    pub fn generate_proof(&self, index: usize) -> Result<MerkleWitness, SessionError> {
        let len = self.len();
        if index >= len {
            return Err(SessionError::LeafNotFound { index, len });
        }

        let mut siblings = Vec::with_capacity(self.config.depth);
        let mut path_indices = Vec::with_capacity(self.config.depth);
        let mut position = index;
        for level in 0..self.config.depth {
            siblings.push(self.node_or_zero(level, position ^ 1));
            path_indices.push((position & 1) as u8);
            position /= 2;
        }

        Ok(MerkleWitness {
            leaf: self.nodes[0][index],
            index,
            root: self.root,
            siblings,
            path_indices,
        })
    }

    fn node_or_zero(&self, level: usize, position: usize) -> FieldElement {
        self.nodes[level]
            .get(position)
            .copied()
            .unwrap_or(self.zeroes[level])
    }
}
