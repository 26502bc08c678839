//! Fixed-depth sparse commitment trees.
//!
//! Every ledger in the protocol (rounds, per-round tickets, bank) is a sparse
//! Merkle tree of depth [TREE_DEPTH] over 32-byte leaves. A [SparseTreeWitness]
//! carries the siblings along one leaf's path and recomputes the root for any
//! assumed leaf value; a [SparseTree] keeps the populated nodes in memory and
//! hands out witnesses.
//!
//! ## Layout
//! ```text
//! level 20                 root
//!                        /      \
//!   ...               ...        ...
//! level 0   leaf[0] leaf[1] ... leaf[2^20 - 1]
//! ```
//! Bit `i` of a key says whether the running node is the right (1) or left (0)
//! child at level `i`. Internal nodes are `H(NODE_TAG, left || right)`.

use bytes::{Buf, BufMut};
use commonware_codec::{Error, FixedSize, Read, ReadExt, Write};
use commonware_cryptography::sha256::Digest;
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

use crate::{hash, NODE_TAG, TREE_CAPACITY, TREE_DEPTH};

#[derive(Debug, ThisError, Clone, PartialEq, Eq)]
pub enum WitnessError {
    #[error("key out of range (key={key}, capacity={capacity})")]
    KeyOutOfRange { key: u64, capacity: u64 },
    #[error("invalid witness depth (got={got}, expected={expected})")]
    InvalidDepth { got: usize, expected: usize },
}

/// Hash two children into their parent.
pub fn hash_node(left: &Digest, right: &Digest) -> Digest {
    hash::tagged(NODE_TAG, &[left.as_ref(), right.as_ref()])
}

/// The placeholder held by an unused ticket slot.
pub fn zero_leaf() -> Digest {
    Digest::from([0u8; 32])
}

/// Encode a pot total as a leaf (big-endian in the low 8 bytes).
pub fn amount_leaf(amount: u64) -> Digest {
    let mut bytes = [0u8; 32];
    bytes[24..].copy_from_slice(&amount.to_be_bytes());
    Digest::from(bytes)
}

/// Decode a leaf written by [amount_leaf].
pub fn leaf_amount(leaf: &Digest) -> Option<u64> {
    let bytes: &[u8] = leaf.as_ref();
    if bytes[..24].iter().any(|b| *b != 0) {
        return None;
    }
    let mut amount = [0u8; 8];
    amount.copy_from_slice(&bytes[24..]);
    Some(u64::from_be_bytes(amount))
}

/// Roots of empty subtrees for every level, starting from `default_leaf`.
///
/// `roots[0]` is the leaf itself and `roots[TREE_DEPTH]` is the root of a tree
/// where every slot holds `default_leaf`.
pub fn empty_roots(default_leaf: Digest) -> Vec<Digest> {
    let mut roots = Vec::with_capacity(TREE_DEPTH + 1);
    roots.push(default_leaf);
    for level in 0..TREE_DEPTH {
        let below = roots[level];
        roots.push(hash_node(&below, &below));
    }
    roots
}

/// Reject keys outside the tree.
pub fn check_key(key: u64) -> Result<(), WitnessError> {
    if key >= TREE_CAPACITY {
        return Err(WitnessError::KeyOutOfRange {
            key,
            capacity: TREE_CAPACITY,
        });
    }
    Ok(())
}

/// Path proof for a single slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SparseTreeWitness {
    key: u64,
    siblings: Vec<Digest>,
}

impl SparseTreeWitness {
    pub fn new(key: u64, siblings: Vec<Digest>) -> Result<Self, WitnessError> {
        check_key(key)?;
        if siblings.len() != TREE_DEPTH {
            return Err(WitnessError::InvalidDepth {
                got: siblings.len(),
                expected: TREE_DEPTH,
            });
        }
        Ok(Self { key, siblings })
    }

    pub fn key(&self) -> u64 {
        self.key
    }

    /// Siblings ordered from the leaf level upwards.
    pub fn siblings(&self) -> &[Digest] {
        &self.siblings
    }

    /// Recompute the root assuming the slot holds `leaf`, and return it with
    /// the slot's key.
    pub fn compute_root_and_key(&self, leaf: &Digest) -> (Digest, u64) {
        let mut node = *leaf;
        let mut index = self.key;
        for sibling in &self.siblings {
            node = if index & 1 == 0 {
                hash_node(&node, sibling)
            } else {
                hash_node(sibling, &node)
            };
            index >>= 1;
        }
        (node, self.key)
    }
}

impl Write for SparseTreeWitness {
    fn write(&self, writer: &mut impl BufMut) {
        self.key.write(writer);
        for sibling in &self.siblings {
            sibling.write(writer);
        }
    }
}

impl Read for SparseTreeWitness {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let key = u64::read(reader)?;
        if key >= TREE_CAPACITY {
            return Err(Error::Invalid("SparseTreeWitness", "key out of range"));
        }
        let mut siblings = Vec::with_capacity(TREE_DEPTH);
        for _ in 0..TREE_DEPTH {
            siblings.push(Digest::read(reader)?);
        }
        Ok(Self { key, siblings })
    }
}

impl FixedSize for SparseTreeWitness {
    const SIZE: usize = u64::SIZE + TREE_DEPTH * Digest::SIZE;
}

/// In-memory sparse tree.
///
/// Only nodes that differ from the empty subtree at their level are stored.
#[derive(Clone, Debug)]
pub struct SparseTree {
    empty: Vec<Digest>,
    nodes: BTreeMap<(usize, u64), Digest>,
}

impl SparseTree {
    pub fn new(default_leaf: Digest) -> Self {
        Self {
            empty: empty_roots(default_leaf),
            nodes: BTreeMap::new(),
        }
    }

    /// Tree of ticket commitments for one round (empty slots hold [zero_leaf]).
    pub fn tickets() -> Self {
        Self::new(zero_leaf())
    }

    /// Tree of per-round ticket sub-tree roots. An untouched round holds the
    /// root of an empty ticket tree.
    pub fn rounds() -> Self {
        Self::new(Self::tickets().root())
    }

    /// Tree of per-round pot totals (empty slots hold `amount_leaf(0)`).
    pub fn bank() -> Self {
        Self::new(amount_leaf(0))
    }

    fn node(&self, level: usize, index: u64) -> Digest {
        self.nodes
            .get(&(level, index))
            .copied()
            .unwrap_or(self.empty[level])
    }

    pub fn default_leaf(&self) -> Digest {
        self.empty[0]
    }

    pub fn root(&self) -> Digest {
        self.node(TREE_DEPTH, 0)
    }

    pub fn leaf(&self, key: u64) -> Result<Digest, WitnessError> {
        check_key(key)?;
        Ok(self.node(0, key))
    }

    /// Write `leaf` at `key` and update every ancestor.
    pub fn set(&mut self, key: u64, leaf: Digest) -> Result<(), WitnessError> {
        check_key(key)?;
        let mut index = key;
        let mut node = leaf;
        for level in 0..TREE_DEPTH {
            self.store(level, index, node);
            let sibling = self.node(level, index ^ 1);
            node = if index & 1 == 0 {
                hash_node(&node, &sibling)
            } else {
                hash_node(&sibling, &node)
            };
            index >>= 1;
        }
        self.store(TREE_DEPTH, 0, node);
        Ok(())
    }

    fn store(&mut self, level: usize, index: u64, node: Digest) {
        if node == self.empty[level] {
            self.nodes.remove(&(level, index));
        } else {
            self.nodes.insert((level, index), node);
        }
    }

    pub fn witness(&self, key: u64) -> Result<SparseTreeWitness, WitnessError> {
        check_key(key)?;
        let mut index = key;
        let mut siblings = Vec::with_capacity(TREE_DEPTH);
        for level in 0..TREE_DEPTH {
            siblings.push(self.node(level, index ^ 1));
            index >>= 1;
        }
        SparseTreeWitness::new(key, siblings)
    }
}
