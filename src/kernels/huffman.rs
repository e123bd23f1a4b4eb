//! This module contains the canonical-shape Huffman kernel used by every symbol
//! stream in the catalog.
//!
//! A code is shipped as a compact, self-describing header: a preorder walk of
//! the code tree where a `1` bit places a leaf (taking the next value from the
//! permutation list) and a `0` bit opens an internal node whose left subtree is
//! described before its right one. The same left/right convention later drives
//! decoding: a `0` stream bit selects the left child, a `1` the right.
//!
//! The tree is held in a flat arena of internal nodes and is built with an
//! explicit work stack, so malformed headers cannot blow the call stack. Every
//! way a header can fail to describe one complete binary tree is reported as
//! `SpriteError::DataCorruption`.

use crate::error::SpriteError;
use crate::kernels::bitstream::BitstreamCursor;

//==================================================================================
// 1. Header & Domain Types
//==================================================================================

/// The value range a code may emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolDomain {
    /// Palette-index sized symbols: at most 16 leaves, values below 16.
    Nibble,
    /// Full byte symbols: at most 256 leaves.
    Byte,
}

impl SymbolDomain {
    /// Maximum number of leaves a tree in this domain may hold.
    pub fn max_leaves(self) -> usize {
        match self {
            SymbolDomain::Nibble => 16,
            SymbolDomain::Byte => 256,
        }
    }

    #[inline]
    fn contains(self, value: u8) -> bool {
        match self {
            SymbolDomain::Nibble => value < 16,
            SymbolDomain::Byte => true,
        }
    }
}

/// A serialized code tree, borrowed from the catalog blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HuffmanHeader<'a> {
    shape: &'a [u8],
    shape_bits: usize,
    permutation: &'a [u8],
}

impl<'a> HuffmanHeader<'a> {
    /// Wraps raw header parts. `shape` is MSB-first and byte padded; only its
    /// first `shape_bits` bits are meaningful.
    pub fn new(
        shape: &'a [u8],
        shape_bits: usize,
        permutation: &'a [u8],
    ) -> Result<Self, SpriteError> {
        if shape_bits > shape.len() * 8 {
            return Err(SpriteError::corrupt(format!(
                "Huffman header declares {} shape bits but carries only {} bytes",
                shape_bits,
                shape.len()
            )));
        }
        Ok(Self {
            shape,
            shape_bits,
            permutation,
        })
    }

    pub fn shape(&self) -> &'a [u8] {
        self.shape
    }

    pub fn shape_bits(&self) -> usize {
        self.shape_bits
    }

    pub fn permutation(&self) -> &'a [u8] {
        self.permutation
    }
}

//==================================================================================
// 2. The Tree Arena
//==================================================================================

/// One child slot of an internal node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Branch {
    Leaf(u8),
    Node(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Node {
    left: Branch,
    right: Branch,
}

impl Node {
    // Placeholder until the build loop fills both slots.
    const EMPTY: Node = Node {
        left: Branch::Leaf(0),
        right: Branch::Leaf(0),
    };
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Left,
    Right,
}

/// A decoding tree built once per header and reused for every symbol of its
/// stream.
///
/// Child indices always point further into the arena than their parent, so a
/// walk from the root visits each node at most once and must end on a leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanTree {
    nodes: Vec<Node>,
    /// Set when the whole code is a single leaf; decoding it reads no bits.
    single: Option<u8>,
    leaves: usize,
}

impl HuffmanTree {
    /// Builds the decoding tree described by `header`.
    pub fn build(header: &HuffmanHeader<'_>, domain: SymbolDomain) -> Result<Self, SpriteError> {
        let permutation = header.permutation();
        if permutation.len() > domain.max_leaves() {
            return Err(SpriteError::corrupt(format!(
                "Huffman header lists {} leaves, domain allows at most {}",
                permutation.len(),
                domain.max_leaves()
            )));
        }
        let max_internal = domain.max_leaves() - 1;

        let mut shape = BitstreamCursor::new(header.shape());
        let mut leaves = permutation.iter().copied();
        let mut take_leaf = || -> Result<u8, SpriteError> {
            let value = leaves.next().ok_or_else(|| {
                SpriteError::corrupt("Huffman permutation exhausted before the tree was complete")
            })?;
            if !domain.contains(value) {
                return Err(SpriteError::corrupt(format!(
                    "Huffman leaf value {} is outside the {:?} domain",
                    value, domain
                )));
            }
            Ok(value)
        };

        let tree = if next_shape_bit(&mut shape, header.shape_bits())? {
            HuffmanTree {
                nodes: Vec::new(),
                single: Some(take_leaf()?),
                leaves: 1,
            }
        } else {
            let mut nodes = vec![Node::EMPTY];
            let mut leaf_count = 0usize;
            // Pending child slots; the left slot sits on top so the left
            // subtree is always consumed first, matching the preorder shape.
            let mut pending: Vec<(u8, Side)> = vec![(0, Side::Right), (0, Side::Left)];

            while let Some((parent, side)) = pending.pop() {
                let branch = if next_shape_bit(&mut shape, header.shape_bits())? {
                    leaf_count += 1;
                    Branch::Leaf(take_leaf()?)
                } else {
                    if nodes.len() >= max_internal {
                        return Err(SpriteError::corrupt(format!(
                            "Huffman shape opens more than {} internal nodes",
                            max_internal
                        )));
                    }
                    let index = nodes.len() as u8;
                    nodes.push(Node::EMPTY);
                    pending.push((index, Side::Right));
                    pending.push((index, Side::Left));
                    Branch::Node(index)
                };

                let node = &mut nodes[parent as usize];
                match side {
                    Side::Left => node.left = branch,
                    Side::Right => node.right = branch,
                }
            }

            HuffmanTree {
                nodes,
                single: None,
                leaves: leaf_count,
            }
        };

        if shape.position() != header.shape_bits() {
            return Err(SpriteError::corrupt(format!(
                "Huffman shape has {} trailing bits after a complete tree",
                header.shape_bits() - shape.position()
            )));
        }
        if tree.leaves != permutation.len() {
            return Err(SpriteError::corrupt(format!(
                "Huffman tree uses {} of {} permutation entries",
                tree.leaves,
                permutation.len()
            )));
        }

        Ok(tree)
    }

    /// Decodes one symbol, consuming exactly its code bits from `cursor`.
    #[inline]
    pub fn decode(&self, cursor: &mut BitstreamCursor<'_>) -> Result<u8, SpriteError> {
        if let Some(symbol) = self.single {
            return Ok(symbol);
        }
        let mut node = &self.nodes[0];
        loop {
            let branch = if cursor.read_bit()? {
                node.right
            } else {
                node.left
            };
            match branch {
                Branch::Leaf(symbol) => return Ok(symbol),
                Branch::Node(index) => node = &self.nodes[index as usize],
            }
        }
    }

    /// Number of distinct symbols the code can emit.
    pub fn leaf_count(&self) -> usize {
        self.leaves
    }
}

fn next_shape_bit(shape: &mut BitstreamCursor<'_>, shape_bits: usize) -> Result<bool, SpriteError> {
    if shape.position() >= shape_bits {
        return Err(SpriteError::corrupt(
            "Huffman shape bits ended before the tree was complete",
        ));
    }
    shape.read_bit()
}

//==================================================================================
// 3. Unit Tests
//==================================================================================
