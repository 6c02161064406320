//! Greedy Huffman tree construction.
//!
//! # Tie-break
//! Pending nodes are ordered by `(weight, sequence)` ascending. Leaves take
//! sequence numbers in ascending character order; each merged parent takes the
//! next unused number. The first node popped becomes the left child. Two runs
//! over the same `FrequencyTable` therefore build the same tree.

use super::FrequencyTable;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Prefix tree node. Children are exclusively owned by their parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Leaf {
        symbol: char,
        weight: u64,
    },
    Internal {
        weight: u64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    pub fn weight(&self) -> u64 {
        match self {
            Node::Leaf { weight, .. } | Node::Internal { weight, .. } => *weight,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// Number of leaves below (and including) this node.
    pub fn leaf_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                Node::Leaf { .. } => count += 1,
                Node::Internal { left, right, .. } => {
                    stack.push(&**left);
                    stack.push(&**right);
                }
            }
        }
        count
    }

    /// Build the tree for `freq` by repeatedly merging the two lightest nodes.
    ///
    /// A table with a single distinct character yields a lone `Leaf` root; the
    /// code table generator assigns it the one-bit code.
    pub fn build(freq: &FrequencyTable) -> Option<Node> {
        let mut heap: BinaryHeap<Pending> = freq
            .iter()
            .enumerate()
            .map(|(seq, (symbol, weight))| Pending {
                weight,
                seq: seq as u64,
                node: Node::Leaf { symbol, weight },
            })
            .collect();
        let mut next_seq = heap.len() as u64;

        while heap.len() > 1 {
            let (Some(left), Some(right)) = (heap.pop(), heap.pop()) else {
                break;
            };
            let weight = left.weight + right.weight;
            heap.push(Pending {
                weight,
                seq: next_seq,
                node: Node::Internal {
                    weight,
                    left: Box::new(left.node),
                    right: Box::new(right.node),
                },
            });
            next_seq += 1;
        }

        heap.pop().map(|p| p.node)
    }
}

/// Heap entry. `Ord` is reversed so `BinaryHeap` pops the lightest node first.
#[derive(Debug)]
struct Pending {
    weight: u64,
    seq: u64,
    node: Node,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.weight == other.weight && self.seq == other.seq
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.weight, other.seq).cmp(&(self.weight, self.seq))
    }
}
