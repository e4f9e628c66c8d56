//! Minimal acyclic finite-state automaton (MA-FSA) over sorted keys.
//!
//! Keys are inserted in strictly ascending order and the builder folds
//! equivalent suffixes together as it goes, so the finished graph is minimal.
//! The finished automaton is only usable through its byte encoding:
//! [`MafsaBuilder::to_bytes`] writes it, [`MinTree::decode`] reads it back
//! into a traversable form that also knows, for every node, how many keys
//! lie beneath it. Those counts give each key a rank equal to its position
//! in sorted order, which is what lets a parallel table hold one value per
//! key.
//!
//! Blob layout:
//!
//! ```text
//! "MAFS" | version: u8 | node_count: varint
//! node*:  flags: u8 (bit 0 = accepting) | edge_count: varint
//!         edge*: codepoint: varint | target: varint
//! ```
//!
//! Nodes are written in topological order with the root first, so every edge
//! points at a strictly later node. Edges are sorted by codepoint.

use crate::encoding::{encode_varint, Cursor};
use crate::error::{Result, StoreError};
use std::collections::HashMap;

const MAGIC: &[u8; 4] = b"MAFS";

/// Version of the automaton blob layout.
pub(crate) const MAFSA_FORMAT_VERSION: u8 = 1;

const FLAG_FINAL: u8 = 0x01;

const ROOT: usize = 0;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
struct BuildNode {
    is_final: bool,
    edges: Vec<(char, usize)>,
}

/// Incremental builder for a minimal automaton.
#[derive(Debug)]
pub(crate) struct MafsaBuilder {
    nodes: Vec<BuildNode>,
    register: HashMap<BuildNode, usize>,
    /// Path of the last inserted key that has not been minimized yet:
    /// (parent, label, child) per character.
    unchecked: Vec<(usize, char, usize)>,
    previous: Option<String>,
    keys: usize,
    finished: bool,
}

impl Default for MafsaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MafsaBuilder {
    pub(crate) fn new() -> Self {
        Self {
            nodes: vec![BuildNode::default()],
            register: HashMap::new(),
            unchecked: Vec::new(),
            previous: None,
            keys: 0,
            finished: false,
        }
    }

    /// Number of keys inserted so far.
    pub(crate) fn len(&self) -> usize {
        self.keys
    }

    /// Inserts `key`, which must sort strictly after the previous key.
    pub(crate) fn insert(&mut self, key: &str) -> Result<()> {
        if self.finished {
            return Err(StoreError::Encoding(
                "insert into a finished automaton".to_string(),
            ));
        }

        let common = match &self.previous {
            Some(prev) => {
                if key <= prev.as_str() {
                    return Err(StoreError::UnsortedInsert {
                        previous: prev.clone(),
                        key: key.to_string(),
                    });
                }
                prev.chars()
                    .zip(key.chars())
                    .take_while(|(a, b)| a == b)
                    .count()
            }
            None => 0,
        };

        self.minimize(common);

        let mut node = self
            .unchecked
            .last()
            .map(|&(_, _, child)| child)
            .unwrap_or(ROOT);
        for ch in key.chars().skip(common) {
            let child = self.nodes.len();
            self.nodes.push(BuildNode::default());
            self.nodes[node].edges.push((ch, child));
            self.unchecked.push((node, ch, child));
            node = child;
        }
        self.nodes[node].is_final = true;

        self.previous = Some(key.to_string());
        self.keys += 1;
        Ok(())
    }

    /// Closes construction, folding the remaining unchecked suffix.
    pub(crate) fn finish(&mut self) {
        self.minimize(0);
        self.finished = true;
    }

    /// Replaces unchecked nodes deeper than `down_to` with registered
    /// equivalents, or registers them.
    fn minimize(&mut self, down_to: usize) {
        while self.unchecked.len() > down_to {
            let Some((parent, label, child)) = self.unchecked.pop() else {
                break;
            };
            match self.register.get(&self.nodes[child]) {
                Some(&existing) => {
                    // The child is always the parent's most recent edge.
                    if let Some(edge) = self.nodes[parent].edges.last_mut() {
                        debug_assert_eq!(edge.0, label);
                        edge.1 = existing;
                    }
                }
                None => {
                    self.register.insert(self.nodes[child].clone(), child);
                }
            }
        }
    }

    /// Encodes the finished automaton.
    pub(crate) fn to_bytes(&self) -> Result<Vec<u8>> {
        if !self.finished {
            return Err(StoreError::Encoding(
                "automaton must be finished before encoding".to_string(),
            ));
        }

        let order = self.topological_order();
        let mut position = vec![usize::MAX; self.nodes.len()];
        for (i, &node) in order.iter().enumerate() {
            position[node] = i;
        }

        let mut out = Vec::with_capacity(8 + order.len() * 4);
        out.extend_from_slice(MAGIC);
        out.push(MAFSA_FORMAT_VERSION);
        encode_varint(order.len() as u64, &mut out);

        for &node in &order {
            let node = &self.nodes[node];
            out.push(if node.is_final { FLAG_FINAL } else { 0 });
            encode_varint(node.edges.len() as u64, &mut out);
            for &(label, target) in &node.edges {
                let target = position[target];
                if target == usize::MAX {
                    return Err(StoreError::Encoding(
                        "edge points outside the reachable graph".to_string(),
                    ));
                }
                encode_varint(label as u64, &mut out);
                encode_varint(target as u64, &mut out);
            }
        }

        Ok(out)
    }

    /// Reachable nodes, parents before children, root first.
    fn topological_order(&self) -> Vec<usize> {
        let mut visited = vec![false; self.nodes.len()];
        let mut postorder = Vec::new();
        let mut stack = vec![(ROOT, 0usize)];
        visited[ROOT] = true;

        while let Some(top) = stack.last_mut() {
            let (node, next) = *top;
            if next < self.nodes[node].edges.len() {
                top.1 += 1;
                let child = self.nodes[node].edges[next].1;
                if !visited[child] {
                    visited[child] = true;
                    stack.push((child, 0));
                }
            } else {
                postorder.push(node);
                stack.pop();
            }
        }

        postorder.reverse();
        postorder
    }
}

#[derive(Debug, Clone)]
struct Node {
    is_final: bool,
    edges: Vec<(char, u32)>,
    /// Accepted keys strictly below this node.
    below: u64,
}

/// Where a traversal ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Traversal {
    /// Rank of the first key strictly below the end node.
    pub(crate) rank: u64,
    /// Number of keys strictly below the end node.
    pub(crate) below: u64,
    /// Whether the traversed string is itself an accepted key.
    pub(crate) is_final: bool,
}

/// Decoded, read-only automaton.
#[derive(Debug, Clone)]
pub(crate) struct MinTree {
    nodes: Vec<Node>,
}

impl MinTree {
    /// Decodes a blob produced by [`MafsaBuilder::to_bytes`].
    ///
    /// Every structural property the traversal relies on is checked, so a
    /// corrupt blob is reported here rather than at query time.
    pub(crate) fn decode(bytes: &[u8]) -> Result<Self> {
        let mut cur = Cursor::new(bytes);

        if cur.read_bytes(MAGIC.len()) != Some(&MAGIC[..]) {
            return Err(StoreError::corrupt("automaton: invalid magic bytes"));
        }
        let version = cur
            .read_u8()
            .ok_or_else(|| StoreError::corrupt("automaton: missing version"))?;
        if version != MAFSA_FORMAT_VERSION {
            return Err(StoreError::VersionMismatch {
                found: version as u32,
                expected: MAFSA_FORMAT_VERSION as u32,
            });
        }

        let count = cur
            .read_varint()
            .ok_or_else(|| StoreError::corrupt("automaton: missing node count"))?;
        // Each node takes at least two bytes.
        let remaining = (bytes.len() - cur.position()) as u64;
        if count == 0 || count > remaining / 2 {
            return Err(StoreError::corrupt(format!(
                "automaton: implausible node count {}",
                count
            )));
        }
        let count = count as usize;

        let mut nodes = Vec::with_capacity(count);
        for i in 0..count {
            let flags = cur
                .read_u8()
                .ok_or_else(|| StoreError::corrupt("automaton: truncated node"))?;
            if flags & !FLAG_FINAL != 0 {
                return Err(StoreError::corrupt(format!(
                    "automaton: node {} has unknown flags {:#04x}",
                    i, flags
                )));
            }

            let edge_count = cur
                .read_varint()
                .ok_or_else(|| StoreError::corrupt("automaton: truncated edge count"))?;
            let remaining = (bytes.len() - cur.position()) as u64;
            if edge_count > remaining / 2 {
                return Err(StoreError::corrupt(format!(
                    "automaton: node {} claims {} edges",
                    i, edge_count
                )));
            }

            let mut edges = Vec::with_capacity(edge_count as usize);
            for _ in 0..edge_count {
                let label = cur
                    .read_varint()
                    .and_then(|v| u32::try_from(v).ok())
                    .and_then(char::from_u32)
                    .ok_or_else(|| StoreError::corrupt("automaton: invalid edge label"))?;
                let target = cur
                    .read_varint()
                    .ok_or_else(|| StoreError::corrupt("automaton: truncated edge target"))?;

                if target <= i as u64 || target >= count as u64 {
                    return Err(StoreError::corrupt(format!(
                        "automaton: node {} has edge to {}",
                        i, target
                    )));
                }
                if let Some(&(prev, _)) = edges.last() {
                    if label <= prev {
                        return Err(StoreError::corrupt(format!(
                            "automaton: node {} edges out of order",
                            i
                        )));
                    }
                }
                edges.push((label, target as u32));
            }

            nodes.push(Node {
                is_final: flags & FLAG_FINAL != 0,
                edges,
                below: 0,
            });
        }

        if !cur.is_empty() {
            return Err(StoreError::corrupt("automaton: trailing bytes"));
        }

        // Children come after parents, so a reverse sweep sees every child
        // total before its parent needs it. Totals must fit in u64, which
        // bounds every traversal rank too.
        for i in (0..nodes.len()).rev() {
            let mut below = 0u64;
            for &(_, target) in &nodes[i].edges {
                let child = &nodes[target as usize];
                below = child
                    .below
                    .checked_add(child.is_final as u64)
                    .and_then(|n| below.checked_add(n))
                    .ok_or_else(|| StoreError::corrupt("automaton: key count overflows"))?;
            }
            nodes[i].below = below;
        }
        let root = &nodes[ROOT];
        if root.below.checked_add(root.is_final as u64).is_none() {
            return Err(StoreError::corrupt("automaton: key count overflows"));
        }

        Ok(Self { nodes })
    }

    /// Total number of accepted keys.
    pub(crate) fn len(&self) -> u64 {
        let root = &self.nodes[ROOT];
        root.below + root.is_final as u64
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of nodes in the decoded graph.
    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Follows `key` from the root.
    ///
    /// Returns `None` when no path spells `key`, and always for an empty
    /// automaton.
    pub(crate) fn indexed_traverse(&self, key: &str) -> Option<Traversal> {
        if self.is_empty() {
            return None;
        }

        let mut node = &self.nodes[ROOT];
        let mut rank = 0u64;
        for ch in key.chars() {
            if node.is_final {
                rank += 1;
            }
            let pos = node.edges.binary_search_by(|e| e.0.cmp(&ch)).ok()?;
            for &(_, target) in &node.edges[..pos] {
                let sibling = &self.nodes[target as usize];
                rank += sibling.below + sibling.is_final as u64;
            }
            node = &self.nodes[node.edges[pos].1 as usize];
        }
        if node.is_final {
            rank += 1;
        }

        Some(Traversal {
            rank,
            below: node.below,
            is_final: node.is_final,
        })
    }

    /// Exact-match rank of `key`, if it is accepted.
    pub(crate) fn index_of(&self, key: &str) -> Option<u64> {
        let t = self.indexed_traverse(key)?;
        t.is_final.then(|| t.rank - 1)
    }
}
