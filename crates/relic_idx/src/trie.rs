//! Path resolution over the flat node table.
//!
//! The node table encodes a trie without child lists. A branch node's children live at
//! `next ^ char`, and every child records its parent in `prev`. Walking down uses the first
//! relation, walking back up to rebuild a path uses the second:
//!
//! ```text
//! child = nodes[parent].next ^ c
//! c     = child ^ nodes[nodes[child].prev].next
//! ```
//!
//! Leaves store the rest of the path in the string table, followed by the file id. A path that
//! ends on a branch node continues through its `'\0'` edge.

use byteorder::{ByteOrder, LittleEndian};
use indexmap::IndexMap;
use tracing::{debug, instrument, trace, warn};

use crate::error::{Error, Result};
use crate::types::{FileId, Node};

/// Decoded contents of a leaf node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    /// Remainder of the path stored in the string table
    pub suffix: String,
    /// File the path resolves to
    pub file: FileId,
}

/// Follow the edge labelled `c` out of `current`.
pub fn descend(nodes: &[Node], current: usize, c: char) -> Result<usize> {
    let node = nodes.get(current).ok_or(Error::InvalidTrieEdge {
        node: current as i64,
    })?;

    let child = i64::from(node.next ^ c as i32);
    let valid = usize::try_from(child)
        .ok()
        .filter(|&index| index < nodes.len())
        .filter(|&index| i64::from(nodes[index].prev) == current as i64);

    valid.ok_or(Error::InvalidTrieEdge { node: child })
}

/// Step from `current` to its parent, returning the parent and the edge label between them.
pub fn ascend(nodes: &[Node], current: usize) -> Result<(usize, u32)> {
    let invalid = || Error::InvalidTrieEdge {
        node: current as i64,
    };

    let node = nodes.get(current).ok_or_else(invalid)?;
    let parent = usize::try_from(node.prev)
        .ok()
        .filter(|&index| index < nodes.len())
        .ok_or_else(invalid)?;

    let parent_next = nodes[parent].next;
    if parent_next < 0 {
        return Err(invalid());
    }

    let label = u32::try_from(current as i64 ^ i64::from(parent_next)).map_err(|_| invalid())?;
    Ok((parent, label))
}

/// Decode a suffix as UTF-8, falling back to one character per byte
fn decode_suffix(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_owned(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// The node table interpreted as a trie
#[derive(Debug, Clone, Default)]
pub struct TrieIndex {
    nodes: Vec<Node>,
    strings: Vec<u8>,
    file_count: usize,
}

impl TrieIndex {
    /// Build the index over a node table and the string table its leaves point into.
    ///
    /// `file_count` bounds the file ids a leaf may carry.
    pub fn new(nodes: Vec<Node>, strings: Vec<u8>, file_count: usize) -> Self {
        Self {
            nodes,
            strings,
            file_count,
        }
    }

    /// Number of nodes in the trie
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the trie has no nodes at all
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The raw node table
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Decode the suffix and file id stored by the leaf at `index`
    pub fn leaf(&self, index: usize) -> Result<Leaf> {
        let unresolvable = || Error::UnresolvableLeaf { node: index };

        let offset = self
            .nodes
            .get(index)
            .and_then(Node::suffix_offset)
            .ok_or_else(unresolvable)?;
        let tail = self.strings.get(offset..).ok_or_else(unresolvable)?;

        let end = tail.iter().position(|&b| b == 0).ok_or_else(unresolvable)?;
        let id = tail.get(end + 1..end + 5).ok_or_else(unresolvable)?;
        let file = usize::try_from(LittleEndian::read_i32(id))
            .ok()
            .filter(|&file| file < self.file_count)
            .ok_or_else(unresolvable)?;

        Ok(Leaf {
            suffix: decode_suffix(&tail[..end]),
            file,
        })
    }

    /// Resolve a path to the id of the file it names.
    ///
    /// Matching is case-insensitive. Paths that are absent, or that run into a corrupt part of
    /// the node table, resolve to `None`.
    pub fn lookup(&self, path: &str) -> Option<FileId> {
        match self.find(path) {
            Ok(found) => found,
            Err(err) => {
                trace!(path, %err, "lookup stopped");
                None
            }
        }
    }

    fn find(&self, path: &str) -> Result<Option<FileId>> {
        // '\0' only terminates paths, it is never part of one
        if self.nodes.is_empty() || path.contains('\0') {
            return Ok(None);
        }

        let path = path.to_lowercase();
        let mut current = 0;

        for (position, c) in path.char_indices() {
            if !self.nodes[current].is_branch() {
                let leaf = self.leaf(current)?;
                let matched = leaf.suffix.to_lowercase() == path[position..];
                return Ok(matched.then_some(leaf.file));
            }
            current = descend(&self.nodes, current, c)?;
        }

        if self.nodes[current].is_branch() {
            current = descend(&self.nodes, current, '\0')?;
        }

        let leaf = self.leaf(current)?;
        Ok(leaf.suffix.is_empty().then_some(leaf.file))
    }

    /// Rebuild the full path stored by the leaf at `index`.
    pub fn resolve(&self, index: usize) -> Result<(FileId, String)> {
        let unresolvable = || Error::UnresolvableLeaf { node: index };

        if !self.nodes.get(index).is_some_and(Node::is_leaf) {
            return Err(unresolvable());
        }
        let leaf = self.leaf(index)?;

        let mut prefix = Vec::new();
        let mut current = index;
        let mut steps = 0;
        while current != 0 {
            if steps >= self.nodes.len() {
                return Err(unresolvable());
            }
            let (parent, label) = ascend(&self.nodes, current).map_err(|_| unresolvable())?;
            if label != 0 {
                prefix.push(char::from_u32(label).ok_or_else(unresolvable)?);
            }
            current = parent;
            steps += 1;
        }

        let mut path: String = prefix.into_iter().rev().collect();
        path.push_str(&leaf.suffix);
        Ok((leaf.file, path))
    }

    /// Recover the path of every file referenced by a leaf.
    ///
    /// Leaves that cannot be traced back to the root are skipped. When several leaves name the
    /// same file the first one wins. The map is ordered by file id.
    #[instrument(skip(self), fields(nodes = self.nodes.len()))]
    pub fn enumerate_all(&self) -> IndexMap<FileId, String> {
        let mut names = IndexMap::new();

        for index in 0..self.nodes.len() {
            if !self.nodes[index].is_leaf() {
                continue;
            }

            match self.resolve(index) {
                Ok((file, path)) => {
                    if let Some(existing) = names.get(&file) {
                        debug!(file, %path, %existing, "file already named by another leaf");
                        continue;
                    }
                    names.insert(file, path);
                }
                Err(err) => warn!(node = index, %err, "skipping leaf"),
            }
        }

        names.sort_keys();
        debug!("resolved {} file names", names.len());
        names
    }
}
