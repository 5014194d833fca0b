//! Builds paired archives in memory for tests and benches.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use binrw::BinWrite;
use relic_idx::cipher;
use relic_idx::types::{ArchiveHeader, FileRecord, Node, HEADER_SIZE, KEY_SENTINEL, NODE_SIZE};

pub const KEY: u32 = 0x1F2E_3D4C;
pub const BLOCK_HEADER_LEN: usize = 0x30;

/// One file to be placed in the archive
#[derive(Debug, Clone)]
pub struct Entry {
    pub path: Option<String>,
    pub codec: i32,
    pub stored: Vec<u8>,
    pub uncompressed_size: i32,
    pub offset: Option<i64>,
}

impl Entry {
    pub fn stored(path: &str, payload: &[u8]) -> Self {
        Self {
            path: Some(path.to_owned()),
            codec: 0,
            stored: payload.to_vec(),
            uncompressed_size: payload.len() as i32,
            offset: None,
        }
    }

    pub fn block(path: &str, payload: &[u8]) -> Self {
        let frame = zstd::encode_all(payload, 3).expect("compress payload");
        Self {
            path: Some(path.to_owned()),
            codec: 2,
            stored: frame,
            uncompressed_size: payload.len() as i32,
            offset: None,
        }
    }

    pub fn unnamed(mut self) -> Self {
        self.path = None;
        self
    }
}

/// Raw bytes of an index file and its data file
pub struct Fixture {
    pub index: Vec<u8>,
    pub data: Vec<u8>,
}

impl Fixture {
    pub fn build(entries: &[Entry]) -> Self {
        let mut data = Vec::new();
        let mut records = Vec::new();
        for (id, entry) in entries.iter().enumerate() {
            let offset = data.len() as i64;
            if entry.codec == 2 {
                data.extend(std::iter::repeat(0xCD).take(BLOCK_HEADER_LEN));
            }
            data.extend_from_slice(&entry.stored);
            records.push(FileRecord {
                offset: entry.offset.unwrap_or(offset),
                compressed_size: entry.stored.len() as i32,
                uncompressed_size: entry.uncompressed_size,
                codec: entry.codec,
                id: id as i32,
            });
        }

        let paths = entries
            .iter()
            .enumerate()
            .filter_map(|(id, e)| e.path.as_ref().map(|p| (p.to_lowercase(), id)))
            .collect::<Vec<_>>();
        let (nodes, mut strings) = layout(&paths);
        while strings.len() % 4 != 0 {
            strings.push(0);
        }

        let string_offset = HEADER_SIZE;
        let node_offset = string_offset + strings.len();
        let node_length = nodes.len() * NODE_SIZE;
        let file_offset = node_offset + node_length;

        let header = ArchiveHeader {
            reserved: 0,
            field_reserved: 0,
            node_count: nodes.len() as i32,
            string_table_offset: string_offset as i32,
            string_table_length: strings.len() as i32,
            node_table_offset: node_offset as i32,
            node_table_length: node_length as i32,
            file_table_offset: file_offset as i32,
            file_count: records.len() as i32,
            key_slot: KEY_SENTINEL,
        };

        let mut index = Cursor::new(Vec::new());
        header.write(&mut index).expect("write header");
        let mut index = index.into_inner();
        index.extend_from_slice(&strings);
        let mut index = Cursor::new(index);
        index.set_position(node_offset as u64);
        for node in &nodes {
            node.write(&mut index).expect("write node");
        }
        for record in &records {
            record.write(&mut index).expect("write record");
        }

        let mut index = index.into_inner();
        cipher::encrypt_in_place(&mut index, KEY);

        Fixture { index, data }
    }

    /// Write the pair into `dir` as `<stem>.idx` and `<stem>.dat`
    pub fn write_to(&self, dir: &Path, stem: &str) -> (PathBuf, PathBuf) {
        let index = dir.join(format!("{stem}.idx"));
        let data = dir.join(format!("{stem}.dat"));
        std::fs::write(&index, &self.index).expect("write index");
        std::fs::write(&data, &self.data).expect("write data");
        (index, data)
    }
}

#[derive(Default)]
struct TrieNode {
    children: BTreeMap<char, TrieNode>,
    file: Option<usize>,
}

impl TrieNode {
    fn paths(&self) -> usize {
        usize::from(self.file.is_some()) + self.children.values().map(TrieNode::paths).sum::<usize>()
    }

    /// Remaining characters and file id of a subtree holding a single path
    fn single(&self) -> (String, usize) {
        let mut suffix = String::new();
        let mut node = self;
        loop {
            if let Some(file) = node.file {
                return (suffix, file);
            }
            let (c, child) = node.children.iter().next().expect("subtree holds a path");
            suffix.push(*c);
            node = child;
        }
    }
}

const EMPTY: Node = Node { next: 0, prev: -1 };

struct Layout {
    nodes: Vec<Node>,
    used: Vec<bool>,
    strings: Vec<u8>,
}

impl Layout {
    fn reserve(&mut self, slot: usize) {
        if slot >= self.nodes.len() {
            self.nodes.resize(slot + 1, EMPTY);
            self.used.resize(slot + 1, false);
        }
        self.used[slot] = true;
    }

    fn is_free(&self, slot: usize) -> bool {
        slot != 0 && !self.used.get(slot).copied().unwrap_or(false)
    }

    fn leaf(&mut self, slot: usize, parent: usize, suffix: &str, file: usize) {
        let offset = self.strings.len() as i32;
        self.strings.extend_from_slice(suffix.as_bytes());
        self.strings.push(0);
        self.strings.extend_from_slice(&(file as i32).to_le_bytes());
        self.nodes[slot] = Node {
            next: -offset,
            prev: parent as i32,
        };
    }

    fn place(&mut self, node: &TrieNode, slot: usize, parent: i32) {
        if slot != 0 && node.paths() == 1 {
            let (suffix, file) = node.single();
            self.leaf(slot, parent as usize, &suffix, file);
            return;
        }

        let mut labels: Vec<char> = node.children.keys().copied().collect();
        if node.file.is_some() {
            labels.push('\0');
        }
        if labels.is_empty() {
            self.nodes[slot] = Node { next: 0, prev: parent };
            return;
        }

        let base = (0usize..)
            .find(|base| labels.iter().all(|&c| self.is_free(base ^ c as usize)))
            .expect("a free base exists");
        self.nodes[slot] = Node {
            next: base as i32,
            prev: parent,
        };
        for &c in &labels {
            self.reserve(base ^ c as usize);
        }

        for &c in &labels {
            let child = base ^ c as usize;
            match node.children.get(&c) {
                Some(subtree) => self.place(subtree, child, slot as i32),
                None => {
                    let file = node.file.expect("terminator carries a file");
                    self.leaf(child, slot, "", file);
                }
            }
        }
    }
}

/// Lay out a trie over `paths`, returning the node table and the string table
pub fn layout(paths: &[(String, usize)]) -> (Vec<Node>, Vec<u8>) {
    let mut root = TrieNode::default();
    for (path, file) in paths {
        let mut node = &mut root;
        for c in path.chars() {
            node = node.children.entry(c).or_default();
        }
        node.file = Some(*file);
    }

    let mut layout = Layout {
        nodes: vec![EMPTY],
        used: vec![true],
        // offset 0 cannot be told apart from a branch
        strings: vec![0xFF],
    };
    layout.place(&root, 0, -1);
    (layout.nodes, layout.strings)
}
