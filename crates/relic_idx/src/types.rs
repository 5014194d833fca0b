//! Base types for structure of the index file.

use std::borrow::Cow;

use binrw::{BinRead, BinWrite};

use crate::codec::Codec;
use crate::error::Result;

/// Size of the fixed header at the start of the index file
pub const HEADER_SIZE: usize = 40;

/// Size of a single [`Node`] record
pub const NODE_SIZE: usize = 8;

/// Size of a single [`FileRecord`]
pub const FILE_RECORD_SIZE: usize = 24;

/// Word slot of the header holding the encrypted key
pub const KEY_SLOT: usize = 9;

/// Value the key slot holds once the header has been decrypted
pub const KEY_SENTINEL: u32 = 0xF3F3_5353;

/// Identifier of a file, its position in the file table
pub type FileId = usize;

/// Index file header
///
/// All data is stored in little endian format. Only the key slot is encrypted, the remaining
/// fields are readable before decryption.
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct ArchiveHeader {
    /// Magic or reserved word, unused by the reader
    pub reserved: u32,

    /// Unused
    pub field_reserved: i32,

    /// Number of nodes in the node table
    pub node_count: i32,

    /// Offset of the string table from the start of the index file
    pub string_table_offset: i32,

    /// Length of the string table in bytes
    pub string_table_length: i32,

    /// Offset of the node table from the start of the index file
    pub node_table_offset: i32,

    /// Length of the node table in bytes
    pub node_table_length: i32,

    /// Offset of the file table from the start of the index file
    pub file_table_offset: i32,

    /// Number of records in the file table
    pub file_count: i32,

    /// Stream key XORed with [`KEY_SENTINEL`]
    pub key_slot: u32,
}

/// Trie node
///
/// A node with a non-negative `next` is a branch, its children live at `next ^ char`. A node with
/// a negative `next` is a leaf, `-next` is the offset of its suffix in the string table.
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct Node {
    /// Child base for branches, negated string offset for leaves
    pub next: i32,

    /// Index of the parent node
    pub prev: i32,
}

impl Node {
    /// Whether children hang off this node
    pub fn is_branch(&self) -> bool {
        self.next >= 0
    }

    /// Whether this node stores a suffix and file id
    pub fn is_leaf(&self) -> bool {
        self.next < 0 && self.prev >= 0
    }

    /// Offset into the string table of the stored suffix
    pub fn suffix_offset(&self) -> Option<usize> {
        if self.next >= 0 {
            return None;
        }
        self.next
            .checked_neg()
            .and_then(|offset| usize::try_from(offset).ok())
    }
}

/// File table record
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct FileRecord {
    /// Offset of the payload in the data file
    pub offset: i64,

    /// Size of the payload as stored in the data file
    pub compressed_size: i32,

    /// Size of the payload once decoded
    pub uncompressed_size: i32,

    /// Codec tag, see [`Codec`]
    pub codec: i32,

    /// Identifier stored alongside the record
    pub id: i32,
}

/// Structure describing one archived file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileDescriptor {
    /// Position in the file table
    pub index: FileId,
    /// Offset of the record inside the index file
    pub header_offset: i32,
    /// Offset of the payload inside the data file
    pub data_offset: i64,
    /// Stored size of the payload
    pub compressed_size: i32,
    /// Size of the payload once decoded
    pub uncompressed_size: i32,
    /// Raw codec tag
    pub codec_type: i32,
    /// Identifier stored in the record
    pub id: i32,
    /// Path recovered from the trie, if any leaf references this file
    pub filename: Option<String>,
}

impl FileDescriptor {
    pub(crate) fn from_record(index: FileId, header_offset: i32, record: FileRecord) -> Self {
        Self {
            index,
            header_offset,
            data_offset: record.offset,
            compressed_size: record.compressed_size,
            uncompressed_size: record.uncompressed_size,
            codec_type: record.codec,
            id: record.id,
            filename: None,
        }
    }

    /// Get the name of the file
    ///
    /// Files that no trie leaf references are named `unknown_<index>`.
    ///
    /// # Warnings
    ///
    /// It is dangerous to use this name directly when extracting an archive.
    /// It may contain an absolute path (`/etc/shadow`), or break out of the
    /// current directory (`../runtime`).
    pub fn name(&self) -> Cow<'_, str> {
        match &self.filename {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(format!("unknown_{}", self.index)),
        }
    }

    /// Decode the codec tag
    pub fn codec(&self) -> Result<Codec> {
        Codec::try_from(self.codec_type)
    }
}
