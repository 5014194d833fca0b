//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent wrapper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// The index file cannot hold the fixed header fields
    #[error("index file is {0} bytes, too short to contain a header")]
    #[diagnostic(help("the header occupies the first 40 bytes of the index file"))]
    HeaderTooShort(usize),

    /// A declared table range does not fit inside the buffer that should contain it
    #[error("{table} table at offset {offset} with length {length} exceeds the index buffer")]
    Truncated {
        /// Which table was being read
        table: &'static str,
        /// Declared offset of the table
        offset: i64,
        /// Declared length of the table in bytes
        length: i64,
    },

    /// A trie edge points outside the node table or back to the wrong parent
    #[error("trie edge into node {node} is inconsistent")]
    InvalidTrieEdge {
        /// The candidate node index
        node: i64,
    },

    /// A leaf node could not be traced back to the root
    #[error("leaf node {node} cannot be resolved to a path")]
    UnresolvableLeaf {
        /// The leaf node index
        node: usize,
    },

    /// A descriptor addresses bytes beyond the end of the data file
    #[error("entry {index} at offset {offset} with size {size} exceeds data file of {len} bytes")]
    OutOfRange {
        /// Position of the entry in the file table
        index: usize,
        /// Declared data offset
        offset: i64,
        /// Declared stored size
        size: i64,
        /// Length of the data file
        len: u64,
    },

    /// The decompressed payload length disagrees with the declared size
    #[error("decompressed {actual} bytes, expected {expected}")]
    SizeMismatch {
        /// Declared uncompressed size
        expected: i64,
        /// Bytes actually produced by the decompressor
        actual: u64,
    },

    /// The descriptor carries a codec tag this library does not know
    #[error("unsupported codec type {0}")]
    UnsupportedCodec(i32),

    /// unable to find requested file
    #[error("unable to find requested file")]
    FileNotFound(#[from] FileNotFoundError),
}

/// Error type to provide further information when a file has not been found
#[derive(Error, Diagnostic, Debug)]
#[error("unable to find requested file")]
pub enum FileNotFoundError {
    /// at index {0}
    #[error("at index {0}")]
    Index(usize),

    /// by name {0}
    #[error("by name {0}")]
    Name(String),
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
