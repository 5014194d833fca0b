//! This library reads the encrypted, trie-indexed paired archives found in several game asset packs.
//!
//! # Paired Archive Format Documentation
//!
//! An archive is split across two files: an **index** file holding an encrypted header with a
//! string table, a node table and a file table, and a **data** file holding nothing but the
//! payloads. File names are not stored directly. They are recovered from a trie encoded in the
//! node table.
//!
//! ## Index File Structure
//!
//! | Offset (bytes) | Field                  | Description                                                |
//! |----------------|------------------------|------------------------------------------------------------|
//! | 0x0000         | Reserved               | 4 bytes: Magic or reserved value, ignored                  |
//! | 0x0004         | Reserved               | 4 bytes: Ignored                                           |
//! | 0x0008         | Node Count             | 4 bytes: Number of records in the node table               |
//! | 0x000C         | String Table Offset    | 4 bytes: Offset to the string table                        |
//! | 0x0010         | String Table Length    | 4 bytes: Length of the string table in bytes               |
//! | 0x0014         | Node Table Offset      | 4 bytes: Offset to the node table                          |
//! | 0x0018         | Node Table Length      | 4 bytes: Length of the node table in bytes                 |
//! | 0x001C         | File Table Offset      | 4 bytes: Offset to the file table                          |
//! | 0x0020         | File Count             | 4 bytes: Number of records in the file table               |
//! | 0x0024         | Key Slot               | 4 bytes: Stream key XOR `0xF3F35353`                       |
//!
//! ### Encryption
//!
//! The key is recovered as `key_slot ^ 0xF3F35353`, after which the key slot reads as the
//! sentinel `0xF3F35353`. Every 32-bit word of the string table and of the node table is XORed
//! with that single key. The file table and the header fields are stored in the clear.
//!
//! ### Node Table
//!
//! | Offset (bytes) | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 0x0000         | Next                   | 4 bytes: Child base, or negated string table offset     |
//! | 0x0004         | Prev                   | 4 bytes: Index of the parent node                       |
//!
//! - **Branch** nodes have `next >= 0`. The child reached with character `c` is `next ^ c`, and
//!   that child must name the branch as its parent.
//! - **Leaf** nodes have `next < 0`. `-next` is the offset of a null-terminated path suffix in the
//!   string table, immediately followed by a 4-byte file id.
//! - Node 0 is the root.
//!
//! ### File Table
//!
//! | Offset (bytes) | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 0x0000         | Data Offset            | 8 bytes: Offset of the payload in the data file         |
//! | 0x0008         | Compressed Size        | 4 bytes: Size of the payload as stored                  |
//! | 0x000C         | Uncompressed Size      | 4 bytes: Size of the payload once decoded               |
//! | 0x0010         | Codec                  | 4 bytes: Storage method of the payload                  |
//! | 0x0014         | Id                     | 4 bytes: Identifier of the file                         |
//!
//! ## Data File
//!
//! Payloads are stored back to back. Depending on the codec:
//!   - `0`: Stored, the payload is the raw bytes at the data offset
//!   - `2`: Block, a zstd frame preceded by a sub-header (`0x30` bytes in known archives, see
//!     [`read::ArchiveOptions`])
//!
//! ## Additional Information
//!
//! - **Endianness**: Little-endian for all multi-byte integers
//! - **Path matching**: case-insensitive
//!

pub mod cipher;
pub mod codec;
pub mod error;
pub mod read;
pub mod table;
pub mod trie;
pub mod types;

pub use codec::Codec;
pub use read::{Archive, ArchiveOptions};
pub use types::{FileDescriptor, FileId};
