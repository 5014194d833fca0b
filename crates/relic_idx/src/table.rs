//! Slicing the decrypted index buffer into its tables.

use std::io::Cursor;
use std::ops::Range;

use binrw::BinRead;
use tracing::{debug, instrument, warn};

use crate::error::{Error, Result};
use crate::types::{
    ArchiveHeader, FileDescriptor, FileRecord, Node, FILE_RECORD_SIZE, HEADER_SIZE, NODE_SIZE,
};

/// The three tables held by a decrypted index buffer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tables {
    /// Suffix fragments followed by file ids
    pub strings: Vec<u8>,
    /// Flat trie nodes
    pub nodes: Vec<Node>,
    /// One descriptor per archived file
    pub files: Vec<FileDescriptor>,
}

/// Byte range of `count` items of `size` bytes at `offset`, if it lies inside `buffer_len`
fn byte_range(offset: i32, count: i32, size: usize, buffer_len: usize) -> Option<Range<usize>> {
    let start = usize::try_from(offset).ok()?;
    let length = usize::try_from(count).ok()?.checked_mul(size)?;
    let end = start.checked_add(length)?;
    (end <= buffer_len).then_some(start..end)
}

/// Read the fixed header fields from the start of the index buffer
pub fn parse_header(buffer: &[u8]) -> Result<ArchiveHeader> {
    if buffer.len() < HEADER_SIZE {
        return Err(Error::HeaderTooShort(buffer.len()));
    }
    Ok(ArchiveHeader::read(&mut Cursor::new(&buffer[..HEADER_SIZE]))?)
}

/// Slice the string table, or an empty table if its range is invalid
pub fn parse_strings(buffer: &[u8], header: &ArchiveHeader) -> Vec<u8> {
    match byte_range(
        header.string_table_offset,
        header.string_table_length,
        1,
        buffer.len(),
    ) {
        Some(range) => buffer[range].to_vec(),
        None => {
            warn!(
                offset = header.string_table_offset,
                length = header.string_table_length,
                "string table out of range, treating as empty"
            );
            Vec::new()
        }
    }
}

/// Read the node table, or an empty table if its range is invalid
pub fn parse_nodes(buffer: &[u8], header: &ArchiveHeader) -> Result<Vec<Node>> {
    let Some(range) = byte_range(
        header.node_table_offset,
        header.node_count,
        NODE_SIZE,
        buffer.len(),
    ) else {
        warn!(
            offset = header.node_table_offset,
            count = header.node_count,
            "node table out of range, treating as empty"
        );
        return Ok(Vec::new());
    };

    let mut reader = Cursor::new(&buffer[range]);
    (0..header.node_count)
        .map(|_| Node::read(&mut reader).map_err(Error::from))
        .collect()
}

/// Read the file table, failing if any record lies outside the buffer
pub fn parse_files(buffer: &[u8], header: &ArchiveHeader) -> Result<Vec<FileDescriptor>> {
    let range = byte_range(
        header.file_table_offset,
        header.file_count,
        FILE_RECORD_SIZE,
        buffer.len(),
    )
    .ok_or(Error::Truncated {
        table: "file",
        offset: header.file_table_offset.into(),
        length: i64::from(header.file_count) * FILE_RECORD_SIZE as i64,
    })?;

    let mut reader = Cursor::new(&buffer[range]);
    (0..header.file_count)
        .map(|index| -> Result<FileDescriptor> {
            let header_offset = header
                .file_table_offset
                .saturating_add(index.saturating_mul(FILE_RECORD_SIZE as i32));
            let record = FileRecord::read(&mut reader)?;
            Ok(FileDescriptor::from_record(
                index as usize,
                header_offset,
                record,
            ))
        })
        .collect()
}

/// Interpret a decrypted index buffer
#[instrument(skip_all, err)]
pub fn parse_tables(buffer: &[u8], header: &ArchiveHeader) -> Result<Tables> {
    let strings = parse_strings(buffer, header);
    let nodes = parse_nodes(buffer, header)?;
    let files = parse_files(buffer, header)?;

    debug!(
        strings = strings.len(),
        nodes = nodes.len(),
        files = files.len(),
        "parsed index tables"
    );

    Ok(Tables {
        strings,
        nodes,
        files,
    })
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{byte_range, parse_files, parse_header, parse_nodes, parse_strings};
    use crate::error::{Error, Result};
    use crate::types::{ArchiveHeader, Node};

    #[rustfmt::skip]
    const BUFFER: [u8; 24] = [
        // strings
        0x00, 0x61, 0x00, 0x07,
        // nodes
        0x10, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF,
        0xFE, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00,
    ];

    fn header() -> ArchiveHeader {
        ArchiveHeader {
            node_count: 2,
            string_table_offset: 0,
            string_table_length: 4,
            node_table_offset: 4,
            node_table_length: 16,
            ..Default::default()
        }
    }

    #[test]
    fn ranges() {
        assert_eq!(byte_range(4, 2, 8, 20), Some(4..20));
        assert_eq!(byte_range(4, 2, 8, 19), None);
        assert_eq!(byte_range(-4, 2, 8, 100), None);
        assert_eq!(byte_range(4, -2, 8, 100), None);
        assert_eq!(byte_range(0, i32::MAX, 24, 1024), None);
        assert_eq!(byte_range(0, 0, 24, 0), Some(0..0));
    }

    #[test]
    fn short_header() {
        assert!(matches!(
            parse_header(&[0u8; 39]),
            Err(Error::HeaderTooShort(39))
        ));
    }

    #[test]
    fn strings_and_nodes() -> Result<()> {
        let header = header();

        assert_eq!(parse_strings(&BUFFER, &header), vec![0x00, 0x61, 0x00, 0x07]);
        assert_eq!(
            parse_nodes(&BUFFER, &header)?,
            vec![Node { next: 16, prev: -1 }, Node { next: -2, prev: 0 }]
        );

        Ok(())
    }

    #[test]
    fn invalid_ranges_fail_closed() -> Result<()> {
        let header = ArchiveHeader {
            string_table_length: 400,
            node_count: 3,
            ..header()
        };

        assert!(parse_strings(&BUFFER, &header).is_empty());
        assert!(parse_nodes(&BUFFER, &header)?.is_empty());

        Ok(())
    }

    #[test]
    fn truncated_file_table() {
        let header = ArchiveHeader {
            file_table_offset: 4,
            file_count: 1,
            ..header()
        };

        assert!(matches!(
            parse_files(&BUFFER, &header),
            Err(Error::Truncated { table: "file", .. })
        ));
    }

    #[test]
    fn file_records() -> Result<()> {
        #[rustfmt::skip]
        let buffer = [
            0xAA, 0xAA, 0xAA, 0xAA,
            0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x0B, 0x00, 0x00, 0x00,
            0x0B, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
        ];
        let header = ArchiveHeader {
            file_table_offset: 4,
            file_count: 1,
            ..Default::default()
        };

        let files = parse_files(&buffer, &header)?;
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].index, 0);
        assert_eq!(files[0].header_offset, 4);
        assert_eq!(files[0].data_offset, 16);
        assert_eq!(files[0].compressed_size, 11);
        assert_eq!(files[0].filename, None);

        Ok(())
    }
}
