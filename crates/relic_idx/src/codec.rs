//! Payload decoding.

use std::io::{self, Read, Seek};

use tracing::{instrument, trace};

use crate::error::{Error, Result};
use crate::types::FileDescriptor;

/// Identifies the storage format of a payload inside the data file
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(i32)]
pub enum Codec {
    /// Stores the data as it is
    Stored = 0,

    /// A zstd frame behind a fixed sub-header
    Block = 2,
}

impl TryFrom<i32> for Codec {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(Codec::Stored),
            2 => Ok(Codec::Block),
            other => Err(Error::UnsupportedCodec(other)),
        }
    }
}

/// Byte range of a payload inside the data file, validated against its length
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct Extent {
    pub start: u64,
    pub len: u64,
}

impl Extent {
    /// Resolve where the stored bytes of `desc` live.
    ///
    /// The declared range and, for block payloads, the range after the sub-header must both fit
    /// inside `data_len`.
    pub fn resolve(
        desc: &FileDescriptor,
        codec: Codec,
        block_header_len: u64,
        data_len: u64,
    ) -> Result<Self> {
        let out_of_range = || Error::OutOfRange {
            index: desc.index,
            offset: desc.data_offset,
            size: desc.compressed_size as i64,
            len: data_len,
        };

        let offset = u64::try_from(desc.data_offset).map_err(|_| out_of_range())?;
        let len = u64::try_from(desc.compressed_size).map_err(|_| out_of_range())?;

        let start = match codec {
            Codec::Stored => offset,
            Codec::Block => offset
                .checked_add(block_header_len)
                .ok_or_else(out_of_range)?,
        };

        for first in [offset, start] {
            match first.checked_add(len) {
                Some(end) if end <= data_len => {}
                _ => return Err(out_of_range()),
            }
        }

        Ok(Extent { start, len })
    }
}

/// Read and decode the payload described by `desc`.
///
/// The caller resolves the extent first so that nothing is read past the end of the data file.
#[instrument(skip(reader, desc), fields(index = desc.index), err)]
pub(crate) fn materialize<R: Read + Seek>(
    reader: &mut R,
    desc: &FileDescriptor,
    codec: Codec,
    extent: Extent,
) -> Result<Vec<u8>> {
    reader.seek(io::SeekFrom::Start(extent.start))?;

    let mut stored = vec![0u8; extent.len as usize];
    reader.read_exact(&mut stored)?;

    match codec {
        Codec::Stored => Ok(stored),
        Codec::Block => {
            let expected =
                u64::try_from(desc.uncompressed_size).map_err(|_| Error::SizeMismatch {
                    expected: desc.uncompressed_size.into(),
                    actual: 0,
                })?;
            decompress_frame(&stored, expected)
        }
    }
}

/// Upper bound on the up-front reservation, as a multiple of the compressed size
const MAX_RESERVE_RATIO: u64 = 16;

/// Decompress a single zstd frame, failing unless it yields exactly `expected` bytes.
pub fn decompress_frame(data: &[u8], expected: u64) -> Result<Vec<u8>> {
    let decoder = zstd::stream::read::Decoder::new(data)?.single_frame();

    // the declared size is untrusted, so the reservation is bounded by the input
    let capacity = expected.min((data.len() as u64).saturating_mul(MAX_RESERVE_RATIO));
    let mut output = Vec::with_capacity(capacity as usize);

    // one byte of slack tells an oversized frame apart from an exact one
    decoder.take(expected + 1).read_to_end(&mut output)?;

    trace!("decompressed {} bytes into {}", data.len(), output.len());

    if output.len() as u64 != expected {
        return Err(Error::SizeMismatch {
            expected: expected as i64,
            actual: output.len() as u64,
        });
    }

    Ok(output)
}
