//! Header decryption.
//!
//! The index file hides its string and node tables behind a single 32-bit key. The key is stored
//! in word 9 of the header, XORed with [`KEY_SENTINEL`]. Every word of both tables is XORed with
//! the same key; there is no keystream.

use std::ops::Range;

use byteorder::{ByteOrder, LittleEndian};
use tracing::{debug, instrument};

use crate::types::{HEADER_SIZE, KEY_SENTINEL, KEY_SLOT};

/// Word offsets of the header fields describing the encrypted tables
const STRING_OFFSET_WORD: usize = 3;
const STRING_LENGTH_WORD: usize = 4;
const NODE_OFFSET_WORD: usize = 5;
const NODE_LENGTH_WORD: usize = 6;

fn word(buffer: &[u8], index: usize) -> u32 {
    LittleEndian::read_u32(&buffer[index * 4..index * 4 + 4])
}

fn set_word(buffer: &mut [u8], index: usize, value: u32) {
    LittleEndian::write_u32(&mut buffer[index * 4..index * 4 + 4], value);
}

/// Word range covered by a table, clamped to the words present in the buffer
fn word_range(buffer: &[u8], offset_word: usize, length_word: usize) -> Range<usize> {
    let words = (buffer.len() / 4) as i64;
    let offset = word(buffer, offset_word) as i32 as i64;
    let length = word(buffer, length_word) as i32 as i64;

    let start = (offset / 4).clamp(0, words);
    let end = ((offset + length) / 4).clamp(start, words);
    start as usize..end as usize
}

fn xor_tables(buffer: &mut [u8], key: u32) {
    let ranges = [
        word_range(buffer, STRING_OFFSET_WORD, STRING_LENGTH_WORD),
        word_range(buffer, NODE_OFFSET_WORD, NODE_LENGTH_WORD),
    ];

    for range in ranges {
        for index in range.filter(|&i| i != KEY_SLOT) {
            let value = word(buffer, index) ^ key;
            set_word(buffer, index, value);
        }
    }
}

/// Decrypt the string and node tables of a header buffer in place.
///
/// Returns the recovered key, or `None` when the buffer is too short to hold a header, in which
/// case it is left untouched.
#[instrument(skip(buffer), fields(len = buffer.len()))]
pub fn decrypt_in_place(buffer: &mut [u8]) -> Option<u32> {
    if buffer.len() < HEADER_SIZE {
        return None;
    }

    let key = word(buffer, KEY_SLOT) ^ KEY_SENTINEL;
    set_word(buffer, KEY_SLOT, KEY_SENTINEL);
    xor_tables(buffer, key);

    debug!("recovered key {key:#010x}");
    Some(key)
}

/// Decrypt an owned header buffer
pub fn decrypt(mut buffer: Vec<u8>) -> Vec<u8> {
    decrypt_in_place(&mut buffer);
    buffer
}

/// Encrypt a plain header buffer in place with `key`.
///
/// This is the inverse of [`decrypt_in_place`] for any buffer whose key slot holds
/// [`KEY_SENTINEL`]. Buffers shorter than a header are left untouched.
pub fn encrypt_in_place(buffer: &mut [u8], key: u32) {
    if buffer.len() < HEADER_SIZE {
        return;
    }

    xor_tables(buffer, key);
    set_word(buffer, KEY_SLOT, key ^ KEY_SENTINEL);
}
