//! UTF-8 Boundary Helpers
//!
//! Multi-byte UTF-8 characters can straddle the point where a long line is
//! cut. These helpers find a cut point that keeps characters whole.
//!
//! A UTF-8 character can be 1-4 bytes:
//! - 1 byte:  0xxxxxxx (ASCII)
//! - 2 bytes: 110xxxxx 10xxxxxx
//! - 3 bytes: 1110xxxx 10xxxxxx 10xxxxxx
//! - 4 bytes: 11110xxx 10xxxxxx 10xxxxxx 10xxxxxx

/// Check if byte is a UTF-8 continuation byte (10xxxxxx)
#[inline]
pub fn is_continuation(byte: u8) -> bool {
    (byte & 0b11000000) == 0b10000000
}

/// Get expected length of UTF-8 sequence from first byte
#[inline]
pub fn sequence_length(first_byte: u8) -> usize {
    match first_byte {
        0x00..=0x7F => 1, // ASCII
        0xC0..=0xDF => 2, // 2-byte sequence
        0xE0..=0xEF => 3, // 3-byte sequence
        0xF0..=0xF7 => 4, // 4-byte sequence
        _ => 1,           // Invalid, treat as single byte
    }
}

/// Largest cut point `<= limit` that does not split a character.
///
/// Falls back to `limit` itself when the character straddling it starts at
/// offset 0 (the limit is smaller than one character) or when the bytes are
/// not UTF-8 to begin with.
pub fn safe_split_point(bytes: &[u8], limit: usize) -> usize {
    if bytes.len() <= limit {
        return bytes.len();
    }
    if !is_continuation(bytes[limit]) {
        return limit;
    }

    // Walk back to the lead byte of the straddling character (at most 3 steps)
    let mut start = limit;
    while start > 0 && limit - start < 3 && is_continuation(bytes[start]) {
        start -= 1;
    }

    let lead = bytes[start];
    if start == 0 || is_continuation(lead) || start + sequence_length(lead) <= limit {
        return limit;
    }
    start
}
