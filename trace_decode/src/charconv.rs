//! Text transcoding for string-typed field values.
//!
//! Every multi-byte code unit read here goes through the field's
//! [`ByteReader`](crate::ByteReader) before being interpreted as a Unicode
//! scalar value: a Char16/Char32 string nominally in the "wrong" endianness
//! (declared UTF but captured on a byte-swapped producer) must be
//! byte-swapped *before* UTF decoding, not decoded and then swapped — the
//! decoded code points are not byte-sized quantities.

extern crate alloc;

use alloc::string::String;

use crate::byte_reader::ByteReader;

/// Which Unicode transform applies to a string field, detected from an
/// optional leading byte-order mark.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TextEncoding {
    /// No BOM recognized; treat as UTF-8 (or Latin-1 for `String8`).
    Utf8,
    /// `EF BB BF`.
    Utf8Bom,
    /// `FF FE` (and not also `FF FE 00 00`).
    Utf16Le,
    /// `FE FF`.
    Utf16Be,
    /// `FF FE 00 00`.
    Utf32Le,
    /// `00 00 FE FF`.
    Utf32Be,
}

impl TextEncoding {
    /// Detects a byte-order mark at the start of `bytes`, if any, and
    /// returns it along with the number of leading bytes it occupies.
    pub fn from_bom(bytes: &[u8]) -> (TextEncoding, usize) {
        if bytes.starts_with(&[0x00, 0x00, 0xFE, 0xFF]) {
            (TextEncoding::Utf32Be, 4)
        } else if bytes.starts_with(&[0xFF, 0xFE, 0x00, 0x00]) {
            (TextEncoding::Utf32Le, 4)
        } else if bytes.starts_with(&[0xFE, 0xFF]) {
            (TextEncoding::Utf16Be, 2)
        } else if bytes.starts_with(&[0xFF, 0xFE]) {
            (TextEncoding::Utf16Le, 2)
        } else if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
            (TextEncoding::Utf8Bom, 3)
        } else {
            (TextEncoding::Utf8, 0)
        }
    }
}

const REPLACEMENT: char = '\u{FFFD}';

/// Appends `bytes` to `out`, treating each byte as a Latin-1 code point.
pub fn push_latin1(out: &mut String, bytes: &[u8]) {
    out.extend(bytes.iter().map(|&b| b as char));
}

/// Appends `bytes` to `out` as UTF-8, falling back to Latin-1 for any byte
/// sequence that isn't valid UTF-8 (tracefs string fields are not guaranteed
/// to be valid UTF-8 even when tagged `String8`/`StringUtf`).
pub fn push_utf8_lossy_or_latin1(out: &mut String, bytes: &[u8]) {
    match core::str::from_utf8(bytes) {
        Ok(s) => out.push_str(s),
        Err(_) => push_latin1(out, bytes),
    }
}

/// Appends `len_bytes / 2` UTF-16 code units, read via `reader`, to `out`.
/// `reader` must reflect the *field's* declared endianness; the byte swap
/// (if any) happens on each raw `u16` before it is treated as a code unit,
/// never afterward.
pub fn push_utf16(out: &mut String, reader: ByteReader, bytes: &[u8]) {
    let pair_count = bytes.len() / 2;
    let mut units = (0..pair_count).map(|i| reader.read_u16(&bytes[i * 2..i * 2 + 2]));
    loop {
        let Some(unit) = units.next() else { break };
        if (0xD800..0xDC00).contains(&unit) {
            match units.next() {
                Some(low) if (0xDC00..0xE000).contains(&low) => {
                    let c = 0x10000
                        + ((unit as u32 - 0xD800) << 10)
                        + (low as u32 - 0xDC00);
                    out.push(char::from_u32(c).unwrap_or(REPLACEMENT));
                }
                Some(_) => out.push(REPLACEMENT),
                None => out.push(REPLACEMENT),
            }
        } else if (0xDC00..0xE000).contains(&unit) {
            out.push(REPLACEMENT);
        } else {
            out.push(char::from_u32(unit as u32).unwrap_or(REPLACEMENT));
        }
    }
}

/// Appends `len_bytes / 4` UTF-32 code units, read via `reader`, to `out`.
pub fn push_utf32(out: &mut String, reader: ByteReader, bytes: &[u8]) {
    let count = bytes.len() / 4;
    for i in 0..count {
        let unit = reader.read_u32(&bytes[i * 4..i * 4 + 4]);
        out.push(char::from_u32(unit).unwrap_or(REPLACEMENT));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bom_detection_matches_prefix() {
        assert_eq!(TextEncoding::from_bom(&[0xFE, 0xFF, 1, 2]), (TextEncoding::Utf16Be, 2));
        assert_eq!(TextEncoding::from_bom(&[0xFF, 0xFE, 1, 2]), (TextEncoding::Utf16Le, 2));
        assert_eq!(TextEncoding::from_bom(b"hello"), (TextEncoding::Utf8, 0));
    }

    #[test]
    fn utf16_byte_swapped_field_decodes_via_reader_not_after() {
        // "Hi" = U+0048, U+0069 stored big-endian on a little-endian host.
        let bytes = [0x00u8, 0x48, 0x00, 0x69];
        let reader = ByteReader::new(true);
        let mut out = String::new();
        push_utf16(&mut out, reader, &bytes);
        assert_eq!(out, "Hi");
    }

    #[test]
    fn utf16_surrogate_pair_combines_into_one_scalar() {
        // U+1F600 (grinning face) = surrogate pair D83D DE00, little-endian.
        let bytes = [0x3D, 0xD8, 0x00, 0xDE];
        let reader = ByteReader::host_endian();
        let mut out = String::new();
        push_utf16(&mut out, reader, &bytes);
        assert_eq!(out.chars().count(), 1);
        assert_eq!(out, "\u{1F600}");
    }

    #[test]
    fn invalid_utf8_falls_back_to_latin1() {
        let mut out = String::new();
        push_utf8_lossy_or_latin1(&mut out, &[0xFF, 0x41]);
        assert_eq!(out, "\u{FF}A");
    }
}
