//! The borrowed, typed view over one field's raw bytes: [`ValueMetadata`]
//! (what shape and meaning the bytes have) and [`FieldValue`] (the bytes
//! themselves, paired with that shape). Every accessor here is a total
//! function — it trusts that whoever built the `FieldValue` (the tracefs
//! field resolver or the EventHeader walker) already bounds-checked the
//! slice against the field's declared size.

extern crate alloc;

use alloc::string::String;
use core::fmt;

use crate::byte_reader::ByteReader;
use crate::charconv;
use crate::encoding::{FieldEncoding, FieldFormat};
use crate::errno;
use crate::options::ConvertOptions;

/// Whether a field is a scalar, a constant-length array, or a
/// variable-length array, and (when viewing a single element of an array)
/// which element.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ArrayKind {
    /// Not an array: a plain scalar, string, or struct.
    Scalar,
    /// Array whose element count is read from the schema metadata.
    Constant,
    /// Array whose element count is read from the payload.
    Variable,
}

/// Shape and meaning of a field value: encoding, format, tag, element size,
/// and (for arrays) how many elements it has.
#[derive(Clone, Copy, Debug)]
pub struct ValueMetadata {
    byte_reader: ByteReader,
    encoding: FieldEncoding,
    format: FieldFormat,
    field_tag: u16,
    /// Size in bytes of one element, or 0 when elements are variable-length.
    type_size: u8,
    array_kind: ArrayKind,
    /// For a whole-array view: the element count. For a scalar or single
    /// array element view: 1.
    element_count: u32,
    /// True when this metadata describes one element of an array rather
    /// than the array as a whole.
    is_element: bool,
}

impl ValueMetadata {
    /// A metadata value representing nothing (used for `Invalid`/error cases).
    pub const fn null() -> Self {
        Self {
            byte_reader: ByteReader::host_endian(),
            encoding: FieldEncoding::Invalid,
            format: FieldFormat::Default,
            field_tag: 0,
            type_size: 0,
            array_kind: ArrayKind::Scalar,
            element_count: 0,
            is_element: false,
        }
    }

    /// Builds metadata for a scalar (non-array) field.
    pub const fn scalar(
        byte_reader: ByteReader,
        encoding: FieldEncoding,
        format: FieldFormat,
        field_tag: u16,
        type_size: u8,
    ) -> Self {
        Self {
            byte_reader,
            encoding,
            format,
            field_tag,
            type_size,
            array_kind: ArrayKind::Scalar,
            element_count: 1,
            is_element: false,
        }
    }

    /// Builds metadata for a whole array (before any element is visited).
    pub const fn array(
        byte_reader: ByteReader,
        encoding: FieldEncoding,
        format: FieldFormat,
        field_tag: u16,
        type_size: u8,
        array_kind: ArrayKind,
        element_count: u32,
    ) -> Self {
        Self {
            byte_reader,
            encoding,
            format,
            field_tag,
            type_size,
            array_kind,
            element_count,
            is_element: false,
        }
    }

    /// Returns the metadata for a single element of an array view.
    pub const fn as_element(mut self) -> Self {
        self.is_element = true;
        self.element_count = 1;
        self
    }

    /// The reader to use for every multibyte access into this field's bytes.
    pub const fn byte_reader(&self) -> ByteReader {
        self.byte_reader
    }

    /// The field's base encoding (array/chain flags stripped).
    pub const fn encoding(&self) -> FieldEncoding {
        self.encoding
    }

    /// The field's format hint.
    pub const fn format(&self) -> FieldFormat {
        self.format
    }

    /// The provider-defined tag, or 0 if none.
    pub const fn field_tag(&self) -> u16 {
        self.field_tag
    }

    /// Size in bytes of one element, or 0 for variable-length elements.
    pub const fn type_size(&self) -> u8 {
        self.type_size
    }

    /// Whether this field is a scalar or which kind of array it is.
    pub const fn array_kind(&self) -> ArrayKind {
        self.array_kind
    }

    /// Number of elements (1 for a scalar or a single array element view).
    pub const fn element_count(&self) -> u32 {
        self.element_count
    }

    /// True if this view is a scalar or a single array element (not the
    /// whole array).
    pub const fn is_scalar_or_element(&self) -> bool {
        matches!(self.array_kind, ArrayKind::Scalar) || self.is_element
    }
}

/// A borrowed byte range paired with the [`ValueMetadata`] that explains it.
///
/// Lifetime is bounded by the event record the bytes were borrowed from:
/// a `FieldValue` must not outlive the buffer it points into.
#[derive(Clone, Copy, Debug)]
pub struct FieldValue<'dat> {
    bytes: &'dat [u8],
    metadata: ValueMetadata,
}

impl<'dat> FieldValue<'dat> {
    /// Pairs `bytes` with `metadata`. Does not validate that `bytes.len()`
    /// matches what `metadata` implies; callers are expected to have sliced
    /// `bytes` correctly already.
    pub const fn new(bytes: &'dat [u8], metadata: ValueMetadata) -> Self {
        Self { bytes, metadata }
    }

    /// The raw bytes this value was decoded from.
    pub const fn bytes(&self) -> &'dat [u8] {
        self.bytes
    }

    /// The shape/meaning of [`Self::bytes`].
    pub const fn metadata(&self) -> &ValueMetadata {
        &self.metadata
    }

    fn reader(&self) -> ByteReader {
        self.metadata.byte_reader
    }

    /// Reads the value as a `u8`. Valid when `bytes.len() >= 1`.
    pub fn to_u8(&self) -> u8 {
        self.bytes[0]
    }

    /// Reads the value as an `i8`.
    pub fn to_i8(&self) -> i8 {
        self.bytes[0] as i8
    }

    /// Reads the value as a `u16`. Valid when `bytes.len() >= 2`.
    pub fn to_u16(&self) -> u16 {
        self.reader().read_u16(self.bytes)
    }

    /// Reads the value as an `i16`.
    pub fn to_i16(&self) -> i16 {
        self.reader().read_i16(self.bytes)
    }

    /// Reads the value as a `u32`. Valid when `bytes.len() >= 4`.
    pub fn to_u32(&self) -> u32 {
        self.reader().read_u32(self.bytes)
    }

    /// Reads the value as an `i32`.
    pub fn to_i32(&self) -> i32 {
        self.reader().read_i32(self.bytes)
    }

    /// Reads the value as a `u64`. Valid when `bytes.len() >= 8`.
    pub fn to_u64(&self) -> u64 {
        self.reader().read_u64(self.bytes)
    }

    /// Reads the value as an `i64`.
    pub fn to_i64(&self) -> i64 {
        self.reader().read_i64(self.bytes)
    }

    /// Reads the value as an `f32`.
    pub fn to_f32(&self) -> f32 {
        self.reader().read_f32(self.bytes)
    }

    /// Reads the value as an `f64`.
    pub fn to_f64(&self) -> f64 {
        self.reader().read_f64(self.bytes)
    }

    /// Reads a 16-byte GUID, rendered in the conventional big-endian field
    /// order regardless of the capture's byte order (GUIDs are defined
    /// field-wise, not as one big-endian integer).
    pub fn to_guid(&self) -> [u8; 16] {
        let r = self.reader();
        let mut out = [0u8; 16];
        let data1 = r.read_u32(&self.bytes[0..4]);
        let data2 = r.read_u16(&self.bytes[4..6]);
        let data3 = r.read_u16(&self.bytes[6..8]);
        out[0..4].copy_from_slice(&data1.to_be_bytes());
        out[4..6].copy_from_slice(&data2.to_be_bytes());
        out[6..8].copy_from_slice(&data3.to_be_bytes());
        out[8..16].copy_from_slice(&self.bytes[8..16]);
        out
    }

    /// Reads a big-endian 16-bit network port.
    pub fn to_port(&self) -> u16 {
        u16::from_be_bytes([self.bytes[0], self.bytes[1]])
    }

    /// Reads a 4-byte IPv4 address.
    #[cfg(feature = "rustc_1_77")]
    pub fn to_ipv4(&self) -> core::net::Ipv4Addr {
        core::net::Ipv4Addr::new(self.bytes[0], self.bytes[1], self.bytes[2], self.bytes[3])
    }

    /// Reads a 16-byte IPv6 address.
    #[cfg(feature = "rustc_1_77")]
    pub fn to_ipv6(&self) -> core::net::Ipv6Addr {
        let mut octets = [0u8; 16];
        octets.copy_from_slice(&self.bytes[0..16]);
        core::net::Ipv6Addr::from(octets)
    }

    /// Decodes the field's bytes as text according to its format/encoding,
    /// appending to `out`. Handles the `String8`/`StringUtf*`/`StringXml`/
    /// `StringJson` formats over `ZString*`/`StringLength16*` encodings, and
    /// detects a leading BOM for `StringUtfBom`.
    pub fn write_string_to(&self, out: &mut String) {
        let bytes = self.bytes;
        match self.metadata.format.base() {
            FieldFormat::String8 => charconv::push_latin1(out, bytes),
            FieldFormat::StringUtfBom | FieldFormat::StringXml | FieldFormat::StringJson => {
                let (bom, skip) = charconv::TextEncoding::from_bom(bytes);
                self.write_string_as(out, bom, &bytes[skip..]);
            }
            _ => {
                let enc = match self.metadata.encoding.base() {
                    FieldEncoding::ZStringChar16 | FieldEncoding::StringLength16Char16 => {
                        if self.reader().source_big_endian() {
                            charconv::TextEncoding::Utf16Be
                        } else {
                            charconv::TextEncoding::Utf16Le
                        }
                    }
                    FieldEncoding::ZStringChar32 | FieldEncoding::StringLength16Char32 => {
                        if self.reader().source_big_endian() {
                            charconv::TextEncoding::Utf32Be
                        } else {
                            charconv::TextEncoding::Utf32Le
                        }
                    }
                    _ => charconv::TextEncoding::Utf8,
                };
                self.write_string_as(out, enc, bytes);
            }
        }
    }

    fn write_string_as(&self, out: &mut String, enc: charconv::TextEncoding, bytes: &[u8]) {
        match enc {
            charconv::TextEncoding::Utf8 | charconv::TextEncoding::Utf8Bom => {
                charconv::push_utf8_lossy_or_latin1(out, bytes)
            }
            charconv::TextEncoding::Utf16Le => {
                charconv::push_utf16(out, ByteReader::new(false), bytes)
            }
            charconv::TextEncoding::Utf16Be => {
                charconv::push_utf16(out, ByteReader::new(true), bytes)
            }
            charconv::TextEncoding::Utf32Le => {
                charconv::push_utf32(out, ByteReader::new(false), bytes)
            }
            charconv::TextEncoding::Utf32Be => {
                charconv::push_utf32(out, ByteReader::new(true), bytes)
            }
        }
    }

    /// Renders the value as text per its format, honoring `options`.
    ///
    /// `BinaryLength16Char8` carries a producer-chosen byte width that isn't
    /// fixed by the encoding itself. With no format hint (`Default`) there's
    /// nothing to interpret the bytes as, so they render as plain hex. With a
    /// fixed-scalar format (the producer is saying "this binary blob is
    /// really an int of whatever width I gave it"), a zero-length value
    /// renders `null` and an unrecognized width falls back to hex; widths of
    /// 1/2/4/8 bytes fall through to that format's normal rendering below.
    pub fn write_scalar_to(&self, out: &mut String, options: ConvertOptions) {
        use core::fmt::Write;

        if self.metadata.encoding.base() == FieldEncoding::BinaryLength16Char8 {
            let format = self.metadata.format.base();
            if format == FieldFormat::Default {
                self.write_hex_bytes_to(out);
                return;
            }
            let is_fixed_scalar_format = matches!(
                format,
                FieldFormat::UnsignedInt
                    | FieldFormat::SignedInt
                    | FieldFormat::HexInt
                    | FieldFormat::Pid
                    | FieldFormat::Errno
                    | FieldFormat::Boolean
            );
            if is_fixed_scalar_format {
                match self.bytes.len() {
                    0 => {
                        out.push_str("null");
                        return;
                    }
                    1 | 2 | 4 | 8 => {}
                    _ => {
                        self.write_hex_bytes_to(out);
                        return;
                    }
                }
            }
        }

        match self.metadata.format.base() {
            FieldFormat::UnsignedInt => self.write_unsigned_to(out),
            FieldFormat::SignedInt => self.write_signed_to(out),
            FieldFormat::HexInt => {
                let hex_as_string = options.has(ConvertOptions::IntHexAsString);
                if hex_as_string {
                    out.push('"');
                }
                self.write_hex_int_to(out);
                if hex_as_string {
                    out.push('"');
                }
            }
            FieldFormat::Errno => {
                let code = self.signed_as_i64();
                match errno::name(code) {
                    Some(name) if options.has(ConvertOptions::ErrnoKnownAsString) => {
                        let _ = write!(out, "\"{name}({code})\"");
                    }
                    None if options.has(ConvertOptions::ErrnoUnknownAsString) => {
                        let _ = write!(out, "\"{code}\"");
                    }
                    _ => {
                        let _ = write!(out, "{code}");
                    }
                }
            }
            FieldFormat::Pid => self.write_unsigned_to(out),
            FieldFormat::Time => self.write_time_to(out, options),
            FieldFormat::Boolean => self.write_bool_to(out, options),
            FieldFormat::Float => self.write_float_to(out, options),
            FieldFormat::HexBytes => self.write_hex_bytes_to(out),
            FieldFormat::String8
            | FieldFormat::StringUtf
            | FieldFormat::StringUtfBom
            | FieldFormat::StringXml
            | FieldFormat::StringJson => {
                out.push('"');
                self.write_string_to(out);
                out.push('"');
            }
            FieldFormat::Uuid => self.write_guid_to(out),
            FieldFormat::Port => {
                let _ = write!(out, "{}", self.to_port());
            }
            #[cfg(feature = "rustc_1_77")]
            FieldFormat::IPv4 => {
                let _ = write!(out, "\"{}\"", self.to_ipv4());
            }
            #[cfg(feature = "rustc_1_77")]
            FieldFormat::IPv6 | FieldFormat::IPAddress if self.bytes.len() == 16 => {
                let _ = write!(out, "\"{}\"", self.to_ipv6());
            }
            #[cfg(feature = "rustc_1_77")]
            FieldFormat::IPAddress if self.bytes.len() == 4 => {
                let _ = write!(out, "\"{}\"", self.to_ipv4());
            }
            _ => self.write_unsigned_to(out),
        }
    }

    fn signed_as_i64(&self) -> i64 {
        match self.bytes.len() {
            1 => self.to_i8() as i64,
            2 => self.to_i16() as i64,
            4 => self.to_i32() as i64,
            8 => self.to_i64(),
            _ => 0,
        }
    }

    fn unsigned_as_u64(&self) -> u64 {
        match self.bytes.len() {
            1 => self.to_u8() as u64,
            2 => self.to_u16() as u64,
            4 => self.to_u32() as u64,
            8 => self.to_u64(),
            _ => 0,
        }
    }

    fn write_unsigned_to(&self, out: &mut String) {
        use core::fmt::Write;
        let _ = write!(out, "{}", self.unsigned_as_u64());
    }

    fn write_signed_to(&self, out: &mut String) {
        use core::fmt::Write;
        let _ = write!(out, "{}", self.signed_as_i64());
    }

    fn write_hex_int_to(&self, out: &mut String) {
        use core::fmt::Write;
        let _ = write!(out, "0x{:x}", self.unsigned_as_u64());
    }

    fn write_hex_bytes_to(&self, out: &mut String) {
        use core::fmt::Write;
        out.push('"');
        for (i, b) in self.bytes.iter().enumerate() {
            if i != 0 {
                out.push(' ');
            }
            let _ = write!(out, "{b:02X}");
        }
        out.push('"');
    }

    fn write_guid_to(&self, out: &mut String) {
        use core::fmt::Write;
        let g = self.to_guid();
        let _ = write!(
            out,
            "\"{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}\"",
            g[0], g[1], g[2], g[3], g[4], g[5], g[6], g[7], g[8], g[9], g[10], g[11], g[12], g[13], g[14], g[15]
        );
    }

    fn write_bool_to(&self, out: &mut String, options: ConvertOptions) {
        use core::fmt::Write;
        let v = self.unsigned_as_u64();
        match v {
            0 => out.push_str("false"),
            1 => out.push_str("true"),
            _ if options.has(ConvertOptions::BoolOutOfRangeAsString) => {
                let _ = write!(out, "\"{v}\"");
            }
            _ => {
                let _ = write!(out, "{v}");
            }
        }
    }

    fn write_float_to(&self, out: &mut String, options: ConvertOptions) {
        use core::fmt::Write;
        let v = if self.bytes.len() == 4 {
            self.to_f32() as f64
        } else {
            self.to_f64()
        };
        if !v.is_finite() && options.has(ConvertOptions::FloatNonFiniteAsString) {
            let text = if v.is_nan() {
                "NaN"
            } else if v > 0.0 {
                "Infinity"
            } else {
                "-Infinity"
            };
            let _ = write!(out, "\"{text}\"");
        } else {
            let _ = write!(out, "{v}");
        }
    }

    fn write_time_to(&self, out: &mut String, options: ConvertOptions) {
        use core::fmt::Write;
        let seconds = self.signed_as_i64();
        // A Unix timestamp is "in range" for our purposes when it falls within
        // roughly 1677..2262, the range `i64` nanoseconds-since-epoch can hold;
        // that is a generous bound for anything perf.data will ever carry.
        let in_range = (-9_223_372_036..=9_223_372_036).contains(&seconds);
        if in_range && options.has(ConvertOptions::UnixTimeWithinRangeAsString) {
            let _ = write!(out, "\"{}\"", crate::display::format_unix_seconds(seconds));
        } else if !in_range && options.has(ConvertOptions::UnixTimeOutOfRangeAsString) {
            let _ = write!(out, "\"{seconds}\"");
        } else {
            let _ = write!(out, "{seconds}");
        }
    }
}

impl<'dat> fmt::Display for FieldValue<'dat> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = String::new();
        self.write_scalar_to(&mut buf, ConvertOptions::Default);
        f.write_str(&buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar_value<'d>(bytes: &'d [u8], format: FieldFormat) -> FieldValue<'d> {
        let meta = ValueMetadata::scalar(
            ByteReader::host_endian(),
            FieldEncoding::Value32,
            format,
            0,
            4,
        );
        FieldValue::new(bytes, meta)
    }

    #[test]
    fn binary_length16_char8_null_vs_scalar_vs_hex() {
        let meta_of = |len: u8| {
            ValueMetadata::scalar(
                ByteReader::host_endian(),
                FieldEncoding::BinaryLength16Char8,
                FieldFormat::SignedInt,
                0,
                len,
            )
        };
        let mut out = String::new();
        FieldValue::new(&[], meta_of(0)).write_scalar_to(&mut out, ConvertOptions::Default);
        assert_eq!(out, "null");

        out.clear();
        let bytes = 42i32.to_ne_bytes();
        FieldValue::new(&bytes, meta_of(4)).write_scalar_to(&mut out, ConvertOptions::Default);
        assert_eq!(out, "42");

        out.clear();
        let bytes = [0x01u8, 0x02, 0x03];
        FieldValue::new(&bytes, meta_of(3)).write_scalar_to(&mut out, ConvertOptions::Default);
        assert_eq!(out, "\"01 02 03\"");
    }

    #[test]
    fn binary_length16_char8_default_format_is_always_plain_hex() {
        let meta_of = |len: u8| {
            ValueMetadata::scalar(
                ByteReader::host_endian(),
                FieldEncoding::BinaryLength16Char8,
                FieldFormat::Default,
                0,
                len,
            )
        };
        let mut out = String::new();
        let bytes = 42u32.to_ne_bytes();
        FieldValue::new(&bytes, meta_of(4)).write_scalar_to(&mut out, ConvertOptions::Default);
        assert_eq!(out, "\"2A 00 00 00\"");

        out.clear();
        FieldValue::new(&[], meta_of(0)).write_scalar_to(&mut out, ConvertOptions::Default);
        assert_eq!(out, "\"\"");
    }

    #[test]
    fn hex_int_as_string_toggle() {
        let bytes = 0x2Au32.to_ne_bytes();
        let value = scalar_value(&bytes, FieldFormat::HexInt);
        let mut out = String::new();
        value.write_scalar_to(&mut out, ConvertOptions::None);
        assert_eq!(out, "0x2a");

        out.clear();
        value.write_scalar_to(&mut out, ConvertOptions::IntHexAsString);
        assert_eq!(out, "\"0x2a\"");
    }

    #[test]
    fn guid_renders_in_field_order_not_raw_byte_order() {
        let mut bytes = [0u8; 16];
        bytes[0..4].copy_from_slice(&0x12345678u32.to_le_bytes());
        let meta = ValueMetadata::scalar(
            ByteReader::host_endian(),
            FieldEncoding::Value128,
            FieldFormat::Uuid,
            0,
            16,
        );
        let mut out = String::new();
        FieldValue::new(&bytes, meta).write_scalar_to(&mut out, ConvertOptions::Default);
        assert!(out.starts_with("\"12345678-"));
    }
}
