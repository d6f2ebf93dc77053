//! Closed sum types describing how a field's bytes are laid out
//! ([`FieldEncoding`]) and how they should be rendered as text
//! ([`FieldFormat`]). Both are explicit-tag newtypes rather than Rust
//! `enum`s so that an unrecognized tag (a newer producer, a corrupt
//! metadata stream) is representable instead of fatal to parse.

use core::fmt;

/// How a field's raw bytes are shaped: a scalar width, a string, or a
/// struct — plus array/chain flags packed into the high bits.
///
/// Wire layout: 5 encoding bits + 3 flag bits (`CArrayFlag`, `VArrayFlag`,
/// `ChainFlag`). `CArrayFlag` and `VArrayFlag` are mutually exclusive.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct FieldEncoding(pub u8);

impl FieldEncoding {
    /// Not a valid encoding; used to signal a parse failure.
    pub const Invalid: Self = Self(0);
    /// Nested struct; the field's "format" byte holds the field count (1..127).
    pub const Struct: Self = Self(1);
    /// 1-byte scalar.
    pub const Value8: Self = Self(2);
    /// 2-byte scalar.
    pub const Value16: Self = Self(3);
    /// 4-byte scalar.
    pub const Value32: Self = Self(4);
    /// 8-byte scalar.
    pub const Value64: Self = Self(5);
    /// 16-byte scalar (GUID, 128-bit int).
    pub const Value128: Self = Self(6);
    /// Zero-terminated string of 1-byte code units.
    pub const ZStringChar8: Self = Self(7);
    /// Zero-terminated string of 2-byte code units.
    pub const ZStringChar16: Self = Self(8);
    /// Zero-terminated string of 4-byte code units.
    pub const ZStringChar32: Self = Self(9);
    /// `u16` length (in code units) followed by that many 1-byte code units.
    pub const StringLength16Char8: Self = Self(10);
    /// `u16` length (in code units) followed by that many 2-byte code units.
    pub const StringLength16Char16: Self = Self(11);
    /// `u16` length (in code units) followed by that many 4-byte code units.
    pub const StringLength16Char32: Self = Self(12);
    /// `u16` byte length followed by that many raw bytes; default format is hex.
    pub const BinaryLength16Char8: Self = Self(13);

    const VALUE_MASK: u8 = 0x1f;
    /// Set when the field is a constant-length array (count comes from metadata).
    pub const CArrayFlag: u8 = 0x20;
    /// Set when the field is a variable-length array (count comes from the payload).
    pub const VArrayFlag: u8 = 0x40;
    /// Set when a [`FieldFormat`] byte follows this one.
    pub const ChainFlag: u8 = 0x80;
    /// `CArrayFlag | VArrayFlag`.
    pub const ARRAY_FLAGS: u8 = Self::CArrayFlag | Self::VArrayFlag;

    /// The base encoding with all flag bits cleared.
    pub const fn base(self) -> Self {
        Self(self.0 & Self::VALUE_MASK)
    }

    /// True if either array flag is set.
    pub const fn is_array(self) -> bool {
        self.0 & Self::ARRAY_FLAGS != 0
    }

    /// True if [`Self::CArrayFlag`] is set.
    pub const fn is_carray(self) -> bool {
        self.0 & Self::CArrayFlag != 0
    }

    /// True if [`Self::VArrayFlag`] is set.
    pub const fn is_varray(self) -> bool {
        self.0 & Self::VArrayFlag != 0
    }

    /// True if [`Self::ChainFlag`] is set.
    pub const fn has_chain_flag(self) -> bool {
        self.0 & Self::ChainFlag != 0
    }

    /// Raw byte, flags included.
    pub const fn as_int(self) -> u8 {
        self.0
    }

    /// Wraps a raw byte, no validation.
    pub const fn from_int(value: u8) -> Self {
        Self(value)
    }

    /// The fixed size in bytes of one element of this base encoding, or `0`
    /// for encodings whose element size is not fixed (strings, struct).
    pub const fn fixed_element_size(self) -> u8 {
        match self.base().0 {
            2 => 1, // Value8
            3 => 2, // Value16
            4 => 4, // Value32
            5 => 8, // Value64
            6 => 16, // Value128
            _ => 0,
        }
    }
}

impl fmt::Display for FieldEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.base().0 {
            0 => "Invalid",
            1 => "Struct",
            2 => "Value8",
            3 => "Value16",
            4 => "Value32",
            5 => "Value64",
            6 => "Value128",
            7 => "ZStringChar8",
            8 => "ZStringChar16",
            9 => "ZStringChar32",
            10 => "StringLength16Char8",
            11 => "StringLength16Char16",
            12 => "StringLength16Char32",
            13 => "BinaryLength16Char8",
            _ => "Unknown",
        };
        f.write_str(name)
    }
}

/// How a field's bytes should be rendered as text: number base, semantic
/// hint (errno, pid, time, uuid, ip address, ...), or string transcoding.
///
/// Wire layout: 7 format bits + 1 chain bit (a field tag follows).
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct FieldFormat(pub u8);

impl FieldFormat {
    /// Encoding-specific default (e.g. decimal for integers, struct field count for structs).
    pub const Default: Self = Self(0);
    /// Decimal, unsigned.
    pub const UnsignedInt: Self = Self(1);
    /// Decimal, signed.
    pub const SignedInt: Self = Self(2);
    /// `0x`-prefixed hex.
    pub const HexInt: Self = Self(3);
    /// POSIX errno; known values may render as a symbolic name.
    pub const Errno: Self = Self(4);
    /// Process id.
    pub const Pid: Self = Self(5);
    /// Seconds (or 100ns units) since the Unix epoch.
    pub const Time: Self = Self(6);
    /// 0/1 as `false`/`true`; anything else renders as its numeric value.
    pub const Boolean: Self = Self(7);
    /// IEEE-754 floating point.
    pub const Float: Self = Self(8);
    /// Space-separated hex byte dump.
    pub const HexBytes: Self = Self(9);
    /// Latin-1 / ASCII string.
    pub const String8: Self = Self(10);
    /// UTF string, encoding implied by the field's [`FieldEncoding`] element size.
    pub const StringUtf: Self = Self(11);
    /// UTF string that may begin with a byte-order mark.
    pub const StringUtfBom: Self = Self(12);
    /// UTF string known to hold XML.
    pub const StringXml: Self = Self(13);
    /// UTF string known to hold JSON.
    pub const StringJson: Self = Self(14);
    /// 16-byte GUID, big-endian field order.
    pub const Uuid: Self = Self(15);
    /// Big-endian 16-bit network port.
    pub const Port: Self = Self(16);
    /// 4-byte IPv4 address.
    pub const IPv4: Self = Self(17);
    /// 16-byte IPv6 address.
    pub const IPv6: Self = Self(18);
    /// 4- or 16-byte address, size-disambiguated.
    pub const IPAddress: Self = Self(19);

    const VALUE_MASK: u8 = 0x7f;
    /// Set when a `u16` field tag follows this format byte.
    pub const ChainFlag: u8 = 0x80;

    /// The format with the chain bit cleared.
    pub const fn base(self) -> Self {
        Self(self.0 & Self::VALUE_MASK)
    }

    /// True if [`Self::ChainFlag`] is set.
    pub const fn has_chain_flag(self) -> bool {
        self.0 & Self::ChainFlag != 0
    }

    /// Raw byte, chain bit included.
    pub const fn as_int(self) -> u8 {
        self.0
    }

    /// Wraps a raw byte, no validation.
    pub const fn from_int(value: u8) -> Self {
        Self(value)
    }

    /// Interprets the value as a struct's field count (only meaningful when
    /// paired with [`FieldEncoding::Struct`]).
    pub const fn as_struct_field_count(self) -> u8 {
        self.base().0
    }
}

impl fmt::Display for FieldFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.base().0 {
            0 => "Default",
            1 => "UnsignedInt",
            2 => "SignedInt",
            3 => "HexInt",
            4 => "Errno",
            5 => "Pid",
            6 => "Time",
            7 => "Boolean",
            8 => "Float",
            9 => "HexBytes",
            10 => "String8",
            11 => "StringUtf",
            12 => "StringUtfBom",
            13 => "StringXml",
            14 => "StringJson",
            15 => "Uuid",
            16 => "Port",
            17 => "IPv4",
            18 => "IPv6",
            19 => "IPAddress",
            _ => "Unknown",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_strips_array_and_chain_flags() {
        let enc = FieldEncoding::from_int(
            FieldEncoding::Value32.as_int() | FieldEncoding::CArrayFlag | FieldEncoding::ChainFlag,
        );
        assert_eq!(enc.base(), FieldEncoding::Value32);
        assert!(enc.is_carray());
        assert!(!enc.is_varray());
        assert!(enc.has_chain_flag());
    }

    #[test]
    fn fixed_element_size_matches_scalar_width() {
        assert_eq!(FieldEncoding::Value8.fixed_element_size(), 1);
        assert_eq!(FieldEncoding::Value128.fixed_element_size(), 16);
        assert_eq!(FieldEncoding::ZStringChar8.fixed_element_size(), 0);
        assert_eq!(FieldEncoding::Struct.fixed_element_size(), 0);
    }

    #[test]
    fn format_chain_flag_and_struct_field_count() {
        let fmt = FieldFormat::from_int(5 | FieldFormat::ChainFlag);
        assert!(fmt.has_chain_flag());
        assert_eq!(fmt.as_struct_field_count(), 5);
    }
}
