// Closed, tagged-integer sum types for the EventHeader wire format.
//
// These mirror the C ABI exactly: each type is a newtype over the integer
// that is actually stored on the wire, with named constants instead of a
// `match`-friendly Rust `enum`. That keeps `from_int`/unknown values
// representable (an unrecognized opcode must still round-trip) rather than
// panicking on deserialization.

use core::fmt;
use core::ops::{BitOr, BitOrAssign};

/// Bits carried in [`crate::EventHeader::flags`].
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct HeaderFlags(pub u8);

impl HeaderFlags {
    /// No bits set.
    pub const None: Self = Self(0);
    /// Event uses 64-bit pointers.
    pub const Pointer64: Self = Self(0x01);
    /// Event was written in little-endian byte order.
    pub const LittleEndian: Self = Self(0x02);
    /// The header is followed by one or more extension blocks.
    pub const Extension: Self = Self(0x04);

    /// `Pointer64 | LittleEndian`, the usual value for a little-endian producer.
    pub const Default: Self = Self(Self::Pointer64.0 | Self::LittleEndian.0);
    /// [`Self::Default`] plus [`Self::Extension`].
    pub const DefaultWithExtension: Self =
        Self(Self::Default.0 | Self::Extension.0);

    /// Mask of bits this crate understands; unknown bits make an event unparsable.
    pub const KNOWN: Self =
        Self(Self::Pointer64.0 | Self::LittleEndian.0 | Self::Extension.0);

    /// Returns the raw byte.
    pub const fn as_int(self) -> u8 {
        self.0
    }

    /// Wraps a raw byte, no validation.
    pub const fn from_int(value: u8) -> Self {
        Self(value)
    }

    /// True if all bits in `other` are set in `self`.
    pub const fn has_flag(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for HeaderFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for HeaderFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl From<u8> for HeaderFlags {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<HeaderFlags> for u8 {
    fn from(value: HeaderFlags) -> Self {
        value.0
    }
}

impl fmt::Display for HeaderFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

/// Event severity level: lower numbers are more severe.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Level(pub u8);

impl Level {
    /// Unset/unspecified.
    pub const Invalid: Self = Self(0);
    /// Fatal to the process.
    pub const Critical: Self = Self(1);
    /// An error occurred.
    pub const Error: Self = Self(2);
    /// A condition worth flagging but not an error.
    pub const Warning: Self = Self(3);
    /// Ordinary informational event.
    pub const Info: Self = Self(4);
    /// Detailed diagnostic event.
    pub const Verbose: Self = Self(5);

    /// Returns a name for the well-known levels, `None` for anything else.
    pub const fn as_str(self) -> Option<&'static str> {
        match self.0 {
            0 => Some("Invalid"),
            1 => Some("Critical"),
            2 => Some("Error"),
            3 => Some("Warning"),
            4 => Some("Info"),
            5 => Some("Verbose"),
            _ => None,
        }
    }

    /// Raw byte value.
    pub const fn as_int(self) -> u8 {
        self.0
    }

    /// Wraps a raw byte.
    pub const fn from_int(value: u8) -> Self {
        Self(value)
    }
}

impl From<u8> for Level {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<Level> for u8 {
    fn from(value: Level) -> Self {
        value.0
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) => f.pad(s),
            None => self.0.fmt(f),
        }
    }
}

/// Special semantics for an event, borrowed from the ETW opcode space.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Opcode(pub u8);

impl Opcode {
    /// Ordinary informational event (the default).
    pub const Info: Self = Self(0);
    /// Marks the start of a correlated activity.
    pub const ActivityStart: Self = Self(1);
    /// Marks the end of a correlated activity.
    pub const ActivityStop: Self = Self(2);
    /// Start of a data collection.
    pub const CollectionStart: Self = Self(3);
    /// End of a data collection.
    pub const CollectionStop: Self = Self(4);
    /// Provider-defined extension event.
    pub const Extension: Self = Self(5);
    /// Reply to a request.
    pub const Reply: Self = Self(6);
    /// Resumption of a suspended activity.
    pub const Resume: Self = Self(7);
    /// Suspension of an activity.
    pub const Suspend: Self = Self(8);
    /// One side of a send/receive pair.
    pub const Send: Self = Self(9);
    /// The other side of a send/receive pair.
    pub const Receive: Self = Self(240);

    /// Returns a name for the well-known opcodes, `None` for anything else.
    pub const fn as_str(self) -> Option<&'static str> {
        match self.0 {
            0 => Some("Info"),
            1 => Some("ActivityStart"),
            2 => Some("ActivityStop"),
            3 => Some("CollectionStart"),
            4 => Some("CollectionStop"),
            5 => Some("Extension"),
            6 => Some("Reply"),
            7 => Some("Resume"),
            8 => Some("Suspend"),
            9 => Some("Send"),
            240 => Some("Receive"),
            _ => None,
        }
    }

    /// Raw byte value.
    pub const fn as_int(self) -> u8 {
        self.0
    }

    /// Wraps a raw byte.
    pub const fn from_int(value: u8) -> Self {
        Self(value)
    }
}

impl From<u8> for Opcode {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<Opcode> for u8 {
    fn from(value: Opcode) -> Self {
        value.0
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Some(s) => f.pad(s),
            None => self.0.fmt(f),
        }
    }
}

/// Kind tag for an [`crate::EventHeaderExtension`] block.
///
/// The high bit of the 16-bit wire value is the chain flag (another
/// extension follows); the low 15 bits identify the kind.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct ExtensionKind(pub u16);

impl ExtensionKind {
    /// Bit indicating another extension block follows this one.
    pub const ChainFlag: u16 = 0x8000;
    /// Mask of the kind bits, excluding the chain flag.
    pub const ValueMask: u16 = 0x7fff;

    /// Not a valid extension; never appears on the wire.
    pub const Invalid: Self = Self(0);
    /// Carries the event name and field-definition stream.
    pub const Metadata: Self = Self(1);
    /// Carries a 16- or 32-byte activity id (and, if 32 bytes, a related activity id).
    pub const ActivityId: Self = Self(2);

    /// Kind with the chain flag cleared.
    pub const fn without_chain_flag(self) -> Self {
        Self(self.0 & Self::ValueMask)
    }

    /// True if another extension block follows this one.
    pub const fn has_chain_flag(self) -> bool {
        self.0 & Self::ChainFlag != 0
    }

    /// Raw wire value, chain flag included.
    pub const fn as_int(self) -> u16 {
        self.0
    }

    /// Wraps a raw wire value.
    pub const fn from_int(value: u16) -> Self {
        Self(value)
    }
}

impl From<u16> for ExtensionKind {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl From<ExtensionKind> for u16 {
    fn from(value: ExtensionKind) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_flags_default_has_expected_bits() {
        assert!(HeaderFlags::Default.has_flag(HeaderFlags::Pointer64));
        assert!(HeaderFlags::Default.has_flag(HeaderFlags::LittleEndian));
        assert!(!HeaderFlags::Default.has_flag(HeaderFlags::Extension));
        assert!(HeaderFlags::DefaultWithExtension.has_flag(HeaderFlags::Extension));
    }

    #[test]
    fn extension_kind_chain_flag_round_trips() {
        let chained = ExtensionKind::from_int(ExtensionKind::Metadata.as_int() | ExtensionKind::ChainFlag);
        assert!(chained.has_chain_flag());
        assert_eq!(chained.without_chain_flag(), ExtensionKind::Metadata);
    }

    #[test]
    fn level_display_names_known_values() {
        assert_eq!(Level::Verbose.to_string(), "Verbose");
        assert_eq!(Level::from_int(200).to_string(), "200");
    }
}
