//! Decoder-wide formatting knobs, expressed as two independent bitsets
//! rather than a grab-bag of booleans: [`ConvertOptions`] controls how an
//! individual value is rendered, [`MetaOptions`] controls which metadata
//! properties a JSON sink attaches to the event object.

use core::ops::{BitAnd, BitOr, BitOrAssign};

/// Knobs controlling text/JSON rendering of individual field values.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct ConvertOptions(pub u32);

impl ConvertOptions {
    /// No bits set.
    pub const None: Self = Self(0);
    /// Insert a space after commas and colons in composite output.
    pub const Space: Self = Self(0x01);
    /// Include the event/item name as a leading property.
    pub const RootName: Self = Self(0x02);
    /// Append `;tag=0xNNNN` to a field's rendered name when its tag is nonzero.
    pub const FieldTag: Self = Self(0x04);
    /// Render floats with extra precision instead of the shortest round-trip form.
    pub const FloatExtraPrecision: Self = Self(0x10);
    /// Render NaN/Infinity as quoted strings instead of (invalid) JSON numbers.
    pub const FloatNonFiniteAsString: Self = Self(0x20);
    /// Render hex-formatted integers as quoted strings (`"0x2a"`) instead of numbers.
    pub const IntHexAsString: Self = Self(0x40);
    /// Render out-of-range booleans (not 0/1) as a quoted numeric string.
    pub const BoolOutOfRangeAsString: Self = Self(0x80);
    /// Render in-range Unix timestamps as an ISO-8601 string.
    pub const UnixTimeWithinRangeAsString: Self = Self(0x100);
    /// Render out-of-range Unix timestamps as a quoted numeric string.
    pub const UnixTimeOutOfRangeAsString: Self = Self(0x200);
    /// Render recognized errno values as their symbolic name.
    pub const ErrnoKnownAsString: Self = Self(0x400);
    /// Render unrecognized errno values as a quoted numeric string.
    pub const ErrnoUnknownAsString: Self = Self(0x800);
    /// Replace C0 control characters in strings with a space.
    pub const StringControlCharsReplaceWithSpace: Self = Self(0x10000);
    /// Escape C0 control characters in strings using JSON `\u00NN` escapes.
    pub const StringControlCharsJsonEscape: Self = Self(0x20000);
    /// Mask covering both control-character handling bits.
    pub const StringControlCharsMask: Self = Self(
        Self::StringControlCharsReplaceWithSpace.0 | Self::StringControlCharsJsonEscape.0,
    );

    /// The reasonable default for a JSON sink: spaces, root names, field tags,
    /// friendly renderings for time/errno/bool, JSON-escaped control chars.
    pub const Default: Self = Self(
        Self::Space.0
            | Self::RootName.0
            | Self::FieldTag.0
            | Self::FloatNonFiniteAsString.0
            | Self::BoolOutOfRangeAsString.0
            | Self::UnixTimeWithinRangeAsString.0
            | Self::UnixTimeOutOfRangeAsString.0
            | Self::ErrnoKnownAsString.0
            | Self::StringControlCharsJsonEscape.0,
    );

    /// Every bit set.
    pub const All: Self = Self(!0);

    /// True if every bit in `other` is set in `self`.
    pub const fn has(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ConvertOptions {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ConvertOptions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ConvertOptions {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

/// Knobs controlling which event-level metadata properties a JSON sink emits
/// alongside the user fields (the `meta` sub-object of 4.G).
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct MetaOptions(pub u32);

impl MetaOptions {
    /// No bits set.
    pub const None: Self = Self(0);
    /// Identity string (`n`: `provider:event`).
    pub const N: Self = Self(0x1);
    /// `time`.
    pub const Time: Self = Self(0x2);
    /// `cpu`.
    pub const Cpu: Self = Self(0x4);
    /// `pid`.
    pub const Pid: Self = Self(0x8);
    /// `tid` (omitted when equal to `pid`).
    pub const Tid: Self = Self(0x10);
    /// `id`.
    pub const Id: Self = Self(0x20);
    /// `version`.
    pub const Version: Self = Self(0x40);
    /// `level`.
    pub const Level: Self = Self(0x80);
    /// `keyword`.
    pub const Keyword: Self = Self(0x100);
    /// `opcode`.
    pub const Opcode: Self = Self(0x200);
    /// `tag`.
    pub const Tag: Self = Self(0x400);
    /// `activity`.
    pub const Activity: Self = Self(0x800);
    /// `relatedActivity`.
    pub const RelatedActivity: Self = Self(0x1000);
    /// `provider`.
    pub const Provider: Self = Self(0x10000);
    /// `event`.
    pub const Event: Self = Self(0x20000);
    /// `options`.
    pub const Options: Self = Self(0x40000);
    /// `flags`.
    pub const Flags: Self = Self(0x80000);
    /// `time`, `cpu`, `pid`, `tid` — the fields common to any record, EventHeader or not.
    pub const Common: Self = Self(0x100000);

    /// The reasonable default for a JSON sink.
    pub const Default: Self = Self(0xffff);
    /// Every bit set.
    pub const All: Self = Self(!0);

    /// True if every bit in `other` is set in `self`.
    pub const fn has(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for MetaOptions {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for MetaOptions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for MetaOptions {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convert_options_default_includes_root_name_and_space() {
        assert!(ConvertOptions::Default.has(ConvertOptions::RootName));
        assert!(ConvertOptions::Default.has(ConvertOptions::Space));
        assert!(!ConvertOptions::Default.has(ConvertOptions::IntHexAsString));
    }

    #[test]
    fn meta_options_combine_with_bitor() {
        let opts = MetaOptions::Pid | MetaOptions::Tid;
        assert!(opts.has(MetaOptions::Pid));
        assert!(opts.has(MetaOptions::Tid));
        assert!(!opts.has(MetaOptions::Cpu));
    }
}
