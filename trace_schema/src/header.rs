use crate::enums::ExtensionKind;
use crate::enums::HeaderFlags;
use crate::enums::Level;
use crate::enums::Opcode;

/// The fixed prefix that begins every EventHeader-encoded tracepoint payload.
///
/// If [`EventHeader::flags`] has [`HeaderFlags::Extension`] set, this struct is
/// immediately followed (no padding) by one or more [`EventHeaderExtension`]
/// blocks; otherwise it is immediately followed by the event's user payload.
///
/// For a given event definition (same name, or same id+version) every field of
/// this struct should be constant across occurrences: a runtime-variable level
/// should instead be modeled as distinct event definitions.
#[repr(C)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct EventHeader {
    /// Pointer width, byte order, and whether extension blocks follow.
    pub flags: HeaderFlags,
    /// 0 unless the event has a manually-assigned stable id; bumped on breaking changes.
    pub version: u8,
    /// 0 unless the event has a manually-assigned stable id.
    pub id: u16,
    /// Provider-defined 16-bit value, echoed back on every field that sets its own tag.
    pub tag: u16,
    /// Special semantics: informational, activity-start, activity-stop, etc.
    pub opcode: Opcode,
    /// Severity: 1=critical .. 5=verbose.
    pub level: Level,
}

impl EventHeader {
    /// Size of this struct on the wire, in bytes.
    pub const WIRE_SIZE: usize = 8;

    /// Builds a header for a plain informational event.
    pub const fn new(level: Level, has_extension: bool) -> Self {
        Self {
            flags: if has_extension {
                HeaderFlags::DefaultWithExtension
            } else {
                HeaderFlags::Default
            },
            version: 0,
            id: 0,
            tag: 0,
            opcode: Opcode::Info,
            level,
        }
    }

    /// Builds a header from already-decoded field values.
    pub const fn from_parts(
        flags: HeaderFlags,
        version: u8,
        id: u16,
        tag: u16,
        opcode: Opcode,
        level: Level,
    ) -> Self {
        Self {
            flags,
            version,
            id,
            tag,
            opcode,
            level,
        }
    }
}

/// Header of one extension block following an [`EventHeader`].
///
/// An extension block is this 4-byte header followed immediately (no
/// alignment) by `size` bytes of extension-specific data. If
/// [`EventHeaderExtension::kind`] has the chain flag set, another extension
/// block follows that data; otherwise the event's user payload follows.
#[repr(C)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct EventHeaderExtension {
    /// Size, in bytes, of the data block that follows this header.
    pub size: u16,
    /// What kind of data the block holds, plus the chain flag.
    pub kind: ExtensionKind,
}

impl EventHeaderExtension {
    /// Size of this struct on the wire, in bytes.
    pub const WIRE_SIZE: usize = 4;

    /// Builds an extension header of the given kind with `size = 0`.
    pub const fn new(kind: ExtensionKind) -> Self {
        Self { size: 0, kind }
    }

    /// Builds an extension header from already-decoded field values.
    pub const fn from_parts(size: u16, kind: ExtensionKind, chain: bool) -> Self {
        Self {
            size,
            kind: if chain {
                ExtensionKind::from_int(kind.as_int() | ExtensionKind::ChainFlag)
            } else {
                kind
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_sets_extension_flag_only_when_requested() {
        let h = EventHeader::new(Level::Info, true);
        assert!(h.flags.has_flag(HeaderFlags::Extension));
        let h = EventHeader::new(Level::Info, false);
        assert!(!h.flags.has_flag(HeaderFlags::Extension));
    }

    #[test]
    fn extension_from_parts_sets_chain_flag() {
        let ext = EventHeaderExtension::from_parts(12, ExtensionKind::Metadata, true);
        assert!(ext.kind.has_chain_flag());
        assert_eq!(ext.kind.without_chain_flag(), ExtensionKind::Metadata);
        assert_eq!(ext.size, 12);
    }
}
