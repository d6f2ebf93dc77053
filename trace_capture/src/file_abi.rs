//! Fixed-layout pieces of the `perf.data` v2 container: the file header and
//! the `{offset, size}` pairs that locate its sections.
//!
//! Unlike a `#[repr(C)]` struct read via `transmute`, every value here is
//! pulled out of the file's byte buffer field-by-field through a
//! [`ByteReader`], so there is no unsafe code and no reliance on the host's
//! struct layout matching the kernel's — only the documented byte offsets
//! have to match.

use trace_decode::ByteReader;

/// First 8 bytes of a `perf.data` file when read in host byte order.
pub const MAGIC_HOST_ENDIAN: u64 = 0x32454C4946524550;
/// First 8 bytes of a `perf.data` file recorded on a byte-swapped host.
pub const MAGIC_SWAP_ENDIAN: u64 = 0x50455246494C4532;

/// Size of the pipe-mode prefix (`magic`, `size`) common to every file.
pub const PIPE_HEADER_SIZE: usize = 16;
/// Total header size for a seekable (non-pipe) file.
pub const FILE_HEADER_SIZE: usize = 104;
/// Smallest `perf_event_attr` size the format has ever defined.
pub const ATTR_VER0_SIZE: u64 = 64;

/// One `{offset, size}` pair locating a section within the file.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FileSection {
    pub offset: u64,
    pub size: u64,
}

impl FileSection {
    pub const WIRE_SIZE: usize = 16;

    pub fn parse(reader: ByteReader, bytes: &[u8]) -> Self {
        Self {
            offset: reader.read_u64(&bytes[0..8]),
            size: reader.read_u64(&bytes[8..16]),
        }
    }

    pub const fn end(&self) -> u64 {
        self.offset + self.size
    }

    /// True if the section fits entirely within a buffer of `len` bytes.
    pub fn valid(&self, len: u64) -> bool {
        self.size < 0x8000_0000 && self.end() <= len
    }
}

/// The fixed part of a `perf.data` v2 header, following the 16-byte pipe
/// prefix (`magic`, `size`).
#[derive(Clone, Copy, Debug, Default)]
pub struct FileHeader {
    pub attr_size: u64,
    pub attrs: FileSection,
    pub data: FileSection,
    pub event_types: FileSection,
    /// 256-bit feature bitmap; only `flags[0]` (bits 0..63) is interpreted.
    pub flags: [u64; 4],
}

impl FileHeader {
    /// Size of the part parsed here, i.e. `FILE_HEADER_SIZE - PIPE_HEADER_SIZE`.
    pub const WIRE_SIZE: usize = FILE_HEADER_SIZE - PIPE_HEADER_SIZE;

    pub fn parse(reader: ByteReader, bytes: &[u8]) -> Self {
        let mut flags = [0u64; 4];
        for (i, slot) in flags.iter_mut().enumerate() {
            *slot = reader.read_u64(&bytes[56 + i * 8..64 + i * 8]);
        }
        Self {
            attr_size: reader.read_u64(&bytes[0..8]),
            attrs: FileSection::parse(reader, &bytes[8..24]),
            data: FileSection::parse(reader, &bytes[24..40]),
            event_types: FileSection::parse(reader, &bytes[40..56]),
            flags,
        }
    }

    /// True if feature bit `index` (0..63) is set in `flags[0]`.
    pub const fn has_feature(&self, index: u32) -> bool {
        self.flags[0] & (1u64 << index) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_end_is_offset_plus_size() {
        let s = FileSection { offset: 100, size: 40 };
        assert_eq!(s.end(), 140);
    }

    #[test]
    fn section_rejects_out_of_bounds() {
        let s = FileSection { offset: 100, size: 40 };
        assert!(s.valid(140));
        assert!(!s.valid(139));
    }

    #[test]
    fn header_parses_fixed_fields() {
        let mut bytes = alloc_test_bytes();
        bytes[0..8].copy_from_slice(&64u64.to_le_bytes());
        let header = FileHeader::parse(ByteReader::new(false), &bytes);
        assert_eq!(header.attr_size, 64);
    }

    fn alloc_test_bytes() -> Vec<u8> {
        vec![0u8; FileHeader::WIRE_SIZE]
    }
}
