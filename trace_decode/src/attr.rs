//! `perf_event_attr`-equivalent types: the per-stream configuration that
//! tells a reader which optional fields are present in a sample or
//! non-sample record, and at what bit each option lives.

use core::ops::{BitAnd, BitOr};

/// Major type of a `perf_event_attr` (hardware counter, tracepoint, ...).
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct AttrType(pub u32);

impl AttrType {
    pub const Hardware: Self = Self(0);
    pub const Software: Self = Self(1);
    pub const Tracepoint: Self = Self(2);
    pub const HwCache: Self = Self(3);
    pub const Raw: Self = Self(4);
    pub const Breakpoint: Self = Self(5);
}

/// `perf_event_attr.sample_type`: which optional fields ride along with
/// every sample (and, if [`AttrOptions::SampleIdAll`] is set, every
/// non-sample record too), and in what order they appear in the payload.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct SampleType(pub u64);

impl SampleType {
    pub const None: Self = Self(0);
    pub const IP: Self = Self(1 << 0);
    pub const Tid: Self = Self(1 << 1);
    pub const Time: Self = Self(1 << 2);
    pub const Addr: Self = Self(1 << 3);
    pub const Read: Self = Self(1 << 4);
    pub const Callchain: Self = Self(1 << 5);
    pub const Id: Self = Self(1 << 6);
    pub const Cpu: Self = Self(1 << 7);
    pub const Period: Self = Self(1 << 8);
    pub const StreamId: Self = Self(1 << 9);
    pub const Raw: Self = Self(1 << 10);
    pub const BranchStack: Self = Self(1 << 11);
    pub const RegsUser: Self = Self(1 << 12);
    pub const StackUser: Self = Self(1 << 13);
    pub const Weight: Self = Self(1 << 14);
    pub const DataSrc: Self = Self(1 << 15);
    pub const Identifier: Self = Self(1 << 16);
    pub const Transaction: Self = Self(1 << 17);
    pub const RegsIntr: Self = Self(1 << 18);
    pub const PhysAddr: Self = Self(1 << 19);

    pub const fn has_flag(self, mask: Self) -> bool {
        self.0 & mask.0 == mask.0
    }
}

impl BitOr for SampleType {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitAnd for SampleType {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

/// `perf_event_attr.read_format`.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct ReadFormat(pub u64);

impl ReadFormat {
    pub const None: Self = Self(0);
    pub const TotalTimeEnabled: Self = Self(1 << 0);
    pub const TotalTimeRunning: Self = Self(1 << 1);
    pub const Id: Self = Self(1 << 2);
    pub const Group: Self = Self(1 << 3);
    pub const Lost: Self = Self(1 << 4);

    pub const fn has_flag(self, mask: Self) -> bool {
        self.0 & mask.0 == mask.0
    }
}

/// `perf_event_attr`'s bit-field options (disabled, inherit, exclude_*,
/// sample_id_all, ...), collapsed to a single u64 bitset.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct AttrOptions(pub u64);

impl AttrOptions {
    pub const None: Self = Self(0);
    pub const Disabled: Self = Self(1 << 0);
    pub const Inherit: Self = Self(1 << 1);
    pub const Pinned: Self = Self(1 << 2);
    pub const Exclusive: Self = Self(1 << 3);
    pub const ExcludeUser: Self = Self(1 << 4);
    pub const ExcludeKernel: Self = Self(1 << 5);
    pub const ExcludeHypervisor: Self = Self(1 << 6);
    pub const ExcludeIdle: Self = Self(1 << 7);
    pub const Mmap: Self = Self(1 << 8);
    pub const Comm: Self = Self(1 << 9);
    pub const Freq: Self = Self(1 << 10);
    /// `sample_id_all`: every record (not just samples) carries a
    /// `SampleType`-shaped identifier tail.
    pub const SampleIdAll: Self = Self(1 << 18);

    pub const fn has_flag(self, mask: Self) -> bool {
        self.0 & mask.0 == mask.0
    }
}

/// Offsets (in bytes, from the start or end of a record) at which each
/// `SampleType` field can be found, precomputed once per attribute so that
/// resolving a record's identity is O(1) rather than a bit-scan per record.
#[derive(Clone, Copy, Debug, Default)]
pub struct SampleTypeOffsets {
    /// Offset of `id` within the payload of a `Sample` record, or `None`.
    pub sample_id: Option<u16>,
    /// Offset of `time` within the payload of a `Sample` record, or `None`.
    pub sample_time: Option<u16>,
    /// Offset of `cpu` within the payload of a `Sample` record, or `None`.
    pub sample_cpu: Option<u16>,
    /// Offset of `tid`/`pid` within the payload of a `Sample` record, or `None`.
    pub sample_tid: Option<u16>,
    /// Offset of `stream_id`, or `None`.
    pub sample_stream_id: Option<u16>,
    /// Offset (from the *end* of a non-sample record) of its `SampleType`
    /// identifier tail, valid only when `sample_id_all` is set.
    pub non_sample_tail_size: u16,
}

impl SampleTypeOffsets {
    /// Computes field offsets from a `sample_type` bitset, in the fixed
    /// order the kernel ABI defines: `Identifier, IP, Tid, Time, Addr, Id,
    /// StreamId, Cpu, Period`. `sample_type` may include bits this decoder
    /// does not resolve an offset for (e.g. `Callchain`); they are skipped
    /// by size but not exposed as a named offset.
    pub fn compute(sample_type: SampleType) -> Self {
        let mut offset: u16 = 0;
        let mut out = Self::default();
        let mut advance = |size: u16| {
            let at = offset;
            offset += size;
            at
        };

        if sample_type.has_flag(SampleType::Identifier) {
            advance(8);
        }
        if sample_type.has_flag(SampleType::IP) {
            advance(8);
        }
        if sample_type.has_flag(SampleType::Tid) {
            out.sample_tid = Some(advance(8));
        }
        if sample_type.has_flag(SampleType::Time) {
            out.sample_time = Some(advance(8));
        }
        if sample_type.has_flag(SampleType::Addr) {
            advance(8);
        }
        if sample_type.has_flag(SampleType::Id) {
            out.sample_id = Some(advance(8));
        }
        if sample_type.has_flag(SampleType::StreamId) {
            out.sample_stream_id = Some(advance(8));
        }
        if sample_type.has_flag(SampleType::Cpu) {
            out.sample_cpu = Some(advance(8));
        }
        if sample_type.has_flag(SampleType::Period) {
            advance(8);
        }

        out.non_sample_tail_size = offset;
        out
    }
}
