//! Derived, ephemeral views over one record: the identifier fields pulled
//! out of a `Sample` record's payload or a non-sample record's tail,
//! resolved against the record's [`EventDesc`].

use crate::byte_reader::ByteReader;
use crate::event_desc::EventDesc;
use crate::session::{SessionInfo, UnixTimeSpec};

/// Record-level lookup failure. Distinct from [`crate::walker::WalkerError`],
/// which only ever applies once a record's identity is already known.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SampleInfoError {
    /// The record is shorter than its declared identifier fields require.
    InvalidData,
    /// No [`EventDesc`] is known for this record's `id`.
    IdNotFound,
    /// The owning attribute does not carry `sample_id_all`, so a non-sample
    /// record has no resolvable identifier tail.
    NoData,
}

impl core::fmt::Display for SampleInfoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            SampleInfoError::InvalidData => "invalid data",
            SampleInfoError::IdNotFound => "id not found",
            SampleInfoError::NoData => "no identifier tail for this record",
        };
        f.write_str(s)
    }
}

/// Derived view over a `Sample` record: the fixed identifier fields plus
/// the raw tracepoint payload, all borrowed from the record's buffer.
#[derive(Clone, Copy, Debug)]
pub struct SampleEventInfo<'dat, 'desc> {
    pub raw_data: &'dat [u8],
    pub byte_reader: ByteReader,
    pub event_desc: &'desc EventDesc,
    pub time_ns: u64,
    pub cpu: u32,
    pub pid: u32,
    pub tid: u32,
    pub id: u64,
    pub stream_id: u64,
}

impl<'dat, 'desc> SampleEventInfo<'dat, 'desc> {
    /// Parses the identifier fields out of `payload` (everything after the
    /// record header) per `event_desc`'s attribute, then hands back the
    /// remainder as `raw_data`.
    ///
    /// Field order and presence follow `event_desc.offsets()`, computed
    /// once per attribute from its `sample_type` bitset; `tid` here is
    /// pid/tid as a combined 8-byte cell, split into the two u32 halves.
    pub fn parse(
        payload: &'dat [u8],
        byte_reader: ByteReader,
        event_desc: &'desc EventDesc,
    ) -> Result<Self, SampleInfoError> {
        let offsets = event_desc.offsets();
        let tail_end = [
            offsets.sample_id.map(|o| o as usize + 8),
            offsets.sample_time.map(|o| o as usize + 8),
            offsets.sample_cpu.map(|o| o as usize + 8),
            offsets.sample_tid.map(|o| o as usize + 8),
            offsets.sample_stream_id.map(|o| o as usize + 8),
        ]
        .into_iter()
        .flatten()
        .max()
        .unwrap_or(0);

        if payload.len() < tail_end {
            return Err(SampleInfoError::InvalidData);
        }

        let read_u32_pair = |off: u16| -> (u32, u32) {
            let start = off as usize;
            let lo = byte_reader.read_u32(&payload[start..start + 4]);
            let hi = byte_reader.read_u32(&payload[start + 4..start + 8]);
            (lo, hi)
        };
        let read_u64 = |off: u16| -> u64 {
            let start = off as usize;
            byte_reader.read_u64(&payload[start..start + 8])
        };

        let (pid, tid) = match offsets.sample_tid {
            Some(off) => read_u32_pair(off),
            None => (0, 0),
        };

        Ok(Self {
            raw_data: &payload[tail_end..],
            byte_reader,
            event_desc,
            time_ns: offsets.sample_time.map(read_u64).unwrap_or(0),
            cpu: offsets.sample_cpu.map(|off| read_u32_pair(off).0).unwrap_or(0),
            pid,
            tid,
            id: offsets.sample_id.map(read_u64).unwrap_or(0),
            stream_id: offsets.sample_stream_id.map(read_u64).unwrap_or(0),
        })
    }

    pub fn time_unix(&self, session: &SessionInfo) -> UnixTimeSpec {
        session.time_to_unix(self.time_ns)
    }
}

/// Derived view over a non-sample record's identifier tail. Only populated
/// when the owning attribute has `sample_id_all` set.
#[derive(Clone, Copy, Debug)]
pub struct NonSampleEventInfo<'desc> {
    pub event_desc: &'desc EventDesc,
    pub time_ns: u64,
    pub cpu: u32,
    pub pid: u32,
    pub tid: u32,
    pub id: u64,
}

impl<'desc> NonSampleEventInfo<'desc> {
    /// Parses the `SampleType`-shaped tail appended to a non-sample record
    /// when `sample_id_all` is set. `tail` must be exactly
    /// `event_desc.offsets().non_sample_tail_size` bytes (the caller slices
    /// it from the end of the record).
    pub fn parse(
        tail: &[u8],
        byte_reader: ByteReader,
        event_desc: &'desc EventDesc,
    ) -> Result<Self, SampleInfoError> {
        if !event_desc.attr().sample_id_all() {
            return Err(SampleInfoError::NoData);
        }
        let offsets = event_desc.offsets();
        if tail.len() < offsets.non_sample_tail_size as usize {
            return Err(SampleInfoError::InvalidData);
        }

        let read_u32_pair = |off: u16| -> (u32, u32) {
            let start = off as usize;
            let lo = byte_reader.read_u32(&tail[start..start + 4]);
            let hi = byte_reader.read_u32(&tail[start + 4..start + 8]);
            (lo, hi)
        };
        let read_u64 = |off: u16| -> u64 {
            let start = off as usize;
            byte_reader.read_u64(&tail[start..start + 8])
        };

        let (pid, tid) = match offsets.sample_tid {
            Some(off) => read_u32_pair(off),
            None => (0, 0),
        };

        Ok(Self {
            event_desc,
            time_ns: offsets.sample_time.map(read_u64).unwrap_or(0),
            cpu: offsets.sample_cpu.map(|off| read_u32_pair(off).0).unwrap_or(0),
            pid,
            tid,
            id: offsets.sample_id.map(read_u64).unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    extern crate alloc;

    use super::*;
    use crate::attr::{AttrOptions, SampleType};
    use crate::event_desc::EventAttr;
    use alloc::string::String;
    use alloc::vec::Vec;

    fn desc_with(sample_type: SampleType, sample_id_all: bool) -> EventDesc {
        let options = if sample_id_all { AttrOptions::SampleIdAll } else { AttrOptions::None };
        let attr = EventAttr {
            sample_type,
            options,
            ..EventAttr::default()
        };
        EventDesc::new(attr, String::from("test:event"), None, Vec::new())
    }

    #[test]
    fn sample_parse_splits_identifiers_from_raw_payload() {
        let desc = desc_with(SampleType::Tid | SampleType::Time, false);
        let mut payload = Vec::new();
        payload.extend_from_slice(&100u32.to_le_bytes()); // pid
        payload.extend_from_slice(&200u32.to_le_bytes()); // tid
        payload.extend_from_slice(&5_000_000_000u64.to_le_bytes()); // time
        payload.extend_from_slice(&[0xAA, 0xBB]); // user payload

        let info = SampleEventInfo::parse(&payload, ByteReader::host_endian(), &desc).unwrap();
        assert_eq!(info.pid, 100);
        assert_eq!(info.tid, 200);
        assert_eq!(info.time_ns, 5_000_000_000);
        assert_eq!(info.raw_data, &[0xAA, 0xBB]);
    }

    #[test]
    fn truncated_payload_is_invalid_data() {
        let desc = desc_with(SampleType::Time, false);
        let err = SampleEventInfo::parse(&[0u8; 4], ByteReader::host_endian(), &desc).unwrap_err();
        assert_eq!(err, SampleInfoError::InvalidData);
    }

    #[test]
    fn non_sample_without_sample_id_all_is_no_data() {
        let desc = desc_with(SampleType::Time, false);
        let err = NonSampleEventInfo::parse(&[0u8; 8], ByteReader::host_endian(), &desc).unwrap_err();
        assert_eq!(err, SampleInfoError::NoData);
    }
}
