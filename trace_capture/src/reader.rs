//! The main capture reader: opens a `perf.data` v2 byte buffer, resolves
//! its attribute table into [`EventDesc`]s, and walks its records in either
//! file order or time order.
//!
//! Everything is parsed from a borrowed `&[u8]` up front; there is no
//! paged/streaming input abstraction and no pipe-mode support (a stream
//! with no attrs section ahead of its data has nothing for `open` to
//! resolve against, so it is reported as [`CaptureError::NotSupported`]
//! rather than partially handled).

use std::collections::HashMap;

use trace_decode::{
    AttrOptions, AttrType, ByteReader, EventAttr, EventDesc, NonSampleEventInfo, SampleEventInfo,
    SampleInfoError, SampleType, SampleTypeOffsets, SessionInfo,
};

use crate::file_abi::{FileHeader, FileSection, ATTR_VER0_SIZE, FILE_HEADER_SIZE, MAGIC_HOST_ENDIAN, MAGIC_SWAP_ENDIAN, PIPE_HEADER_SIZE};
use crate::header_index::{CLOCKID, CLOCK_DATA};

const RECORD_HEADER_SIZE: u64 = 8;
const RECORD_TYPE_SAMPLE: u32 = 9;
const RECORD_TYPE_FINISHED_ROUND: u32 = 68;
const RECORD_TYPE_FINISHED_INIT: u32 = 82;
/// Size, in bytes, of one entry in the attrs section: a `perf_event_attr`
/// of the file's declared `attr_size` followed by one ids [`FileSection`].
const IDS_SECTION_SIZE: u64 = FileSection::WIRE_SIZE as u64;

/// What went wrong opening a file or resolving one of its records.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CaptureError {
    /// The buffer is truncated, a section is out of bounds, or a record's
    /// declared size doesn't fit the data available.
    InvalidData,
    /// A record's `id` does not match any attribute in the file.
    IdNotFound,
    /// A non-sample record was asked for identifier fields that only exist
    /// when the owning attribute sets `sample_id_all`.
    NoData,
    /// The file is a pipe-mode stream (no attrs section to resolve ids
    /// against up front).
    NotSupported,
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CaptureError::InvalidData => "invalid data",
            CaptureError::IdNotFound => "id not found",
            CaptureError::NoData => "no identifier tail for this record",
            CaptureError::NotSupported => "pipe-mode capture files are not supported",
        };
        f.write_str(s)
    }
}

impl std::error::Error for CaptureError {}

impl From<SampleInfoError> for CaptureError {
    fn from(e: SampleInfoError) -> Self {
        match e {
            SampleInfoError::InvalidData => CaptureError::InvalidData,
            SampleInfoError::IdNotFound => CaptureError::IdNotFound,
            SampleInfoError::NoData => CaptureError::NoData,
        }
    }
}

/// Delivery order for [`CaptureReader::next_record`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CaptureOrder {
    /// Records are returned exactly as they appear in the data section.
    File,
    /// Records are buffered one "round" at a time (a run terminated by a
    /// `FinishedRound`/`FinishedInit` record) and delivered sorted by
    /// timestamp, ties broken by file order.
    Time,
}

/// One record as it appears in the file: an 8-byte header plus payload.
#[derive(Clone, Copy, Debug)]
pub struct RawRecord<'dat> {
    /// `PERF_RECORD_*` type (`Sample` = 9, `Comm`, `Mmap`, ...).
    pub header_type: u32,
    /// Kernel/user-defined misc bits from the record header.
    pub misc: u16,
    bytes: &'dat [u8],
}

impl<'dat> RawRecord<'dat> {
    /// True if this is a `PERF_RECORD_SAMPLE`.
    pub fn is_sample(&self) -> bool {
        self.header_type == RECORD_TYPE_SAMPLE
    }

    /// The record's bytes after its 8-byte header.
    pub fn payload(&self) -> &'dat [u8] {
        &self.bytes[8..]
    }

    /// The full record, header included.
    pub fn bytes(&self) -> &'dat [u8] {
        self.bytes
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct QueueEntry {
    time: u64,
    sequence: u32,
    offset: u64,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.time.cmp(&other.time).then(self.sequence.cmp(&other.sequence))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

struct RecordHeader {
    header_type: u32,
    misc: u16,
    size: u16,
}

/// An open `perf.data` v2 file.
#[derive(Debug)]
pub struct CaptureReader<'dat> {
    bytes: &'dat [u8],
    byte_reader: ByteReader,
    header: FileHeader,
    session: SessionInfo,
    descs: Vec<EventDesc>,
    id_to_desc: HashMap<u64, usize>,
    offsets: SampleTypeOffsets,
    sample_id_all: bool,
    order: CaptureOrder,
    scan_pos: u64,
    queue: Vec<QueueEntry>,
    queue_pos: usize,
    round_sequence: u32,
    rounds_done: bool,
}

impl<'dat> CaptureReader<'dat> {
    /// Parses the file header, attribute table, and recognized feature
    /// sections, then positions the reader at the start of the data
    /// section.
    pub fn open(bytes: &'dat [u8], order: CaptureOrder) -> Result<Self, CaptureError> {
        if bytes.len() < PIPE_HEADER_SIZE {
            return Err(CaptureError::InvalidData);
        }
        let magic = u64::from_ne_bytes(bytes[0..8].try_into().unwrap());
        let host_is_big_endian = cfg!(target_endian = "big");
        let source_big_endian = if magic == MAGIC_HOST_ENDIAN {
            host_is_big_endian
        } else if magic == MAGIC_SWAP_ENDIAN {
            !host_is_big_endian
        } else {
            return Err(CaptureError::InvalidData);
        };
        let byte_reader = ByteReader::new(source_big_endian);
        let pipe_size = byte_reader.read_u64(&bytes[8..16]);
        if pipe_size == PIPE_HEADER_SIZE as u64 {
            return Err(CaptureError::NotSupported);
        }
        if pipe_size != FILE_HEADER_SIZE as u64 || bytes.len() < FILE_HEADER_SIZE {
            return Err(CaptureError::InvalidData);
        }

        let header = FileHeader::parse(byte_reader, &bytes[16..FILE_HEADER_SIZE]);
        let len = bytes.len() as u64;
        if !header.attrs.valid(len) || !header.data.valid(len) || header.attr_size < ATTR_VER0_SIZE {
            return Err(CaptureError::InvalidData);
        }

        let (descs, id_to_desc, offsets, sample_id_all) = Self::read_attrs(bytes, byte_reader, &header)?;
        let session = Self::read_session(bytes, byte_reader, &header)?;

        Ok(Self {
            bytes,
            byte_reader,
            header,
            session,
            descs,
            id_to_desc,
            offsets,
            sample_id_all,
            order,
            scan_pos: bytes_offset(&header),
            queue: Vec::new(),
            queue_pos: 0,
            round_sequence: 0,
            rounds_done: false,
        })
    }

    /// Clock and byte-order context shared by every record in the file.
    pub fn session(&self) -> &SessionInfo {
        &self.session
    }

    /// The resolved attribute table, one entry per distinct `perf_event_attr`.
    pub fn event_descs(&self) -> &[EventDesc] {
        &self.descs
    }

    /// Returns the next record in the order this reader was opened with, or
    /// `None` once the data section is exhausted.
    pub fn next_record(&mut self) -> Result<Option<RawRecord<'dat>>, CaptureError> {
        match self.order {
            CaptureOrder::File => self.next_record_file_order(),
            CaptureOrder::Time => self.next_record_time_order(),
        }
    }

    /// Resolves a `Sample` record's identifier fields, then hands back the
    /// matching descriptor and the remaining tracepoint payload.
    pub fn get_sample_event_info<'r>(
        &'r self,
        record: &RawRecord<'dat>,
    ) -> Result<SampleEventInfo<'dat, 'r>, CaptureError> {
        let payload = record.payload();
        let desc = match self.offsets.sample_id {
            Some(id_off) => {
                let start = id_off as usize;
                if payload.len() < start + 8 {
                    return Err(CaptureError::InvalidData);
                }
                let id = self.byte_reader.read_u64(&payload[start..start + 8]);
                self.desc_for_id(id)?
            }
            // No `id` field rides along with samples (single-attribute
            // capture); the one known descriptor is the only candidate.
            None => self.only_desc()?,
        };
        Ok(SampleEventInfo::parse(payload, self.byte_reader, desc)?)
    }

    /// Resolves a non-sample record's identifier tail, present only when
    /// the owning attribute sets `sample_id_all`.
    pub fn get_non_sample_event_info<'r>(
        &'r self,
        record: &RawRecord<'dat>,
    ) -> Result<NonSampleEventInfo<'r>, CaptureError> {
        if !self.sample_id_all {
            return Err(CaptureError::NoData);
        }
        let tail_size = self.offsets.non_sample_tail_size as usize;
        let bytes = record.bytes();
        if bytes.len() < tail_size {
            return Err(CaptureError::InvalidData);
        }
        let tail = &bytes[bytes.len() - tail_size..];
        let desc = match self.offsets.sample_id {
            Some(id_off) => {
                let id = self.byte_reader.read_u64(&tail[id_off as usize..id_off as usize + 8]);
                self.desc_for_id(id)?
            }
            None => self.only_desc()?,
        };
        Ok(NonSampleEventInfo::parse(tail, self.byte_reader, desc)?)
    }

    fn desc_for_id(&self, id: u64) -> Result<&EventDesc, CaptureError> {
        self.id_to_desc
            .get(&id)
            .map(|&i| &self.descs[i])
            .ok_or(CaptureError::IdNotFound)
    }

    /// Falls back to the sole attribute in files that never embed an `id`
    /// alongside their samples.
    fn only_desc(&self) -> Result<&EventDesc, CaptureError> {
        if self.descs.len() == 1 {
            Ok(&self.descs[0])
        } else {
            Err(CaptureError::IdNotFound)
        }
    }

    fn next_record_file_order(&mut self) -> Result<Option<RawRecord<'dat>>, CaptureError> {
        if self.scan_pos >= self.header.data.end() {
            return Ok(None);
        }
        let record = self.record_at(self.scan_pos)?;
        self.scan_pos += record.bytes.len() as u64;
        Ok(Some(record))
    }

    fn next_record_time_order(&mut self) -> Result<Option<RawRecord<'dat>>, CaptureError> {
        loop {
            if self.queue_pos < self.queue.len() {
                let entry = self.queue[self.queue_pos];
                self.queue_pos += 1;
                return Ok(Some(self.record_at(entry.offset)?));
            }
            if self.rounds_done {
                return Ok(None);
            }
            self.fill_round()?;
            if self.queue.is_empty() {
                self.rounds_done = true;
                return Ok(None);
            }
        }
    }

    fn fill_round(&mut self) -> Result<(), CaptureError> {
        self.queue.clear();
        self.queue_pos = 0;
        loop {
            if self.scan_pos >= self.header.data.end() {
                self.rounds_done = true;
                break;
            }
            let head = self.read_header_at(self.scan_pos)?;
            let forced_last =
                head.header_type == RECORD_TYPE_FINISHED_ROUND || head.header_type == RECORD_TYPE_FINISHED_INIT;
            let time = if forced_last { u64::MAX } else { self.record_time(self.scan_pos, &head) };
            self.queue.push(QueueEntry {
                time,
                sequence: self.round_sequence,
                offset: self.scan_pos,
            });
            self.round_sequence = self.round_sequence.wrapping_add(1);
            self.scan_pos += head.size as u64;
            if forced_last {
                break;
            }
        }
        self.queue.sort_unstable();
        Ok(())
    }

    fn record_time(&self, offset: u64, head: &RecordHeader) -> u64 {
        let Some(time_off) = self.offsets.sample_time else { return 0 };
        let total = head.size as u64;
        let time_off = time_off as u64;
        if head.header_type == RECORD_TYPE_SAMPLE {
            let field_start = offset + RECORD_HEADER_SIZE + time_off;
            if field_start + 8 > offset + total {
                return 0;
            }
            self.byte_reader.read_u64(&self.bytes[field_start as usize..field_start as usize + 8])
        } else if self.sample_id_all {
            let tail_size = self.offsets.non_sample_tail_size as u64;
            if total < tail_size {
                return 0;
            }
            let tail_start = offset + total - tail_size;
            let field_start = tail_start + time_off;
            self.byte_reader.read_u64(&self.bytes[field_start as usize..field_start as usize + 8])
        } else {
            0
        }
    }

    fn read_header_at(&self, offset: u64) -> Result<RecordHeader, CaptureError> {
        let start = offset as usize;
        if self.bytes.len() < start + RECORD_HEADER_SIZE as usize {
            return Err(CaptureError::InvalidData);
        }
        let header_type = self.byte_reader.read_u32(&self.bytes[start..start + 4]);
        let misc = self.byte_reader.read_u16(&self.bytes[start + 4..start + 6]);
        let size = self.byte_reader.read_u16(&self.bytes[start + 6..start + 8]);
        if (size as u64) < RECORD_HEADER_SIZE {
            return Err(CaptureError::InvalidData);
        }
        if self.bytes.len() < start + size as usize {
            return Err(CaptureError::InvalidData);
        }
        Ok(RecordHeader { header_type, misc, size })
    }

    fn record_at(&self, offset: u64) -> Result<RawRecord<'dat>, CaptureError> {
        let head = self.read_header_at(offset)?;
        let start = offset as usize;
        let end = start + head.size as usize;
        Ok(RawRecord {
            header_type: head.header_type,
            misc: head.misc,
            bytes: &self.bytes[start..end],
        })
    }

    fn read_attrs(
        bytes: &[u8],
        byte_reader: ByteReader,
        header: &FileHeader,
    ) -> Result<(Vec<EventDesc>, HashMap<u64, usize>, SampleTypeOffsets, bool), CaptureError> {
        let entry_size = header.attr_size + IDS_SECTION_SIZE;
        if entry_size == 0 || header.attrs.size % entry_size != 0 {
            return Err(CaptureError::InvalidData);
        }
        let count = header.attrs.size / entry_size;
        let len = bytes.len() as u64;

        let mut descs = Vec::with_capacity(count as usize);
        let mut id_to_desc = HashMap::new();
        let mut offsets: Option<SampleTypeOffsets> = None;
        let mut sample_id_all: Option<bool> = None;

        for i in 0..count {
            let base = header.attrs.offset + i * entry_size;
            let attr_bytes = &bytes[base as usize..(base + header.attr_size) as usize];
            if attr_bytes.len() < 48 {
                return Err(CaptureError::InvalidData);
            }

            let attr_type = AttrType(byte_reader.read_u32(&attr_bytes[0..4]));
            let config = byte_reader.read_u64(&attr_bytes[8..16]);
            let sample_type = SampleType(byte_reader.read_u64(&attr_bytes[24..32]));
            let options = AttrOptions(byte_reader.read_u64(&attr_bytes[40..48]));
            let this_sample_id_all = options.has_flag(AttrOptions::SampleIdAll);

            let this_offsets = SampleTypeOffsets::compute(sample_type);
            match offsets {
                None => offsets = Some(this_offsets),
                Some(prev) if offsets_match(prev, this_offsets) => {}
                Some(_) => return Err(CaptureError::InvalidData),
            }
            match sample_id_all {
                None => sample_id_all = Some(this_sample_id_all),
                Some(prev) if prev == this_sample_id_all => {}
                Some(_) => return Err(CaptureError::InvalidData),
            }

            let ids_section_base = base + header.attr_size;
            let ids_section = FileSection::parse(byte_reader, &bytes[ids_section_base as usize..(ids_section_base + IDS_SECTION_SIZE) as usize]);
            if ids_section.size > 0 && !ids_section.valid(len) {
                return Err(CaptureError::InvalidData);
            }
            let id_count = ids_section.size / 8;
            let mut ids = Vec::with_capacity(id_count as usize);
            for j in 0..id_count {
                let id_off = (ids_section.offset + j * 8) as usize;
                ids.push(byte_reader.read_u64(&bytes[id_off..id_off + 8]));
            }

            let attr = EventAttr {
                attr_type,
                config,
                sample_type,
                options,
            };
            let desc_index = descs.len();
            for &id in &ids {
                id_to_desc.insert(id, desc_index);
            }
            descs.push(EventDesc::new(attr, String::new(), None, ids));
        }

        Ok((
            descs,
            id_to_desc,
            offsets.unwrap_or_default(),
            sample_id_all.unwrap_or(false),
        ))
    }

    fn read_session(bytes: &[u8], byte_reader: ByteReader, header: &FileHeader) -> Result<SessionInfo, CaptureError> {
        let mut session = SessionInfo::new(byte_reader);
        let len = bytes.len() as u64;
        let mut table_pos = FILE_HEADER_SIZE as u64;

        for bit in 0..64u32 {
            if !header.has_feature(bit) {
                continue;
            }
            if table_pos + FileSection::WIRE_SIZE as u64 > len {
                return Err(CaptureError::InvalidData);
            }
            let section = FileSection::parse(byte_reader, &bytes[table_pos as usize..(table_pos + FileSection::WIRE_SIZE as u64) as usize]);
            table_pos += FileSection::WIRE_SIZE as u64;
            if section.size == 0 {
                continue;
            }
            if !section.valid(len) {
                return Err(CaptureError::InvalidData);
            }
            let data = &bytes[section.offset as usize..section.end() as usize];

            if bit == CLOCKID {
                if data.len() >= 4 {
                    session.set_clock_id(byte_reader.read_u32(&data[0..4]));
                }
            } else if bit == CLOCK_DATA {
                if data.len() >= 24 {
                    let clock_id = byte_reader.read_u32(&data[4..8]);
                    let wall_clock_ns = byte_reader.read_u64(&data[8..16]);
                    let clockid_time_ns = byte_reader.read_u64(&data[16..24]);
                    session.set_clock_data(clock_id, wall_clock_ns, clockid_time_ns);
                }
            }
        }

        Ok(session)
    }
}

fn offsets_match(a: SampleTypeOffsets, b: SampleTypeOffsets) -> bool {
    a.sample_id == b.sample_id
        && a.sample_time == b.sample_time
        && a.sample_cpu == b.sample_cpu
        && a.sample_tid == b.sample_tid
        && a.sample_stream_id == b.sample_stream_id
        && a.non_sample_tail_size == b.non_sample_tail_size
}

fn bytes_offset(header: &FileHeader) -> u64 {
    header.data.offset
}
