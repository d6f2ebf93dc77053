//! Session-wide clock information: the offset needed to translate a
//! record's raw `time_ns` into wall-clock time, learned from the file's
//! `HEADER_CLOCK_DATA`/`HEADER_CLOCKID` feature sections.

use crate::byte_reader::ByteReader;

const BILLION32: u32 = 1_000_000_000;
const BILLION64: u64 = 1_000_000_000;

/// A `{seconds, nanoseconds}` pair relative to the Unix epoch, normalized so
/// `nanoseconds` is always in `0..BILLION32`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct UnixTimeSpec {
    seconds: i64,
    nanoseconds: u32,
}

impl UnixTimeSpec {
    pub const UNIX_EPOCH: Self = Self { seconds: 0, nanoseconds: 0 };

    pub const fn new(seconds: i64, nanoseconds: u32) -> Self {
        let mut this = Self { seconds, nanoseconds };
        while this.nanoseconds >= BILLION32 {
            this.seconds += 1;
            this.nanoseconds -= BILLION32;
        }
        this
    }

    pub const fn seconds(&self) -> i64 {
        self.seconds
    }

    pub const fn nanoseconds(&self) -> u32 {
        self.nanoseconds
    }
}

/// Clock-offset and byte-order context shared by every record in one
/// capture. Built incrementally as the reader walks the file's feature
/// sections; immutable once the file is fully opened.
#[derive(Clone, Copy, Debug)]
pub struct SessionInfo {
    clock_offset_seconds: i64,
    clock_offset_nanoseconds: u32,
    clock_id: u32,
    clock_offset_known: bool,
    byte_reader: ByteReader,
}

impl SessionInfo {
    pub const fn new(byte_reader: ByteReader) -> Self {
        Self {
            clock_offset_seconds: 0,
            clock_offset_nanoseconds: 0,
            clock_id: u32::MAX,
            clock_offset_known: false,
            byte_reader,
        }
    }

    pub const fn source_big_endian(&self) -> bool {
        self.byte_reader.source_big_endian()
    }

    pub const fn byte_reader(&self) -> ByteReader {
        self.byte_reader
    }

    pub const fn clock_offset_known(&self) -> bool {
        self.clock_offset_known
    }

    pub const fn clock_id(&self) -> u32 {
        self.clock_id
    }

    pub fn set_clock_id(&mut self, clock_id: u32) {
        self.clock_id = clock_id;
    }

    /// Derives the offset from a `HEADER_CLOCK_DATA` section's
    /// `(wall_clock_ns, clockid_time_ns)` pair. `clock_id == u32::MAX`
    /// means "offset unspecified".
    pub fn set_clock_data(&mut self, clock_id: u32, wall_clock_ns: u64, clockid_time_ns: u64) {
        if clock_id == u32::MAX {
            self.clock_offset_seconds = 0;
            self.clock_offset_nanoseconds = 0;
            self.clock_id = clock_id;
            self.clock_offset_known = false;
            return;
        }

        if clockid_time_ns <= wall_clock_ns {
            let offset_ns = wall_clock_ns - clockid_time_ns;
            self.clock_offset_seconds = (offset_ns / BILLION64) as i64;
            self.clock_offset_nanoseconds = (offset_ns % BILLION64) as u32;
        } else {
            let neg_offset_ns = clockid_time_ns - wall_clock_ns;
            self.clock_offset_seconds = -((neg_offset_ns / BILLION64) as i64) - 1;
            self.clock_offset_nanoseconds = BILLION32 - (neg_offset_ns % BILLION64) as u32;
            if self.clock_offset_nanoseconds == BILLION32 {
                self.clock_offset_seconds += 1;
                self.clock_offset_nanoseconds = 0;
            }
        }
        self.clock_id = clock_id;
        self.clock_offset_known = true;
    }

    /// Converts a record's raw `time_ns` to wall-clock time. Assumes 1970
    /// as the origin when the offset is unknown.
    pub const fn time_to_unix(&self, time_ns: u64) -> UnixTimeSpec {
        let mut sec = (time_ns / BILLION64) as i64;
        let mut nsec = (time_ns % BILLION64) as u32;
        sec += self.clock_offset_seconds;
        nsec += self.clock_offset_nanoseconds;
        if nsec >= BILLION32 {
            sec += 1;
            nsec -= BILLION32;
        }
        UnixTimeSpec::new(sec, nsec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_clock_offset_assumes_1970() {
        let session = SessionInfo::new(ByteReader::host_endian());
        assert!(!session.clock_offset_known());
        let t = session.time_to_unix(5 * BILLION64);
        assert_eq!(t.seconds(), 5);
    }

    #[test]
    fn positive_offset_shifts_time_forward() {
        let mut session = SessionInfo::new(ByteReader::host_endian());
        session.set_clock_data(1, 100 * BILLION64, 40 * BILLION64);
        let t = session.time_to_unix(10 * BILLION64);
        assert_eq!(t.seconds(), 70);
        assert!(session.clock_offset_known());
    }

    #[test]
    fn negative_offset_shifts_time_backward() {
        let mut session = SessionInfo::new(ByteReader::host_endian());
        session.set_clock_data(1, 40 * BILLION64, 100 * BILLION64);
        let t = session.time_to_unix(60 * BILLION64);
        assert_eq!(t.seconds(), 0);
    }
}
