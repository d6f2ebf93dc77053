//! Named bits of a `perf.data` file's feature bitmap
//! ([`FileHeader::flags`](crate::file_abi::FileHeader::flags)).
//!
//! The kernel defines 33 of these; this reader only acts on the two that
//! feed [`trace_decode::SessionInfo`] and records the rest only well enough
//! to skip their section on the way past. Event descriptions and embedded
//! tracefs format text are expected to reach a caller by other means (a
//! sidecar `format` file, or a value supplied through
//! [`trace_decode::EventDesc::set_format`]) rather than by this reader
//! parsing them out of the capture file itself.

/// `HEADER_TRACING_DATA`: embedded ftrace format-text blob. Recognized so it
/// can be skipped; its contents are not parsed.
pub const TRACING_DATA: u32 = 1;
/// `HEADER_EVENT_DESC`: redundant event name/id table. Recognized so it can
/// be skipped; its contents are not parsed.
pub const EVENT_DESC: u32 = 12;
/// `HEADER_CLOCKID`: the `clockid` passed to `perf record --clockid`.
pub const CLOCKID: u32 = 23;
/// `HEADER_CLOCK_DATA`: the `(wall_clock_ns, clockid_time_ns)` pair used to
/// translate sample timestamps to wall-clock time.
pub const CLOCK_DATA: u32 = 29;
/// One past the highest feature bit this reader has an opinion about.
pub const LAST_KNOWN: u32 = 32;
