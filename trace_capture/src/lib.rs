#![warn(missing_docs)]

//! Reader for `perf.data` v2 capture files.
//!
//! This crate owns the outer container format only: file framing, the
//! attribute table, the subset of feature headers that feed session clock
//! data, and time- vs file-ordered record delivery. Turning one record's
//! bytes into named field values is [`trace_decode`]'s job; this crate
//! hands it a resolved [`trace_decode::EventDesc`] and the record's raw
//! payload and stops there.

mod file_abi;
mod header_index;
mod reader;

pub use file_abi::{FileHeader, FileSection, ATTR_VER0_SIZE, FILE_HEADER_SIZE, MAGIC_HOST_ENDIAN, MAGIC_SWAP_ENDIAN, PIPE_HEADER_SIZE};
pub use header_index::{CLOCKID, CLOCK_DATA, EVENT_DESC, LAST_KNOWN, TRACING_DATA};
pub use reader::{CaptureError, CaptureOrder, CaptureReader, RawRecord};
