#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

//! Decoder for tracefs `format:` metadata and EventHeader-encoded
//! tracepoint payloads.
//!
//! This crate has no notion of a `perf.data` file or a live trace session
//! — it only knows how to turn one tracepoint's format description plus
//! one record's raw bytes into typed, named field values. [`walker`]
//! drives the EventHeader convention specifically (a self-describing
//! schema carried in the event itself); [`tracefs_format`] and
//! [`tracefs_field`] drive the kernel's plain tracefs convention (a
//! schema resolved ahead of time from `/sys/kernel/tracing/events/.../format`).
//! Both converge on the same [`value::FieldValue`] so [`json`]'s writer
//! doesn't need to know which convention produced a given field.

extern crate alloc;

mod attr;
mod byte_reader;
mod charconv;
mod display;
mod encoding;
pub mod errno;
mod event_desc;
mod json;
mod options;
mod sample;
mod session;
mod tracefs_field;
mod tracefs_format;
mod value;
mod walker;

pub use attr::{AttrOptions, AttrType, ReadFormat, SampleType, SampleTypeOffsets};
pub use byte_reader::ByteReader;
pub use charconv::{push_latin1, push_utf16, push_utf32, push_utf8_lossy_or_latin1, TextEncoding};
pub use display::NameAndTagDisplay;
pub use encoding::{FieldEncoding, FieldFormat};
pub use event_desc::{EventAttr, EventDesc};
pub use json::{write_event_fields, write_value, JsonSink};
pub use options::{ConvertOptions, MetaOptions};
pub use sample::{NonSampleEventInfo, SampleEventInfo, SampleInfoError};
pub use session::{SessionInfo, UnixTimeSpec};
pub use tracefs_field::{FieldDescriptor, FieldLocation};
pub use tracefs_format::{DecodingStyle, TraceFormat};
pub use value::{ArrayKind, FieldValue, ValueMetadata};
pub use walker::{
    SchemaWalker, WalkedEventInfo, WalkedItemInfo, WalkerError, WalkerState, MAX_NEST_DEPTH,
};
