//! The JSON writing driver: pairs a [`SchemaWalker`] walk with an abstract
//! sink. This module defines the *contract* only — [`JsonSink`] — plus the
//! function that drives a walk against it; the concrete sink (buffer or
//! `serde_json::Value` writer) lives outside this crate.

extern crate alloc;

use alloc::string::{String, ToString};

use crate::display::NameAndTagDisplay;
use crate::options::ConvertOptions;
use crate::value::FieldValue;
use crate::walker::{SchemaWalker, WalkerError, WalkerState};

/// Abstract JSON sink. Every method is infallible from the driver's point
/// of view — a sink backed by a growable buffer never fails; a sink with a
/// bounded budget tracks truncation internally rather than returning
/// `Result` from every call.
pub trait JsonSink {
    fn begin_obj(&mut self);
    fn end_obj(&mut self);
    fn begin_arr(&mut self);
    fn end_arr(&mut self);
    fn prop_name(&mut self, name: &str);
    fn write_string(&mut self, s: &str);
    fn write_number(&mut self, n: f64);
    fn write_bool(&mut self, b: bool);
    fn write_null(&mut self);
}

/// Writes one decoded [`FieldValue`] to `sink`, dispatching to the right
/// typed sink call based on the value's rendered JSON shape.
///
/// Reuses [`FieldValue::write_scalar_to`] for the actual text (so every
/// format/option combination is handled in exactly one place) and then
/// classifies the rendered text by its leading character to pick the sink
/// call: a leading `"` is a string, `null`/`true`/`false` match their sink
/// calls directly, anything else is a number.
pub fn write_value<S: JsonSink>(value: &FieldValue<'_>, options: ConvertOptions, sink: &mut S) {
    let mut rendered = String::new();
    value.write_scalar_to(&mut rendered, options);

    if let Some(inner) = rendered.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        sink.write_string(inner);
    } else if rendered == "null" {
        sink.write_null();
    } else if rendered == "true" {
        sink.write_bool(true);
    } else if rendered == "false" {
        sink.write_bool(false);
    } else if let Ok(n) = rendered.parse::<f64>() {
        sink.write_number(n);
    } else {
        // Rendering produced something unparseable (shouldn't happen for a
        // well-formed value); fall back to a string so the sink still gets
        // valid JSON rather than a malformed bare token.
        sink.write_string(&rendered);
    }
}

/// Drives one full event walk into `sink`, emitting a JSON object whose
/// properties are the event's top-level fields. Arrays become JSON arrays;
/// structs become nested JSON objects; `tag`s are appended to property
/// names per `options` (see [`ConvertOptions::FieldTag`]).
///
/// `walker` must be freshly returned from [`SchemaWalker::start_event`]
/// (state `BeforeFirstItem`). Returns the walker's terminal error, if any.
pub fn write_event_fields<S: JsonSink>(
    walker: &mut SchemaWalker<'_, '_>,
    options: ConvertOptions,
    sink: &mut S,
) -> Option<WalkerError> {
    sink.begin_obj();
    // Mirrors the walker's real nesting: which kind of container is open at
    // each level, so prop_name suppression follows the actual enclosing
    // frame rather than a depth number that an array and an unrelated
    // struct field can share.
    let mut containers: alloc::vec::Vec<ContainerKind> = alloc::vec::Vec::new();

    while walker.move_next() {
        let Some(item) = walker.item_info() else { continue };
        let in_array = containers.last() == Some(&ContainerKind::Array);

        match walker.state() {
            WalkerState::Value => {
                if !in_array {
                    sink.prop_name(&NameAndTagDisplay::new(item.name, item.tag, options).to_string());
                }
                if let Some(value) = &item.value {
                    write_value(value, options, sink);
                }
            }
            WalkerState::ArrayBegin => {
                sink.prop_name(&NameAndTagDisplay::new(item.name, item.tag, options).to_string());
                sink.begin_arr();
                containers.push(ContainerKind::Array);
            }
            WalkerState::ArrayElement => {
                if let Some(value) = &item.value {
                    write_value(value, options, sink);
                }
            }
            WalkerState::ArrayEnd => {
                containers.pop();
                sink.end_arr();
            }
            WalkerState::StructBegin => {
                if !in_array {
                    sink.prop_name(&NameAndTagDisplay::new(item.name, item.tag, options).to_string());
                }
                sink.begin_obj();
                containers.push(ContainerKind::Struct);
            }
            WalkerState::StructEnd => {
                containers.pop();
                sink.end_obj();
            }
            WalkerState::None
            | WalkerState::Error
            | WalkerState::BeforeFirstItem
            | WalkerState::AfterLastItem => {}
        }
    }

    sink.end_obj();
    walker.last_error()
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ContainerKind {
    Array,
    Struct,
}

#[cfg(test)]
mod tests {
    extern crate alloc;

    use super::*;
    use alloc::format;
    use alloc::string::ToString;
    use alloc::vec::Vec;

    #[derive(Default)]
    struct RecordingSink {
        events: Vec<String>,
    }

    impl JsonSink for RecordingSink {
        fn begin_obj(&mut self) {
            self.events.push("{".into());
        }
        fn end_obj(&mut self) {
            self.events.push("}".into());
        }
        fn begin_arr(&mut self) {
            self.events.push("[".into());
        }
        fn end_arr(&mut self) {
            self.events.push("]".into());
        }
        fn prop_name(&mut self, name: &str) {
            self.events.push(format!("n:{name}"));
        }
        fn write_string(&mut self, s: &str) {
            self.events.push(format!("s:{s}"));
        }
        fn write_number(&mut self, n: f64) {
            self.events.push(format!("v:{n}"));
        }
        fn write_bool(&mut self, b: bool) {
            self.events.push(format!("b:{b}"));
        }
        fn write_null(&mut self) {
            self.events.push("null".into());
        }
    }

    fn build_simple_struct_event() -> Vec<u8> {
        // flags = Pointer64|LittleEndian|Extension, version=1, id=1, tag=0, opcode=0, level=5
        let mut event = alloc::vec![0x07u8, 1, 1, 0, 0, 0, 0, 5];
        let mut meta = Vec::new();
        meta.extend_from_slice(b"E\0");
        meta.extend_from_slice(b"Pt\0");
        meta.push(0x01 | 0x80); // Struct | ChainFlag (a format byte follows)
        meta.push(2); // struct field count
        meta.extend_from_slice(b"x\0");
        meta.push(0x04 | 0x80); // Value32 | ChainFlag
        meta.push(2); // SignedInt
        meta.extend_from_slice(b"y\0");
        meta.push(0x04 | 0x80);
        meta.push(2);
        let ext_size = meta.len() as u16;
        event.extend_from_slice(&ext_size.to_le_bytes());
        event.extend_from_slice(&1u16.to_le_bytes()); // Metadata, no chain
        event.extend_from_slice(&meta);
        event.extend_from_slice(&1i32.to_le_bytes());
        event.extend_from_slice(&(-1i32).to_le_bytes());
        event
    }

    fn build_array_of_structs_event() -> Vec<u8> {
        // flags = Pointer64|LittleEndian|Extension, version=1, id=1, tag=0, opcode=0, level=5
        let mut event = alloc::vec![0x07u8, 1, 1, 0, 0, 0, 0, 5];
        let mut meta = Vec::new();
        meta.extend_from_slice(b"E\0");
        meta.extend_from_slice(b"pts\0");
        meta.push(0x01 | 0x20 | 0x80); // Struct | CArrayFlag | ChainFlag
        meta.push(2); // struct field count
        meta.extend_from_slice(&2u16.to_le_bytes()); // array element count
        meta.extend_from_slice(b"x\0");
        meta.push(0x04 | 0x80); // Value32 | ChainFlag
        meta.push(2); // SignedInt
        meta.extend_from_slice(b"y\0");
        meta.push(0x04 | 0x80);
        meta.push(2);
        let ext_size = meta.len() as u16;
        event.extend_from_slice(&ext_size.to_le_bytes());
        event.extend_from_slice(&1u16.to_le_bytes()); // Metadata, no chain
        event.extend_from_slice(&meta);
        event.extend_from_slice(&1i32.to_le_bytes());
        event.extend_from_slice(&2i32.to_le_bytes());
        event.extend_from_slice(&3i32.to_le_bytes());
        event.extend_from_slice(&4i32.to_le_bytes());
        event
    }

    #[test]
    fn array_of_structs_keeps_field_names_and_drops_element_names() {
        let bytes = build_array_of_structs_event();
        let (mut walker, _info) = SchemaWalker::start_event("test", &bytes).unwrap();
        let mut sink = RecordingSink::default();
        let err = write_event_fields(&mut walker, ConvertOptions::Default, &mut sink);
        assert_eq!(err, None);
        assert_eq!(
            sink.events,
            alloc::vec![
                "{".to_string(),
                "n:pts".to_string(),
                "[".to_string(),
                "{".to_string(),
                "n:x".to_string(),
                "v:1".to_string(),
                "n:y".to_string(),
                "v:2".to_string(),
                "}".to_string(),
                "{".to_string(),
                "n:x".to_string(),
                "v:3".to_string(),
                "n:y".to_string(),
                "v:4".to_string(),
                "}".to_string(),
                "]".to_string(),
                "}".to_string(),
            ]
        );
    }

    #[test]
    fn simple_struct_emits_nested_object() {
        let bytes = build_simple_struct_event();
        let (mut walker, _info) = SchemaWalker::start_event("test", &bytes).unwrap();
        let mut sink = RecordingSink::default();
        let err = write_event_fields(&mut walker, ConvertOptions::Default, &mut sink);
        assert_eq!(err, None);
        assert_eq!(
            sink.events,
            alloc::vec![
                "{".to_string(),
                "n:Pt".to_string(),
                "{".to_string(),
                "n:x".to_string(),
                "v:1".to_string(),
                "n:y".to_string(),
                "v:-1".to_string(),
                "}".to_string(),
                "}".to_string(),
            ]
        );
    }
}
