//! End-to-end coverage of the EventHeader walker through the crate's public
//! surface: building whole event byte buffers (header + extensions +
//! metadata schema + payload) the way a real tracepoint record would carry
//! them, then driving [`SchemaWalker`] and [`write_event_fields`] against
//! them exactly as [`trace_capture`] and `trace_dump` do.

use trace_decode::{
    FieldEncoding, FieldFormat, JsonSink, SchemaWalker, WalkerError, WalkerState, MAX_NEST_DEPTH,
};

fn header_bytes(flags: u8, id: u16) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(flags);
    out.push(0); // version
    out.extend_from_slice(&id.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // tag
    out.push(0); // opcode: Info
    out.push(4); // level: Info
    out
}

fn push_extension(out: &mut Vec<u8>, kind: u16, chained: bool, data: &[u8]) {
    let kind = if chained { kind | 0x8000 } else { kind };
    out.extend_from_slice(&(data.len() as u16).to_le_bytes());
    out.extend_from_slice(&kind.to_le_bytes());
    out.extend_from_slice(data);
}

fn field_def(name: &str, encoding: u8, format: Option<u8>) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(name.as_bytes());
    v.push(0);
    match format {
        Some(f) => {
            v.push(encoding | FieldEncoding::ChainFlag);
            v.push(f);
        }
        None => v.push(encoding),
    }
    v
}

#[test]
fn activity_id_and_keyword_are_parsed_from_the_extension_chain_and_tracepoint_name() {
    let mut meta = Vec::new();
    meta.extend_from_slice(b"MyEvent;attr=1\0");
    meta.extend(field_def(
        "n",
        FieldEncoding::Value32.as_int(),
        Some(FieldFormat::UnsignedInt.as_int()),
    ));

    let mut activity = [0xAAu8; 16].to_vec();
    activity.extend_from_slice(&[0xBBu8; 16]);

    let mut event = header_bytes(0x07, 42); // DefaultWithExtension
    push_extension(&mut event, 2, true, &activity); // ActivityId, chained
    push_extension(&mut event, 1, false, &meta); // Metadata, last
    event.extend_from_slice(&7u32.to_le_bytes());

    let (mut walker, info) =
        SchemaWalker::start_event("MyProvider_L4K2a", &event).expect("well-formed event");

    assert_eq!(info.event_name, "MyEvent");
    assert_eq!(info.keyword, 0x2a);
    assert_eq!(info.activity_id, Some([0xAAu8; 16]));
    assert_eq!(info.related_activity_id, Some([0xBBu8; 16]));

    assert!(walker.move_next());
    assert_eq!(walker.state(), WalkerState::Value);
    assert_eq!(walker.item_info().unwrap().value.unwrap().to_u32(), 7);
    assert!(!walker.move_next());
    assert_eq!(walker.state(), WalkerState::AfterLastItem);
}

#[test]
fn nesting_past_the_depth_limit_fails_with_stack_overflow() {
    let mut meta = Vec::new();
    meta.extend_from_slice(b"Deep\0");
    // A chain of single-field structs nested one inside the next; one more
    // level than MAX_NEST_DEPTH allows.
    for i in 0..=MAX_NEST_DEPTH {
        meta.extend(field_def(
            &alloc_name(i),
            FieldEncoding::Struct.as_int(),
            Some(1),
        ));
    }

    let mut event = header_bytes(0x07, 0);
    push_extension(&mut event, 1, false, &meta);

    let (mut walker, _info) = SchemaWalker::start_event("test", &event).unwrap();

    let mut steps = 0;
    while walker.move_next() {
        steps += 1;
        assert!(steps <= MAX_NEST_DEPTH + 2, "walker should have failed by now");
    }
    assert_eq!(walker.state(), WalkerState::Error);
    assert_eq!(walker.last_error(), Some(WalkerError::StackOverflow));
}

fn alloc_name(i: usize) -> String {
    format!("s{i}")
}

enum FrameKind {
    Obj,
    Arr,
}

struct Frame {
    kind: FrameKind,
    emitted: bool,
}

struct StringSink {
    out: String,
    stack: Vec<Frame>,
}

impl StringSink {
    fn new() -> Self {
        Self { out: String::new(), stack: Vec::new() }
    }

    /// Called before writing a value that sits directly in an array (object
    /// properties get their comma from `prop_name` instead).
    fn before_array_element(&mut self) {
        if let Some(top) = self.stack.last_mut() {
            if matches!(top.kind, FrameKind::Arr) {
                if top.emitted {
                    self.out.push(',');
                }
                top.emitted = true;
            }
        }
    }
}

impl JsonSink for StringSink {
    fn begin_obj(&mut self) {
        self.before_array_element();
        self.out.push('{');
        self.stack.push(Frame { kind: FrameKind::Obj, emitted: false });
    }
    fn end_obj(&mut self) {
        self.stack.pop();
        self.out.push('}');
    }
    fn begin_arr(&mut self) {
        self.before_array_element();
        self.out.push('[');
        self.stack.push(Frame { kind: FrameKind::Arr, emitted: false });
    }
    fn end_arr(&mut self) {
        self.stack.pop();
        self.out.push(']');
    }
    fn prop_name(&mut self, name: &str) {
        if let Some(top) = self.stack.last_mut() {
            if top.emitted {
                self.out.push(',');
            }
            top.emitted = true;
        }
        self.out.push('"');
        self.out.push_str(name);
        self.out.push_str("\":");
    }
    fn write_string(&mut self, s: &str) {
        self.before_array_element();
        self.out.push('"');
        self.out.push_str(s);
        self.out.push('"');
    }
    fn write_number(&mut self, n: f64) {
        self.before_array_element();
        self.out.push_str(&n.to_string());
    }
    fn write_bool(&mut self, b: bool) {
        self.before_array_element();
        self.out.push_str(if b { "true" } else { "false" });
    }
    fn write_null(&mut self) {
        self.before_array_element();
        self.out.push_str("null");
    }
}

#[test]
fn write_event_fields_renders_a_struct_and_a_scalar_as_nested_json() {
    use trace_decode::ConvertOptions;

    let mut meta = Vec::new();
    meta.extend_from_slice(b"Combo\0");
    meta.extend(field_def("Pt", FieldEncoding::Struct.as_int(), Some(1)));
    meta.extend(field_def(
        "x",
        FieldEncoding::Value32.as_int(),
        Some(FieldFormat::SignedInt.as_int()),
    ));
    meta.extend(field_def(
        "ok",
        FieldEncoding::Value8.as_int(),
        Some(FieldFormat::Boolean.as_int()),
    ));

    let mut payload = Vec::new();
    payload.extend_from_slice(&5i32.to_le_bytes());
    payload.push(1);

    let mut event = header_bytes(0x07, 0);
    push_extension(&mut event, 1, false, &meta);
    event.extend_from_slice(&payload);

    let (mut walker, _info) = SchemaWalker::start_event("test", &event).unwrap();
    let mut sink = StringSink::new();
    let err = trace_decode::write_event_fields(&mut walker, ConvertOptions::Default, &mut sink);

    assert_eq!(err, None);
    assert_eq!(sink.out, r#"{"Pt":{"x":5},"ok":true}"#);
}
