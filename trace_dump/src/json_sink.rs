//! A [`trace_decode::JsonSink`] that writes directly to an [`io::Write`],
//! tracking comma placement itself rather than building a `serde_json::Value`
//! tree first — the decoder only ever walks a payload once, so there's
//! nothing to gain from buffering it as a DOM before emitting it.

use std::io;

use trace_decode::JsonSink;

/// Streams JSON tokens to `W`, taking care of commas between object members
/// and array elements. Errors from the underlying writer are recorded and
/// surfaced once, via [`WriteSink::finish`], rather than threading a
/// `Result` through every [`JsonSink`] method (the trait's methods are
/// infallible by contract).
pub struct WriteSink<'w, W: io::Write + ?Sized> {
    out: &'w mut W,
    first_stack: Vec<bool>,
    after_name: bool,
    error: Option<io::Error>,
}

impl<'w, W: io::Write + ?Sized> WriteSink<'w, W> {
    pub fn new(out: &'w mut W) -> Self {
        Self {
            out,
            first_stack: Vec::new(),
            after_name: false,
            error: None,
        }
    }

    pub fn finish(self) -> io::Result<()> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn record(&mut self, result: io::Result<()>) {
        if self.error.is_none() {
            if let Err(e) = result {
                self.error = Some(e);
            }
        }
    }

    /// Writes a comma if this item is not the first in its container, and
    /// advances the container's "first" flag. A no-op for the value half of
    /// a `prop_name`/value pair (the name already paid the comma).
    fn comma_if_needed(&mut self) {
        if self.after_name {
            self.after_name = false;
            return;
        }
        if let Some(first) = self.first_stack.last_mut() {
            if *first {
                *first = false;
            } else {
                let result = write!(self.out, ",");
                self.record(result);
            }
        }
    }
}

/// Escapes `s` for embedding in a JSON string literal (control chars,
/// backslash, double quote).
pub fn escape_json(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

impl<'w, W: io::Write + ?Sized> JsonSink for WriteSink<'w, W> {
    fn begin_obj(&mut self) {
        self.comma_if_needed();
        let result = write!(self.out, "{{");
        self.record(result);
        self.first_stack.push(true);
    }

    fn end_obj(&mut self) {
        self.first_stack.pop();
        let result = write!(self.out, "}}");
        self.record(result);
    }

    fn begin_arr(&mut self) {
        self.comma_if_needed();
        let result = write!(self.out, "[");
        self.record(result);
        self.first_stack.push(true);
    }

    fn end_arr(&mut self) {
        self.first_stack.pop();
        let result = write!(self.out, "]");
        self.record(result);
    }

    fn prop_name(&mut self, name: &str) {
        self.comma_if_needed();
        let result = write!(self.out, "\"{}\":", escape_json(name));
        self.record(result);
        self.after_name = true;
    }

    fn write_string(&mut self, s: &str) {
        self.comma_if_needed();
        // `s` is already JSON-escaped text (the content between the quotes
        // `FieldValue::write_scalar_to` rendered); just add the quotes back.
        let result = write!(self.out, "\"{}\"", s);
        self.record(result);
    }

    fn write_number(&mut self, n: f64) {
        self.comma_if_needed();
        let result = write!(self.out, "{}", n);
        self.record(result);
    }

    fn write_bool(&mut self, b: bool) {
        self.comma_if_needed();
        let result = write!(self.out, "{}", b);
        self.record(result);
    }

    fn write_null(&mut self) {
        self.comma_if_needed();
        let result = write!(self.out, "null");
        self.record(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commas_separate_object_members() {
        let mut buf = Vec::new();
        {
            let mut sink = WriteSink::new(&mut buf);
            sink.begin_obj();
            sink.prop_name("a");
            sink.write_number(1.0);
            sink.prop_name("b");
            sink.write_number(2.0);
            sink.end_obj();
            sink.finish().unwrap();
        }
        assert_eq!(String::from_utf8(buf).unwrap(), r#"{"a":1,"b":2}"#);
    }

    #[test]
    fn commas_separate_array_elements() {
        let mut buf = Vec::new();
        {
            let mut sink = WriteSink::new(&mut buf);
            sink.begin_arr();
            sink.write_number(1.0);
            sink.write_number(2.0);
            sink.end_arr();
            sink.finish().unwrap();
        }
        assert_eq!(String::from_utf8(buf).unwrap(), "[1,2]");
    }

    #[test]
    fn escapes_control_characters() {
        assert_eq!(escape_json("a\"b\nc"), "a\\\"b\\nc");
    }
}
