//! Parses the whole text of one tracefs `.../events/<sys>/<name>/format`
//! file into a [`TraceFormat`]: the event's name/id plus its ordered field
//! list, split into the "common" fields every tracepoint carries and the
//! event-specific fields that follow them.

extern crate alloc;

use alloc::string::String;
use alloc::string::ToString;
use alloc::vec::Vec;

use crate::tracefs_field::FieldDescriptor;

/// Which convention a tracepoint's payload follows: the kernel's generic
/// `print fmt:`-driven layout, or the layered EventHeader schema.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DecodingStyle {
    /// Decode each field per its tracefs descriptor.
    TraceEventFormat,
    /// The first non-common field is `eventheader_flags`; hand the payload
    /// (past the common fields) to the EventHeader walker instead.
    EventHeader,
}

/// One parsed tracefs format file.
#[derive(Clone, Debug)]
pub struct TraceFormat {
    system_name: String,
    name: String,
    id: u32,
    common_field_count: usize,
    common_fields_size: u16,
    fields: Vec<FieldDescriptor>,
    decoding_style: DecodingStyle,
    print_fmt: String,
}

impl TraceFormat {
    /// The tracing subsystem this event belongs to, e.g. `"sched"`.
    pub fn system_name(&self) -> &str {
        &self.system_name
    }

    /// The event's name within its subsystem, e.g. `"sched_switch"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The tracepoint's numeric id, as assigned by the kernel.
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// All fields, common fields first.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Number of leading fields shared by every tracepoint (pid, flags, ...).
    pub const fn common_field_count(&self) -> usize {
        self.common_field_count
    }

    /// Total byte size of the common fields, i.e. where event-specific
    /// fields begin in the payload.
    pub const fn common_fields_size(&self) -> u16 {
        self.common_fields_size
    }

    /// Which convention this tracepoint's payload follows.
    pub const fn decoding_style(&self) -> DecodingStyle {
        self.decoding_style
    }

    /// The raw, unparsed `print fmt:` line.
    pub fn print_fmt(&self) -> &str {
        &self.print_fmt
    }

    /// Event-specific fields (after the common prefix).
    pub fn event_fields(&self) -> &[FieldDescriptor] {
        &self.fields[self.common_field_count..]
    }

    /// Parses the full text of a tracefs `format` file.
    ///
    /// Returns `None` unless a non-empty `name:` and a valid `ID:` were both
    /// found — a file missing either isn't resolvable to an event. Unknown
    /// field lines are *not* dropped (doing so would misalign offsets for
    /// remaining fields); callers should tolerate fields with an
    /// unrecognized encoding rather than erroring out the whole parse.
    pub fn parse(long_is_64_bits: bool, system_name: &str, text: &str) -> Option<Self> {
        let mut name = None;
        let mut id = None;
        let mut print_fmt = String::new();
        let mut fields = Vec::new();
        let mut common_field_count = 0;
        let mut seen_blank = false;
        let mut in_format_block = false;

        for line in text.lines() {
            let trimmed = line.trim();
            if let Some(rest) = trimmed.strip_prefix("name:") {
                name = Some(rest.trim().to_string());
                continue;
            }
            if let Some(rest) = trimmed.strip_prefix("ID:") {
                id = rest.trim().parse::<u32>().ok();
                continue;
            }
            if let Some(rest) = trimmed.strip_prefix("print fmt:") {
                print_fmt = rest.trim().to_string();
                continue;
            }
            if trimmed == "format:" {
                in_format_block = true;
                continue;
            }
            if !in_format_block {
                continue;
            }
            if trimmed.is_empty() {
                if !seen_blank {
                    seen_blank = true;
                    common_field_count = fields.len();
                } else {
                    in_format_block = false;
                }
                continue;
            }
            if let Some(field) = FieldDescriptor::parse(long_is_64_bits, trimmed) {
                fields.push(field);
            }
        }

        let name = name.filter(|n| !n.is_empty())?;
        let id = id?;

        if !seen_blank {
            common_field_count = fields.len();
        }

        let common_fields_size = fields[..common_field_count]
            .last()
            .map(|f| f.offset() + f.size())
            .unwrap_or(0);

        let decoding_style = if fields
            .get(common_field_count)
            .is_some_and(|f| f.name() == "eventheader_flags")
        {
            DecodingStyle::EventHeader
        } else {
            DecodingStyle::TraceEventFormat
        };

        Some(Self {
            system_name: system_name.to_string(),
            name,
            id,
            common_field_count,
            common_fields_size,
            fields,
            decoding_style,
            print_fmt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_FORMAT: &str = "name: sched_switch\n\
ID: 314\n\
format:\n\
\tfield:unsigned short common_type;\toffset:0;\tsize:2;\tsigned:0;\n\
\tfield:int common_pid;\toffset:4;\tsize:4;\tsigned:1;\n\
\n\
\tfield:char prev_comm[16];\toffset:8;\tsize:16;\tsigned:0;\n\
\tfield:pid_t prev_pid;\toffset:24;\tsize:4;\tsigned:1;\n\
\n\
print fmt: \"prev_comm=%s prev_pid=%d\", REC->prev_comm, REC->prev_pid\n";

    #[test]
    fn parses_common_and_event_fields() {
        let fmt = TraceFormat::parse(true, "sched", SAMPLE_FORMAT).unwrap();
        assert_eq!(fmt.name(), "sched_switch");
        assert_eq!(fmt.id(), 314);
        assert_eq!(fmt.common_field_count(), 2);
        assert_eq!(fmt.common_fields_size(), 8);
        assert_eq!(fmt.fields().len(), 4);
        assert_eq!(fmt.decoding_style(), DecodingStyle::TraceEventFormat);
    }

    #[test]
    fn detects_eventheader_decoding_style() {
        let text = "name: user_event\nID: 900\nformat:\n\
\tfield:unsigned short common_type;\toffset:0;\tsize:2;\tsigned:0;\n\
\n\
\tfield:u8 eventheader_flags;\toffset:2;\tsize:1;\tsigned:0;\n\
\n\
print fmt: \"\"\n";
        let fmt = TraceFormat::parse(true, "user_events", text).unwrap();
        assert_eq!(fmt.decoding_style(), DecodingStyle::EventHeader);
    }

    #[test]
    fn missing_id_yields_none() {
        assert!(TraceFormat::parse(true, "sched", "name: x\nformat:\n").is_none());
    }

    #[test]
    fn parse_is_idempotent() {
        let a = TraceFormat::parse(true, "sched", SAMPLE_FORMAT).unwrap();
        let b = TraceFormat::parse(true, "sched", SAMPLE_FORMAT).unwrap();
        assert_eq!(a.name(), b.name());
        assert_eq!(a.fields().len(), b.fields().len());
        assert_eq!(a.common_fields_size(), b.common_fields_size());
    }
}
