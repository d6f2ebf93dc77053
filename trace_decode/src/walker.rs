//! The EventHeader walker: a forward-only, single-owner state machine that
//! pairs one event's metadata schema with its payload bytes and yields a
//! depth-first stream of scalars, array elements, and struct boundaries.
//!
//! A [`SchemaWalker`] borrows two independent slices for the lifetime of one
//! event: the `Metadata` extension's schema bytes, and the event's user
//! payload. Keeping them as two borrowed slices (rather than one combined
//! buffer indexed by raw offsets) means every cursor the walker holds is a
//! plain `usize` into a slice it owns the bounds of — there is no pointer
//! arithmetic and no unsafe code anywhere in this module.

extern crate alloc;

use alloc::vec::Vec;
use core::ops::Range;

use trace_schema::EventHeader;
use trace_schema::EventHeaderExtension;
use trace_schema::ExtensionKind;
use trace_schema::HeaderFlags;

use crate::byte_reader::ByteReader;
use crate::encoding::{FieldEncoding, FieldFormat};
use crate::value::{ArrayKind, FieldValue, ValueMetadata};

/// Upper bound on nested struct/array depth. Chosen to match the wire
/// format's struct field-count byte (7 bits) with headroom for legal but
/// unusual nesting; exceeding it is a producer bug, not a resource a
/// well-formed event should ever need.
pub const MAX_NEST_DEPTH: usize = 8;

/// Where a [`SchemaWalker`] currently sits in an event's depth-first item
/// order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WalkerState {
    /// No event has been started, or the previous one finished cleanly.
    None,
    /// A previous operation failed; see [`SchemaWalker::last_error`].
    Error,
    /// `start_event` succeeded; `move_next` has not yet been called.
    BeforeFirstItem,
    /// Positioned on a scalar or string value.
    Value,
    /// Positioned on the start of an array; element count is known.
    ArrayBegin,
    /// Positioned on one element of a scalar/string array.
    ArrayElement,
    /// Positioned after the last element of an array.
    ArrayEnd,
    /// Positioned on the start of a struct (a struct array's element or a
    /// plain struct field).
    StructBegin,
    /// Positioned after the last field of a struct.
    StructEnd,
    /// The event has no more items.
    AfterLastItem,
}

/// Why a walk failed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WalkerError {
    /// The schema or payload bytes don't parse (truncated, inconsistent, a
    /// struct with zero fields, an array whose declared size overflows).
    InvalidData,
    /// A schema shape this walker does not implement (e.g. `CArray` and
    /// `VArray` both set on one field, or no `Metadata` extension present).
    NotSupported,
    /// Struct/array nesting exceeded [`MAX_NEST_DEPTH`].
    StackOverflow,
}

impl core::fmt::Display for WalkerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            WalkerError::InvalidData => "invalid data",
            WalkerError::NotSupported => "not supported",
            WalkerError::StackOverflow => "nesting too deep",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug)]
struct FieldType {
    encoding: FieldEncoding,
    format: FieldFormat,
    tag: u16,
}

enum Frame {
    /// Iterating the elements of an array.
    Array {
        index: u32,
        count: u32,
        element: FieldType,
        /// Nonzero for fixed-size elements; 0 for variable-length or struct elements.
        element_size: u8,
        /// Schema position where a struct element's field list begins (for replay).
        fields_start: usize,
    },
    /// Iterating the fields of one struct instance.
    Struct { remaining_fields: u8 },
}

/// Event-level identity decoded from an [`EventHeader`] and its extensions.
#[derive(Clone, Debug)]
pub struct WalkedEventInfo<'schema> {
    /// The tracepoint name the event was read under, e.g. `"myprovider_L4K1"`.
    pub tracepoint_name: &'schema str,
    /// The event name carried in the `Metadata` extension, before any `;attr=val` suffix.
    pub event_name: &'schema str,
    /// The fixed EventHeader prefix.
    pub header: EventHeader,
    /// Provider keyword, parsed from the tracepoint name's `K<hex>` suffix.
    pub keyword: u64,
    /// 16-byte activity id, if an `ActivityId` extension was present.
    pub activity_id: Option<[u8; 16]>,
    /// 16-byte related activity id, present only alongside a 32-byte `ActivityId` extension.
    pub related_activity_id: Option<[u8; 16]>,
}

/// One item yielded while walking an event: a value, or the boundary of an
/// array/struct.
#[derive(Clone, Debug)]
pub struct WalkedItemInfo<'schema, 'dat> {
    /// The field or struct name this item belongs to.
    pub name: &'schema str,
    /// The provider-defined per-field tag, or 0.
    pub tag: u16,
    /// The decoded value, present for [`WalkerState::Value`] and [`WalkerState::ArrayElement`].
    pub value: Option<FieldValue<'dat>>,
    /// Current nesting depth (0 = top level).
    pub depth: usize,
}

/// Forward-only cursor over one event's schema + payload.
pub struct SchemaWalker<'schema, 'dat> {
    schema: &'schema [u8],
    payload: &'dat [u8],
    byte_reader: ByteReader,
    schema_pos: usize,
    payload_pos: usize,
    state: WalkerState,
    last_error: Option<WalkerError>,
    stack: Vec<Frame>,

    cur_name: Range<usize>,
    cur_tag: u16,
    cur_value: Option<Range<usize>>,
    cur_field_type: FieldType,
    cur_array_count: u32,
    cur_element_size: u8,
}

impl<'schema, 'dat> SchemaWalker<'schema, 'dat> {
    /// Parses the `EventHeader` prefix and extension chain out of
    /// `event_bytes`, locating the `Metadata` extension (required) and an
    /// optional `ActivityId` extension, and returns a walker positioned at
    /// [`WalkerState::BeforeFirstItem`] over the remaining user payload.
    ///
    /// `tracepoint_name` is the owning tracepoint's name (used only to
    /// report back in [`WalkedEventInfo`]).
    pub fn start_event(
        tracepoint_name: &'schema str,
        event_bytes: &'dat [u8],
    ) -> Result<(Self, WalkedEventInfo<'schema>), WalkerError>
    where
        'dat: 'schema,
    {
        if event_bytes.len() < EventHeader::WIRE_SIZE {
            return Err(WalkerError::InvalidData);
        }
        let flags = HeaderFlags::from_int(event_bytes[0]);
        if flags.as_int() & !HeaderFlags::KNOWN.as_int() != 0 {
            return Err(WalkerError::NotSupported);
        }
        let byte_reader = ByteReader::new(!flags.has_flag(HeaderFlags::LittleEndian));
        let header = EventHeader::from_parts(
            flags,
            event_bytes[1],
            byte_reader.read_u16(&event_bytes[2..4]),
            byte_reader.read_u16(&event_bytes[4..6]),
            trace_schema::Opcode::from_int(event_bytes[6]),
            trace_schema::Level::from_int(event_bytes[7]),
        );

        let mut pos = EventHeader::WIRE_SIZE;
        let mut meta_range: Option<Range<usize>> = None;
        let mut activity_id = None;
        let mut related_activity_id = None;

        if flags.has_flag(HeaderFlags::Extension) {
            loop {
                if pos + EventHeaderExtension::WIRE_SIZE > event_bytes.len() {
                    return Err(WalkerError::InvalidData);
                }
                let size = byte_reader.read_u16(&event_bytes[pos..pos + 2]) as usize;
                let kind_raw = byte_reader.read_u16(&event_bytes[pos + 2..pos + 4]);
                let kind = ExtensionKind::from_int(kind_raw);
                pos += EventHeaderExtension::WIRE_SIZE;
                let data_start = pos;
                let data_end = data_start.checked_add(size).ok_or(WalkerError::InvalidData)?;
                if data_end > event_bytes.len() {
                    return Err(WalkerError::InvalidData);
                }
                match kind.without_chain_flag() {
                    ExtensionKind::Metadata => {
                        if meta_range.is_some() {
                            return Err(WalkerError::InvalidData);
                        }
                        meta_range = Some(data_start..data_end);
                    }
                    ExtensionKind::ActivityId => {
                        if activity_id.is_some() || (size != 16 && size != 32) {
                            return Err(WalkerError::InvalidData);
                        }
                        let mut a = [0u8; 16];
                        a.copy_from_slice(&event_bytes[data_start..data_start + 16]);
                        activity_id = Some(a);
                        if size == 32 {
                            let mut r = [0u8; 16];
                            r.copy_from_slice(&event_bytes[data_start + 16..data_start + 32]);
                            related_activity_id = Some(r);
                        }
                    }
                    _ => {}
                }
                pos = data_end;
                if !kind.has_chain_flag() {
                    break;
                }
            }
        }

        let meta_range = meta_range.ok_or(WalkerError::NotSupported)?;
        let meta_bytes = &event_bytes[meta_range.clone()];
        let name_end = meta_bytes
            .iter()
            .position(|&b| b == 0)
            .ok_or(WalkerError::InvalidData)?;
        let event_name_full = core::str::from_utf8(&meta_bytes[..name_end])
            .map_err(|_| WalkerError::InvalidData)?;
        let event_name = event_name_full.split(';').next().unwrap_or(event_name_full);

        let schema = &event_bytes[meta_range.start + name_end + 1..meta_range.end];
        let payload = &event_bytes[pos..];

        let keyword = parse_keyword_suffix(tracepoint_name);

        let walker = Self {
            schema,
            payload,
            byte_reader,
            schema_pos: 0,
            payload_pos: 0,
            state: WalkerState::BeforeFirstItem,
            last_error: None,
            stack: Vec::new(),
            cur_name: 0..0,
            cur_tag: 0,
            cur_value: None,
            cur_field_type: FieldType {
                encoding: FieldEncoding::Invalid,
                format: FieldFormat::Default,
                tag: 0,
            },
            cur_array_count: 0,
            cur_element_size: 0,
        };

        let info = WalkedEventInfo {
            tracepoint_name,
            event_name,
            header,
            keyword,
            activity_id,
            related_activity_id,
        };

        Ok((walker, info))
    }

    /// The walker's current state.
    pub const fn state(&self) -> WalkerState {
        self.state
    }

    /// The reason the walker is in [`WalkerState::Error`], if any.
    pub const fn last_error(&self) -> Option<WalkerError> {
        self.last_error
    }

    /// Current nesting depth (number of open struct/array frames).
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Information about the item at the current position. `None` before
    /// the first `move_next` call, after the last, or in `Error` state.
    pub fn item_info(&self) -> Option<WalkedItemInfo<'schema, 'dat>> {
        if !matches!(
            self.state,
            WalkerState::Value
                | WalkerState::ArrayBegin
                | WalkerState::ArrayElement
                | WalkerState::ArrayEnd
                | WalkerState::StructBegin
                | WalkerState::StructEnd
        ) {
            return None;
        }
        let name = core::str::from_utf8(&self.schema[self.cur_name.clone()]).ok()?;
        let value = self
            .cur_value
            .clone()
            .map(|r| FieldValue::new(&self.payload[r], self.value_metadata()));
        Some(WalkedItemInfo {
            name,
            tag: self.cur_tag,
            value,
            depth: self.stack.len(),
        })
    }

    fn value_metadata(&self) -> ValueMetadata {
        let is_array_state = matches!(
            self.state,
            WalkerState::ArrayBegin | WalkerState::ArrayElement | WalkerState::ArrayEnd
        );
        if is_array_state {
            let kind = if self.cur_field_type.encoding.is_carray() {
                ArrayKind::Constant
            } else {
                ArrayKind::Variable
            };
            let meta = ValueMetadata::array(
                self.byte_reader,
                self.cur_field_type.encoding,
                self.cur_field_type.format,
                self.cur_tag,
                self.cur_element_size,
                kind,
                self.cur_array_count,
            );
            if matches!(self.state, WalkerState::ArrayElement) {
                meta.as_element()
            } else {
                meta
            }
        } else {
            ValueMetadata::scalar(
                self.byte_reader,
                self.cur_field_type.encoding,
                self.cur_field_type.format,
                self.cur_tag,
                self.cur_field_type.encoding.fixed_element_size(),
            )
        }
    }

    fn fail(&mut self, err: WalkerError) -> bool {
        self.state = WalkerState::Error;
        self.last_error = Some(err);
        false
    }

    fn read_field_def(&mut self) -> Result<(Range<usize>, FieldType, Option<u16>), WalkerError> {
        let start = self.schema_pos;
        let name_len = self.schema[start..]
            .iter()
            .position(|&b| b == 0)
            .ok_or(WalkerError::InvalidData)?;
        let name_range = start..start + name_len;
        let mut p = start + name_len + 1;

        let byte = |schema: &[u8], p: usize| schema.get(p).copied().ok_or(WalkerError::InvalidData);
        let encoding_raw = byte(self.schema, p)?;
        p += 1;
        let encoding_full = FieldEncoding::from_int(encoding_raw);

        let mut format = FieldFormat::Default;
        if encoding_full.has_chain_flag() {
            format = FieldFormat::from_int(byte(self.schema, p)?);
            p += 1;
        }

        let mut tag = 0u16;
        if format.has_chain_flag() {
            if p + 2 > self.schema.len() {
                return Err(WalkerError::InvalidData);
            }
            tag = self.byte_reader.read_u16(&self.schema[p..p + 2]);
            p += 2;
        }

        let encoding_no_chain =
            FieldEncoding::from_int(encoding_full.as_int() & !FieldEncoding::ChainFlag);
        let format_no_chain = FieldFormat::from_int(format.as_int() & !FieldFormat::ChainFlag);

        if encoding_no_chain.is_carray() && encoding_no_chain.is_varray() {
            return Err(WalkerError::NotSupported);
        }

        let mut array_len = None;
        if encoding_no_chain.is_carray() {
            if p + 2 > self.schema.len() {
                return Err(WalkerError::InvalidData);
            }
            array_len = Some(self.byte_reader.read_u16(&self.schema[p..p + 2]));
            p += 2;
        }

        self.schema_pos = p;
        Ok((
            name_range,
            FieldType {
                encoding: encoding_no_chain,
                format: format_no_chain,
                tag,
            },
            array_len,
        ))
    }

    /// Advances to the next item in depth-first order. Returns `false` when
    /// the event is exhausted ([`WalkerState::AfterLastItem`]) or a failure
    /// occurred ([`WalkerState::Error`]; see [`Self::last_error`]).
    pub fn move_next(&mut self) -> bool {
        match self.state {
            WalkerState::Error | WalkerState::AfterLastItem | WalkerState::None => false,
            WalkerState::BeforeFirstItem => self.start_next_field(),
            WalkerState::Value => {
                if let Some(r) = self.cur_value.clone() {
                    self.payload_pos = r.end;
                }
                self.finish_item()
            }
            WalkerState::ArrayElement => self.advance_array_element(),
            WalkerState::ArrayBegin => {
                if self.cur_array_count == 0 {
                    self.end_array()
                } else {
                    self.begin_array_element(0)
                }
            }
            WalkerState::ArrayEnd => {
                self.stack.pop();
                self.finish_item()
            }
            WalkerState::StructBegin => {
                if self.stack.len() >= MAX_NEST_DEPTH {
                    return self.fail(WalkerError::StackOverflow);
                }
                let remaining_fields = self.cur_field_type.format.as_struct_field_count();
                self.stack.push(Frame::Struct { remaining_fields });
                self.advance_struct_field()
            }
            WalkerState::StructEnd => self.finish_struct_end(),
        }
    }

    /// Reads the next field definition and enters its state. Returns `true`
    /// if `Value`/`ArrayBegin`/`StructBegin` was entered, `false` if the
    /// schema is exhausted (`AfterLastItem`) or parsing failed (`Error`).
    fn start_next_field(&mut self) -> bool {
        if self.schema_pos >= self.schema.len() {
            self.state = WalkerState::AfterLastItem;
            return false;
        }
        let (name, field_type, array_len) = match self.read_field_def() {
            Ok(v) => v,
            Err(e) => return self.fail(e),
        };
        self.cur_name = name;
        self.cur_tag = field_type.tag;
        self.cur_field_type = field_type;

        if field_type.encoding.is_array() {
            self.begin_array(field_type, array_len)
        } else if field_type.encoding.base() == FieldEncoding::Struct {
            if field_type.format.as_struct_field_count() == 0 {
                return self.fail(WalkerError::InvalidData);
            }
            self.state = WalkerState::StructBegin;
            true
        } else {
            self.begin_scalar_value(field_type)
        }
    }

    fn begin_array(&mut self, field_type: FieldType, array_len: Option<u16>) -> bool {
        if self.stack.len() >= MAX_NEST_DEPTH {
            return self.fail(WalkerError::StackOverflow);
        }

        let count = if field_type.encoding.is_carray() {
            match array_len {
                Some(n) => n as u32,
                None => return self.fail(WalkerError::InvalidData),
            }
        } else {
            if self.payload_pos + 2 > self.payload.len() {
                return self.fail(WalkerError::InvalidData);
            }
            let n = self
                .byte_reader
                .read_u16(&self.payload[self.payload_pos..self.payload_pos + 2]);
            self.payload_pos += 2;
            n as u32
        };

        let element_size = field_type.encoding.fixed_element_size();
        let fields_start = self.schema_pos;

        if element_size != 0 {
            let total_bytes = (count as usize).checked_mul(element_size as usize);
            match total_bytes {
                Some(n) if self.payload_pos + n <= self.payload.len() => {}
                _ => return self.fail(WalkerError::InvalidData),
            }
        }

        self.stack.push(Frame::Array {
            index: 0,
            count,
            element: field_type,
            element_size,
            fields_start,
        });
        self.cur_array_count = count;
        self.cur_element_size = element_size;
        self.cur_value = None;
        self.state = WalkerState::ArrayBegin;
        true
    }

    fn begin_array_element(&mut self, index: u32) -> bool {
        let Some(Frame::Array {
            element,
            element_size,
            fields_start,
            ..
        }) = self.stack.last()
        else {
            return self.fail(WalkerError::InvalidData);
        };
        let element = *element;
        let element_size = *element_size;
        let fields_start = *fields_start;

        if element.encoding.base() == FieldEncoding::Struct {
            self.schema_pos = fields_start;
            self.cur_field_type = element;
            self.state = WalkerState::StructBegin;
            true
        } else if element_size != 0 {
            let start = self.payload_pos + index as usize * element_size as usize;
            let end = start + element_size as usize;
            self.cur_value = Some(start..end);
            self.cur_field_type = element;
            self.state = WalkerState::ArrayElement;
            true
        } else {
            match self.read_variable_value(element) {
                Ok(range) => {
                    self.cur_value = Some(range);
                    self.cur_field_type = element;
                    self.state = WalkerState::ArrayElement;
                    true
                }
                Err(e) => self.fail(e),
            }
        }
    }

    fn advance_array_element(&mut self) -> bool {
        if let Some(range) = self.cur_value.clone() {
            self.payload_pos = range.end;
        }
        let Some(Frame::Array { index, count, .. }) = self.stack.last_mut() else {
            return self.fail(WalkerError::InvalidData);
        };
        *index += 1;
        let next_index = *index;
        let count = *count;
        if next_index >= count {
            self.end_array()
        } else {
            self.begin_array_element(next_index)
        }
    }

    fn end_array(&mut self) -> bool {
        self.cur_value = None;
        self.state = WalkerState::ArrayEnd;
        true
    }

    fn advance_struct_field(&mut self) -> bool {
        let Some(Frame::Struct { remaining_fields }) = self.stack.last_mut() else {
            return self.fail(WalkerError::InvalidData);
        };
        if *remaining_fields == 0 {
            self.state = WalkerState::StructEnd;
            return true;
        }
        *remaining_fields -= 1;
        self.start_next_field()
    }

    fn finish_struct_end(&mut self) -> bool {
        self.stack.pop();
        match self.stack.last() {
            Some(&Frame::Array {
                index,
                count,
                element,
                fields_start,
                ..
            }) => {
                let next_index = index + 1;
                if next_index >= count {
                    self.end_array()
                } else {
                    if let Some(Frame::Array { index, .. }) = self.stack.last_mut() {
                        *index = next_index;
                    }
                    self.schema_pos = fields_start;
                    self.cur_field_type = element;
                    self.state = WalkerState::StructBegin;
                    true
                }
            }
            Some(Frame::Struct { .. }) => self.advance_struct_field(),
            None => self.start_next_field(),
        }
    }

    fn begin_scalar_value(&mut self, field_type: FieldType) -> bool {
        match self.read_variable_value(field_type) {
            Ok(range) => {
                self.cur_value = Some(range);
                self.state = WalkerState::Value;
                true
            }
            Err(e) => self.fail(e),
        }
    }

    fn read_variable_value(&mut self, field_type: FieldType) -> Result<Range<usize>, WalkerError> {
        let start = self.payload_pos;
        let remaining = &self.payload[start..];
        let size = match field_type.encoding.base() {
            FieldEncoding::Value8 => 1,
            FieldEncoding::Value16 => 2,
            FieldEncoding::Value32 => 4,
            FieldEncoding::Value64 => 8,
            FieldEncoding::Value128 => 16,
            FieldEncoding::ZStringChar8 => zstring_len(remaining, 1),
            FieldEncoding::ZStringChar16 => zstring_len(remaining, 2),
            FieldEncoding::ZStringChar32 => zstring_len(remaining, 4),
            FieldEncoding::StringLength16Char8 => return self.read_length_prefixed(1),
            FieldEncoding::StringLength16Char16 => return self.read_length_prefixed(2),
            FieldEncoding::StringLength16Char32 => return self.read_length_prefixed(4),
            FieldEncoding::BinaryLength16Char8 => return self.read_length_prefixed(1),
            _ => return Err(WalkerError::InvalidData),
        };
        if start + size > self.payload.len() {
            return Err(WalkerError::InvalidData);
        }
        Ok(start..start + size)
    }

    fn read_length_prefixed(&mut self, unit_size: usize) -> Result<Range<usize>, WalkerError> {
        let start = self.payload_pos;
        if start + 2 > self.payload.len() {
            return Err(WalkerError::InvalidData);
        }
        let count = self.byte_reader.read_u16(&self.payload[start..start + 2]) as usize;
        let data_start = start + 2;
        let data_end = data_start
            .checked_add(count * unit_size)
            .ok_or(WalkerError::InvalidData)?;
        if data_end > self.payload.len() {
            return Err(WalkerError::InvalidData);
        }
        Ok(data_start..data_end)
    }

    fn finish_item(&mut self) -> bool {
        self.cur_value = None;
        match self.stack.last_mut() {
            Some(Frame::Struct { .. }) => self.advance_struct_field(),
            Some(Frame::Array { .. }) => self.fail(WalkerError::InvalidData),
            None => self.start_next_field(),
        }
    }

    /// Skips directly to the item after the current one, without visiting
    /// nested items individually. For an array whose element encoding has a
    /// fixed size, this consumes exactly `count * element_size` payload
    /// bytes in O(1) regardless of element count.
    pub fn move_next_sibling(&mut self) -> bool {
        match self.state {
            WalkerState::ArrayBegin => {
                if let Some(&Frame::Array {
                    count, element_size, ..
                }) = self.stack.last()
                {
                    if element_size != 0 {
                        self.payload_pos += count as usize * element_size as usize;
                        self.stack.pop();
                        self.cur_value = None;
                        return self.finish_item();
                    }
                }
                let target_depth = self.stack.len();
                loop {
                    if !self.move_next() {
                        return false;
                    }
                    if matches!(self.state, WalkerState::ArrayEnd) && self.stack.len() == target_depth {
                        break;
                    }
                }
                self.move_next()
            }
            WalkerState::StructBegin => {
                if !self.move_next() {
                    return false;
                }
                let target_depth = self.stack.len();
                loop {
                    if matches!(self.state, WalkerState::StructEnd) && self.stack.len() == target_depth {
                        break;
                    }
                    if !self.move_next() {
                        return false;
                    }
                }
                self.move_next()
            }
            _ => self.move_next(),
        }
    }
}

fn zstring_len(bytes: &[u8], unit_size: usize) -> usize {
    let mut i = 0;
    while i + unit_size <= bytes.len() {
        if bytes[i..i + unit_size].iter().all(|&b| b == 0) {
            return i + unit_size;
        }
        i += unit_size;
    }
    bytes.len()
}

fn parse_keyword_suffix(tracepoint_name: &str) -> u64 {
    match tracepoint_name.rfind('K') {
        Some(idx) => u64::from_str_radix(&tracepoint_name[idx + 1..], 16).unwrap_or(0),
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;

    fn build_event(schema_tail: &[u8], payload: &[u8]) -> Vec<u8> {
        let mut meta = Vec::new();
        meta.extend_from_slice(b"evt\0");
        meta.extend_from_slice(schema_tail);

        let mut out = Vec::new();
        out.push(HeaderFlags::DefaultWithExtension.as_int());
        out.push(0); // version
        out.extend_from_slice(&0u16.to_le_bytes()); // id
        out.extend_from_slice(&0u16.to_le_bytes()); // tag
        out.push(0); // opcode
        out.push(4); // level: Info

        out.extend_from_slice(&(meta.len() as u16).to_le_bytes());
        out.extend_from_slice(&ExtensionKind::Metadata.as_int().to_le_bytes());
        out.extend_from_slice(&meta);

        out.extend_from_slice(payload);
        out
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
    fn simple_struct_scenario() {
        // struct Pt { x: Value32/SignedInt, y: Value32/SignedInt }
        let mut schema = Vec::new();
        schema.extend(field_def("Pt", FieldEncoding::Struct.as_int(), Some(2)));
        schema.extend(field_def(
            "x",
            FieldEncoding::Value32.as_int(),
            Some(FieldFormat::SignedInt.as_int()),
        ));
        schema.extend(field_def(
            "y",
            FieldEncoding::Value32.as_int(),
            Some(FieldFormat::SignedInt.as_int()),
        ));

        let payload = [1i32.to_le_bytes(), (-1i32).to_le_bytes()].concat();
        let event = build_event(&schema, &payload);
        let (mut w, _info) = SchemaWalker::start_event("test", &event).unwrap();

        assert!(w.move_next());
        assert_eq!(w.state(), WalkerState::StructBegin);
        assert_eq!(w.item_info().unwrap().name, "Pt");

        assert!(w.move_next());
        assert_eq!(w.state(), WalkerState::Value);
        let item = w.item_info().unwrap();
        assert_eq!(item.name, "x");
        assert_eq!(item.value.unwrap().to_i32(), 1);

        assert!(w.move_next());
        assert_eq!(w.state(), WalkerState::Value);
        let item = w.item_info().unwrap();
        assert_eq!(item.name, "y");
        assert_eq!(item.value.unwrap().to_i32(), -1);

        assert!(w.move_next());
        assert_eq!(w.state(), WalkerState::StructEnd);

        assert!(!w.move_next());
        assert_eq!(w.state(), WalkerState::AfterLastItem);
    }

    #[test]
    fn variable_length_string_array() {
        let mut schema = Vec::new();
        schema.extend(field_def(
            "names",
            FieldEncoding::StringLength16Char8.as_int() | FieldEncoding::VArrayFlag,
            Some(FieldFormat::StringUtf.as_int()),
        ));

        let mut payload = Vec::new();
        payload.extend_from_slice(&2u16.to_le_bytes()); // array count
        payload.extend_from_slice(&3u16.to_le_bytes());
        payload.extend_from_slice(b"abc");
        payload.extend_from_slice(&2u16.to_le_bytes());
        payload.extend_from_slice(b"de");

        let event = build_event(&schema, &payload);
        let (mut w, _) = SchemaWalker::start_event("test", &event).unwrap();

        assert!(w.move_next());
        assert_eq!(w.state(), WalkerState::ArrayBegin);
        assert_eq!(w.cur_array_count, 2);

        assert!(w.move_next());
        assert_eq!(w.state(), WalkerState::ArrayElement);
        let mut text = String::new();
        w.item_info().unwrap().value.unwrap().write_string_to(&mut text);
        assert_eq!(text, "abc");

        assert!(w.move_next());
        assert_eq!(w.state(), WalkerState::ArrayElement);
        text.clear();
        w.item_info().unwrap().value.unwrap().write_string_to(&mut text);
        assert_eq!(text, "de");

        assert!(w.move_next());
        assert_eq!(w.state(), WalkerState::ArrayEnd);

        assert!(!w.move_next());
        assert_eq!(w.state(), WalkerState::AfterLastItem);
    }

    #[test]
    fn empty_array_emits_begin_then_end_with_no_elements() {
        let mut schema = Vec::new();
        schema.extend(field_def(
            "xs",
            FieldEncoding::Value32.as_int() | FieldEncoding::CArrayFlag,
            None,
        ));
        schema.extend_from_slice(&0u16.to_le_bytes());

        let event = build_event(&schema, &[]);
        let (mut w, _) = SchemaWalker::start_event("test", &event).unwrap();

        assert!(w.move_next());
        assert_eq!(w.state(), WalkerState::ArrayBegin);
        assert!(w.move_next());
        assert_eq!(w.state(), WalkerState::ArrayEnd);
        assert!(!w.move_next());
        assert_eq!(w.state(), WalkerState::AfterLastItem);
    }

    #[test]
    fn struct_with_zero_fields_is_an_error() {
        let schema = field_def("S", FieldEncoding::Struct.as_int(), Some(0));
        let event = build_event(&schema, &[]);
        let (mut w, _) = SchemaWalker::start_event("test", &event).unwrap();
        assert!(!w.move_next());
        assert_eq!(w.state(), WalkerState::Error);
        assert_eq!(w.last_error(), Some(WalkerError::InvalidData));
    }

    #[test]
    fn move_next_sibling_skips_fixed_array_in_one_step() {
        let mut schema = Vec::new();
        schema.extend(field_def(
            "xs",
            FieldEncoding::Value32.as_int() | FieldEncoding::CArrayFlag,
            None,
        ));
        schema.extend_from_slice(&3u16.to_le_bytes());
        schema.extend(field_def("after", FieldEncoding::Value8.as_int(), None));

        let mut payload = Vec::new();
        payload.extend_from_slice(&1i32.to_le_bytes());
        payload.extend_from_slice(&2i32.to_le_bytes());
        payload.extend_from_slice(&3i32.to_le_bytes());
        payload.push(99);

        let event = build_event(&schema, &payload);
        let (mut w, _) = SchemaWalker::start_event("test", &event).unwrap();

        assert!(w.move_next());
        assert_eq!(w.state(), WalkerState::ArrayBegin);
        assert!(w.move_next_sibling());
        assert_eq!(w.state(), WalkerState::Value);
        assert_eq!(w.item_info().unwrap().name, "after");
        assert_eq!(w.item_info().unwrap().value.unwrap().to_u8(), 99);
    }

    #[test]
    fn array_of_structs_visits_each_element_and_skips_via_sibling() {
        let mut schema = Vec::new();
        schema.extend(field_def(
            "pts",
            FieldEncoding::Struct.as_int() | FieldEncoding::CArrayFlag,
            Some(1),
        ));
        schema.extend_from_slice(&2u16.to_le_bytes()); // array count
        schema.extend(field_def("x", FieldEncoding::Value8.as_int(), None));
        schema.extend(field_def("after", FieldEncoding::Value8.as_int(), None));

        let payload = [10u8, 20u8, 42u8];
        let event = build_event(&schema, &payload);
        let (mut w, _) = SchemaWalker::start_event("test", &event).unwrap();

        assert!(w.move_next());
        assert_eq!(w.state(), WalkerState::ArrayBegin);
        assert!(w.move_next());
        assert_eq!(w.state(), WalkerState::StructBegin);
        assert!(w.move_next());
        assert_eq!(w.state(), WalkerState::Value);
        assert_eq!(w.item_info().unwrap().value.unwrap().to_u8(), 10);
        assert!(w.move_next());
        assert_eq!(w.state(), WalkerState::StructEnd);
        assert!(w.move_next());
        assert_eq!(w.state(), WalkerState::StructBegin);
        assert!(w.move_next());
        assert_eq!(w.state(), WalkerState::Value);
        assert_eq!(w.item_info().unwrap().value.unwrap().to_u8(), 20);
        assert!(w.move_next());
        assert_eq!(w.state(), WalkerState::StructEnd);
        assert!(w.move_next());
        assert_eq!(w.state(), WalkerState::ArrayEnd);
        assert!(w.move_next());
        assert_eq!(w.state(), WalkerState::Value);
        assert_eq!(w.item_info().unwrap().name, "after");
        assert_eq!(w.item_info().unwrap().value.unwrap().to_u8(), 42);
    }

    #[test]
    fn move_next_sibling_skips_array_of_structs() {
        let mut schema = Vec::new();
        schema.extend(field_def(
            "pts",
            FieldEncoding::Struct.as_int() | FieldEncoding::CArrayFlag,
            Some(1),
        ));
        schema.extend_from_slice(&2u16.to_le_bytes());
        schema.extend(field_def("x", FieldEncoding::Value8.as_int(), None));
        schema.extend(field_def("after", FieldEncoding::Value8.as_int(), None));

        let payload = [10u8, 20u8, 42u8];
        let event = build_event(&schema, &payload);
        let (mut w, _) = SchemaWalker::start_event("test", &event).unwrap();

        assert!(w.move_next());
        assert_eq!(w.state(), WalkerState::ArrayBegin);
        assert!(w.move_next_sibling());
        assert_eq!(w.state(), WalkerState::Value);
        assert_eq!(w.item_info().unwrap().name, "after");
        assert_eq!(w.item_info().unwrap().value.unwrap().to_u8(), 42);
    }
}
