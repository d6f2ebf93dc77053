//! Per-field type resolution for one line of a tracefs "format:" block:
//! turns a C-like type declaration into `(encoding, format, array count,
//! element size)` plus the byte range it occupies in a sample payload.

extern crate alloc;

use alloc::string::String;
use alloc::string::ToString;

use crate::byte_reader::ByteReader;
use crate::encoding::{FieldEncoding, FieldFormat};
use crate::value::{ArrayKind, FieldValue, ValueMetadata};

/// How a field's length/location is determined relative to the fixed part
/// of the sample payload.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FieldLocation {
    /// Fixed offset and size, as declared.
    Fixed,
    /// The declared size covers the remainder of the record (a trailing `[]`).
    RestOfEvent,
    /// `__rel_loc`: low 16 bits are a length, high 16 bits are an offset
    /// relative to the end of this descriptor field, in a 4-byte cell.
    RelLoc4,
    /// `__data_loc`: low 16 bits are a length, high 16 bits are an absolute
    /// offset into the record, in a 4-byte cell.
    DataLoc4,
}

/// One field of a parsed tracefs format: name, declared byte range, and the
/// encoding/format it was deduced to have.
#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    name: String,
    offset: u16,
    size: u16,
    signed: bool,
    location: FieldLocation,
    array_count: u16,
    element_size_shift: u8,
    encoding: FieldEncoding,
    format: FieldFormat,
}

impl FieldDescriptor {
    /// Field name, e.g. `"comm"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared offset of the fixed-size descriptor cell in the payload.
    pub const fn offset(&self) -> u16 {
        self.offset
    }

    /// Declared size of the fixed-size descriptor cell in the payload.
    pub const fn size(&self) -> u16 {
        self.size
    }

    /// Whether the `signed:` property was set on this field.
    pub const fn signed(&self) -> bool {
        self.signed
    }

    /// The field's deduced encoding.
    pub const fn encoding(&self) -> FieldEncoding {
        self.encoding
    }

    /// The field's deduced format.
    pub const fn format(&self) -> FieldFormat {
        self.format
    }

    /// Parses one `field:` line of a tracefs format block.
    ///
    /// Expected shape: `field:<ctype> <name>; offset:<N>; size:<N>; signed:<N>;`
    /// where `<name>` may have a trailing `[N]` or `[]`. Returns `None` if the
    /// line is missing the `field:`/`offset:`/`size:` properties.
    pub fn parse(long_is_64_bits: bool, line: &str) -> Option<Self> {
        let mut ctype = None;
        let mut offset = None;
        let mut size = None;
        let mut signed = false;

        for raw_prop in line.split(';') {
            let prop = raw_prop.trim();
            if prop.is_empty() {
                continue;
            }
            let (key, val) = prop.split_once(':')?;
            let val = val.trim();
            match key.trim() {
                "field" | "field special" => ctype = Some(val),
                "offset" => offset = val.parse::<u16>().ok(),
                "size" => size = val.parse::<u16>().ok(),
                "signed" => signed = val.trim() != "0",
                _ => {}
            }
        }

        let ctype = ctype?;
        let offset = offset?;
        let size = size?;

        let (base_decl, name_with_brackets) = split_type_and_name(ctype)?;
        let (name, bracket_count) = split_name_and_brackets(name_with_brackets);

        let (location, array_count) = classify_location(base_decl, bracket_count, size);
        let (mut encoding, mut format, element_size_shift) =
            deduce_from_base_type(base_decl, long_is_64_bits, signed);

        if matches!(location, FieldLocation::RestOfEvent) {
            encoding = FieldEncoding::StringLength16Char8;
            format = FieldFormat::String8;
        } else if matches!(location, FieldLocation::RelLoc4 | FieldLocation::DataLoc4) {
            encoding = FieldEncoding::from_int(
                FieldEncoding::StringLength16Char8.as_int() | FieldEncoding::VArrayFlag,
            );
            format = FieldFormat::String8;
        } else if let Some(count) = array_count {
            if count > 0 && encoding.fixed_element_size() > 0 {
                encoding =
                    FieldEncoding::from_int(encoding.as_int() | FieldEncoding::CArrayFlag);
            }
        }

        Some(Self {
            name: name.to_string(),
            offset,
            size,
            signed,
            location,
            array_count: array_count.unwrap_or(0),
            element_size_shift,
            encoding,
            format,
        })
    }

    /// Extracts this field's [`FieldValue`] from a sample's raw payload.
    ///
    /// For `__rel_loc`/`__data_loc` fields, follows the indirection cell at
    /// `offset` to the variable-length bytes elsewhere in `payload`. Returns
    /// `None` if the declared range (direct or indirect) does not fit in
    /// `payload`.
    pub fn get_field_value<'dat>(
        &self,
        payload: &'dat [u8],
        byte_reader: ByteReader,
    ) -> Option<FieldValue<'dat>> {
        let start = self.offset as usize;
        let end = start.checked_add(self.size as usize)?;
        let cell = payload.get(start..end)?;

        match self.location {
            FieldLocation::Fixed => {
                let array_kind = if self.array_count > 0 {
                    ArrayKind::Constant
                } else {
                    ArrayKind::Scalar
                };
                let element_size = 1u8 << self.element_size_shift;
                let meta = ValueMetadata::array(
                    byte_reader,
                    self.encoding,
                    self.format,
                    0,
                    element_size,
                    array_kind,
                    self.array_count.max(1) as u32,
                );
                Some(FieldValue::new(cell, meta))
            }
            FieldLocation::RestOfEvent => {
                let meta = ValueMetadata::scalar(byte_reader, self.encoding, self.format, 0, 0);
                Some(FieldValue::new(cell, meta))
            }
            FieldLocation::RelLoc4 | FieldLocation::DataLoc4 => {
                let raw = byte_reader.read_u32(cell);
                let len = (raw & 0xffff) as usize;
                let rel_offset = (raw >> 16) as usize;
                let data_start = match self.location {
                    FieldLocation::DataLoc4 => rel_offset,
                    FieldLocation::RelLoc4 => end.checked_add(rel_offset)?,
                    _ => unreachable!(),
                };
                let data_end = data_start.checked_add(len)?;
                let bytes = payload.get(data_start..data_end)?;
                let meta = ValueMetadata::scalar(byte_reader, self.encoding, self.format, 0, 0);
                Some(FieldValue::new(bytes, meta))
            }
        }
    }
}

fn split_type_and_name(decl: &str) -> Option<(&str, &str)> {
    let decl = decl.trim();
    let idx = decl.rfind(|c: char| c.is_whitespace() || c == '*')?;
    Some((decl[..=idx].trim_end(), decl[idx + 1..].trim()))
}

fn split_name_and_brackets(name: &str) -> (&str, Option<u16>) {
    match name.find('[') {
        None => (name, None),
        Some(idx) => {
            let base = &name[..idx];
            let inside = name[idx + 1..].trim_end_matches(']').trim();
            let count = if inside.is_empty() {
                None
            } else {
                inside.parse::<u16>().ok()
            };
            (base, count.or(Some(0)))
        }
    }
}

fn classify_location(base_decl: &str, bracket_count: Option<u16>, size: u16) -> (FieldLocation, Option<u16>) {
    let decl = base_decl.trim();
    if size == 0 {
        return (FieldLocation::RestOfEvent, None);
    }
    if decl.contains("__data_loc") {
        return (FieldLocation::DataLoc4, None);
    }
    if decl.contains("__rel_loc") {
        return (FieldLocation::RelLoc4, None);
    }
    match bracket_count {
        Some(0) => (FieldLocation::RestOfEvent, None),
        Some(n) => (FieldLocation::Fixed, Some(n)),
        None => (FieldLocation::Fixed, None),
    }
}

fn deduce_from_base_type(
    decl: &str,
    long_is_64_bits: bool,
    signed_prop: bool,
) -> (FieldEncoding, FieldFormat, u8) {
    let decl = decl.trim();
    let is_unsigned = decl.contains("unsigned") || decl.starts_with('u') || decl.contains(" u");

    let width_bits: Option<u32> = if decl.contains("64") || decl.contains("long long") {
        Some(64)
    } else if decl.contains("32") {
        Some(32)
    } else if decl.contains("16") || decl.contains("short") {
        Some(16)
    } else if decl.contains("8") || decl == "char" || decl.ends_with(" char") {
        Some(8)
    } else if decl.contains("long") {
        Some(if long_is_64_bits { 64 } else { 32 })
    } else if decl.contains("int") {
        Some(32)
    } else {
        None
    };

    let format = if signed_prop {
        FieldFormat::SignedInt
    } else if is_unsigned {
        FieldFormat::UnsignedInt
    } else {
        FieldFormat::SignedInt
    };

    match width_bits {
        Some(8) => (FieldEncoding::Value8, format, 0),
        Some(16) => (FieldEncoding::Value16, format, 1),
        Some(32) => (FieldEncoding::Value32, format, 2),
        Some(64) => (FieldEncoding::Value64, format, 3),
        _ => (FieldEncoding::Value8, FieldFormat::HexBytes, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_fixed_field() {
        let f = FieldDescriptor::parse(
            true,
            "field:int common_pid;\toffset:4;\tsize:4;\tsigned:1;",
        )
        .unwrap();
        assert_eq!(f.name(), "common_pid");
        assert_eq!(f.offset(), 4);
        assert_eq!(f.size(), 4);
        assert!(f.signed());
        assert_eq!(f.encoding().base(), FieldEncoding::Value32);
        assert_eq!(f.format(), FieldFormat::SignedInt);
    }

    #[test]
    fn parses_data_loc_string_field() {
        let f = FieldDescriptor::parse(
            true,
            "field:__data_loc char[] name;\toffset:8;\tsize:4;\tsigned:0;",
        )
        .unwrap();
        assert_eq!(f.name(), "name");
        assert!(f.encoding().is_varray());
    }

    #[test]
    fn extracts_fixed_field_value_from_payload() {
        let f = FieldDescriptor::parse(
            true,
            "field:int common_pid;\toffset:0;\tsize:4;\tsigned:1;",
        )
        .unwrap();
        let payload = 123i32.to_ne_bytes();
        let v = f
            .get_field_value(&payload, ByteReader::host_endian())
            .unwrap();
        assert_eq!(v.to_i32(), 123);
    }
}
