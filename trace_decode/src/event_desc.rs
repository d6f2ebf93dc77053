//! Per-id event description: the attribute plus the tracefs format that
//! together describe every sample sharing one `id`.

extern crate alloc;

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::attr::{AttrOptions, AttrType, SampleTypeOffsets};
use crate::attr::SampleType;
use crate::tracefs_format::TraceFormat;

/// `perf_event_attr`, reduced to the fields the decoder actually consults.
#[derive(Clone, Debug, Default)]
pub struct EventAttr {
    pub attr_type: AttrType,
    pub config: u64,
    pub sample_type: SampleType,
    pub options: AttrOptions,
}

impl EventAttr {
    pub fn sample_id_all(&self) -> bool {
        self.options.has_flag(AttrOptions::SampleIdAll)
    }
}

/// Everything the decoder knows about one `id`: its attribute, precomputed
/// field offsets, the ids that share it, and its tracefs format (once
/// resolved).
#[derive(Clone, Debug)]
pub struct EventDesc {
    attr: EventAttr,
    offsets: SampleTypeOffsets,
    name: String,
    format: Option<Arc<TraceFormat>>,
    ids: Vec<u64>,
}

impl EventDesc {
    /// Builds a descriptor. If `name` is empty and `format` is available,
    /// the name is synthesized as `system:event`.
    pub fn new(attr: EventAttr, name: String, format: Option<Arc<TraceFormat>>, ids: Vec<u64>) -> Self {
        let offsets = SampleTypeOffsets::compute(attr.sample_type);
        let mut this = Self {
            attr,
            offsets,
            name,
            format,
            ids,
        };
        this.update_name();
        this
    }

    pub fn attr(&self) -> &EventAttr {
        &self.attr
    }

    pub fn offsets(&self) -> SampleTypeOffsets {
        self.offsets
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> Option<&TraceFormat> {
        self.format.as_deref()
    }

    pub fn ids(&self) -> &[u64] {
        &self.ids
    }

    /// Advanced: called once the tracefs format for this id becomes known
    /// (e.g. resolved lazily after the attribute section has been parsed).
    pub fn set_format(&mut self, format: Arc<TraceFormat>) {
        self.format = Some(format);
        self.update_name();
    }

    fn update_name(&mut self) {
        if self.name.is_empty() {
            if let Some(format) = &self.format {
                self.name = alloc::format!("{}:{}", format.system_name(), format.name());
            }
        }
    }
}

impl Default for EventDesc {
    fn default() -> Self {
        Self {
            attr: EventAttr::default(),
            offsets: SampleTypeOffsets::default(),
            name: String::new(),
            format: None,
            ids: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_synthesized_from_format_when_absent() {
        let text = "name: sched_switch\nID: 1\nformat:\n\tfield:unsigned short common_type;\toffset:0;\tsize:2;\tsigned:0;\n\nprint fmt: \"\"\n";
        let fmt = TraceFormat::parse(true, "sched", text).unwrap();
        let desc = EventDesc::new(EventAttr::default(), String::new(), Some(Arc::new(fmt)), Vec::new());
        assert_eq!(desc.name(), "sched:sched_switch");
    }

    #[test]
    fn explicit_name_is_not_overwritten() {
        let desc = EventDesc::new(EventAttr::default(), String::from("custom"), None, Vec::new());
        assert_eq!(desc.name(), "custom");
    }
}
