//! Small formatting helpers shared by the scalar writer and the JSON sink
//! driver: Unix-time-to-ISO-8601 and the `name;tag=0xNNNN` field-name suffix.

extern crate alloc;

use alloc::string::String;
use core::fmt;
use core::fmt::Write;

use crate::options::ConvertOptions;

const DAYS_PER_400Y: i64 = 146097;
const DAYS_PER_100Y: i64 = 36524;
const DAYS_PER_4Y: i64 = 1461;

/// Converts a day count since 1970-01-01 into a civil `(year, month, day)`
/// triple, using Howard Hinnant's `civil_from_days` algorithm. No libc, no
/// floating point, works the same on every host regardless of its C library
/// — which is what lets this run in a `no_std` decoder.
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / DAYS_PER_400Y;
    let doe = (z - era * DAYS_PER_400Y) as i64; // [0, 146096]
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365; // [0, 399]
    let year = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100); // [0, 365]
    let mp = (5 * doy + 2) / 153; // [0, 11]
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32; // [1, 31]
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32; // [1, 12]
    let year = if month <= 2 { year + 1 } else { year };
    (year, month, day)
}

/// Renders Unix seconds-since-epoch as `YYYY-MM-DDTHH:MM:SSZ`. Negative
/// (pre-1970) and far-future values are supported; this never panics.
pub fn format_unix_seconds(total_seconds: i64) -> String {
    let days = total_seconds.div_euclid(86400);
    let secs_of_day = total_seconds.rem_euclid(86400);
    let (year, month, day) = civil_from_days(days);
    let hour = secs_of_day / 3600;
    let minute = (secs_of_day % 3600) / 60;
    let second = secs_of_day % 60;
    let mut out = String::with_capacity(20);
    let _ = write!(
        out,
        "{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}Z"
    );
    out
}

/// Renders a field/item name, appending `;tag=0xNNNN` when
/// [`ConvertOptions::FieldTag`] is set and the tag is nonzero.
pub struct NameAndTagDisplay<'n> {
    name: &'n str,
    tag: u16,
    options: ConvertOptions,
}

impl<'n> NameAndTagDisplay<'n> {
    /// Builds a display adapter for `name`/`tag`, honoring `options`.
    pub const fn new(name: &'n str, tag: u16, options: ConvertOptions) -> Self {
        Self { name, tag, options }
    }
}

impl<'n> fmt::Display for NameAndTagDisplay<'n> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)?;
        if self.tag != 0 && self.options.has(ConvertOptions::FieldTag) {
            write!(f, ";tag=0x{:04x}", self.tag)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_renders_as_1970() {
        assert_eq!(format_unix_seconds(0), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn one_billion_seconds_matches_known_date() {
        assert_eq!(format_unix_seconds(1_000_000_000), "2001-09-09T01:46:40Z");
    }

    #[test]
    fn pre_epoch_seconds_do_not_panic() {
        let rendered = format_unix_seconds(-86400);
        assert_eq!(rendered, "1969-12-31T00:00:00Z");
    }

    #[test]
    fn tag_suffix_only_when_requested_and_nonzero() {
        let d = NameAndTagDisplay::new("x", 0x12, ConvertOptions::FieldTag);
        assert_eq!(d.to_string(), "x;tag=0x0012");
        let d = NameAndTagDisplay::new("x", 0, ConvertOptions::FieldTag);
        assert_eq!(d.to_string(), "x");
        let d = NameAndTagDisplay::new("x", 0x12, ConvertOptions::None);
        assert_eq!(d.to_string(), "x");
    }
}
