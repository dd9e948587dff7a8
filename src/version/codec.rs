//! Fixed-grammar codec between ISO-8601 UTC text and sortable integers.
//!
//! Accepted inputs are exactly `YYYY-MM-DDTHH:MMZ` (17 characters, seconds
//! are zero) or `YYYY-MM-DDTHH:MM:SSZ` (20 characters). The integer form is
//! `year*10^10 + month*10^8 + day*10^6 + hour*10^4 + minute*10^2 + second`,
//! so integer order equals chronological order.

const SHORT_LEN: usize = 17;
const LONG_LEN: usize = 20;

const YEAR_WEIGHT: i64 = 10_000_000_000;
const MONTH_WEIGHT: i64 = 100_000_000;
const DAY_WEIGHT: i64 = 1_000_000;
const HOUR_WEIGHT: i64 = 10_000;
const MINUTE_WEIGHT: i64 = 100;

/// Calendar fields of a timestamp, in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarFields {
    pub year: u32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl CalendarFields {
    /// Check every field against the calendar. Years are limited to 1 through 9999.
    pub fn is_valid(&self) -> bool {
        (1..=9999).contains(&self.year)
            && (1..=12).contains(&self.month)
            && self.day >= 1
            && self.day <= days_in_month(self.year, self.month)
            && self.hour <= 23
            && self.minute <= 59
            && self.second <= 59
    }

    /// Weighted integer form; `None` when the fields are not a real instant.
    pub fn to_timestamp(&self) -> Option<i64> {
        if !self.is_valid() {
            return None;
        }

        Some(
            i64::from(self.year) * YEAR_WEIGHT
                + i64::from(self.month) * MONTH_WEIGHT
                + i64::from(self.day) * DAY_WEIGHT
                + i64::from(self.hour) * HOUR_WEIGHT
                + i64::from(self.minute) * MINUTE_WEIGHT
                + i64::from(self.second),
        )
    }

    /// Split a weighted integer back into its fields.
    pub fn from_timestamp(value: i64) -> Option<Self> {
        if value < 0 {
            return None;
        }

        let fields = Self {
            year: u32::try_from(value / YEAR_WEIGHT).ok()?,
            month: ((value / MONTH_WEIGHT) % 100) as u32,
            day: ((value / DAY_WEIGHT) % 100) as u32,
            hour: ((value / HOUR_WEIGHT) % 100) as u32,
            minute: ((value / MINUTE_WEIGHT) % 100) as u32,
            second: (value % 100) as u32,
        };

        fields.is_valid().then_some(fields)
    }
}

/// Gregorian leap year rule.
pub fn is_leap_year(year: u32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Days in `month` of `year`; 0 for a month outside 1..=12.
pub fn days_in_month(year: u32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Parse a constrained ISO-8601 UTC timestamp into its integer form.
///
/// Returns `None` for wrong lengths, misplaced separators, non-digit
/// characters and impossible calendar values. Never panics.
pub fn try_parse_timestamp(text: &str) -> Option<i64> {
    let bytes = text.as_bytes();

    // Structure first: no digit is looked at until every separator fits.
    let has_seconds = match bytes.len() {
        SHORT_LEN => false,
        LONG_LEN => true,
        _ => return None,
    };

    let separators_ok = bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes[10] == b'T'
        && bytes[13] == b':'
        && if has_seconds {
            bytes[16] == b':' && bytes[19] == b'Z'
        } else {
            bytes[16] == b'Z'
        };
    if !separators_ok {
        return None;
    }

    let fields = CalendarFields {
        year: read_digits(bytes, 0, 4)?,
        month: read_digits(bytes, 5, 2)?,
        day: read_digits(bytes, 8, 2)?,
        hour: read_digits(bytes, 11, 2)?,
        minute: read_digits(bytes, 14, 2)?,
        second: if has_seconds {
            read_digits(bytes, 17, 2)?
        } else {
            0
        },
    };

    fields.to_timestamp()
}

/// `(success, value)` form of [`try_parse_timestamp`]; a failure yields `0`.
pub fn parse_timestamp_or_zero(text: &str) -> (bool, i64) {
    match try_parse_timestamp(text) {
        Some(value) => (true, value),
        None => (false, 0),
    }
}

/// Render an integer timestamp as `YYYY-MM-DDTHH:MM:SSZ`.
pub fn format_timestamp(value: i64) -> Option<String> {
    let f = CalendarFields::from_timestamp(value)?;
    Some(format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        f.year, f.month, f.day, f.hour, f.minute, f.second
    ))
}

/// Base-10 accumulation over `len` ASCII digits starting at `start`.
fn read_digits(bytes: &[u8], start: usize, len: usize) -> Option<u32> {
    let mut value = 0u32;
    for &b in &bytes[start..start + len] {
        if !b.is_ascii_digit() {
            return None;
        }
        value = value * 10 + u32::from(b - b'0');
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_without_seconds() {
        assert_eq!(try_parse_timestamp("2021-09-06T16:45Z"), Some(20210906164500));
    }

    #[test]
    fn test_parse_with_seconds() {
        assert_eq!(
            try_parse_timestamp("1987-02-12T10:32:56Z"),
            Some(19870212103256)
        );
    }

    #[test]
    fn test_missing_time_fails() {
        assert_eq!(try_parse_timestamp("2020-11-17"), None);
        assert_eq!(parse_timestamp_or_zero("2020-11-17"), (false, 0));
    }

    #[test]
    fn test_wrong_length_fails() {
        assert_eq!(try_parse_timestamp(""), None);
        assert_eq!(try_parse_timestamp("2021-09-06T16:45:00"), None);
        assert_eq!(try_parse_timestamp("2021-09-06T16:45:00.000Z"), None);
        assert_eq!(try_parse_timestamp("2021-09-06T16:45:00Z "), None);
        assert_eq!(try_parse_timestamp(&"9".repeat(200)), None);
    }

    #[test]
    fn test_wrong_separators_fail() {
        assert_eq!(try_parse_timestamp("2021/09-06T16:45Z"), None);
        assert_eq!(try_parse_timestamp("2021-09/06T16:45Z"), None);
        assert_eq!(try_parse_timestamp("2021-09-06 16:45Z"), None);
        assert_eq!(try_parse_timestamp("2021-09-06T16.45Z"), None);
        assert_eq!(try_parse_timestamp("2021-09-06T16:45z"), None);
        assert_eq!(try_parse_timestamp("2021-09-06T16:45.00Z"), None);
        assert_eq!(try_parse_timestamp("2021-09-06T16:45:00+"), None);
    }

    #[test]
    fn test_non_digits_fail() {
        assert_eq!(try_parse_timestamp("2O21-09-06T16:45Z"), None);
        assert_eq!(try_parse_timestamp("2021-0a-06T16:45Z"), None);
        assert_eq!(try_parse_timestamp("2021-09-06T16:4-Z"), None);
        assert_eq!(try_parse_timestamp("2021-09-06T16:45:+1Z"), None);
    }

    #[test]
    fn test_multibyte_input_fails() {
        // 17 bytes once encoded, but the separator slot holds a multi-byte char.
        assert_eq!("2021-09-06T16é5Z".len(), 17);
        assert_eq!(try_parse_timestamp("2021-09-06T16é5Z"), None);
    }

    #[test]
    fn test_invalid_calendar_values_fail() {
        assert_eq!(try_parse_timestamp("2021-13-06T16:45Z"), None);
        assert_eq!(try_parse_timestamp("2021-00-06T16:45Z"), None);
        assert_eq!(try_parse_timestamp("2021-02-30T16:45Z"), None);
        assert_eq!(try_parse_timestamp("2021-02-29T16:45Z"), None);
        assert_eq!(try_parse_timestamp("2021-04-31T16:45Z"), None);
        assert_eq!(try_parse_timestamp("2021-09-00T16:45Z"), None);
        assert_eq!(try_parse_timestamp("2021-09-06T24:00Z"), None);
        assert_eq!(try_parse_timestamp("2021-09-06T16:60Z"), None);
        assert_eq!(try_parse_timestamp("2021-09-06T16:45:60Z"), None);
        assert_eq!(try_parse_timestamp("0000-01-01T00:00Z"), None);
    }

    #[test]
    fn test_leap_years() {
        assert_eq!(try_parse_timestamp("2020-02-29T00:00Z"), Some(20200229000000));
        assert_eq!(try_parse_timestamp("2000-02-29T00:00Z"), Some(20000229000000));
        assert_eq!(try_parse_timestamp("1900-02-29T00:00Z"), None);
        assert!(is_leap_year(2024));
        assert!(!is_leap_year(2100));
    }

    #[test]
    fn test_chronological_order_matches_integer_order() {
        let ordered = [
            "1999-12-31T23:59:59Z",
            "2000-01-01T00:00Z",
            "2000-01-01T00:00:01Z",
            "2000-01-01T00:01Z",
            "2000-01-02T00:00Z",
            "2000-02-01T00:00Z",
            "2001-01-01T00:00Z",
        ];
        let values: Vec<i64> = ordered
            .iter()
            .map(|t| try_parse_timestamp(t).unwrap())
            .collect();

        for pair in values.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_decomposition_reproduces_fields() {
        let value = try_parse_timestamp("1987-02-12T10:32:56Z").unwrap();
        let fields = CalendarFields::from_timestamp(value).unwrap();
        assert_eq!(
            fields,
            CalendarFields {
                year: 1987,
                month: 2,
                day: 12,
                hour: 10,
                minute: 32,
                second: 56,
            }
        );
        assert_eq!(fields.to_timestamp(), Some(value));
        assert_eq!(format_timestamp(value).unwrap(), "1987-02-12T10:32:56Z");
    }

    #[test]
    fn test_format_short_input_renders_seconds() {
        let value = try_parse_timestamp("2021-09-06T16:45Z").unwrap();
        let text = format_timestamp(value).unwrap();
        assert_eq!(text, "2021-09-06T16:45:00Z");
        assert_eq!(try_parse_timestamp(&text), Some(value));
    }

    #[test]
    fn test_from_timestamp_rejects_garbage() {
        assert_eq!(CalendarFields::from_timestamp(-1), None);
        assert_eq!(CalendarFields::from_timestamp(20211306164500), None);
        assert_eq!(format_timestamp(0), None);
    }
}
