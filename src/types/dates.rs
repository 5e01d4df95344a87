//! Date parsing for hist-tag timestamps and `YYYYMMDD` location columns.

use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// Latest year accepted as a real end date. Anything beyond is the
/// "unmeasured / far future" sentinel (e.g. `32000101`).
pub const MAX_VALID_YEAR: i32 = 2100;

/// Timestamp formats accepted in the hist-tag inventory.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%m-%Y", "%Y%m%d"];

/// Parse a hist-tag timestamp. Date-only values are taken at midnight.
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(value, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Parse a `YYYYMMDD` column value.
pub fn parse_yyyymmdd(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.len() != 8 {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y%m%d").ok()
}

pub fn format_yyyymmdd(dt: &NaiveDateTime) -> String {
    dt.format("%Y%m%d").to_string()
}

pub fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Interpretation of an `EIND` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndDate {
    /// A real end date up to year 2100.
    Date(NaiveDate),
    /// The far-future sentinel (`32000101` and similar).
    Open,
    /// Empty or unparseable.
    Invalid,
}

impl EndDate {
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit()) {
            let year: i32 = value[..4].parse().unwrap_or(0);
            if year > MAX_VALID_YEAR {
                return Self::Open;
            }
        }
        match parse_yyyymmdd(value) {
            Some(d) if d.year() <= MAX_VALID_YEAR => Self::Date(d),
            Some(_) => Self::Open,
            None => Self::Invalid,
        }
    }

    /// Whether the location is still active on `today`. Open ends are active;
    /// invalid ends are not.
    pub fn is_after(&self, today: NaiveDate) -> bool {
        match self {
            Self::Date(d) => today < *d,
            Self::Open => true,
            Self::Invalid => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_datetime_formats() {
        let expected = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(parse_datetime("2020-01-01 00:00:00"), Some(expected));
        assert_eq!(parse_datetime("2020-01-01"), Some(expected));
        assert_eq!(parse_datetime("20200101"), Some(expected));
        assert_eq!(parse_datetime("01-01-2020 00:00"), Some(expected));
        assert!(parse_datetime("januari").is_none());
    }

    #[test]
    fn test_end_date_sentinel() {
        assert_eq!(EndDate::parse("32000101"), EndDate::Open);
        assert_eq!(
            EndDate::parse("21000101"),
            EndDate::Date(NaiveDate::from_ymd_opt(2100, 1, 1).unwrap())
        );
        assert_eq!(EndDate::parse(""), EndDate::Invalid);
    }

    #[test]
    fn test_end_date_is_after() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert!(EndDate::parse("21000101").is_after(today));
        assert!(!EndDate::parse("20200101").is_after(today));
        assert!(EndDate::Open.is_after(today));
        assert!(!EndDate::Invalid.is_after(today));
    }
}
