use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime};

/// Spreadsheet serial day 0.
const SERIAL_EPOCH: (i32, u32, u32) = (1899, 12, 30);
/// Serial for 9999-12-31; anything past that is not a date.
const MAX_SERIAL: f64 = 2_958_465.0;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

// Month-first before day-first; the day-first forms only win when the month-first read is impossible.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

/// Parse a free-form date string into a calendar date in `tz`.
///
/// Strings carrying an explicit offset (RFC 3339) are shifted into `tz`;
/// naive date-times and plain dates are taken to already be local.
pub fn parse_date(s: &str, tz: &FixedOffset) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(tz).date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ndt.date());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    None
}

/// Convert a spreadsheet serial day number (1899-12-30 epoch) into a date.
pub fn from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > MAX_SERIAL {
        return None;
    }
    let (y, m, d) = SERIAL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(y, m, d)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

/// Parse a configured zone such as `+05:30`, `-0400`, `Z` or `UTC`.
pub fn parse_offset(s: &str) -> Option<FixedOffset> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("utc") || s.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0);
    }
    s.parse::<FixedOffset>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_iso_and_slash_dates() {
        assert_eq!(parse_date("2024-03-15", &utc()), Some(ymd(2024, 3, 15)));
        assert_eq!(parse_date("2024/03/15", &utc()), Some(ymd(2024, 3, 15)));
        assert_eq!(parse_date(" 3/15/2024 ", &utc()), Some(ymd(2024, 3, 15)));
        assert_eq!(parse_date("2024-03-15 10:30:00", &utc()), Some(ymd(2024, 3, 15)));
    }

    #[test]
    fn month_first_then_day_first() {
        assert_eq!(parse_date("03/04/2024", &utc()), Some(ymd(2024, 3, 4)));
        assert_eq!(parse_date("15/03/2024", &utc()), Some(ymd(2024, 3, 15)));
    }

    #[test]
    fn parses_named_months() {
        assert_eq!(parse_date("15-Mar-2024", &utc()), Some(ymd(2024, 3, 15)));
        assert_eq!(parse_date("March 15, 2024", &utc()), Some(ymd(2024, 3, 15)));
    }

    #[test]
    fn rfc3339_shifts_into_zone() {
        let ist = parse_offset("+05:30").unwrap();
        assert_eq!(
            parse_date("2024-03-14T20:00:00Z", &ist),
            Some(ymd(2024, 3, 15))
        );
        assert_eq!(
            parse_date("2024-03-14T20:00:00Z", &utc()),
            Some(ymd(2024, 3, 14))
        );
    }

    #[test]
    fn garbage_is_none() {
        assert_eq!(parse_date("", &utc()), None);
        assert_eq!(parse_date("not a date", &utc()), None);
        assert_eq!(parse_date("13/13/2024", &utc()), None);
    }

    #[test]
    fn serial_days() {
        assert_eq!(from_serial(45366.0), Some(ymd(2024, 3, 15)));
        assert_eq!(from_serial(45366.75), Some(ymd(2024, 3, 15)));
        assert_eq!(from_serial(0.0), None);
        assert_eq!(from_serial(f64::NAN), None);
        assert_eq!(from_serial(1e12), None);
    }

    #[test]
    fn offsets() {
        assert_eq!(parse_offset("UTC"), FixedOffset::east_opt(0));
        assert_eq!(parse_offset("+05:30"), FixedOffset::east_opt(5 * 3600 + 1800));
        assert_eq!(parse_offset("-04:00"), FixedOffset::west_opt(4 * 3600));
        assert_eq!(parse_offset("Asia/Kolkata"), None);
    }
}
