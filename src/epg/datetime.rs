//! XMLTV timestamp parsing
//!
//! XMLTV stamps look like `20240115120000 +0100`: fourteen digits of local
//! date-time, optionally followed by a `+HHMM`/`-HHMM` offset. A stamp without a
//! usable offset is taken as UTC.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use log::{debug, warn};

use crate::error::FieldParseError;

const COMPACT_LEN: usize = 14;
const COMPACT_FORMAT: &str = "%Y%m%d%H%M%S";

/// Formats tried for stamps shorter than the compact form
const LENIENT_DATETIME_FORMATS: &[&str] = &["%Y%m%d%H%M", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"];
const LENIENT_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Parse an XMLTV stamp, logging and swallowing failures
pub fn parse_xmltv_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if raw.trim().is_empty() {
        return None;
    }
    match try_parse_xmltv_datetime(raw) {
        Ok(dt) => Some(dt),
        Err(e) => {
            warn!("{}", e);
            None
        }
    }
}

/// Parse an XMLTV stamp.
///
/// A malformed offset does not fail the parse; the naive value is kept.
pub fn try_parse_xmltv_datetime(raw: &str) -> Result<DateTime<Utc>, FieldParseError> {
    let raw = raw.trim();
    if raw.chars().count() < COMPACT_LEN {
        return parse_lenient(raw).ok_or_else(|| FieldParseError::Timestamp(raw.to_string()));
    }

    let split = raw
        .char_indices()
        .nth(COMPACT_LEN)
        .map_or(raw.len(), |(i, _)| i);
    let (compact, rest) = raw.split_at(split);

    let naive = NaiveDateTime::parse_from_str(compact, COMPACT_FORMAT)
        .map_err(|_| FieldParseError::Timestamp(raw.to_string()))?;

    let offset = rest.trim();
    if offset.is_empty() {
        return Ok(naive.and_utc());
    }

    match parse_offset(offset).and_then(|tz| tz.from_local_datetime(&naive).single()) {
        Some(dt) => Ok(dt.with_timezone(&Utc)),
        None => {
            debug!("{}", FieldParseError::Offset(offset.to_string()));
            Ok(naive.and_utc())
        }
    }
}

/// Parse "+0100" / "-0530" / "+01" into a fixed offset
fn parse_offset(tz: &str) -> Option<FixedOffset> {
    let sign = match tz.chars().next()? {
        '+' => 1,
        '-' => -1,
        _ => return None,
    };
    let digits = &tz[1..];
    if digits.len() < 2 || digits.len() > 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = if digits.len() >= 4 { digits[2..4].parse().ok()? } else { 0 };
    if minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn parse_lenient(raw: &str) -> Option<DateTime<Utc>> {
    LENIENT_DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
        .or_else(|| {
            LENIENT_DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_offset_applied() {
        assert_eq!(parse_xmltv_datetime("20240101120000 +0200"), Some(utc(2024, 1, 1, 10, 0, 0)));
        assert_eq!(parse_xmltv_datetime("20240101120000 -0530"), Some(utc(2024, 1, 1, 17, 30, 0)));
        assert_eq!(parse_xmltv_datetime("20240101120000+0100"), Some(utc(2024, 1, 1, 11, 0, 0)));
        assert_eq!(parse_xmltv_datetime("20240101003000 +0100"), Some(utc(2023, 12, 31, 23, 30, 0)));
    }

    #[test]
    fn test_offset_difference() {
        let ts1 = parse_xmltv_datetime("20240115120000 +0100").unwrap();
        let ts2 = parse_xmltv_datetime("20240115120000 +0000").unwrap();
        assert_eq!((ts2 - ts1).num_seconds(), 3600);
    }

    #[test]
    fn test_no_offset_is_utc() {
        assert_eq!(parse_xmltv_datetime("20240115120000"), Some(utc(2024, 1, 15, 12, 0, 0)));
        assert_eq!(parse_xmltv_datetime("  20240115120000  "), Some(utc(2024, 1, 15, 12, 0, 0)));
    }

    #[test]
    fn test_malformed_offset_keeps_naive_value() {
        assert_eq!(parse_xmltv_datetime("20240101120000 +02xx"), Some(utc(2024, 1, 1, 12, 0, 0)));
        assert_eq!(parse_xmltv_datetime("20240101120000 CET"), Some(utc(2024, 1, 1, 12, 0, 0)));
        assert_eq!(parse_xmltv_datetime("20240101120000 +9900"), Some(utc(2024, 1, 1, 12, 0, 0)));
    }

    #[test]
    fn test_invalid_compact_fails() {
        assert_eq!(
            try_parse_xmltv_datetime("20241301120000 +0000"),
            Err(FieldParseError::Timestamp("20241301120000 +0000".to_string()))
        );
        assert_eq!(parse_xmltv_datetime("2024-01-01 12:00:00"), None);
        assert_eq!(parse_xmltv_datetime("not a timestamp!"), None);
    }

    #[test]
    fn test_lenient_fallback() {
        assert_eq!(parse_xmltv_datetime("202401151230"), Some(utc(2024, 1, 15, 12, 30, 0)));
        assert_eq!(parse_xmltv_datetime("20240115"), Some(utc(2024, 1, 15, 0, 0, 0)));
        assert_eq!(parse_xmltv_datetime("2024-01-15"), Some(utc(2024, 1, 15, 0, 0, 0)));
        assert_eq!(parse_xmltv_datetime("01/15/2024"), Some(utc(2024, 1, 15, 0, 0, 0)));
        assert_eq!(parse_xmltv_datetime("garbage"), None);
        assert_eq!(parse_xmltv_datetime(""), None);
    }
}
