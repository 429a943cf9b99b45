//! EPG (Electronic Program Guide) module
//!
//! Contains the XMLTV parser, its timestamp handling and the query index.

mod datetime;
mod index;
mod parser;

// Re-export public types
pub use datetime::{parse_xmltv_datetime, try_parse_xmltv_datetime};
pub use index::{EpgIndex, SearchField};
pub use parser::{
    parse_document,
    Channel,
    CreditRole,
    EpgParser,
    EpisodeNum,
    LocalizedText,
    Programme,
    Rating,
};

use chrono::{DateTime, Local, Utc};

/// Format an instant as local time HH:MM
pub fn format_time(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%H:%M").to_string()
}

/// Format an instant as local datetime YYYY-MM-DD HH:MM
pub fn format_datetime(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// Format an optional start/stop pair, e.g. "19:00 - 20:30"
pub fn format_slot(start: Option<DateTime<Utc>>, stop: Option<DateTime<Utc>>) -> String {
    let start = start.map(format_time).unwrap_or_else(|| "--:--".to_string());
    match stop {
        Some(stop) => format!("{} - {}", start, format_time(stop)),
        None => start,
    }
}
