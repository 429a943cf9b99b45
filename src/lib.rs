//! IPTV guide ingestion
//!
//! Parses extended M3U playlists into Live / Movie / Series catalogs and XMLTV
//! documents into a time-indexed programme guide.

pub mod classifier;
pub mod config;
pub mod epg;
pub mod error;
pub mod m3u_parser;
pub mod models;
pub mod playlist_index;
pub mod source;

pub use classifier::Classifier;
pub use config::AppConfig;
pub use epg::{EpgIndex, EpgParser};
pub use error::{EpgError, FetchError, FieldParseError, PlaylistError};
pub use m3u_parser::{M3uParser, PlaylistEntry};
pub use models::{ContentCategory, EpgStats, PlaylistStats};
pub use playlist_index::PlaylistIndex;
pub use source::FetchConfig;
