//! Shared data models for playlist and guide catalogs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Content bucket a playlist entry is sorted into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentCategory {
    Live,
    Movie,
    Series,
}

impl ContentCategory {
    /// All buckets in listing order
    pub const ALL: [ContentCategory; 3] = [
        ContentCategory::Live,
        ContentCategory::Movie,
        ContentCategory::Series,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentCategory::Live => "live",
            ContentCategory::Movie => "movie",
            ContentCategory::Series => "series",
        }
    }
}

impl fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "live" => Ok(ContentCategory::Live),
            "movie" | "movies" => Ok(ContentCategory::Movie),
            "series" => Ok(ContentCategory::Series),
            other => Err(format!("unknown content type: {}", other)),
        }
    }
}

/// Bucket sizes of a parsed playlist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlaylistStats {
    pub live_count: usize,
    pub movie_count: usize,
    pub series_count: usize,
    pub total: usize,
}

/// Summary of a parsed guide
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EpgStats {
    pub channel_count: usize,
    pub programme_count: usize,
    pub category_count: usize,
    pub channels_with_programmes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_category_from_str() {
        assert_eq!("Live".parse::<ContentCategory>(), Ok(ContentCategory::Live));
        assert_eq!("movies".parse::<ContentCategory>(), Ok(ContentCategory::Movie));
        assert_eq!(" series ".parse::<ContentCategory>(), Ok(ContentCategory::Series));
        assert!("radio".parse::<ContentCategory>().is_err());
    }

    #[test]
    fn test_stats_serialize() {
        let stats = PlaylistStats { live_count: 1, movie_count: 2, series_count: 3, total: 6 };
        let json = serde_json::to_string(&stats).unwrap();
        assert_eq!(json, r#"{"live_count":1,"movie_count":2,"series_count":3,"total":6}"#);
    }
}
