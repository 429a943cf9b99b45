//! Category listing, filtering and search over a parsed playlist

use std::collections::BTreeSet;

use crate::m3u_parser::PlaylistEntry;
use crate::models::{ContentCategory, PlaylistStats};

/// Label used for entries without a group title
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Classified playlist entries, one bucket per [`ContentCategory`].
///
/// Every query hands back owned copies; the buckets themselves are never exposed mutably.
#[derive(Debug, Clone, Default)]
pub struct PlaylistIndex {
    live: Vec<PlaylistEntry>,
    movies: Vec<PlaylistEntry>,
    series: Vec<PlaylistEntry>,
    epg_url: Option<String>,
}

impl PlaylistIndex {
    pub(crate) fn push(&mut self, entry: PlaylistEntry) {
        match entry.category {
            ContentCategory::Live => self.live.push(entry),
            ContentCategory::Movie => self.movies.push(entry),
            ContentCategory::Series => self.series.push(entry),
        }
    }

    pub(crate) fn set_epg_url(&mut self, url: Option<String>) {
        self.epg_url = url;
    }

    fn bucket(&self, bucket: ContentCategory) -> &[PlaylistEntry] {
        match bucket {
            ContentCategory::Live => &self.live,
            ContentCategory::Movie => &self.movies,
            ContentCategory::Series => &self.series,
        }
    }

    /// Guide URL advertised in the `#EXTM3U` header (`x-tvg-url` / `url-tvg`)
    pub fn epg_url(&self) -> Option<&str> {
        self.epg_url.as_deref()
    }

    /// Sorted distinct group titles in a bucket
    pub fn categories(&self, bucket: ContentCategory) -> Vec<String> {
        self.bucket(bucket)
            .iter()
            .map(|e| match e.group_title.as_deref() {
                Some(g) if !g.is_empty() => g,
                _ => UNCATEGORIZED,
            })
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Entries of a bucket, optionally restricted to one exact group title
    pub fn items_by_category(&self, bucket: ContentCategory, category: Option<&str>) -> Vec<PlaylistEntry> {
        let items = self.bucket(bucket);
        match category.filter(|c| !c.is_empty()) {
            Some(category) => items
                .iter()
                .filter(|e| e.group_title.as_deref() == Some(category))
                .cloned()
                .collect(),
            None => items.to_vec(),
        }
    }

    /// Case-insensitive title search; all buckets are searched live, movie, series
    pub fn search(&self, query: &str, bucket: Option<ContentCategory>) -> Vec<PlaylistEntry> {
        let query = query.to_lowercase();
        let buckets: &[ContentCategory] = match bucket {
            Some(ref b) => std::slice::from_ref(b),
            None => &ContentCategory::ALL,
        };

        buckets
            .iter()
            .flat_map(|b| self.bucket(*b))
            .filter(|e| e.title.to_lowercase().contains(&query))
            .cloned()
            .collect()
    }

    pub fn entries(&self, bucket: ContentCategory) -> Vec<PlaylistEntry> {
        self.bucket(bucket).to_vec()
    }

    pub fn stats(&self) -> PlaylistStats {
        PlaylistStats {
            live_count: self.live.len(),
            movie_count: self.movies.len(),
            series_count: self.series.len(),
            total: self.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.live.len() + self.movies.len() + self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
