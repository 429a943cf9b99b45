//! M3U playlist parser
//!
//! Turns extended M3U text into classified [`PlaylistEntry`] records. Fetching
//! the text is left to [`crate::source`]; nothing here touches the network.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, trace, warn};
use serde::Serialize;

use crate::classifier::Classifier;
use crate::error::PlaylistError;
use crate::models::ContentCategory;
use crate::playlist_index::PlaylistIndex;

const HEADER_MARKER: &str = "#EXTM3U";
const DIRECTIVE_MARKER: &str = "#EXTINF:";
const UNKNOWN_TITLE: &str = "Unknown";

/// One playable playlist item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaylistEntry {
    pub title: String,
    pub url: String,
    /// Raw duration token, usually "-1" for streams
    pub duration: String,
    pub group_title: Option<String>,
    /// Remaining attributes, keys lower-cased with '-' replaced by '_'
    pub attributes: BTreeMap<String, String>,
    /// Assigned once when the entry is built
    pub category: ContentCategory,
}

impl PlaylistEntry {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn tvg_id(&self) -> Option<&str> {
        self.attribute("tvg_id")
    }

    pub fn tvg_name(&self) -> Option<&str> {
        self.attribute("tvg_name")
    }

    pub fn tvg_logo(&self) -> Option<&str> {
        self.attribute("tvg_logo")
    }
}

/// Metadata from an `#EXTINF` line waiting for its URL
#[derive(Debug, Clone, Default)]
struct PendingRecord {
    title: String,
    duration: String,
    group_title: Option<String>,
    attributes: BTreeMap<String, String>,
}

impl PendingRecord {
    fn finish(self, url: &str, classifier: &Classifier) -> PlaylistEntry {
        let category = classifier.classify(self.group_title.as_deref(), &self.title, url);
        PlaylistEntry {
            title: self.title,
            url: url.to_string(),
            duration: self.duration,
            group_title: self.group_title,
            attributes: self.attributes,
            category,
        }
    }
}

/// Owns the most recently parsed playlist
#[derive(Debug, Default)]
pub struct M3uParser {
    classifier: Classifier,
    index: Arc<PlaylistIndex>,
}

impl M3uParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_classifier(classifier: Classifier) -> Self {
        Self {
            classifier,
            index: Arc::default(),
        }
    }

    /// Parse `content`, replacing everything parsed before.
    ///
    /// On failure the previous playlist is discarded as well; the index is left empty.
    pub fn parse(&mut self, content: &str) -> Result<(), PlaylistError> {
        match parse_playlist(content, &self.classifier) {
            Ok(index) => {
                self.index = Arc::new(index);
                Ok(())
            }
            Err(e) => {
                warn!("{}", e);
                self.index = Arc::default();
                Err(e)
            }
        }
    }

    pub fn index(&self) -> &PlaylistIndex {
        &self.index
    }

    /// Shared handle to the current playlist; unaffected by later parses
    pub fn snapshot(&self) -> Arc<PlaylistIndex> {
        Arc::clone(&self.index)
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }
}

/// Parse M3U content into a fresh index
pub fn parse_playlist(content: &str, classifier: &Classifier) -> Result<PlaylistIndex, PlaylistError> {
    let content = content.trim_start_matches('\u{feff}');
    let mut lines = content.lines().map(str::trim).skip_while(|l| l.is_empty());

    let header = lines.next().ok_or(PlaylistError::MissingHeader)?;
    if !header.starts_with(HEADER_MARKER) {
        return Err(PlaylistError::MissingHeader);
    }

    let mut index = PlaylistIndex::default();
    index.set_epg_url(
        extract_header_attr(header, "x-tvg-url").or_else(|| extract_header_attr(header, "url-tvg")),
    );

    let mut pending: Option<PendingRecord> = None;
    let mut dropped = 0usize;

    for line in lines {
        if let Some(info) = line.strip_prefix(DIRECTIVE_MARKER) {
            if let Some(prev) = pending.replace(parse_directive(info)) {
                debug!("Directive for {:?} has no URL, discarding", prev.title);
            }
        } else if !line.is_empty() && !line.starts_with('#') {
            match pending.take() {
                Some(record) => index.push(record.finish(line, classifier)),
                None => {
                    trace!("Dropping URL line without directive: {}", line);
                    dropped += 1;
                }
            }
        }
    }

    let stats = index.stats();
    debug!(
        "Parsed playlist - Live: {}, Movies: {}, Series: {} ({} stray URL lines dropped)",
        stats.live_count, stats.movie_count, stats.series_count, dropped
    );
    Ok(index)
}

/// Extract attribute from #EXTM3U header line
fn extract_header_attr(line: &str, attr_name: &str) -> Option<String> {
    let search = format!("{}=\"", attr_name);
    // ASCII lower-casing keeps byte offsets aligned with `line`
    let start = line.to_ascii_lowercase().find(&search)?;
    let rest = &line[start + search.len()..];
    let end = rest.find('"')?;
    Some(rest[..end].to_string()).filter(|s| !s.is_empty())
}

/// Parse everything after `#EXTINF:`
fn parse_directive(info: &str) -> PendingRecord {
    let duration_end = info
        .find(|c: char| c == ',' || c.is_whitespace())
        .unwrap_or(info.len());
    let duration = info[..duration_end].to_string();

    // Title is whatever follows the last comma; attributes live before it
    let (attr_part, title) = match info.rfind(',') {
        Some(pos) => (&info[duration_end.min(pos)..pos], info[pos + 1..].trim()),
        None => (&info[duration_end..], ""),
    };
    let title = if title.is_empty() { UNKNOWN_TITLE } else { title };

    let mut attributes = BTreeMap::new();
    extract_attrs(attr_part, &mut attributes);
    let group_title = attributes.remove("group_title");

    PendingRecord {
        title: title.to_string(),
        duration,
        group_title,
        attributes,
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace('-', "_")
}

/// Extract `key="value"` / `key=value` pairs - tolerates stray quotes and commas
fn extract_attrs(info: &str, attrs: &mut BTreeMap<String, String>) {
    let mut chars = info.chars().peekable();

    while chars.peek().is_some() {
        // Skip separators
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() || c == ',' || c == '"' {
                chars.next();
            } else {
                break;
            }
        }

        // Collect key until '='; a separator first means a bare word
        let mut key = String::new();
        let mut has_value = false;
        while let Some(&c) = chars.peek() {
            if c == '=' {
                chars.next();
                has_value = true;
                break;
            }
            if c.is_whitespace() || c == ',' {
                break;
            }
            key.push(c);
            chars.next();
        }

        let key = normalize_key(&key);
        if !has_value || key.is_empty() {
            continue;
        }

        match chars.peek() {
            Some(&'"') => {
                chars.next();
                let mut value = String::new();
                while let Some(c) = chars.next() {
                    if c == '"' {
                        break;
                    }
                    if c == '\\' && chars.peek() == Some(&'"') {
                        chars.next();
                        value.push('"');
                        continue;
                    }
                    value.push(c);
                }
                attrs.insert(key, value);
            }
            Some(_) => {
                let mut value = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || c == ',' {
                        break;
                    }
                    value.push(c);
                    chars.next();
                }
                if !value.is_empty() {
                    attrs.insert(key, value);
                }
            }
            None => {}
        }
    }
}

#[cfg(test)]
#[path = "m3u_parser_tests.rs"]
mod tests;
