//! Time-range, "now playing" and search queries over a parsed guide

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};

use super::parser::{Channel, Programme};
use crate::models::EpgStats;

/// Programme fields [`EpgIndex::search`] can look in, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Titles,
    Descriptions,
    Categories,
}

impl SearchField {
    pub const DEFAULT: [SearchField; 3] = [
        SearchField::Titles,
        SearchField::Descriptions,
        SearchField::Categories,
    ];
}

/// Parsed channels and programmes.
///
/// Programmes are kept in document order. Neither channel id uniqueness nor
/// programme overlap is checked; a repeated channel id replaces the earlier
/// definition in place.
#[derive(Debug, Clone, Default)]
pub struct EpgIndex {
    channels: Vec<Channel>,
    channel_positions: HashMap<String, usize>,
    programmes: Vec<Programme>,
}

impl EpgIndex {
    pub(crate) fn insert_channel(&mut self, channel: Channel) {
        match self.channel_positions.get(&channel.id) {
            Some(&pos) => self.channels[pos] = channel,
            None => {
                self.channel_positions.insert(channel.id.clone(), self.channels.len());
                self.channels.push(channel);
            }
        }
    }

    pub(crate) fn push_programme(&mut self, programme: Programme) {
        self.programmes.push(programme);
    }

    pub fn channel(&self, channel_id: &str) -> Option<Channel> {
        self.channel_positions
            .get(channel_id)
            .map(|&pos| self.channels[pos].clone())
    }

    pub fn channels(&self) -> Vec<Channel> {
        self.channels.clone()
    }

    pub fn programmes(&self) -> Vec<Programme> {
        self.programmes.clone()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn programme_count(&self) -> usize {
        self.programmes.len()
    }

    /// Programmes of a channel whose start lies within the optional bounds,
    /// sorted by start. The stop time is not consulted. A programme without a
    /// parsed start sorts first and is excluded by any start bound.
    pub fn programmes_for_channel(
        &self,
        channel_id: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Vec<Programme> {
        let mut result: Vec<Programme> = self
            .programmes
            .iter()
            .filter(|p| p.channel == channel_id)
            .filter(|p| start.map_or(true, |bound| p.start.is_some_and(|s| s >= bound)))
            .filter(|p| end.map_or(true, |bound| p.start.map_or(true, |s| s <= bound)))
            .cloned()
            .collect();
        // Option orders None first, which gives the minimal sentinel for free
        result.sort_by_key(|p| p.start);
        result
    }

    /// Programme airing on a channel at `at` (default: now).
    ///
    /// Returns the first match in document order, which under overlapping input is
    /// not necessarily the tightest fit.
    pub fn current_programme(&self, channel_id: &str, at: Option<DateTime<Utc>>) -> Option<Programme> {
        let at = at.unwrap_or_else(Utc::now);
        self.programmes
            .iter()
            .find(|p| {
                p.channel == channel_id
                    && p.start.is_some_and(|s| s <= at)
                    && p.stop.map_or(true, |stop| at <= stop)
            })
            .cloned()
    }

    /// Earliest programme on a channel starting after `at` (default: now)
    pub fn next_programme(&self, channel_id: &str, at: Option<DateTime<Utc>>) -> Option<Programme> {
        let at = at.unwrap_or_else(Utc::now);
        self.programmes
            .iter()
            .filter(|p| p.channel == channel_id && p.start.is_some_and(|s| s > at))
            .min_by_key(|p| p.start)
            .cloned()
    }

    pub fn programmes_by_category(&self, category: &str) -> Vec<Programme> {
        self.programmes
            .iter()
            .filter(|p| p.categories.iter().any(|c| c == category))
            .cloned()
            .collect()
    }

    /// Case-insensitive substring search. `fields` defaults to titles,
    /// descriptions and categories; an empty slice also means the default.
    pub fn search(&self, query: &str, fields: Option<&[SearchField]>) -> Vec<Programme> {
        let query = query.to_lowercase();
        let fields = match fields {
            Some(f) if !f.is_empty() => f,
            _ => &SearchField::DEFAULT[..],
        };
        // Priority order is fixed regardless of how the caller lists the fields
        let wanted: Vec<SearchField> = SearchField::DEFAULT
            .into_iter()
            .filter(|f| fields.contains(f))
            .collect();

        self.programmes
            .iter()
            .filter(|p| wanted.iter().any(|field| field_matches(p, *field, &query)))
            .cloned()
            .collect()
    }

    /// Sorted distinct categories across all programmes
    pub fn categories(&self) -> Vec<String> {
        self.programmes
            .iter()
            .flat_map(|p| p.categories.iter())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> EpgStats {
        EpgStats {
            channel_count: self.channels.len(),
            programme_count: self.programmes.len(),
            category_count: self.categories().len(),
            channels_with_programmes: self
                .programmes
                .iter()
                .map(|p| p.channel.as_str())
                .collect::<HashSet<_>>()
                .len(),
        }
    }
}

fn field_matches(programme: &Programme, field: SearchField, query: &str) -> bool {
    match field {
        SearchField::Titles => programme
            .titles
            .iter()
            .any(|t| t.text.to_lowercase().contains(query)),
        SearchField::Descriptions => programme
            .descriptions
            .iter()
            .any(|d| d.text.to_lowercase().contains(query)),
        SearchField::Categories => programme
            .categories
            .iter()
            .any(|c| c.to_lowercase().contains(query)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epg::parse_document;
    use chrono::TimeZone;

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, m, 0).unwrap()
    }

    const GUIDE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<tv>
  <channel id="bbc1"><display-name>BBC One</display-name></channel>
  <channel id="itv"><display-name>ITV</display-name></channel>
  <programme start="20240115140000 +0000" stop="20240115150000 +0000" channel="bbc1">
    <title>Afternoon Film</title>
    <category>Movie</category>
  </programme>
  <programme start="20240115120000 +0000" stop="20240115130000 +0000" channel="bbc1">
    <title>News at Noon</title>
    <desc>Daily film review and news</desc>
    <category>News</category>
  </programme>
  <programme start="20240115130000 +0000" stop="20240115140000 +0000" channel="bbc1">
    <title>Quiz Hour</title>
    <category>Game Show</category>
  </programme>
  <programme start="20240115120000 +0000" channel="itv">
    <title>Open Ended</title>
    <category>News</category>
  </programme>
  <programme start="garbage" stop="20240115110000 +0000" channel="bbc1">
    <title>Unknown Start</title>
  </programme>
  <programme start="20240115120000 +0000" stop="20240115123000 +0000" channel="orphan">
    <title>No Channel Element</title>
    <category>Film</category>
  </programme>
</tv>"#;

    fn index() -> EpgIndex {
        parse_document(GUIDE.as_bytes()).unwrap()
    }

    fn titles(programmes: &[Programme]) -> Vec<&str> {
        programmes.iter().map(|p| p.title().unwrap_or_default()).collect()
    }

    #[test]
    fn test_programmes_for_channel_sorted() {
        let idx = index();
        let progs = idx.programmes_for_channel("bbc1", None, None);
        assert_eq!(
            titles(&progs),
            vec!["Unknown Start", "News at Noon", "Quiz Hour", "Afternoon Film"]
        );
        assert!(progs.windows(2).all(|w| w[0].start <= w[1].start));
    }

    #[test]
    fn test_programmes_for_channel_bounds_use_start_only() {
        let idx = index();
        // Quiz Hour runs until 14:00 but starts after 12:30
        let progs = idx.programmes_for_channel("bbc1", Some(utc(12, 30)), Some(utc(14, 0)));
        assert_eq!(titles(&progs), vec!["Quiz Hour", "Afternoon Film"]);

        let progs = idx.programmes_for_channel("bbc1", None, Some(utc(12, 0)));
        assert_eq!(titles(&progs), vec!["Unknown Start", "News at Noon"]);

        assert!(idx.programmes_for_channel("nope", None, None).is_empty());
    }

    #[test]
    fn test_current_programme() {
        let idx = index();
        assert_eq!(
            idx.current_programme("bbc1", Some(utc(12, 30))).unwrap().title(),
            Some("News at Noon")
        );
        // Boundaries are inclusive on both ends; first in document order wins
        assert_eq!(
            idx.current_programme("bbc1", Some(utc(14, 0))).unwrap().title(),
            Some("Afternoon Film")
        );
        assert_eq!(
            idx.current_programme("itv", Some(utc(23, 0))).unwrap().title(),
            Some("Open Ended")
        );
    }

    #[test]
    fn test_current_programme_none_outside_intervals() {
        let idx = index();
        assert!(idx.current_programme("bbc1", Some(utc(11, 59))).is_none());
        assert!(idx.current_programme("bbc1", Some(utc(15, 1))).is_none());
        assert!(idx.current_programme("itv", Some(utc(11, 0))).is_none());
        assert!(idx.current_programme("missing", Some(utc(12, 30))).is_none());
    }

    #[test]
    fn test_current_programme_first_match_under_overlap() {
        let xml = r#"<tv>
  <programme start="20240115120000" stop="20240115180000" channel="c"><title>Long</title></programme>
  <programme start="20240115130000" stop="20240115133000" channel="c"><title>Short</title></programme>
</tv>"#;
        let idx = parse_document(xml.as_bytes()).unwrap();
        assert_eq!(
            idx.current_programme("c", Some(utc(13, 15))).unwrap().title(),
            Some("Long")
        );
    }

    #[test]
    fn test_next_programme() {
        let idx = index();
        assert_eq!(
            idx.next_programme("bbc1", Some(utc(12, 30))).unwrap().title(),
            Some("Quiz Hour")
        );
        assert!(idx.next_programme("bbc1", Some(utc(14, 0))).is_none());
    }

    #[test]
    fn test_programmes_by_category() {
        let idx = index();
        assert_eq!(titles(&idx.programmes_by_category("News")), vec!["News at Noon", "Open Ended"]);
        assert!(idx.programmes_by_category("news").is_empty());
    }

    #[test]
    fn test_search_default_fields() {
        let idx = index();
        let found = idx.search("FILM", None);
        assert_eq!(
            titles(&found),
            vec!["Afternoon Film", "News at Noon", "No Channel Element"]
        );
    }

    #[test]
    fn test_search_restricted_fields() {
        let idx = index();
        assert_eq!(titles(&idx.search("film", Some(&[SearchField::Titles]))), vec!["Afternoon Film"]);
        assert_eq!(
            titles(&idx.search("film", Some(&[SearchField::Categories]))),
            vec!["No Channel Element"]
        );
        assert_eq!(idx.search("film", Some(&[])).len(), 3);
        assert!(idx.search("zzz", None).is_empty());
    }

    #[test]
    fn test_categories_derived() {
        let idx = index();
        assert_eq!(idx.categories(), vec!["Film", "Game Show", "Movie", "News"]);
        assert!(EpgIndex::default().categories().is_empty());
    }

    #[test]
    fn test_stats() {
        let stats = index().stats();
        assert_eq!(
            stats,
            EpgStats {
                channel_count: 2,
                programme_count: 6,
                category_count: 4,
                channels_with_programmes: 3,
            }
        );
    }

    #[test]
    fn test_channel_lookup_and_duplicates() {
        let xml = r#"<tv>
  <channel id="a"><display-name>First</display-name></channel>
  <channel id="b"><display-name>Bee</display-name></channel>
  <channel id="a"><display-name>Second</display-name></channel>
</tv>"#;
        let idx = parse_document(xml.as_bytes()).unwrap();
        assert_eq!(idx.channel_count(), 2);
        assert_eq!(idx.channel("a").unwrap().name(), "Second");
        assert_eq!(idx.channels()[0].id, "a");
        assert!(idx.channel("zzz").is_none());
    }
}
