//! Heuristic Live / Movie / Series classification for playlist entries
//!
//! Classification is an ordered table of `(predicate -> category)` rules.
//! The first matching rule wins; entries matching nothing are Live.
//! Every movie rule sits before every series rule in the built-in table, so a
//! group title carrying both kinds of keyword resolves to Movie.

use crate::models::ContentCategory;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EPISODE_PATTERN: Regex =
        Regex::new(r"(?i)s\d+e\d+|season\s+\d+|episode\s+\d+").unwrap();
}

const MOVIE_GROUP_KEYWORDS: &[&str] = &[
    "movie",
    "film",
    "cinema",
    "vod",
    "on demand",
    "hollywood",
    "bollywood",
    "action",
    "comedy",
    "horror",
    "thriller",
    "sci-fi",
    "animation",
    "documentary",
    "adventure",
];

const MOVIE_URL_MARKERS: &[&str] = &["/movie/", ".mp4", ".mkv"];

const SERIES_GROUP_KEYWORDS: &[&str] = &[
    "series",
    "tv",
    "show",
    "season",
    "episode",
    "drama series",
    "comedy series",
    "reality",
    "documentary series",
];

const SERIES_URL_MARKERS: &[&str] = &["/series/"];

/// The fields a rule may look at
#[derive(Debug, Clone, Copy)]
pub struct Subject<'a> {
    pub group_title: Option<&'a str>,
    pub title: &'a str,
    pub url: &'a str,
}

/// A single test against an entry
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Lower-cased group title contains any keyword (keywords stored lower-case)
    GroupContainsAny(Vec<String>),
    /// Title matches the pattern
    TitleMatches(Regex),
    /// URL contains any marker
    UrlContainsAny(Vec<String>),
}

impl Predicate {
    pub fn group_contains_any(keywords: &[&str]) -> Self {
        Predicate::GroupContainsAny(keywords.iter().map(|k| k.to_lowercase()).collect())
    }

    pub fn url_contains_any(markers: &[&str]) -> Self {
        Predicate::UrlContainsAny(markers.iter().map(|m| m.to_string()).collect())
    }

    pub fn matches(&self, subject: &Subject<'_>) -> bool {
        match self {
            Predicate::GroupContainsAny(keywords) => {
                let group = subject.group_title.unwrap_or_default().to_lowercase();
                keywords.iter().any(|k| group.contains(k.as_str()))
            }
            Predicate::TitleMatches(pattern) => pattern.is_match(subject.title),
            Predicate::UrlContainsAny(markers) => {
                markers.iter().any(|m| subject.url.contains(m.as_str()))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub predicate: Predicate,
    pub category: ContentCategory,
}

impl Rule {
    pub fn new(predicate: Predicate, category: ContentCategory) -> Self {
        Self { predicate, category }
    }
}

/// Ordered rule table; first match wins
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<Rule>,
    fallback: ContentCategory,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(vec![
            Rule::new(Predicate::group_contains_any(MOVIE_GROUP_KEYWORDS), ContentCategory::Movie),
            Rule::new(Predicate::url_contains_any(MOVIE_URL_MARKERS), ContentCategory::Movie),
            Rule::new(Predicate::group_contains_any(SERIES_GROUP_KEYWORDS), ContentCategory::Series),
            Rule::new(Predicate::TitleMatches(EPISODE_PATTERN.clone()), ContentCategory::Series),
            Rule::new(Predicate::url_contains_any(SERIES_URL_MARKERS), ContentCategory::Series),
        ])
    }
}

impl Classifier {
    /// Build a classifier from an explicit rule table, evaluated in order
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules,
            fallback: ContentCategory::Live,
        }
    }

    /// Built-in table with additional group keywords appended to the first
    /// group-keyword rule of each category. Rule order is unchanged.
    pub fn with_extra_keywords(movie: &[String], series: &[String]) -> Self {
        let mut classifier = Self::default();
        classifier.extend_group_keywords(ContentCategory::Movie, movie);
        classifier.extend_group_keywords(ContentCategory::Series, series);
        classifier
    }

    fn extend_group_keywords(&mut self, category: ContentCategory, extra: &[String]) {
        if extra.is_empty() {
            return;
        }
        let target = self.rules.iter_mut().find(|r| {
            r.category == category && matches!(r.predicate, Predicate::GroupContainsAny(_))
        });
        if let Some(Rule {
            predicate: Predicate::GroupContainsAny(keywords),
            ..
        }) = target
        {
            keywords.extend(
                extra
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty()),
            );
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn classify(&self, group_title: Option<&str>, title: &str, url: &str) -> ContentCategory {
        let subject = Subject { group_title, title, url };
        self.rules
            .iter()
            .find(|rule| rule.predicate.matches(&subject))
            .map(|rule| rule.category)
            .unwrap_or(self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(group: Option<&str>, title: &str, url: &str) -> ContentCategory {
        Classifier::default().classify(group, title, url)
    }

    #[test]
    fn test_movie_by_group_keyword() {
        assert_eq!(classify(Some("Action Movies"), "Die Hard", "http://x/1.ts"), ContentCategory::Movie);
        assert_eq!(classify(Some("BOLLYWOOD"), "Film", "http://x/1.ts"), ContentCategory::Movie);
    }

    #[test]
    fn test_movie_by_url() {
        assert_eq!(classify(None, "Something", "http://x/movie/u/p/1.ts"), ContentCategory::Movie);
        assert_eq!(classify(None, "Something", "http://x/1.mkv"), ContentCategory::Movie);
        assert_eq!(classify(Some("News"), "Something", "http://x/1.mp4"), ContentCategory::Movie);
    }

    #[test]
    fn test_series_by_group_title_and_url() {
        assert_eq!(classify(Some("Reality"), "Big Brother", "http://x/1.ts"), ContentCategory::Series);
        assert_eq!(classify(None, "Show", "http://x/series/u/p/1.ts"), ContentCategory::Series);
    }

    #[test]
    fn test_series_by_episode_pattern() {
        assert_eq!(classify(Some("Drama"), "Show S01E02", "http://x/2.ts"), ContentCategory::Series);
        assert_eq!(classify(None, "Lost Season 3", "http://x/3.ts"), ContentCategory::Series);
        assert_eq!(classify(None, "Lost EPISODE 12", "http://x/4.ts"), ContentCategory::Series);
    }

    #[test]
    fn test_movie_wins_over_series() {
        // "comedy" is a movie keyword, "series" a series keyword
        assert_eq!(classify(Some("Comedy Series"), "Friends", "http://x/1.ts"), ContentCategory::Movie);
        // Movie URL beats an episode-shaped title
        assert_eq!(classify(None, "Show S01E01", "http://x/1.mp4"), ContentCategory::Movie);
    }

    #[test]
    fn test_default_live() {
        assert_eq!(classify(Some("News"), "CNN", "http://x/live/1.ts"), ContentCategory::Live);
        assert_eq!(classify(None, "Unknown", "http://x/1.ts"), ContentCategory::Live);
    }

    #[test]
    fn test_custom_rule_table() {
        let classifier = Classifier::new(vec![Rule::new(
            Predicate::group_contains_any(&["Kids"]),
            ContentCategory::Series,
        )]);
        assert_eq!(classifier.classify(Some("kids zone"), "Cartoons", "http://x/1.mp4"), ContentCategory::Series);
        assert_eq!(classifier.classify(Some("Action"), "Die Hard", "http://x/1.mp4"), ContentCategory::Live);
    }

    #[test]
    fn test_extra_keywords() {
        let classifier = Classifier::with_extra_keywords(&["Peliculas".to_string()], &["Novelas".to_string()]);
        assert_eq!(classifier.classify(Some("ES | Peliculas"), "El Orfanato", "http://x/1.ts"), ContentCategory::Movie);
        assert_eq!(classifier.classify(Some("Novelas"), "La Reina", "http://x/2.ts"), ContentCategory::Series);
        assert_eq!(classifier.rules().len(), Classifier::default().rules().len());
    }
}
