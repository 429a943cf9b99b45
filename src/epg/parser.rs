//! EPG (Electronic Program Guide) Parser
//! Streaming parser for XMLTV documents built on quick-xml events

use std::collections::BTreeMap;
use std::io::BufRead;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::Serialize;

use super::datetime::parse_xmltv_datetime;
use super::index::EpgIndex;
use crate::error::EpgError;

const DEFAULT_LANG: &str = "en";

/// Channel information from EPG
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Channel {
    pub id: String,
    pub display_names: Vec<String>,
    pub icons: Vec<String>,
    pub urls: Vec<String>,
}

impl Channel {
    /// First display name, falling back to the id
    pub fn name(&self) -> &str {
        self.display_names.first().map(String::as_str).unwrap_or(&self.id)
    }
}

/// Text with its `lang` attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalizedText {
    pub text: String,
    pub lang: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Rating {
    pub system: Option<String>,
    pub value: Option<String>,
    pub icons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EpisodeNum {
    pub system: Option<String>,
    pub value: String,
}

/// Credit roles recognised inside `<credits>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CreditRole {
    Director,
    Actor,
    Writer,
    Adapter,
    Producer,
    Composer,
    Editor,
    Presenter,
    Commentator,
    Guest,
}

impl CreditRole {
    pub const ALL: [CreditRole; 10] = [
        CreditRole::Director,
        CreditRole::Actor,
        CreditRole::Writer,
        CreditRole::Adapter,
        CreditRole::Producer,
        CreditRole::Composer,
        CreditRole::Editor,
        CreditRole::Presenter,
        CreditRole::Commentator,
        CreditRole::Guest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CreditRole::Director => "director",
            CreditRole::Actor => "actor",
            CreditRole::Writer => "writer",
            CreditRole::Adapter => "adapter",
            CreditRole::Producer => "producer",
            CreditRole::Composer => "composer",
            CreditRole::Editor => "editor",
            CreditRole::Presenter => "presenter",
            CreditRole::Commentator => "commentator",
            CreditRole::Guest => "guest",
        }
    }

    fn from_tag(tag: &[u8]) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str().as_bytes() == tag)
    }
}

/// A single TV programme
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Programme {
    /// Channel id this programme belongs to (not checked against the channel list)
    pub channel: String,
    /// Absent when the start attribute could not be parsed
    pub start: Option<DateTime<Utc>>,
    pub stop: Option<DateTime<Utc>>,
    pub titles: Vec<LocalizedText>,
    pub sub_titles: Vec<LocalizedText>,
    pub descriptions: Vec<LocalizedText>,
    pub categories: Vec<String>,
    pub countries: Vec<String>,
    pub languages: Vec<String>,
    pub icons: Vec<String>,
    pub ratings: Vec<Rating>,
    /// Only roles with at least one person are present
    pub credits: BTreeMap<CreditRole, Vec<String>>,
    pub episode_nums: Vec<EpisodeNum>,
    /// Element attributes other than channel/start/stop
    pub attributes: BTreeMap<String, String>,
}

impl Programme {
    pub fn title(&self) -> Option<&str> {
        self.titles.first().map(|t| t.text.as_str())
    }

    pub fn description(&self) -> Option<&str> {
        self.descriptions.first().map(|t| t.text.as_str())
    }

    /// Episode label, e.g. "S01E05" for an `xmltv_ns` value of "0.4."
    pub fn episode_label(&self) -> Option<String> {
        if let Some(ns) = self
            .episode_nums
            .iter()
            .find(|e| e.system.as_deref() == Some("xmltv_ns"))
        {
            return Some(format_episode(&ns.value));
        }
        self.episode_nums.first().map(|e| e.value.clone())
    }
}

/// Owns the most recently parsed guide
#[derive(Debug, Default)]
pub struct EpgParser {
    index: Arc<EpgIndex>,
}

impl EpgParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an XMLTV document, replacing everything parsed before.
    ///
    /// The previous guide is dropped before parsing starts, so a failure leaves it empty.
    pub fn parse(&mut self, xml: &str) -> Result<(), EpgError> {
        self.parse_reader(xml.as_bytes())
    }

    /// Same as [`EpgParser::parse`] but streams from any buffered reader
    pub fn parse_reader<R: BufRead>(&mut self, reader: R) -> Result<(), EpgError> {
        self.index = Arc::default();
        match parse_document(reader) {
            Ok(index) => {
                self.index = Arc::new(index);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to parse XMLTV: {}", e);
                Err(e)
            }
        }
    }

    pub fn index(&self) -> &EpgIndex {
        &self.index
    }

    /// Shared handle to the current guide; unaffected by later parses
    pub fn snapshot(&self) -> Arc<EpgIndex> {
        Arc::clone(&self.index)
    }
}

/// Which text-bearing child is being collected
#[derive(Debug, Clone, Copy, PartialEq)]
enum TextTarget {
    DisplayName,
    ChannelUrl,
    Title,
    SubTitle,
    Desc,
    Category,
    Country,
    Language,
    EpisodeNum,
    RatingValue,
    Credit(CreditRole),
}

/// Text capture in progress
struct Capture {
    target: TextTarget,
    /// Depth of the capturing element (text is only taken directly inside it)
    depth: usize,
    lang: Option<String>,
    system: Option<String>,
    text: String,
}

/// Walker state while inside the root element
#[derive(Default)]
struct Walker {
    depth: usize,
    saw_root: bool,
    channel: Option<Channel>,
    programme: Option<Programme>,
    rating: Option<Rating>,
    in_credits: bool,
    capture: Option<Capture>,
    skipped_channels: usize,
    skipped_programmes: usize,
}

/// Parse an XMLTV document into a fresh index
pub fn parse_document<R: BufRead>(reader: R) -> Result<EpgIndex, EpgError> {
    let mut xml_reader = Reader::from_reader(reader);
    // Entity references arrive as separate events; trimming each piece would eat the
    // spaces around them, so text is trimmed once per element instead
    xml_reader.config_mut().trim_text(false);

    let mut index = EpgIndex::default();
    let mut walker = Walker::default();
    let mut buf = Vec::with_capacity(8192);

    loop {
        let position = xml_reader.buffer_position() as u64;
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                walker.depth += 1;
                walker.open(e)?;
            }
            Ok(Event::Empty(ref e)) => {
                walker.depth += 1;
                walker.open(e)?;
                walker.close(e.name().as_ref(), &mut index);
                walker.depth -= 1;
            }
            Ok(Event::End(ref e)) => {
                walker.close(e.name().as_ref(), &mut index);
                walker.depth = walker.depth.saturating_sub(1);
            }
            Ok(Event::Text(ref e)) => {
                let text = std::str::from_utf8(e.as_ref())
                    .map_err(|err| EpgError::Traversal(format!("text is not UTF-8: {}", err)))?;
                walker.push_text(&decode_xml_entities(text));
            }
            Ok(Event::CData(ref e)) => {
                let text = std::str::from_utf8(e.as_ref())
                    .map_err(|err| EpgError::Traversal(format!("CDATA is not UTF-8: {}", err)))?;
                walker.push_text(text);
            }
            Ok(Event::GeneralRef(ref e)) => {
                let name = std::str::from_utf8(e.as_ref())
                    .map_err(|err| EpgError::Traversal(format!("entity is not UTF-8: {}", err)))?;
                walker.push_text(&decode_xml_entities(&format!("&{};", name)));
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(EpgError::MalformedXml {
                    position,
                    message: e.to_string(),
                });
            }
            _ => {}
        }
        buf.clear();
    }

    let position = xml_reader.buffer_position() as u64;
    if !walker.saw_root {
        return Err(EpgError::MalformedXml {
            position,
            message: "no root element found".to_string(),
        });
    }
    if walker.depth != 0 {
        return Err(EpgError::MalformedXml {
            position,
            message: format!("{} unclosed element(s) at end of document", walker.depth),
        });
    }

    debug!(
        "Parsed XMLTV - {} channels, {} programmes (skipped {} channels, {} programmes)",
        index.channel_count(),
        index.programme_count(),
        walker.skipped_channels,
        walker.skipped_programmes
    );
    Ok(index)
}

impl Walker {
    /// Handle an opening tag; `self.depth` already counts it (root = 1)
    fn open(&mut self, e: &BytesStart) -> Result<(), EpgError> {
        let name = e.name();
        let name = name.as_ref();

        match self.depth {
            1 => self.saw_root = true,
            2 => match name {
                b"channel" => {
                    match get_attribute(e, b"id")?.filter(|id| !id.is_empty()) {
                        Some(id) => {
                            self.channel = Some(Channel {
                                id,
                                ..Channel::default()
                            })
                        }
                        None => self.skipped_channels += 1,
                    }
                }
                b"programme" => self.programme = self.open_programme(e)?,
                _ => {}
            },
            3 if self.channel.is_some() => match name {
                b"display-name" => self.begin(TextTarget::DisplayName, e)?,
                b"url" => self.begin(TextTarget::ChannelUrl, e)?,
                b"icon" => {
                    if let (Some(src), Some(channel)) = (get_attribute(e, b"src")?, self.channel.as_mut()) {
                        channel.icons.push(src);
                    }
                }
                _ => {}
            },
            3 if self.programme.is_some() => match name {
                b"title" => self.begin(TextTarget::Title, e)?,
                b"sub-title" => self.begin(TextTarget::SubTitle, e)?,
                b"desc" => self.begin(TextTarget::Desc, e)?,
                b"category" => self.begin(TextTarget::Category, e)?,
                b"country" => self.begin(TextTarget::Country, e)?,
                b"language" => self.begin(TextTarget::Language, e)?,
                b"episode-num" => self.begin(TextTarget::EpisodeNum, e)?,
                b"icon" => {
                    if let (Some(src), Some(prog)) = (get_attribute(e, b"src")?, self.programme.as_mut()) {
                        prog.icons.push(src);
                    }
                }
                b"rating" => {
                    self.rating = Some(Rating {
                        system: get_attribute(e, b"system")?,
                        ..Rating::default()
                    });
                }
                b"credits" => self.in_credits = true,
                _ => {}
            },
            4 if self.rating.is_some() => match name {
                b"value" => self.begin(TextTarget::RatingValue, e)?,
                b"icon" => {
                    if let (Some(src), Some(rating)) = (get_attribute(e, b"src")?, self.rating.as_mut()) {
                        rating.icons.push(src);
                    }
                }
                _ => {}
            },
            4 if self.in_credits => {
                if let Some(role) = CreditRole::from_tag(name) {
                    self.begin(TextTarget::Credit(role), e)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn open_programme(&mut self, e: &BytesStart) -> Result<Option<Programme>, EpgError> {
        let mut programme = Programme::default();
        let mut raw_start = None;
        let mut raw_stop = None;

        for attr in e.attributes() {
            let attr = attr.map_err(|err| EpgError::Traversal(err.to_string()))?;
            let key = std::str::from_utf8(attr.key.as_ref())
                .map_err(|err| EpgError::Traversal(err.to_string()))?;
            let value = attr_value(&attr.value)?;
            match key {
                "channel" => programme.channel = value,
                "start" => raw_start = Some(value),
                "stop" => raw_stop = Some(value),
                _ => {
                    programme.attributes.insert(key.to_string(), value);
                }
            }
        }

        let raw_start = match raw_start.filter(|s| !s.is_empty()) {
            Some(s) if !programme.channel.is_empty() => s,
            _ => {
                self.skipped_programmes += 1;
                return Ok(None);
            }
        };

        programme.start = parse_xmltv_datetime(&raw_start);
        programme.stop = raw_stop.as_deref().and_then(parse_xmltv_datetime);
        Ok(Some(programme))
    }

    fn begin(&mut self, target: TextTarget, e: &BytesStart) -> Result<(), EpgError> {
        let (lang, system) = match target {
            TextTarget::Title | TextTarget::SubTitle | TextTarget::Desc => (get_attribute(e, b"lang")?, None),
            TextTarget::EpisodeNum => (None, get_attribute(e, b"system")?),
            _ => (None, None),
        };
        self.capture = Some(Capture {
            target,
            depth: self.depth,
            lang,
            system,
            text: String::new(),
        });
        Ok(())
    }

    fn push_text(&mut self, text: &str) {
        if let Some(capture) = self.capture.as_mut() {
            if capture.depth == self.depth {
                capture.text.push_str(text);
            }
        }
    }

    /// Handle a closing tag; `self.depth` still counts it
    fn close(&mut self, name: &[u8], index: &mut EpgIndex) {
        if self
            .capture
            .as_ref()
            .is_some_and(|c| c.depth == self.depth)
        {
            if let Some(capture) = self.capture.take() {
                self.finish_capture(capture);
            }
            return;
        }

        match (self.depth, name) {
            (2, b"channel") => {
                if let Some(channel) = self.channel.take() {
                    index.insert_channel(channel);
                }
            }
            (2, b"programme") => {
                if let Some(programme) = self.programme.take() {
                    index.push_programme(programme);
                }
                self.rating = None;
                self.in_credits = false;
            }
            (3, b"rating") => {
                if let (Some(rating), Some(prog)) = (self.rating.take(), self.programme.as_mut()) {
                    prog.ratings.push(rating);
                }
            }
            (3, b"credits") => self.in_credits = false,
            _ => {}
        }
    }

    fn finish_capture(&mut self, capture: Capture) {
        let text = capture.text.trim().to_string();
        if text.is_empty() {
            return;
        }
        let localized = |text: String| LocalizedText {
            text,
            lang: capture.lang.clone().unwrap_or_else(|| DEFAULT_LANG.to_string()),
        };

        match capture.target {
            TextTarget::DisplayName | TextTarget::ChannelUrl => {
                if let Some(channel) = self.channel.as_mut() {
                    if capture.target == TextTarget::DisplayName {
                        channel.display_names.push(text);
                    } else {
                        channel.urls.push(text);
                    }
                }
            }
            TextTarget::RatingValue => {
                if let Some(rating) = self.rating.as_mut() {
                    if rating.value.is_none() {
                        rating.value = Some(text);
                    }
                }
            }
            target => {
                let Some(prog) = self.programme.as_mut() else {
                    return;
                };
                match target {
                    TextTarget::Title => prog.titles.push(localized(text)),
                    TextTarget::SubTitle => prog.sub_titles.push(localized(text)),
                    TextTarget::Desc => prog.descriptions.push(localized(text)),
                    TextTarget::Category => prog.categories.push(text),
                    TextTarget::Country => prog.countries.push(text),
                    TextTarget::Language => prog.languages.push(text),
                    TextTarget::EpisodeNum => prog.episode_nums.push(EpisodeNum {
                        system: capture.system.clone(),
                        value: text,
                    }),
                    TextTarget::Credit(role) => prog.credits.entry(role).or_default().push(text),
                    TextTarget::DisplayName | TextTarget::ChannelUrl | TextTarget::RatingValue => {}
                }
            }
        }
    }
}

/// Get attribute value from XML element
fn get_attribute(e: &BytesStart, name: &[u8]) -> Result<Option<String>, EpgError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| EpgError::Traversal(err.to_string()))?;
        if attr.key.as_ref() == name {
            return attr_value(&attr.value).map(Some);
        }
    }
    Ok(None)
}

fn attr_value(raw: &[u8]) -> Result<String, EpgError> {
    let raw = std::str::from_utf8(raw)
        .map_err(|err| EpgError::Traversal(format!("attribute is not UTF-8: {}", err)))?;
    Ok(decode_xml_entities(raw))
}

/// Decode XML entities back to normal characters; unknown entities are left as-is
fn decode_xml_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        result.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest[1..].find(';').filter(|&end| end <= 10).and_then(|end| {
            let entity = &rest[1..end + 1];
            let c = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                _ => {
                    let num = entity.strip_prefix('#')?;
                    let code = match num.strip_prefix(['x', 'X']) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                        None => num.parse::<u32>().ok()?,
                    };
                    char::from_u32(code)
                }
            };
            c.map(|c| (c, end + 2))
        });

        match decoded {
            Some((c, consumed)) => {
                result.push(c);
                rest = &rest[consumed..];
            }
            None => {
                result.push('&');
                rest = &rest[1..];
            }
        }
    }
    result.push_str(rest);
    result
}

/// Format episode number (e.g., "0.4." -> "S01E05")
fn format_episode(episode: &str) -> String {
    let episode = episode.trim();

    // XMLTV format: "season.episode.part" (0-indexed, "x/y" totals allowed)
    let parts: Vec<&str> = episode.split('.').collect();

    if parts.len() >= 2 {
        let index_of = |part: &str| -> i32 {
            part.split('/').next().unwrap_or("").trim().parse().unwrap_or(-1) + 1
        };
        let season = index_of(parts[0]);
        let ep = index_of(parts[1]);

        if season > 0 && ep > 0 {
            return format!("S{:02}E{:02}", season, ep);
        }
    }

    episode.to_string()
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
