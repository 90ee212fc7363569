//! Atom push payload parsing.
//!
//! Hub pushes are small Atom documents. The parser builds a lightweight
//! element tree with raw (prefix-preserving) names, then walks it with
//! explicit fallback chains: the feed container may be the root or one level
//! below it, otherwise the document itself (so a bare `<entry>` root counts);
//! `entry` may appear once or many times, and the identifier field may be
//! namespace-qualified or bare.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;
use tracing::{debug, trace};

use crate::domain::VideoId;

/// Element names accepted as the feed container, in priority order.
const FEED_NAMES: &[&str] = &["feed", "at:feed"];

/// Element names accepted as feed entries.
const ENTRY_NAMES: &[&str] = &["entry", "at:entry"];

/// Identifier field names, tried in order.
const VIDEO_ID_FIELDS: &[&str] = &["yt:videoId", "videoId"];

/// The payload is not well-formed XML.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("XML syntax error at byte {position}: {message}")]
    Syntax { position: u64, message: String },

    #[error("malformed document: {0}")]
    Malformed(String),
}

/// A parsed element: raw name, direct text content, and child elements.
#[derive(Debug, Default)]
struct Element {
    name: String,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn new(name: String) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    fn is_named(&self, candidates: &[&str]) -> bool {
        candidates.contains(&self.name.as_str())
    }

    fn first_child(&self, candidates: &[&str]) -> Option<&Element> {
        candidates
            .iter()
            .find_map(|name| self.children.iter().find(|c| c.name == *name))
    }

    /// Text value of a leaf element. Elements with children are not strings.
    fn leaf_text(&self) -> Option<&str> {
        self.children.is_empty().then_some(self.text.as_str())
    }
}

/// Extract the video identifiers of every entry in an Atom push payload.
///
/// Entries without a usable identifier are skipped. A document without a
/// recognizable feed container or entry, or a feed without entries, yields an
/// empty list.
pub fn parse_video_ids(payload: &str) -> Result<Vec<VideoId>, FeedError> {
    let root = parse_document(payload)?;

    let entries = feed_entries(&root);
    if entries.is_empty() {
        debug!(root = %root.name, "No feed entries in push payload");
        return Ok(Vec::new());
    }

    let ids: Vec<VideoId> = entries.into_iter().filter_map(entry_video_id).collect();

    trace!(count = ids.len(), "Extracted video ids from feed");
    Ok(ids)
}

/// Entries of the feed container: the root itself or a direct child of it.
/// Without one, the document is the container and the root may be the entry.
fn feed_entries(root: &Element) -> Vec<&Element> {
    let feed = if root.is_named(FEED_NAMES) {
        Some(root)
    } else {
        root.first_child(FEED_NAMES)
    };

    match feed {
        Some(feed) => feed
            .children
            .iter()
            .filter(|child| child.is_named(ENTRY_NAMES))
            .collect(),
        None if root.is_named(ENTRY_NAMES) => vec![root],
        None => Vec::new(),
    }
}

/// The first identifier field present decides; a blank or nested value skips
/// the entry rather than falling through to the next field.
fn entry_video_id(entry: &Element) -> Option<VideoId> {
    let id = entry
        .first_child(VIDEO_ID_FIELDS)
        .and_then(Element::leaf_text)
        .and_then(VideoId::parse);

    if id.is_none() {
        debug!("Skipping feed entry without a video id");
    }
    id
}

fn syntax_error(reader: &Reader<&[u8]>, message: impl std::fmt::Display) -> FeedError {
    FeedError::Syntax {
        position: reader.buffer_position() as u64,
        message: message.to_string(),
    }
}

/// Attributes must be well formed (`name="value"`, no duplicates).
fn check_attributes(reader: &Reader<&[u8]>, start: &BytesStart<'_>) -> Result<(), FeedError> {
    for attr in start.attributes().with_checks(true) {
        attr.map_err(|e| syntax_error(reader, e))?;
    }
    Ok(())
}

fn raw_name(name: &[u8]) -> String {
    String::from_utf8_lossy(name).into_owned()
}

/// Parse a whole document into its root element, enforcing well-formedness.
fn parse_document(payload: &str) -> Result<Element, FeedError> {
    let mut reader = Reader::from_str(payload);
    reader.config_mut().check_end_names = true;

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| syntax_error(&reader, e))?;

        match event {
            Event::Start(start) => {
                if stack.is_empty() && root.is_some() {
                    return Err(syntax_error(&reader, "content after the root element"));
                }
                check_attributes(&reader, &start)?;
                stack.push(Element::new(raw_name(start.name().as_ref())));
            }
            Event::Empty(start) => {
                check_attributes(&reader, &start)?;
                let element = Element::new(raw_name(start.name().as_ref()));
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None if root.is_none() => root = Some(element),
                    None => {
                        return Err(syntax_error(&reader, "content after the root element"));
                    }
                }
            }
            Event::End(end) => {
                let Some(element) = stack.pop() else {
                    return Err(syntax_error(&reader, "unexpected closing tag"));
                };
                if element.name.as_bytes() != end.name().as_ref() {
                    return Err(syntax_error(
                        &reader,
                        format!(
                            "expected </{}>, found </{}>",
                            element.name,
                            raw_name(end.name().as_ref())
                        ),
                    ));
                }
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| syntax_error(&reader, e))?;
                match stack.last_mut() {
                    Some(current) => current.text.push_str(&text),
                    None if text.trim().is_empty() => {}
                    None => return Err(syntax_error(&reader, "text outside the root element")),
                }
            }
            Event::CData(data) => match stack.last_mut() {
                Some(current) => current.text.push_str(&String::from_utf8_lossy(&data)),
                None => return Err(syntax_error(&reader, "CDATA outside the root element")),
            },
            Event::Eof => break,
            // Declarations, comments, processing instructions and doctypes carry no data.
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(FeedError::Malformed(format!(
            "unclosed element <{}>",
            open.name
        )));
    }

    root.ok_or_else(|| FeedError::Malformed("missing root element".to_string()))
}
