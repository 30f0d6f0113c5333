use chrono::{DateTime, FixedOffset, Utc};
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use std::collections::HashSet;

use super::error::ParseError;
use super::item::{stable_id, PressItem, PLACEHOLDER_TITLE, SOURCE_TAG};
use crate::util::{resolve_link, UrlValidationError};

/// Namespace of the RSS content module (`content:encoded`).
const CONTENT_NS: &[u8] = b"http://purl.org/rss/1.0/modules/content/";

// Element depths: <rss> (1) > <channel> (2) > <item> (3) > <title> etc. (4)
const ROOT_DEPTH: usize = 1;
const CHANNEL_DEPTH: usize = 2;
const ITEM_DEPTH: usize = 3;
const FIELD_DEPTH: usize = 4;

/// Parses RSS bytes into press items, using the current time for entries
/// without a usable `<pubDate>`.
///
/// See [`parse_feed_at`] for the full contract.
pub fn parse_feed(bytes: &[u8], base_url: &str) -> Result<Vec<PressItem>, ParseError> {
    parse_feed_at(bytes, base_url, Utc::now().fixed_offset())
}

/// Parses RSS bytes into press items.
///
/// The document must be well-formed XML whose root element has exactly one
/// `<channel>` child. Every `<item>` directly inside the channel is parsed
/// independently; an item that cannot be turned into a [`PressItem`] (its
/// link does not resolve to an absolute URL) is logged and skipped. Later
/// items whose id collides with an earlier one are dropped.
///
/// This is a pure transform: no I/O, no shared state. Entries without a
/// parsable publish date get `fallback_published`.
///
/// # Errors
///
/// - [`ParseError::Malformed`] for any XML syntax error, including an
///   unclosed document, text outside the root, or more than one channel
/// - [`ParseError::MissingChannel`] when the root has no `<channel>` child
/// - [`ParseError::EmptyFeed`] when no item survives
pub fn parse_feed_at(
    bytes: &[u8],
    base_url: &str,
    fallback_published: DateTime<FixedOffset>,
) -> Result<Vec<PressItem>, ParseError> {
    let raw_items = read_raw_items(bytes)?;
    let total = raw_items.len();

    let mut seen = HashSet::with_capacity(total);
    let mut items = Vec::with_capacity(total);
    let mut skipped = 0usize;

    for raw in raw_items {
        match build_item(raw, base_url, fallback_published) {
            Ok(item) => {
                if seen.insert(item.id.clone()) {
                    items.push(item);
                } else {
                    tracing::warn!(id = %item.id, "Dropping press item with duplicate id");
                    skipped += 1;
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Error parsing RSS item, skipping");
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        tracing::warn!(total = total, skipped = skipped, "Some feed items were skipped");
    }

    if items.is_empty() {
        return Err(ParseError::EmptyFeed);
    }

    Ok(items)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Description,
    ContentEncoded,
    PubDate,
    Category,
    Guid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Channel,
    Item,
    Field(Field),
    Other,
}

/// Text of one `<item>`, before any interpretation.
///
/// Single-valued fields keep their first occurrence.
#[derive(Debug, Default)]
struct RawItem {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    content_encoded: Option<String>,
    pub_date: Option<String>,
    categories: Vec<String>,
    guid: Option<String>,
}

impl RawItem {
    fn set(&mut self, field: Field, text: String) {
        let slot = match field {
            Field::Category => {
                self.categories.push(text);
                return;
            }
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Description => &mut self.description,
            Field::ContentEncoded => &mut self.content_encoded,
            Field::PubDate => &mut self.pub_date,
            Field::Guid => &mut self.guid,
        };
        if slot.is_none() {
            *slot = Some(text);
        }
    }
}

/// Tracks where the reader is in the document and collects raw items.
#[derive(Default)]
struct Walker {
    depth: usize,
    root_closed: bool,
    seen_root: bool,
    channels: usize,
    in_channel: bool,
    item: Option<RawItem>,
    field: Option<Field>,
    text: String,
    items: Vec<RawItem>,
}

impl Walker {
    fn open(&mut self, tag: Tag) -> Result<(), ParseError> {
        if self.depth == 0 {
            if self.root_closed {
                return Err(ParseError::Malformed("multiple root elements".into()));
            }
            self.seen_root = true;
        }
        self.depth += 1;

        match (self.depth, tag) {
            (CHANNEL_DEPTH, Tag::Channel) => {
                self.channels += 1;
                if self.channels > 1 {
                    return Err(ParseError::Malformed("more than one channel element".into()));
                }
                self.in_channel = true;
            }
            (ITEM_DEPTH, Tag::Item) if self.in_channel => {
                self.item = Some(RawItem::default());
            }
            (FIELD_DEPTH, Tag::Field(field)) if self.item.is_some() => {
                self.field = Some(field);
                self.text.clear();
            }
            _ => {}
        }
        Ok(())
    }

    fn close(&mut self) {
        match self.depth {
            FIELD_DEPTH => {
                if let (Some(field), Some(item)) = (self.field.take(), self.item.as_mut()) {
                    item.set(field, std::mem::take(&mut self.text));
                }
            }
            ITEM_DEPTH => {
                if let Some(item) = self.item.take() {
                    self.items.push(item);
                }
            }
            CHANNEL_DEPTH => self.in_channel = false,
            ROOT_DEPTH => self.root_closed = true,
            _ => {}
        }
        self.depth = self.depth.saturating_sub(1);
    }

    fn text(&mut self, chunk: &str) -> Result<(), ParseError> {
        if self.depth == 0 {
            if chunk.trim().is_empty() {
                return Ok(());
            }
            return Err(ParseError::Malformed("text outside the root element".into()));
        }
        if self.field.is_some() {
            self.text.push_str(chunk);
        }
        Ok(())
    }
}

fn classify(ns: ResolveResult<'_>, local: &[u8], qname: &[u8]) -> Tag {
    if local == b"encoded" {
        // Accept the conventional prefix even when the feed forgets to bind it
        let is_content = match ns {
            ResolveResult::Bound(Namespace(uri)) => uri == CONTENT_NS,
            _ => qname == b"content:encoded",
        };
        return if is_content {
            Tag::Field(Field::ContentEncoded)
        } else {
            Tag::Other
        };
    }

    match qname {
        b"channel" => Tag::Channel,
        b"item" => Tag::Item,
        b"title" => Tag::Field(Field::Title),
        b"link" => Tag::Field(Field::Link),
        b"description" => Tag::Field(Field::Description),
        b"pubDate" => Tag::Field(Field::PubDate),
        b"category" => Tag::Field(Field::Category),
        b"guid" => Tag::Field(Field::Guid),
        _ => Tag::Other,
    }
}

fn malformed(err: impl std::fmt::Display, position: impl std::fmt::Display) -> ParseError {
    ParseError::Malformed(format!("{err} (at byte {position})"))
}

/// First pass: validate the document and pull out the raw text of every
/// channel item.
fn read_raw_items(bytes: &[u8]) -> Result<Vec<RawItem>, ParseError> {
    // quick-xml (0.37) never expands <!ENTITY> declarations; only the
    // five XML builtins are resolved by unescape(), custom ones are errors.
    // Text is decoded through the encoding named in the XML declaration.
    let mut reader = NsReader::from_reader(bytes);
    let mut buf = Vec::new();
    let mut walker = Walker::default();

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| malformed(e, reader.buffer_position()))?;

        match event {
            Event::Start(e) => {
                let (ns, local) = reader.resolve_element(e.name());
                walker.open(classify(ns, local.as_ref(), e.name().as_ref()))?;
            }
            Event::Empty(e) => {
                let (ns, local) = reader.resolve_element(e.name());
                walker.open(classify(ns, local.as_ref(), e.name().as_ref()))?;
                walker.close();
            }
            Event::End(_) => walker.close(),
            Event::Text(e) => {
                let text = e
                    .unescape()
                    .map_err(|err| malformed(err, reader.buffer_position()))?;
                walker.text(&text)?;
            }
            Event::CData(e) => {
                let text = e
                    .decode()
                    .map_err(|err| malformed(err, reader.buffer_position()))?;
                walker.text(&text)?;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !walker.seen_root {
        return Err(ParseError::Malformed("document has no root element".into()));
    }
    if walker.depth != 0 {
        return Err(ParseError::Malformed("unexpected end of document".into()));
    }
    if walker.channels == 0 {
        return Err(ParseError::MissingChannel);
    }

    Ok(walker.items)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn build_item(
    raw: RawItem,
    base_url: &str,
    fallback_published: DateTime<FixedOffset>,
) -> Result<PressItem, UrlValidationError> {
    let title = raw
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(PLACEHOLDER_TITLE)
        .to_string();

    let link = resolve_link(base_url, raw.link.as_deref().unwrap_or_default())?;

    let description = non_blank(raw.content_encoded).or_else(|| non_blank(raw.description));

    let published_at = raw
        .pub_date
        .as_deref()
        .and_then(parse_pub_date)
        .unwrap_or(fallback_published);

    let categories = raw
        .categories
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();

    let raw_guid = raw
        .guid
        .as_deref()
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string);

    let id = stable_id(&title, &link, raw_guid.as_deref());

    Ok(PressItem {
        id,
        title,
        link,
        description,
        published_at,
        categories,
        raw_guid,
        source: SOURCE_TAG,
    })
}

/// Parses an RSS `<pubDate>`.
///
/// RFC 2822 is the RSS format; a leading weekday that disagrees with the
/// date is ignored rather than rejecting the whole value. RFC 3339 is
/// accepted as well since some generators emit Atom-style stamps.
fn parse_pub_date(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    DateTime::parse_from_rfc2822(value)
        .ok()
        .or_else(|| {
            value
                .split_once(',')
                .and_then(|(_, rest)| DateTime::parse_from_rfc2822(rest.trim()).ok())
        })
        .or_else(|| DateTime::parse_from_rfc3339(value).ok())
}
