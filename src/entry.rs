//! Raw feed entries as handed to the extractor.
//!
//! `feed_rs` normalizes timestamps and drops the RSS `<source url="...">`
//! element, so both are recovered from the raw document and merged in by link.
//! The parsed date is only a fallback for items the raw scan could not key.

use std::collections::HashMap;

use feed_rs::model::Entry;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use tracing::debug;

/// The publisher reference some aggregator feeds attach to an item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntrySource {
    pub href: Option<String>,
    pub title: Option<String>,
}

/// One unfiltered item from a feed. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub summary: Option<String>,
    pub published: Option<String>,
    pub source: Option<EntrySource>,
}

/// Per-item fields read straight from the XML.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemExtras {
    pub published: Option<String>,
    pub source: Option<EntrySource>,
}

impl RawEntry {
    pub fn from_parsed(entry: &Entry, extras: Option<&ItemExtras>) -> Self {
        let published = extras
            .and_then(|e| e.published.clone())
            .or_else(|| entry.published.map(|dt| dt.to_rfc2822()));

        Self {
            title: entry.title.as_ref().map(|t| t.content.clone()),
            link: entry.links.first().map(|l| l.href.clone()),
            summary: entry.summary.as_ref().map(|t| t.content.clone()),
            published,
            source: extras.and_then(|e| e.source.clone()),
        }
    }

    /// `source.href` when present and non-empty.
    pub fn source_href(&self) -> Option<&str> {
        self.source
            .as_ref()
            .and_then(|s| s.href.as_deref())
            .map(str::trim)
            .filter(|href| !href.is_empty())
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Link,
    Published,
    SourceTitle,
}

#[derive(Default)]
struct ItemBuilder {
    link: Option<String>,
    published: Option<String>,
    source_href: Option<String>,
    source_title: Option<String>,
}

impl ItemBuilder {
    fn set(&mut self, field: Field, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let slot = match field {
            Field::Link => &mut self.link,
            Field::Published => &mut self.published,
            Field::SourceTitle => &mut self.source_title,
        };
        if slot.is_none() {
            *slot = Some(text.to_string());
        }
    }

    fn build(self) -> Option<(String, ItemExtras)> {
        let link = self.link?;
        let source = if self.source_href.is_some() || self.source_title.is_some() {
            Some(EntrySource {
                href: self.source_href,
                title: self.source_title,
            })
        } else {
            None
        };
        if self.published.is_none() && source.is_none() {
            return None;
        }
        Some((
            link,
            ItemExtras {
                published: self.published,
                source,
            },
        ))
    }
}

/// Scan RSS `<item>` and Atom `<entry>` elements for the raw publish date and
/// the `<source url="...">` element, keyed by the first `<link>`.
/// The first item wins when several share a link.
pub fn scan_item_extras(xml_bytes: &[u8]) -> HashMap<String, ItemExtras> {
    let mut extras = HashMap::new();
    let mut reader = Reader::from_reader(xml_bytes);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut current_item: Option<ItemBuilder> = None;
    let mut field: Option<Field> = None;
    let mut text = String::new();
    // Nesting depth inside <source>; Atom sources carry their own <link>/<title>.
    let mut source_depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.name();
                let name = name.as_ref();
                if name == b"item" || name == b"entry" {
                    current_item = Some(ItemBuilder::default());
                    field = None;
                    source_depth = 0;
                } else if let Some(ref mut item) = current_item {
                    text.clear();
                    field = None;
                    if source_depth > 0 {
                        source_depth += 1;
                    } else if name == b"source" {
                        source_depth = 1;
                        item.source_href = attribute(&e, b"url");
                        field = Some(Field::SourceTitle);
                    } else if name == b"link" {
                        if let Some(href) = attribute(&e, b"href") {
                            item.set(Field::Link, &href);
                        } else {
                            field = Some(Field::Link);
                        }
                    } else if name == b"pubDate" || name == b"published" {
                        field = Some(Field::Published);
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                if let Some(ref mut item) = current_item {
                    let name = e.name();
                    let name = name.as_ref();
                    if source_depth == 0 && name == b"link" {
                        if let Some(href) = attribute(&e, b"href") {
                            item.set(Field::Link, &href);
                        }
                    } else if source_depth == 0 && name == b"source" {
                        item.source_href = attribute(&e, b"url");
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if field.is_some() {
                    text.push_str(&e.unescape().unwrap_or_default());
                }
            }
            Ok(Event::CData(e)) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                let name = name.as_ref();
                if name == b"item" || name == b"entry" {
                    if let Some((link, item_extras)) =
                        current_item.take().and_then(ItemBuilder::build)
                    {
                        extras.entry(link).or_insert(item_extras);
                    }
                } else if let Some(ref mut item) = current_item {
                    if let Some(f) = field.take() {
                        item.set(f, &text);
                    }
                    source_depth = source_depth.saturating_sub(1);
                }
                text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                debug!("Stopped raw item scan: {}", e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    extras
}

fn attribute(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.trim().to_string()))
        .filter(|v| !v.is_empty())
}
