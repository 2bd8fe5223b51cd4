//! Atom feed parsing for arXiv query responses.
//!
//! Entries are read with a namespace-resolving `quick-xml` reader: entry
//! fields live in the Atom namespace, `primary_category` in the arXiv
//! extension namespace. A document that is not well-formed XML, or whose
//! root is not an Atom `feed`, fails the whole parse. Missing fields inside
//! an entry never do.

use crate::error::{PipelineError, Result};
use crate::paper::{PaperRecord, YearBounds};
use chrono::{DateTime, Datelike};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use tracing::debug;

/// Atom namespace
pub const ATOM_NS: &[u8] = b"http://www.w3.org/2005/Atom";

/// arXiv extension namespace
pub const ARXIV_NS: &[u8] = b"http://arxiv.org/schemas/atom";

/// Entry child whose text is being collected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Title,
    Summary,
    Published,
    AuthorName,
}

/// Raw values collected for one `<entry>`
#[derive(Debug, Default)]
struct EntryAccum {
    id: Option<String>,
    title: Option<String>,
    summary: Option<String>,
    published: Option<String>,
    authors: Vec<String>,
    url: Option<String>,
    genre: Option<String>,
}

impl EntryAccum {
    fn push_text(&mut self, field: Field, text: &str) {
        let slot = match field {
            Field::Id => &mut self.id,
            Field::Title => &mut self.title,
            Field::Summary => &mut self.summary,
            Field::Published => &mut self.published,
            Field::AuthorName => match self.authors.last_mut() {
                Some(name) => {
                    name.push_str(text);
                    return;
                }
                None => return,
            },
        };
        slot.get_or_insert_with(String::new).push_str(text);
    }

    /// Year from the published timestamp, `None` when absent or unreadable.
    fn year(&self) -> Option<i32> {
        let published = self.published.as_deref()?.trim();
        match DateTime::parse_from_rfc3339(published) {
            Ok(ts) => Some(ts.year()),
            Err(e) => {
                debug!(published = %published, error = %e, "Unreadable published timestamp");
                None
            }
        }
    }

    fn into_record(self, year: Option<i32>) -> PaperRecord {
        let external_id = self
            .id
            .as_deref()
            .map(str::trim)
            .and_then(|id| id.rsplit('/').next())
            .unwrap_or_default()
            .to_string();

        PaperRecord {
            external_id,
            title: self.title.map(|t| t.trim().to_string()).unwrap_or_default(),
            authors: self
                .authors
                .iter()
                .map(|a| a.trim())
                .filter(|a| !a.is_empty())
                .collect::<Vec<_>>()
                .join(", "),
            abstract_text: self.summary.map(|s| s.trim().to_string()).unwrap_or_default(),
            year: year.map(|y| y.to_string()).unwrap_or_default(),
            url: self.url.unwrap_or_default(),
            genre: self.genre.unwrap_or_default(),
            translated_title: None,
            translated_abstract: None,
            summary: None,
        }
    }
}

/// Streaming parser state
#[derive(Default)]
struct FeedParser {
    records: Vec<PaperRecord>,
    saw_root: bool,
    depth: usize,
    entry: Option<EntryAccum>,
    entry_depth: usize,
    in_author: bool,
    field: Option<Field>,
    dropped: usize,
}

impl FeedParser {
    fn handle_start(&mut self, ns: &ResolveResult, e: &BytesStart<'_>, empty: bool) -> Result<()> {
        let atom = is_ns(ns, ATOM_NS);
        let local = e.local_name();
        let name = local.as_ref();

        if !self.saw_root {
            if !(atom && name == b"feed") {
                return Err(PipelineError::Feed(format!(
                    "document root is <{}>, expected an Atom <feed>",
                    String::from_utf8_lossy(e.name().as_ref())
                )));
            }
            self.saw_root = true;
        }

        if !empty {
            self.depth += 1;
        }

        let Some(entry) = self.entry.as_mut() else {
            if atom && name == b"entry" && !empty {
                self.entry = Some(EntryAccum::default());
                self.entry_depth = self.depth;
            } else if atom && name == b"entry" {
                // <entry/> has no fields at all
                self.finish_entry(EntryAccum::default(), &YearBounds::UNBOUNDED);
            }
            return Ok(());
        };

        // Depth of this element relative to the entry: 1 = direct child
        let rel = if empty { self.depth + 1 } else { self.depth } - self.entry_depth;

        if is_ns(ns, ARXIV_NS) && name == b"primary_category" && rel == 1 {
            if entry.genre.is_none() {
                entry.genre = attr_value(e, b"term")?;
            }
            return Ok(());
        }

        if !atom {
            return Ok(());
        }

        match (name, rel) {
            (b"link", 1) => {
                if entry.url.is_none() && attr_value(e, b"rel")?.as_deref() == Some("alternate") {
                    entry.url = attr_value(e, b"href")?;
                }
            }
            (b"author", 1) if !empty => self.in_author = true,
            (b"name", 2) if self.in_author => {
                entry.authors.push(String::new());
                if !empty {
                    self.field = Some(Field::AuthorName);
                }
            }
            (b"id", 1) if !empty => self.field = Some(Field::Id),
            (b"title", 1) => {
                entry.title.get_or_insert_with(String::new);
                if !empty {
                    self.field = Some(Field::Title);
                }
            }
            (b"summary", 1) => {
                entry.summary.get_or_insert_with(String::new);
                if !empty {
                    self.field = Some(Field::Summary);
                }
            }
            (b"published", 1) if !empty => self.field = Some(Field::Published),
            _ => {}
        }
        Ok(())
    }

    fn handle_text(&mut self, text: &str) {
        if let (Some(entry), Some(field)) = (self.entry.as_mut(), self.field) {
            entry.push_text(field, text);
        }
    }

    fn handle_end(&mut self, ns: &ResolveResult, local: &[u8], bounds: &YearBounds) {
        let closing_entry = self.entry.is_some() && self.depth == self.entry_depth;
        self.depth = self.depth.saturating_sub(1);
        self.field = None;

        if closing_entry && is_ns(ns, ATOM_NS) && local == b"entry" {
            self.in_author = false;
            if let Some(entry) = self.entry.take() {
                self.finish_entry(entry, bounds);
            }
        } else if is_ns(ns, ATOM_NS) && local == b"author" {
            self.in_author = false;
        }
    }

    fn finish_entry(&mut self, entry: EntryAccum, bounds: &YearBounds) {
        let year = entry.year();
        if let Some(y) = year {
            if !bounds.contains(y) {
                debug!(year = y, id = ?entry.id, "Dropping entry outside requested years");
                self.dropped += 1;
                return;
            }
        }
        self.records.push(entry.into_record(year));
    }
}

/// Parse an arXiv Atom document into paper records, in document order.
///
/// Entries whose published year falls outside `bounds` are dropped even
/// though the query already asked the index for that range. Entries with
/// no published timestamp are always kept.
pub fn parse_feed(xml: &str, bounds: &YearBounds) -> Result<Vec<PaperRecord>> {
    let mut reader = NsReader::from_str(xml);
    let mut parser = FeedParser::default();

    loop {
        let (ns, event) = reader
            .read_resolved_event()
            .map_err(|e| PipelineError::Feed(format!("Malformed XML: {}", e)))?;

        match event {
            Event::Start(ref e) => parser.handle_start(&ns, e, false)?,
            Event::Empty(ref e) => parser.handle_start(&ns, e, true)?,
            Event::Text(ref e) => {
                let text = e
                    .unescape()
                    .map_err(|err| PipelineError::Feed(format!("Bad text content: {}", err)))?;
                parser.handle_text(&text);
            }
            Event::CData(ref e) => parser.handle_text(&String::from_utf8_lossy(e)),
            Event::End(ref e) => {
                let local = e.local_name();
                parser.handle_end(&ns, local.as_ref(), bounds);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if parser.depth != 0 {
        return Err(PipelineError::Feed("document ended inside an open element".to_string()));
    }
    if !parser.saw_root {
        return Err(PipelineError::Feed("document contains no Atom feed".to_string()));
    }

    debug!(
        parsed = parser.records.len(),
        dropped = parser.dropped,
        "Parsed arXiv feed"
    );
    Ok(parser.records)
}

fn is_ns(ns: &ResolveResult, expected: &[u8]) -> bool {
    matches!(ns, ResolveResult::Bound(Namespace(uri)) if *uri == expected)
}

fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| PipelineError::Feed(format!("Bad attribute: {}", err)))?;
        if attr.key.local_name().as_ref() == key {
            let value = attr
                .unescape_value()
                .map_err(|err| PipelineError::Feed(format!("Bad attribute value: {}", err)))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}
