// src/ingest/parser.rs
//! RSS 2.0 / RSS 1.0 / Atom parsing behind one entry point.
//!
//! Streaming over quick-xml events rather than serde structs: real-world
//! feeds mix namespaces (`content:encoded`, `dc:date`, `atom:link`) and
//! HTML entities that strict deserialization rejects. Item fields are keyed
//! on the resolved namespace, so `media:content` or `media:title` never
//! shadow the feed's own elements.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::error::IngestError;
use crate::text::clean_title;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedItem {
    pub title: String,
    pub link: String,
    /// RFC 2822 when the source date could be parsed, raw otherwise.
    pub published: Option<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    Rss,
    Atom,
}

impl FeedFormat {
    fn from_root(name: &str) -> Option<Self> {
        match name {
            "rss" | "rdf" => Some(Self::Rss),
            "feed" => Some(Self::Atom),
            _ => None,
        }
    }

    fn item_tag(&self) -> &'static str {
        match self {
            Self::Rss => "item",
            Self::Atom => "entry",
        }
    }
}

const ATOM_NS: &[u8] = b"http://www.w3.org/2005/Atom";
const ATOM03_NS: &[u8] = b"http://purl.org/atom/ns#";
const RSS1_NS: &[u8] = b"http://purl.org/rss/1.0/";
const RSS09_NS: &[u8] = b"http://my.netscape.com/rdf/simple/0.9/";
const CONTENT_NS: &[u8] = b"http://purl.org/rss/1.0/modules/content/";
const DC_NS: &[u8] = b"http://purl.org/dc/elements/1.1/";
const DCTERMS_NS: &[u8] = b"http://purl.org/dc/terms/";

/// Vocabulary an element belongs to. `Core` covers un-namespaced RSS 2.0
/// as well as the RSS 1.0 and Atom namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Vocab {
    Core,
    Content,
    Dc,
    DcTerms,
    Other,
}

impl Vocab {
    fn resolve(ns: &ResolveResult) -> Self {
        match ns {
            ResolveResult::Unbound => Self::Core,
            ResolveResult::Bound(Namespace(uri)) => Self::from_uri(uri),
            // Undeclared prefix: go by the conventional prefix names.
            ResolveResult::Unknown(prefix) => Self::from_prefix(prefix),
        }
    }

    fn from_uri(uri: &[u8]) -> Self {
        match uri {
            ATOM_NS | ATOM03_NS | RSS1_NS | RSS09_NS => Self::Core,
            CONTENT_NS => Self::Content,
            DC_NS => Self::Dc,
            DCTERMS_NS => Self::DcTerms,
            _ => Self::Other,
        }
    }

    fn from_prefix(prefix: &[u8]) -> Self {
        match prefix.to_ascii_lowercase().as_slice() {
            b"atom" => Self::Core,
            b"content" => Self::Content,
            b"dc" => Self::Dc,
            b"dcterms" => Self::DcTerms,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Published,
    Updated,
    Summary,
    Content,
}

impl Field {
    fn classify(vocab: Vocab, name: &str) -> Option<Self> {
        use Vocab::*;
        match (vocab, name) {
            (Core | Dc, "title") => Some(Self::Title),
            (Core, "link") => Some(Self::Link),
            (Core, "pubdate" | "published" | "issued")
            | (Dc, "date")
            | (DcTerms, "issued" | "created") => Some(Self::Published),
            (Core, "updated" | "modified") | (DcTerms, "modified") => Some(Self::Updated),
            (Core, "description" | "summary") | (Dc, "description") => Some(Self::Summary),
            (Core, "content") | (Content, "encoded") => Some(Self::Content),
            _ => None,
        }
    }
}

#[derive(Default)]
struct ItemBuilder {
    title: String,
    link: String,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<String>,
    content: Option<String>,
}

impl ItemBuilder {
    fn set(&mut self, field: Field, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let slot = match field {
            Field::Title => {
                if self.title.is_empty() {
                    self.title = clean_title(text);
                }
                return;
            }
            Field::Link => {
                if self.link.is_empty() {
                    self.link = text.to_string();
                }
                return;
            }
            Field::Published => &mut self.published,
            Field::Updated => &mut self.updated,
            Field::Summary => &mut self.summary,
            Field::Content => &mut self.content,
        };
        if slot.is_none() {
            *slot = Some(text.to_string());
        }
    }

    fn set_link_attr(&mut self, e: &BytesStart) {
        let rel = attr(e, b"rel");
        if !matches!(rel.as_deref(), None | Some("alternate")) {
            return;
        }
        if let Some(href) = attr(e, b"href") {
            if self.link.is_empty() && !href.trim().is_empty() {
                self.link = href.trim().to_string();
            }
        }
    }

    fn finish(self) -> ParsedItem {
        ParsedItem {
            title: self.title,
            link: self.link,
            published: self.published.or(self.updated).map(|d| normalize_date(&d)),
            summary: self.content.or(self.summary),
        }
    }
}

/// Parse a feed document. The format is detected from the root element.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<ParsedItem>, IngestError> {
    let doc = String::from_utf8_lossy(bytes);
    let mut reader = NsReader::from_str(&doc);
    // Whitespace between text and CDATA pieces is content; `set` trims the ends.
    reader.config_mut().trim_text(false);

    let mut format: Option<FeedFormat> = None;
    let mut items = Vec::new();
    let mut depth: usize = 0;
    let mut item_depth: Option<usize> = None;
    let mut builder = ItemBuilder::default();
    let mut field: Option<(Field, usize)> = None;
    let mut text = String::new();

    loop {
        let (vocab, event) = reader
            .read_resolved_event()
            .map(|(ns, event)| (Vocab::resolve(&ns), event))
            .map_err(|e| IngestError::Parse(format!("at byte {}: {e}", reader.buffer_position())))?;
        match event {
            Event::Start(e) => {
                depth += 1;
                let name = local_name(&e);
                let fmt = match format {
                    Some(f) => f,
                    None => {
                        let f = FeedFormat::from_root(&name).ok_or_else(|| {
                            IngestError::Parse(format!("unsupported root element <{name}>"))
                        })?;
                        format = Some(f);
                        f
                    }
                };

                match item_depth {
                    None if vocab == Vocab::Core && name == fmt.item_tag() => {
                        item_depth = Some(depth);
                        builder = ItemBuilder::default();
                    }
                    Some(d) if depth == d + 1 && field.is_none() => {
                        if let Some(f) = Field::classify(vocab, &name) {
                            if f == Field::Link {
                                builder.set_link_attr(&e);
                            }
                            field = Some((f, depth));
                            text.clear();
                        }
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => {
                if format.is_none() {
                    return Err(IngestError::Parse("empty document element".into()));
                }
                if item_depth == Some(depth)
                    && Field::classify(vocab, &local_name(&e)) == Some(Field::Link)
                {
                    builder.set_link_attr(&e);
                }
            }
            // Text and CDATA pieces join exactly as written, so a `]]>` split
            // across two CDATA sections reads back as one string.
            Event::Text(e) => {
                if field.is_some() {
                    let raw = String::from_utf8_lossy(&e);
                    text.push_str(&html_escape::decode_html_entities(&raw));
                }
            }
            Event::CData(e) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Event::End(_) => {
                if let Some((f, d)) = field {
                    if d == depth {
                        builder.set(f, &text);
                        field = None;
                        text.clear();
                    }
                }
                if item_depth == Some(depth) {
                    items.push(std::mem::take(&mut builder).finish());
                    item_depth = None;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof if depth > 0 => {
                return Err(IngestError::Parse("unexpected end of document".into()));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if format.is_none() {
        return Err(IngestError::Parse("no root element".into()));
    }
    Ok(items)
}

fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).to_ascii_lowercase()
}

fn attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)
        .map(|a| {
            let raw = String::from_utf8_lossy(&a.value);
            html_escape::decode_html_entities(&raw).into_owned()
        })
}

/// RFC 2822 output for any RFC 2822 / RFC 3339 input; other strings are
/// passed through and will sort as oldest.
pub fn normalize_date(raw: &str) -> String {
    let raw = raw.trim();
    OffsetDateTime::parse(raw, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(raw, &Rfc3339))
        .ok()
        .and_then(|dt| dt.format(&Rfc2822).ok())
        .unwrap_or_else(|| raw.to_string())
}
