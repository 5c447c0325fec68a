// src/serve/rss.rs
//! RSS 2.0 rendering.

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::store::FeedItem;
use crate::text::xml_safe;

pub struct Channel<'a> {
    pub title: &'a str,
    pub link: &'a str,
    pub description: &'a str,
    pub last_build_date: &'a str,
}

/// Title as shown to readers: `[TAG] title` when the item has a source tag.
pub fn display_title(item: &FeedItem) -> String {
    if item.source.is_empty() {
        item.title.clone()
    } else {
        format!("[{}] {}", item.source, item.title)
    }
}

/// CDATA payloads for `text`; a literal `]]>` is split across two sections.
pub fn cdata_sections(text: &str) -> Vec<String> {
    let parts: Vec<&str> = text.split("]]>").collect();
    let last = parts.len() - 1;
    parts
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let mut s = String::with_capacity(p.len() + 3);
            if i > 0 {
                s.push('>');
            }
            s.push_str(p);
            if i < last {
                s.push_str("]]");
            }
            s
        })
        .collect()
}

pub fn render(channel: &Channel, items: &[FeedItem]) -> anyhow::Result<Vec<u8>> {
    let mut w = Writer::new_with_indent(Vec::new(), b' ', 2);
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    w.write_event(Event::Start(rss))?;
    w.write_event(Event::Start(BytesStart::new("channel")))?;

    text_element(&mut w, "title", channel.title)?;
    text_element(&mut w, "link", channel.link)?;
    text_element(&mut w, "description", channel.description)?;
    text_element(&mut w, "lastBuildDate", channel.last_build_date)?;

    for item in items {
        w.write_event(Event::Start(BytesStart::new("item")))?;
        text_element(&mut w, "title", &display_title(item))?;
        text_element(&mut w, "link", &item.url)?;

        let mut guid = BytesStart::new("guid");
        guid.push_attribute(("isPermaLink", "false"));
        w.write_event(Event::Start(guid))?;
        w.write_event(Event::Text(BytesText::new(&item.guid)))?;
        w.write_event(Event::End(BytesEnd::new("guid")))?;

        text_element(&mut w, "pubDate", &item.published)?;

        w.write_event(Event::Start(BytesStart::new("description")))?;
        for section in cdata_sections(&xml_safe(&item.content)) {
            w.write_event(Event::CData(BytesCData::new(section)))?;
        }
        w.write_event(Event::End(BytesEnd::new("description")))?;

        w.write_event(Event::End(BytesEnd::new("item")))?;
    }

    w.write_event(Event::End(BytesEnd::new("channel")))?;
    w.write_event(Event::End(BytesEnd::new("rss")))?;
    Ok(w.into_inner())
}

fn text_element(w: &mut Writer<Vec<u8>>, name: &str, text: &str) -> anyhow::Result<()> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    w.write_event(Event::Text(BytesText::new(&xml_safe(text))))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}
