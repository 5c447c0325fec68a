// src/extract/paragraphs.rs
//! Secondary extractor: paragraph density.
//!
//! Groups `<p>` elements by their parent and keeps the parent holding the
//! most paragraph text. Cruder than readability, but it picks up article
//! bodies that readability discards as boilerplate (common on pages where a
//! paywall overlay wraps the real text).

use scraper::{ElementRef, Html, Selector};

use super::Extracted;
use crate::text::clean_title;

const MIN_PARAGRAPH_CHARS: usize = 25;

pub fn extract(html: &str) -> Option<Extracted> {
    let document = Html::parse_document(html);
    let p_sel = Selector::parse("p").ok()?;

    // (parent id, paragraph texts, total chars) in first-seen order
    let mut groups: Vec<(_, Vec<String>, usize)> = Vec::new();
    for p in document.select(&p_sel) {
        if inside_chrome(&p) {
            continue;
        }
        let text = p.text().collect::<Vec<_>>().join(" ");
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let len = text.chars().count();
        if len < MIN_PARAGRAPH_CHARS {
            continue;
        }
        let Some(parent) = p.parent().and_then(ElementRef::wrap) else {
            continue;
        };
        match groups.iter_mut().find(|(id, _, _)| *id == parent.id()) {
            Some((_, texts, total)) => {
                texts.push(text);
                *total += len;
            }
            None => groups.push((parent.id(), vec![text], len)),
        }
    }

    // max_by_key keeps the last maximum; iterate reversed so ties go to the first group.
    let (_, texts, _) = groups.into_iter().rev().max_by_key(|(_, _, total)| *total)?;
    let content = texts.join("\n\n");

    Some(Extracted {
        title: page_title(&document).unwrap_or_default(),
        content,
    })
}

fn inside_chrome(el: &ElementRef) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| matches!(a.value().name(), "nav" | "footer" | "aside" | "header" | "form"))
}

fn page_title(document: &Html) -> Option<String> {
    let og = Selector::parse(r#"meta[property="og:title"]"#).ok()?;
    if let Some(t) = document
        .select(&og)
        .filter_map(|m| m.value().attr("content"))
        .map(clean_title)
        .find(|t| !t.is_empty())
    {
        return Some(t);
    }
    for sel in ["h1", "title"] {
        let s = Selector::parse(sel).ok()?;
        if let Some(t) = document
            .select(&s)
            .map(|e| clean_title(&e.text().collect::<String>()))
            .find(|t| !t.is_empty())
        {
            return Some(t);
        }
    }
    None
}
