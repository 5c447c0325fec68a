// src/text.rs
//! Text cleanup shared by feed parsing, the crawler and the extractors.

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));
static RE_BLOCK_END: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(p|div|h[1-6]|li|blockquote|section|article)\s*>")
        .expect("block regex")
});
static RE_SCRIPT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style|noscript)[^>]*>.*?</(script|style|noscript)\s*>")
        .expect("script regex")
});
static RE_BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("blank line regex"));
static RE_SLUG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/\d+_([^/]+)\.html$").expect("slug regex"));

/// Single-line cleanup for titles: entities decoded, tags stripped,
/// typographic quotes folded, whitespace collapsed.
pub fn clean_title(s: &str) -> String {
    // Tags first: an encoded `&lt;b&gt;` must survive as literal text.
    let stripped = RE_TAGS.replace_all(s, "");
    let mut out = html_escape::decode_html_entities(&stripped).to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    RE_WS.replace_all(&out, " ").trim().to_string()
}

/// Multi-line cleanup for article bodies delivered as HTML fragments.
/// Block-level closings become paragraph breaks.
pub fn strip_markup(html: &str) -> String {
    let no_scripts = RE_SCRIPT.replace_all(html, "");
    let with_breaks = RE_BLOCK_END.replace_all(&no_scripts, "\n\n");
    let no_tags = RE_TAGS.replace_all(&with_breaks, "");
    let decoded = html_escape::decode_html_entities(&no_tags);

    let lines: Vec<String> = decoded
        .split('\n')
        .map(|line| RE_WS.replace_all(line, " ").trim().to_string())
        .collect();
    let joined = lines.join("\n");
    RE_BLANK_LINES
        .replace_all(&joined, "\n\n")
        .trim()
        .to_string()
}

/// Best-effort title from an article URL of the form `.../<id>_<slug>.html`.
pub fn title_from_slug(url: &str) -> Option<String> {
    let caps = RE_SLUG.captures(url)?;
    let slug = caps.get(1)?.as_str().replace('-', " ");
    let slug = slug.trim();
    if slug.is_empty() {
        None
    } else {
        Some(slug.to_string())
    }
}

/// Character count, which is what content-length comparisons use.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Drops characters XML 1.0 cannot carry: C0 controls other than tab,
/// LF and CR, plus U+FFFE and U+FFFF.
pub fn xml_safe(s: &str) -> Cow<'_, str> {
    if s.chars().all(is_xml_char) {
        Cow::Borrowed(s)
    } else {
        Cow::Owned(s.chars().filter(|c| is_xml_char(*c)).collect())
    }
}

fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_title_strips_tags_and_entities() {
        let s = "  <b>Bielefeld</b>&nbsp;&amp; the\n  \u{201C}OWL\u{201D} region ";
        assert_eq!(clean_title(s), "Bielefeld & the \"OWL\" region");
    }

    #[test]
    fn clean_title_keeps_encoded_angle_brackets_as_text() {
        assert_eq!(clean_title("a &lt;b&gt; c"), "a <b> c");
    }

    #[test]
    fn strip_markup_keeps_paragraph_breaks() {
        let html = "<p>First   para.</p><p>Second<br>line</p><script>x()</script>";
        assert_eq!(strip_markup(html), "First para.\n\nSecond\n\nline");
    }

    #[test]
    fn slug_title_is_dehyphenated() {
        let url = "https://www.nw.de/lokal/bielefeld/x/123_my-story.html";
        assert_eq!(title_from_slug(url).as_deref(), Some("my story"));
        assert_eq!(title_from_slug("https://www.nw.de/lokal/index.html"), None);
    }

    #[test]
    fn xml_safe_drops_control_characters_only() {
        assert!(matches!(xml_safe("Zeile\nzwei\tdrei"), Cow::Borrowed(_)));
        assert_eq!(xml_safe("Titel\u{8}"), "Titel");
        assert_eq!(xml_safe("Absatz\u{c}zwei\u{0}\u{fffe}"), "Absatzzwei");
        assert_eq!(xml_safe("Grüße 🚆"), "Grüße 🚆");
    }

    #[test]
    fn char_len_counts_umlauts_once() {
        assert_eq!(char_len("Bürger"), 6);
    }
}
