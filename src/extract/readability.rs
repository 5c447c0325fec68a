// src/extract/readability.rs
//! Primary generic extraction: Mozilla-style readability via dom_smoothie.

use dom_smoothie::{Config, Readability};

use super::Extracted;
use crate::text::{clean_title, strip_markup};

/// Run readability over a page. `None` when nothing article-like was found.
pub fn extract(html: &str, url: Option<&str>) -> Option<Extracted> {
    let cfg = Config {
        max_elements_to_parse: 9000,
        ..Default::default()
    };

    let mut readability = match Readability::new(html, url, Some(cfg)) {
        Ok(r) => r,
        Err(e) => {
            tracing::debug!(error = ?e, "readability init failed");
            return None;
        }
    };
    let article = match readability.parse() {
        Ok(a) => a,
        Err(e) => {
            tracing::debug!(error = ?e, "readability parse failed");
            return None;
        }
    };

    // Re-derive text from the cleaned HTML so paragraph breaks survive.
    let mut content = strip_markup(&article.content);
    if content.is_empty() {
        content = article.text_content.trim().to_string();
    }
    if content.is_empty() {
        return None;
    }

    Some(Extracted {
        title: clean_title(&article.title),
        content,
    })
}
