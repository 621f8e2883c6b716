//! Heading discovery for comment mode
//!
//! Every `h1`..`h4` gets an id of the form `header-<index>-<token>` and a
//! comment affordance carrying that id in `data-header-id`. The page uses a
//! single delegated click listener that reads the attribute back.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

pub const UNKNOWN_HEADER: &str = "Unknown Header";

/// Class placed on each injected affordance
pub const AFFORDANCE_CLASS: &str = "header-comment-btn";

lazy_static! {
    static ref HEADING: Regex = Regex::new(r"(?is)<h([1-4])\b[^>]*>(.*?)</h[1-4]\s*>").unwrap();
    static ref TAG: Regex = Regex::new(r"<[^>]*>").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderEntry {
    pub id: String,
    pub level: u8,
    pub text: String,
    /// Byte offset just past the heading's closing tag
    #[serde(skip)]
    end: usize,
}

/// Heading id to heading text, rebuilt on every entry into comment mode
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HeaderCommentMap {
    entries: Vec<HeaderEntry>,
}

fn text_content(inner: &str) -> String {
    let stripped = TAG.replace_all(inner, "");
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    WHITESPACE.replace_all(decoded.trim(), " ").into_owned()
}

fn random_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

impl HeaderCommentMap {
    /// Scan with random id tokens
    pub fn scan(html: &str) -> Self {
        Self::scan_with(html, random_token)
    }

    /// Scan with a caller-supplied token source
    pub fn scan_with(html: &str, mut token: impl FnMut() -> String) -> Self {
        let entries = HEADING
            .captures_iter(html)
            .enumerate()
            .filter_map(|(index, caps)| {
                let whole = caps.get(0)?;
                let level = caps.get(1)?.as_str().parse().ok()?;
                Some(HeaderEntry {
                    id: format!("header-{}-{}", index, token()),
                    level,
                    text: text_content(caps.get(2).map_or("", |m| m.as_str())),
                    end: whole.end(),
                })
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[HeaderEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Heading text for an id, or "Unknown Header"
    pub fn label_for(&self, header_id: &str) -> &str {
        self.entries
            .iter()
            .find(|e| e.id == header_id)
            .map_or(UNKNOWN_HEADER, |e| e.text.as_str())
    }

    /// Copy of `html` with an affordance after every scanned heading.
    ///
    /// `html` must be the same string that was scanned.
    pub fn inject_affordances(&self, html: &str) -> String {
        let mut out = String::with_capacity(html.len() + self.entries.len() * 96);
        let mut cursor = 0;
        for entry in &self.entries {
            if entry.end > html.len() || entry.end < cursor {
                break;
            }
            out.push_str(&html[cursor..entry.end]);
            out.push_str(&format!(
                r#"<button type="button" class="{}" data-header-id="{}" title="Comment on this section">&#128172;</button>"#,
                AFFORDANCE_CLASS, entry.id
            ));
            cursor = entry.end;
        }
        out.push_str(&html[cursor..]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn counter() -> impl FnMut() -> String {
        let mut n = 0;
        move || {
            n += 1;
            format!("t{}", n)
        }
    }

    const DOC: &str = "<h1>Sprint 12</h1><p>x</p><h2 class=\"a\">Team <em>Capacity</em></h2><h5>skip</h5><h4>Risks &amp; Impediments</h4>";

    #[test]
    fn test_scan_in_document_order() {
        let map = HeaderCommentMap::scan_with(DOC, counter());
        let ids: Vec<&str> = map.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["header-0-t1", "header-1-t2", "header-2-t3"]);
        assert_eq!(map.label_for("header-1-t2"), "Team Capacity");
        assert_eq!(map.label_for("header-2-t3"), "Risks & Impediments");
        assert_eq!(map.entries()[2].level, 4);
    }

    #[test]
    fn test_unknown_header_label() {
        let map = HeaderCommentMap::scan_with(DOC, counter());
        assert_eq!(map.label_for("header-9-zz"), "Unknown Header");
        assert_eq!(HeaderCommentMap::default().label_for("x"), UNKNOWN_HEADER);
    }

    #[test]
    fn test_inject_affordances_after_headings() {
        let html = "<h1>A</h1><p>body</p><h3>B</h3>";
        let map = HeaderCommentMap::scan_with(html, counter());
        let out = map.inject_affordances(html);
        assert!(out.starts_with("<h1>A</h1><button type=\"button\" class=\"header-comment-btn\" data-header-id=\"header-0-t1\""));
        assert!(out.contains("</button><p>body</p><h3>B</h3><button"));
        assert!(out.contains("data-header-id=\"header-1-t2\""));
        assert_eq!(out.matches(AFFORDANCE_CLASS).count(), 2);
    }

    #[test]
    fn test_random_tokens_are_unique() {
        let html = "<h1>A</h1><h1>A</h1>";
        let first = HeaderCommentMap::scan(html);
        let second = HeaderCommentMap::scan(html);
        assert_eq!(first.len(), 2);
        assert_ne!(first.entries()[0].id, second.entries()[0].id);
        assert!(first.entries()[0].id.starts_with("header-0-"));
    }

    #[test]
    fn test_no_headings() {
        let map = HeaderCommentMap::scan("<p>plain</p>");
        assert!(map.is_empty());
        assert_eq!(map.inject_affordances("<p>plain</p>"), "<p>plain</p>");
    }
}
