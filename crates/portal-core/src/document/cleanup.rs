//! Text cleanup for generated documents
//!
//! The model sometimes wraps its HTML in markdown code fences or leaves
//! markdown markers at line starts. Cleanup removes only those artifacts;
//! HTML tags are never touched.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref FENCE_OPEN_HTML: Regex = Regex::new(r"(?i)```html\s*").unwrap();
    static ref FENCE_TRAILING: Regex = Regex::new(r"```\s*$").unwrap();
    static ref FENCE_LINE: Regex = Regex::new(r"(?m)^```.*$").unwrap();
    static ref FENCE_BARE_LINE: Regex = Regex::new(r"(?m)^\s*```\s*$").unwrap();

    static ref MD_HEADING: Regex = Regex::new(r"(?m)^\s*#+\s*").unwrap();
    static ref MD_DASH: Regex = Regex::new(r"(?m)^\s*-\s*").unwrap();
    static ref MD_STAR: Regex = Regex::new(r"(?m)^\s*\*\s*").unwrap();
    static ref MD_TICK_START: Regex = Regex::new(r"(?m)^\s*`\s*").unwrap();
    static ref MD_TICK_END: Regex = Regex::new(r"(?m)\s*`\s*$").unwrap();

    static ref EXPORT_FENCE_OPEN: Regex = Regex::new(r"(?i)^```html\s*").unwrap();

    static ref SECTION_LABEL: Regex = Regex::new(r"^[A-Z][a-z\s]+:$").unwrap();
}

fn strip(content: &str, patterns: &[&Regex]) -> String {
    let mut out = content.to_string();
    for re in patterns {
        out = re.replace_all(&out, "").into_owned();
    }
    out.trim().to_string()
}

/// Remove markdown code fences
pub fn strip_code_fences(content: &str) -> String {
    strip(
        content,
        &[&FENCE_OPEN_HTML, &FENCE_TRAILING, &FENCE_LINE, &FENCE_BARE_LINE],
    )
}

/// Content placed into the edit buffer: fences removed, falling back to
/// the untouched content if nothing would be left.
pub fn edit_seed(content: &str) -> String {
    let stripped = strip(content, &[&FENCE_OPEN_HTML, &FENCE_TRAILING, &FENCE_LINE]);
    if stripped.is_empty() {
        content.to_string()
    } else {
        stripped
    }
}

/// Full cleanup applied before display and after a manual edit
pub fn clean_generated(content: &str) -> String {
    if content.is_empty() {
        return String::new();
    }
    let fenced = strip_code_fences(content);
    strip(
        &fenced,
        &[&MD_HEADING, &MD_DASH, &MD_STAR, &MD_TICK_START, &MD_TICK_END],
    )
}

/// Lighter cleanup for export: only a leading ```html fence and a trailing fence
pub fn strip_for_export(content: &str) -> String {
    strip(content, &[&EXPORT_FENCE_OPEN, &FENCE_TRAILING])
}

/// Render plain-text content as simple HTML. Content that already contains
/// markup is returned unchanged.
pub fn format_content_for_display(content: &str) -> String {
    if content.contains('<') && content.contains('>') {
        return content.to_string();
    }
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            if line.starts_with("Sprint") && line.contains("Plan") {
                format!("<h1>{}</h1>", line)
            } else if SECTION_LABEL.is_match(line) {
                format!("<h2>{}</h2>", line)
            } else if let Some((key, value)) = line.split_once(':') {
                format!("<p><strong>{}:</strong> {}</p>", key.trim(), value.trim())
            } else {
                format!("<p>{}</p>", line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
