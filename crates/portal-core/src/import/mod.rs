//! Import adapters: parsed spreadsheet / document payloads into form models
//!
//! Uploaded files are parsed by the backend; what arrives here is loosely
//! shaped JSON. Each payload is classified once into a [`ParsedPayload`] and
//! then mapped field by field. Missing or malformed values never fail an
//! import, they fall back to the `"N/A"` sentinel.

pub mod risk;
pub mod sprint;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::config::PortalConfig;
use crate::forms::{FormDocument, FormModel};

pub use risk::{import_risk_document, import_risk_workbook};
pub use sprint::{import_sprint_document, import_sprint_workbook};

pub const NOT_AVAILABLE: &str = "N/A";

/// Shape of an uploaded document once the backend has parsed it
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedPayload<S, L> {
    /// Current nested layout produced by the LLM-backed parser
    Structured(S),
    /// Older flat export format
    Legacy(L),
    /// Only plain text survived; fields are scraped by label
    Unparsed(String),
}

impl<S, L> ParsedPayload<S, L> {
    pub fn kind(&self) -> &'static str {
        match self {
            ParsedPayload::Structured(_) => "structured",
            ParsedPayload::Legacy(_) => "legacy",
            ParsedPayload::Unparsed(_) => "unparsed",
        }
    }
}

/// Transient message shown after an import
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportNotice {
    pub message: String,
    pub dismiss_after_ms: u32,
}

#[derive(Debug, Clone)]
pub struct ImportOutcome<F: FormModel> {
    pub form: F,
    /// Sections the payload provided data for
    pub touched: Vec<F::Section>,
    pub notice: ImportNotice,
}

impl<F: FormModel> ImportOutcome<F> {
    /// Replace the document's form and mark the touched sections saved
    pub fn apply(self, doc: &mut FormDocument<F>) -> ImportNotice {
        doc.replace(self.form, self.touched);
        self.notice
    }
}

pub(crate) fn excel_notice(config: &PortalConfig) -> ImportNotice {
    ImportNotice {
        message: "Excel data loaded successfully!".to_string(),
        dismiss_after_ms: config.import_notification_ms,
    }
}

pub(crate) fn docx_notice(config: &PortalConfig) -> ImportNotice {
    ImportNotice {
        message: "DOCX data loaded successfully!".to_string(),
        dismiss_after_ms: config.import_notification_ms,
    }
}

/// Render a loose JSON scalar as text; falsy values become `None`
pub(crate) fn loose_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        Value::Array(items) if !items.is_empty() => Some(
            items
                .iter()
                .map(|v| loose_text(Some(v)).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(","),
        ),
        _ => None,
    }
}

pub(crate) fn text_or_na(value: Option<&Value>) -> String {
    loose_text(value).unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Join an array of lines with `\n`; anything else is rendered as text
pub(crate) fn lines_or_na(value: Option<&Value>) -> String {
    match value {
        Some(Value::Array(items)) => {
            let joined = items
                .iter()
                .filter_map(|v| loose_text(Some(v)))
                .collect::<Vec<_>>()
                .join("\n");
            if joined.is_empty() {
                NOT_AVAILABLE.to_string()
            } else {
                joined
            }
        }
        other => text_or_na(other),
    }
}

pub(crate) fn loose_number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => leading_number(s),
        _ => 0.0,
    }
}

/// Numeric prefix of a string (`"8h"` -> 8), 0 when there is none
fn leading_number(s: &str) -> f64 {
    lazy_static! {
        static ref LEADING_NUMBER: Regex = Regex::new(r"^\s*(\d+(?:\.\d+)?)").unwrap();
    }
    LEADING_NUMBER
        .captures(s)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(0.0)
}

/// True for a non-empty JSON object
pub(crate) fn has_content(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::Object(map)) if !map.is_empty())
}

lazy_static! {
    static ref ISO_DATE: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
}

const DATE_FORMATS: &[&str] = &[
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
    "%d/%b/%y %I:%M %p",
    "%d/%b/%Y %I:%M %p",
];

/// Normalise a date to `YYYY-MM-DD`; unparseable input is returned verbatim
pub fn normalize_date(raw: &str) -> String {
    let trimmed = raw.trim();
    if ISO_DATE.is_match(trimmed) {
        return trimmed.to_string();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return dt.date_naive().format("%Y-%m-%d").to_string();
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return dt.date_naive().format("%Y-%m-%d").to_string();
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return dt.date().format("%Y-%m-%d").to_string();
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return date.format("%Y-%m-%d").to_string();
        }
    }
    raw.to_string()
}
