//! Risk assessment importers
//!
//! A workbook yields one record per row. A document yields a single record,
//! either from the structured `riskAssessment` object, a flat section-keyed
//! record, or labels scraped out of the raw text.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{
    docx_notice, excel_notice, loose_text, normalize_date, ImportNotice, ImportOutcome,
    ParsedPayload, NOT_AVAILABLE,
};
use crate::config::PortalConfig;
use crate::forms::risk::{RiskAssessmentForm, RiskRecord, RiskSection};
use crate::forms::FormModel;

/// `riskAssessment` object produced by the structured document parser
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StructuredRisk {
    #[serde(rename = "riskID")]
    pub risk_id: Option<Value>,
    pub risk_description: Option<Value>,
    pub severity: Option<Value>,
    pub status: Option<Value>,
    pub risk_owner: Option<Value>,
    pub date_identified: Option<Value>,
    pub mitigation_plan: Option<Value>,
    pub relevant_notes: Option<Value>,
}

pub type RiskDocument = ParsedPayload<StructuredRisk, RiskRecord>;

lazy_static! {
    static ref RISK_ID: Regex = Regex::new(r"(?i)Risk\s+ID[:\s]*([^\n]+)").unwrap();
    static ref DESCRIPTION: Regex = Regex::new(r"(?i)Risk\s+Description[:\s]*([^\n]+)").unwrap();
    static ref SEVERITY: Regex = Regex::new(r"(?i)Severity[:\s]*([^\n]+)").unwrap();
    static ref STATUS: Regex = Regex::new(r"(?i)Status[:\s]*([^\n]+)").unwrap();
    static ref OWNER: Regex = Regex::new(r"(?i)Risk\s+Owner[:\s]*([^\n]+)").unwrap();
    static ref DATE_IDENTIFIED: Regex = Regex::new(r"(?i)Date\s+Identified[:\s]*([^\n]+)").unwrap();
    static ref MITIGATION: Regex = Regex::new(r"(?i)Mitigation\s+Plan[:\s]*([^\n]+)").unwrap();
    static ref RELEVANT_NOTES: Regex = Regex::new(r"(?i)Relevant\s+Notes[:\s]*([^\n]+)").unwrap();
}

const SECTION_KEYS: [&str; 3] = ["RiskID", "RiskDescription", "RiskOwner"];

/// Decide which layout a parsed DOCX payload uses
pub fn classify_risk_document(payload: &Value) -> RiskDocument {
    if let Some(risk) = payload.get("riskAssessment") {
        return ParsedPayload::Structured(serde_json::from_value(risk.clone()).unwrap_or_default());
    }
    if SECTION_KEYS.iter().any(|k| payload.get(*k).is_some()) {
        if let Ok(record) = serde_json::from_value(payload.clone()) {
            return ParsedPayload::Legacy(record);
        }
        debug!("Section-keyed risk payload did not deserialize, scanning text");
    }
    let text = payload
        .get("raw_text")
        .and_then(Value::as_str)
        .unwrap_or_default();
    ParsedPayload::Unparsed(text.to_string())
}

/// Populate a single-record assessment from a parsed DOCX payload
pub fn import_risk_document(payload: &Value, config: &PortalConfig) -> ImportOutcome<RiskAssessmentForm> {
    let document = classify_risk_document(payload);
    debug!("Importing {} risk document", document.kind());
    let record = match document {
        ParsedPayload::Structured(risk) => from_structured(&risk),
        ParsedPayload::Legacy(record) => record,
        ParsedPayload::Unparsed(text) => from_raw_text(&text),
    };
    outcome(vec![record], docx_notice(config))
}

fn from_structured(risk: &StructuredRisk) -> RiskRecord {
    let mut record = RiskRecord::default();
    let text = |v: &Option<Value>| loose_text(v.as_ref());
    if let Some(v) = text(&risk.risk_id) {
        record.risk_id.value = v;
    }
    if let Some(v) = text(&risk.risk_description) {
        record.description.primary_source = v;
    }
    if let Some(v) = text(&risk.severity) {
        record.severity.severity_value = v;
    }
    if let Some(v) = text(&risk.status) {
        record.status.value = v;
    }
    if let Some(v) = text(&risk.risk_owner) {
        record.owner.primary_source = v;
    }
    if let Some(v) = text(&risk.date_identified) {
        record.date_identified.value = v;
    }
    if let Some(v) = text(&risk.mitigation_plan) {
        record.mitigation_plan.primary_source = v;
    }
    if let Some(v) = text(&risk.relevant_notes) {
        record.relevant_notes.value = v;
    }
    record
}

fn from_raw_text(text: &str) -> RiskRecord {
    let mut record = RiskRecord::default();
    let scan = |re: &Regex| re.captures(text).map(|c| c[1].trim().to_string());
    let slots: [(&Regex, &mut String); 8] = [
        (&*RISK_ID, &mut record.risk_id.value),
        (&*DESCRIPTION, &mut record.description.primary_source),
        (&*SEVERITY, &mut record.severity.severity_value),
        (&*STATUS, &mut record.status.value),
        (&*OWNER, &mut record.owner.primary_source),
        (&*DATE_IDENTIFIED, &mut record.date_identified.value),
        (&*MITIGATION, &mut record.mitigation_plan.primary_source),
        (&*RELEVANT_NOTES, &mut record.relevant_notes.value),
    ];
    let mut matched = 0;
    for (re, slot) in slots {
        if let Some(value) = scan(re) {
            *slot = value;
            matched += 1;
        }
    }
    if matched == 0 {
        debug!("No risk fields recognised in document text");
    }
    record
}

/// One workbook row, keyed by column header
fn from_row(row: &Value) -> RiskRecord {
    let cell = |column: &str| loose_text(row.get(column));
    let or_na = |column: &str| cell(column).unwrap_or_else(|| NOT_AVAILABLE.to_string());

    let mut record = RiskRecord::default();
    record.risk_id.value = or_na("Issue key");
    record.description.primary_source = or_na("Summary");
    record.severity.severity_value = or_na("Description");
    record.priority.value = or_na("Priority");
    record.status.value = or_na("Status");
    record.owner.primary_source = or_na("Assignee");
    record.owner.secondary_source = or_na("Reporter");
    record.date_identified.value = cell("Created")
        .map(|d| normalize_date(&d))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());
    record.comments.value = or_na("Comments");
    record.custom_field.value = or_na("Risk/Mitigation");
    record
}

/// Populate an assessment from parsed workbook rows (an array, or one row)
pub fn import_risk_workbook(payload: &Value, config: &PortalConfig) -> ImportOutcome<RiskAssessmentForm> {
    let records = match payload {
        Value::Array(rows) => rows.iter().map(from_row).collect(),
        row => vec![from_row(row)],
    };
    debug!("Imported {} risk rows", records.len());
    outcome(records, excel_notice(config))
}

fn outcome(records: Vec<RiskRecord>, notice: ImportNotice) -> ImportOutcome<RiskAssessmentForm> {
    let form = RiskAssessmentForm::from_records(records);
    let touched: Vec<RiskSection> = RiskAssessmentForm::sections()
        .iter()
        .copied()
        .filter(|s| form.is_section_complete(*s))
        .collect();
    ImportOutcome {
        form,
        touched,
        notice,
    }
}
