//! Statement-of-Work uploads, alignment validation and regeneration requests

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};

use crate::artifact::{ArtifactKind, SowReference};
use crate::error::{PortalError, Result};
use crate::transport::{backend_message, ApiRequest};

pub const SOW_UPLOAD_PATH: &str = "/api/upload/sow";
pub const DOCX_UPLOAD_PATH: &str = "/api/upload/docx";
pub const UPDATE_SOW_PATH: &str = "/api/sprint/update-sow";

const UNKNOWN_EMAIL: &str = "unknown@example.com";

lazy_static! {
    static ref PERCENT: Regex = Regex::new(r"(\d+)%").unwrap();
}

const SOW_MIME_TYPES: &[&str] = &[
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/pdf",
    "application/msword",
];
const SOW_EXTENSIONS: &[&str] = &["docx", "pdf", "doc"];

fn extension(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

/// Accept DOCX, DOC or PDF by MIME type or extension
pub fn check_sow_file(file_name: &str, mime_type: &str) -> Result<()> {
    let by_mime = SOW_MIME_TYPES.contains(&mime_type);
    let by_ext = extension(file_name).is_some_and(|ext| SOW_EXTENSIONS.contains(&ext.as_str()));
    if by_mime || by_ext {
        Ok(())
    } else {
        Err(PortalError::InvalidInput(
            "Please select a valid DOCX or PDF file.".to_string(),
        ))
    }
}

/// Structured-document imports accept `.docx` only
pub fn check_docx_file(file_name: &str) -> Result<()> {
    match extension(file_name).as_deref() {
        Some("docx") => Ok(()),
        _ => Err(PortalError::InvalidInput(
            "Invalid file type. Please upload a .docx file.".to_string(),
        )),
    }
}

/// `feature_type` form field for `/api/upload/docx`
pub fn docx_feature_type(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::SprintPlan => "sprint",
        ArtifactKind::RiskAssessment => "risk-assessment",
    }
}

/// Extracted SOW text as returned by the upload endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedSow {
    pub raw_text: String,
    pub html_content: Option<String>,
}

impl UploadedSow {
    pub fn from_response(body: &Value) -> Result<Self> {
        if !body.get("success").and_then(Value::as_bool).unwrap_or(false) {
            return Err(PortalError::Backend(format!(
                "Error extracting SOW content: {}",
                backend_message(body, "upload failed")
            )));
        }
        let field = |key: &str| {
            body.pointer(&format!("/data/{}", key))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Ok(Self {
            raw_text: field("rawText").unwrap_or_default(),
            html_content: field("htmlContent"),
        })
    }
}

/// Parsed document payload from `/api/upload/docx`
pub fn docx_payload(body: &Value) -> Result<Value> {
    if body.get("success").and_then(Value::as_bool).unwrap_or(false) {
        Ok(body.get("data").cloned().unwrap_or(Value::Null))
    } else {
        Err(PortalError::Backend(backend_message(body, "Error processing file")))
    }
}

/// First `N%` in the validator's answer
pub fn extract_alignment(text: &str) -> Option<u32> {
    PERCENT
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentReport {
    pub percentage: Option<u32>,
    pub message: String,
    /// Full validator answer
    pub details: String,
}

impl AlignmentReport {
    pub fn from_response(kind: ArtifactKind, body: &Value) -> Result<Self> {
        if !body.get("success").and_then(Value::as_bool).unwrap_or(false) {
            return Err(PortalError::Backend(format!(
                "Error: {}",
                backend_message(body, "validation failed")
            )));
        }
        let details = body
            .get("response")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let percentage = extract_alignment(&details);
        let subject = match kind {
            ArtifactKind::SprintPlan => "plan",
            ArtifactKind::RiskAssessment => "risk assessment",
        };
        let shown = match (percentage, kind) {
            (Some(p), _) => p.to_string(),
            (None, ArtifactKind::SprintPlan) => "0".to_string(),
            (None, ArtifactKind::RiskAssessment) => "Unknown".to_string(),
        };
        Ok(Self {
            percentage,
            message: format!("Generated {} {}% aligned with the SOW.", subject, shown),
            details,
        })
    }
}

pub fn validation_request(kind: ArtifactKind, content: &str, sow: Option<&SowReference>) -> Result<ApiRequest> {
    if content.trim().is_empty() {
        return Err(PortalError::InvalidInput(format!(
            "Error: No {} content found for validation.",
            kind.noun()
        )));
    }
    let sow = sow.filter(|s| !s.content.trim().is_empty()).ok_or_else(|| {
        PortalError::InvalidInput(
            "Error: No SOW content found for validation. Please upload a SOW document first."
                .to_string(),
        )
    })?;
    let content_key = match kind {
        ArtifactKind::SprintPlan => "sprint_plan_content",
        ArtifactKind::RiskAssessment => "risk_assessment_content",
    };
    Ok(ApiRequest::post(
        kind.validate_path(),
        json!({ content_key: content, "sow_content": sow.content }),
    ))
}

/// Persist a new SOW against a stored sprint plan
pub fn update_sow_request(plan_id: Option<&str>, sow: &SowReference) -> Result<ApiRequest> {
    let plan_id = plan_id.ok_or_else(|| {
        PortalError::NotFound(
            "Error: No sprint plan ID found. Cannot save SOW content.".to_string(),
        )
    })?;
    Ok(ApiRequest::post(
        UPDATE_SOW_PATH,
        json!({
            "sprint_plan_id": plan_id,
            "sow_content": sow.content,
            "sow_file_name": sow.file_name,
        }),
    ))
}

/// Regeneration body: the original inputs with the new SOW and, for sprint
/// plans, the current content.
pub fn regeneration_request(
    kind: ArtifactKind,
    artifact_id: Option<&str>,
    current_content: &str,
    source_inputs: &Value,
    sow: Option<&SowReference>,
) -> Result<ApiRequest> {
    if artifact_id.is_none() {
        return Err(PortalError::NotFound(format!(
            "Error: No {} ID found. Cannot regenerate {}.",
            kind.noun(),
            kind.short_noun()
        )));
    }
    if current_content.trim().is_empty() {
        return Err(PortalError::InvalidInput(format!(
            "Error: No current {} content found. Cannot regenerate {}.",
            kind.short_noun(),
            kind.short_noun()
        )));
    }

    let mut body = match source_inputs {
        Value::Object(map) => map.clone(),
        _ => serde_json::Map::new(),
    };
    let sow_content = sow
        .map(|s| Value::String(s.content.clone()))
        .or_else(|| body.get("sow_content").cloned())
        .unwrap_or(Value::Null);
    body.insert("sow_content".into(), sow_content);
    let email = body
        .get("user_email")
        .and_then(Value::as_str)
        .filter(|e| !e.is_empty())
        .unwrap_or(UNKNOWN_EMAIL)
        .to_string();
    body.insert("user_email".into(), Value::String(email));
    if kind == ArtifactKind::SprintPlan {
        body.insert(
            "current_plan_content".into(),
            Value::String(current_content.to_string()),
        );
        body.insert("regenerate_with_current_plan".into(), Value::Bool(true));
    }
    Ok(ApiRequest::post(kind.generate_path(), Value::Object(body)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sow() -> SowReference {
        SowReference {
            content: "<p>Scope</p>".into(),
            file_name: "sow.docx".into(),
            is_html: true,
        }
    }

    #[test]
    fn test_sow_file_acceptance() {
        assert!(check_sow_file("SOW.PDF", "").is_ok());
        assert!(check_sow_file("scope", "application/msword").is_ok());
        assert!(check_sow_file("contract.docx", "application/octet-stream").is_ok());
        let err = check_sow_file("notes.txt", "text/plain").unwrap_err();
        assert_eq!(err.to_string(), "Please select a valid DOCX or PDF file.");
    }

    #[test]
    fn test_docx_only_for_imports() {
        assert!(check_docx_file("plan.docx").is_ok());
        assert!(check_docx_file("plan.pdf").is_err());
        assert_eq!(docx_feature_type(ArtifactKind::RiskAssessment), "risk-assessment");
    }

    #[test]
    fn test_uploaded_sow_parsing() {
        let body = json!({"success": true, "data": {"rawText": "Scope", "htmlContent": ""}});
        let sow = UploadedSow::from_response(&body).unwrap();
        assert_eq!(sow.raw_text, "Scope");
        assert_eq!(sow.html_content, None);

        let err = UploadedSow::from_response(&json!({"success": false, "error": "bad file"})).unwrap_err();
        assert_eq!(err.to_string(), "Error extracting SOW content: bad file");
    }

    #[test]
    fn test_extract_alignment() {
        assert_eq!(extract_alignment("Overall alignment: 87% with gaps at 5%"), Some(87));
        assert_eq!(extract_alignment("no number"), None);
    }

    #[test]
    fn test_alignment_messages() {
        let body = json!({"success": true, "response": "Alignment 72%"});
        let report = AlignmentReport::from_response(ArtifactKind::SprintPlan, &body).unwrap();
        assert_eq!(report.message, "Generated plan 72% aligned with the SOW.");

        let body = json!({"success": true, "response": "unclear"});
        let report = AlignmentReport::from_response(ArtifactKind::SprintPlan, &body).unwrap();
        assert_eq!(report.message, "Generated plan 0% aligned with the SOW.");
        let report = AlignmentReport::from_response(ArtifactKind::RiskAssessment, &body).unwrap();
        assert_eq!(report.message, "Generated risk assessment Unknown% aligned with the SOW.");

        let err = AlignmentReport::from_response(
            ArtifactKind::SprintPlan,
            &json!({"success": false, "error": "timeout"}),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Error: timeout");
    }

    #[test]
    fn test_validation_request_preconditions() {
        let err = validation_request(ArtifactKind::SprintPlan, "", Some(&sow())).unwrap_err();
        assert_eq!(err.to_string(), "Error: No sprint plan content found for validation.");
        let err = validation_request(ArtifactKind::SprintPlan, "<p>x</p>", None).unwrap_err();
        assert!(err.to_string().contains("Please upload a SOW document first."));

        let req = validation_request(ArtifactKind::RiskAssessment, "<p>x</p>", Some(&sow())).unwrap();
        assert_eq!(req.path, "/api/risk/validate-assessment");
        assert_eq!(req.body.unwrap()["risk_assessment_content"], "<p>x</p>");
    }

    #[test]
    fn test_update_sow_request() {
        let err = update_sow_request(None, &sow()).unwrap_err();
        assert!(err.to_string().contains("No sprint plan ID found"));
        let req = update_sow_request(Some("p1"), &sow()).unwrap();
        assert_eq!(
            req.body.unwrap(),
            json!({"sprint_plan_id": "p1", "sow_content": "<p>Scope</p>", "sow_file_name": "sow.docx"})
        );
    }

    #[test]
    fn test_regeneration_body_for_sprint() {
        let inputs = json!({"sprint_overview": {"SprintNumber": "3"}, "sow_content": "old", "user_email": ""});
        let req = regeneration_request(
            ArtifactKind::SprintPlan,
            Some("p1"),
            "<h1>Plan</h1>",
            &inputs,
            Some(&sow()),
        )
        .unwrap();
        let body = req.body.unwrap();
        assert_eq!(req.path, "/api/sprint/generate-plan");
        assert_eq!(body["sow_content"], "<p>Scope</p>");
        assert_eq!(body["user_email"], "unknown@example.com");
        assert_eq!(body["current_plan_content"], "<h1>Plan</h1>");
        assert_eq!(body["regenerate_with_current_plan"], true);
        assert_eq!(body["sprint_overview"]["SprintNumber"], "3");
    }

    #[test]
    fn test_regeneration_for_risk_keeps_old_sow_and_skips_current_content() {
        let inputs = json!({"sow_content": "old", "user_email": "pm@example.com"});
        let req = regeneration_request(ArtifactKind::RiskAssessment, Some("9"), "<p>x</p>", &inputs, None)
            .unwrap();
        let body = req.body.unwrap();
        assert_eq!(body["sow_content"], "old");
        assert!(body.get("regenerate_with_current_plan").is_none());
    }

    #[test]
    fn test_regeneration_preconditions() {
        let err = regeneration_request(ArtifactKind::SprintPlan, None, "x", &json!({}), None).unwrap_err();
        assert_eq!(
            err,
            PortalError::NotFound("Error: No sprint plan ID found. Cannot regenerate plan.".into())
        );
        let err = regeneration_request(ArtifactKind::SprintPlan, Some("1"), " ", &json!({}), None).unwrap_err();
        assert_eq!(err.to_string(), "Error: No current plan content found. Cannot regenerate plan.");
    }
}
