//! Generated artifacts and the SOW reference attached to them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::storage::{keys, KeyValueStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArtifactKind {
    SprintPlan,
    RiskAssessment,
}

impl ArtifactKind {
    pub fn generate_path(&self) -> &'static str {
        match self {
            ArtifactKind::SprintPlan => "/api/sprint/generate-plan",
            ArtifactKind::RiskAssessment => "/api/risk-assessment/generate-assessment",
        }
    }

    /// Collection endpoint used for listing and deleting
    pub fn collection_path(&self) -> &'static str {
        match self {
            ArtifactKind::SprintPlan => "/api/sprint-plans",
            ArtifactKind::RiskAssessment => "/api/risk-assessments",
        }
    }

    pub fn validate_path(&self) -> &'static str {
        match self {
            ArtifactKind::SprintPlan => "/api/sprint/validate-plan",
            ArtifactKind::RiskAssessment => "/api/risk/validate-assessment",
        }
    }

    /// Field carrying the new artifact's id in a generation response
    pub fn id_field(&self) -> &'static str {
        match self {
            ArtifactKind::SprintPlan => "plan_id",
            ArtifactKind::RiskAssessment => "assessment_id",
        }
    }

    /// Field carrying the item array in a list response
    pub fn list_field(&self) -> &'static str {
        match self {
            ArtifactKind::SprintPlan => "plans",
            ArtifactKind::RiskAssessment => "assessments",
        }
    }

    /// Lower-case noun for messages
    pub fn noun(&self) -> &'static str {
        match self {
            ArtifactKind::SprintPlan => "sprint plan",
            ArtifactKind::RiskAssessment => "risk assessment",
        }
    }

    /// Short noun used in user-facing messages ("plan", "assessment")
    pub fn short_noun(&self) -> &'static str {
        match self {
            ArtifactKind::SprintPlan => "plan",
            ArtifactKind::RiskAssessment => "assessment",
        }
    }

    pub fn generated_description(&self) -> &'static str {
        match self {
            ArtifactKind::SprintPlan => "Sprint plan generated successfully",
            ArtifactKind::RiskAssessment => "Risk assessment generated successfully",
        }
    }
}

/// Read an identifier that the backend may send as a string or a number
pub(crate) fn id_value(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Statement of Work attached to an artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SowReference {
    pub content: String,
    pub file_name: String,
    pub is_html: bool,
}

pub const DEFAULT_SOW_NAME: &str = "Uploaded SOW";

impl SowReference {
    /// Load the SOW handed over through session storage. HTML wins over raw
    /// text; `None` when neither is present.
    pub fn from_store<S: KeyValueStore>(store: &S) -> Result<Option<Self>> {
        let non_empty = |key: &str| -> Result<Option<String>> {
            Ok(store.get(key)?.filter(|v| !v.is_empty()))
        };
        let html = non_empty(keys::SOW_CONTENT_HTML)?;
        let is_html = html.is_some();
        let Some(content) = html.or(non_empty(keys::SOW_CONTENT_RAW)?) else {
            return Ok(None);
        };
        let file_name =
            non_empty(keys::SOW_FILE_NAME)?.unwrap_or_else(|| DEFAULT_SOW_NAME.to_string());
        Ok(Some(Self {
            content,
            file_name,
            is_html,
        }))
    }

    /// Persist an uploaded SOW for later pages. Raw text is always kept;
    /// HTML replaces any previous HTML or is cleared when absent.
    pub fn store_upload<S: KeyValueStore>(
        store: &S,
        raw_text: &str,
        html: Option<&str>,
        file_name: &str,
    ) -> Result<Self> {
        store.set(keys::SOW_CONTENT_RAW, raw_text)?;
        store.set(keys::SOW_FILE_NAME, file_name)?;
        match html.filter(|h| !h.is_empty()) {
            Some(html) => {
                store.set(keys::SOW_CONTENT_HTML, html)?;
                Ok(Self {
                    content: html.to_string(),
                    file_name: file_name.to_string(),
                    is_html: true,
                })
            }
            None => {
                store.remove(keys::SOW_CONTENT_HTML)?;
                Ok(Self {
                    content: raw_text.to_string(),
                    file_name: file_name.to_string(),
                    is_html: false,
                })
            }
        }
    }

    pub fn clear<S: KeyValueStore>(store: &S) -> Result<()> {
        store.remove(keys::SOW_CONTENT_HTML)?;
        store.remove(keys::SOW_CONTENT_RAW)?;
        store.remove(keys::SOW_FILE_NAME)
    }
}

/// A generated sprint plan or risk assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedArtifact {
    pub kind: ArtifactKind,
    pub id: Option<String>,
    /// HTML fragment
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Frozen copy of the request that produced the artifact
    pub source_inputs: Value,
    pub attached_reference: Option<SowReference>,
}

impl GeneratedArtifact {
    /// Build from a successful generation response
    pub fn from_response(
        kind: ArtifactKind,
        body: &Value,
        source_inputs: Value,
        attached_reference: Option<SowReference>,
    ) -> Self {
        let id = id_value(body.get(kind.id_field())).or_else(|| id_value(body.get("id")));
        let content = ["response", "summary", "word_document"]
            .iter()
            .filter_map(|k| body.get(*k).and_then(Value::as_str))
            .find(|s| !s.is_empty())
            .unwrap_or_default()
            .to_string();
        Self {
            kind,
            id,
            content,
            created_at: Utc::now(),
            source_inputs,
            attached_reference,
        }
    }

    /// Value shown in titles and filenames: the sprint number or the
    /// project name from the source inputs.
    pub fn display_key(&self) -> Option<String> {
        let value = match self.kind {
            ArtifactKind::SprintPlan => self.source_inputs.pointer("/sprint_overview/SprintNumber"),
            ArtifactKind::RiskAssessment => {
                self.source_inputs.pointer("/project_overview/ProjectName")
            }
        };
        value
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}
