//! Append-only version history for a generated document

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::artifact::ArtifactKind;
use crate::error::{PortalError, Result};

pub type VersionNumber = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VersionAction {
    InitialGeneration,
    ManualEdit,
    CommentEdit,
    SowRegeneration,
}

impl VersionAction {
    /// Label shown in the version list
    pub fn label(&self) -> &'static str {
        match self {
            VersionAction::InitialGeneration => "Initial Generation",
            VersionAction::ManualEdit => "Manual Edit",
            VersionAction::CommentEdit => "Comment Edit",
            VersionAction::SowRegeneration => "SOW Regeneration",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRecord {
    pub version_number: VersionNumber,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub action: VersionAction,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionHistory {
    versions: Vec<VersionRecord>,
    current: VersionNumber,
}

impl VersionHistory {
    /// History holding version 1 for freshly generated content
    pub fn initial(kind: ArtifactKind, content: &str) -> Self {
        Self {
            versions: vec![VersionRecord {
                version_number: 1,
                content: content.to_string(),
                timestamp: Utc::now(),
                action: VersionAction::InitialGeneration,
                description: kind.generated_description().to_string(),
            }],
            current: 1,
        }
    }

    /// Append a version and make it current. Returns the new number.
    pub fn add(&mut self, content: &str, action: VersionAction, description: &str) -> VersionNumber {
        let number = self
            .versions
            .last()
            .map_or(1, |v| v.version_number + 1);
        self.versions.push(VersionRecord {
            version_number: number,
            content: content.to_string(),
            timestamp: Utc::now(),
            action,
            description: description.to_string(),
        });
        self.current = number;
        number
    }

    /// Append only when `content` differs from `previous`
    pub fn add_if_changed(
        &mut self,
        previous: &str,
        content: &str,
        action: VersionAction,
        description: &str,
    ) -> Option<VersionNumber> {
        if previous == content {
            return None;
        }
        Some(self.add(content, action, description))
    }

    /// Content of version `number` as an owned copy; moves the pointer there
    pub fn restore(&mut self, number: VersionNumber) -> Result<String> {
        let content = self
            .get(number)
            .map(|v| v.content.clone())
            .ok_or_else(|| PortalError::NotFound(format!("Version {} not found", number)))?;
        self.current = number;
        Ok(content)
    }

    pub fn get(&self, number: VersionNumber) -> Option<&VersionRecord> {
        self.versions.iter().find(|v| v.version_number == number)
    }

    pub fn versions(&self) -> &[VersionRecord] {
        &self.versions
    }

    pub fn current(&self) -> VersionNumber {
        self.current
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
