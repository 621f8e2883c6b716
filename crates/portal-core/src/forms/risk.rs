//! Risk assessment form
//!
//! An assessment is an ordered list of [`RiskRecord`]s with a cursor. Section
//! edits, saves and resets act on the record under the cursor; generation
//! requires every record to be complete.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{any_field_filled, FormModel, SectionId};
use crate::error::{PortalError, Result};
use crate::storage::keys;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RiskSection {
    RiskId,
    Description,
    Severity,
    Priority,
    Status,
    Owner,
    DateIdentified,
    Comments,
    CustomField,
}

const REQUIRED_SECTIONS: [RiskSection; 9] = [
    RiskSection::RiskId,
    RiskSection::Description,
    RiskSection::Severity,
    RiskSection::Priority,
    RiskSection::Status,
    RiskSection::Owner,
    RiskSection::DateIdentified,
    RiskSection::Comments,
    RiskSection::CustomField,
];

impl SectionId for RiskSection {
    fn key(&self) -> &'static str {
        match self {
            RiskSection::RiskId => "RiskID",
            RiskSection::Description => "RiskDescription",
            RiskSection::Severity => "Severity",
            RiskSection::Priority => "Priority",
            RiskSection::Status => "Status",
            RiskSection::Owner => "RiskOwner",
            RiskSection::DateIdentified => "DateIdentified",
            RiskSection::Comments => "Comments",
            RiskSection::CustomField => "CustomField",
        }
    }

    fn display_name(&self) -> &'static str {
        match self {
            RiskSection::RiskId => "Risk ID",
            RiskSection::Description => "Risk Description",
            RiskSection::Severity => "Severity",
            RiskSection::Priority => "Priority",
            RiskSection::Status => "Status",
            RiskSection::Owner => "Risk Owner",
            RiskSection::DateIdentified => "Date Identified",
            RiskSection::Comments => "Comments",
            RiskSection::CustomField => "Custom Field",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        REQUIRED_SECTIONS.iter().copied().find(|s| s.key() == key)
    }
}

/// Two-source text section (description, owner, mitigation)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SourcePair {
    pub primary_source: String,
    pub secondary_source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SeverityFields {
    pub source: String,
    pub alternative_source: String,
    pub severity_value: String,
}

macro_rules! single_value_section {
    ($name:ident, $field:literal) => {
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct $name {
            #[serde(rename = $field)]
            pub value: String,
        }

        impl $name {
            pub fn new(value: &str) -> Self {
                Self {
                    value: value.to_string(),
                }
            }
        }
    };
}

single_value_section!(RiskIdField, "RiskIDValue");
single_value_section!(StatusField, "StatusValue");
single_value_section!(DateIdentifiedField, "DateIdentifiedValue");
single_value_section!(RelevantNotesField, "RelevantNotesValue");
single_value_section!(CommentsField, "CommentsValue");
single_value_section!(CustomFieldField, "CustomFieldValue");
single_value_section!(PriorityField, "PriorityValue");

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskRecord {
    #[serde(rename = "RiskID")]
    pub risk_id: RiskIdField,
    #[serde(rename = "RiskDescription")]
    pub description: SourcePair,
    #[serde(rename = "Severity")]
    pub severity: SeverityFields,
    #[serde(rename = "Status")]
    pub status: StatusField,
    #[serde(rename = "RiskOwner")]
    pub owner: SourcePair,
    #[serde(rename = "DateIdentified")]
    pub date_identified: DateIdentifiedField,
    #[serde(rename = "MitigationPlan")]
    pub mitigation_plan: SourcePair,
    #[serde(rename = "RelevantNotes")]
    pub relevant_notes: RelevantNotesField,
    #[serde(rename = "Comments")]
    pub comments: CommentsField,
    #[serde(rename = "CustomField")]
    pub custom_field: CustomFieldField,
    #[serde(rename = "Priority")]
    pub priority: PriorityField,
}

impl RiskRecord {
    pub fn with_id(id: &str) -> Self {
        Self {
            risk_id: RiskIdField::new(id),
            ..Default::default()
        }
    }

    pub fn section_value(&self, section: RiskSection) -> Result<Value> {
        let value = match section {
            RiskSection::RiskId => serde_json::to_value(&self.risk_id)?,
            RiskSection::Description => serde_json::to_value(&self.description)?,
            RiskSection::Severity => serde_json::to_value(&self.severity)?,
            RiskSection::Priority => serde_json::to_value(&self.priority)?,
            RiskSection::Status => serde_json::to_value(&self.status)?,
            RiskSection::Owner => serde_json::to_value(&self.owner)?,
            RiskSection::DateIdentified => serde_json::to_value(&self.date_identified)?,
            RiskSection::Comments => serde_json::to_value(&self.comments)?,
            RiskSection::CustomField => serde_json::to_value(&self.custom_field)?,
        };
        Ok(value)
    }

    /// Complete when any field of the section has a non-blank value
    pub fn is_section_complete(&self, section: RiskSection) -> bool {
        self.section_value(section)
            .map(|v| any_field_filled(&v))
            .unwrap_or(false)
    }

    pub fn missing_sections(&self) -> Vec<RiskSection> {
        REQUIRED_SECTIONS
            .iter()
            .copied()
            .filter(|s| !self.is_section_complete(*s))
            .collect()
    }

    /// Identifier shown in messages, falling back to the 1-based position
    pub fn label(&self, index: usize) -> String {
        if self.risk_id.value.trim().is_empty() {
            format!("Risk {}", index + 1)
        } else {
            self.risk_id.value.clone()
        }
    }

    fn set_field(&mut self, section: RiskSection, key: &str, value: &str) {
        let slot = match (section, key) {
            (RiskSection::RiskId, "RiskIDValue") => &mut self.risk_id.value,
            (RiskSection::Description, "PrimarySource") => &mut self.description.primary_source,
            (RiskSection::Description, "SecondarySource") => {
                &mut self.description.secondary_source
            }
            (RiskSection::Severity, "Source") => &mut self.severity.source,
            (RiskSection::Severity, "AlternativeSource") => &mut self.severity.alternative_source,
            (RiskSection::Severity, "SeverityValue") => &mut self.severity.severity_value,
            (RiskSection::Priority, "PriorityValue") => &mut self.priority.value,
            (RiskSection::Status, "StatusValue") => &mut self.status.value,
            (RiskSection::Owner, "PrimarySource") => &mut self.owner.primary_source,
            (RiskSection::Owner, "SecondarySource") => &mut self.owner.secondary_source,
            (RiskSection::DateIdentified, "DateIdentifiedValue") => &mut self.date_identified.value,
            (RiskSection::Comments, "CommentsValue") => &mut self.comments.value,
            (RiskSection::CustomField, "CustomFieldValue") => &mut self.custom_field.value,
            _ => {
                debug!("Ignoring unknown field {}.{}", section.key(), key);
                return;
            }
        };
        *slot = value.to_string();
    }

    fn load_section_value(&mut self, section: RiskSection, value: Value) -> Result<()> {
        match section {
            RiskSection::RiskId => self.risk_id = serde_json::from_value(value)?,
            RiskSection::Description => self.description = serde_json::from_value(value)?,
            RiskSection::Severity => self.severity = serde_json::from_value(value)?,
            RiskSection::Priority => self.priority = serde_json::from_value(value)?,
            RiskSection::Status => self.status = serde_json::from_value(value)?,
            RiskSection::Owner => self.owner = serde_json::from_value(value)?,
            RiskSection::DateIdentified => self.date_identified = serde_json::from_value(value)?,
            RiskSection::Comments => self.comments = serde_json::from_value(value)?,
            RiskSection::CustomField => self.custom_field = serde_json::from_value(value)?,
        }
        Ok(())
    }

    fn reset_section(&mut self, section: RiskSection) {
        match section {
            RiskSection::RiskId => self.risk_id = RiskIdField::default(),
            RiskSection::Description => self.description = SourcePair::default(),
            RiskSection::Severity => self.severity = SeverityFields::default(),
            RiskSection::Priority => self.priority = PriorityField::default(),
            RiskSection::Status => self.status = StatusField::default(),
            RiskSection::Owner => self.owner = SourcePair::default(),
            RiskSection::DateIdentified => self.date_identified = DateIdentifiedField::default(),
            RiskSection::Comments => self.comments = CommentsField::default(),
            RiskSection::CustomField => self.custom_field = CustomFieldField::default(),
        }
    }
}

/// `RISK-001`, `RISK-002`, ...
pub fn risk_id_for(position: usize) -> String {
    format!("RISK-{:03}", position)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawAssessmentForm")]
pub struct RiskAssessmentForm {
    risks: Vec<RiskRecord>,
    current_risk_index: usize,
}

/// Unchecked wire shape; normalised so the list is never empty and the
/// cursor is always in range.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawAssessmentForm {
    risks: Vec<RiskRecord>,
    current_risk_index: usize,
}

impl Default for RawAssessmentForm {
    fn default() -> Self {
        Self {
            risks: Vec::new(),
            current_risk_index: 0,
        }
    }
}

impl From<RawAssessmentForm> for RiskAssessmentForm {
    fn from(raw: RawAssessmentForm) -> Self {
        let mut form = RiskAssessmentForm::from_records(raw.risks);
        form.switch_to(raw.current_risk_index);
        form
    }
}

impl Default for RiskAssessmentForm {
    fn default() -> Self {
        Self {
            risks: vec![RiskRecord::default()],
            current_risk_index: 0,
        }
    }
}

impl RiskAssessmentForm {
    /// Build from imported records. An empty list still yields one record.
    pub fn from_records(risks: Vec<RiskRecord>) -> Self {
        if risks.is_empty() {
            return Self::default();
        }
        Self {
            risks,
            current_risk_index: 0,
        }
    }

    pub fn risks(&self) -> &[RiskRecord] {
        &self.risks
    }

    pub fn len(&self) -> usize {
        self.risks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.risks.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current_risk_index
    }

    pub fn current(&self) -> &RiskRecord {
        &self.risks[self.current_risk_index]
    }

    pub fn current_mut(&mut self) -> &mut RiskRecord {
        &mut self.risks[self.current_risk_index]
    }

    /// Append a fresh record numbered after the list length and select it
    pub fn add_record(&mut self) -> usize {
        let record = RiskRecord::with_id(&risk_id_for(self.risks.len() + 1));
        self.risks.push(record);
        self.current_risk_index = self.risks.len() - 1;
        self.current_risk_index
    }

    /// Remove the record under the cursor. The cursor moves to the
    /// previous record (or stays at 0).
    pub fn remove_record(&mut self) -> Result<()> {
        if self.risks.len() <= 1 {
            return Err(PortalError::CannotRemoveLastRecord);
        }
        let index = self.current_risk_index;
        self.risks.remove(index);
        self.current_risk_index = index.saturating_sub(1);
        Ok(())
    }

    /// Move the cursor; out-of-range indices are ignored
    pub fn switch_to(&mut self, index: usize) -> bool {
        if index < self.risks.len() {
            self.current_risk_index = index;
            true
        } else {
            false
        }
    }
}

impl FormModel for RiskAssessmentForm {
    type Section = RiskSection;

    const STORAGE_KEY: &'static str = keys::RISK_ASSESSMENT_DATA;
    const GENERATED_FLAG: &'static str = keys::RISK_ASSESSMENT_GENERATED;

    fn sections() -> &'static [RiskSection] {
        &REQUIRED_SECTIONS
    }

    fn is_section_complete(&self, section: RiskSection) -> bool {
        self.current().is_section_complete(section)
    }

    fn set_field(&mut self, section: RiskSection, key: &str, value: &str) {
        self.current_mut().set_field(section, key, value);
    }

    fn section_value(&self, section: RiskSection) -> Result<Value> {
        self.current().section_value(section)
    }

    fn load_section_value(&mut self, section: RiskSection, value: Value) -> Result<()> {
        self.current_mut().load_section_value(section, value)
    }

    fn reset_section(&mut self, section: RiskSection) {
        self.current_mut().reset_section(section);
    }

    /// A single risk lists its missing sections; several risks collapse into
    /// one `Incomplete risks: ...` line.
    fn missing_sections(&self) -> Vec<String> {
        if self.risks.len() == 1 {
            return self.risks[0]
                .missing_sections()
                .iter()
                .map(|s| s.display_name().to_string())
                .collect();
        }

        let incomplete: Vec<String> = self
            .risks
            .iter()
            .enumerate()
            .filter_map(|(i, risk)| {
                let missing = risk.missing_sections();
                if missing.is_empty() {
                    return None;
                }
                let names: Vec<&str> = missing.iter().map(|s| s.display_name()).collect();
                Some(format!("{} ({})", risk.label(i), names.join(", ")))
            })
            .collect();

        if incomplete.is_empty() {
            Vec::new()
        } else {
            vec![format!("Incomplete risks: {}", incomplete.join("; "))]
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::complete_record;
    use super::*;
    use crate::forms::FormDocument;
    use crate::storage::MemoryStore;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_record_is_incomplete_everywhere() {
        let form = RiskAssessmentForm::default();
        for section in RiskAssessmentForm::sections() {
            assert!(!form.is_section_complete(*section));
        }
        assert_eq!(form.missing_sections().len(), 9);
    }

    #[test]
    fn test_any_field_completes_section() {
        let mut form = RiskAssessmentForm::default();
        form.set_field(RiskSection::Owner, "SecondarySource", "Reporter");
        assert!(form.is_section_complete(RiskSection::Owner));
        form.set_field(RiskSection::Owner, "SecondarySource", "  ");
        assert!(!form.is_section_complete(RiskSection::Owner));
    }

    #[test]
    fn test_remove_last_record_is_refused() {
        let mut form = RiskAssessmentForm::default();
        assert_eq!(form.remove_record(), Err(PortalError::CannotRemoveLastRecord));
        assert_eq!(form.len(), 1);
    }

    #[test]
    fn test_add_twice_then_remove_moves_cursor_back() {
        let mut form = RiskAssessmentForm::default();
        form.add_record();
        let idx = form.add_record();
        assert_eq!(idx, 2);
        assert_eq!(form.len(), 3);
        assert_eq!(form.current().risk_id.value, "RISK-003");

        form.remove_record().unwrap();
        assert_eq!(form.len(), 2);
        assert_eq!(form.current_index(), 1);
    }

    #[test]
    fn test_remove_first_keeps_cursor_at_zero() {
        let mut form = RiskAssessmentForm::default();
        form.add_record();
        form.switch_to(0);
        form.remove_record().unwrap();
        assert_eq!(form.current_index(), 0);
        assert_eq!(form.current().risk_id.value, "RISK-002");
    }

    #[test]
    fn test_switch_out_of_range_is_noop() {
        let mut form = RiskAssessmentForm::default();
        form.add_record();
        assert!(!form.switch_to(5));
        assert_eq!(form.current_index(), 1);
        assert!(form.switch_to(0));
        assert_eq!(form.current_index(), 0);
    }

    #[test]
    fn test_edits_target_current_record() {
        let mut form = RiskAssessmentForm::from_records(vec![
            complete_record("R-1"),
            RiskRecord::with_id("R-2"),
        ]);
        form.switch_to(1);
        form.set_field(RiskSection::Status, "StatusValue", "Closed");
        assert_eq!(form.risks()[1].status.value, "Closed");
        assert_eq!(form.risks()[0].status.value, "Open");
    }

    #[test]
    fn test_multi_risk_missing_message() {
        let mut second = complete_record("");
        second.comments.value.clear();
        second.custom_field.value.clear();
        let form = RiskAssessmentForm::from_records(vec![complete_record("R-1"), second]);
        assert_eq!(
            form.missing_sections(),
            vec!["Incomplete risks: Risk 2 (Comments, Custom Field)".to_string()]
        );
    }

    #[test]
    fn test_multi_risk_complete() {
        let form = RiskAssessmentForm::from_records(vec![
            complete_record("R-1"),
            complete_record("R-2"),
        ]);
        assert!(form.missing_sections().is_empty());
    }

    #[test]
    fn test_from_empty_records_keeps_one() {
        let form = RiskAssessmentForm::from_records(Vec::new());
        assert_eq!(form.len(), 1);
    }

    #[test]
    fn test_record_serializes_with_section_keys() {
        let json = serde_json::to_value(complete_record("R-1")).unwrap();
        assert_eq!(json["RiskID"]["RiskIDValue"], "R-1");
        assert_eq!(json["RiskOwner"]["PrimarySource"], "Dana");
        assert_eq!(json["Severity"]["SeverityValue"], "High");
        assert_eq!(json["MitigationPlan"]["PrimarySource"], "");
    }

    #[test]
    fn test_save_and_restore_current_record_sections() {
        let store = MemoryStore::new();
        let mut doc = FormDocument::new(RiskAssessmentForm::from_records(vec![complete_record(
            "R-9",
        )]));
        doc.save_section(&store, RiskSection::RiskId).unwrap();
        doc.save_section(&store, RiskSection::Owner).unwrap();

        let restored = FormDocument::<RiskAssessmentForm>::restore(&store).unwrap();
        assert_eq!(restored.form().current().risk_id.value, "R-9");
        assert_eq!(restored.form().current().owner.primary_source, "Dana");
        assert!(restored.is_saved(RiskSection::Owner));
        assert!(!restored.is_section_complete(RiskSection::Status));
    }

    #[test]
    fn test_deserialize_normalises_cursor() {
        let form: RiskAssessmentForm =
            serde_json::from_str(r#"{"risks":[],"currentRiskIndex":4}"#).unwrap();
        assert_eq!(form.len(), 1);
        assert_eq!(form.current_index(), 0);
    }

    #[test]
    fn test_risk_id_padding() {
        assert_eq!(risk_id_for(1), "RISK-001");
        assert_eq!(risk_id_for(42), "RISK-042");
        assert_eq!(risk_id_for(1234), "RISK-1234");
    }
}
