//! Request bodies for the two generation endpoints

use serde::Serialize;
use serde_json::{json, Value};

use super::{GenerationTarget, PayloadContext};
use crate::artifact::ArtifactKind;
use crate::error::Result;
use crate::forms::risk::{RiskAssessmentForm, RiskRecord};
use crate::forms::SprintPlanForm;
use crate::generation::progress::{risk_stages, sprint_stages, ProgressStage};

impl GenerationTarget for SprintPlanForm {
    const KIND: ArtifactKind = ArtifactKind::SprintPlan;

    fn build_payload(&self, ctx: &PayloadContext) -> Result<Value> {
        Ok(json!({
            "sprint_overview": serde_json::to_value(&self.sprint_overview)?,
            "team_capacity": serde_json::to_value(&self.team_capacity)?,
            "product_backlog": serde_json::to_value(&self.product_backlog)?,
            "definition_of_done": serde_json::to_value(&self.definition_of_done)?,
            "risks_and_impediments": serde_json::to_value(&self.risks_and_impediments)?,
            "additional_comments": serde_json::to_value(&self.additional_comments)?,
            "sow_content": ctx.sow_content(),
            "user_email": ctx.user_email,
        }))
    }

    fn progress_stages(&self) -> Vec<ProgressStage> {
        sprint_stages()
    }
}

fn or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

/// Per-risk row sent as `all_risks_data`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RiskRow<'a> {
    risk_id: String,
    summary: &'a str,
    description: &'a str,
    priority: &'a str,
    status: &'a str,
    assignee: &'a str,
    reporter: &'a str,
    created_date: &'a str,
    comments: &'a str,
    mitigation: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RiskCategory<'a> {
    category_name: String,
    description: &'a str,
    severity: &'a str,
    priority: &'a str,
    status: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct Stakeholder {
    name: String,
    role: &'static str,
    responsibility: String,
}

fn matrix_entry(risk: &RiskRecord) -> String {
    format!(
        "Risk ID: {}\nSummary: {}\nSeverity: {}\nStatus: {}\nPriority: {}\nAssignee: {}\nReporter: {}\nCreated: {}\nComments: {}\nMitigation: {}\n---\n",
        or(&risk.risk_id.value, "N/A"),
        risk.description.primary_source,
        or(&risk.severity.severity_value, "Medium"),
        or(&risk.status.value, "Open"),
        or(&risk.priority.value, "Medium"),
        risk.owner.primary_source,
        risk.owner.secondary_source,
        risk.date_identified.value,
        risk.comments.value,
        risk.custom_field.value,
    )
}

fn register_entry(risk: &RiskRecord) -> String {
    format!(
        "Risk ID: {}\nRisk Description: {}\nDetailed Description: {}\nPriority: {}\nStatus: {}\nAssignee: {}\nReporter: {}\nCreated Date: {}\nMitigation Plan: {}\nComments: {}\nNotes: {}\n---\n",
        or(&risk.risk_id.value, "N/A"),
        risk.description.primary_source,
        risk.severity.severity_value,
        or(&risk.priority.value, "Medium"),
        or(&risk.status.value, "Open"),
        risk.owner.primary_source,
        risk.owner.secondary_source,
        risk.date_identified.value,
        risk.custom_field.value,
        risk.comments.value,
        risk.relevant_notes.value,
    )
}

/// Owners then reporters, first occurrence of each name wins
fn stakeholders(risks: &[RiskRecord]) -> Vec<Stakeholder> {
    let mut all: Vec<Stakeholder> = Vec::new();
    for (index, risk) in risks.iter().enumerate() {
        let label = risk.label(index);
        let owner = &risk.owner.primary_source;
        let reporter = &risk.owner.secondary_source;
        if !owner.is_empty() {
            all.push(Stakeholder {
                name: owner.clone(),
                role: "Risk Owner",
                responsibility: format!("Risk management for {}", label),
            });
        }
        if !reporter.is_empty() && reporter != owner {
            all.push(Stakeholder {
                name: reporter.clone(),
                role: "Reporter",
                responsibility: format!("Risk reporting for {}", label),
            });
        }
    }

    let mut unique: Vec<Stakeholder> = Vec::new();
    for s in all {
        if !unique.iter().any(|u| u.name == s.name) {
            unique.push(s);
        }
    }
    if unique.is_empty() {
        unique.push(Stakeholder {
            name: "Risk Management Team".to_string(),
            role: "Risk Owner",
            responsibility: "Overall risk management and mitigation".to_string(),
        });
    }
    unique
}

fn joined_non_empty<'a>(values: impl Iterator<Item = &'a String>) -> String {
    values
        .filter(|v| !v.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n---\n")
}

impl GenerationTarget for RiskAssessmentForm {
    const KIND: ArtifactKind = ArtifactKind::RiskAssessment;

    fn build_payload(&self, ctx: &PayloadContext) -> Result<Value> {
        let risks = self.risks();
        let primary = &risks[0];
        let count = risks.len();

        let rows: Vec<RiskRow> = risks
            .iter()
            .enumerate()
            .map(|(i, r)| RiskRow {
                risk_id: if r.risk_id.value.is_empty() {
                    format!("Risk-{}", i + 1)
                } else {
                    r.risk_id.value.clone()
                },
                summary: &r.description.primary_source,
                description: &r.severity.severity_value,
                priority: or(&r.priority.value, "Medium"),
                status: or(&r.status.value, "Open"),
                assignee: &r.owner.primary_source,
                reporter: &r.owner.secondary_source,
                created_date: &r.date_identified.value,
                comments: &r.comments.value,
                mitigation: &r.custom_field.value,
            })
            .collect();

        let categories: Vec<RiskCategory> = risks
            .iter()
            .enumerate()
            .map(|(i, r)| RiskCategory {
                category_name: r.label(i),
                description: or(&r.description.primary_source, "Risk identified"),
                severity: or(&r.severity.severity_value, "Medium"),
                priority: or(&r.priority.value, "Medium"),
                status: or(&r.status.value, "Open"),
            })
            .collect();

        let today = ctx.today.format("%Y-%m-%d").to_string();

        Ok(json!({
            "project_overview": {
                "ProjectName": or(&primary.risk_id.value, "Multi-Risk Assessment Project"),
                "ProjectDates": or(&primary.date_identified.value, &today),
                "ProjectDuration": "Multi-Risk Assessment",
                "TeamName": "Risk Management Team",
                "ProjectScope": format!("Comprehensive risk assessment for {} identified risks", count),
            },
            "risk_categories": {
                "RiskCategories": serde_json::to_value(&categories)?,
                "RiskMitigation": joined_non_empty(risks.iter().map(|r| &r.custom_field.value)),
                "RiskMonitoring": joined_non_empty(risks.iter().map(|r| &r.comments.value)),
            },
            "stakeholders": { "Stakeholders": serde_json::to_value(stakeholders(risks))? },
            "risk_matrix": {
                "RiskMatrixContent": risks.iter().map(matrix_entry).collect::<Vec<_>>().join("\n"),
            },
            "risk_register": {
                "RiskRegisterContent": risks.iter().map(register_entry).collect::<Vec<_>>().join("\n"),
            },
            "additional_comments": {
                "CommentsContent": format!(
                    "Comprehensive risk assessment covering {} risks. All risks have been analyzed and included in this assessment.",
                    count
                ),
            },
            "all_risks_data": serde_json::to_value(&rows)?,
            "sow_content": ctx.sow_content(),
            "user_email": ctx.user_email,
            "workspace_id": ctx.workspace_id,
        }))
    }

    fn progress_stages(&self) -> Vec<ProgressStage> {
        risk_stages(self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::SowReference;
    use crate::forms::risk::fixtures::complete_record;
    use crate::forms::sprint::fixtures::complete_form;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn ctx() -> PayloadContext {
        PayloadContext::new("pm@example.com")
            .with_today(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
    }

    #[test]
    fn test_sprint_payload_carries_every_section() {
        let payload = complete_form().build_payload(&ctx()).unwrap();
        assert_eq!(payload["sprint_overview"]["SprintNumber"], "12");
        assert_eq!(payload["team_capacity"]["NumberOfMembers"], "1");
        assert_eq!(payload["product_backlog"]["BacklogItems"][0]["effortEstimate"], 5.0);
        assert_eq!(payload["additional_comments"]["CommentsContent"], "None");
        assert_eq!(payload["sow_content"], Value::Null);
        assert_eq!(payload["user_email"], "pm@example.com");
    }

    #[test]
    fn test_sprint_payload_includes_sow() {
        let ctx = ctx().with_sow(Some(SowReference {
            content: "<p>SOW</p>".into(),
            file_name: "sow.docx".into(),
            is_html: true,
        }));
        let payload = complete_form().build_payload(&ctx).unwrap();
        assert_eq!(payload["sow_content"], "<p>SOW</p>");
    }

    #[test]
    fn test_risk_payload_derivations() {
        let mut second = complete_record("");
        second.owner.primary_source = "Dana".into();
        second.owner.secondary_source = "Lee".into();
        second.custom_field.value.clear();
        let form = RiskAssessmentForm::from_records(vec![complete_record("R-1"), second]);
        let payload = form
            .build_payload(&ctx().with_workspace_id(Some(json!(3))))
            .unwrap();

        assert_eq!(payload["project_overview"]["ProjectName"], "R-1");
        assert_eq!(
            payload["project_overview"]["ProjectScope"],
            "Comprehensive risk assessment for 2 identified risks"
        );
        assert_eq!(payload["risk_categories"]["RiskCategories"][1]["categoryName"], "Risk 2");
        assert_eq!(
            payload["risk_categories"]["RiskMitigation"],
            "Weekly check-in with vendor"
        );
        assert_eq!(payload["risk_categories"]["RiskMonitoring"], "Escalated\n---\nEscalated");

        let stakeholders = payload["stakeholders"]["Stakeholders"].as_array().unwrap();
        assert_eq!(stakeholders.len(), 2);
        assert_eq!(stakeholders[0]["name"], "Dana");
        assert_eq!(stakeholders[1]["name"], "Lee");
        assert_eq!(stakeholders[1]["responsibility"], "Risk reporting for Risk 2");

        assert_eq!(payload["all_risks_data"][1]["riskId"], "Risk-2");
        assert!(payload["risk_matrix"]["RiskMatrixContent"]
            .as_str()
            .unwrap()
            .starts_with("Risk ID: R-1\nSummary: Vendor API may be late\n"));
        assert_eq!(payload["workspace_id"], 3);
    }

    #[test]
    fn test_risk_payload_defaults_when_sparse() {
        let form = RiskAssessmentForm::default();
        let payload = form.build_payload(&ctx()).unwrap();
        assert_eq!(payload["project_overview"]["ProjectName"], "Multi-Risk Assessment Project");
        assert_eq!(payload["project_overview"]["ProjectDates"], "2024-05-01");
        assert_eq!(
            payload["stakeholders"]["Stakeholders"][0]["name"],
            "Risk Management Team"
        );
        assert_eq!(payload["workspace_id"], Value::Null);
        assert!(payload["risk_register"]["RiskRegisterContent"]
            .as_str()
            .unwrap()
            .contains("Priority: Medium\nStatus: Open\n"));
    }
}
