//! Sprint plan importers: parsed DOCX documents and Excel workbooks

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{
    docx_notice, excel_notice, has_content, lines_or_na, loose_number, loose_text, text_or_na,
    ImportOutcome, ParsedPayload, NOT_AVAILABLE,
};
use crate::config::PortalConfig;
use crate::forms::sprint::{SprintOverview, SprintPlanForm, SprintSection, TeamMember};
use crate::forms::BacklogItem;

/// `sprintPlan` object produced by the structured document parser
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StructuredSprintPlan {
    pub sprint_overview: Option<Value>,
    pub team_capacity: Option<Value>,
    pub product_backlog: Option<Value>,
    pub definition_of_done: Option<Value>,
    pub risks_and_impediments: Option<Value>,
}

/// Flat snake_case layout of older document exports
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LegacySprintPlan {
    pub sprint_overview: Option<Value>,
    pub team_capacity: Option<Value>,
    pub product_backlog: Option<Value>,
    pub definition_of_done: Option<Value>,
    pub risks_and_impediments: Option<Value>,
    pub additional_comments: Option<Value>,
}

impl LegacySprintPlan {
    fn is_empty(&self) -> bool {
        self == &LegacySprintPlan::default()
    }
}

pub type SprintDocument = ParsedPayload<StructuredSprintPlan, LegacySprintPlan>;

const OVERVIEW_CAMEL: [&str; 5] = [
    "sprintNumber",
    "sprintDates",
    "sprintDuration",
    "teamName",
    "sprintGoal",
];

const OVERVIEW_PASCAL: [&str; 5] = [
    "SprintNumber",
    "SprintDates",
    "SprintDuration",
    "TeamName",
    "SprintGoal",
];

lazy_static! {
    static ref OVERVIEW_LABELS: [Regex; 5] = [
        Regex::new(r"(?i)Sprint\s+Number[:\s]*([^\n]+)").unwrap(),
        Regex::new(r"(?i)Sprint\s+Dates?[:\s]*([^\n]+)").unwrap(),
        Regex::new(r"(?i)Sprint\s+Duration[:\s]*([^\n]+)").unwrap(),
        Regex::new(r"(?i)Team\s+Name[:\s]*([^\n]+)").unwrap(),
        Regex::new(r"(?i)Sprint\s+Goal[:\s]*([^\n]+)").unwrap(),
    ];
}

/// Decide which layout a parsed DOCX payload uses
pub fn classify_sprint_document(payload: &Value) -> SprintDocument {
    if let Some(plan) = payload.get("sprintPlan") {
        return ParsedPayload::Structured(serde_json::from_value(plan.clone()).unwrap_or_default());
    }
    let legacy: LegacySprintPlan = serde_json::from_value(payload.clone()).unwrap_or_default();
    if legacy.is_empty() {
        if let Some(text) = payload.get("raw_text").and_then(Value::as_str) {
            return ParsedPayload::Unparsed(text.to_string());
        }
    }
    ParsedPayload::Legacy(legacy)
}

/// Populate a fresh sprint form from a parsed DOCX payload
pub fn import_sprint_document(payload: &Value, config: &PortalConfig) -> ImportOutcome<SprintPlanForm> {
    let document = classify_sprint_document(payload);
    debug!("Importing {} sprint document", document.kind());
    let (form, touched) = match document {
        ParsedPayload::Structured(plan) => from_structured(&plan),
        ParsedPayload::Legacy(plan) => from_legacy(&plan),
        ParsedPayload::Unparsed(text) => from_raw_text(&text),
    };
    ImportOutcome {
        form,
        touched,
        notice: docx_notice(config),
    }
}

fn overview_from(value: &Value, keys: [&str; 5]) -> SprintOverview {
    let [number, dates, duration, team, goal] = keys.map(|k| text_or_na(value.get(k)));
    SprintOverview {
        sprint_number: number,
        sprint_dates: dates,
        sprint_duration: duration,
        team_name: team,
        sprint_goal: goal,
    }
}

fn set_members(form: &mut SprintPlanForm, members: Vec<TeamMember>) {
    if members.is_empty() {
        return;
    }
    let capacity = &mut form.team_capacity;
    capacity.number_of_members = members.len().to_string();
    capacity.team_members = members;
}

fn set_backlog(form: &mut SprintPlanForm, items: Vec<BacklogItem>) {
    if !items.is_empty() {
        form.product_backlog.backlog_items = items;
    }
}

fn as_array(value: Option<&Value>) -> Option<&Vec<Value>> {
    value.and_then(Value::as_array)
}

fn from_structured(plan: &StructuredSprintPlan) -> (SprintPlanForm, Vec<SprintSection>) {
    let mut form = SprintPlanForm::default();
    let mut touched = Vec::new();

    if let Some(overview) = &plan.sprint_overview {
        form.sprint_overview = overview_from(overview, OVERVIEW_CAMEL);
        touched.push(SprintSection::Overview);
    }

    if let Some(capacity) = &plan.team_capacity {
        form.team_capacity.total_hours_per_person = text_or_na(capacity.get("totalHoursPerPerson"));
        form.team_capacity.historical_story_points =
            text_or_na(capacity.get("historicalStoryPoints"));
        if let Some(members) = as_array(capacity.get("teamMembers")) {
            let members = members
                .iter()
                .zip(1..)
                .map(|(m, id)| {
                    let role = loose_text(m.get("name"))
                        .or_else(|| loose_text(m.get("role")))
                        .unwrap_or_else(|| NOT_AVAILABLE.to_string());
                    let hours = loose_text(m.get("workingHours"))
                        .map(|h| format!("{}h", h))
                        .unwrap_or_else(|| NOT_AVAILABLE.to_string());
                    TeamMember::new(id, &role, &hours)
                })
                .collect();
            set_members(&mut form, members);
        }
        touched.push(SprintSection::TeamCapacity);
    }

    if let Some(items) = plan
        .product_backlog
        .as_ref()
        .and_then(|b| as_array(b.get("backlogItems")))
    {
        let items = items
            .iter()
            .zip(1..)
            .map(|(item, id)| BacklogItem {
                id,
                user_story_summary: text_or_na(item.get("userStorySummary")),
                acceptance_criteria: lines_or_na(item.get("acceptanceCriteria")),
                priority: loose_text(item.get("priority")).unwrap_or_else(|| "Low".to_string()),
                effort_estimate: loose_number(item.get("effortEstimateHours")),
            })
            .collect();
        set_backlog(&mut form, items);
        touched.push(SprintSection::ProductBacklog);
    }

    if let Some(dod @ Value::Array(_)) = &plan.definition_of_done {
        form.definition_of_done.content = lines_or_na(Some(dod));
        touched.push(SprintSection::DefinitionOfDone);
    }

    if let Some(risks @ Value::Array(_)) = &plan.risks_and_impediments {
        form.risks_and_impediments.content = lines_or_na(Some(risks));
        touched.push(SprintSection::RisksAndImpediments);
    }

    (form, touched)
}

/// `role: hours` per line
fn parse_member_lines(details: &str) -> Vec<TeamMember> {
    details
        .lines()
        .filter(|line| !line.trim().is_empty())
        .zip(1..)
        .map(|(line, id)| {
            let (role, hours) = line.split_once(':').unwrap_or((line, ""));
            let or_na = |s: &str| {
                let s = s.trim();
                if s.is_empty() {
                    NOT_AVAILABLE.to_string()
                } else {
                    s.to_string()
                }
            };
            TeamMember::new(id, &or_na(role), &or_na(hours))
        })
        .collect()
}

fn from_legacy(plan: &LegacySprintPlan) -> (SprintPlanForm, Vec<SprintSection>) {
    let mut form = SprintPlanForm::default();
    let mut touched = Vec::new();

    if let Some(overview) = &plan.sprint_overview {
        form.sprint_overview = overview_from(overview, OVERVIEW_PASCAL);
        touched.push(SprintSection::Overview);
    }

    if let Some(capacity) = &plan.team_capacity {
        form.team_capacity.total_hours_per_person = text_or_na(capacity.get("TotalHoursPerPerson"));
        if let Some(details) = capacity.get("TeamMemberDetails").and_then(Value::as_str) {
            set_members(&mut form, parse_member_lines(details));
        }
        touched.push(SprintSection::TeamCapacity);
    }

    if let Some(backlog) = &plan.product_backlog {
        match backlog.get("BacklogItems") {
            Some(Value::Array(items)) => {
                let items = items
                    .iter()
                    .zip(1..)
                    .map(|(item, id)| {
                        let parsed: BacklogItem =
                            serde_json::from_value(item.clone()).unwrap_or_default();
                        BacklogItem { id, ..parsed }
                    })
                    .collect();
                set_backlog(&mut form, items);
                touched.push(SprintSection::ProductBacklog);
            }
            Some(Value::String(text)) => {
                let items = text
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .zip(1..)
                    .map(|(line, id)| BacklogItem {
                        id,
                        user_story_summary: line.to_string(),
                        acceptance_criteria: NOT_AVAILABLE.to_string(),
                        priority: "Low".to_string(),
                        effort_estimate: 0.0,
                    })
                    .collect();
                set_backlog(&mut form, items);
                touched.push(SprintSection::ProductBacklog);
            }
            _ => debug!("Legacy backlog has no items"),
        }
    }

    let legacy_text = |section: &Option<Value>, key: &str| {
        section
            .as_ref()
            .and_then(|s| s.get(key))
            .and_then(|v| loose_text(Some(v)))
    };
    if let Some(text) = legacy_text(&plan.definition_of_done, "DefinitionOfDone") {
        form.definition_of_done.content = text;
        touched.push(SprintSection::DefinitionOfDone);
    }
    if let Some(text) = legacy_text(&plan.risks_and_impediments, "RisksAndImpediments") {
        form.risks_and_impediments.content = text;
        touched.push(SprintSection::RisksAndImpediments);
    }
    if let Some(text) = legacy_text(&plan.additional_comments, "AdditionalComments") {
        form.additional_comments.content = text;
        touched.push(SprintSection::AdditionalComments);
    }

    (form, touched)
}

/// Last resort: pick overview fields out of the document text by label
fn from_raw_text(text: &str) -> (SprintPlanForm, Vec<SprintSection>) {
    let mut form = SprintPlanForm::default();
    let found = OVERVIEW_LABELS
        .iter()
        .map(|re| re.captures(text).map(|c| c[1].trim().to_string()))
        .collect::<Vec<_>>();
    if found.iter().all(Option::is_none) {
        debug!("No sprint fields recognised in document text");
        return (form, Vec::new());
    }
    let mut values = found
        .into_iter()
        .map(|v| v.unwrap_or_else(|| NOT_AVAILABLE.to_string()));
    let mut next = || values.next().unwrap_or_else(|| NOT_AVAILABLE.to_string());
    form.sprint_overview = SprintOverview {
        sprint_number: next(),
        sprint_dates: next(),
        sprint_duration: next(),
        team_name: next(),
        sprint_goal: next(),
    };
    (form, vec![SprintSection::Overview])
}

/// Populate a fresh sprint form from a parsed Excel workbook
pub fn import_sprint_workbook(payload: &Value, config: &PortalConfig) -> ImportOutcome<SprintPlanForm> {
    let mut form = SprintPlanForm::default();

    if let Some(overview) = payload.get("sprintOverview") {
        form.sprint_overview = overview_from(overview, OVERVIEW_CAMEL);
    }

    if let Some(capacity) = payload.get("teamCapacity") {
        form.team_capacity.total_hours_per_person = text_or_na(capacity.get("totalHoursPerPerson"));
        form.team_capacity.historical_story_points =
            text_or_na(capacity.get("historicalStoryPoints"));
        if let Some(members) = as_array(capacity.get("teamMembers")) {
            let members = members
                .iter()
                .zip(1..)
                .map(|(m, id)| {
                    TeamMember::new(
                        id,
                        &text_or_na(m.get("role")),
                        &text_or_na(m.get("workingHours")),
                    )
                })
                .collect();
            set_members(&mut form, members);
        }
    }

    if let Some(stories) = payload
        .get("productBacklog")
        .and_then(|b| as_array(b.get("userStories")))
    {
        let items = stories
            .iter()
            .zip(1..)
            .map(|(story, id)| BacklogItem {
                id,
                user_story_summary: text_or_na(story.get("userStorySummary")),
                acceptance_criteria: text_or_na(story.get("acceptanceCriteria")),
                priority: loose_text(story.get("priority")).unwrap_or_else(|| "Low".to_string()),
                effort_estimate: loose_number(story.get("effortEstimate")).trunc(),
            })
            .collect();
        set_backlog(&mut form, items);
    }

    if let Some(dod) = payload.get("definitionOfDone").and_then(|d| d.get("definitionOfDone")) {
        form.definition_of_done.content = lines_or_na(Some(dod));
    }
    if let Some(risks) = payload.get("risksImpediments").and_then(|r| r.get("risksImpediments")) {
        form.risks_and_impediments.content = lines_or_na(Some(risks));
    }
    if let Some(comments) = payload
        .get("additionalComments")
        .and_then(|c| c.get("additionalComments"))
    {
        form.additional_comments.content = text_or_na(Some(comments));
    }

    let touched = [
        ("sprintOverview", SprintSection::Overview),
        ("teamCapacity", SprintSection::TeamCapacity),
        ("productBacklog", SprintSection::ProductBacklog),
        ("definitionOfDone", SprintSection::DefinitionOfDone),
        ("risksImpediments", SprintSection::RisksAndImpediments),
        ("additionalComments", SprintSection::AdditionalComments),
    ]
    .into_iter()
    .filter(|(key, _)| has_content(payload.get(*key)))
    .map(|(_, section)| section)
    .collect();

    ImportOutcome {
        form,
        touched,
        notice: excel_notice(config),
    }
}
