//! Sprint planning form: six sections, field names as the backend expects them

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{FormModel, SectionId};
use crate::error::Result;
use crate::storage::keys;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SprintSection {
    Overview,
    TeamCapacity,
    ProductBacklog,
    DefinitionOfDone,
    RisksAndImpediments,
    AdditionalComments,
}

const ALL_SECTIONS: [SprintSection; 6] = [
    SprintSection::Overview,
    SprintSection::TeamCapacity,
    SprintSection::ProductBacklog,
    SprintSection::DefinitionOfDone,
    SprintSection::RisksAndImpediments,
    SprintSection::AdditionalComments,
];

impl SectionId for SprintSection {
    fn key(&self) -> &'static str {
        match self {
            SprintSection::Overview => "SprintOverview",
            SprintSection::TeamCapacity => "TeamCapacity",
            SprintSection::ProductBacklog => "ProductBacklog",
            SprintSection::DefinitionOfDone => "DefinitionOfDone",
            SprintSection::RisksAndImpediments => "RisksAndImpediments",
            SprintSection::AdditionalComments => "AdditionalComments",
        }
    }

    fn display_name(&self) -> &'static str {
        match self {
            SprintSection::Overview => "Sprint Overview",
            SprintSection::TeamCapacity => "Team Capacity",
            SprintSection::ProductBacklog => "Product Backlog",
            SprintSection::DefinitionOfDone => "Definition of Done",
            SprintSection::RisksAndImpediments => "Risks & Impediments",
            SprintSection::AdditionalComments => "Additional Comments",
        }
    }

    fn from_key(key: &str) -> Option<Self> {
        ALL_SECTIONS.iter().copied().find(|s| s.key() == key)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SprintOverview {
    pub sprint_number: String,
    pub sprint_dates: String,
    pub sprint_duration: String,
    pub team_name: String,
    pub sprint_goal: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TeamMember {
    pub id: u64,
    pub role_name: String,
    pub working_hours: String,
}

impl TeamMember {
    pub fn new(id: u64, role_name: &str, working_hours: &str) -> Self {
        Self {
            id,
            role_name: role_name.to_string(),
            working_hours: working_hours.to_string(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.role_name.is_empty() && !self.working_hours.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TeamCapacity {
    pub total_hours_per_person: String,
    /// Kept in step with `team_members.len()` by the list helpers
    pub number_of_members: String,
    pub team_members: Vec<TeamMember>,
    pub historical_story_points: String,
}

impl Default for TeamCapacity {
    fn default() -> Self {
        Self {
            total_hours_per_person: String::new(),
            number_of_members: "1".to_string(),
            team_members: vec![TeamMember::new(1, "", "")],
            historical_story_points: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BacklogItem {
    pub id: u64,
    pub user_story_summary: String,
    pub acceptance_criteria: String,
    pub priority: String,
    pub effort_estimate: f64,
}

impl Default for BacklogItem {
    fn default() -> Self {
        Self {
            id: 1,
            user_story_summary: String::new(),
            acceptance_criteria: String::new(),
            priority: "Medium".to_string(),
            effort_estimate: 0.0,
        }
    }
}

impl BacklogItem {
    pub fn is_complete(&self) -> bool {
        !self.user_story_summary.is_empty()
            && !self.acceptance_criteria.is_empty()
            && self.effort_estimate > 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ProductBacklog {
    pub backlog_items: Vec<BacklogItem>,
}

impl Default for ProductBacklog {
    fn default() -> Self {
        Self {
            backlog_items: vec![BacklogItem::default()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefinitionOfDone {
    #[serde(rename = "DoDContent")]
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RisksAndImpediments {
    #[serde(rename = "RisksContent")]
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdditionalComments {
    #[serde(rename = "CommentsContent")]
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SprintPlanForm {
    pub sprint_overview: SprintOverview,
    pub team_capacity: TeamCapacity,
    pub product_backlog: ProductBacklog,
    pub definition_of_done: DefinitionOfDone,
    pub risks_and_impediments: RisksAndImpediments,
    pub additional_comments: AdditionalComments,
}

fn next_id<'a>(ids: impl Iterator<Item = &'a u64>) -> u64 {
    ids.max().copied().unwrap_or(0) + 1
}

impl SprintPlanForm {
    pub fn add_team_member(&mut self) -> u64 {
        let capacity = &mut self.team_capacity;
        let id = next_id(capacity.team_members.iter().map(|m| &m.id));
        capacity.team_members.push(TeamMember::new(id, "", ""));
        capacity.number_of_members = capacity.team_members.len().to_string();
        id
    }

    /// Remove a member; the last remaining member cannot be removed
    pub fn remove_team_member(&mut self, id: u64) -> bool {
        let capacity = &mut self.team_capacity;
        if capacity.team_members.len() <= 1 {
            return false;
        }
        let before = capacity.team_members.len();
        capacity.team_members.retain(|m| m.id != id);
        capacity.number_of_members = capacity.team_members.len().to_string();
        capacity.team_members.len() != before
    }

    pub fn update_team_member(&mut self, id: u64, field: &str, value: &str) -> bool {
        let Some(member) = self
            .team_capacity
            .team_members
            .iter_mut()
            .find(|m| m.id == id)
        else {
            return false;
        };
        match field {
            "roleName" => member.role_name = value.to_string(),
            "workingHours" => member.working_hours = value.to_string(),
            _ => return false,
        }
        true
    }

    pub fn add_backlog_item(&mut self) -> u64 {
        let items = &mut self.product_backlog.backlog_items;
        let id = next_id(items.iter().map(|i| &i.id));
        items.push(BacklogItem {
            id,
            ..BacklogItem::default()
        });
        id
    }

    pub fn remove_backlog_item(&mut self, id: u64) -> bool {
        let items = &mut self.product_backlog.backlog_items;
        if items.len() <= 1 {
            return false;
        }
        let before = items.len();
        items.retain(|i| i.id != id);
        items.len() != before
    }

    pub fn update_backlog_item(&mut self, id: u64, field: &str, value: &str) -> bool {
        let Some(item) = self
            .product_backlog
            .backlog_items
            .iter_mut()
            .find(|i| i.id == id)
        else {
            return false;
        };
        match field {
            "userStorySummary" => item.user_story_summary = value.to_string(),
            "acceptanceCriteria" => item.acceptance_criteria = value.to_string(),
            "priority" => item.priority = value.to_string(),
            "effortEstimate" => item.effort_estimate = value.trim().parse().unwrap_or(0.0),
            _ => return false,
        }
        true
    }

    /// Step an item's effort by `delta`, never below zero
    pub fn adjust_effort(&mut self, id: u64, delta: f64) -> Option<f64> {
        let item = self
            .product_backlog
            .backlog_items
            .iter_mut()
            .find(|i| i.id == id)?;
        item.effort_estimate = (item.effort_estimate + delta).max(0.0);
        Some(item.effort_estimate)
    }
}

impl FormModel for SprintPlanForm {
    type Section = SprintSection;

    const STORAGE_KEY: &'static str = keys::SPRINT_PLANNING_DATA;
    const GENERATED_FLAG: &'static str = keys::PLAN_GENERATED;

    fn sections() -> &'static [SprintSection] {
        &ALL_SECTIONS
    }

    fn is_section_complete(&self, section: SprintSection) -> bool {
        match section {
            SprintSection::Overview => {
                let o = &self.sprint_overview;
                [
                    &o.sprint_number,
                    &o.sprint_dates,
                    &o.sprint_duration,
                    &o.team_name,
                    &o.sprint_goal,
                ]
                .iter()
                .all(|v| !v.is_empty())
            }
            SprintSection::TeamCapacity => {
                let c = &self.team_capacity;
                !c.total_hours_per_person.is_empty()
                    && !c.historical_story_points.is_empty()
                    && c.team_members.iter().all(TeamMember::is_complete)
            }
            SprintSection::ProductBacklog => self
                .product_backlog
                .backlog_items
                .iter()
                .all(BacklogItem::is_complete),
            SprintSection::DefinitionOfDone => !self.definition_of_done.content.trim().is_empty(),
            SprintSection::RisksAndImpediments => {
                !self.risks_and_impediments.content.trim().is_empty()
            }
            SprintSection::AdditionalComments => {
                !self.additional_comments.content.trim().is_empty()
            }
        }
    }

    fn set_field(&mut self, section: SprintSection, key: &str, value: &str) {
        let value = value.to_string();
        let slot = match (section, key) {
            (SprintSection::Overview, "SprintNumber") => &mut self.sprint_overview.sprint_number,
            (SprintSection::Overview, "SprintDates") => &mut self.sprint_overview.sprint_dates,
            (SprintSection::Overview, "SprintDuration") => {
                &mut self.sprint_overview.sprint_duration
            }
            (SprintSection::Overview, "TeamName") => &mut self.sprint_overview.team_name,
            (SprintSection::Overview, "SprintGoal") => &mut self.sprint_overview.sprint_goal,
            (SprintSection::TeamCapacity, "TotalHoursPerPerson") => {
                &mut self.team_capacity.total_hours_per_person
            }
            (SprintSection::TeamCapacity, "HistoricalStoryPoints") => {
                &mut self.team_capacity.historical_story_points
            }
            (SprintSection::DefinitionOfDone, "DoDContent") => &mut self.definition_of_done.content,
            (SprintSection::RisksAndImpediments, "RisksContent") => {
                &mut self.risks_and_impediments.content
            }
            (SprintSection::AdditionalComments, "CommentsContent") => {
                &mut self.additional_comments.content
            }
            _ => {
                debug!("Ignoring unknown field {}.{}", section.key(), key);
                return;
            }
        };
        *slot = value;
    }

    fn section_value(&self, section: SprintSection) -> Result<Value> {
        let value = match section {
            SprintSection::Overview => serde_json::to_value(&self.sprint_overview)?,
            SprintSection::TeamCapacity => serde_json::to_value(&self.team_capacity)?,
            SprintSection::ProductBacklog => serde_json::to_value(&self.product_backlog)?,
            SprintSection::DefinitionOfDone => serde_json::to_value(&self.definition_of_done)?,
            SprintSection::RisksAndImpediments => {
                serde_json::to_value(&self.risks_and_impediments)?
            }
            SprintSection::AdditionalComments => serde_json::to_value(&self.additional_comments)?,
        };
        Ok(value)
    }

    fn load_section_value(&mut self, section: SprintSection, value: Value) -> Result<()> {
        match section {
            SprintSection::Overview => self.sprint_overview = serde_json::from_value(value)?,
            SprintSection::TeamCapacity => self.team_capacity = serde_json::from_value(value)?,
            SprintSection::ProductBacklog => self.product_backlog = serde_json::from_value(value)?,
            SprintSection::DefinitionOfDone => {
                self.definition_of_done = serde_json::from_value(value)?
            }
            SprintSection::RisksAndImpediments => {
                self.risks_and_impediments = serde_json::from_value(value)?
            }
            SprintSection::AdditionalComments => {
                self.additional_comments = serde_json::from_value(value)?
            }
        }
        Ok(())
    }

    fn reset_section(&mut self, section: SprintSection) {
        match section {
            SprintSection::Overview => self.sprint_overview = SprintOverview::default(),
            SprintSection::TeamCapacity => self.team_capacity = TeamCapacity::default(),
            SprintSection::ProductBacklog => self.product_backlog = ProductBacklog::default(),
            SprintSection::DefinitionOfDone => self.definition_of_done = DefinitionOfDone::default(),
            SprintSection::RisksAndImpediments => {
                self.risks_and_impediments = RisksAndImpediments::default()
            }
            SprintSection::AdditionalComments => {
                self.additional_comments = AdditionalComments::default()
            }
        }
    }
}
