//! Previously generated artifacts: fetch, search, paging and delete

pub mod pagination;
pub mod search;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::artifact::{id_value, ArtifactKind, GeneratedArtifact, SowReference, DEFAULT_SOW_NAME};
use crate::config::PortalConfig;
use crate::error::{PortalError, Result};
use crate::transport::{backend_message, ApiRequest, PortalTransport};

pub use pagination::Pagination;
pub use search::matches_query;

const CREATED_BY_ME: &str = "Created by Me";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "name", rename_all = "camelCase")]
pub enum ListFilter {
    CreatedByMe,
    Workspace(String),
}

impl ListFilter {
    /// Parse the filter dropdown value
    pub fn from_label(label: &str) -> Self {
        if label == CREATED_BY_ME {
            ListFilter::CreatedByMe
        } else {
            ListFilter::Workspace(label.to_string())
        }
    }

    pub fn request(&self, kind: ArtifactKind, user_email: &str) -> ApiRequest {
        let request = ApiRequest::get(kind.collection_path());
        let request = match self {
            ListFilter::CreatedByMe => request.with_query("filter_type", CREATED_BY_ME),
            ListFilter::Workspace(name) => request.with_query("workspace", name),
        };
        request.with_query("user_email", user_email)
    }
}

/// One row of the list view
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactSummary {
    pub id: String,
    /// Sprint number or project name
    pub key: String,
    pub created_at: Option<String>,
    pub workspace: Option<String>,
    pub generated_content: Option<String>,
    pub word_document: Option<String>,
    /// Everything else the backend sent
    pub extra: Map<String, Value>,
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl ArtifactSummary {
    pub fn from_value(kind: ArtifactKind, value: &Value) -> Option<Self> {
        let Value::Object(map) = value else {
            return None;
        };
        let (key_field, content_field) = match kind {
            ArtifactKind::SprintPlan => ("sprint_number", "generated_plan"),
            ArtifactKind::RiskAssessment => ("project_name", "generated_assessment"),
        };
        let known = ["id", key_field, "created_at", "workspace", content_field, "word_document"];
        let extra = map
            .iter()
            .filter(|(k, _)| !known.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Some(Self {
            id: id_value(map.get("id"))?,
            key: text(map.get(key_field)).unwrap_or_default(),
            created_at: text(map.get("created_at")),
            workspace: text(map.get("workspace")),
            generated_content: text(map.get(content_field)),
            word_document: text(map.get("word_document")),
            extra,
        })
    }

    /// Key shown in titles, "N/A" when blank
    pub fn display_key(&self) -> &str {
        if self.key.is_empty() {
            "N/A"
        } else {
            &self.key
        }
    }

    /// Artifact for opening a stored item in the viewer. A stored SOW comes
    /// along as the attached reference.
    pub fn to_artifact(&self, kind: ArtifactKind) -> GeneratedArtifact {
        let source_inputs = match kind {
            ArtifactKind::SprintPlan => json!({ "sprint_overview": { "SprintNumber": self.key } }),
            ArtifactKind::RiskAssessment => json!({ "project_overview": { "ProjectName": self.key } }),
        };
        let attached_reference = text(self.extra.get("sow_content")).map(|content| SowReference {
            is_html: content.contains('<'),
            file_name: text(self.extra.get("sow_file_name"))
                .unwrap_or_else(|| DEFAULT_SOW_NAME.to_string()),
            content,
        });
        GeneratedArtifact {
            kind,
            id: Some(self.id.clone()),
            content: self.generated_content.clone().unwrap_or_default(),
            created_at: self
                .created_at
                .as_deref()
                .and_then(parse_timestamp)
                .unwrap_or_else(Utc::now),
            source_inputs,
            attached_reference,
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// A delete that has been sent but not yet confirmed
#[derive(Debug, Clone, PartialEq)]
pub struct PendingDelete {
    pub id: String,
    pub request: ApiRequest,
}

/// Fetched items with search and paging applied on the client
#[derive(Debug, Clone)]
pub struct ArtifactList {
    kind: ArtifactKind,
    filter: ListFilter,
    all: Vec<ArtifactSummary>,
    filtered: Vec<ArtifactSummary>,
    query: String,
    pagination: Pagination,
    pending_delete: Option<String>,
}

impl ArtifactList {
    pub fn new(kind: ArtifactKind, config: &PortalConfig) -> Self {
        Self {
            kind,
            filter: ListFilter::CreatedByMe,
            all: Vec::new(),
            filtered: Vec::new(),
            query: String::new(),
            pagination: Pagination::new(config.page_sizes.clone(), config.default_page_size),
            pending_delete: None,
        }
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    pub fn filter(&self) -> &ListFilter {
        &self.filter
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn all(&self) -> &[ArtifactSummary] {
        &self.all
    }

    pub fn filtered(&self) -> &[ArtifactSummary] {
        &self.filtered
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn pagination_mut(&mut self) -> &mut Pagination {
        &mut self.pagination
    }

    pub fn page(&self) -> &[ArtifactSummary] {
        self.pagination.slice(&self.filtered)
    }

    pub fn find(&self, id: &str) -> Option<&ArtifactSummary> {
        self.all.iter().find(|item| item.id == id)
    }

    /// Replace the items, e.g. from a response already fetched
    pub fn set_items(&mut self, items: Vec<ArtifactSummary>) {
        self.all = items;
        self.apply_query();
    }

    /// Apply a list response fetched for `filter`. The current query is
    /// kept and the view returns to page 1.
    pub fn apply_fetch(&mut self, filter: ListFilter, response: Result<Value>) -> Result<usize> {
        let body = response?;
        if !body.get("success").and_then(Value::as_bool).unwrap_or(false) {
            let fallback = format!("Failed to fetch {}s", self.kind.short_noun());
            return Err(PortalError::Backend(backend_message(&body, &fallback)));
        }
        let items: Vec<ArtifactSummary> = body
            .get(self.kind.list_field())
            .and_then(Value::as_array)
            .map(|rows| {
                rows.iter()
                    .filter_map(|row| ArtifactSummary::from_value(self.kind, row))
                    .collect()
            })
            .unwrap_or_default();
        info!("Fetched {} {}s", items.len(), self.kind.short_noun());
        let count = items.len();
        self.filter = filter;
        self.set_items(items);
        Ok(count)
    }

    pub async fn fetch_all<T>(&mut self, transport: &T, filter: ListFilter, user_email: &str) -> Result<usize>
    where
        T: PortalTransport + ?Sized,
    {
        let response = transport.send(filter.request(self.kind, user_email)).await;
        self.apply_fetch(filter, response)
    }

    /// New search text; always returns to page 1
    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
        self.apply_query();
    }

    fn apply_query(&mut self) {
        self.filtered = self
            .all
            .iter()
            .filter(|item| matches_query(&item.key, &self.query))
            .cloned()
            .collect();
        self.pagination.set_total(self.filtered.len());
    }

    /// First step of a delete: remember which item awaits confirmation
    pub fn request_delete(&mut self, id: &str) -> Option<&ArtifactSummary> {
        let found = self.all.iter().find(|item| item.id == id)?;
        self.pending_delete = Some(found.id.clone());
        Some(found)
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    pub fn pending_delete(&self) -> Option<&str> {
        self.pending_delete.as_deref()
    }

    /// Request for the item awaiting confirmation, if any
    pub fn begin_delete(&self, user_email: &str) -> Option<PendingDelete> {
        let id = self.pending_delete.clone()?;
        let request = ApiRequest::delete(format!("{}/{}", self.kind.collection_path(), id))
            .with_query("user_email", user_email);
        Some(PendingDelete { id, request })
    }

    /// Remove the item once the backend confirms. The list is unchanged on
    /// failure.
    pub fn finish_delete(&mut self, pending: PendingDelete, response: Result<Value>) -> Result<()> {
        let noun = self.kind.short_noun();
        let id = pending.id;
        let body = match response {
            Ok(body) => body,
            Err(e) => {
                warn!("Delete of {} {} failed: {}", noun, id, e);
                return Err(PortalError::Network(format!(
                    "Error deleting {}. Please try again.",
                    noun
                )));
            }
        };
        if !body.get("success").and_then(Value::as_bool).unwrap_or(false) {
            let message = backend_message(&body, "unknown error");
            warn!("Delete of {} {} refused: {}", noun, id, message);
            return Err(PortalError::Backend(format!("Failed to delete {}: {}", noun, message)));
        }

        self.all.retain(|item| item.id != id);
        self.filtered.retain(|item| item.id != id);
        self.pagination.shrink_to(self.filtered.len());
        if self.pending_delete.as_deref() == Some(id.as_str()) {
            self.pending_delete = None;
        }
        info!("Deleted {} {}", noun, id);
        Ok(())
    }

    /// Delete the item awaiting confirmation
    pub async fn confirm_delete<T>(&mut self, transport: &T, user_email: &str) -> Result<()>
    where
        T: PortalTransport + ?Sized,
    {
        let Some(pending) = self.begin_delete(user_email) else {
            return Ok(());
        };
        let response = transport.send(pending.request.clone()).await;
        self.finish_delete(pending, response)
    }
}
