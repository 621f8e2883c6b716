//! Viewer/editor state for one generated document

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::cleanup::{clean_generated, edit_seed, format_content_for_display};
use super::comment::{chat_request, comment_description, parse_chat_response};
use super::headers::HeaderCommentMap;
use super::versions::{VersionAction, VersionHistory, VersionNumber};
use crate::artifact::{ArtifactKind, GeneratedArtifact, SowReference};
use crate::error::{PortalError, Result};
use crate::generation::{comment_stages, ProgressStage};
use crate::sow::{regeneration_request, update_sow_request, validation_request, AlignmentReport};
use crate::transport::{backend_message, expect_success, ApiRequest, PortalTransport};

const EMPTY_EDIT: &str = "Please enter plan content before saving.";
const MANUAL_EDIT: &str = "Plan edited manually by user";
const SOW_REGENERATION: &str = "Plan regenerated with updated SOW content";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EditorMode {
    View,
    Edit,
    Comments,
}

/// A comment request that has been sent but not yet applied
#[derive(Debug, Clone, PartialEq)]
pub struct PendingComment {
    epoch: u64,
    pub heading: String,
    pub comment: String,
    pub request: ApiRequest,
}

/// A regeneration request that has been sent but not yet applied
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRegeneration {
    epoch: u64,
    pub request: ApiRequest,
}

/// What became of a comment or regeneration reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// Content replaced; carries the new version if anything changed
    Applied(Option<VersionNumber>),
    /// The editor was reset or closed while the request was out
    Stale,
}

#[derive(Debug, Clone)]
pub struct DocumentEditor {
    artifact: GeneratedArtifact,
    content: String,
    history: VersionHistory,
    mode: EditorMode,
    buffer: String,
    headers: HeaderCommentMap,
    sow: Option<SowReference>,
    comment_in_flight: bool,
    regeneration_in_flight: bool,
    epoch: u64,
    chat_max_tokens: u32,
}

impl DocumentEditor {
    pub fn open(artifact: GeneratedArtifact, chat_max_tokens: u32) -> Self {
        let history = VersionHistory::initial(artifact.kind, &artifact.content);
        Self {
            content: artifact.content.clone(),
            sow: artifact.attached_reference.clone(),
            artifact,
            history,
            mode: EditorMode::View,
            buffer: String::new(),
            headers: HeaderCommentMap::default(),
            comment_in_flight: false,
            regeneration_in_flight: false,
            epoch: 0,
            chat_max_tokens,
        }
    }

    pub fn kind(&self) -> ArtifactKind {
        self.artifact.kind
    }

    pub fn artifact(&self) -> &GeneratedArtifact {
        &self.artifact
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn history(&self) -> &VersionHistory {
        &self.history
    }

    pub fn headers(&self) -> &HeaderCommentMap {
        &self.headers
    }

    pub fn sow(&self) -> Option<&SowReference> {
        self.sow.as_ref()
    }

    pub fn is_comment_in_flight(&self) -> bool {
        self.comment_in_flight
    }

    pub fn is_regenerating(&self) -> bool {
        self.regeneration_in_flight
    }

    /// HTML for view mode
    pub fn display_html(&self) -> String {
        format_content_for_display(&clean_generated(&self.content))
    }

    // Edit mode

    pub fn enter_edit(&mut self) {
        self.mode = EditorMode::Edit;
        self.buffer = edit_seed(&self.content);
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn set_buffer(&mut self, text: &str) {
        self.buffer = text.to_string();
    }

    pub fn cancel_edit(&mut self) {
        self.buffer.clear();
        self.mode = EditorMode::View;
    }

    /// Replace the content with the cleaned buffer. A version is added only
    /// when the content actually changed.
    pub fn save_edit(&mut self) -> Result<Option<VersionNumber>> {
        let trimmed = self.buffer.trim();
        if trimmed.is_empty() {
            return Err(PortalError::InvalidInput(EMPTY_EDIT.to_string()));
        }
        let cleaned = clean_generated(trimmed);
        let version =
            self.history
                .add_if_changed(&self.content, &cleaned, VersionAction::ManualEdit, MANUAL_EDIT);
        self.content = cleaned;
        self.buffer.clear();
        self.mode = EditorMode::View;
        Ok(version)
    }

    // Comments mode

    /// Switch to comments mode and return the HTML with affordances
    pub fn enter_comments(&mut self) -> String {
        self.mode = EditorMode::Comments;
        let html = self.display_html();
        self.headers = HeaderCommentMap::scan(&html);
        self.headers.inject_affordances(&html)
    }

    pub fn exit_comments(&mut self) {
        self.mode = EditorMode::View;
    }

    pub fn comment_stages(&self) -> Vec<ProgressStage> {
        match self.kind() {
            ArtifactKind::SprintPlan => comment_stages("team capacity", "sprint data"),
            ArtifactKind::RiskAssessment => comment_stages("risk assessment", "risk data"),
        }
    }

    /// Build the chat request for a comment. `None` for a blank comment.
    pub fn begin_comment(&mut self, header_id: &str, comment: &str) -> Result<Option<PendingComment>> {
        if comment.trim().is_empty() {
            return Ok(None);
        }
        if self.comment_in_flight {
            return Err(PortalError::Busy("comment".to_string()));
        }
        let heading = self.headers.label_for(header_id).to_string();
        let request = chat_request(&heading, comment, &self.content, self.chat_max_tokens)?;
        self.comment_in_flight = true;
        debug!("Comment on '{}' sent", heading);
        Ok(Some(PendingComment {
            epoch: self.epoch,
            heading,
            comment: comment.trim().to_string(),
            request,
        }))
    }

    /// Apply the chat response for `pending`. Nothing changes on failure.
    pub fn finish_comment(
        &mut self,
        pending: PendingComment,
        response: Result<Value>,
    ) -> Result<ReplyOutcome> {
        if pending.epoch != self.epoch {
            debug!("Ignoring stale comment response for '{}'", pending.heading);
            return Ok(ReplyOutcome::Stale);
        }
        self.comment_in_flight = false;

        let html = match response.and_then(|body| parse_chat_response(&body)) {
            Ok(html) => html,
            Err(e) => {
                warn!("Comment round-trip failed: {}", e);
                return Err(e);
            }
        };
        let version = self.history.add_if_changed(
            &self.content,
            &html,
            VersionAction::CommentEdit,
            &comment_description(&pending.comment),
        );
        self.content = html;
        self.mode = EditorMode::View;
        info!("Comment on '{}' applied", pending.heading);
        Ok(ReplyOutcome::Applied(version))
    }

    /// Full round-trip through `transport`
    pub async fn submit_comment<T>(
        &mut self,
        transport: &T,
        header_id: &str,
        comment: &str,
    ) -> Result<Option<ReplyOutcome>>
    where
        T: PortalTransport + ?Sized,
    {
        let Some(pending) = self.begin_comment(header_id, comment)? else {
            return Ok(None);
        };
        let response = transport.send(pending.request.clone()).await;
        self.finish_comment(pending, response).map(Some)
    }

    // Versions

    pub fn restore(&mut self, number: VersionNumber) -> Result<()> {
        self.content = self.history.restore(number)?;
        self.mode = EditorMode::View;
        Ok(())
    }

    /// Drop transient state. Outstanding comment and regeneration
    /// responses become stale.
    pub fn reset(&mut self) {
        self.epoch += 1;
        self.comment_in_flight = false;
        self.regeneration_in_flight = false;
        self.buffer.clear();
        self.headers = HeaderCommentMap::default();
        self.mode = EditorMode::View;
    }

    // SOW

    pub fn attach_sow(&mut self, sow: SowReference) {
        self.sow = Some(sow);
    }

    pub async fn validate<T>(&self, transport: &T) -> Result<AlignmentReport>
    where
        T: PortalTransport + ?Sized,
    {
        let request = validation_request(self.kind(), &self.content, self.sow.as_ref())?;
        let body = transport.send(request).await?;
        AlignmentReport::from_response(self.kind(), &body)
    }

    /// Store the attached SOW against the sprint plan on the server
    pub async fn save_sow<T>(&self, transport: &T) -> Result<()>
    where
        T: PortalTransport + ?Sized,
    {
        let sow = self.sow.as_ref().ok_or_else(|| {
            PortalError::InvalidInput("No SOW content to save.".to_string())
        })?;
        let request = update_sow_request(self.artifact.id.as_deref(), sow)?;
        let body = transport.send(request).await?;
        expect_success(body, "Failed to save SOW content")?;
        info!("SOW '{}' saved for plan", sow.file_name);
        Ok(())
    }

    /// Build the regeneration request from the original inputs plus the
    /// attached SOW. Only one regeneration may be out at a time.
    pub fn begin_regeneration(&mut self) -> Result<PendingRegeneration> {
        if self.regeneration_in_flight {
            return Err(PortalError::Busy("regeneration".to_string()));
        }
        let request = regeneration_request(
            self.kind(),
            self.artifact.id.as_deref(),
            &self.content,
            &self.artifact.source_inputs,
            self.sow.as_ref(),
        )?;
        self.regeneration_in_flight = true;
        debug!("Regeneration of {} sent", self.kind().noun());
        Ok(PendingRegeneration {
            epoch: self.epoch,
            request,
        })
    }

    /// Apply the regeneration reply on top of whatever the editor holds
    /// now. Nothing changes on failure.
    pub fn finish_regeneration(
        &mut self,
        pending: PendingRegeneration,
        response: Result<Value>,
    ) -> Result<ReplyOutcome> {
        if pending.epoch != self.epoch {
            debug!("Ignoring stale regeneration response");
            return Ok(ReplyOutcome::Stale);
        }
        self.regeneration_in_flight = false;

        let noun = self.kind().short_noun();
        let wrap = |msg: String| PortalError::Backend(format!("Error regenerating {}: {}", noun, msg));
        let body = response.map_err(|e| wrap(e.to_string()))?;
        let success = body.get("success").and_then(Value::as_bool).unwrap_or(false);
        let regenerated = ["response", "summary", "word_document"]
            .iter()
            .filter_map(|k| body.get(*k).and_then(Value::as_str))
            .find(|s| !s.is_empty());
        let content = match (success, regenerated) {
            (true, Some(content)) => content.to_string(),
            _ => {
                let err = wrap(backend_message(&body, "no content returned"));
                warn!("{}", err);
                return Err(err);
            }
        };

        let version = self.history.add_if_changed(
            &self.content,
            &content,
            VersionAction::SowRegeneration,
            SOW_REGENERATION,
        );
        self.content = content;
        self.mode = EditorMode::View;
        info!("Regenerated {} with updated SOW", self.kind().noun());
        Ok(ReplyOutcome::Applied(version))
    }

    /// Full regeneration round-trip through `transport`
    pub async fn regenerate<T>(&mut self, transport: &T) -> Result<Option<VersionNumber>>
    where
        T: PortalTransport + ?Sized,
    {
        let pending = self.begin_regeneration()?;
        let response = transport.send(pending.request.clone()).await;
        match self.finish_regeneration(pending, response)? {
            ReplyOutcome::Applied(version) => Ok(version),
            ReplyOutcome::Stale => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn editor(content: &str) -> DocumentEditor {
        let artifact = GeneratedArtifact::from_response(
            ArtifactKind::SprintPlan,
            &json!({"success": true, "response": content, "plan_id": "p1"}),
            json!({"sprint_overview": {"SprintNumber": "12"}, "user_email": "pm@example.com"}),
            None,
        );
        DocumentEditor::open(artifact, 4000)
    }

    fn sow() -> SowReference {
        SowReference {
            content: "<p>Scope</p>".into(),
            file_name: "sow.docx".into(),
            is_html: true,
        }
    }

    #[test]
    fn test_open_starts_in_view_with_one_version() {
        let editor = editor("<h1>Plan</h1>");
        assert_eq!(editor.mode(), EditorMode::View);
        assert_eq!(editor.history().len(), 1);
        assert_eq!(editor.display_html(), "<h1>Plan</h1>");
    }

    #[test]
    fn test_edit_seed_strips_fences() {
        let mut editor = editor("```html\n<h1>Plan</h1>\n```");
        editor.enter_edit();
        assert_eq!(editor.mode(), EditorMode::Edit);
        assert_eq!(editor.buffer(), "<h1>Plan</h1>");
    }

    #[test]
    fn test_save_changed_buffer_adds_manual_edit() {
        let mut editor = editor("<h1>Plan</h1>");
        editor.enter_edit();
        editor.set_buffer("  <h1>Plan v2</h1>  ");
        assert_eq!(editor.save_edit().unwrap(), Some(2));
        assert_eq!(editor.content(), "<h1>Plan v2</h1>");
        assert_eq!(editor.mode(), EditorMode::View);
        let v2 = editor.history().get(2).unwrap();
        assert_eq!(v2.action, VersionAction::ManualEdit);
        assert_eq!(v2.description, "Plan edited manually by user");
    }

    #[test]
    fn test_save_unchanged_adds_nothing() {
        let mut editor = editor("<h1>Plan</h1>");
        editor.enter_edit();
        assert_eq!(editor.save_edit().unwrap(), None);
        assert_eq!(editor.history().len(), 1);
    }

    #[test]
    fn test_save_empty_buffer_is_rejected() {
        let mut editor = editor("<h1>Plan</h1>");
        editor.enter_edit();
        editor.set_buffer("   ");
        let err = editor.save_edit().unwrap_err();
        assert_eq!(err.to_string(), "Please enter plan content before saving.");
        assert_eq!(editor.mode(), EditorMode::Edit);
    }

    #[test]
    fn test_cancel_discards_buffer() {
        let mut editor = editor("<h1>Plan</h1>");
        editor.enter_edit();
        editor.set_buffer("other");
        editor.cancel_edit();
        assert_eq!(editor.buffer(), "");
        assert_eq!(editor.content(), "<h1>Plan</h1>");
        assert_eq!(editor.mode(), EditorMode::View);
    }

    #[test]
    fn test_enter_comments_maps_headings() {
        let mut editor = editor("<h1>Sprint 12</h1><h2>Team Capacity</h2>");
        let html = editor.enter_comments();
        assert_eq!(editor.mode(), EditorMode::Comments);
        assert_eq!(editor.headers().len(), 2);
        let id = editor.headers().entries()[1].id.clone();
        assert!(html.contains(&format!("data-header-id=\"{}\"", id)));
        assert_eq!(editor.headers().label_for(&id), "Team Capacity");
    }

    #[test]
    fn test_blank_comment_is_ignored() {
        let mut editor = editor("<h1>A</h1>");
        editor.enter_comments();
        assert_eq!(editor.begin_comment("x", "   ").unwrap(), None);
        assert!(!editor.is_comment_in_flight());
    }

    #[test]
    fn test_comment_applies_and_versions() {
        let mut editor = editor("<h1>A</h1>");
        editor.enter_comments();
        let id = editor.headers().entries()[0].id.clone();
        let pending = editor.begin_comment(&id, "rename it").unwrap().unwrap();
        assert!(pending.request.body.as_ref().unwrap()["messages"][0]["content"]
            .as_str()
            .unwrap()
            .starts_with("do changes in A section only"));
        assert!(matches!(
            editor.begin_comment(&id, "again"),
            Err(PortalError::Busy(_))
        ));

        let outcome = editor
            .finish_comment(pending, Ok(json!({"success": true, "response": "<h1>B</h1>"})))
            .unwrap();
        assert_eq!(outcome, ReplyOutcome::Applied(Some(2)));
        assert_eq!(editor.content(), "<h1>B</h1>");
        assert_eq!(editor.mode(), EditorMode::View);
        assert_eq!(
            editor.history().get(2).unwrap().description,
            "Plan updated based on comment: \"rename it\""
        );
        assert!(!editor.is_comment_in_flight());
    }

    #[test]
    fn test_failed_comment_changes_nothing() {
        let mut editor = editor("<h1>A</h1>");
        editor.enter_comments();
        let pending = editor.begin_comment("header-x", "do it").unwrap().unwrap();
        assert_eq!(pending.heading, "Unknown Header");
        let err = editor
            .finish_comment(pending, Ok(json!({"success": false, "error": "quota"})))
            .unwrap_err();
        assert_eq!(err.to_string(), "Error processing comment with LLM: quota");
        assert_eq!(editor.content(), "<h1>A</h1>");
        assert_eq!(editor.history().len(), 1);
        assert_eq!(editor.mode(), EditorMode::Comments);
        assert!(!editor.is_comment_in_flight());
    }

    #[test]
    fn test_stale_comment_response_is_ignored() {
        let mut editor = editor("<h1>A</h1>");
        editor.enter_comments();
        let pending = editor.begin_comment("h", "change").unwrap().unwrap();
        editor.reset();
        let outcome = editor
            .finish_comment(pending, Ok(json!({"success": true, "response": "<h1>B</h1>"})))
            .unwrap();
        assert_eq!(outcome, ReplyOutcome::Stale);
        assert_eq!(editor.content(), "<h1>A</h1>");
        assert_eq!(editor.history().len(), 1);
    }

    #[test]
    fn test_restore_replaces_content() {
        let mut editor = editor("<h1>A</h1>");
        editor.enter_edit();
        editor.set_buffer("<h1>B</h1>");
        editor.save_edit().unwrap();
        editor.restore(1).unwrap();
        assert_eq!(editor.content(), "<h1>A</h1>");
        assert_eq!(editor.history().current(), 1);
        assert_eq!(editor.history().len(), 2);
        assert!(editor.restore(9).is_err());
    }

    #[test]
    fn test_comment_stages_by_kind() {
        let editor = editor("<h1>A</h1>");
        assert_eq!(editor.comment_stages()[1].message, "Processing team capacity...");
    }

    #[tokio::test]
    async fn test_submit_comment_through_transport() {
        let transport = MockTransport::new().reply(json!({"success": true, "response": "<h1>A</h1>"}));
        let mut editor = editor("<h1>A</h1>");
        editor.enter_comments();
        let outcome = editor.submit_comment(&transport, "h", "keep").await.unwrap();
        assert_eq!(outcome, Some(ReplyOutcome::Applied(None)));
        assert_eq!(transport.last_request().path, "/api/gemini/chat");
    }

    #[tokio::test]
    async fn test_validate_requires_sow() {
        let transport = MockTransport::new();
        let editor = editor("<h1>A</h1>");
        let err = editor.validate(&transport).await.unwrap_err();
        assert!(err.to_string().contains("No SOW content found"));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_validate_reports_alignment() {
        let transport = MockTransport::new().reply(json!({"success": true, "response": "About 64% aligned"}));
        let mut editor = editor("<h1>A</h1>");
        editor.attach_sow(sow());
        let report = editor.validate(&transport).await.unwrap();
        assert_eq!(report.percentage, Some(64));
        assert_eq!(transport.last_request().path, "/api/sprint/validate-plan");
    }

    #[tokio::test]
    async fn test_regenerate_adds_sow_version() {
        let transport = MockTransport::new().reply(json!({"success": true, "response": "<h1>New</h1>"}));
        let mut editor = editor("<h1>A</h1>");
        editor.attach_sow(sow());
        assert_eq!(editor.regenerate(&transport).await.unwrap(), Some(2));
        assert_eq!(editor.content(), "<h1>New</h1>");
        let v2 = editor.history().get(2).unwrap();
        assert_eq!(v2.action, VersionAction::SowRegeneration);
        let body = transport.last_request().body.unwrap();
        assert_eq!(body["current_plan_content"], "<h1>A</h1>");
        assert_eq!(body["sow_content"], "<p>Scope</p>");
    }

    #[tokio::test]
    async fn test_regenerate_failure_keeps_content() {
        let transport = MockTransport::new().reply(json!({"success": false, "message": "busy"}));
        let mut editor = editor("<h1>A</h1>");
        let err = editor.regenerate(&transport).await.unwrap_err();
        assert_eq!(err.to_string(), "Error regenerating plan: busy");
        assert_eq!(editor.content(), "<h1>A</h1>");
    }

    #[test]
    fn test_comment_during_regeneration_keeps_history() {
        let mut editor = editor("<h1>A</h1>");
        editor.attach_sow(sow());
        let regen = editor.begin_regeneration().unwrap();
        assert!(editor.is_regenerating());
        assert!(matches!(editor.begin_regeneration(), Err(PortalError::Busy(_))));

        editor.enter_comments();
        let comment = editor.begin_comment("h", "tighten").unwrap().unwrap();
        editor
            .finish_comment(comment, Ok(json!({"success": true, "response": "<h1>B</h1>"})))
            .unwrap();

        let outcome = editor
            .finish_regeneration(regen, Ok(json!({"success": true, "response": "<h1>C</h1>"})))
            .unwrap();
        assert_eq!(outcome, ReplyOutcome::Applied(Some(3)));
        assert_eq!(editor.history().len(), 3);
        let actions: Vec<_> = editor.history().versions().iter().map(|v| v.action).collect();
        assert_eq!(
            actions,
            vec![
                VersionAction::InitialGeneration,
                VersionAction::CommentEdit,
                VersionAction::SowRegeneration
            ]
        );
        assert_eq!(editor.content(), "<h1>C</h1>");
        assert!(!editor.is_regenerating());
    }

    #[test]
    fn test_stale_regeneration_is_ignored() {
        let mut editor = editor("<h1>A</h1>");
        editor.attach_sow(sow());
        let regen = editor.begin_regeneration().unwrap();
        editor.reset();
        let outcome = editor
            .finish_regeneration(regen, Ok(json!({"success": true, "response": "<h1>C</h1>"})))
            .unwrap();
        assert_eq!(outcome, ReplyOutcome::Stale);
        assert_eq!(editor.content(), "<h1>A</h1>");
        assert_eq!(editor.history().len(), 1);
        assert!(editor.begin_regeneration().is_ok());
    }

    #[test]
    fn test_failed_regeneration_releases_guard() {
        let mut editor = editor("<h1>A</h1>");
        let regen = editor.begin_regeneration().unwrap();
        let err = editor
            .finish_regeneration(regen, Err(PortalError::Network("offline".into())))
            .unwrap_err();
        assert_eq!(err.to_string(), "Error regenerating plan: Network error: offline");
        assert!(!editor.is_regenerating());
        assert_eq!(editor.history().len(), 1);
    }

    #[tokio::test]
    async fn test_save_sow_posts_update() {
        let transport = MockTransport::new().reply(json!({"success": true}));
        let mut editor = editor("<h1>A</h1>");
        editor.attach_sow(sow());
        editor.save_sow(&transport).await.unwrap();
        let request = transport.last_request();
        assert_eq!(request.path, "/api/sprint/update-sow");
        assert_eq!(request.body.unwrap()["sprint_plan_id"], "p1");
    }
}
