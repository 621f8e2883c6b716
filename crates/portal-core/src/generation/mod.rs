//! Generation workflow: completeness check, payload assembly, backend call
//! and the post-generation reset.

mod payload;
pub mod progress;

use std::cell::Cell;

use chrono::{NaiveDate, Utc};
use serde_json::Value;
use tracing::{info, warn};

use crate::artifact::{ArtifactKind, GeneratedArtifact, SowReference};
use crate::error::{PortalError, Result};
use crate::forms::{mark_generated, FormDocument, FormModel};
use crate::storage::KeyValueStore;
use crate::transport::{expect_success, ApiRequest, PortalTransport};

pub use progress::{comment_stages, risk_stages, sprint_stages, ProgressStage, ProgressTracker};

/// A form that can be turned into a generation request
pub trait GenerationTarget: FormModel {
    const KIND: ArtifactKind;

    fn build_payload(&self, ctx: &PayloadContext) -> Result<Value>;

    fn progress_stages(&self) -> Vec<ProgressStage>;
}

/// Request-wide values that do not live in the form
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadContext {
    pub user_email: String,
    pub sow: Option<SowReference>,
    pub workspace_id: Option<Value>,
    pub today: NaiveDate,
}

impl PayloadContext {
    pub fn new(user_email: &str) -> Self {
        Self {
            user_email: user_email.to_string(),
            sow: None,
            workspace_id: None,
            today: Utc::now().date_naive(),
        }
    }

    pub fn with_sow(mut self, sow: Option<SowReference>) -> Self {
        self.sow = sow;
        self
    }

    pub fn with_workspace_id(mut self, id: Option<Value>) -> Self {
        self.workspace_id = id;
        self
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// SOW text as sent to the backend (HTML preferred), or null
    pub fn sow_content(&self) -> Option<&str> {
        self.sow.as_ref().map(|s| s.content.as_str())
    }
}

/// Clears the in-flight flag when the request finishes, however it ends
pub(crate) struct InFlightGuard<'a>(&'a Cell<bool>);

impl<'a> InFlightGuard<'a> {
    pub(crate) fn acquire(flag: &'a Cell<bool>, what: &str) -> Result<Self> {
        if flag.replace(true) {
            return Err(PortalError::Busy(what.to_string()));
        }
        Ok(Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Runs generations, at most one at a time
#[derive(Debug, Default)]
pub struct GenerationWorkflow {
    in_flight: Cell<bool>,
}

impl GenerationWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.get()
    }

    /// Validate, send and, on success, reset the form and raise the
    /// generated flag. The form is untouched on any failure.
    ///
    /// `progress` is completed once the backend has answered, whatever the
    /// outcome.
    pub async fn generate<F, S, T>(
        &self,
        doc: &mut FormDocument<F>,
        store: &S,
        transport: &T,
        ctx: &PayloadContext,
        progress: &ProgressTracker,
    ) -> Result<GeneratedArtifact>
    where
        F: GenerationTarget,
        S: KeyValueStore,
        T: PortalTransport + ?Sized,
    {
        doc.ensure_complete()?;
        let _guard = InFlightGuard::acquire(&self.in_flight, "generation")?;

        let payload = doc.form().build_payload(ctx)?;
        info!("Generating {} for {}", F::KIND.noun(), ctx.user_email);

        let sent = transport
            .send(ApiRequest::post(F::KIND.generate_path(), payload.clone()))
            .await;
        progress.complete();

        let fallback = format!("Error generating {}. Please try again.", F::KIND.noun());
        let body = match sent.and_then(|body| expect_success(body, &fallback)) {
            Ok(body) => body,
            Err(e) => {
                warn!("Generation of {} failed: {}", F::KIND.noun(), e);
                return Err(e);
            }
        };

        let artifact = GeneratedArtifact::from_response(F::KIND, &body, payload, ctx.sow.clone());
        doc.reset_form(store)?;
        mark_generated::<F, S>(store)?;
        info!(
            "Generated {} {}",
            F::KIND.noun(),
            artifact.id.as_deref().unwrap_or("(no id)")
        );
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::sprint::fixtures::complete_form;
    use crate::forms::{RiskAssessmentForm, SprintPlanForm, SprintSection};
    use crate::storage::{keys, MemoryStore};
    use crate::transport::mock::MockTransport;
    use crate::transport::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_incomplete_form_never_calls_backend() {
        let workflow = GenerationWorkflow::new();
        let store = MemoryStore::new();
        let transport = MockTransport::new();
        let mut doc = FormDocument::<SprintPlanForm>::default();

        let err = workflow
            .generate(
                &mut doc,
                &store,
                &transport,
                &PayloadContext::new("a@b.c"),
                &ProgressTracker::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PortalError::IncompleteForm { ref missing } if missing.len() == 6));
        assert_eq!(transport.request_count(), 0);
        assert!(!workflow.is_in_flight());
    }

    #[tokio::test]
    async fn test_success_resets_form_and_sets_flag() {
        let workflow = GenerationWorkflow::new();
        let store = MemoryStore::new();
        let transport =
            MockTransport::new().reply(json!({"success": true, "response": "<h1>Plan</h1>", "plan_id": "p1"}));
        let mut doc = FormDocument::new(complete_form());
        doc.save_section(&store, SprintSection::Overview).unwrap();
        let progress = ProgressTracker::new(sprint_stages());

        let artifact = workflow
            .generate(&mut doc, &store, &transport, &PayloadContext::new("a@b.c"), &progress)
            .await
            .unwrap();

        assert_eq!(artifact.content, "<h1>Plan</h1>");
        assert_eq!(artifact.id.as_deref(), Some("p1"));
        assert_eq!(artifact.source_inputs["sprint_overview"]["SprintNumber"], "12");
        assert!(doc.completed_sections().is_empty());
        assert!(doc.saved_sections().is_empty());
        assert_eq!(store.get(keys::PLAN_GENERATED).unwrap().as_deref(), Some("true"));
        assert_eq!(store.get(keys::SPRINT_PLANNING_DATA).unwrap(), None);
        assert_eq!(progress.percent(), 100);

        let request = transport.last_request();
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.path, "/api/sprint/generate-plan");
    }

    #[tokio::test]
    async fn test_backend_failure_keeps_form() {
        let workflow = GenerationWorkflow::new();
        let store = MemoryStore::new();
        let transport = MockTransport::new().reply(json!({"success": false, "message": "LLM offline"}));
        let mut doc = FormDocument::new(complete_form());
        let progress = ProgressTracker::new(sprint_stages());

        let err = workflow
            .generate(&mut doc, &store, &transport, &PayloadContext::new("a@b.c"), &progress)
            .await
            .unwrap_err();
        assert_eq!(err, PortalError::Backend("LLM offline".into()));
        assert_eq!(doc.form(), &complete_form());
        assert_eq!(store.get(keys::PLAN_GENERATED).unwrap(), None);
        assert!(!workflow.is_in_flight());
        assert_eq!(progress.percent(), 100);
    }

    #[tokio::test]
    async fn test_network_failure_is_surfaced() {
        let workflow = GenerationWorkflow::new();
        let store = MemoryStore::new();
        let transport = MockTransport::new().fail(PortalError::Network("offline".into()));
        let mut doc = FormDocument::new(complete_form());

        let err = workflow
            .generate(
                &mut doc,
                &store,
                &transport,
                &PayloadContext::new("a@b.c"),
                &ProgressTracker::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(err, PortalError::Network("offline".into()));
    }

    #[tokio::test]
    async fn test_second_generation_while_in_flight_is_refused() {
        let workflow = GenerationWorkflow::new();
        let _held = InFlightGuard::acquire(&workflow.in_flight, "generation").unwrap();
        let store = MemoryStore::new();
        let transport = MockTransport::new();
        let mut doc = FormDocument::new(complete_form());

        let err = workflow
            .generate(
                &mut doc,
                &store,
                &transport,
                &PayloadContext::new("a@b.c"),
                &ProgressTracker::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(err, PortalError::Busy("generation".into()));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_risk_generation_uses_assessment_endpoint() {
        use crate::forms::risk::fixtures::complete_record;

        let workflow = GenerationWorkflow::new();
        let store = MemoryStore::new();
        let transport = MockTransport::new()
            .reply(json!({"success": true, "response": "<h1>Risks</h1>", "assessment_id": 9}));
        let mut doc = FormDocument::new(RiskAssessmentForm::from_records(vec![complete_record("R-1")]));

        let artifact = workflow
            .generate(
                &mut doc,
                &store,
                &transport,
                &PayloadContext::new("a@b.c"),
                &ProgressTracker::default(),
            )
            .await
            .unwrap();
        assert_eq!(artifact.kind, ArtifactKind::RiskAssessment);
        assert_eq!(artifact.id.as_deref(), Some("9"));
        assert_eq!(
            transport.last_request().path,
            "/api/risk-assessment/generate-assessment"
        );
        assert_eq!(
            store.get(keys::RISK_ASSESSMENT_GENERATED).unwrap().as_deref(),
            Some("true")
        );
        assert_eq!(doc.form(), &RiskAssessmentForm::default());
    }
}
