//! Sprint plan from an empty form through generation and editing

mod common;

use common::ScriptedBackend;
use portal_core::document::{ReplyOutcome, EditorMode, VersionAction};
use portal_core::error::PortalError;
use portal_core::forms::SprintSection;
use portal_core::generation::progress::sprint_stages;
use portal_core::storage::keys;
use portal_core::{
    DocumentEditor, FormDocument, GenerationWorkflow, KeyValueStore, MemoryStore, PayloadContext,
    ProgressTracker, SowReference, SprintPlanForm,
};
use pretty_assertions::assert_eq;
use serde_json::json;

const PLAN: &str = "<h1>Sprint 12 Plan</h1><h2>Team Capacity</h2><p>One backend developer</p>";

fn filled_document(store: &MemoryStore) -> FormDocument<SprintPlanForm> {
    let mut doc = FormDocument::<SprintPlanForm>::default();
    for (key, value) in [
        ("SprintNumber", "12"),
        ("SprintDates", "2024-03-04 - 2024-03-15"),
        ("SprintDuration", "2 weeks"),
        ("TeamName", "Atlas"),
        ("SprintGoal", "Ship onboarding"),
    ] {
        doc.set_field(SprintSection::Overview, key, value);
    }
    doc.set_field(SprintSection::TeamCapacity, "TotalHoursPerPerson", "60");
    doc.set_field(SprintSection::TeamCapacity, "HistoricalStoryPoints", "34");
    {
        let form = doc.form_mut();
        form.update_team_member(1, "roleName", "Backend");
        form.update_team_member(1, "workingHours", "60h");
        form.update_backlog_item(1, "userStorySummary", "As a user I can sign up");
        form.update_backlog_item(1, "acceptanceCriteria", "Email verified");
        form.adjust_effort(1, 5.0);
    }
    doc.set_field(SprintSection::DefinitionOfDone, "DoDContent", "Reviewed and deployed");
    doc.set_field(SprintSection::RisksAndImpediments, "RisksContent", "Vendor delay");
    doc.set_field(SprintSection::AdditionalComments, "CommentsContent", "None");
    doc.save_section(store, SprintSection::Overview).unwrap();
    doc
}

#[tokio::test]
async fn test_generate_then_open_editor() {
    let store = MemoryStore::new();
    let backend = ScriptedBackend::new().then(json!({
        "success": true,
        "response": PLAN,
        "plan_id": "p1"
    }));
    let mut doc = filled_document(&store);
    assert!(doc.is_complete());

    let progress = ProgressTracker::new(sprint_stages());
    assert!(progress.advance().is_some());
    let artifact = GenerationWorkflow::new()
        .generate(&mut doc, &store, &backend, &PayloadContext::new("dana@example.com"), &progress)
        .await
        .unwrap();

    assert!(doc.completed_sections().is_empty());
    assert_eq!(store.get(keys::PLAN_GENERATED).unwrap().as_deref(), Some("true"));
    assert_eq!(progress.percent(), 100);
    assert_eq!(artifact.display_key().as_deref(), Some("12"));

    let body = backend.sent()[0].body.clone().unwrap();
    assert_eq!(body["user_email"], "dana@example.com");
    assert_eq!(body["product_backlog"]["BacklogItems"][0]["effortEstimate"], 5.0);

    let editor = DocumentEditor::open(artifact, 4000);
    assert_eq!(editor.history().len(), 1);
    let first = editor.history().get(1).unwrap();
    assert_eq!(first.action, VersionAction::InitialGeneration);
    assert_eq!(first.content, PLAN);
}

#[tokio::test]
async fn test_incomplete_form_reports_missing_sections() {
    let store = MemoryStore::new();
    let backend = ScriptedBackend::new();
    let mut doc = filled_document(&store);
    doc.set_field(SprintSection::DefinitionOfDone, "DoDContent", "  ");

    let err = GenerationWorkflow::new()
        .generate(&mut doc, &store, &backend, &PayloadContext::new("a@b.c"), &ProgressTracker::default())
        .await
        .unwrap_err();
    match err {
        PortalError::IncompleteForm { missing } => assert_eq!(missing, vec!["Definition of Done"]),
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(backend.sent().is_empty());
}

#[tokio::test]
async fn test_comment_edit_and_restore() {
    let store = MemoryStore::new();
    let backend = ScriptedBackend::new()
        .then(json!({"success": true, "response": PLAN, "plan_id": "p1"}))
        .then(json!({
            "success": true,
            "response": "<h1>Sprint 12 Plan</h1><h2>Team Capacity</h2><p>Two developers</p>"
        }));
    let mut doc = filled_document(&store);
    let artifact = GenerationWorkflow::new()
        .generate(&mut doc, &store, &backend, &PayloadContext::new("a@b.c"), &ProgressTracker::default())
        .await
        .unwrap();
    let mut editor = DocumentEditor::open(artifact, 4000);

    let annotated = editor.enter_comments();
    assert_eq!(editor.mode(), EditorMode::Comments);
    assert_eq!(annotated.matches("header-comment-btn").count(), 2);
    let capacity = editor.headers().entries()[1].id.clone();

    let outcome = editor
        .submit_comment(&backend, &capacity, "We hired a second developer")
        .await
        .unwrap();
    assert_eq!(outcome, Some(ReplyOutcome::Applied(Some(2))));
    assert!(editor.content().contains("Two developers"));
    assert_eq!(editor.mode(), EditorMode::View);

    let chat = backend.sent()[1].body.clone().unwrap();
    let prompt = chat["messages"][0]["content"].as_str().unwrap_or_default().to_string();
    assert!(prompt.contains("Team Capacity"), "{}", prompt);

    editor.enter_edit();
    editor.set_buffer("<h1>Sprint 12 Plan</h1><p>Rewritten</p>");
    assert_eq!(editor.save_edit().unwrap(), Some(3));
    let actions: Vec<VersionAction> = editor.history().versions().iter().map(|v| v.action).collect();
    assert_eq!(
        actions,
        vec![VersionAction::InitialGeneration, VersionAction::CommentEdit, VersionAction::ManualEdit]
    );

    editor.restore(1).unwrap();
    assert_eq!(editor.content(), PLAN);
    assert_eq!(editor.history().current(), 1);
    assert!(editor.restore(9).is_err());
}

#[tokio::test]
async fn test_sow_regeneration_adds_version() {
    let store = MemoryStore::new();
    let backend = ScriptedBackend::new()
        .then(json!({"success": true, "response": PLAN, "plan_id": "p1"}))
        .then(json!({"success": true, "response": "Plan is 82% aligned with the SOW"}))
        .then(json!({"success": true, "response": "<h1>Sprint 12 Plan</h1><p>SOW aware</p>"}));
    let mut doc = filled_document(&store);
    let artifact = GenerationWorkflow::new()
        .generate(&mut doc, &store, &backend, &PayloadContext::new("a@b.c"), &ProgressTracker::default())
        .await
        .unwrap();
    let mut editor = DocumentEditor::open(artifact, 4000);

    let sow = SowReference::store_upload(&store, "Deliver onboarding", None, "sow.pdf").unwrap();
    editor.attach_sow(sow);

    let report = editor.validate(&backend).await.unwrap();
    assert_eq!(report.percentage, Some(82));
    assert_eq!(report.message, "Generated plan 82% aligned with the SOW.");

    assert_eq!(editor.regenerate(&backend).await.unwrap(), Some(2));
    let latest = editor.history().get(2).unwrap();
    assert_eq!(latest.action, VersionAction::SowRegeneration);

    let regen = backend.sent()[2].body.clone().unwrap();
    assert_eq!(regen["sow_content"], "Deliver onboarding");
    assert_eq!(regen["current_plan_content"], PLAN);
    assert_eq!(regen["regenerate_with_current_plan"], true);
    assert_eq!(regen["sprint_overview"]["SprintNumber"], "12");
}
