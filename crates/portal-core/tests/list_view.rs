//! Stored-plan list: fetch, search, paging and delete

mod common;

use common::ScriptedBackend;
use portal_core::error::PortalError;
use portal_core::transport::Method;
use portal_core::{ArtifactKind, ArtifactList, ListFilter, PortalConfig};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn plans(count: usize) -> Value {
    let rows: Vec<Value> = (1..=count)
        .map(|n| {
            json!({
                "id": n,
                "sprint_number": format!("Sprint {}", n),
                "created_at": "2024-05-01T10:00:00",
                "generated_plan": format!("<h1>Sprint {}</h1>", n),
            })
        })
        .collect();
    json!({"success": true, "plans": rows})
}

fn list() -> ArtifactList {
    let config = PortalConfig {
        page_sizes: vec![5, 20, 50],
        default_page_size: 20,
        ..PortalConfig::default()
    };
    ArtifactList::new(ArtifactKind::SprintPlan, &config)
}

#[tokio::test]
async fn test_fetch_and_page_through_plans() {
    let backend = ScriptedBackend::new().then(plans(47));
    let mut list = list();

    let count = list
        .fetch_all(&backend, ListFilter::CreatedByMe, "dana@example.com")
        .await
        .unwrap();
    assert_eq!(count, 47);
    assert_eq!(list.pagination().total_pages(), 3);
    assert_eq!(list.page().len(), 20);

    let request = &backend.sent()[0];
    assert_eq!(request.method, Method::Get);
    assert!(request.url("").starts_with("/api/sprint-plans?"));

    assert!(list.pagination_mut().last());
    assert_eq!(list.page().len(), 7);
    assert_eq!(list.pagination().showing(), (41, 47, 47));
    assert!(!list.pagination_mut().go_to(4));
    assert_eq!(list.pagination().current_page(), 3);
}

#[tokio::test]
async fn test_search_narrows_and_resets_page() {
    let backend = ScriptedBackend::new().then(plans(47));
    let mut list = list();
    list.fetch_all(&backend, ListFilter::CreatedByMe, "dana@example.com")
        .await
        .unwrap();
    list.pagination_mut().go_to(2);

    list.set_query("sprint 4");
    assert_eq!(list.pagination().current_page(), 1);
    let keys: Vec<&str> = list.filtered().iter().map(|p| p.key.as_str()).collect();
    assert!(keys.contains(&"Sprint 4"));
    assert!(keys.contains(&"Sprint 40"));
    assert!(!keys.contains(&"Sprint 5"));

    list.set_query("");
    assert_eq!(list.filtered().len(), 47);
}

#[tokio::test]
async fn test_delete_requires_confirmation_and_success() {
    let backend = ScriptedBackend::new()
        .then(plans(3))
        .then(json!({"success": false, "error": "locked"}))
        .then(json!({"success": true}));
    let mut list = list();
    list.fetch_all(&backend, ListFilter::Workspace("Platform".into()), "dana@example.com")
        .await
        .unwrap();
    assert!(backend.sent()[0].url("").contains("workspace=Platform"));

    assert!(list.request_delete("9").is_none());
    assert_eq!(list.request_delete("2").map(|p| p.key.clone()).as_deref(), Some("Sprint 2"));
    assert_eq!(list.pending_delete(), Some("2"));

    let err = list.confirm_delete(&backend, "dana@example.com").await.unwrap_err();
    assert_eq!(err, PortalError::Backend("Failed to delete plan: locked".into()));
    assert_eq!(list.all().len(), 3);

    list.confirm_delete(&backend, "dana@example.com").await.unwrap();
    assert_eq!(list.all().len(), 2);
    assert!(list.find("2").is_none());
    assert_eq!(list.pending_delete(), None);
    assert_eq!(backend.sent()[2].method, Method::Delete);
    assert_eq!(backend.sent()[2].path, "/api/sprint-plans/2");
}

#[tokio::test]
async fn test_fetch_failure_keeps_previous_items() {
    let backend = ScriptedBackend::new()
        .then(plans(2))
        .then_fail(PortalError::Network("offline".into()));
    let mut list = list();
    list.fetch_all(&backend, ListFilter::CreatedByMe, "dana@example.com")
        .await
        .unwrap();
    assert!(list
        .fetch_all(&backend, ListFilter::CreatedByMe, "dana@example.com")
        .await
        .is_err());
    assert_eq!(list.all().len(), 2);
}
