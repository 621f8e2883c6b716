//! Workspace directory: list, create, delete and the current selection

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::error::{PortalError, Result};
use crate::session::{AuthorizationPolicy, User};
use crate::storage::{keys, KeyValueStore};
use crate::transport::{backend_message, expect_success, ApiRequest, PortalTransport};

pub const WORKSPACES_PATH: &str = "/api/workspaces";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: Value,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Workspace {
    /// Id as sent in URLs
    pub fn id_string(&self) -> String {
        match &self.id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// The default workspace is never deletable; admins may delete any other,
/// creators their own.
pub fn can_delete(policy: &AuthorizationPolicy, user: Option<&User>, workspace: &Workspace) -> bool {
    if workspace.is_default {
        return false;
    }
    let Some(user) = user else {
        return false;
    };
    if policy.is_admin(user) {
        return true;
    }
    !user.email.is_empty() && workspace.created_by.as_deref() == Some(user.email.as_str())
}

pub async fn list_workspaces<T>(transport: &T, user_email: &str) -> Result<Vec<Workspace>>
where
    T: PortalTransport + ?Sized,
{
    let body = transport
        .send(ApiRequest::get(WORKSPACES_PATH).with_query("user_email", user_email))
        .await?;
    let body = expect_success(body, "Failed to load workspaces")?;
    let rows = body.get("workspaces").cloned().unwrap_or(Value::Array(Vec::new()));
    Ok(serde_json::from_value(rows)?)
}

pub async fn create_workspace<T>(
    transport: &T,
    name: &str,
    description: &str,
    user_email: &str,
) -> Result<Option<Workspace>>
where
    T: PortalTransport + ?Sized,
{
    let name = name.trim();
    if name.is_empty() {
        return Err(PortalError::InvalidInput("Workspace name is required".to_string()));
    }
    let description = description.trim();
    let mut body = json!({ "name": name, "user_email": user_email });
    if !description.is_empty() {
        body["description"] = Value::String(description.to_string());
    }
    let response = transport.send(ApiRequest::post(WORKSPACES_PATH, body)).await?;
    let response = expect_success(response, "Failed to create workspace")?;
    info!("Created workspace '{}'", name);
    match response.get("workspace") {
        Some(ws) if ws.is_object() => Ok(Some(serde_json::from_value(ws.clone())?)),
        _ => Ok(None),
    }
}

/// Delete after checking the policy locally; the server checks again
pub async fn delete_workspace<T>(
    transport: &T,
    policy: &AuthorizationPolicy,
    user: Option<&User>,
    workspace: &Workspace,
) -> Result<()>
where
    T: PortalTransport + ?Sized,
{
    if !can_delete(policy, user, workspace) {
        return Err(PortalError::InvalidInput(
            "You do not have permission to delete this workspace".to_string(),
        ));
    }
    let email = user.map(|u| u.email.as_str()).unwrap_or_default();
    let request = ApiRequest::delete(format!("{}/{}", WORKSPACES_PATH, workspace.id_string()))
        .with_query("user_email", email);
    let body = transport.send(request).await?;
    if !body.get("success").and_then(Value::as_bool).unwrap_or(false) {
        let message = backend_message(&body, "Failed to delete workspace");
        warn!("Workspace delete refused: {}", message);
        return Err(PortalError::Backend(message));
    }
    info!("Deleted workspace '{}'", workspace.name);
    Ok(())
}

/// Remember the chosen workspace for later generations
pub fn select_workspace<S: KeyValueStore>(store: &S, workspace: &Workspace) -> Result<()> {
    store.set_json(keys::SELECTED_WORKSPACE, workspace)
}

pub fn selected_workspace<S: KeyValueStore>(store: &S) -> Result<Option<Workspace>> {
    match store.get_json(keys::SELECTED_WORKSPACE) {
        Ok(ws) => Ok(ws),
        Err(PortalError::Serialization(e)) => {
            warn!("Discarding unreadable workspace selection: {}", e);
            store.remove(keys::SELECTED_WORKSPACE)?;
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

pub fn clear_selection<S: KeyValueStore>(store: &S) -> Result<()> {
    store.remove(keys::SELECTED_WORKSPACE)
}
