//! Workspace picker bindings

use portal_core::workspace::{self, Workspace};
use portal_core::{AuthorizationPolicy, SessionStore};
use wasm_bindgen::prelude::*;

use crate::storage::BrowserStore;
use crate::transport::FetchTransport;
use crate::{from_js, js_error, parse_config, to_js};

#[wasm_bindgen]
pub struct WorkspaceDirectory {
    transport: FetchTransport,
    policy: AuthorizationPolicy,
}

#[wasm_bindgen]
impl WorkspaceDirectory {
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> WorkspaceDirectory {
        let config = parse_config(&config);
        Self {
            transport: FetchTransport::new(&config.api_base),
            policy: AuthorizationPolicy::from_config(&config),
        }
    }

    #[wasm_bindgen(js_name = listWorkspaces)]
    pub async fn list_workspaces(&self, user_email: String) -> Result<JsValue, JsValue> {
        let list = workspace::list_workspaces(&self.transport, &user_email)
            .await
            .map_err(js_error)?;
        to_js(&list)
    }

    /// Returns the created workspace, or `null` when the server omits it
    #[wasm_bindgen(js_name = createWorkspace)]
    pub async fn create_workspace(
        &self,
        name: String,
        description: String,
        user_email: String,
    ) -> Result<JsValue, JsValue> {
        let created = workspace::create_workspace(&self.transport, &name, &description, &user_email)
            .await
            .map_err(js_error)?;
        match created {
            Some(ws) => to_js(&ws),
            None => Ok(JsValue::NULL),
        }
    }

    /// Whether the signed-in user may delete `workspace`
    #[wasm_bindgen(js_name = canDelete)]
    pub fn can_delete(&self, workspace: JsValue) -> Result<bool, JsValue> {
        let ws: Workspace = from_js(workspace)?;
        let session = signed_in()?;
        Ok(workspace::can_delete(&self.policy, session.user(), &ws))
    }

    #[wasm_bindgen(js_name = deleteWorkspace)]
    pub async fn delete_workspace(&self, workspace: JsValue) -> Result<(), JsValue> {
        let ws: Workspace = from_js(workspace)?;
        let session = signed_in()?;
        workspace::delete_workspace(&self.transport, &self.policy, session.user(), &ws)
            .await
            .map_err(js_error)?;
        // Forget the selection if it pointed at the deleted workspace
        let store = BrowserStore::local();
        if workspace::selected_workspace(&store)
            .map_err(js_error)?
            .is_some_and(|selected| selected.id == ws.id)
        {
            workspace::clear_selection(&store).map_err(js_error)?;
        }
        Ok(())
    }

    /// Remember `workspace` as the target for generation
    pub fn select(&self, workspace: JsValue) -> Result<(), JsValue> {
        let ws: Workspace = from_js(workspace)?;
        workspace::select_workspace(&BrowserStore::local(), &ws).map_err(js_error)
    }

    pub fn selected(&self) -> Result<JsValue, JsValue> {
        match workspace::selected_workspace(&BrowserStore::local()).map_err(js_error)? {
            Some(ws) => to_js(&ws),
            None => Ok(JsValue::NULL),
        }
    }

    #[wasm_bindgen(js_name = clearSelection)]
    pub fn clear_selection(&self) -> Result<(), JsValue> {
        workspace::clear_selection(&BrowserStore::local()).map_err(js_error)
    }
}

fn signed_in() -> Result<SessionStore<BrowserStore>, JsValue> {
    SessionStore::restore(BrowserStore::local()).map_err(js_error)
}
