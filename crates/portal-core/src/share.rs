//! Share a sprint plan by email through the backend

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{PortalError, Result};
use crate::transport::{expect_success, ApiRequest, PortalTransport};

pub const SHARE_PATH: &str = "/api/send-sprint-plan-email";

const DEFAULT_NAME: &str = "Sprint Plan";
const DEFAULT_BODY: &str = "Please find the sprint plan below.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmailDraft {
    pub to: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub sprint_plan_content: String,
    pub sprint_plan_name: String,
}

impl EmailDraft {
    pub fn validate(&self) -> Result<()> {
        if self.to.trim().is_empty() || !self.to.contains('@') {
            return Err(PortalError::InvalidInput(
                "Please enter a valid email address".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_request(&self, plan_name: Option<&str>, content: &str) -> Result<ShareRequest> {
        self.validate()?;
        let name = plan_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(DEFAULT_NAME);
        let body = if self.description.trim().is_empty() {
            DEFAULT_BODY.to_string()
        } else {
            self.description.clone()
        };
        Ok(ShareRequest {
            to: self.to.trim().to_string(),
            subject: format!("sprint plan shared : {}", name),
            body,
            sprint_plan_content: content.to_string(),
            sprint_plan_name: name.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "camelCase")]
pub enum ShareState {
    Idle,
    Sending,
    Sent,
    Failed(String),
}

/// An email that has been handed to the backend
#[derive(Debug, Clone, PartialEq)]
pub struct PendingShare {
    pub request: ApiRequest,
    recipient: String,
    plan_name: String,
}

/// Draft plus send state for the share dialog
#[derive(Debug, Clone, PartialEq)]
pub struct ShareDialog {
    pub draft: EmailDraft,
    state: ShareState,
}

impl Default for ShareDialog {
    fn default() -> Self {
        Self {
            draft: EmailDraft::default(),
            state: ShareState::Idle,
        }
    }
}

impl ShareDialog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ShareState {
        &self.state
    }

    /// Validate the draft and enter `Sending`. The returned request is
    /// what goes to the backend.
    pub fn begin_send(&mut self, plan_name: Option<&str>, content: &str) -> Result<PendingShare> {
        if self.state == ShareState::Sending {
            return Err(PortalError::Busy("email".to_string()));
        }
        let share = self.draft.to_request(plan_name, content)?;
        let request = ApiRequest::post(SHARE_PATH, serde_json::to_value(&share)?);
        self.state = ShareState::Sending;
        Ok(PendingShare {
            request,
            recipient: share.to,
            plan_name: share.sprint_plan_name,
        })
    }

    /// Record the backend's answer. Fields are cleared on success and kept
    /// on failure.
    pub fn finish_send(&mut self, pending: PendingShare, response: Result<Value>) -> Result<()> {
        match response.and_then(|body| expect_success(body, "Failed to send email")) {
            Ok(_) => {
                info!("Shared '{}' with {}", pending.plan_name, pending.recipient);
                self.draft = EmailDraft::default();
                self.state = ShareState::Sent;
                Ok(())
            }
            Err(e) => {
                warn!("Email share failed: {}", e);
                self.state = ShareState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Full send through `transport`
    pub async fn send<T>(&mut self, transport: &T, plan_name: Option<&str>, content: &str) -> Result<()>
    where
        T: PortalTransport + ?Sized,
    {
        let pending = self.begin_send(plan_name, content)?;
        let response = transport.send(pending.request.clone()).await;
        self.finish_send(pending, response)
    }

    /// Hide the sent/failed banner
    pub fn dismiss(&mut self) {
        if self.state != ShareState::Sending {
            self.state = ShareState::Idle;
        }
    }
}
