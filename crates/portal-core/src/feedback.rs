//! Feedback about generated plans and assessments

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::Result;
use crate::session::User;
use crate::transport::{backend_message, expect_success, ApiRequest, PortalTransport};

pub const FEEDBACK_PATH: &str = "/api/feedback";

const THANK_YOU: &str = "Thank you for your valuable feedback! We appreciate your input.";
const NETWORK_FAILURE: &str = "There was an error submitting your feedback. Please try again.";

/// Feedback form; field names match the backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Feedback {
    pub name: String,
    pub email: String,
    pub clarity_of_sprint_goals: String,
    pub workload_distribution: String,
    pub plan_alignment_sow: String,
    pub suggestions_sprint_planning: String,
    pub risks_clear: String,
    pub mitigation_practical: String,
    pub suggestions_risk_assessment: String,
    pub overall_sprint_planning_rating: String,
    pub overall_risk_assessment_rating: String,
    pub additional_comments: String,
    pub user_email: String,
}

impl Feedback {
    /// Form prefilled with the signed-in user's name and email
    pub fn for_user(user: Option<&User>) -> Self {
        match user {
            Some(user) => Self {
                name: user.name.clone(),
                email: user.email.clone(),
                user_email: user.email.clone(),
                ..Self::default()
            },
            None => Self::default(),
        }
    }

    /// Set one field by its wire name. Unknown names are ignored.
    pub fn set_field(&mut self, field: &str, value: &str) -> bool {
        let slot = match field {
            "name" => &mut self.name,
            "email" => &mut self.email,
            "clarity_of_sprint_goals" => &mut self.clarity_of_sprint_goals,
            "workload_distribution" => &mut self.workload_distribution,
            "plan_alignment_sow" => &mut self.plan_alignment_sow,
            "suggestions_sprint_planning" => &mut self.suggestions_sprint_planning,
            "risks_clear" => &mut self.risks_clear,
            "mitigation_practical" => &mut self.mitigation_practical,
            "suggestions_risk_assessment" => &mut self.suggestions_risk_assessment,
            "overall_sprint_planning_rating" => &mut self.overall_sprint_planning_rating,
            "overall_risk_assessment_rating" => &mut self.overall_risk_assessment_rating,
            "additional_comments" => &mut self.additional_comments,
            _ => return false,
        };
        *slot = value.to_string();
        true
    }
}

/// Submit and return the notification text. Feedback failures are never
/// fatal, so every outcome is a message.
pub async fn submit_feedback<T>(transport: &T, feedback: &Feedback) -> Result<String>
where
    T: PortalTransport + ?Sized,
{
    let mut body = feedback.clone();
    if body.user_email.is_empty() {
        body.user_email = body.email.clone();
    }
    let request = ApiRequest::post(FEEDBACK_PATH, serde_json::to_value(&body)?);
    match transport.send(request).await {
        Ok(response) if response.get("success").and_then(Value::as_bool) == Some(true) => {
            info!("Feedback submitted by {}", body.user_email);
            Ok(THANK_YOU.to_string())
        }
        Ok(response) => {
            let message = backend_message(&response, "unknown error");
            warn!("Feedback rejected: {}", message);
            Ok(format!(
                "There was an error submitting your feedback: {}",
                message
            ))
        }
        Err(e) => {
            warn!("Feedback submission failed: {}", e);
            Ok(NETWORK_FAILURE.to_string())
        }
    }
}

/// Feedback entries, all of them or one user's
pub async fn list_feedback<T>(transport: &T, user_email: Option<&str>) -> Result<Vec<Value>>
where
    T: PortalTransport + ?Sized,
{
    let mut request = ApiRequest::get(FEEDBACK_PATH);
    if let Some(email) = user_email.filter(|e| !e.is_empty()) {
        request = request.with_query("user_email", email);
    }
    let body = expect_success(transport.send(request).await?, "Failed to load feedback")?;
    Ok(body
        .get("feedback")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default())
}
