//! Chat request and response shapes for comment-driven revisions

use serde::Serialize;
use serde_json::Value;

use crate::error::{PortalError, Result};
use crate::transport::ApiRequest;

pub const CHAT_PATH: &str = "/api/gemini/chat";

const CHAT_FALLBACK: &str = "Gemini service failed";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

pub fn instruction(heading: &str, comment: &str) -> String {
    format!(
        "do changes in {} section only, These are my instructions :  {}, give me updated response after doing the changes",
        heading,
        comment.trim()
    )
}

pub fn prompt(instruction: &str, html: &str) -> String {
    format!(
        "{}\n\nCurrent HTML Content:\n{}\n\nPlease update the HTML content according to the instructions above. Return only the updated HTML content with the changes applied.",
        instruction, html
    )
}

pub fn chat_request(heading: &str, comment: &str, html: &str, max_tokens: u32) -> Result<ApiRequest> {
    let body = ChatRequest {
        messages: vec![ChatMessage {
            role: "user",
            content: prompt(&instruction(heading, comment), html),
        }],
        max_tokens,
    };
    Ok(ApiRequest::post(CHAT_PATH, serde_json::to_value(body)?))
}

/// Updated HTML from a chat response. Needs both `success` and a
/// non-empty `response`.
pub fn parse_chat_response(body: &Value) -> Result<String> {
    let success = body.get("success").and_then(Value::as_bool).unwrap_or(false);
    let response = body
        .get("response")
        .and_then(Value::as_str)
        .filter(|r| !r.is_empty());
    match (success, response) {
        (true, Some(html)) => Ok(html.to_string()),
        _ => {
            let message = ["error", "response"]
                .iter()
                .filter_map(|k| body.get(*k).and_then(Value::as_str))
                .find(|m| !m.is_empty())
                .unwrap_or(CHAT_FALLBACK);
            Err(PortalError::Backend(format!(
                "Error processing comment with LLM: {}",
                message
            )))
        }
    }
}

pub fn comment_description(comment: &str) -> String {
    format!("Plan updated based on comment: \"{}\"", comment.trim())
}
