//! HTTP seam between the portal and its backend.
//!
//! Requests are plain data; the browser app sends them with `fetch`,
//! tests answer them from a scripted mock.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PortalError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Full URL with percent-encoded query string
    pub fn url(&self, api_base: &str) -> String {
        let mut url = format!("{}{}", api_base.trim_end_matches('/'), self.path);
        if !self.query.is_empty() {
            let query: Vec<String> = self
                .query
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect();
            url.push('?');
            url.push_str(&query.join("&"));
        }
        url
    }
}

#[async_trait(?Send)]
pub trait PortalTransport {
    /// Send one request and return the decoded JSON body
    async fn send(&self, request: ApiRequest) -> Result<Value>;
}

/// Common `{success, message | error}` envelope check.
///
/// Returns the body when `success` is true, otherwise a [`PortalError::Backend`]
/// carrying the server's message or `fallback`.
pub fn expect_success(body: Value, fallback: &str) -> Result<Value> {
    if body.get("success").and_then(Value::as_bool).unwrap_or(false) {
        return Ok(body);
    }
    Err(PortalError::Backend(backend_message(&body, fallback)))
}

pub fn backend_message(body: &Value, fallback: &str) -> String {
    ["message", "error"]
        .iter()
        .filter_map(|key| body.get(*key).and_then(Value::as_str))
        .find(|msg| !msg.is_empty())
        .unwrap_or(fallback)
        .to_string()
}
