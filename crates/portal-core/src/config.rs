//! Portal runtime configuration
//!
//! Every field has a default so a partial JSON document (or none at all)
//! yields a usable configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PortalConfig {
    /// Prefix for every API path, empty for same-origin requests
    pub api_base: String,
    pub generation_stage_interval_ms: u32,
    pub comment_stage_interval_ms: u32,
    /// Lifetime of transient notifications (reset, sent, document import)
    pub notification_ms: u32,
    /// Spreadsheet imports stay on screen longer
    pub import_notification_ms: u32,
    pub page_sizes: Vec<usize>,
    pub default_page_size: usize,
    pub chat_max_tokens: u32,
    /// Role claim that grants administrative rights
    pub admin_role: String,
    /// Optional deployment-level allowlist, checked after the role claim
    pub admin_emails: Vec<String>,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            generation_stage_interval_ms: 800,
            comment_stage_interval_ms: 600,
            notification_ms: 3000,
            import_notification_ms: 5000,
            page_sizes: vec![5, 20, 50],
            default_page_size: 5,
            chat_max_tokens: 4000,
            admin_role: "admin".to_string(),
            admin_emails: Vec::new(),
        }
    }
}

impl PortalConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Join the API base with an absolute path like `/api/feedback`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PortalConfig::default();
        assert_eq!(config.page_sizes, vec![5, 20, 50]);
        assert_eq!(config.default_page_size, 5);
        assert_eq!(config.generation_stage_interval_ms, 800);
        assert_eq!(config.chat_max_tokens, 4000);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = PortalConfig::from_json(r#"{"api_base":"https://api.example.com/"}"#).unwrap();
        assert_eq!(config.api_base, "https://api.example.com/");
        assert_eq!(config.comment_stage_interval_ms, 600);
        assert_eq!(
            config.endpoint("/api/workspaces"),
            "https://api.example.com/api/workspaces"
        );
    }

    #[test]
    fn test_endpoint_relative() {
        let config = PortalConfig::default();
        assert_eq!(config.endpoint("/api/feedback"), "/api/feedback");
    }
}
