//! Key/value persistence used for sessions, saved form sections and
//! cross-page handoff.
//!
//! The browser app backs this with `localStorage` / `sessionStorage`;
//! tests and native callers use [`MemoryStore`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

pub mod keys {
    pub const USER: &str = "user";
    pub const SESSION_ID: &str = "sessionId";
    pub const SPRINT_PLANNING_DATA: &str = "sprintPlanningData";
    pub const RISK_ASSESSMENT_DATA: &str = "riskAssessmentData";
    pub const PLAN_GENERATED: &str = "planGenerated";
    pub const RISK_ASSESSMENT_GENERATED: &str = "riskAssessmentGenerated";
    pub const SELECTED_WORKSPACE: &str = "selectedWorkspace";

    // Transient handoff (session storage)
    pub const SOW_CONTENT_RAW: &str = "sowContentRaw";
    pub const SOW_CONTENT_HTML: &str = "sowContentHtml";
    pub const SOW_FILE_NAME: &str = "sowFileName";
    pub const EXCEL_SPRINT_DATA: &str = "excelSprintData";
    pub const EXCEL_RISK_DATA: &str = "excelRiskData";
    pub const DOCX_SPRINT_DATA: &str = "docxSprintData";
    pub const DOCX_RISK_DATA: &str = "docxRiskData";
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>>
    where
        Self: Sized,
    {
        match self.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()>
    where
        Self: Sized,
    {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw)
    }
}

/// In-memory store. Clones share the same map, the way two handles to
/// `window.localStorage` see the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    items: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        store.set("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap(), Some("1".to_string()));
        store.remove("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
    }

    #[test]
    fn test_clones_share_state() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.set(keys::SESSION_ID, "abc").unwrap();
        assert_eq!(other.get(keys::SESSION_ID).unwrap(), Some("abc".to_string()));
    }

    #[test]
    fn test_json_helpers() {
        let store = MemoryStore::new();
        store.set_json("nums", &vec![1, 2, 3]).unwrap();
        let nums: Option<Vec<u32>> = store.get_json("nums").unwrap();
        assert_eq!(nums, Some(vec![1, 2, 3]));
        let missing: Option<Vec<u32>> = store.get_json("missing").unwrap();
        assert!(missing.is_none());
    }
}
