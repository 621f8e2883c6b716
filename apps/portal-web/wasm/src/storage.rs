//! `localStorage` / `sessionStorage` behind the core key-value trait

use portal_core::error::{PortalError, Result};
use portal_core::storage::KeyValueStore;
use wasm_bindgen::JsValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageArea {
    /// Survives reloads: session, saved sections, generated flags
    Local,
    /// Tab-scoped handoff between pages: SOW text, imported payloads
    Session,
}

#[derive(Debug, Clone, Copy)]
pub struct BrowserStore {
    area: StorageArea,
}

impl BrowserStore {
    pub fn local() -> Self {
        Self {
            area: StorageArea::Local,
        }
    }

    pub fn session() -> Self {
        Self {
            area: StorageArea::Session,
        }
    }

    fn storage(&self) -> Result<web_sys::Storage> {
        let window = web_sys::window().ok_or_else(|| PortalError::Storage("No window".into()))?;
        let storage = match self.area {
            StorageArea::Local => window.local_storage(),
            StorageArea::Session => window.session_storage(),
        };
        storage
            .map_err(storage_error)?
            .ok_or_else(|| PortalError::Storage(format!("{:?} storage not available", self.area)))
    }
}

fn storage_error(err: JsValue) -> PortalError {
    PortalError::Storage(err.as_string().unwrap_or_else(|| "storage access denied".into()))
}

impl KeyValueStore for BrowserStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.storage()?.get_item(key).map_err(storage_error)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.storage()?.set_item(key, value).map_err(storage_error)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.storage()?.remove_item(key).map_err(storage_error)
    }
}

// WASM-specific tests that run in a browser environment
#[cfg(test)]
#[cfg(target_arch = "wasm32")]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_session_storage_roundtrip() {
        let store = BrowserStore::session();
        store.set("portal-test-key", "value").unwrap();
        assert_eq!(store.get("portal-test-key").unwrap().as_deref(), Some("value"));
        store.remove("portal-test-key").unwrap();
        assert_eq!(store.get("portal-test-key").unwrap(), None);
    }

    #[wasm_bindgen_test]
    fn test_areas_are_separate() {
        BrowserStore::local().set("portal-area-key", "local").unwrap();
        assert_eq!(BrowserStore::session().get("portal-area-key").unwrap(), None);
        BrowserStore::local().remove("portal-area-key").unwrap();
    }
}
