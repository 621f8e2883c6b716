//! WASM bindings for the sprint and risk planning portal
//!
//! State lives in Rust (`portal-core`); JavaScript wires DOM events to the
//! exported sessions and renders what they return.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { AuthSession, SprintFormSession, DocumentViewer } from './pkg/portal_wasm.js';
//!
//! await init();
//!
//! const auth = new AuthSession(config);
//! if (!auth.isAuthenticated()) location.href = await AuthSession.googleAuthUrl(config);
//!
//! const form = new SprintFormSession(config);
//! form.setField("SprintOverview", "SprintNumber", "12");
//! form.saveSection("SprintOverview");
//! const progress = form.startProgress();
//! const timer = setInterval(() => progress.advance(), config.generation_stage_interval_ms);
//! const artifact = await form.generate(auth.userEmail());
//! clearInterval(timer);
//!
//! const viewer = new DocumentViewer(artifact, config);
//! container.innerHTML = viewer.displayHtml();
//! ```

pub mod auth;
pub mod export;
pub mod feedback;
pub mod forms;
pub mod list;
pub mod progress;
pub mod storage;
pub mod transport;
pub mod viewer;
pub mod workspace;

use portal_core::{PortalConfig, PortalError};
use serde::Serialize;
use wasm_bindgen::prelude::*;

pub use auth::AuthSession;
pub use feedback::FeedbackForm;
pub use forms::{RiskFormSession, SprintFormSession};
pub use list::ArtifactListView;
pub use progress::ProgressHandle;
pub use viewer::DocumentViewer;
pub use workspace::WorkspaceDirectory;

/// Initialize the WASM module
/// Called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Get the library version
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Defaults for every config field, as a JS object
#[wasm_bindgen(js_name = defaultConfig)]
pub fn default_config() -> Result<JsValue, JsValue> {
    to_js(&PortalConfig::default())
}

/// Read a JS config object; `undefined`, `null` or a malformed object
/// yields the defaults.
pub(crate) fn parse_config(value: &JsValue) -> PortalConfig {
    if value.is_undefined() || value.is_null() {
        return PortalConfig::default();
    }
    match serde_wasm_bindgen::from_value(value.clone()) {
        Ok(config) => config,
        Err(e) => {
            log(&format!("Ignoring invalid portal config: {}", e));
            PortalConfig::default()
        }
    }
}

pub(crate) fn js_error(err: PortalError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

pub(crate) fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    // Plain objects rather than Maps, so the page can read fields directly
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    value
        .serialize(&serializer)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

pub(crate) fn from_js<T: serde::de::DeserializeOwned>(value: JsValue) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| JsValue::from_str(&format!("Deserialization error: {}", e)))
}

pub(crate) fn log(message: &str) {
    web_sys::console::log_1(&message.into());
}
