//! Progress bar handle shared with the page's interval timer

use portal_core::generation::ProgressTracker;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct ProgressHandle {
    tracker: ProgressTracker,
}

impl ProgressHandle {
    pub(crate) fn new(tracker: ProgressTracker) -> Self {
        Self { tracker }
    }
}

#[wasm_bindgen]
impl ProgressHandle {
    /// Step to the next stage; `false` once there is nothing left to show
    pub fn advance(&self) -> bool {
        self.tracker.advance().is_some()
    }

    #[wasm_bindgen(getter)]
    pub fn percent(&self) -> u8 {
        self.tracker.percent()
    }

    #[wasm_bindgen(getter)]
    pub fn message(&self) -> String {
        self.tracker.message()
    }

    #[wasm_bindgen(js_name = isComplete)]
    pub fn is_complete(&self) -> bool {
        self.tracker.is_complete()
    }
}
