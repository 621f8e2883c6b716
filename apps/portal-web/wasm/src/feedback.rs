//! Feedback form bindings

use std::cell::RefCell;

use portal_core::feedback::{self, Feedback};
use portal_core::SessionStore;
use wasm_bindgen::prelude::*;

use crate::storage::BrowserStore;
use crate::transport::FetchTransport;
use crate::{js_error, parse_config, to_js};

#[wasm_bindgen]
pub struct FeedbackForm {
    form: RefCell<Feedback>,
    transport: FetchTransport,
}

#[wasm_bindgen]
impl FeedbackForm {
    /// Prefilled from the signed-in user, if any
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<FeedbackForm, JsValue> {
        let config = parse_config(&config);
        let session = SessionStore::restore(BrowserStore::local()).map_err(js_error)?;
        Ok(Self {
            form: RefCell::new(Feedback::for_user(session.user())),
            transport: FetchTransport::new(&config.api_base),
        })
    }

    /// Returns false for unknown field names
    #[wasm_bindgen(js_name = setField)]
    pub fn set_field(&self, field: &str, value: &str) -> bool {
        self.form.borrow_mut().set_field(field, value)
    }

    pub fn values(&self) -> Result<JsValue, JsValue> {
        to_js(&*self.form.borrow())
    }

    /// Submit and return the message to show; the form clears on success
    pub async fn submit(&self) -> Result<String, JsValue> {
        let form = self.form.borrow().clone();
        let message = feedback::submit_feedback(&self.transport, &form)
            .await
            .map_err(js_error)?;
        if message.starts_with("Thank you") {
            let session = SessionStore::restore(BrowserStore::local()).map_err(js_error)?;
            *self.form.borrow_mut() = Feedback::for_user(session.user());
        }
        Ok(message)
    }

    /// Past feedback, optionally for one user
    #[wasm_bindgen(js_name = listFeedback)]
    pub async fn list_feedback(&self, user_email: Option<String>) -> Result<JsValue, JsValue> {
        let entries = feedback::list_feedback(&self.transport, user_email.as_deref())
            .await
            .map_err(js_error)?;
        to_js(&entries)
    }
}
