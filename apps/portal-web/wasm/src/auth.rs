//! Sign-in state and the Google OAuth round-trip

use std::cell::RefCell;

use portal_core::session::{complete_google_callback, google_auth_url};
use portal_core::{AuthorizationPolicy, SessionStore};
use wasm_bindgen::prelude::*;

use crate::storage::BrowserStore;
use crate::transport::FetchTransport;
use crate::{js_error, log, parse_config, to_js};

#[wasm_bindgen]
pub struct AuthSession {
    session: RefCell<SessionStore<BrowserStore>>,
    transport: FetchTransport,
    policy: AuthorizationPolicy,
}

#[wasm_bindgen]
impl AuthSession {
    /// Restore any session saved in localStorage
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<AuthSession, JsValue> {
        let config = parse_config(&config);
        let session = SessionStore::restore(BrowserStore::local()).map_err(js_error)?;
        Ok(Self {
            session: RefCell::new(session),
            transport: FetchTransport::new(&config.api_base),
            policy: AuthorizationPolicy::from_config(&config),
        })
    }

    /// URL of the Google consent page
    #[wasm_bindgen(js_name = googleAuthUrl)]
    pub async fn google_auth_url(config: JsValue) -> Result<String, JsValue> {
        let config = parse_config(&config);
        google_auth_url(&FetchTransport::new(&config.api_base))
            .await
            .map_err(js_error)
    }

    #[wasm_bindgen(js_name = isAuthenticated)]
    pub fn is_authenticated(&self) -> bool {
        self.session.borrow().is_authenticated()
    }

    #[wasm_bindgen(js_name = isAdmin)]
    pub fn is_admin(&self) -> bool {
        self.session
            .borrow()
            .user()
            .is_some_and(|user| self.policy.is_admin(user))
    }

    /// The signed-in user, or `undefined`
    pub fn user(&self) -> Result<JsValue, JsValue> {
        match self.session.borrow().user() {
            Some(user) => to_js(user),
            None => Ok(JsValue::UNDEFINED),
        }
    }

    #[wasm_bindgen(js_name = userEmail)]
    pub fn user_email(&self) -> String {
        self.session.borrow().user_email()
    }

    #[wasm_bindgen(js_name = sessionId)]
    pub fn session_id(&self) -> Option<String> {
        self.session.borrow().session_id().map(str::to_string)
    }

    /// Finish the OAuth redirect using the `code` / `error` query parameters
    #[wasm_bindgen(js_name = completeCallback)]
    pub async fn complete_callback(&self, code: Option<String>, error: Option<String>) -> Result<JsValue, JsValue> {
        // A separate handle on the same storage, so no borrow spans the request
        let mut pending = SessionStore::restore(BrowserStore::local()).map_err(js_error)?;
        let user = complete_google_callback(
            &self.transport,
            &mut pending,
            code.as_deref(),
            error.as_deref(),
        )
        .await
        .map_err(js_error)?;
        *self.session.borrow_mut() = pending;
        log(&format!("Signed in as {}", user.email));
        to_js(&user)
    }

    pub fn logout(&self) -> Result<(), JsValue> {
        self.session.borrow_mut().logout().map_err(js_error)
    }
}
