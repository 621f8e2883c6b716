//! Session/identity store and Google OAuth handshake
//!
//! The authenticated user and session token are persisted under the
//! `user` / `sessionId` keys. A session is authenticated only when both exist.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::config::PortalConfig;
use crate::error::{PortalError, Result};
use crate::storage::{keys, KeyValueStore};
use crate::transport::{ApiRequest, PortalTransport};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct User {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    /// Role claims issued by the backend
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    /// Anything else the backend sends is kept so it round-trips through storage
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    pub fn new(email: &str, name: &str) -> Self {
        Self {
            email: email.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_role(mut self, role: &str) -> Self {
        self.roles.push(role.to_string());
        self
    }
}

/// Who may perform administrative actions (workspace deletion, monitoring).
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizationPolicy {
    admin_role: String,
    admin_emails: Vec<String>,
}

impl AuthorizationPolicy {
    pub fn new(admin_role: &str, admin_emails: Vec<String>) -> Self {
        Self {
            admin_role: admin_role.to_string(),
            admin_emails: admin_emails
                .into_iter()
                .map(|e| e.trim().to_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &PortalConfig) -> Self {
        Self::new(&config.admin_role, config.admin_emails.clone())
    }

    pub fn is_admin(&self, user: &User) -> bool {
        if user.roles.iter().any(|r| r.eq_ignore_ascii_case(&self.admin_role)) {
            return true;
        }
        let email = user.email.trim().to_lowercase();
        !email.is_empty() && self.admin_emails.contains(&email)
    }
}

impl Default for AuthorizationPolicy {
    fn default() -> Self {
        Self::from_config(&PortalConfig::default())
    }
}

pub struct SessionStore<S: KeyValueStore> {
    store: S,
    user: Option<User>,
    session_id: Option<String>,
}

impl<S: KeyValueStore> SessionStore<S> {
    /// Restore any persisted session from `store`.
    ///
    /// A corrupt `user` entry is dropped rather than failing startup.
    pub fn restore(store: S) -> Result<Self> {
        let session_id = store.get(keys::SESSION_ID)?.filter(|s| !s.is_empty());
        let user = match store.get(keys::USER)? {
            Some(raw) => match serde_json::from_str::<User>(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!("Discarding unreadable stored user: {}", e);
                    store.remove(keys::USER)?;
                    None
                }
            },
            None => None,
        };
        Ok(Self {
            store,
            user,
            session_id,
        })
    }

    pub fn login(&mut self, user: User, session_id: &str) -> Result<()> {
        self.store.set_json(keys::USER, &user)?;
        self.store.set(keys::SESSION_ID, session_id)?;
        info!("Signed in as {}", user.email);
        self.user = Some(user);
        self.session_id = Some(session_id.to_string());
        Ok(())
    }

    pub fn logout(&mut self) -> Result<()> {
        self.store.remove(keys::USER)?;
        self.store.remove(keys::SESSION_ID)?;
        self.user = None;
        self.session_id = None;
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.session_id.is_some()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Email used to scope backend requests, empty when signed out
    pub fn user_email(&self) -> String {
        self.user.as_ref().map(|u| u.email.clone()).unwrap_or_default()
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

/// Fetch the Google consent URL to redirect the browser to
pub async fn google_auth_url<T: PortalTransport + ?Sized>(transport: &T) -> Result<String> {
    let body = transport.send(ApiRequest::get("/api/auth/google/url")).await?;
    body.get("auth_url")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .ok_or_else(|| PortalError::Backend("Failed to get Google authentication URL".into()))
}

/// Exchange the OAuth callback parameters for a portal session
pub async fn complete_google_callback<T, S>(
    transport: &T,
    session: &mut SessionStore<S>,
    code: Option<&str>,
    error: Option<&str>,
) -> Result<User>
where
    T: PortalTransport + ?Sized,
    S: KeyValueStore,
{
    if error.is_some_and(|e| !e.is_empty()) {
        return Err(PortalError::InvalidInput(
            "Google OAuth was cancelled or failed.".into(),
        ));
    }
    let code = match code {
        Some(c) if !c.is_empty() => c,
        _ => {
            return Err(PortalError::InvalidInput(
                "No authorization code received from Google.".into(),
            ))
        }
    };

    let body = transport
        .send(ApiRequest::post(
            "/api/auth/google/callback",
            json!({ "code": code }),
        ))
        .await?;

    if !body.get("success").and_then(Value::as_bool).unwrap_or(false) {
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Authentication failed.");
        return Err(PortalError::Backend(message.to_string()));
    }

    let user: User = serde_json::from_value(body.get("user").cloned().unwrap_or(Value::Null))?;
    let session_id = body
        .get("session_id")
        .and_then(Value::as_str)
        .ok_or_else(|| PortalError::Backend("Authentication failed.".into()))?;
    session.login(user.clone(), session_id)?;
    Ok(user)
}
