//! Scripted backend shared by the integration tests

use std::cell::RefCell;
use std::collections::VecDeque;

use async_trait::async_trait;
use portal_core::error::{PortalError, Result};
use portal_core::transport::{ApiRequest, PortalTransport};
use serde_json::Value;

/// Answers requests from a queue, in order, and records what was sent
#[derive(Default)]
pub struct ScriptedBackend {
    replies: RefCell<VecDeque<Result<Value>>>,
    sent: RefCell<Vec<ApiRequest>>,
}

#[allow(dead_code)]
impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(self, body: Value) -> Self {
        self.replies.borrow_mut().push_back(Ok(body));
        self
    }

    pub fn then_fail(self, error: PortalError) -> Self {
        self.replies.borrow_mut().push_back(Err(error));
        self
    }

    pub fn sent(&self) -> Vec<ApiRequest> {
        self.sent.borrow().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.sent.borrow().iter().map(|r| r.path.clone()).collect()
    }
}

#[async_trait(?Send)]
impl PortalTransport for ScriptedBackend {
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        let path = request.path.clone();
        self.sent.borrow_mut().push(request);
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(PortalError::Network(format!("no reply scripted for {}", path))))
    }
}
