//! `fetch`-backed transport for the portal backend

use async_trait::async_trait;
use portal_core::error::{PortalError, Result};
use portal_core::transport::{ApiRequest, PortalTransport};
use serde_json::Value;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{FormData, Request, RequestInit, RequestMode, Response};

use crate::log;

fn network(err: JsValue) -> PortalError {
    PortalError::Network(
        err.as_string()
            .unwrap_or_else(|| "request could not be sent".to_string()),
    )
}

#[derive(Debug, Clone, Default)]
pub struct FetchTransport {
    api_base: String,
}

impl FetchTransport {
    pub fn new(api_base: &str) -> Self {
        Self {
            api_base: api_base.to_string(),
        }
    }

    /// Multipart upload of one file plus optional text fields
    pub async fn upload(&self, path: &str, file: &web_sys::File, fields: &[(&str, &str)]) -> Result<Value> {
        let form = FormData::new().map_err(network)?;
        form.append_with_blob_and_filename("file", file, &file.name())
            .map_err(network)?;
        for (name, value) in fields {
            form.append_with_str(name, value).map_err(network)?;
        }

        let opts = RequestInit::new();
        opts.set_method("POST");
        opts.set_mode(RequestMode::Cors);
        opts.set_body(&form);
        let url = format!("{}{}", self.api_base.trim_end_matches('/'), path);
        let request = Request::new_with_str_and_init(&url, &opts).map_err(network)?;
        self.execute(request).await
    }

    async fn execute(&self, request: Request) -> Result<Value> {
        let window = web_sys::window().ok_or_else(|| PortalError::Network("No window".into()))?;
        let response = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(network)?;
        let response: Response = response.dyn_into().map_err(network)?;
        let status = response.status();

        // Error responses usually still carry a JSON body with a message
        let json = match response.json() {
            Ok(promise) => JsFuture::from(promise).await.ok(),
            Err(_) => None,
        };
        match json.map(serde_wasm_bindgen::from_value::<Value>) {
            Some(Ok(body)) => Ok(body),
            _ if !response.ok() => Err(PortalError::Network(format!(
                "HTTP error! status: {}",
                status
            ))),
            _ => Err(PortalError::Serialization(
                "Response was not valid JSON".to_string(),
            )),
        }
    }
}

#[async_trait(?Send)]
impl PortalTransport for FetchTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        let opts = RequestInit::new();
        opts.set_method(request.method.as_str());
        opts.set_mode(RequestMode::Cors);
        if let Some(body) = &request.body {
            let body_str = serde_json::to_string(body)?;
            opts.set_body(&JsValue::from_str(&body_str));
        }

        let fetch_request =
            Request::new_with_str_and_init(&request.url(&self.api_base), &opts).map_err(network)?;
        if request.body.is_some() {
            fetch_request
                .headers()
                .set("Content-Type", "application/json")
                .map_err(network)?;
        }
        log(&format!("{} {}", request.method.as_str(), request.path));
        self.execute(fetch_request).await
    }
}
