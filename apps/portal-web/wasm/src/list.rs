//! Stored plans and assessments page

use std::cell::RefCell;

use portal_core::transport::PortalTransport;
use portal_core::{ArtifactKind, ArtifactList, ListFilter};
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::transport::FetchTransport;
use crate::{from_js, js_error, parse_config, to_js};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PageView<'a, T: Serialize> {
    items: &'a [T],
    current_page: usize,
    total_pages: usize,
    page_size: usize,
    page_sizes: &'a [usize],
    window: Vec<usize>,
    showing_from: usize,
    showing_to: usize,
    total_items: usize,
}

#[wasm_bindgen]
pub struct ArtifactListView {
    list: RefCell<ArtifactList>,
    transport: FetchTransport,
}

#[wasm_bindgen]
impl ArtifactListView {
    /// `kind` is "sprintPlan" or "riskAssessment"
    #[wasm_bindgen(constructor)]
    pub fn new(kind: JsValue, config: JsValue) -> Result<ArtifactListView, JsValue> {
        let kind: ArtifactKind = from_js(kind)?;
        let config = parse_config(&config);
        Ok(Self {
            list: RefCell::new(ArtifactList::new(kind, &config)),
            transport: FetchTransport::new(&config.api_base),
        })
    }

    /// Load items for a filter label ("Created by Me" or a workspace name).
    /// Resolves to the item count.
    #[wasm_bindgen(js_name = fetchAll)]
    pub async fn fetch_all(&self, filter: String, user_email: String) -> Result<usize, JsValue> {
        let filter = ListFilter::from_label(&filter);
        let kind = self.list.borrow().kind();
        let response = self.transport.send(filter.request(kind, &user_email)).await;
        self.list
            .borrow_mut()
            .apply_fetch(filter, response)
            .map_err(js_error)
    }

    #[wasm_bindgen(js_name = setQuery)]
    pub fn set_query(&self, query: &str) {
        self.list.borrow_mut().set_query(query);
    }

    /// Current page plus everything the pager needs
    pub fn page(&self) -> Result<JsValue, JsValue> {
        let list = self.list.borrow();
        let pagination = list.pagination();
        let (showing_from, showing_to, total_items) = pagination.showing();
        to_js(&PageView {
            items: list.page(),
            current_page: pagination.current_page(),
            total_pages: pagination.total_pages(),
            page_size: pagination.page_size(),
            page_sizes: pagination.page_sizes(),
            window: pagination.window(),
            showing_from,
            showing_to,
            total_items,
        })
    }

    #[wasm_bindgen(js_name = goTo)]
    pub fn go_to(&self, page: usize) -> bool {
        self.list.borrow_mut().pagination_mut().go_to(page)
    }

    pub fn next(&self) -> bool {
        self.list.borrow_mut().pagination_mut().next()
    }

    pub fn previous(&self) -> bool {
        self.list.borrow_mut().pagination_mut().previous()
    }

    pub fn first(&self) -> bool {
        self.list.borrow_mut().pagination_mut().first()
    }

    pub fn last(&self) -> bool {
        self.list.borrow_mut().pagination_mut().last()
    }

    #[wasm_bindgen(js_name = setPageSize)]
    pub fn set_page_size(&self, size: usize) -> bool {
        self.list.borrow_mut().pagination_mut().set_page_size(size)
    }

    /// Artifact for the viewer, or `undefined` for an unknown id
    pub fn open(&self, id: &str) -> Result<JsValue, JsValue> {
        let list = self.list.borrow();
        match list.find(id) {
            Some(summary) => to_js(&summary.to_artifact(list.kind())),
            None => Ok(JsValue::UNDEFINED),
        }
    }

    /// First step of a delete; returns the item's display key for the
    /// confirmation dialog
    #[wasm_bindgen(js_name = requestDelete)]
    pub fn request_delete(&self, id: &str) -> Option<String> {
        self.list
            .borrow_mut()
            .request_delete(id)
            .map(|item| item.display_key().to_string())
    }

    #[wasm_bindgen(js_name = cancelDelete)]
    pub fn cancel_delete(&self) {
        self.list.borrow_mut().cancel_delete();
    }

    #[wasm_bindgen(js_name = confirmDelete)]
    pub async fn confirm_delete(&self, user_email: String) -> Result<(), JsValue> {
        let Some(pending) = self.list.borrow().begin_delete(&user_email) else {
            return Ok(());
        };
        let response = self.transport.send(pending.request.clone()).await;
        self.list
            .borrow_mut()
            .finish_delete(pending, response)
            .map_err(js_error)
    }
}
