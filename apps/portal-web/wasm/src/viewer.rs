//! Document viewer page: view, edit, comment, versions, SOW and export

use std::cell::RefCell;
use std::rc::Rc;

use chrono::Utc;
use js_sys::Function;
use portal_core::document::{ReplyOutcome, EditorMode};
use portal_core::export::{word_download, PdfExport};
use portal_core::generation::ProgressTracker;
use portal_core::share::ShareDialog;
use portal_core::sow::{check_sow_file, UploadedSow, SOW_UPLOAD_PATH};
use portal_core::transport::PortalTransport;
use portal_core::{DocumentEditor, GeneratedArtifact, PortalConfig, PortalError, SowReference};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use crate::export::{save_download, save_pdf};
use crate::progress::ProgressHandle;
use crate::storage::BrowserStore;
use crate::transport::FetchTransport;
use crate::{from_js, js_error, log, parse_config, to_js};

type ClickListener = Closure<dyn FnMut(web_sys::Event)>;

/// The one delegated click handler installed while in comments mode
struct HeaderListener {
    container: web_sys::HtmlElement,
    closure: ClickListener,
}

impl HeaderListener {
    fn detach(self) {
        let _ = self
            .container
            .remove_event_listener_with_callback("click", self.closure.as_ref().unchecked_ref());
    }
}

#[wasm_bindgen]
pub struct DocumentViewer {
    editor: Rc<RefCell<DocumentEditor>>,
    transport: FetchTransport,
    session: BrowserStore,
    share: RefCell<ShareDialog>,
    listener: RefCell<Option<HeaderListener>>,
    comment_progress: RefCell<ProgressTracker>,
}

impl DocumentViewer {
    fn open(artifact: GeneratedArtifact, config: &PortalConfig) -> Result<Self, PortalError> {
        let session = BrowserStore::session();
        let mut editor = DocumentEditor::open(artifact, config.chat_max_tokens);
        if editor.sow().is_none() {
            if let Some(sow) = SowReference::from_store(&session)? {
                editor.attach_sow(sow);
            }
        }
        Ok(Self {
            editor: Rc::new(RefCell::new(editor)),
            transport: FetchTransport::new(&config.api_base),
            session,
            share: RefCell::new(ShareDialog::new()),
            listener: RefCell::new(None),
            comment_progress: RefCell::new(ProgressTracker::default()),
        })
    }

    fn detach_listener(&self) {
        if let Some(listener) = self.listener.borrow_mut().take() {
            listener.detach();
        }
    }

    /// Snapshot for requests that only read the editor
    fn working_copy(&self) -> DocumentEditor {
        self.editor.borrow().clone()
    }
}

#[wasm_bindgen]
impl DocumentViewer {
    /// Open an artifact returned by `generate` or `ArtifactListView.open`
    #[wasm_bindgen(constructor)]
    pub fn new(artifact: JsValue, config: JsValue) -> Result<DocumentViewer, JsValue> {
        let artifact: GeneratedArtifact = from_js(artifact)?;
        Self::open(artifact, &parse_config(&config)).map_err(js_error)
    }

    /// "sprintPlan" or "riskAssessment"
    pub fn kind(&self) -> Result<JsValue, JsValue> {
        to_js(&self.editor.borrow().kind())
    }

    /// Sprint number or project name
    #[wasm_bindgen(js_name = displayKey)]
    pub fn display_key(&self) -> Option<String> {
        self.editor.borrow().artifact().display_key()
    }

    pub fn content(&self) -> String {
        self.editor.borrow().content().to_string()
    }

    #[wasm_bindgen(js_name = displayHtml)]
    pub fn display_html(&self) -> String {
        self.editor.borrow().display_html()
    }

    /// "view", "edit" or "comments"
    pub fn mode(&self) -> String {
        match self.editor.borrow().mode() {
            EditorMode::View => "view",
            EditorMode::Edit => "edit",
            EditorMode::Comments => "comments",
        }
        .to_string()
    }

    // Edit

    /// Switch to edit mode and return the buffer to show
    #[wasm_bindgen(js_name = enterEdit)]
    pub fn enter_edit(&self) -> String {
        self.detach_listener();
        let mut editor = self.editor.borrow_mut();
        editor.enter_edit();
        editor.buffer().to_string()
    }

    #[wasm_bindgen(js_name = setBuffer)]
    pub fn set_buffer(&self, text: &str) {
        self.editor.borrow_mut().set_buffer(text);
    }

    #[wasm_bindgen(js_name = cancelEdit)]
    pub fn cancel_edit(&self) {
        self.editor.borrow_mut().cancel_edit();
    }

    /// Save the buffer; returns the new version number if content changed
    #[wasm_bindgen(js_name = saveEdit)]
    pub fn save_edit(&self) -> Result<Option<u32>, JsValue> {
        self.editor.borrow_mut().save_edit().map_err(js_error)
    }

    // Comments

    /// Render the annotated document into `container` and route clicks on
    /// any comment button to `on_header(headerId, headingText)`.
    #[wasm_bindgen(js_name = enterComments)]
    pub fn enter_comments(&self, container: web_sys::HtmlElement, on_header: Function) -> Result<(), JsValue> {
        self.detach_listener();
        let html = self.editor.borrow_mut().enter_comments();
        container.set_inner_html(&html);

        let editor = Rc::clone(&self.editor);
        let closure: ClickListener = Closure::wrap(Box::new(move |event: web_sys::Event| {
            let Some(button) = event
                .target()
                .and_then(|t| t.dyn_into::<web_sys::Element>().ok())
                .and_then(|el| el.closest("[data-header-id]").ok().flatten())
            else {
                return;
            };
            let Some(header_id) = button.get_attribute("data-header-id") else {
                return;
            };
            event.prevent_default();
            let label = match editor.try_borrow() {
                Ok(editor) => editor.headers().label_for(&header_id).to_string(),
                Err(_) => return,
            };
            let _ = on_header.call2(&JsValue::NULL, &header_id.into(), &label.into());
        }));
        container.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref())?;
        *self.listener.borrow_mut() = Some(HeaderListener { container, closure });
        Ok(())
    }

    #[wasm_bindgen(js_name = exitComments)]
    pub fn exit_comments(&self) {
        self.detach_listener();
        self.editor.borrow_mut().exit_comments();
    }

    #[wasm_bindgen(js_name = startCommentProgress)]
    pub fn start_comment_progress(&self) -> ProgressHandle {
        let tracker = ProgressTracker::new(self.editor.borrow().comment_stages());
        *self.comment_progress.borrow_mut() = tracker.clone();
        ProgressHandle::new(tracker)
    }

    #[wasm_bindgen(js_name = isCommentInFlight)]
    pub fn is_comment_in_flight(&self) -> bool {
        self.editor.borrow().is_comment_in_flight()
    }

    /// Send a comment on one heading. Resolves to the new version number,
    /// or `undefined` when nothing changed or the comment was blank.
    #[wasm_bindgen(js_name = submitComment)]
    pub async fn submit_comment(&self, header_id: String, comment: String) -> Result<JsValue, JsValue> {
        let pending = self
            .editor
            .borrow_mut()
            .begin_comment(&header_id, &comment)
            .map_err(js_error)?;
        let Some(pending) = pending else {
            return Ok(JsValue::UNDEFINED);
        };

        let response = self.transport.send(pending.request.clone()).await;
        self.comment_progress.borrow().complete();

        let outcome = self
            .editor
            .borrow_mut()
            .finish_comment(pending, response)
            .map_err(js_error)?;
        match outcome {
            ReplyOutcome::Applied(version) => {
                self.detach_listener();
                Ok(version.map(JsValue::from).unwrap_or(JsValue::UNDEFINED))
            }
            ReplyOutcome::Stale => Ok(JsValue::UNDEFINED),
        }
    }

    // Versions

    pub fn versions(&self) -> Result<JsValue, JsValue> {
        to_js(self.editor.borrow().history().versions())
    }

    #[wasm_bindgen(js_name = currentVersion)]
    pub fn current_version(&self) -> u32 {
        self.editor.borrow().history().current()
    }

    pub fn restore(&self, version: u32) -> Result<(), JsValue> {
        self.detach_listener();
        self.editor.borrow_mut().restore(version).map_err(js_error)
    }

    /// Close the viewer. Comment responses still in flight are dropped.
    pub fn reset(&self) {
        self.detach_listener();
        self.editor.borrow_mut().reset();
    }

    // SOW

    #[wasm_bindgen(js_name = sowFileName)]
    pub fn sow_file_name(&self) -> Option<String> {
        self.editor.borrow().sow().map(|s| s.file_name.clone())
    }

    /// Upload a SOW, keep it for later pages and attach it here
    #[wasm_bindgen(js_name = uploadSow)]
    pub async fn upload_sow(&self, file: web_sys::File) -> Result<String, JsValue> {
        check_sow_file(&file.name(), &file.type_()).map_err(js_error)?;
        let body = self
            .transport
            .upload(SOW_UPLOAD_PATH, &file, &[])
            .await
            .map_err(js_error)?;
        let uploaded = UploadedSow::from_response(&body).map_err(js_error)?;
        let sow = SowReference::store_upload(
            &self.session,
            &uploaded.raw_text,
            uploaded.html_content.as_deref(),
            &file.name(),
        )
        .map_err(js_error)?;
        self.editor.borrow_mut().attach_sow(sow);
        Ok(format!("SOW \"{}\" uploaded successfully", file.name()))
    }

    /// Check alignment with the attached SOW
    pub async fn validate(&self) -> Result<JsValue, JsValue> {
        let editor = self.working_copy();
        let report = editor.validate(&self.transport).await.map_err(js_error)?;
        to_js(&report)
    }

    #[wasm_bindgen(js_name = saveSow)]
    pub async fn save_sow(&self) -> Result<(), JsValue> {
        let editor = self.working_copy();
        editor.save_sow(&self.transport).await.map_err(js_error)
    }

    /// Regenerate with the attached SOW; resolves to the new version number
    pub async fn regenerate(&self) -> Result<Option<u32>, JsValue> {
        let pending = self.editor.borrow_mut().begin_regeneration().map_err(js_error)?;
        let response = self.transport.send(pending.request.clone()).await;
        let outcome = self
            .editor
            .borrow_mut()
            .finish_regeneration(pending, response)
            .map_err(js_error)?;
        match outcome {
            ReplyOutcome::Applied(version) => {
                self.detach_listener();
                Ok(version)
            }
            ReplyOutcome::Stale => Ok(None),
        }
    }

    #[wasm_bindgen(js_name = isRegenerating)]
    pub fn is_regenerating(&self) -> bool {
        self.editor.borrow().is_regenerating()
    }

    // Export

    #[wasm_bindgen(js_name = exportPdf)]
    pub async fn export_pdf(&self) -> Result<(), JsValue> {
        let export = {
            let editor = self.editor.borrow();
            PdfExport::for_artifact(editor.artifact(), editor.content(), Utc::now().date_naive())
        };
        save_pdf(&export).await
    }

    /// Download the backend-supplied Word document
    #[wasm_bindgen(js_name = downloadWord)]
    pub fn download_word(&self, word_document: Option<String>) -> Result<(), JsValue> {
        let download = {
            let editor = self.editor.borrow();
            word_download(
                editor.kind(),
                editor.artifact().display_key().as_deref(),
                word_document.as_deref(),
                Utc::now().date_naive(),
            )
            .map_err(js_error)?
        };
        save_download(&download)
    }

    // Share

    #[wasm_bindgen(js_name = setShareRecipient)]
    pub fn set_share_recipient(&self, to: &str) {
        self.share.borrow_mut().draft.to = to.to_string();
    }

    #[wasm_bindgen(js_name = setShareMessage)]
    pub fn set_share_message(&self, description: &str) {
        self.share.borrow_mut().draft.description = description.to_string();
    }

    /// `{state, message?}` for the share banner
    #[wasm_bindgen(js_name = shareState)]
    pub fn share_state(&self) -> Result<JsValue, JsValue> {
        to_js(self.share.borrow().state())
    }

    /// Send the share email. `shareState()` reports `sending` until the
    /// backend answers.
    #[wasm_bindgen(js_name = sendShare)]
    pub async fn send_share(&self) -> Result<(), JsValue> {
        let pending = {
            let editor = self.editor.borrow();
            let name = editor.artifact().display_key();
            self.share
                .borrow_mut()
                .begin_send(name.as_deref(), editor.content())
                .map_err(js_error)?
        };
        let response = self.transport.send(pending.request.clone()).await;
        self.share
            .borrow_mut()
            .finish_send(pending, response)
            .map_err(js_error)?;
        log("Sprint plan shared by email");
        Ok(())
    }

    #[wasm_bindgen(js_name = dismissShare)]
    pub fn dismiss_share(&self) {
        self.share.borrow_mut().dismiss();
    }
}

impl Drop for DocumentViewer {
    fn drop(&mut self) {
        self.detach_listener();
    }
}
