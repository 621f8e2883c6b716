//! Form pages: sprint planning and risk assessment sessions
//!
//! Both sessions share [`FormState`]; the exported types add the list
//! helpers specific to each form. Methods take `&self` so an awaiting
//! `generate` does not lock the object against other calls.

use std::cell::RefCell;

use portal_core::error::{PortalError, Result};
use portal_core::forms::{
    consume_generated_flag, RiskAssessmentForm, SectionId, SprintPlanForm,
};
use portal_core::generation::{GenerationTarget, GenerationWorkflow, ProgressTracker};
use portal_core::import::{
    import_risk_document, import_risk_workbook, import_sprint_document, import_sprint_workbook,
    ImportNotice, ImportOutcome,
};
use portal_core::sow::{check_docx_file, docx_feature_type, docx_payload, DOCX_UPLOAD_PATH};
use portal_core::storage::{keys, KeyValueStore};
use portal_core::workspace::selected_workspace;
use portal_core::{FormDocument, FormModel, PayloadContext, PortalConfig, SowReference};
use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::prelude::*;

use crate::progress::ProgressHandle;
use crate::storage::BrowserStore;
use crate::transport::FetchTransport;
use crate::{from_js, js_error, log, parse_config, to_js};

/// Per-form import wiring
trait PortalForm: GenerationTarget {
    const WORKBOOK_KEY: &'static str;
    const DOCUMENT_KEY: &'static str;

    fn from_workbook(payload: &Value, config: &PortalConfig) -> ImportOutcome<Self>;
    fn from_document(payload: &Value, config: &PortalConfig) -> ImportOutcome<Self>;
}

impl PortalForm for SprintPlanForm {
    const WORKBOOK_KEY: &'static str = keys::EXCEL_SPRINT_DATA;
    const DOCUMENT_KEY: &'static str = keys::DOCX_SPRINT_DATA;

    fn from_workbook(payload: &Value, config: &PortalConfig) -> ImportOutcome<Self> {
        import_sprint_workbook(payload, config)
    }

    fn from_document(payload: &Value, config: &PortalConfig) -> ImportOutcome<Self> {
        import_sprint_document(payload, config)
    }
}

impl PortalForm for RiskAssessmentForm {
    const WORKBOOK_KEY: &'static str = keys::EXCEL_RISK_DATA;
    const DOCUMENT_KEY: &'static str = keys::DOCX_RISK_DATA;

    fn from_workbook(payload: &Value, config: &PortalConfig) -> ImportOutcome<Self> {
        import_risk_workbook(payload, config)
    }

    fn from_document(payload: &Value, config: &PortalConfig) -> ImportOutcome<Self> {
        import_risk_document(payload, config)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FormStatus {
    completed: Vec<&'static str>,
    saved: Vec<&'static str>,
    missing: Vec<String>,
    complete: bool,
}

struct FormState<F: PortalForm> {
    doc: RefCell<FormDocument<F>>,
    local: BrowserStore,
    session: BrowserStore,
    transport: FetchTransport,
    config: PortalConfig,
    workflow: GenerationWorkflow,
    progress: RefCell<ProgressTracker>,
    /// Set when the previous visit ended in a generation
    was_reset: bool,
}

impl<F: PortalForm> FormState<F> {
    fn open(config: PortalConfig) -> Result<Self> {
        let local = BrowserStore::local();
        let was_reset = consume_generated_flag::<F, _>(&local)?;
        let doc = FormDocument::<F>::restore(&local)?;
        Ok(Self {
            doc: RefCell::new(doc),
            local,
            session: BrowserStore::session(),
            transport: FetchTransport::new(&config.api_base),
            config,
            workflow: GenerationWorkflow::new(),
            progress: RefCell::new(ProgressTracker::default()),
            was_reset,
        })
    }

    fn section(key: &str) -> Result<F::Section> {
        F::Section::from_key(key)
            .ok_or_else(|| PortalError::InvalidInput(format!("Unknown section: {}", key)))
    }

    fn status(&self) -> FormStatus {
        let doc = self.doc.borrow();
        FormStatus {
            completed: doc.completed_sections().iter().map(|s| s.key()).collect(),
            saved: doc.saved_sections().iter().map(|s| s.key()).collect(),
            missing: doc.form().missing_sections(),
            complete: doc.is_complete(),
        }
    }

    fn set_field(&self, section: &str, key: &str, value: &str) -> Result<()> {
        let section = Self::section(section)?;
        self.doc.borrow_mut().set_field(section, key, value);
        Ok(())
    }

    fn save_section(&self, section: &str) -> Result<()> {
        let section = Self::section(section)?;
        self.doc.borrow_mut().save_section(&self.local, section)
    }

    fn reset_section(&self, section: &str) -> Result<()> {
        let section = Self::section(section)?;
        self.doc.borrow_mut().reset_section(&self.local, section)
    }

    fn reset_form(&self) -> Result<()> {
        self.doc.borrow_mut().reset_form(&self.local)
    }

    fn apply(&self, outcome: ImportOutcome<F>) -> ImportNotice {
        outcome.apply(&mut self.doc.borrow_mut())
    }

    fn import_workbook(&self, payload: &Value) -> ImportNotice {
        self.apply(F::from_workbook(payload, &self.config))
    }

    /// Apply an import handed over from another page through session storage
    fn take_pending_import(&self) -> Result<Option<ImportNotice>> {
        for (key, is_workbook) in [(F::WORKBOOK_KEY, true), (F::DOCUMENT_KEY, false)] {
            let Some(payload) = self.session.get_json::<Value>(key)? else {
                continue;
            };
            self.session.remove(key)?;
            let outcome = if is_workbook {
                F::from_workbook(&payload, &self.config)
            } else {
                F::from_document(&payload, &self.config)
            };
            return Ok(Some(self.apply(outcome)));
        }
        Ok(None)
    }

    async fn upload_document(&self, file: &web_sys::File) -> Result<ImportNotice> {
        check_docx_file(&file.name())?;
        let body = self
            .transport
            .upload(DOCX_UPLOAD_PATH, file, &[("feature_type", docx_feature_type(F::KIND))])
            .await?;
        let payload = docx_payload(&body)?;
        Ok(self.apply(F::from_document(&payload, &self.config)))
    }

    fn start_progress(&self) -> ProgressHandle {
        let tracker = ProgressTracker::new(self.doc.borrow().form().progress_stages());
        *self.progress.borrow_mut() = tracker.clone();
        ProgressHandle::new(tracker)
    }

    async fn generate(&self, user_email: &str) -> Result<JsValue> {
        let workspace_id = selected_workspace(&self.local)?.map(|ws| ws.id);
        let ctx = PayloadContext::new(user_email)
            .with_sow(SowReference::from_store(&self.session)?)
            .with_workspace_id(workspace_id);
        let progress = self.progress.borrow().clone();

        // Work on a copy so no borrow is held across the request. Success
        // resets the form, so the copy replaces any edits made meanwhile.
        let mut doc = self.doc.borrow().clone();
        let artifact = self
            .workflow
            .generate(&mut doc, &self.local, &self.transport, &ctx, &progress)
            .await?;
        *self.doc.borrow_mut() = doc;
        log(&format!("Generated {}", F::KIND.noun()));
        to_js(&artifact).map_err(|e| {
            PortalError::Serialization(e.as_string().unwrap_or_default())
        })
    }
}

macro_rules! form_session_bindings {
    ($session:ident) => {
        #[wasm_bindgen]
        impl $session {
            /// True when the saved data was cleared because the last visit
            /// ended in a generation
            #[wasm_bindgen(js_name = wasReset)]
            pub fn was_reset(&self) -> bool {
                self.state.was_reset
            }

            #[wasm_bindgen(js_name = formData)]
            pub fn form_data(&self) -> std::result::Result<JsValue, JsValue> {
                to_js(self.state.doc.borrow().form())
            }

            /// Completed, saved and missing sections
            pub fn status(&self) -> std::result::Result<JsValue, JsValue> {
                to_js(&self.state.status())
            }

            #[wasm_bindgen(js_name = setField)]
            pub fn set_field(&self, section: &str, key: &str, value: &str) -> std::result::Result<(), JsValue> {
                self.state.set_field(section, key, value).map_err(js_error)
            }

            #[wasm_bindgen(js_name = saveSection)]
            pub fn save_section(&self, section: &str) -> std::result::Result<(), JsValue> {
                self.state.save_section(section).map_err(js_error)
            }

            #[wasm_bindgen(js_name = resetSection)]
            pub fn reset_section(&self, section: &str) -> std::result::Result<(), JsValue> {
                self.state.reset_section(section).map_err(js_error)
            }

            #[wasm_bindgen(js_name = resetForm)]
            pub fn reset_form(&self) -> std::result::Result<(), JsValue> {
                self.state.reset_form().map_err(js_error)
            }

            /// Apply a workbook or document handed over by the upload page.
            /// Returns the notice to show, or `undefined`.
            #[wasm_bindgen(js_name = takePendingImport)]
            pub fn take_pending_import(&self) -> std::result::Result<JsValue, JsValue> {
                match self.state.take_pending_import().map_err(js_error)? {
                    Some(notice) => to_js(&notice),
                    None => Ok(JsValue::UNDEFINED),
                }
            }

            /// Rows parsed from a spreadsheet
            #[wasm_bindgen(js_name = importWorkbook)]
            pub fn import_workbook(&self, payload: JsValue) -> std::result::Result<JsValue, JsValue> {
                let payload: Value = from_js(payload)?;
                to_js(&self.state.import_workbook(&payload))
            }

            /// Upload a .docx and fill the form from the parsed result
            #[wasm_bindgen(js_name = uploadDocument)]
            pub async fn upload_document(&self, file: web_sys::File) -> std::result::Result<JsValue, JsValue> {
                let notice = self.state.upload_document(&file).await.map_err(js_error)?;
                to_js(&notice)
            }

            /// Fresh progress handle for the next generation
            #[wasm_bindgen(js_name = startProgress)]
            pub fn start_progress(&self) -> ProgressHandle {
                self.state.start_progress()
            }

            #[wasm_bindgen(js_name = isGenerating)]
            pub fn is_generating(&self) -> bool {
                self.state.workflow.is_in_flight()
            }

            /// Generate and return the artifact for the viewer
            pub async fn generate(&self, user_email: String) -> std::result::Result<JsValue, JsValue> {
                self.state.generate(&user_email).await.map_err(js_error)
            }
        }
    };
}

/// Row ids stay small; JS numbers are easier to handle than BigInt
fn js_id(id: u64) -> u32 {
    u32::try_from(id).unwrap_or(u32::MAX)
}

#[wasm_bindgen]
pub struct SprintFormSession {
    state: FormState<SprintPlanForm>,
}

#[wasm_bindgen]
impl SprintFormSession {
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> std::result::Result<SprintFormSession, JsValue> {
        let state = FormState::open(parse_config(&config)).map_err(js_error)?;
        Ok(Self { state })
    }

    #[wasm_bindgen(js_name = addTeamMember)]
    pub fn add_team_member(&self) -> u32 {
        js_id(self.state.doc.borrow_mut().form_mut().add_team_member())
    }

    #[wasm_bindgen(js_name = removeTeamMember)]
    pub fn remove_team_member(&self, id: u32) -> bool {
        self.state.doc.borrow_mut().form_mut().remove_team_member(u64::from(id))
    }

    #[wasm_bindgen(js_name = updateTeamMember)]
    pub fn update_team_member(&self, id: u32, field: &str, value: &str) -> bool {
        self.state
            .doc
            .borrow_mut()
            .form_mut()
            .update_team_member(u64::from(id), field, value)
    }

    #[wasm_bindgen(js_name = addBacklogItem)]
    pub fn add_backlog_item(&self) -> u32 {
        js_id(self.state.doc.borrow_mut().form_mut().add_backlog_item())
    }

    #[wasm_bindgen(js_name = removeBacklogItem)]
    pub fn remove_backlog_item(&self, id: u32) -> bool {
        self.state.doc.borrow_mut().form_mut().remove_backlog_item(u64::from(id))
    }

    #[wasm_bindgen(js_name = updateBacklogItem)]
    pub fn update_backlog_item(&self, id: u32, field: &str, value: &str) -> bool {
        self.state
            .doc
            .borrow_mut()
            .form_mut()
            .update_backlog_item(u64::from(id), field, value)
    }

    /// Step the effort estimate; returns the new value
    #[wasm_bindgen(js_name = adjustEffort)]
    pub fn adjust_effort(&self, id: u32, delta: f64) -> Option<f64> {
        self.state.doc.borrow_mut().form_mut().adjust_effort(u64::from(id), delta)
    }
}

form_session_bindings!(SprintFormSession);

#[wasm_bindgen]
pub struct RiskFormSession {
    state: FormState<RiskAssessmentForm>,
}

#[wasm_bindgen]
impl RiskFormSession {
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> std::result::Result<RiskFormSession, JsValue> {
        let state = FormState::open(parse_config(&config)).map_err(js_error)?;
        Ok(Self { state })
    }

    #[wasm_bindgen(js_name = riskCount)]
    pub fn risk_count(&self) -> usize {
        self.state.doc.borrow().form().len()
    }

    #[wasm_bindgen(js_name = currentIndex)]
    pub fn current_index(&self) -> usize {
        self.state.doc.borrow().form().current_index()
    }

    /// Append a record and move to it; returns its index
    #[wasm_bindgen(js_name = addRisk)]
    pub fn add_risk(&self) -> usize {
        self.state.doc.borrow_mut().form_mut().add_record()
    }

    #[wasm_bindgen(js_name = removeRisk)]
    pub fn remove_risk(&self) -> std::result::Result<(), JsValue> {
        self.state
            .doc
            .borrow_mut()
            .form_mut()
            .remove_record()
            .map_err(js_error)
    }

    #[wasm_bindgen(js_name = switchTo)]
    pub fn switch_to(&self, index: usize) -> bool {
        self.state.doc.borrow_mut().form_mut().switch_to(index)
    }
}

form_session_bindings!(RiskFormSession);
