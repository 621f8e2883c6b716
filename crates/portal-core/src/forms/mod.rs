//! Multi-section form model
//!
//! A form is a fixed, ordered set of sections. Each section has a pure
//! completion predicate and can be saved to (or reset from) a JSON snapshot
//! kept in a [`KeyValueStore`] under the form's storage key. Saved and
//! completed status are tracked independently: editing a saved section does
//! not unmark it.

pub mod risk;
pub mod sprint;

use std::collections::BTreeSet;
use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{PortalError, Result};
use crate::storage::KeyValueStore;

pub use risk::{RiskAssessmentForm, RiskRecord, RiskSection};
pub use sprint::{BacklogItem, SprintPlanForm, SprintSection, TeamMember};

/// Identifier of one form section
pub trait SectionId: Copy + Eq + Ord + Debug + 'static {
    /// Stable key used in payloads and snapshots, e.g. `SprintOverview`
    fn key(&self) -> &'static str;
    /// Label shown to the user when the section is incomplete
    fn display_name(&self) -> &'static str;
    fn from_key(key: &str) -> Option<Self>;
}

pub trait FormModel: Default + Clone + Serialize + DeserializeOwned {
    type Section: SectionId;

    /// localStorage key holding saved section snapshots
    const STORAGE_KEY: &'static str;
    /// localStorage key of the "just generated" sentinel
    const GENERATED_FLAG: &'static str;

    fn sections() -> &'static [Self::Section];

    fn is_section_complete(&self, section: Self::Section) -> bool;

    /// Set a scalar field. Unknown keys are ignored.
    fn set_field(&mut self, section: Self::Section, key: &str, value: &str);

    fn section_value(&self, section: Self::Section) -> Result<Value>;

    fn load_section_value(&mut self, section: Self::Section, value: Value) -> Result<()>;

    fn reset_section(&mut self, section: Self::Section);

    /// Human-readable list of what blocks generation, empty when complete
    fn missing_sections(&self) -> Vec<String> {
        Self::sections()
            .iter()
            .filter(|s| !self.is_section_complete(**s))
            .map(|s| s.display_name().to_string())
            .collect()
    }
}

/// True when any string or number inside `value` is non-empty after trim
pub(crate) fn any_field_filled(value: &Value) -> bool {
    match value {
        Value::String(s) => !s.trim().is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::Array(items) => items.iter().any(any_field_filled),
        Value::Object(map) => map.values().any(any_field_filled),
        Value::Bool(_) | Value::Null => false,
    }
}

/// A form plus its saved-section bookkeeping
#[derive(Debug, Clone)]
pub struct FormDocument<F: FormModel> {
    form: F,
    saved: BTreeSet<F::Section>,
}

impl<F: FormModel> Default for FormDocument<F> {
    fn default() -> Self {
        Self::new(F::default())
    }
}

impl<F: FormModel> FormDocument<F> {
    pub fn new(form: F) -> Self {
        Self {
            form,
            saved: BTreeSet::new(),
        }
    }

    /// Rebuild from the persisted snapshot. Sections present in the snapshot
    /// are loaded and marked saved; unreadable entries are skipped.
    pub fn restore<S: KeyValueStore>(store: &S) -> Result<Self> {
        let mut doc = Self::default();
        let snapshot = read_snapshot(store, F::STORAGE_KEY)?;
        for (key, value) in snapshot {
            let Some(section) = F::Section::from_key(&key) else {
                continue;
            };
            match doc.form.load_section_value(section, value) {
                Ok(()) => {
                    doc.saved.insert(section);
                }
                Err(e) => debug!("Skipping saved section {}: {}", key, e),
            }
        }
        Ok(doc)
    }

    pub fn form(&self) -> &F {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut F {
        &mut self.form
    }

    pub fn set_field(&mut self, section: F::Section, key: &str, value: &str) {
        self.form.set_field(section, key, value);
    }

    pub fn is_section_complete(&self, section: F::Section) -> bool {
        self.form.is_section_complete(section)
    }

    pub fn completed_sections(&self) -> BTreeSet<F::Section> {
        F::sections()
            .iter()
            .copied()
            .filter(|s| self.form.is_section_complete(*s))
            .collect()
    }

    pub fn saved_sections(&self) -> &BTreeSet<F::Section> {
        &self.saved
    }

    pub fn is_saved(&self, section: F::Section) -> bool {
        self.saved.contains(&section)
    }

    pub fn is_complete(&self) -> bool {
        self.form.missing_sections().is_empty()
    }

    /// Fail with [`PortalError::IncompleteForm`] unless every section is complete
    pub fn ensure_complete(&self) -> Result<()> {
        let missing = self.form.missing_sections();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PortalError::IncompleteForm { missing })
        }
    }

    pub fn save_section<S: KeyValueStore>(&mut self, store: &S, section: F::Section) -> Result<()> {
        let mut snapshot = read_snapshot(store, F::STORAGE_KEY)?;
        snapshot.insert(section.key().to_string(), self.form.section_value(section)?);
        store.set_json(F::STORAGE_KEY, &snapshot)?;
        self.saved.insert(section);
        Ok(())
    }

    pub fn reset_section<S: KeyValueStore>(&mut self, store: &S, section: F::Section) -> Result<()> {
        self.form.reset_section(section);
        self.saved.remove(&section);
        let mut snapshot = read_snapshot(store, F::STORAGE_KEY)?;
        if snapshot.remove(section.key()).is_some() {
            store.set_json(F::STORAGE_KEY, &snapshot)?;
        }
        Ok(())
    }

    pub fn reset_form<S: KeyValueStore>(&mut self, store: &S) -> Result<()> {
        self.form = F::default();
        self.saved.clear();
        store.remove(F::STORAGE_KEY)?;
        store.remove(F::GENERATED_FLAG)?;
        Ok(())
    }

    /// Replace the form wholesale (after an import) and mark the given
    /// sections saved.
    pub fn replace(&mut self, form: F, saved: impl IntoIterator<Item = F::Section>) {
        self.form = form;
        self.saved = saved.into_iter().collect();
    }

    pub fn mark_saved(&mut self, section: F::Section) {
        self.saved.insert(section);
    }
}

fn read_snapshot<S: KeyValueStore>(store: &S, key: &str) -> Result<Map<String, Value>> {
    match store.get_json::<Value>(key) {
        Ok(Some(Value::Object(map))) => Ok(map),
        Ok(_) => Ok(Map::new()),
        Err(PortalError::Serialization(e)) => {
            debug!("Ignoring unreadable snapshot {}: {}", key, e);
            Ok(Map::new())
        }
        Err(e) => Err(e),
    }
}

/// Clear saved data when the previous visit ended in a successful generation.
///
/// Returns true when a reset happened so the caller can show the
/// "form has been reset" notification.
pub fn consume_generated_flag<F: FormModel, S: KeyValueStore>(store: &S) -> Result<bool> {
    if store.get(F::GENERATED_FLAG)?.as_deref() == Some("true") {
        store.remove(F::GENERATED_FLAG)?;
        store.remove(F::STORAGE_KEY)?;
        return Ok(true);
    }
    Ok(false)
}

pub fn mark_generated<F: FormModel, S: KeyValueStore>(store: &S) -> Result<()> {
    store.set(F::GENERATED_FLAG, "true")
}
