//! Sprint and risk planning portal core
//!
//! Everything the portal does that is not tied to the browser: form
//! models and imports, the generation workflow, the document editor with
//! its version history, export and share request builders, and the list
//! view. The browser app supplies a [`transport::PortalTransport`] and a
//! [`storage::KeyValueStore`]; tests use in-memory versions of both.

pub mod artifact;
pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod feedback;
pub mod forms;
pub mod generation;
pub mod import;
pub mod listing;
pub mod session;
pub mod share;
pub mod sow;
pub mod storage;
pub mod transport;
pub mod workspace;

pub use artifact::{ArtifactKind, GeneratedArtifact, SowReference};
pub use config::PortalConfig;
pub use document::{DocumentEditor, EditorMode, VersionAction, VersionHistory};
pub use error::{PortalError, Result};
pub use forms::{FormDocument, FormModel, RiskAssessmentForm, SprintPlanForm};
pub use generation::{GenerationWorkflow, PayloadContext, ProgressTracker};
pub use listing::{ArtifactList, ArtifactSummary, ListFilter, Pagination};
pub use session::{AuthorizationPolicy, SessionStore, User};
pub use storage::{KeyValueStore, MemoryStore};
pub use transport::{ApiRequest, Method, PortalTransport};
