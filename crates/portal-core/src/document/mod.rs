//! Generated document viewing, editing, commenting and versioning

pub mod cleanup;
pub mod comment;
mod editor;
pub mod headers;
pub mod versions;

pub use cleanup::{clean_generated, format_content_for_display, strip_code_fences};
pub use editor::{DocumentEditor, EditorMode, PendingComment, PendingRegeneration, ReplyOutcome};
pub use headers::{HeaderCommentMap, HeaderEntry};
pub use versions::{VersionAction, VersionHistory, VersionNumber, VersionRecord};
