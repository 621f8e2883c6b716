use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PortalError {
    #[error("Please complete all sections before generating: {}", .missing.join(", "))]
    IncompleteForm { missing: Vec<String> },

    #[error("Network error: {0}")]
    Network(String),

    #[error("{0}")]
    Backend(String),

    #[error("Cannot delete the last risk. You need at least one risk.")]
    CannotRemoveLastRecord,

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Request already in progress: {0}")]
    Busy(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for PortalError {
    fn from(err: serde_json::Error) -> Self {
        PortalError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PortalError>;
