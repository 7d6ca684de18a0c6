use crate::template::TemplateVariant;
use std::path::PathBuf;

/// Every failure the ingestion pipeline distinguishes.
///
/// Only `DatabaseConnectionFailed`, `FolderNotFound` and failures while
/// resolving the resume point end a batch run; everything raised while a
/// single document is being processed is logged and turned into a skip.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("database connection failed: {0}")]
    DatabaseConnectionFailed(String),

    #[error("folder not found: {}", .0.display())]
    FolderNotFound(PathBuf),

    #[error("no regions registered for template {0}")]
    UnknownVariant(TemplateVariant),

    #[error("classification failed for {}: {reason}", .path.display())]
    ClassificationFailed { path: PathBuf, reason: String },

    #[error("extraction failed for {}: {reason}", .path.display())]
    ExtractionFailed { path: PathBuf, reason: String },

    #[error("persistence write failed: {0}")]
    PersistenceWriteFailed(String),

    #[error("persistence read failed: {0}")]
    PersistenceReadFailed(String),

    #[error("checkpoint store failed: {0}")]
    CheckpointFailed(String),

    #[error("page render failed: {0}")]
    Render(String),

    #[error("text recognition failed: {0}")]
    Recognition(String),

    #[error("invalid region registry: {0}")]
    InvalidRegistry(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
