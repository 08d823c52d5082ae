use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the translation core.
#[derive(Error, Debug)]
pub enum TranslationError {
    /// A language or translation lookup had no matching record
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The (language, group, key) triple already exists
    #[error("Translation already exists: {language}/{group}/{key}")]
    DuplicateKey {
        language: String,
        group: String,
        key: String,
    },

    /// A workflow or registry rule forbids the operation
    #[error("Policy violation on {subject}: {reason}")]
    PolicyViolation { subject: String, reason: String },

    /// Malformed import payload or unsupported export format
    #[error("Format error: {0}")]
    Format(String),

    /// A scanned path was missing or unreadable; the scan continues without it
    #[error("Skipped {}: {reason}", path.display())]
    ExtractionWarning { path: PathBuf, reason: String },

    /// A configured extraction pattern failed to compile
    #[error("Invalid pattern '{name}' for kind '{kind}': {reason}")]
    InvalidPattern {
        kind: String,
        name: String,
        reason: String,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TranslationError>;

impl TranslationError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn policy(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PolicyViolation {
            subject: subject.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors that a scan logs and skips instead of aborting on
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::ExtractionWarning { .. })
    }
}
