//! Error types for fingerprint extraction, reference storage and validation

use std::path::PathBuf;
use thiserror::Error;

/// Error reported by an external collaborator (page source, barcode detector).
pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced by the fingerprint engine.
///
/// Content mismatches are never errors; they are reported through
/// [`ValidationResult`](crate::core::validator::ValidationResult).
#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("document {} could not be opened: {reason}", .path.display())]
    DocumentUnreadable { path: PathBuf, reason: BackendError },

    /// `page` is the zero-based page index.
    #[error("extraction failed on page {}: {reason}", .page + 1)]
    PageExtractionFailed { page: usize, reason: BackendError },

    #[error("reference record {} is corrupt", .path.display())]
    ReferenceCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no reference is available; create one first")]
    NoReferenceAvailable,

    #[error("failed to serialize fingerprint")]
    SerializationFailed(#[source] serde_json::Error),

    #[error("invalid reference name {0:?}: expected a plain `.json` file name")]
    InvalidReferenceName(String),

    #[error("no document was selected")]
    NoDocumentSelected,

    #[error("I/O error on {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration file {}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl FingerprintError {
    /// Name of the processing stage that failed, for operator-facing messages.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::DocumentUnreadable { .. }
            | Self::PageExtractionFailed { .. }
            | Self::NoDocumentSelected => "Extraction",
            Self::ReferenceCorrupt { .. }
            | Self::SerializationFailed(_)
            | Self::InvalidReferenceName(_)
            | Self::Io { .. } => "Reference store",
            Self::NoReferenceAvailable => "Validation",
            Self::Config { .. } => "Configuration",
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, FingerprintError>;
