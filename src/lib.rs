//! PDF Fingerprint Library
//!
//! Reduces a PDF to a fingerprint (text lines, barcode payloads, barcode
//! positions), stores golden references, and validates candidates against
//! the active reference with exact text/barcode matching and per-axis
//! positional tolerance.

pub mod backend;
pub mod config;
pub mod core;
pub mod error;
pub mod reporting;
pub mod scanner;

pub use crate::core::{extractor, fingerprint, reference_store, session, validator};
pub use error::{BackendError, FingerprintError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::core::extractor::{
        split_page_lines, BarcodeDetector, BoundingBox, Detection, DocumentLoader, Extractor,
        PageSource, RasterImage,
    };
    pub use crate::core::fingerprint::{Barcode, Fingerprint, FingerprintBuilder, Position};
    pub use crate::core::reference_store::{ReferenceStore, SelectionRule};
    pub use crate::core::session::{
        decide, OperatorChoice, Session, SessionAction, SessionOutcome, SessionState,
    };
    pub use crate::core::validator::{compare, validate, ValidationResult, DEFAULT_TOLERANCE};
    pub use crate::error::{BackendError, FingerprintError};
    pub use crate::reporting::report_writer::{format_entry, write_report, BatchEntry, ReportHeader};
    pub use crate::scanner::file_scanner::collect_pdf_files;
}
