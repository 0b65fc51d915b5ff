//! Session control
//!
//! A run either creates the reference (none exists yet), deletes the
//! existing references, or validates a candidate against the active one.
//! [`decide`] picks the action from the session state and the operator's
//! answer; [`Session::execute`] carries it out. Neither contains extraction or
//! comparison logic.

use std::path::{Path, PathBuf};
use tracing::info;

use crate::core::extractor::{BarcodeDetector, DocumentLoader, Extractor};
use crate::core::fingerprint::Fingerprint;
use crate::core::reference_store::ReferenceStore;
use crate::core::validator::{validate, ValidationResult, DEFAULT_TOLERANCE};
use crate::error::{FingerprintError, Result};

/// Record name used when none is configured.
pub const DEFAULT_REFERENCE_NAME: &str = "reference.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoReference,
    ReferenceExists,
}

impl SessionState {
    pub fn from_reference(reference: Option<&Fingerprint>) -> Self {
        match reference {
            Some(_) => Self::ReferenceExists,
            None => Self::NoReference,
        }
    }
}

/// Operator's answer to "delete or keep the existing reference?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorChoice {
    DeleteReferences,
    KeepReference,
}

impl OperatorChoice {
    /// Parse the interactive prompt answer: `1` deletes, `2` keeps.
    pub fn from_answer(answer: &str) -> Option<Self> {
        match answer.trim() {
            "1" => Some(Self::DeleteReferences),
            "2" => Some(Self::KeepReference),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    CreateReference,
    DeleteReferences,
    ValidateCandidate,
}

impl SessionAction {
    /// Whether the action needs a document from the operator.
    pub fn needs_document(self) -> bool {
        !matches!(self, Self::DeleteReferences)
    }
}

/// Pick the session action.
///
/// Without a reference the only possible action is creating one, whatever
/// the operator answered. With a reference, a missing answer keeps it.
pub fn decide(state: SessionState, choice: Option<OperatorChoice>) -> SessionAction {
    match (state, choice) {
        (SessionState::NoReference, _) => SessionAction::CreateReference,
        (SessionState::ReferenceExists, Some(OperatorChoice::DeleteReferences)) => {
            SessionAction::DeleteReferences
        }
        (SessionState::ReferenceExists, Some(OperatorChoice::KeepReference) | None) => {
            SessionAction::ValidateCandidate
        }
    }
}

/// Result of one executed action.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    ReferenceCreated { path: PathBuf, fingerprint: Fingerprint },
    ReferencesDeleted(usize),
    Validated(ValidationResult),
}

/// Sequences extraction, reference storage and validation for one run.
pub struct Session<'a, L, D> {
    store: &'a ReferenceStore,
    loader: &'a L,
    extractor: Extractor<D>,
    reference: Option<Fingerprint>,
    reference_name: String,
    tolerance: u32,
}

impl<'a, L: DocumentLoader, D: BarcodeDetector> Session<'a, L, D> {
    /// Start a session, loading the active reference from `store`.
    pub fn open(store: &'a ReferenceStore, loader: &'a L, extractor: Extractor<D>) -> Result<Self> {
        let reference = store.load_latest()?;

        Ok(Self {
            store,
            loader,
            extractor,
            reference,
            reference_name: DEFAULT_REFERENCE_NAME.to_string(),
            tolerance: DEFAULT_TOLERANCE,
        })
    }

    pub fn with_reference_name(mut self, name: impl Into<String>) -> Self {
        self.reference_name = name.into();
        self
    }

    pub fn with_tolerance(mut self, tolerance: u32) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_reference(self.reference.as_ref())
    }

    pub fn reference(&self) -> Option<&Fingerprint> {
        self.reference.as_ref()
    }

    pub fn tolerance(&self) -> u32 {
        self.tolerance
    }

    /// Carry out `action`.
    ///
    /// # Arguments
    /// * `action` - Action chosen by [`decide`]
    /// * `document` - Document to extract; required unless deleting
    pub fn execute(&mut self, action: SessionAction, document: Option<&Path>) -> Result<SessionOutcome> {
        match action {
            SessionAction::DeleteReferences => {
                self.delete_references().map(SessionOutcome::ReferencesDeleted)
            }
            SessionAction::CreateReference => {
                let document = document.ok_or(FingerprintError::NoDocumentSelected)?;
                self.create_reference(document)
            }
            SessionAction::ValidateCandidate => {
                let document = document.ok_or(FingerprintError::NoDocumentSelected)?;
                self.validate_candidate(document).map(SessionOutcome::Validated)
            }
        }
    }

    /// Extract `document` and save it as the reference.
    pub fn create_reference(&mut self, document: &Path) -> Result<SessionOutcome> {
        let fingerprint = self.extractor.extract_file(self.loader, document)?;
        let path = self.store.save(&fingerprint, &self.reference_name)?;

        info!(document = %document.display(), record = %path.display(), "Reference created");
        self.reference = Some(fingerprint.clone());
        Ok(SessionOutcome::ReferenceCreated { path, fingerprint })
    }

    /// Remove every stored reference.
    pub fn delete_references(&mut self) -> Result<usize> {
        let removed = self.store.delete_all()?;
        self.reference = None;
        Ok(removed)
    }

    /// Extract `document` and compare it with the active reference.
    ///
    /// Fails with `NoReferenceAvailable` before touching the document when
    /// there is no reference.
    pub fn validate_candidate(&mut self, document: &Path) -> Result<ValidationResult> {
        if self.reference.is_none() {
            return Err(FingerprintError::NoReferenceAvailable);
        }

        let candidate = self.extractor.extract_file(self.loader, document)?;
        validate(self.reference.as_ref(), &candidate, self.tolerance)
    }
}
