//! Fingerprint comparison
//!
//! Text and barcode payloads must match exactly. Barcode positions are paired
//! by index and may drift by up to `tolerance` pixels on each axis.

use serde::Serialize;
use std::fmt;
use tracing::{info, instrument};

use crate::core::fingerprint::{Fingerprint, Position};
use crate::error::{FingerprintError, Result};

/// Per-axis pixel deviation accepted when no tolerance is configured.
pub const DEFAULT_TOLERANCE: u32 = 5;

/// Outcome of comparing a candidate against the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub text_match: bool,
    pub barcode_match: bool,
    pub position_match: bool,
}

impl ValidationResult {
    /// `true` when all three dimensions match.
    pub fn is_match(&self) -> bool {
        self.text_match && self.barcode_match && self.position_match
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Text: {}, Barcodes: {}, Positions: {}",
            self.text_match, self.barcode_match, self.position_match
        )
    }
}

/// Validate `candidate` against the active reference.
///
/// # Arguments
/// * `reference` - The active reference, if one exists
/// * `candidate` - Freshly extracted fingerprint
/// * `tolerance` - Maximum per-axis position deviation, inclusive
///
/// # Returns
/// The per-dimension result, or `NoReferenceAvailable` when `reference` is `None`.
/// Mismatches are never errors.
#[instrument(skip(reference, candidate))]
pub fn validate(
    reference: Option<&Fingerprint>,
    candidate: &Fingerprint,
    tolerance: u32,
) -> Result<ValidationResult> {
    let reference = reference.ok_or(FingerprintError::NoReferenceAvailable)?;
    let result = compare(reference, candidate, tolerance);

    info!(
        text_match = result.text_match,
        barcode_match = result.barcode_match,
        position_match = result.position_match,
        "Validation complete"
    );
    Ok(result)
}

/// Compare two fingerprints.
pub fn compare(reference: &Fingerprint, candidate: &Fingerprint, tolerance: u32) -> ValidationResult {
    ValidationResult {
        text_match: reference.equals_text(candidate),
        barcode_match: reference.equals_barcodes(candidate),
        position_match: compare_positions(reference.positions(), candidate.positions(), tolerance),
    }
}

/// Index-paired position comparison.
///
/// A length mismatch fails outright. Otherwise every pair must be within
/// `tolerance` on both axes.
pub fn compare_positions<E, A>(expected: E, actual: A, tolerance: u32) -> bool
where
    E: IntoIterator<Item = Position>,
    E::IntoIter: ExactSizeIterator,
    A: IntoIterator<Item = Position>,
    A::IntoIter: ExactSizeIterator,
{
    let expected = expected.into_iter();
    let actual = actual.into_iter();

    if expected.len() != actual.len() {
        return false;
    }

    expected
        .zip(actual)
        .all(|(e, a)| within_tolerance(e, a, tolerance))
}

/// Chebyshev check: `|dx| <= tolerance && |dy| <= tolerance`.
pub fn within_tolerance(expected: Position, actual: Position, tolerance: u32) -> bool {
    let tolerance = u64::from(tolerance);
    let dx = (i64::from(expected.x()) - i64::from(actual.x())).unsigned_abs();
    let dy = (i64::from(expected.y()) - i64::from(actual.y())).unsigned_abs();
    dx <= tolerance && dy <= tolerance
}
