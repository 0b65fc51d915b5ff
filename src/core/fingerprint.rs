//! Canonical document fingerprint
//!
//! A [`Fingerprint`] is the structural snapshot of one document: its text
//! lines, plus every barcode payload together with where it was found.
//! Fingerprints are values. Build one with [`FingerprintBuilder`] and hand it
//! to the reference store or the validator; nothing mutates it afterwards.
//!
//! On disk a fingerprint is a JSON object with three keys, in this order:
//!
//! ```json
//! {
//!     "TEXT": ["INV-001", "Qty: 5"],
//!     "BARCODES": ["ABC123"],
//!     "BARCODE_POSITIONS": [[100, 200]]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;

use crate::error::{FingerprintError, Result};

/// Top-left corner of a barcode, in page pixels at the rasterization resolution.
///
/// Serialized as a two-element array `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position(pub i32, pub i32);

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self(x, y)
    }

    pub fn x(self) -> i32 {
        self.0
    }

    pub fn y(self) -> i32 {
        self.1
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Self(x, y)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.0, self.1)
    }
}

/// A decoded barcode payload and its position on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Barcode {
    pub payload: String,
    pub position: Position,
}

impl Barcode {
    pub fn new(payload: impl Into<String>, position: impl Into<Position>) -> Self {
        Self {
            payload: payload.into(),
            position: position.into(),
        }
    }
}

/// Structural fingerprint of one document.
///
/// Barcode payloads and positions are stored as pairs, so the two
/// sequences can never drift out of alignment. The parallel
/// `BARCODES` / `BARCODE_POSITIONS` form only exists in the serialized record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FingerprintRecord", into = "FingerprintRecord")]
pub struct Fingerprint {
    text: Vec<String>,
    barcodes: Vec<Barcode>,
}

impl Fingerprint {
    pub fn new(text: Vec<String>, barcodes: Vec<Barcode>) -> Self {
        Self { text, barcodes }
    }

    /// Build a fingerprint from the parallel payload/position sequences of a
    /// reference record.
    ///
    /// # Returns
    /// An error if the two sequences differ in length
    pub fn from_parallel(
        text: Vec<String>,
        payloads: Vec<String>,
        positions: Vec<Position>,
    ) -> std::result::Result<Self, MisalignedBarcodes> {
        if payloads.len() != positions.len() {
            return Err(MisalignedBarcodes {
                payloads: payloads.len(),
                positions: positions.len(),
            });
        }

        let barcodes = payloads
            .into_iter()
            .zip(positions)
            .map(|(payload, position)| Barcode { payload, position })
            .collect();

        Ok(Self { text, barcodes })
    }

    pub fn text(&self) -> &[String] {
        &self.text
    }

    pub fn barcodes(&self) -> &[Barcode] {
        &self.barcodes
    }

    /// Barcode payloads in extraction order.
    pub fn payloads(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.barcodes.iter().map(|barcode| barcode.payload.as_str())
    }

    /// Barcode positions in extraction order, index-aligned with [`Self::payloads`].
    pub fn positions(&self) -> impl ExactSizeIterator<Item = Position> + '_ {
        self.barcodes.iter().map(|barcode| barcode.position)
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.barcodes.is_empty()
    }

    /// Exact, order-sensitive comparison of the text lines.
    pub fn equals_text(&self, other: &Fingerprint) -> bool {
        self.text == other.text
    }

    /// Exact, order-sensitive comparison of the barcode payloads.
    pub fn equals_barcodes(&self, other: &Fingerprint) -> bool {
        self.payloads().eq(other.payloads())
    }

    /// Serialize as a pretty-printed reference record.
    pub fn to_json(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_json(&mut buffer)?;
        // serde_json only ever emits valid UTF-8
        String::from_utf8(buffer).map_err(|err| {
            FingerprintError::SerializationFailed(serde::ser::Error::custom(err))
        })
    }

    /// Write the reference record to `writer`, four-space indented with
    /// non-ASCII text left unescaped.
    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(writer, formatter);
        self.serialize(&mut serializer)
            .map_err(FingerprintError::SerializationFailed)
    }

    /// Decode a reference record.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// The payload and position sequences of a record have different lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MisalignedBarcodes {
    pub payloads: usize,
    pub positions: usize,
}

impl fmt::Display for MisalignedBarcodes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} barcode payloads but {} barcode positions",
            self.payloads, self.positions
        )
    }
}

impl std::error::Error for MisalignedBarcodes {}

/// Wire form of a fingerprint. Field order is the record's key order.
#[derive(Serialize, Deserialize)]
struct FingerprintRecord {
    #[serde(rename = "TEXT", default)]
    text: Vec<String>,
    #[serde(rename = "BARCODES", default)]
    barcodes: Vec<String>,
    #[serde(rename = "BARCODE_POSITIONS", default)]
    barcode_positions: Vec<Position>,
}

impl TryFrom<FingerprintRecord> for Fingerprint {
    type Error = MisalignedBarcodes;

    fn try_from(record: FingerprintRecord) -> std::result::Result<Self, Self::Error> {
        Fingerprint::from_parallel(record.text, record.barcodes, record.barcode_positions)
    }
}

impl From<Fingerprint> for FingerprintRecord {
    fn from(fingerprint: Fingerprint) -> Self {
        let (barcodes, barcode_positions) = fingerprint
            .barcodes
            .into_iter()
            .map(|barcode| (barcode.payload, barcode.position))
            .unzip();

        Self {
            text: fingerprint.text,
            barcodes,
            barcode_positions,
        }
    }
}

/// Accumulates the pieces of a fingerprint during extraction.
///
/// The builder is consumed by [`FingerprintBuilder::build`], so a finished
/// fingerprint is never observable half-built.
#[derive(Debug, Default)]
pub struct FingerprintBuilder {
    text: Vec<String>,
    barcodes: Vec<Barcode>,
}

impl FingerprintBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_line(&mut self, line: impl Into<String>) -> &mut Self {
        self.text.push(line.into());
        self
    }

    pub fn extend_lines<I, S>(&mut self, lines: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.text.extend(lines.into_iter().map(Into::into));
        self
    }

    pub fn push_barcode(
        &mut self,
        payload: impl Into<String>,
        position: impl Into<Position>,
    ) -> &mut Self {
        self.barcodes.push(Barcode::new(payload, position));
        self
    }

    pub fn line_count(&self) -> usize {
        self.text.len()
    }

    pub fn barcode_count(&self) -> usize {
        self.barcodes.len()
    }

    pub fn build(self) -> Fingerprint {
        Fingerprint {
            text: self.text,
            barcodes: self.barcodes,
        }
    }
}
