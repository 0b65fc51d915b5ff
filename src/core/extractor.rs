//! Fingerprint extraction
//!
//! The extractor drives two collaborators across a document, one page at a
//! time and strictly in page order:
//!
//! - a [`PageSource`] yields each page's text and a rasterized image of it
//! - a [`BarcodeDetector`] finds barcodes in that image
//!
//! Any failure aborts the whole extraction; a partial fingerprint never
//! escapes.

use std::path::Path;
use tracing::{debug, info, instrument};

use crate::core::fingerprint::{Fingerprint, FingerprintBuilder, Position};
use crate::error::{BackendError, FingerprintError, Result};

/// 8-bit grayscale raster of a page, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl RasterImage {
    /// Wrap a grayscale buffer.
    ///
    /// # Returns
    /// `None` if `pixels` does not hold exactly `width * height` bytes
    pub fn from_gray(width: usize, height: usize, pixels: Vec<u8>) -> Option<Self> {
        if width.checked_mul(height)? != pixels.len() {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Luminance at `(x, y)`; out-of-bounds reads are white.
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        if x >= self.width || y >= self.height {
            return u8::MAX;
        }
        self.pixels[y * self.width + x]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }
}

/// Axis-aligned bounding rectangle of a detected barcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn top_left(&self) -> Position {
        Position(self.left, self.top)
    }
}

/// One barcode reported by a [`BarcodeDetector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub payload: String,
    pub bounding_box: BoundingBox,
}

/// An opened document: page count, per-page text and per-page raster.
pub trait PageSource {
    fn page_count(&self) -> usize;

    /// Full text content of the page at `index`.
    fn page_text(&mut self, index: usize) -> std::result::Result<String, BackendError>;

    /// Rasterize the page at `index` at the source's configured resolution.
    fn render_page(&mut self, index: usize) -> std::result::Result<RasterImage, BackendError>;
}

/// Opens documents from the filesystem as [`PageSource`]s.
///
/// The opened document may borrow from the loader (a library handle, for
/// example), hence the generic associated type.
pub trait DocumentLoader {
    type Document<'a>: PageSource
    where
        Self: 'a;

    fn open<'a>(&'a self, path: &Path) -> std::result::Result<Self::Document<'a>, BackendError>;
}

/// Finds barcodes in a page raster.
///
/// Detections must come back in a stable order for a given image; the order
/// is what pairs a reference barcode with a candidate barcode.
pub trait BarcodeDetector {
    fn detect(&mut self, image: &RasterImage) -> std::result::Result<Vec<Detection>, BackendError>;
}

/// Builds [`Fingerprint`]s from documents.
pub struct Extractor<D> {
    detector: D,
}

impl<D: BarcodeDetector> Extractor<D> {
    pub fn new(detector: D) -> Self {
        Self { detector }
    }

    pub fn into_detector(self) -> D {
        self.detector
    }

    /// Open `path` through `loader` and extract its fingerprint.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn extract_file<L: DocumentLoader>(&mut self, loader: &L, path: &Path) -> Result<Fingerprint> {
        let mut document = loader
            .open(path)
            .map_err(|reason| FingerprintError::DocumentUnreadable {
                path: path.to_path_buf(),
                reason,
            })?;

        self.extract(&mut document)
    }

    /// Extract the fingerprint of an opened document.
    ///
    /// A document with zero pages yields an empty fingerprint.
    #[instrument(skip_all, fields(pages = source.page_count()))]
    pub fn extract<S: PageSource + ?Sized>(&mut self, source: &mut S) -> Result<Fingerprint> {
        let mut builder = FingerprintBuilder::new();

        for page in 0..source.page_count() {
            self.extract_page(source, page, &mut builder)
                .map_err(|reason| FingerprintError::PageExtractionFailed { page, reason })?;
        }

        info!(
            lines = builder.line_count(),
            barcodes = builder.barcode_count(),
            "Fingerprint extracted"
        );
        Ok(builder.build())
    }

    fn extract_page<S: PageSource + ?Sized>(
        &mut self,
        source: &mut S,
        page: usize,
        builder: &mut FingerprintBuilder,
    ) -> std::result::Result<(), BackendError> {
        let text = source.page_text(page)?;
        let lines = split_page_lines(&text);
        let line_count = lines.len();
        builder.extend_lines(lines);

        let raster = source.render_page(page)?;
        let detections = self.detector.detect(&raster)?;
        // The raster must not outlive its page.
        drop(raster);

        let barcode_count = detections.len();
        for detection in detections {
            builder.push_barcode(detection.payload, detection.bounding_box.top_left());
        }

        debug!(page, lines = line_count, barcodes = barcode_count, "Page extracted");
        Ok(())
    }
}

/// Split a page's text into lines.
///
/// The page text is trimmed at its edges first, so leading and trailing blank
/// lines disappear along with the first line's indentation and the last
/// line's trailing spaces. Interior lines, blank or not, are kept verbatim.
/// Both `\n` and `\r\n` line endings are accepted.
pub fn split_page_lines(text: &str) -> Vec<&str> {
    text.trim().lines().collect()
}
