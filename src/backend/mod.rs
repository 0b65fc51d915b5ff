//! Concrete page source and barcode detector implementations
//!
//! Each backend sits behind a cargo feature: `rendering` for PDFium,
//! `barcode` for multi-format barcode decoding.

#[cfg(feature = "barcode")]
pub mod barcode;
#[cfg(feature = "rendering")]
pub mod pdfium;

#[cfg(feature = "barcode")]
pub use barcode::MultiFormatDetector;
#[cfg(feature = "rendering")]
pub use pdfium::{LazyPdfiumLoader, PdfiumDocument, PdfiumLoader};
