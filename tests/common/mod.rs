//! In-memory document backend shared by the integration tests.
//!
//! A fake page's raster carries its barcodes as text (`PAYLOAD@x,y;...`),
//! which [`ScriptDetector`] reads back, so each test document fully describes
//! what the extractor should find.

#![allow(dead_code)]

use pdf_fingerprint_rs::prelude::*;
use std::cell::Cell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct FakePage {
    pub text: String,
    pub barcodes: Vec<(String, (i32, i32))>,
}

pub fn page(text: &str, barcodes: &[(&str, (i32, i32))]) -> FakePage {
    FakePage {
        text: text.to_string(),
        barcodes: barcodes
            .iter()
            .map(|(payload, pos)| (payload.to_string(), *pos))
            .collect(),
    }
}

pub struct FakeDocument {
    pages: Vec<FakePage>,
}

impl FakeDocument {
    pub fn new(pages: Vec<FakePage>) -> Self {
        Self { pages }
    }
}

impl PageSource for FakeDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&mut self, index: usize) -> Result<String, BackendError> {
        Ok(self.pages[index].text.clone())
    }

    fn render_page(&mut self, index: usize) -> Result<RasterImage, BackendError> {
        let script: String = self.pages[index]
            .barcodes
            .iter()
            .map(|(payload, (x, y))| format!("{payload}@{x},{y};"))
            .collect();
        let bytes = script.into_bytes();
        RasterImage::from_gray(bytes.len(), 1, bytes).ok_or_else(|| "bad raster".into())
    }
}

#[derive(Default)]
pub struct FakeLoader {
    documents: HashMap<PathBuf, Vec<FakePage>>,
    opened: Cell<usize>,
}

impl FakeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &str, pages: Vec<FakePage>) -> Self {
        self.documents.insert(PathBuf::from(path), pages);
        self
    }

    /// Number of `open` calls so far, successful or not
    pub fn open_count(&self) -> usize {
        self.opened.get()
    }
}

impl DocumentLoader for FakeLoader {
    type Document<'a> = FakeDocument
    where
        Self: 'a;

    fn open<'a>(&'a self, path: &Path) -> Result<FakeDocument, BackendError> {
        self.opened.set(self.opened.get() + 1);
        self.documents
            .get(path)
            .cloned()
            .map(FakeDocument::new)
            .ok_or_else(|| format!("{} is not a PDF", path.display()).into())
    }
}

/// Reads the barcode script written by [`FakeDocument::render_page`].
#[derive(Default)]
pub struct ScriptDetector {
    pub calls: usize,
}

impl BarcodeDetector for ScriptDetector {
    fn detect(&mut self, image: &RasterImage) -> Result<Vec<Detection>, BackendError> {
        self.calls += 1;
        let script = std::str::from_utf8(image.as_bytes())?;
        let mut detections = Vec::new();
        for entry in script.split(';').filter(|e| !e.is_empty()) {
            let (payload, coords) = entry.split_once('@').ok_or("malformed barcode script")?;
            let (x, y) = coords.split_once(',').ok_or("malformed barcode script")?;
            detections.push(Detection {
                payload: payload.to_string(),
                bounding_box: BoundingBox {
                    left: x.parse()?,
                    top: y.parse()?,
                    width: 40,
                    height: 40,
                },
            });
        }
        Ok(detections)
    }
}

/// Invoice scenario documents: A (golden), B (slightly shifted), C (shifted too far).
pub fn invoice_loader() -> FakeLoader {
    FakeLoader::new()
        .with("a.pdf", vec![page("INV-001\nQty: 5\n", &[("ABC123", (100, 200))])])
        .with("b.pdf", vec![page("INV-001\nQty: 5\n", &[("ABC123", (102, 203))])])
        .with("c.pdf", vec![page("INV-001\nQty: 5\n", &[("ABC123", (110, 203))])])
}
