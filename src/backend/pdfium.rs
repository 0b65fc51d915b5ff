//! PDFium page source
//!
//! Text comes from PDFium's text layer; rasters are rendered in 8-bit
//! grayscale at the configured scale, so barcode positions are in pixels at
//! that resolution.

use pdfium_render::prelude::*;
use std::cell::OnceCell;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::core::extractor::{DocumentLoader, PageSource, RasterImage};
use crate::error::BackendError;

/// Opens PDFs through a bound PDFium library.
pub struct PdfiumLoader {
    pdfium: Pdfium,
    render_scale: f32,
}

impl PdfiumLoader {
    /// Bind to PDFium, looking first in `library_dir` (or the working
    /// directory) and then in the system library path.
    ///
    /// # Arguments
    /// * `library_dir` - Directory containing the PDFium shared library
    /// * `render_scale` - Pixels per PDF point used when rasterizing
    pub fn bind(library_dir: Option<&Path>, render_scale: f32) -> Result<Self, BackendError> {
        let dir = library_dir.unwrap_or_else(|| Path::new("./"));
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|err| format!("failed to bind the PDFium library: {err}"))?;

        info!(render_scale, "PDFium bound");
        Ok(Self {
            pdfium: Pdfium::new(bindings),
            render_scale,
        })
    }
}

impl DocumentLoader for PdfiumLoader {
    type Document<'a> = PdfiumDocument<'a>
    where
        Self: 'a;

    fn open<'a>(&'a self, path: &Path) -> Result<PdfiumDocument<'a>, BackendError> {
        let document = self
            .pdfium
            .load_pdf_from_file(path, None)
            .map_err(|err| err.to_string())?;

        debug!(pages = document.pages().len(), "PDF loaded");

        Ok(PdfiumDocument {
            document,
            render_config: PdfRenderConfig::new()
                .scale_page_by_factor(self.render_scale)
                .set_format(PdfBitmapFormat::Gray),
        })
    }
}

/// Binds PDFium the first time it is needed.
///
/// Runs that never open a document, such as deleting references, work
/// without a PDFium library on the machine.
pub struct LazyPdfiumLoader {
    library_dir: Option<PathBuf>,
    render_scale: f32,
    bound: OnceCell<PdfiumLoader>,
}

impl LazyPdfiumLoader {
    pub fn new(library_dir: Option<PathBuf>, render_scale: f32) -> Self {
        Self {
            library_dir,
            render_scale,
            bound: OnceCell::new(),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.bound.get().is_some()
    }

    /// The bound loader, binding PDFium on first use.
    pub fn loader(&self) -> Result<&PdfiumLoader, BackendError> {
        if let Some(loader) = self.bound.get() {
            return Ok(loader);
        }
        let loader = PdfiumLoader::bind(self.library_dir.as_deref(), self.render_scale)?;
        Ok(self.bound.get_or_init(|| loader))
    }
}

impl DocumentLoader for LazyPdfiumLoader {
    type Document<'a> = PdfiumDocument<'a>
    where
        Self: 'a;

    fn open<'a>(&'a self, path: &Path) -> Result<PdfiumDocument<'a>, BackendError> {
        self.loader()?.open(path)
    }
}

/// An open PDFium document.
pub struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
    render_config: PdfRenderConfig,
}

impl<'a> PdfiumDocument<'a> {
    fn page(&self, index: usize) -> Result<PdfPage<'a>, BackendError> {
        let index = PdfPageIndex::try_from(index)
            .map_err(|_| format!("page index {index} exceeds the PDFium page limit"))?;
        Ok(self.document.pages().get(index).map_err(|err| err.to_string())?)
    }
}

impl PageSource for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page_text(&mut self, index: usize) -> Result<String, BackendError> {
        let page = self.page(index)?;
        let text = page.text().map_err(|err| err.to_string())?.all();
        Ok(text)
    }

    fn render_page(&mut self, index: usize) -> Result<RasterImage, BackendError> {
        let page = self.page(index)?;
        let bitmap = page
            .render_with_config(&self.render_config)
            .map_err(|err| err.to_string())?;

        let width = usize::try_from(bitmap.width()).map_err(|_| "negative bitmap width")?;
        let height = usize::try_from(bitmap.height()).map_err(|_| "negative bitmap height")?;
        gray_from_strided(width, height, &bitmap.as_raw_bytes())
    }
}

/// Copy a grayscale buffer whose rows may be padded out to a wider stride.
fn gray_from_strided(width: usize, height: usize, bytes: &[u8]) -> Result<RasterImage, BackendError> {
    if width == 0 || height == 0 {
        return RasterImage::from_gray(width, height, Vec::new())
            .ok_or_else(|| "empty bitmap".into());
    }

    let stride = bytes.len() / height;
    if stride < width {
        return Err(format!("bitmap stride {stride} is narrower than width {width}").into());
    }

    let mut pixels = Vec::with_capacity(width * height);
    for row in bytes.chunks_exact(stride).take(height) {
        pixels.extend_from_slice(&row[..width]);
    }

    RasterImage::from_gray(width, height, pixels).ok_or_else(|| "truncated bitmap buffer".into())
}
