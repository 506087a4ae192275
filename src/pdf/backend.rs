//! Ranked PDF extraction backends behind a common trait.
//!
//! `pdfium` gives the best text quality but needs a system library, so it
//! is probed at construction and the pure-Rust backends stand in when the
//! probe fails. All backends are synchronous; callers run them on a
//! blocking thread.

use std::path::Path;

use pdfium_render::prelude::Pdfium;

use super::PdfError;

/// One way of turning a PDF file into per-page text.
///
/// `extract_pages` returns one entry per page in document order; a page
/// that yields no text produces an empty string so numbering stays
/// aligned with the document.
pub trait PdfBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this backend can run in the current environment.
    fn is_available(&self) -> bool;

    fn page_count(&self, path: &Path) -> Result<usize, PdfError>;

    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, PdfError>;
}

/// Pick the first available backend, best first.
pub fn select_backend() -> Result<Box<dyn PdfBackend>, PdfError> {
    let candidates: [Box<dyn PdfBackend>; 3] = [
        Box::new(PdfiumBackend),
        Box::new(LopdfBackend),
        Box::new(PdfExtractBackend),
    ];

    for candidate in candidates {
        if candidate.is_available() {
            tracing::info!("Using PDF extraction backend: {}", candidate.name());
            return Ok(candidate);
        }
    }
    Err(PdfError::NoBackend)
}

/// System pdfium via dynamic library. `Pdfium` instances are not `Send`,
/// so one is bound per call instead of being held in the struct.
pub struct PdfiumBackend;

impl PdfiumBackend {
    fn bind() -> Result<Pdfium, PdfError> {
        Pdfium::bind_to_system_library()
            .map(Pdfium::new)
            .map_err(|e| PdfError::Render(e.to_string()))
    }
}

impl PdfBackend for PdfiumBackend {
    fn name(&self) -> &'static str {
        "pdfium"
    }

    fn is_available(&self) -> bool {
        Pdfium::bind_to_system_library().is_ok()
    }

    fn page_count(&self, path: &Path) -> Result<usize, PdfError> {
        let pdfium = Self::bind()?;
        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| PdfError::Render(e.to_string()))?;
        Ok(document.pages().len() as usize)
    }

    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, PdfError> {
        let pdfium = Self::bind()?;
        let document = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| PdfError::Render(e.to_string()))?;

        let mut pages = Vec::new();
        for page in document.pages().iter() {
            match page.text() {
                Ok(text) => pages.push(text.all()),
                Err(e) => {
                    tracing::debug!("Skipping unreadable page: {e}");
                    pages.push(String::new());
                }
            }
        }
        Ok(pages)
    }
}

/// Pure-Rust parser. Always available; weaker on complex encodings.
pub struct LopdfBackend;

impl PdfBackend for LopdfBackend {
    fn name(&self) -> &'static str {
        "lopdf"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn page_count(&self, path: &Path) -> Result<usize, PdfError> {
        let document = lopdf::Document::load(path)?;
        Ok(document.get_pages().len())
    }

    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, PdfError> {
        let document = lopdf::Document::load(path)?;
        let mut pages = Vec::new();
        for (&number, _) in &document.get_pages() {
            match document.extract_text(&[number]) {
                Ok(text) => pages.push(text),
                Err(e) => {
                    tracing::debug!("Skipping unreadable page {number}: {e}");
                    pages.push(String::new());
                }
            }
        }
        Ok(pages)
    }
}

/// Whole-document extractor; pages are recovered from form feeds and the
/// page count is probed with lopdf since the crate has no paged API.
pub struct PdfExtractBackend;

impl PdfBackend for PdfExtractBackend {
    fn name(&self) -> &'static str {
        "pdf-extract"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn page_count(&self, path: &Path) -> Result<usize, PdfError> {
        let document = lopdf::Document::load(path)?;
        Ok(document.get_pages().len())
    }

    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, PdfError> {
        let text =
            pdf_extract::extract_text(path).map_err(|e| PdfError::Extraction(e.to_string()))?;
        Ok(text.split('\u{c}').map(str::to_string).collect())
    }
}
