use crate::error::ExtractError;
use crate::models::{content_id, Document};
use lopdf::Document as PdfFile;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

pub trait PdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, ExtractError>;
}

#[derive(Default)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, ExtractError> {
        let document =
            PdfFile::load(path).map_err(|error| ExtractError::PdfParse(error.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| ExtractError::PdfParse(error.to_string()))?;

            pages.push(PageText {
                number: page_no,
                text,
            });
        }

        Ok(pages)
    }
}

/// Pages of a plain-text export, separated by form feeds.
pub fn split_pages(text: &str) -> Vec<PageText> {
    text.split('\u{000c}')
        .enumerate()
        .map(|(index, page)| PageText {
            number: (index + 1) as u32,
            text: page.to_string(),
        })
        .collect()
}

/// Loads a revision from disk: `.pdf` through lopdf, anything else as UTF-8 text.
/// The document id is the SHA-256 of the file bytes.
pub fn load_document(path: &Path) -> Result<Document, ExtractError> {
    load_document_with(&LopdfExtractor, path)
}

pub fn load_document_with<X: PdfExtractor>(
    extractor: &X,
    path: &Path,
) -> Result<Document, ExtractError> {
    if path.file_name().is_none() {
        return Err(ExtractError::MissingFileName(path.display().to_string()));
    }

    let bytes = fs::read(path)?;
    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    let pages = if is_pdf {
        extractor.extract_pages(path)?
    } else {
        split_pages(&String::from_utf8_lossy(&bytes))
    };

    Ok(Document {
        document_id: content_id(&bytes),
        source_path: Some(path.to_string_lossy().to_string()),
        pages: pages.into_iter().map(|page| page.text).collect(),
    })
}
