//! Format dispatch and plain-text extraction.
//!
//! Supported formats are a closed enum: adding a format means adding a
//! variant here, not scattering extension checks through the pipeline.
//! PDF goes through `pdf-extract`; DOCX is unzipped and the text runs of
//! `word/document.xml` are collected with `quick-xml`.

use std::io::{Cursor, Read};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::{debug, info};

use crate::errors::IngestError;

/// Supported upload formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Resolves the format from a file extension (case-insensitive).
    ///
    /// # Errors
    /// Returns [`IngestError::UnsupportedFormat`] for anything that is not
    /// `.pdf` or `.docx`, including files without an extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, IngestError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            _ => Err(IngestError::UnsupportedFormat(
                path.display().to_string(),
            )),
        }
    }
}

/// Reads a file from disk and extracts its plain text.
///
/// # Errors
/// - [`IngestError::UnsupportedFormat`] before any bytes are read.
/// - [`IngestError::Io`] if the file cannot be read.
/// - Extraction errors per format; [`IngestError::EmptyDocument`] if the
///   file parsed but yielded no text.
pub fn load_document(path: impl AsRef<Path>) -> Result<String, IngestError> {
    let path = path.as_ref();
    let format = DocumentFormat::from_path(path)?;
    info!("loading document {:?} as {:?}", path, format);

    let bytes = std::fs::read(path)?;
    extract_text(&bytes, format)
}

/// Extracts plain text from in-memory document bytes.
///
/// # Errors
/// - [`IngestError::Pdf`] / [`IngestError::Docx`] on parse failures.
/// - [`IngestError::EmptyDocument`] when extraction succeeds but the text
///   is empty after trimming.
pub fn extract_text(bytes: &[u8], format: DocumentFormat) -> Result<String, IngestError> {
    let text = match format {
        DocumentFormat::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| IngestError::Pdf(e.to_string()))?,
        DocumentFormat::Docx => extract_docx_text(bytes)?,
    };

    if text.trim().is_empty() {
        return Err(IngestError::EmptyDocument);
    }

    debug!("extracted {} chars ({:?})", text.chars().count(), format);
    Ok(text)
}

/// Collects the text runs of `word/document.xml` inside a DOCX archive.
///
/// Text inside `<w:t>` elements is concatenated; paragraph ends become
/// newlines and tabs become a literal tab so that downstream chunking sees
/// roughly the original reading order.
fn extract_docx_text(bytes: &[u8]) -> Result<String, IngestError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| IngestError::Docx(format!("not a docx archive: {e}")))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| IngestError::Docx(format!("missing word/document.xml: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| IngestError::Docx(format!("document.xml is not utf-8: {e}")))?;

    let mut reader = Reader::from_str(&xml);
    let mut out = String::new();
    let mut in_text_run = false;

    loop {
        match reader
            .read_event()
            .map_err(|e| IngestError::Docx(format!("xml error: {e}")))?
        {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_text_run = true,
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => out.push('\n'),
                _ => {}
            },
            Event::Empty(e) if e.name().as_ref() == b"w:tab" => out.push('\t'),
            Event::Text(t) if in_text_run => {
                let run = t
                    .unescape()
                    .map_err(|e| IngestError::Docx(format!("bad entity: {e}")))?;
                out.push_str(&run);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(out)
}
