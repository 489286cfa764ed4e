//! Reading book source files into [`Document`]s.
//!
//! Supports plain text/markdown, PDF (text extraction), and docx. The
//! chunker itself never touches the filesystem; everything format-specific
//! happens here.

#[cfg(test)]
mod tests;

use std::io::Read;
use std::path::Path;

use anyhow::Context;
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::debug;
use walkdir::WalkDir;

use crate::chunker::{Document, DocumentFormat};
use crate::{BookragError, Result};

/// Map a file extension to a supported document format.
#[inline]
pub fn detect_format(path: &Path) -> Option<DocumentFormat> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "txt" | "md" => Some(DocumentFormat::Text),
        "pdf" => Some(DocumentFormat::Pdf),
        "docx" => Some(DocumentFormat::Docx),
        _ => None,
    }
}

/// Walk a directory tree and collect all supported book source files, in a
/// deterministic (path-sorted) order.
#[inline]
pub fn collect_source_files(root: &Path) -> Result<Vec<std::path::PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(|e| {
            BookragError::Io(std::io::Error::other(format!(
                "Failed to walk directory {}: {e}",
                root.display()
            )))
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        if detect_format(entry.path()).is_some() {
            files.push(entry.path().to_path_buf());
        } else {
            debug!("Skipping unsupported file: {}", entry.path().display());
        }
    }

    files.sort();
    Ok(files)
}

/// Read one source file into a [`Document`].
#[inline]
pub fn read_document(path: &Path) -> Result<Document> {
    let format = detect_format(path).ok_or_else(|| {
        BookragError::InvalidInput(format!("Unsupported file type: {}", path.display()))
    })?;

    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    let text = match format {
        DocumentFormat::Text => extract_text(&bytes),
        DocumentFormat::Pdf => extract_pdf_text(&bytes, path)?,
        DocumentFormat::Docx => extract_docx_text(&bytes, path)?,
    };

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dir_name = path
        .parent()
        .and_then(|parent| parent.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(Document {
        text,
        file_name,
        dir_name,
        full_path: path.to_string_lossy().into_owned(),
        format,
    })
}

/// Decode plain text, tolerating the odd non-UTF-8 byte in scanned sources.
fn extract_text(bytes: &[u8]) -> String {
    String::from_utf8(bytes.to_vec())
        .unwrap_or_else(|_| String::from_utf8_lossy(bytes).into_owned())
}

fn extract_pdf_text(bytes: &[u8], path: &Path) -> Result<String> {
    let text = pdf_extract::extract_text_from_mem(bytes).map_err(|e| {
        BookragError::InvalidInput(format!(
            "PDF extraction failed for {}: {e}",
            path.display()
        ))
    })?;
    Ok(text)
}

/// Pull paragraph text out of the docx archive's `word/document.xml`.
/// Paragraph boundaries become blank lines so the chunker can split on them.
fn extract_docx_text(bytes: &[u8], path: &Path) -> Result<String> {
    let cursor = std::io::Cursor::new(bytes);
    let mut archive = zip::ZipArchive::new(cursor).map_err(|e| {
        BookragError::InvalidInput(format!("Not a docx archive ({}): {e}", path.display()))
    })?;

    let mut document_xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| {
            BookragError::InvalidInput(format!(
                "docx missing word/document.xml ({}): {e}",
                path.display()
            ))
        })?
        .read_to_string(&mut document_xml)
        .with_context(|| format!("Failed to read docx body: {}", path.display()))?;

    docx_xml_to_text(&document_xml, path)
}

fn docx_xml_to_text(document_xml: &str, path: &Path) -> Result<String> {
    let mut reader = Reader::from_str(document_xml);
    reader.config_mut().trim_text(false);

    let mut paragraphs: Vec<String> = Vec::new();
    let mut current = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"p" => current.clear(),
            Ok(Event::End(e)) if e.local_name().as_ref() == b"p" => {
                if !current.trim().is_empty() {
                    paragraphs.push(current.trim().to_string());
                }
                current.clear();
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(|e| {
                    BookragError::InvalidInput(format!(
                        "docx text decode failed ({}): {e}",
                        path.display()
                    ))
                })?;
                current.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(BookragError::InvalidInput(format!(
                    "docx XML parse failed ({}): {e}",
                    path.display()
                )));
            }
        }
    }

    Ok(paragraphs.join("\n\n"))
}
