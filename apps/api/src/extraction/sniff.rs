use std::io::Cursor;

use crate::extraction::{DocumentFormat, ExtractionError};

const PDF_MAGIC: &[u8] = b"%PDF-";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
/// Some producers prepend junk before the PDF header; readers tolerate up to 1 KiB.
const PDF_HEADER_WINDOW: usize = 1024;
const DOCX_MAIN_PART: &str = "word/document.xml";

/// Detects the document format from content. The filename only feeds error messages.
pub fn detect_format(bytes: &[u8], file_name: &str) -> Result<DocumentFormat, ExtractionError> {
    if bytes.is_empty() {
        return Err(ExtractionError::EmptyOrProtected);
    }

    let window = &bytes[..bytes.len().min(PDF_HEADER_WINDOW)];
    if window.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC) {
        return Ok(DocumentFormat::Pdf);
    }

    if bytes.starts_with(OLE_MAGIC) {
        // Legacy .doc, or an encrypted OOXML package; the DOC parser tells them apart.
        return Ok(DocumentFormat::Doc);
    }

    if bytes.starts_with(ZIP_MAGIC) {
        let archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| {
            ExtractionError::CorruptOrUnreadable(format!("'{file_name}' is not a readable archive: {e}"))
        })?;
        if archive.file_names().any(|name| name == DOCX_MAIN_PART) {
            return Ok(DocumentFormat::Docx);
        }
        return Err(ExtractionError::UnsupportedFormat(format!(
            "'{file_name}' is a zip archive without a Word document part"
        )));
    }

    Err(ExtractionError::UnsupportedFormat(format!(
        "'{file_name}' is not a PDF, DOC or DOCX document"
    )))
}
