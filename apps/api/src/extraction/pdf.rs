use std::panic::{self, AssertUnwindSafe};

use tracing::warn;

use crate::extraction::{DocumentFormat, DocumentParser, ExtractionError};

/// Encrypted PDFs carry an `/Encrypt` entry in the trailer dictionary.
const ENCRYPT_MARKER: &[u8] = b"/Encrypt";
const TRAILER_KEYWORD: &[u8] = b"trailer";
const XREF_STREAM_TYPE: &[u8] = b"/XRef";

pub struct PdfParser;

impl DocumentParser for PdfParser {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Pdf
    }

    fn parse(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        if is_encrypted(bytes) {
            return Err(ExtractionError::EmptyOrProtected);
        }

        // pdf-extract panics on some malformed inputs instead of returning an error.
        match panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(ExtractionError::CorruptOrUnreadable(format!(
                "PDF could not be parsed: {e}"
            ))),
            Err(_) => {
                warn!("PDF parser panicked on a {} byte document", bytes.len());
                Err(ExtractionError::CorruptOrUnreadable(
                    "PDF parser aborted on malformed content".to_string(),
                ))
            }
        }
    }
}

fn is_encrypted(bytes: &[u8]) -> bool {
    trailer_dictionary(bytes).is_some_and(|dict| find(dict, ENCRYPT_MARKER).is_some())
}

/// Bytes holding the document trailer: everything after the last `trailer`
/// keyword, or the dictionary of the cross-reference stream for PDF 1.5+
/// files that have no classic trailer.
fn trailer_dictionary(bytes: &[u8]) -> Option<&[u8]> {
    if let Some(at) = rfind(bytes, TRAILER_KEYWORD) {
        return Some(&bytes[at..]);
    }
    let at = rfind(bytes, XREF_STREAM_TYPE)?;
    let start = rfind(&bytes[..at], b"obj").unwrap_or(0);
    let end = find(&bytes[at..], b"stream").map_or(bytes.len(), |i| at + i);
    Some(&bytes[start..end])
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}
