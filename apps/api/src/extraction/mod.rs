//! Document Extractor: turns an uploaded resume blob into plain text.
//!
//! The format is chosen by sniffing the content, never by trusting the
//! filename. Each supported format implements [`DocumentParser`]; the
//! extractor picks one, runs it, and normalises the result. An empty result
//! is a failure: downstream stages never see an empty document.

pub mod doc;
pub mod docx;
pub mod pdf;
pub mod sniff;

use bytes::Bytes;
use thiserror::Error;

use crate::models::screening::FailureKind;

use self::doc::DocParser;
use self::docx::DocxParser;
use self::pdf::PdfParser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Doc,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractionError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Corrupt or unreadable document: {0}")]
    CorruptOrUnreadable(String),

    #[error("Document is password-protected or contains no extractable text")]
    EmptyOrProtected,
}

impl ExtractionError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ExtractionError::UnsupportedFormat(_) => FailureKind::UnsupportedFormat,
            ExtractionError::CorruptOrUnreadable(_) => FailureKind::CorruptOrUnreadable,
            ExtractionError::EmptyOrProtected => FailureKind::EmptyOrProtectedDocument,
        }
    }
}

/// One parseable document format.
pub trait DocumentParser: Send + Sync {
    fn format(&self) -> DocumentFormat;

    /// Returns the raw text of the document. Normalisation happens in [`extract`].
    fn parse(&self, bytes: &[u8]) -> Result<String, ExtractionError>;
}

static PDF_PARSER: PdfParser = PdfParser;
static DOCX_PARSER: DocxParser = DocxParser;
static DOC_PARSER: DocParser = DocParser;

pub fn parser_for(format: DocumentFormat) -> &'static dyn DocumentParser {
    match format {
        DocumentFormat::Pdf => &PDF_PARSER,
        DocumentFormat::Docx => &DOCX_PARSER,
        DocumentFormat::Doc => &DOC_PARSER,
    }
}

/// Extracts normalised plain text from `bytes`. `file_name` is only used for
/// error messages.
pub fn extract(bytes: &[u8], file_name: &str) -> Result<String, ExtractionError> {
    let format = sniff::detect_format(bytes, file_name)?;
    let parser = parser_for(format);
    debug_assert_eq!(parser.format(), format);

    let raw = parser.parse(bytes)?;
    let text = normalize_text(&raw);
    if text.is_empty() {
        return Err(ExtractionError::EmptyOrProtected);
    }
    Ok(text)
}

/// Runs [`extract`] on the blocking pool. The buffer is dropped when the
/// blocking task finishes, whether or not the caller is still waiting.
pub async fn extract_blocking(bytes: Bytes, file_name: String) -> Result<String, ExtractionError> {
    tokio::task::spawn_blocking(move || extract(&bytes, &file_name))
        .await
        .map_err(|e| ExtractionError::CorruptOrUnreadable(format!("extraction task failed: {e}")))?
}

/// Collapses horizontal whitespace, strips control characters and drops blank lines.
pub fn normalize_text(raw: &str) -> String {
    raw.lines()
        .map(|line| {
            line.chars()
                .map(|c| if c.is_control() { ' ' } else { c })
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
