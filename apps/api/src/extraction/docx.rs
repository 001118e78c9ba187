use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::extraction::{DocumentFormat, DocumentParser, ExtractionError};

const MAIN_PART: &str = "word/document.xml";

/// Office Open XML word-processing documents.
pub struct DocxParser;

impl DocumentParser for DocxParser {
    fn format(&self) -> DocumentFormat {
        DocumentFormat::Docx
    }

    fn parse(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| {
            ExtractionError::CorruptOrUnreadable(format!("DOCX archive unreadable: {e}"))
        })?;

        let mut xml = String::new();
        archive
            .by_name(MAIN_PART)
            .map_err(|e| ExtractionError::CorruptOrUnreadable(format!("missing {MAIN_PART}: {e}")))?
            .read_to_string(&mut xml)
            .map_err(|e| {
                ExtractionError::CorruptOrUnreadable(format!("failed to read {MAIN_PART}: {e}"))
            })?;

        document_text(&xml)
    }
}

/// Walks `word/document.xml`, keeping run text and turning paragraph, break
/// and table-cell boundaries into whitespace.
fn document_text(xml: &str) -> Result<String, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if e.name().as_ref() == b"w:t" {
                    in_text_run = true;
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => text.push('\n'),
                b"w:tc" => text.push(' '),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:cr" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text_run => {
                let chunk = t.unescape().map_err(|e| {
                    ExtractionError::CorruptOrUnreadable(format!("bad text in {MAIN_PART}: {e}"))
                })?;
                text.push_str(&chunk);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ExtractionError::CorruptOrUnreadable(format!(
                    "malformed {MAIN_PART} at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
    }

    Ok(text)
}
