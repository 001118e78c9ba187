//! Fixtures shared by the unit tests: in-memory documents and a scripted AI backend.

use std::collections::{HashMap, VecDeque};
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::Config;
use crate::llm_client::LlmError;
use crate::models::screening::{CandidateRecord, CandidateStatus, CandidateTier};
use crate::screening::analyzer::ScoringBackend;
use crate::state::AppState;
use crate::store::memory::MemoryJobStore;

pub fn zip_fixture(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer
            .start_file(*name, zip::write::FileOptions::default())
            .unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Minimal DOCX package with one paragraph per entry.
pub fn docx_fixture(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| {
            let escaped = p
                .replace('&', "&amp;")
                .replace('<', "&lt;")
                .replace('>', "&gt;");
            format!(r#"<w:p><w:r><w:t xml:space="preserve">{escaped}</w:t></w:r></w:p>"#)
        })
        .collect();
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    );
    let content_types = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;
    zip_fixture(&[
        ("[Content_Types].xml", content_types),
        ("word/document.xml", &document),
    ])
}

pub fn compound_file(streams: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut file = cfb::CompoundFile::create(Cursor::new(Vec::new())).unwrap();
    for (path, data) in streams {
        let mut stream = file.create_stream(path).unwrap();
        stream.write_all(data).unwrap();
    }
    file.flush().unwrap();
    file.into_inner().into_inner()
}

/// Word 97 document holding `text` as a single cp1252 piece.
pub fn doc_fixture(text: &str) -> Vec<u8> {
    doc_fixture_with_flags(text, 0x0200)
}

pub fn doc_fixture_with_flags(text: &str, flags: u16) -> Vec<u8> {
    const TEXT_OFFSET: usize = 0x200;
    let len = text.len() as u32;

    let mut word = vec![0u8; TEXT_OFFSET];
    word[0..2].copy_from_slice(&0xA5ECu16.to_le_bytes());
    word[0x0A..0x0C].copy_from_slice(&flags.to_le_bytes());
    word[0x4C..0x50].copy_from_slice(&len.to_le_bytes());

    // Piece table: CP 0..len, compressed text at byte TEXT_OFFSET.
    let mut plc = Vec::new();
    plc.extend(0u32.to_le_bytes());
    plc.extend(len.to_le_bytes());
    plc.extend(0u16.to_le_bytes());
    plc.extend(((TEXT_OFFSET as u32 * 2) | 0x4000_0000).to_le_bytes());
    plc.extend(0u16.to_le_bytes());
    let mut clx = vec![0x02];
    clx.extend((plc.len() as u32).to_le_bytes());
    clx.extend(plc);

    word[0x1A2..0x1A6].copy_from_slice(&0u32.to_le_bytes());
    word[0x1A6..0x1AA].copy_from_slice(&(clx.len() as u32).to_le_bytes());
    word.extend_from_slice(text.as_bytes());

    let table = if flags & 0x0200 != 0 { "/1Table" } else { "/0Table" };
    compound_file(&[("/WordDocument", word), (table, clx)])
}

/// Single-page PDF drawing `text` in Helvetica. An empty `text` gives a page
/// with an empty content stream.
pub fn pdf_fixture(text: &str) -> Vec<u8> {
    let content = if text.is_empty() {
        String::new()
    } else {
        let escaped = text
            .replace('\\', "\\\\")
            .replace('(', "\\(")
            .replace(')', "\\)");
        format!("BT /F1 12 Tf 72 720 Td ({escaped}) Tj ET")
    };
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R \
         /Resources << /Font << /F1 5 0 R >> >> >>"
            .to_string(),
        format!(
            "<< /Length {} >>\nstream\n{content}\nendstream",
            content.len()
        ),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, object) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend(format!("{} 0 obj\n{object}\nendobj\n", i + 1).into_bytes());
    }

    let xref_at = pdf.len();
    pdf.extend(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).into_bytes());
    for offset in offsets {
        pdf.extend(format!("{offset:010} 00000 n \n").into_bytes());
    }
    pdf.extend(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
            objects.len() + 1
        )
        .into_bytes(),
    );
    pdf
}

pub fn candidate(name: &str, score: u8, status: CandidateStatus) -> CandidateRecord {
    CandidateRecord {
        id: Uuid::new_v4(),
        job_id: Uuid::new_v4(),
        file_name: format!("{}.pdf", name.trim().to_lowercase()),
        position: 0,
        rank: 0,
        name: name.to_string(),
        email: format!("{}@example.com", name.trim().to_lowercase().replace(' ', ".")),
        phone: None,
        score,
        status,
        tier: CandidateTier::from_score(score),
        summary: "Summary.".to_string(),
        experience: "5 years".to_string(),
        skills: vec!["Rust".to_string()],
        education: None,
        location: None,
        raw_extracted_text: None,
    }
}

pub fn analysis_json(name: &str, score: u8) -> Value {
    json!({
        "name": name,
        "email": format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
        "phone": null,
        "experience": "5 years",
        "skills": ["Rust", "PostgreSQL"],
        "education": "BSc Computer Science",
        "location": null,
        "score": score,
        "summary": format!("{name} scored {score}."),
        "rejection_reason": "Experience does not match the core requirements."
    })
}

/// One scripted reply from [`ScriptedBackend`].
#[derive(Debug, Clone)]
pub enum Step {
    Respond(Value),
    Timeout,
    ServerError,
    Unauthorized,
    Garbage,
}

/// Replays per-resume scripts. A script is selected by the first marker that
/// appears in the resume text; each call consumes one step.
#[derive(Default)]
pub struct ScriptedBackend {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, marker: &str, steps: Vec<Step>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(marker.to_string(), steps.into());
        self
    }

    /// Every call sleeps for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_step(&self, resume_text: &str) -> Option<Step> {
        let mut scripts = self.scripts.lock().unwrap();
        let mut markers: Vec<&String> = scripts.keys().collect();
        markers.sort();
        let marker = markers
            .into_iter()
            .find(|m| resume_text.contains(m.as_str()))?
            .clone();
        scripts.get_mut(&marker)?.pop_front()
    }
}

#[async_trait]
impl ScoringBackend for ScriptedBackend {
    async fn score_resume(
        &self,
        _job_description: &str,
        resume_text: &str,
    ) -> Result<Value, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let step = self.next_step(resume_text);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match step {
            Some(Step::Respond(value)) => Ok(value),
            Some(Step::Timeout) => Err(LlmError::Timeout),
            Some(Step::ServerError) => Err(LlmError::Api {
                status: 503,
                message: "overloaded".to_string(),
            }),
            Some(Step::Unauthorized) => Err(LlmError::Api {
                status: 401,
                message: "invalid x-api-key".to_string(),
            }),
            Some(Step::Garbage) => Err(LlmError::Parse(
                serde_json::from_str::<Value>("I think this candidate is great").unwrap_err(),
            )),
            None => Err(LlmError::Api {
                status: 500,
                message: "no scripted response".to_string(),
            }),
        }
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/screener_test".to_string(),
        anthropic_api_key: "test-key".to_string(),
        port: 0,
        rust_log: "debug".to_string(),
        screening_threshold: 80,
        max_concurrency: 2,
        ai_max_retries: 2,
        ai_backoff_ms: 10,
        clamp_scores: false,
        max_files: 5,
        max_file_bytes: 1024 * 1024,
    }
}

pub fn test_state(backend: Arc<ScriptedBackend>, store: Arc<MemoryJobStore>) -> AppState {
    AppState::new(test_config(), backend, store).unwrap()
}
