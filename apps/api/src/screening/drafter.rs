//! Rejection Drafter: template-filled rejection emails.
//!
//! Drafting never calls the AI service. The only personalised input is the
//! rejection reason the analyzer already produced.

use crate::models::screening::{CandidateRecord, RejectionEmailDraft};

pub const SUBJECT_PREFIX: &str = "Thank you for your application - ";

const MAX_LABEL_CHARS: usize = 80;
const TITLE_SCAN_LINES: usize = 3;
const MAX_TITLE_LINE_CHARS: usize = 100;
const LEADING_WORDS: usize = 5;
const ROLE_WORDS: &[&str] = &[
    "engineer",
    "developer",
    "manager",
    "analyst",
    "specialist",
    "designer",
    "scientist",
    "lead",
    "director",
    "intern",
];

/// Short position label for subjects and greetings.
///
/// An explicit title wins. Otherwise the first of the leading lines that
/// looks like a job title is used, falling back to the first few words of the
/// description.
pub fn position_label(job_description: &str, explicit_title: Option<&str>) -> String {
    if let Some(title) = explicit_title.map(str::trim).filter(|t| !t.is_empty()) {
        return cap_chars(title);
    }

    let title_line = job_description
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(TITLE_SCAN_LINES)
        .find(|line| {
            let lower = line.to_lowercase();
            line.chars().count() < MAX_TITLE_LINE_CHARS
                && ROLE_WORDS.iter().any(|word| lower.contains(word))
        });
    if let Some(line) = title_line {
        return cap_chars(line);
    }

    let leading: Vec<&str> = job_description.split_whitespace().take(LEADING_WORDS).collect();
    if leading.is_empty() {
        return "Open Position".to_string();
    }
    cap_chars(&format!("{} Position", leading.join(" ")))
}

fn cap_chars(label: &str) -> String {
    match label.char_indices().nth(MAX_LABEL_CHARS) {
        Some((idx, _)) => label[..idx].trim_end().to_string(),
        None => label.to_string(),
    }
}

/// Drafts the rejection email for a rejected candidate.
pub fn draft_rejection(
    candidate: &CandidateRecord,
    position: &str,
    rejection_reason: Option<&str>,
) -> RejectionEmailDraft {
    let greeting_name = match candidate.name.trim() {
        "" => "Candidate",
        name => name,
    };

    let mut content = format!(
        "Dear {greeting_name},\n\n\
         Thank you for taking the time to apply for the {position} role. \
         We appreciate your interest in joining our team.\n\n\
         After careful review of your application and qualifications, we have decided to \
         move forward with other candidates whose experience more closely aligns with our \
         current requirements.\n\n"
    );

    if let Some(reason) = rejection_reason.map(str::trim).filter(|r| !r.is_empty()) {
        content.push_str(&format!(
            "In reviewing your application, we noted the following: {reason}\n\n"
        ));
    }

    content.push_str(
        "We encourage you to apply for future opportunities that match your skills and \
         experience.\n\n\
         Thank you again for your interest.\n\n\
         Best regards,\n\
         Hiring Team",
    );

    RejectionEmailDraft {
        candidate_id: candidate.id,
        job_id: candidate.job_id,
        candidate_name: candidate.name.clone(),
        candidate_email: candidate.email.clone(),
        subject: format!("{SUBJECT_PREFIX}{position}"),
        content,
    }
}
