// Screening LLM prompt templates.
// All prompts for the screening module are defined here.

pub const SCREENING_SYSTEM: &str = "\
You are an experienced technical recruiter screening resumes against a job description. \
Score realistically: most candidates are not a strong fit. \
You MUST respond with valid JSON only — no markdown fences, no explanations.";

pub const SCREENING_PROMPT_TEMPLATE: &str = r#"Assess how well this candidate fits the job description.

JOB DESCRIPTION:
{job_description}

RESUME TEXT:
{resume_text}

OUTPUT SCHEMA (return exactly this structure):
{
  "name": "string — the candidate's full name",
  "email": "string" | null,
  "phone": "string" | null,
  "experience": "string — relevant experience, e.g. '3 years', '5+ years'",
  "skills": ["string"],
  "education": "string — highest education level" | null,
  "location": "string" | null,
  "score": integer 0-100,
  "summary": "string — 2-3 sentences on fit and strengths",
  "rejection_reason": "string — 1-2 polite sentences on the main gaps" | null
}

RULES:
1. score reflects match against the job's requirements: experience, skills, education, overall fit
2. skills lists technical skills actually mentioned in the resume, in the order they appear
3. Provide rejection_reason only when the fit is weak; it will be quoted to the candidate
4. {no_invention}
5. Return ONLY the JSON object — nothing else, no code fences."#;
