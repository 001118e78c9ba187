// Shared prompt constants and prompt-building utilities.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Instruction that keeps extracted candidate facts grounded in the resume.
pub const NO_INVENTION_INSTRUCTION: &str = "\
    CRITICAL: Extract only information present in the resume text. \
    Do NOT infer, interpolate, or invent names, contact details, employers or skills. \
    If a value is not present, use null.";
