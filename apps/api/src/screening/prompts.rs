// Prompt constants for the judgment call.
// The response contract (a single JSON object) is enforced on our side by
// `scoring::parse_judgment`, not trusted.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(jd_text|resume_text)\}").unwrap());

/// Judgment prompt template. Replace `{jd_text}` and `{resume_text}` before sending.
pub const JUDGMENT_PROMPT_TEMPLATE: &str = r#"Evaluate the resume against the job description.

Return JSON only, as a single object in this exact format:
{"name": "Candidate Name", "score": 0-100, "classification": "Excellent|Strong|Partial|Weak", "summary": "Brief summary"}

Rules:
- "score" is a number between 0 and 100.
- "classification" is exactly one of: Excellent, Strong, Partial, Weak.
- "summary" is one or two sentences on fit, strengths and gaps.
- Do NOT include any text outside the JSON object.

JOB DESCRIPTION:
{jd_text}

RESUME:
{resume_text}"#;

/// Fills both placeholders in one pass over the template, so placeholder-like
/// text inside either input is never expanded.
pub fn build_judgment_prompt(jd_text: &str, resume_text: &str) -> String {
    PLACEHOLDER_RE
        .replace_all(JUDGMENT_PROMPT_TEMPLATE, |caps: &Captures| match &caps[1] {
            "jd_text" => jd_text,
            _ => resume_text,
        })
        .into_owned()
}
