// LLM prompts for job offer analysis and cover-letter composition.

/// System prompt for job offer analysis. Enforces JSON-only output.
pub const ANALYZE_SYSTEM: &str = "You are an experienced recruiter who reads job postings \
    and extracts what matters to an applicant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Analysis prompt. Replace `{job_body}` before sending.
pub const ANALYZE_PROMPT_TEMPLATE: &str = r#"Analyze the following job posting.

Return a JSON object with this EXACT schema (no extra fields):
{
  "company_name": "Acme GmbH",
  "title": "Senior Backend Engineer",
  "summary": "Two or three sentences on the role and the team.",
  "requirements": ["5+ years of backend development", "Fluent German"],
  "tasks": ["Design and run the order service"]
}

Rules:
- company_name is the hiring company, not a recruiting agency, when both appear.
- title is the role title as written in the posting.
- requirements lists hard and soft requirements, one per entry, in posting order.
- tasks lists the responsibilities of the role, one per entry.
- Write summary, requirements and tasks in the language of the posting.

JOB POSTING:
{job_body}"#;

/// System prompt for cover-letter composition. Enforces JSON-only output.
pub const COMPOSE_SYSTEM: &str = "You are a careful writer of job application cover letters. \
    You write concise, specific letters without filler phrases. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Composition prompt. Replace `{company_name}`, `{title}`, `{summary}`,
/// `{requirements}`, `{tasks}` and `{refinement}` before sending.
pub const COMPOSE_PROMPT_TEMPLATE: &str = r#"Write the body of a cover letter for the following position.

COMPANY: {company_name}
ROLE: {title}
SUMMARY: {summary}

REQUIREMENTS:
{requirements}

TASKS:
{tasks}

Return a JSON object with this EXACT schema:
{
  "cover_body": "The letter body as plain text. Paragraphs separated by blank lines."
}

Rules:
- Only the body: no address block, no date, no salutation, no signature.
- Three to four paragraphs, addressing the most important requirements first.
- Write in the language of the summary.
{refinement}"#;

/// Appended to the composition rules when the user asked for changes.
pub const REFINEMENT_TEMPLATE: &str = "- Follow these additional instructions: {prompt}";
