// Intake LLM prompt templates.

/// Candidate extraction prompt. Replace `{json_only}` and `{text}` before sending.
pub const CANDIDATE_EXTRACTION_PROMPT: &str = "\
You are an expert recruitment assistant.
Extract structured candidate information from the following text.
{json_only}
Use exactly these keys:
- Full Name
- Email
- Phone
- Position Applied
- Years of Experience
- Skills
- Preferred Location
- Availability

Text:
{text}
";
