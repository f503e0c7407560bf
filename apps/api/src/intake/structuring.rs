//! Structuring Client: turns parsed resume text into a `StructuredCandidateRecord`.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::info;

use crate::intake::prompts::CANDIDATE_EXTRACTION_PROMPT;
use crate::llm_client::prompts::JSON_ONLY_INSTRUCTION;
use crate::llm_client::{strip_code_fences, LlmClient, LlmError};
use crate::models::candidate::StructuredCandidateRecord;

#[derive(Debug, Error)]
pub enum StructuringError {
    #[error("structuring service unavailable: {0}")]
    ServiceUnavailable(#[from] LlmError),

    #[error("model did not return valid JSON: {raw}")]
    MalformedStructuredOutput { raw: String },
}

/// Seam between the intake pipeline and the structuring backend.
#[async_trait]
pub trait CandidateStructurer: Send + Sync {
    async fn structure(&self, text: &str) -> Result<StructuredCandidateRecord, StructuringError>;
}

/// Gemini-backed structurer. One request per call, never retried.
#[derive(Clone)]
pub struct LlmStructurer {
    llm: LlmClient,
}

impl LlmStructurer {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl CandidateStructurer for LlmStructurer {
    async fn structure(&self, text: &str) -> Result<StructuredCandidateRecord, StructuringError> {
        let prompt = build_extraction_prompt(text);
        let raw = self.llm.call_text(&prompt).await?;
        let record = parse_candidate_record(&raw)?;
        info!(
            "Structured candidate record with {} extra field(s)",
            record.extra.len()
        );
        Ok(record)
    }
}

pub fn build_extraction_prompt(text: &str) -> String {
    CANDIDATE_EXTRACTION_PROMPT
        .replace("{json_only}", JSON_ONLY_INSTRUCTION)
        .replace("{text}", text)
}

/// Parses model output into a record. Fences are tolerated; anything that
/// isn't a JSON object is `MalformedStructuredOutput` with the raw text.
pub fn parse_candidate_record(raw: &str) -> Result<StructuredCandidateRecord, StructuringError> {
    let malformed = || StructuringError::MalformedStructuredOutput {
        raw: raw.to_string(),
    };

    let value: Value = serde_json::from_str(strip_code_fences(raw)).map_err(|_| malformed())?;
    let Value::Object(fields) = value else {
        return Err(malformed());
    };

    serde_json::from_value(Value::Object(normalize_fields(fields))).map_err(|_| malformed())
}

/// Flattens every value to a string: lists join with `", "`, null becomes `""`.
pub fn normalize_fields(fields: Map<String, Value>) -> Map<String, Value> {
    fields
        .into_iter()
        .map(|(key, value)| (key, Value::String(flatten_value(value))))
        .collect()
}

fn flatten_value(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}
