/// LLM Client: the single point of entry for all generative-language calls.
///
/// ARCHITECTURAL RULE: No other module may call the Gemini API directly.
/// All LLM interactions MUST go through this module.
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod prompts;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// Drops the request URL so endpoint details never travel with the error.
impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        LlmError::Http(e.without_url())
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata")]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
pub struct CandidatePart {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    #[serde(rename = "promptTokenCount", default)]
    pub input_tokens: u32,
    #[serde(rename = "candidatesTokenCount", default)]
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Concatenated text parts of the first candidate.
    pub fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        (!text.is_empty()).then_some(text)
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

/// The single LLM client used by every service.
/// Wraps the `generateContent` endpoint with one request per call.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl LlmClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// Makes one call to the model, returning the full response object.
    pub async fn call(&self, prompt: &str) -> Result<LlmResponse, LlmError> {
        let request_body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let llm_response: LlmResponse = response.json().await?;

        if let Some(usage) = &llm_response.usage {
            debug!(
                "LLM call succeeded: input_tokens={}, output_tokens={}",
                usage.input_tokens, usage.output_tokens
            );
        }

        Ok(llm_response)
    }

    /// Calls the model and returns its trimmed text, with any code fence removed.
    /// Callers own JSON decoding so they can report the raw text on failure.
    pub async fn call_text(&self, prompt: &str) -> Result<String, LlmError> {
        let response = self.call(prompt).await?;
        let text = response.text().ok_or(LlmError::EmptyContent)?;
        Ok(strip_code_fences(&text).to_string())
    }
}

/// Strips a ```` ```lang ... ``` ```` code fence from LLM output.
/// The language tag is optional and may be any single word.
pub fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    // A tag sits directly after the opening fence, before the first newline.
    let inner = match inner.split_once('\n') {
        Some((tag, rest)) if is_fence_tag(tag) => rest,
        _ => inner
            .trim_start_matches(|c: char| c.is_ascii_alphanumeric())
            .trim_start(),
    };
    inner.trim()
}

fn is_fence_tag(line: &str) -> bool {
    line.trim().chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn test_strip_code_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_code_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_code_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_code_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_code_fences_no_fences() {
        let input = "  {\"key\": \"value\"}\n";
        assert_eq!(strip_code_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_code_fences_single_line() {
        assert_eq!(strip_code_fences("```json {\"a\": 1}```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```{\"a\": 1}```"), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_code_fences_other_tag() {
        let input = "```JSON5\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(input), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_code_fences_unterminated() {
        let input = "```json\n{\"a\": 1}";
        assert_eq!(strip_code_fences(input), "{\"a\": 1}");
    }

    #[test]
    fn test_response_text_joins_parts() {
        let response: LlmResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "{\"a\":"}, {"text": " 1}"}]}}]
        }))
        .unwrap();
        assert_eq!(response.text().as_deref(), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_response_without_candidates_has_no_text() {
        let response: LlmResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(response.text().is_none());
    }

    #[tokio::test]
    async fn test_call_text_strips_fences() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-test:generateContent"))
            .and(header(API_KEY_HEADER, "k"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": "```json\n{\"Email\": \"a@b.c\"}\n```"}]}}],
                "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 5}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let llm = LlmClient::new(server.uri(), "gemini-test", "k", Duration::from_secs(5)).unwrap();
        let text = llm.call_text("prompt").await.unwrap();
        assert_eq!(text, "{\"Email\": \"a@b.c\"}");
    }

    #[tokio::test]
    async fn test_api_error_message_is_extracted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"code": 400, "message": "API key not valid"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let llm = LlmClient::new(server.uri(), "gemini-test", "bad", Duration::from_secs(5)).unwrap();
        match llm.call_text("prompt").await.unwrap_err() {
            LlmError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_candidates_is_empty_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": []
            })))
            .mount(&server)
            .await;

        let llm = LlmClient::new(server.uri(), "gemini-test", "k", Duration::from_secs(5)).unwrap();
        assert!(matches!(
            llm.call_text("prompt").await.unwrap_err(),
            LlmError::EmptyContent
        ));
    }

    #[tokio::test]
    async fn test_transport_error_hides_endpoint_and_key() {
        let llm = LlmClient::new(
            "http://127.0.0.1:9",
            "gemini-test",
            "AIza-not-for-callers",
            Duration::from_secs(1),
        )
        .unwrap();
        let err = llm.call_text("prompt").await.unwrap_err();
        assert!(matches!(err, LlmError::Http(_)));
        let shown = err.to_string();
        assert!(!shown.contains("AIza-not-for-callers"));
        assert!(!shown.contains("127.0.0.1"));
    }
}
