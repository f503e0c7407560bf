//! Document Parsing Client: the only module that talks to LlamaParse.
//!
//! Two-phase contract: `submit` uploads a document and returns an opaque job
//! id; `await_result` polls that job until the service reports a terminal
//! state, then fetches the extracted markdown.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{multipart, Client};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Upper bound on the delay between two status polls.
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(30);

const COMPLETED_STATUSES: &[&str] = &["completed", "done", "success"];
const FAILED_STATUS: &str = "failed";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("parsing service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("parsing failed: {0}")]
    ParsingFailed(String),

    #[error("parse job did not finish after {attempts} attempts")]
    ParsingTimeout { attempts: u32 },
}

/// How often and how long `await_result` polls a job.
///
/// The delay before attempt `n` (0-based) is `interval * multiplier^n`,
/// capped at `max_interval`. The default multiplier of 1.0 keeps a fixed
/// interval.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_interval: Duration,
    pub multiplier: f64,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_interval: MAX_POLL_INTERVAL,
            multiplier: 1.0,
            max_attempts: 15,
        }
    }
}

impl PollPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if self.multiplier <= 1.0 {
            return self.interval.min(self.max_interval);
        }
        let factor = self.multiplier.powi(attempt as i32);
        let delay = self.interval.as_secs_f64() * factor;
        Duration::from_secs_f64(delay.min(self.max_interval.as_secs_f64()))
    }
}

/// Status of a remote parse job, lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseJobStatus {
    Pending(String),
    Completed,
    Failed,
}

impl ParseJobStatus {
    pub fn from_remote(raw: &str) -> Self {
        let status = raw.trim().to_lowercase();
        if COMPLETED_STATUSES.contains(&status.as_str()) {
            ParseJobStatus::Completed
        } else if status == FAILED_STATUS {
            ParseJobStatus::Failed
        } else {
            ParseJobStatus::Pending(status)
        }
    }
}

/// A document handed to the parser.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub bytes: Bytes,
    pub file_name: String,
    pub mime_type: String,
}

/// Seam between the intake pipeline and the parsing backend.
#[async_trait]
pub trait DocumentParser: Send + Sync {
    async fn submit(&self, document: &DocumentUpload) -> Result<String, ParseError>;

    async fn await_result(&self, job_id: &str, max_attempts: u32) -> Result<String, ParseError>;

    /// Attempt budget used by the pipeline when it calls `await_result`.
    fn max_attempts(&self) -> u32 {
        PollPolicy::default().max_attempts
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    id: Option<String>,
    job_id: Option<String>,
}

impl UploadResponse {
    fn into_job_id(self) -> Option<String> {
        self.id
            .filter(|id| !id.is_empty())
            .or(self.job_id.filter(|id| !id.is_empty()))
    }
}

/// Outcome of a single status poll.
enum PollAttempt {
    Done(String),
    Pending(String),
    /// Transport or decoding trouble; counts against the budget like `Pending`.
    Transient(String),
}

/// LlamaParse REST client.
#[derive(Clone)]
pub struct LlamaParseClient {
    client: Client,
    base_url: String,
    api_key: String,
    policy: PollPolicy,
}

impl LlamaParseClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
        policy: PollPolicy,
    ) -> Result<Self, ParseError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ParseError::ServiceUnavailable(format!("HTTP client setup: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            policy,
        })
    }

    fn upload_url(&self) -> String {
        format!("{}/upload", self.base_url)
    }

    fn status_url(&self, job_id: &str) -> String {
        format!("{}/job/{job_id}", self.base_url)
    }

    fn result_url(&self, job_id: &str) -> String {
        format!("{}/job/{job_id}/result/markdown", self.base_url)
    }

    /// One status check. `Err` is only returned for a terminal failure.
    async fn poll_once(&self, job_id: &str) -> Result<PollAttempt, ParseError> {
        let response = self
            .client
            .get(self.status_url(job_id))
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .and_then(|r| r.error_for_status());

        let body: serde_json::Value = match response {
            Ok(r) => match r.json().await {
                Ok(body) => body,
                Err(e) => {
                    return Ok(PollAttempt::Transient(format!(
                        "unreadable status body: {}",
                        e.without_url()
                    )))
                }
            },
            Err(e) => {
                return Ok(PollAttempt::Transient(format!(
                    "status request failed: {}",
                    e.without_url()
                )))
            }
        };

        let raw_status = body.get("status").and_then(|s| s.as_str()).unwrap_or("");
        match ParseJobStatus::from_remote(raw_status) {
            ParseJobStatus::Completed => match self.fetch_result(job_id).await {
                Ok(text) => Ok(PollAttempt::Done(text)),
                Err(e) => Ok(PollAttempt::Transient(format!(
                    "result request failed: {}",
                    e.without_url()
                ))),
            },
            ParseJobStatus::Failed => Err(ParseError::ParsingFailed(body.to_string())),
            ParseJobStatus::Pending(status) => Ok(PollAttempt::Pending(status)),
        }
    }

    async fn fetch_result(&self, job_id: &str) -> Result<String, reqwest::Error> {
        self.client
            .get(self.result_url(job_id))
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

#[async_trait]
impl DocumentParser for LlamaParseClient {
    async fn submit(&self, document: &DocumentUpload) -> Result<String, ParseError> {
        let part = multipart::Part::bytes(document.bytes.to_vec())
            .file_name(document.file_name.clone())
            .mime_str(&document.mime_type)
            .map_err(|e| ParseError::ServiceUnavailable(format!("invalid mime type: {e}")))?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.upload_url())
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(|e| ParseError::ServiceUnavailable(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ParseError::ServiceUnavailable(format!(
                "upload returned {status}: {body}"
            )));
        }

        let upload: UploadResponse = response
            .json()
            .await
            .map_err(|e| ParseError::ServiceUnavailable(format!("unreadable upload response: {}", e.without_url())))?;

        let job_id = upload.into_job_id().ok_or_else(|| {
            ParseError::ServiceUnavailable("upload response carried no job id".to_string())
        })?;

        info!("Submitted {} to LlamaParse as job {job_id}", document.file_name);
        Ok(job_id)
    }

    async fn await_result(&self, job_id: &str, max_attempts: u32) -> Result<String, ParseError> {
        for attempt in 0..max_attempts {
            match self.poll_once(job_id).await? {
                PollAttempt::Done(text) => {
                    info!(
                        "Parse job {job_id} completed after {} attempt(s), {} chars",
                        attempt + 1,
                        text.len()
                    );
                    return Ok(text);
                }
                PollAttempt::Pending(status) => debug!(
                    "Parse job {job_id} attempt {}/{max_attempts}: status '{status}'",
                    attempt + 1
                ),
                PollAttempt::Transient(reason) => warn!(
                    "Parse job {job_id} attempt {}/{max_attempts}: {reason}",
                    attempt + 1
                ),
            }
            tokio::time::sleep(self.policy.delay_for(attempt)).await;
        }

        Err(ParseError::ParsingTimeout {
            attempts: max_attempts,
        })
    }

    fn max_attempts(&self) -> u32 {
        self.policy.max_attempts
    }
}
