//! Intake Orchestrator: one resume in, one stored application (or a
//! diagnosable failure) out.
//!
//! States: Received → FileSaved → Parsed → Structured → Validated →
//!         Enriched → Sunk → Stored → Completed
//!
//! `Rejected` (missing fields) and `Aborted` (any fatal error) are the other
//! terminals. Each transition is one method; the saved upload is discarded
//! once after the machine reaches a terminal state, whichever it is.

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::StatusCode;
use chrono::Local;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::applications::{ApplicationStore, StoreError};
use crate::intake::log::{IntakeLog, LogEntry};
use crate::intake::structuring::{CandidateStructurer, StructuringError};
use crate::intake::upload::{ResumeUpload, SavedUpload, ALLOWED_EXTENSIONS};
use crate::intake::validation::validate_record;
use crate::llm_client::LlmError;
use crate::models::application::{ApplicationRecord, NewApplication};
use crate::models::candidate::{StructuredCandidateRecord, SHEET_STATUS_APPLIED};
use crate::parsing::{DocumentParser, ParseError};
use crate::sheets::SpreadsheetSink;

const APPLIED_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("invalid file type for '{file_name}', expected one of: {}", ALLOWED_EXTENSIONS.join(", "))]
    InvalidFileType { file_name: String },

    #[error("could not save upload: {0}")]
    Upload(#[source] std::io::Error),

    #[error(transparent)]
    Parsing(#[from] ParseError),

    #[error(transparent)]
    Structuring(#[from] StructuringError),

    #[error("could not store application: {0}")]
    Store(#[from] StoreError),
}

impl IntakeError {
    /// Top-level description returned to callers. Underlying causes only go
    /// to tracing.
    fn summary(&self) -> String {
        match self {
            IntakeError::InvalidFileType { .. } => self.to_string(),
            IntakeError::Upload(_) => "could not save upload".to_string(),
            IntakeError::Parsing(ParseError::ServiceUnavailable(_)) => {
                "parsing service unavailable".to_string()
            }
            IntakeError::Parsing(ParseError::ParsingFailed(_)) => {
                "parsing service reported the job as failed".to_string()
            }
            IntakeError::Parsing(e @ ParseError::ParsingTimeout { .. }) => e.to_string(),
            IntakeError::Structuring(StructuringError::ServiceUnavailable(LlmError::Api {
                status,
                ..
            })) => format!("structuring service unavailable (status {status})"),
            IntakeError::Structuring(StructuringError::ServiceUnavailable(LlmError::EmptyContent)) => {
                "structuring service returned no content".to_string()
            }
            IntakeError::Structuring(StructuringError::ServiceUnavailable(_)) => {
                "structuring service unavailable".to_string()
            }
            IntakeError::Structuring(e @ StructuringError::MalformedStructuredOutput { .. }) => {
                e.to_string()
            }
            IntakeError::Store(_) => "could not store application".to_string(),
        }
    }
}

/// Job the candidate is applying to.
#[derive(Debug, Clone, PartialEq)]
pub struct JobContext {
    pub job_id: String,
    pub position: String,
    pub company: String,
}

/// State a run was in when it aborted. Only these transitions can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeStage {
    Received,
    FileSaved,
    Parsed,
    Sunk,
}

impl IntakeStage {
    fn describe(self) -> &'static str {
        match self {
            IntakeStage::Received => "upload",
            IntakeStage::FileSaved => "document parsing",
            IntakeStage::Parsed => "structuring",
            IntakeStage::Sunk => "storage",
        }
    }
}

#[derive(Debug)]
pub enum IntakeState {
    Received,
    FileSaved,
    Parsed { text: String },
    Structured { record: StructuredCandidateRecord },
    Validated { record: StructuredCandidateRecord },
    Enriched { record: StructuredCandidateRecord },
    Sunk { record: StructuredCandidateRecord },
    Stored { application: ApplicationRecord },
    Completed { application: ApplicationRecord },
    Rejected {
        missing: Vec<String>,
        record: StructuredCandidateRecord,
    },
    Aborted { stage: IntakeStage, error: IntakeError },
}

impl IntakeState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            IntakeState::Completed { .. } | IntakeState::Rejected { .. } | IntakeState::Aborted { .. }
        )
    }
}

/// Per-run scratch space: the caller's input plus what the run has produced
/// outside the state value itself.
struct IntakeRun {
    upload: ResumeUpload,
    context: JobContext,
    saved: Option<SavedUpload>,
    log: IntakeLog,
}

impl IntakeRun {
    fn abort(&mut self, stage: IntakeStage, error: IntakeError) -> IntakeState {
        error!("Intake aborted during {}: {error:?}", stage.describe());
        self.log.failure(format!(
            "Failed during {}: {}",
            stage.describe(),
            error.summary()
        ));
        IntakeState::Aborted { stage, error }
    }

    fn cleanup(&mut self) {
        let Some(saved) = self.saved.as_mut() else {
            return;
        };
        match saved.discard() {
            Ok(true) => self.log.info("Removed temporary resume file"),
            Ok(false) => {}
            Err(e) => self
                .log
                .warning(format!("Could not remove temporary resume file: {e}")),
        }
    }
}

/// The final state of a run together with its log.
#[derive(Debug)]
pub struct IntakeReport {
    pub state: IntakeState,
    pub log: IntakeLog,
}

/// Body returned to intake callers on every outcome.
#[derive(Debug, Clone, Serialize)]
pub struct IntakeResponse {
    pub success: bool,
    pub message: String,
    pub log: Vec<LogEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application: Option<ApplicationRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_data: Option<StructuredCandidateRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_fields: Option<Vec<String>>,
}

impl IntakeReport {
    #[cfg(test)]
    pub fn succeeded(&self) -> bool {
        matches!(self.state, IntakeState::Completed { .. })
    }

    pub fn http_status(&self) -> StatusCode {
        match &self.state {
            IntakeState::Completed { .. } => StatusCode::OK,
            IntakeState::Rejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            IntakeState::Aborted { error, .. } => match error {
                IntakeError::InvalidFileType { .. } => StatusCode::BAD_REQUEST,
                IntakeError::Parsing(_) | IntakeError::Structuring(_) => StatusCode::BAD_GATEWAY,
                IntakeError::Upload(_) | IntakeError::Store(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn into_response(self) -> IntakeResponse {
        let log = self.log.into_entries();
        match self.state {
            IntakeState::Completed { application } => IntakeResponse {
                success: true,
                message: "Application submitted successfully".to_string(),
                log,
                structured_data: Some(application.structured_data.clone()),
                application: Some(application),
                missing_fields: None,
            },
            IntakeState::Rejected { missing, record } => IntakeResponse {
                success: false,
                message: format!("Resume is missing required fields: {}", missing.join(", ")),
                log,
                application: None,
                structured_data: Some(record),
                missing_fields: Some(missing),
            },
            IntakeState::Aborted { stage, error } => IntakeResponse {
                success: false,
                message: format!(
                    "Application failed during {}: {}",
                    stage.describe(),
                    error.summary()
                ),
                log,
                application: None,
                structured_data: None,
                missing_fields: None,
            },
            other => IntakeResponse {
                success: false,
                message: format!("Application stopped in non-terminal state {other:?}"),
                log,
                application: None,
                structured_data: None,
                missing_fields: None,
            },
        }
    }
}

/// Wires the remote collaborators into the intake state machine.
#[derive(Clone)]
pub struct IntakePipeline {
    parser: Arc<dyn DocumentParser>,
    structurer: Arc<dyn CandidateStructurer>,
    sink: Option<Arc<dyn SpreadsheetSink>>,
    store: Arc<dyn ApplicationStore>,
    upload_dir: PathBuf,
}

impl IntakePipeline {
    pub fn new(
        parser: Arc<dyn DocumentParser>,
        structurer: Arc<dyn CandidateStructurer>,
        sink: Option<Arc<dyn SpreadsheetSink>>,
        store: Arc<dyn ApplicationStore>,
        upload_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            parser,
            structurer,
            sink,
            store,
            upload_dir: upload_dir.into(),
        }
    }

    /// Runs one intake request to a terminal state.
    pub async fn submit_intake(&self, upload: ResumeUpload, context: JobContext) -> IntakeReport {
        let mut run = IntakeRun {
            upload,
            context,
            saved: None,
            log: IntakeLog::new(),
        };

        let mut state = IntakeState::Received;
        while !state.is_terminal() {
            state = self.advance(&mut run, state).await;
        }
        run.cleanup();

        IntakeReport {
            state,
            log: run.log,
        }
    }

    async fn advance(&self, run: &mut IntakeRun, state: IntakeState) -> IntakeState {
        match state {
            IntakeState::Received => self.save_file(run).await,
            IntakeState::FileSaved => self.parse(run).await,
            IntakeState::Parsed { text } => self.structure(run, &text).await,
            IntakeState::Structured { record } => Self::validate(run, record),
            IntakeState::Validated { record } => Self::enrich(run, record),
            IntakeState::Enriched { record } => self.publish(run, record).await,
            IntakeState::Sunk { record } => self.store(run, record).await,
            IntakeState::Stored { application } => {
                run.log
                    .success(format!("Application {} submitted", application.id));
                IntakeState::Completed { application }
            }
            terminal => terminal,
        }
    }

    async fn save_file(&self, run: &mut IntakeRun) -> IntakeState {
        let Some(extension) = run.upload.accepted_extension() else {
            let file_name = run.upload.file_name.clone();
            return run.abort(IntakeStage::Received, IntakeError::InvalidFileType { file_name });
        };

        match SavedUpload::save(&self.upload_dir, &extension, &run.upload.bytes).await {
            Ok(saved) => {
                run.log.success(format!(
                    "Saved resume '{}' as {}",
                    run.upload.file_name,
                    saved.stored_name()
                ));
                run.saved = Some(saved);
                IntakeState::FileSaved
            }
            Err(e) => run.abort(IntakeStage::Received, IntakeError::Upload(e)),
        }
    }

    async fn parse(&self, run: &mut IntakeRun) -> IntakeState {
        let document = run.upload.to_document();

        let job_id = match self.parser.submit(&document).await {
            Ok(job_id) => job_id,
            Err(e) => return run.abort(IntakeStage::FileSaved, e.into()),
        };
        run.log
            .success(format!("Uploaded resume to parsing service (job {job_id})"));

        match self
            .parser
            .await_result(&job_id, self.parser.max_attempts())
            .await
        {
            Ok(text) => {
                run.log
                    .success(format!("Extracted {} characters of resume text", text.len()));
                IntakeState::Parsed { text }
            }
            Err(e) => run.abort(IntakeStage::FileSaved, e.into()),
        }
    }

    async fn structure(&self, run: &mut IntakeRun, text: &str) -> IntakeState {
        match self.structurer.structure(text).await {
            Ok(record) => {
                run.log.success("Structured candidate data");
                IntakeState::Structured { record }
            }
            Err(e) => run.abort(IntakeStage::Parsed, e.into()),
        }
    }

    fn validate(run: &mut IntakeRun, record: StructuredCandidateRecord) -> IntakeState {
        let result = validate_record(&record);
        if result.passed {
            run.log.success("All required fields present");
            IntakeState::Validated { record }
        } else {
            run.log.failure(format!(
                "Validation failed, missing fields: {}",
                result.missing.join(", ")
            ));
            IntakeState::Rejected {
                missing: result.missing,
                record,
            }
        }
    }

    fn enrich(run: &mut IntakeRun, mut record: StructuredCandidateRecord) -> IntakeState {
        let context = &run.context;
        record.position_applied = context.position.clone();
        record.company = Some(context.company.clone());
        record.job_id = Some(context.job_id.clone());
        record.status = Some(SHEET_STATUS_APPLIED.to_string());
        record.applied_date = Some(Local::now().format(APPLIED_DATE_FORMAT).to_string());
        run.log.success(format!(
            "Attached job context ({} at {})",
            context.position, context.company
        ));
        IntakeState::Enriched { record }
    }

    async fn publish(&self, run: &mut IntakeRun, record: StructuredCandidateRecord) -> IntakeState {
        match &self.sink {
            None => run.log.info("Spreadsheet sink not configured, skipped"),
            Some(sink) => match sink.publish(&record).await {
                Ok(message) => run.log.success(format!("Sent to spreadsheet: {message}")),
                Err(e) => {
                    warn!("Spreadsheet sink error: {e:?}");
                    run.log.warning("Spreadsheet sync failed, continuing");
                }
            },
        }
        IntakeState::Sunk { record }
    }

    async fn store(&self, run: &mut IntakeRun, record: StructuredCandidateRecord) -> IntakeState {
        let application = NewApplication {
            job_id: run.context.job_id.clone(),
            position: run.context.position.clone(),
            company: run.context.company.clone(),
            resume_filename: run.saved.as_ref().map(|s| s.stored_name().to_string()),
            structured_data: record,
        };

        match self.store.append(application).await {
            Ok(application) => {
                run.log.success(format!("Stored application {}", application.id));
                IntakeState::Stored { application }
            }
            Err(e) => run.abort(IntakeStage::Sunk, e.into()),
        }
    }
}
