use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::intake::pipeline::{IntakeResponse, JobContext};
use crate::intake::upload::ResumeUpload;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyQuery {
    pub job_id: String,
    pub position: String,
    pub company: String,
}

/// POST /apply?jobId=..&position=..&company=..
///
/// Expects the resume in the multipart field `file`. Pipeline outcomes,
/// including soft failures, come back as an `IntakeResponse`.
pub async fn handle_apply(
    State(state): State<AppState>,
    Query(query): Query<ApplyQuery>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<IntakeResponse>), AppError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;
        upload = Some(ResumeUpload {
            file_name,
            content_type,
            bytes,
        });
    }

    let upload = upload.ok_or_else(|| AppError::Validation("No file part".to_string()))?;
    if upload.file_name.is_empty() {
        return Err(AppError::Validation("No selected file".to_string()));
    }

    let context = JobContext {
        job_id: query.job_id,
        position: query.position,
        company: query.company,
    };
    let report = state.pipeline.submit_intake(upload, context).await;
    Ok((report.http_status(), Json(report.into_response())))
}
