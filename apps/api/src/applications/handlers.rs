use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::application::ApplicationRecord;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

/// GET /applications
pub async fn handle_list_applications(
    State(state): State<AppState>,
) -> Result<Json<Vec<ApplicationRecord>>, AppError> {
    Ok(Json(state.store.list().await?))
}

/// GET /applications/:id
pub async fn handle_get_application(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApplicationRecord>, AppError> {
    let record = state
        .store
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Application {id} not found")))?;
    Ok(Json(record))
}

/// PUT /applications/:id
pub async fn handle_update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<ApplicationRecord>, AppError> {
    let status = update.status.trim();
    if status.is_empty() {
        return Err(AppError::Validation("status cannot be empty".to_string()));
    }
    Ok(Json(state.store.update_status(id, status).await?))
}
