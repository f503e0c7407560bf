use axum::{extract::State, Json};

use crate::errors::AppError;
use crate::sheets::{ShortlistRequest, ShortlistResponse};
use crate::state::AppState;

/// POST /shortlist
///
/// Reads the sheet through the given filters, then asks it to mark the
/// matching candidates as shortlisted.
pub async fn handle_shortlist(
    State(state): State<AppState>,
    Json(request): Json<ShortlistRequest>,
) -> Result<Json<ShortlistResponse>, AppError> {
    let sheets = state
        .shortlister
        .as_ref()
        .ok_or_else(|| AppError::Unavailable("Shortlist spreadsheet is not configured".to_string()))?;

    Ok(Json(sheets.shortlist(&request).await))
}
