pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::applications::handlers as applications;
use crate::intake::handlers as intake;
use crate::sheets::handlers as sheets;
use crate::state::AppState;

/// Resumes plus multipart overhead.
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/apply", post(intake::handle_apply))
        .route("/applications", get(applications::handle_list_applications))
        .route(
            "/applications/:id",
            get(applications::handle_get_application).put(applications::handle_update_status),
        )
        .route("/shortlist", post(sheets::handle_shortlist))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
