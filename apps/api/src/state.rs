use std::sync::Arc;

use crate::applications::ApplicationStore;
use crate::intake::pipeline::IntakePipeline;
use crate::sheets::SheetsClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<IntakePipeline>,
    /// Same store the pipeline appends to.
    pub store: Arc<dyn ApplicationStore>,
    /// Disabled when no shortlist endpoint is configured.
    pub shortlister: Option<SheetsClient>,
}
