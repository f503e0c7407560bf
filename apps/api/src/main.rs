mod applications;
mod config;
mod errors;
mod intake;
mod llm_client;
mod models;
mod parsing;
mod routes;
mod sheets;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::applications::{ApplicationStore, JsonFileStore};
use crate::config::Config;
use crate::intake::pipeline::IntakePipeline;
use crate::intake::structuring::LlmStructurer;
use crate::llm_client::LlmClient;
use crate::parsing::LlamaParseClient;
use crate::routes::build_router;
use crate::sheets::{SheetsClient, SpreadsheetSink};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting intake API v{}", env!("CARGO_PKG_VERSION"));

    let parser = LlamaParseClient::new(
        &config.llamaparse_base_url,
        &config.llamaparse_api_key,
        config.http_timeout,
        config.poll_policy.clone(),
    )?;
    info!(
        "Document parser initialized (max {} polls)",
        config.poll_policy.max_attempts
    );

    let llm = LlmClient::new(
        &config.gemini_base_url,
        &config.gemini_model,
        &config.gemini_api_key,
        config.http_timeout,
    )?;
    info!("LLM client initialized (model: {})", llm.model());

    let sink: Option<Arc<dyn SpreadsheetSink>> = match &config.sheets_webapp_url {
        Some(url) => {
            info!("Spreadsheet sink enabled");
            Some(Arc::new(SheetsClient::new(url, config.http_timeout)?))
        }
        None => {
            info!("SHEETS_WEBAPP_URL not set, spreadsheet sink disabled");
            None
        }
    };

    let shortlister = config
        .shortlist_url
        .as_deref()
        .map(|url| SheetsClient::new(url, config.http_timeout))
        .transpose()?;

    let store: Arc<dyn ApplicationStore> = Arc::new(JsonFileStore::new(&config.applications_file));
    info!("Application store at {}", config.applications_file.display());

    let pipeline = IntakePipeline::new(
        Arc::new(parser),
        Arc::new(LlmStructurer::new(llm)),
        sink,
        store.clone(),
        &config.upload_dir,
    );

    let state = AppState {
        pipeline: Arc::new(pipeline),
        store,
        shortlister,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
