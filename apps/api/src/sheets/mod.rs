//! Google Sheets integration through a deployed Apps Script web app.
//!
//! The same endpoint receives intake records (`POST` record), answers
//! filtered reads (`GET ?filters=&limit=&offset=`) and runs the
//! `SHORTLIST` action (`POST {method, criteria}`).

pub mod filters;
pub mod handlers;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::models::candidate::StructuredCandidateRecord;
use crate::sheets::filters::{FilterCondition, FilterSet};

const DEFAULT_SHORTLIST_MESSAGE: &str = "Shortlisting done";

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("spreadsheet unavailable: {0}")]
    SinkUnavailable(String),

    #[error("could not encode filters: {0}")]
    Filters(#[from] serde_json::Error),
}

/// Best-effort destination for intake records.
#[async_trait]
pub trait SpreadsheetSink: Send + Sync {
    /// Returns the sheet's acknowledgement message.
    async fn publish(&self, record: &StructuredCandidateRecord) -> Result<String, SheetsError>;
}

/// Filtered rows as returned by the sheet, whitespace-trimmed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SheetRows {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShortlistRequest {
    #[serde(default)]
    pub filters: FilterSet,
    /// Builder rows merged into `filters` before the query runs.
    #[serde(default)]
    pub conditions: Vec<FilterCondition>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ShortlistRequest {
    pub fn criteria(&self) -> FilterSet {
        let mut criteria = self.filters.clone();
        criteria.extend(&self.conditions);
        criteria
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ShortlistResponse {
    Shortlisted {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
        message: String,
    },
    FetchFailed {
        error: String,
    },
}

#[derive(Debug, Deserialize)]
struct RawSheetRows {
    #[serde(default)]
    headers: Vec<serde_json::Value>,
    #[serde(default)]
    rows: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct SheetMessage {
    message: Option<String>,
}

#[derive(Serialize)]
struct ShortlistAction<'a> {
    method: &'static str,
    criteria: &'a FilterSet,
}

#[derive(Clone)]
pub struct SheetsClient {
    client: Client,
    url: String,
}

impl SheetsClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SheetsError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SheetsError::SinkUnavailable(format!("HTTP client setup: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Reads rows matching `filters`. Zero `limit`/`offset` are treated as unset.
    pub async fn query(
        &self,
        filters: &FilterSet,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<SheetRows, SheetsError> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if !filters.is_empty() {
            params.push(("filters", filters.to_query_value()?));
        }
        if let Some(limit) = limit.filter(|l| *l > 0) {
            params.push(("limit", limit.to_string()));
        }
        if let Some(offset) = offset.filter(|o| *o > 0) {
            params.push(("offset", offset.to_string()));
        }

        let raw: RawSheetRows = self
            .client
            .get(&self.url)
            .query(&params)
            .send()
            .await
            .map_err(|e| SheetsError::SinkUnavailable(e.without_url().to_string()))?
            .json()
            .await
            .map_err(|e| SheetsError::SinkUnavailable(format!("unreadable sheet rows: {}", e.without_url())))?;

        Ok(SheetRows {
            headers: raw.headers.iter().map(cell_text).collect(),
            rows: raw
                .rows
                .iter()
                .map(|row| row.iter().map(cell_text).collect())
                .collect(),
        })
    }

    /// Triggers the sheet's SHORTLIST action for `criteria`.
    pub async fn mark_shortlisted(&self, criteria: &FilterSet) -> Result<String, SheetsError> {
        let body: SheetMessage = self
            .client
            .post(&self.url)
            .json(&ShortlistAction {
                method: "SHORTLIST",
                criteria,
            })
            .send()
            .await
            .map_err(|e| SheetsError::SinkUnavailable(e.without_url().to_string()))?
            .json()
            .await
            .map_err(|e| SheetsError::SinkUnavailable(format!("unreadable reply: {}", e.without_url())))?;
        Ok(body
            .message
            .unwrap_or_else(|| DEFAULT_SHORTLIST_MESSAGE.to_string()))
    }

    /// Fetch-then-shortlist. A failed fetch ends the flow; a failed
    /// shortlist call is reported in `message` next to the fetched rows.
    pub async fn shortlist(&self, request: &ShortlistRequest) -> ShortlistResponse {
        let criteria = request.criteria();

        let rows = match self.query(&criteria, request.limit, request.offset).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Shortlist fetch failed: {e}");
                return ShortlistResponse::FetchFailed {
                    error: format!("Error fetching data: {e}"),
                };
            }
        };

        let message = match self.mark_shortlisted(&criteria).await {
            Ok(message) => message,
            Err(e) => {
                warn!("Shortlist action failed: {e}");
                format!("Shortlisting error: {e}")
            }
        };

        info!("Shortlist returned {} row(s)", rows.rows.len());
        ShortlistResponse::Shortlisted {
            headers: rows.headers,
            rows: rows.rows,
            message,
        }
    }
}

#[async_trait]
impl SpreadsheetSink for SheetsClient {
    async fn publish(&self, record: &StructuredCandidateRecord) -> Result<String, SheetsError> {
        let response = self
            .client
            .post(&self.url)
            .json(&record.for_sheet())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SheetsError::SinkUnavailable(e.without_url().to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| SheetsError::SinkUnavailable(e.without_url().to_string()))?;

        let message = serde_json::from_str::<SheetMessage>(&body)
            .ok()
            .and_then(|m| m.message)
            .unwrap_or(body);
        Ok(message)
    }
}

fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
