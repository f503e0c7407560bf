use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::candidate::StructuredCandidateRecord;

/// Status assigned to every freshly stored application.
pub const STATUS_APPLIED: &str = "applied";

/// A stored job application. Field names match the JSON file written by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: Uuid,
    #[serde(rename = "jobId")]
    pub job_id: String,
    pub position: String,
    pub company: String,
    pub status: String,
    #[serde(rename = "appliedDate")]
    pub applied_date: DateTime<Utc>,
    #[serde(rename = "lastUpdate")]
    pub last_update: DateTime<Utc>,
    #[serde(default)]
    pub resume_filename: Option<String>,
    pub structured_data: StructuredCandidateRecord,
}

/// Everything the store needs to create an `ApplicationRecord`.
/// The store assigns the id and timestamps.
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub job_id: String,
    pub position: String,
    pub company: String,
    pub resume_filename: Option<String>,
    pub structured_data: StructuredCandidateRecord,
}

impl NewApplication {
    pub fn into_record(self, now: DateTime<Utc>) -> ApplicationRecord {
        ApplicationRecord {
            id: Uuid::new_v4(),
            job_id: self.job_id,
            position: self.position,
            company: self.company,
            status: STATUS_APPLIED.to_string(),
            applied_date: now,
            last_update: now,
            resume_filename: self.resume_filename,
            structured_data: self.structured_data,
        }
    }
}
