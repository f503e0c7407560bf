//! Application Record Store.
//!
//! Append-only from the intake pipeline's point of view; status updates
//! rewrite a single record. All writes funnel through one lock so concurrent
//! intake requests never interleave a read-modify-write.

pub mod handlers;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::application::{ApplicationRecord, NewApplication};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("application {0} not found")]
    NotFound(Uuid),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored applications are unreadable: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[async_trait]
pub trait ApplicationStore: Send + Sync {
    /// Stores a new application, assigning its id and timestamps.
    async fn append(&self, application: NewApplication) -> Result<ApplicationRecord, StoreError>;

    async fn list(&self) -> Result<Vec<ApplicationRecord>, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<ApplicationRecord>, StoreError>;

    /// Sets `status` and refreshes `lastUpdate`.
    async fn update_status(&self, id: Uuid, status: &str) -> Result<ApplicationRecord, StoreError>;
}

/// Applications kept as a pretty-printed JSON array in a single file.
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<Vec<ApplicationRecord>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes to a sibling temp file, then renames over the target.
    async fn save(&self, records: Vec<ApplicationRecord>) -> Result<(), StoreError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &records))
            .await
            .map_err(|e| StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
    }
}

fn write_atomically(path: &Path, records: &[ApplicationRecord]) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, records)?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

#[async_trait]
impl ApplicationStore for JsonFileStore {
    async fn append(&self, application: NewApplication) -> Result<ApplicationRecord, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;
        let record = application.into_record(Utc::now());
        records.push(record.clone());
        self.save(records).await?;
        info!("Stored application {} for job {}", record.id, record.job_id);
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<ApplicationRecord>, StoreError> {
        let _guard = self.write_lock.lock().await;
        self.load().await
    }

    async fn get(&self, id: Uuid) -> Result<Option<ApplicationRecord>, StoreError> {
        Ok(self.list().await?.into_iter().find(|r| r.id == id))
    }

    async fn update_status(&self, id: Uuid, status: &str) -> Result<ApplicationRecord, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load().await?;
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))?;
        record.status = status.to_string();
        record.last_update = Utc::now();
        let updated = record.clone();
        self.save(records).await?;
        debug!("Application {id} moved to status '{status}'");
        Ok(updated)
    }
}

/// Store backed by a `Vec`, for tests.
#[cfg(test)]
#[derive(Default)]
pub struct InMemoryStore {
    records: std::sync::Mutex<Vec<ApplicationRecord>>,
}

#[cfg(test)]
impl InMemoryStore {
    pub fn snapshot(&self) -> Vec<ApplicationRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl ApplicationStore for InMemoryStore {
    async fn append(&self, application: NewApplication) -> Result<ApplicationRecord, StoreError> {
        let record = application.into_record(Utc::now());
        self.records.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<ApplicationRecord>, StoreError> {
        Ok(self.snapshot())
    }

    async fn get(&self, id: Uuid) -> Result<Option<ApplicationRecord>, StoreError> {
        Ok(self.snapshot().into_iter().find(|r| r.id == id))
    }

    async fn update_status(&self, id: Uuid, status: &str) -> Result<ApplicationRecord, StoreError> {
        let mut records = self.records.lock().unwrap();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound(id))?;
        record.status = status.to_string();
        record.last_update = Utc::now();
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::candidate::StructuredCandidateRecord;

    fn new_application(job_id: &str) -> NewApplication {
        NewApplication {
            job_id: job_id.to_string(),
            position: "Backend Engineer".to_string(),
            company: "Acme".to_string(),
            resume_filename: Some(format!("{}.pdf", Uuid::new_v4())),
            structured_data: StructuredCandidateRecord {
                full_name: "Ada Lovelace".to_string(),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn test_missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("applications.json"));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("applications.json");

        let stored = JsonFileStore::new(&path)
            .append(new_application("job-1"))
            .await
            .unwrap();
        assert_eq!(stored.status, "applied");

        let reopened = JsonFileStore::new(&path);
        let fetched = reopened.get(stored.id).await.unwrap().unwrap();
        assert_eq!(fetched, stored);
        assert_eq!(fetched.structured_data.full_name, "Ada Lovelace");
    }

    #[tokio::test]
    async fn test_update_status_refreshes_last_update() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("applications.json"));
        let stored = store.append(new_application("job-1")).await.unwrap();

        let updated = store.update_status(stored.id, "interview").await.unwrap();
        assert_eq!(updated.status, "interview");
        assert!(updated.last_update >= stored.last_update);
        assert_eq!(updated.applied_date, stored.applied_date);

        let fetched = store.get(stored.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, "interview");
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("applications.json"));
        let missing = Uuid::new_v4();
        assert!(matches!(
            store.update_status(missing, "rejected").await.unwrap_err(),
            StoreError::NotFound(id) if id == missing
        ));
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_all_kept() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path().join("applications.json")));

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.append(new_application(&format!("job-{i}"))).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let records = store.list().await.unwrap();
        assert_eq!(records.len(), 16);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("applications.json");
        std::fs::write(&path, "{not an array").unwrap();
        let store = JsonFileStore::new(&path);
        assert!(matches!(store.list().await.unwrap_err(), StoreError::Corrupt(_)));
    }

    #[tokio::test]
    async fn test_empty_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("applications.json");
        std::fs::write(&path, "").unwrap();
        assert!(JsonFileStore::new(&path).list().await.unwrap().is_empty());
    }
}
