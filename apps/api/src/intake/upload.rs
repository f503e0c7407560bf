//! Temporary resume storage for the duration of one intake run.

use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::warn;
use uuid::Uuid;

use crate::parsing::DocumentUpload;

pub const ALLOWED_EXTENSIONS: [&str; 3] = ["pdf", "doc", "docx"];

/// A resume as received from the caller.
#[derive(Debug, Clone)]
pub struct ResumeUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl ResumeUpload {
    /// Lowercased extension, if it is on the allow-list.
    pub fn accepted_extension(&self) -> Option<String> {
        let (_, ext) = self.file_name.rsplit_once('.')?;
        let ext = ext.to_ascii_lowercase();
        ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
    }

    /// MIME type sent to the parser. Falls back to one derived from the extension.
    pub fn mime_type(&self) -> String {
        if let Some(content_type) = self.content_type.as_deref().filter(|c| !c.is_empty()) {
            return content_type.to_string();
        }
        match self.accepted_extension().as_deref() {
            Some("pdf") => "application/pdf",
            Some("doc") => "application/msword",
            Some("docx") => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            _ => "application/octet-stream",
        }
        .to_string()
    }

    pub fn to_document(&self) -> DocumentUpload {
        DocumentUpload {
            bytes: self.bytes.clone(),
            file_name: self.file_name.clone(),
            mime_type: self.mime_type(),
        }
    }
}

/// A resume written to the upload directory under a generated name.
///
/// `discard` removes it; dropping an undiscarded upload removes it too.
#[derive(Debug)]
pub struct SavedUpload {
    path: PathBuf,
    stored_name: String,
    removed: bool,
}

impl SavedUpload {
    pub async fn save(dir: &Path, extension: &str, bytes: &[u8]) -> io::Result<Self> {
        let stored_name = format!("{}.{extension}", Uuid::new_v4());
        Self::save_as(dir, stored_name, bytes).await
    }

    /// The guard owns the path before the first byte is written, so a
    /// failed write never leaves a partial file behind.
    async fn save_as(dir: &Path, stored_name: String, bytes: &[u8]) -> io::Result<Self> {
        tokio::fs::create_dir_all(dir).await?;
        let saved = Self {
            path: dir.join(&stored_name),
            stored_name,
            removed: false,
        };
        tokio::fs::write(&saved.path, bytes).await?;
        Ok(saved)
    }

    pub fn stored_name(&self) -> &str {
        &self.stored_name
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the file. Returns `Ok(true)` if this call deleted it and
    /// `Ok(false)` if it was already gone. Safe to call any number of times.
    pub fn discard(&mut self) -> io::Result<bool> {
        if self.removed {
            return Ok(false);
        }
        let result = match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => return Err(e),
        };
        self.removed = true;
        result
    }
}

impl Drop for SavedUpload {
    fn drop(&mut self) {
        if let Err(e) = self.discard() {
            warn!("Could not remove upload {}: {e}", self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str) -> ResumeUpload {
        ResumeUpload {
            file_name: name.to_string(),
            content_type: None,
            bytes: Bytes::from_static(b"resume"),
        }
    }

    #[test]
    fn test_extension_allow_list_is_case_insensitive() {
        assert_eq!(upload("cv.PDF").accepted_extension().as_deref(), Some("pdf"));
        assert_eq!(upload("cv.Docx").accepted_extension().as_deref(), Some("docx"));
        assert_eq!(upload("cv.final.doc").accepted_extension().as_deref(), Some("doc"));
        assert!(upload("cv.png").accepted_extension().is_none());
        assert!(upload("pdf").accepted_extension().is_none());
        assert!(upload("cv.pdf.exe").accepted_extension().is_none());
    }

    #[test]
    fn test_mime_type_prefers_declared_content_type() {
        let mut resume = upload("cv.docx");
        assert_eq!(
            resume.mime_type(),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
        resume.content_type = Some("application/x-custom".to_string());
        assert_eq!(resume.mime_type(), "application/x-custom");
    }

    #[tokio::test]
    async fn test_save_uses_generated_name() {
        let dir = tempfile::tempdir().unwrap();
        let saved = SavedUpload::save(dir.path(), "pdf", b"resume").await.unwrap();
        assert!(saved.stored_name().ends_with(".pdf"));
        assert_ne!(saved.stored_name(), "cv.pdf");
        assert_eq!(std::fs::read(saved.path()).unwrap(), b"resume");
    }

    #[tokio::test]
    async fn test_discard_twice_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let mut saved = SavedUpload::save(dir.path(), "pdf", b"resume").await.unwrap();
        assert!(saved.discard().unwrap());
        assert!(!saved.discard().unwrap());
        assert!(!saved.path().exists());
    }

    #[tokio::test]
    async fn test_discard_after_external_removal() {
        let dir = tempfile::tempdir().unwrap();
        let mut saved = SavedUpload::save(dir.path(), "doc", b"resume").await.unwrap();
        std::fs::remove_file(saved.path()).unwrap();
        assert!(!saved.discard().unwrap());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        // A directory squatting on the target name makes the write fail.
        std::fs::create_dir(dir.path().join("taken.pdf")).unwrap();

        let result = SavedUpload::save_as(dir.path(), "taken.pdf".to_string(), b"resume").await;
        assert!(result.is_err());

        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap())
            .filter(|e| e.file_type().unwrap().is_file())
            .collect();
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_drop_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let saved = SavedUpload::save(dir.path(), "pdf", b"resume").await.unwrap();
        let path = saved.path().to_path_buf();
        drop(saved);
        assert!(!path.exists());
    }
}
