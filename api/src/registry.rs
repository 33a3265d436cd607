//! Session registry: (user, file name) → index location + quiz + upload time.
//!
//! The core treats the vector path as an opaque handle; this registry is the
//! collaborator that hands those paths out. Records are kept in a single
//! JSON file rewritten atomically on every insert (write temp, rename) —
//! the volume here is one record per upload, not a database workload.

use std::fs;
use std::path::{Path, PathBuf};

use answerer::QuizQuestion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error_handler::AppError;

/// One record per (user, upload).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user_id: String,
    pub file_name: String,
    /// Where the raw upload was stored.
    pub file_path: PathBuf,
    /// Opaque handle resolved via `VectorIndex::load`.
    pub vector_path: PathBuf,
    pub questions: Vec<QuizQuestion>,
    pub upload_date: DateTime<Utc>,
}

/// JSON-file-backed registry with an in-memory working copy.
#[derive(Debug)]
pub struct SessionRegistry {
    path: PathBuf,
    records: RwLock<Vec<SessionRecord>>,
}

impl SessionRegistry {
    /// Opens (or initializes) the registry at `path`.
    ///
    /// A missing file is an empty registry; a present but unparseable file
    /// is an error rather than a silent wipe.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let path = path.into();
        let records = if path.exists() {
            let bytes = fs::read(&path)?;
            serde_json::from_slice(&bytes).map_err(|e| {
                AppError::RegistryCorrupt(format!("registry at {path:?} is unreadable: {e}"))
            })?
        } else {
            Vec::new()
        };

        info!("session registry at {:?} ({} records)", path, records.len());
        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    /// Inserts a new upload record.
    ///
    /// # Errors
    /// [`AppError::DuplicateUpload`] if the (user, file name) pair already
    /// exists.
    pub async fn insert(&self, record: SessionRecord) -> Result<(), AppError> {
        let mut records = self.records.write().await;
        if records
            .iter()
            .any(|r| r.user_id == record.user_id && r.file_name == record.file_name)
        {
            return Err(AppError::DuplicateUpload);
        }
        records.push(record);
        // The guard stays held across persist so concurrent inserts
        // serialize on the tmp file; the IO itself is offloaded.
        self.persist(records.as_slice()).await?;
        Ok(())
    }

    /// Resolves the vector path for a (user, file name) pair.
    pub async fn resolve_vector_path(
        &self,
        user_id: &str,
        file_name: &str,
    ) -> Option<PathBuf> {
        self.records
            .read()
            .await
            .iter()
            .find(|r| r.user_id == user_id && r.file_name == file_name)
            .map(|r| r.vector_path.clone())
    }

    /// Lists file names uploaded by a user, in upload order.
    pub async fn list_files(&self, user_id: &str) -> Vec<String> {
        self.records
            .read()
            .await
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.file_name.clone())
            .collect()
    }

    async fn persist(&self, records: &[SessionRecord]) -> Result<(), AppError> {
        let bytes = serde_json::to_vec_pretty(records)
            .map_err(|e| AppError::RegistryCorrupt(format!("serialization: {e}")))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!("registry persisted ({} records)", records.len());
        Ok(())
    }
}

/// Strips path components from a client-supplied file name.
///
/// Uploaded names feed into filesystem paths; only the terminal component
/// survives, and an empty result is rejected by the caller.
pub fn sanitize_file_name(name: &str) -> String {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .replace(['\\', ':'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(user: &str, file: &str) -> SessionRecord {
        SessionRecord {
            user_id: user.to_string(),
            file_name: file.to_string(),
            file_path: PathBuf::from(format!("uploads/{user}/{file}")),
            vector_path: PathBuf::from(format!("indexes/{user}/{file}")),
            questions: Vec::new(),
            upload_date: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_resolve_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SessionRegistry::open(dir.path().join("sessions.json")).unwrap();

        registry.insert(record("u1", "bio.pdf")).await.unwrap();
        registry.insert(record("u1", "chem.docx")).await.unwrap();
        registry.insert(record("u2", "bio.pdf")).await.unwrap();

        assert_eq!(
            registry.resolve_vector_path("u1", "bio.pdf").await,
            Some(PathBuf::from("indexes/u1/bio.pdf"))
        );
        assert_eq!(registry.resolve_vector_path("u1", "nope.pdf").await, None);
        assert_eq!(registry.list_files("u1").await, vec!["bio.pdf", "chem.docx"]);
    }

    #[tokio::test]
    async fn duplicate_upload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SessionRegistry::open(dir.path().join("sessions.json")).unwrap();

        registry.insert(record("u1", "bio.pdf")).await.unwrap();
        let err = registry.insert(record("u1", "bio.pdf")).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateUpload));
    }

    #[tokio::test]
    async fn registry_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");

        {
            let registry = SessionRegistry::open(&path).unwrap();
            registry.insert(record("u1", "bio.pdf")).await.unwrap();
        }

        let reopened = SessionRegistry::open(&path).unwrap();
        assert_eq!(reopened.list_files("u1").await, vec!["bio.pdf"]);
    }

    #[test]
    fn corrupt_registry_file_is_an_error_not_a_wipe() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        fs::write(&path, b"{{{ definitely not json").unwrap();

        let err = SessionRegistry::open(&path).unwrap_err();
        assert!(matches!(err, AppError::RegistryCorrupt(_)));
        // The broken file is left in place for inspection.
        assert_eq!(fs::read(&path).unwrap(), b"{{{ definitely not json");
    }

    #[test]
    fn file_names_lose_path_components() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("notes.pdf"), "notes.pdf");
        assert_eq!(sanitize_file_name("dir/notes.pdf"), "notes.pdf");
    }
}
