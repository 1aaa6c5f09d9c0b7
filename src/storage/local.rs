//! Local filesystem checkpoint storage.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── {term}_checkpoint.json          # In-progress snapshot, deleted on completion
//! └── {term}_data_with_outline.json   # Final output artifact
//! ```
//!
//! Writes go to a temp file and are renamed into place, so a `save` is atomic
//! at the granularity of one call. An unreadable checkpoint is treated as no
//! checkpoint rather than aborting the run.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{Course, Term};
use crate::storage::{Checkpoint, CheckpointStore};

/// Local filesystem storage backend.
#[derive(Clone)]
pub struct LocalStore {
    root_dir: PathBuf,
}

impl LocalStore {
    /// Create a new store rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    fn checkpoint_path(&self, term: Term) -> PathBuf {
        self.root_dir.join(format!("{term}_checkpoint.json"))
    }

    fn final_path(&self, term: Term) -> PathBuf {
        self.root_dir.join(format!("{term}_data_with_outline.json"))
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, path: &PathBuf, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn write_json<T: Serialize>(&self, path: &PathBuf, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(path, &bytes).await
    }

    /// Read JSON, returning `None` if the file doesn't exist.
    async fn read_json<T: DeserializeOwned>(&self, path: &PathBuf) -> Result<Option<T>> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(AppError::Io(e)),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }
}

#[async_trait]
impl CheckpointStore for LocalStore {
    async fn save(&self, term: Term, courses: &[Course]) -> Result<()> {
        let checkpoint = Checkpoint::new(term, courses.to_vec());
        self.write_json(&self.checkpoint_path(term), &checkpoint)
            .await
    }

    async fn load(&self, term: Term) -> Result<Option<Checkpoint>> {
        let path = self.checkpoint_path(term);
        match self.read_json::<Checkpoint>(&path).await {
            Ok(checkpoint) => Ok(checkpoint),
            Err(AppError::Json(e)) => {
                // An interrupted write can leave an unparseable file; a stale
                // crawl is recoverable, an aborted run is not.
                log::warn!(
                    "Checkpoint {} is unreadable ({}); treating as absent",
                    path.display(),
                    e
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn delete(&self, term: Term) -> Result<()> {
        match tokio::fs::remove_file(self.checkpoint_path(term)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn write_final(&self, term: Term, courses: &[Course]) -> Result<()> {
        let artifact = Checkpoint::new(term, courses.to_vec());
        self.write_json(&self.final_path(term), &artifact).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Enrollment, Semester};
    use tempfile::TempDir;

    fn term() -> Term {
        Term::new(114, Semester::First)
    }

    fn make_course(id: &str) -> Course {
        Course {
            id: id.to_string(),
            name: format!("Course {id}"),
            teacher: "T".to_string(),
            credit: 3.0,
            hours: 3.0,
            course_type: "選修".to_string(),
            enrollment: Enrollment { limit: 50, current: 10 },
            schedule: Vec::new(),
            english_taught: false,
            tags: Default::default(),
            raw_schedule: String::new(),
            outline: None,
        }
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());

        let courses = vec![make_course("1"), make_course("2")];
        store.save(term(), &courses).await.unwrap();

        let checkpoint = store.load(term()).await.unwrap().unwrap();
        assert_eq!(checkpoint.metadata.total_courses, 2);
        assert_eq!(checkpoint.metadata.term, term());
        assert_eq!(checkpoint.courses[1].id, "2");
        assert_eq!(checkpoint.completed(), 0);
    }

    #[tokio::test]
    async fn load_without_checkpoint_is_none() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        assert!(store.load(term()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupted_checkpoint_is_treated_as_absent() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());

        let path = tmp.path().join("114-1_checkpoint.json");
        tokio::fs::write(&path, b"{\"metadata\": {tru").await.unwrap();

        assert!(store.load(term()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_overwrites_prior_checkpoint() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());

        store.save(term(), &[make_course("1")]).await.unwrap();
        store
            .save(term(), &[make_course("1"), make_course("2"), make_course("3")])
            .await
            .unwrap();

        let checkpoint = store.load(term()).await.unwrap().unwrap();
        assert_eq!(checkpoint.metadata.total_courses, 3);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());

        store.delete(term()).await.unwrap();

        store.save(term(), &[make_course("1")]).await.unwrap();
        store.delete(term()).await.unwrap();
        assert!(store.load(term()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn final_artifact_lands_next_to_the_checkpoint() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());

        store.write_final(term(), &[make_course("1")]).await.unwrap();

        let path = tmp.path().join("114-1_data_with_outline.json");
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: Checkpoint = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.metadata.total_courses, 1);
    }
}
