//! Checkpoint persistence for resumable runs.
//!
//! A long outline crawl flushes its full course list at a fixed cadence so a
//! crashed or interrupted run can resume where it left off. One checkpoint
//! file exists per term; it is superseded by the final output artifact and
//! deleted when the run completes.

pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Course, Term};

// Re-export for convenience
pub use local::LocalStore;

/// Checkpoint header, refreshed on every save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub term: Term,
    pub total_courses: usize,
    pub last_updated: DateTime<Utc>,
}

/// Durable snapshot of in-progress work: the whole course list, some with
/// outlines attached, some without. The final output artifact has the same
/// shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub metadata: CheckpointMetadata,
    pub courses: Vec<Course>,
}

impl Checkpoint {
    pub fn new(term: Term, courses: Vec<Course>) -> Self {
        Self {
            metadata: CheckpointMetadata {
                term,
                total_courses: courses.len(),
                last_updated: Utc::now(),
            },
            courses,
        }
    }

    /// Number of courses that already carry an outline.
    pub fn completed(&self) -> usize {
        self.courses.iter().filter(|c| c.has_outline()).count()
    }
}

/// Trait for checkpoint storage backends.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Overwrite the checkpoint for a term with the full current course list.
    async fn save(&self, term: Term, courses: &[Course]) -> Result<()>;

    /// Load the previously saved checkpoint, or `None` if there is none.
    async fn load(&self, term: Term) -> Result<Option<Checkpoint>>;

    /// Remove the checkpoint for a term. Missing checkpoints are not errors.
    async fn delete(&self, term: Term) -> Result<()>;

    /// Write the final output artifact for a completed run.
    async fn write_final(&self, term: Term, courses: &[Course]) -> Result<()>;
}
