//! Task Store domain types.
//!
//! The Task Store's on-disk format is treated as an external collaborator
//! owned by the host application, but the broker's post-processors still
//! need typed handles on what they read and write, so these mirror the
//! shapes the persisted document actually takes. Plain `serde`-derived
//! structs are used throughout rather than a schema-validation crate.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Status a `Task` or `Subtask` can carry. `Done` and `Completed` are
/// treated as synonyms by completed-item protection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Done,
    Completed,
    Deferred,
    Cancelled,
    #[serde(other)]
    Other,
}

impl TaskStatus {
    /// True for the two status spellings treated as "finished and
    /// therefore protected from being overwritten."
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Completed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtask {
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub details: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub dependencies: Vec<JsonValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub details: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub dependencies: Vec<JsonValue>,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskCollectionMetadata {
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, JsonValue>,
}

/// One tag's slice of the Task Store: its task list plus collection-level
/// metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskCollection {
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub metadata: TaskCollectionMetadata,
}

/// One item of an `analyze-complexity` report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplexityReportItem {
    pub task_id: u32,
    pub task_title: String,
    pub complexity_score: f32,
    #[serde(default)]
    pub recommended_subtasks: Option<u32>,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplexityReportMeta {
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub analyzed_count: usize,
    #[serde(default)]
    pub threshold: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplexityReport {
    pub complexity_analysis: Vec<ComplexityReportItem>,
    pub meta: ComplexityReportMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn done_and_completed_are_both_protected() {
        assert!(TaskStatus::Done.is_completed());
        assert!(TaskStatus::Completed.is_completed());
        assert!(!TaskStatus::Pending.is_completed());
    }
}
