//! The Task Store itself: a tag-partitioned JSON document with
//! read-modify-write atomicity, serialized through one global write lock.
//!
//! Every post-processor call is already inside an async context spawned by
//! the Tool Wrapper, so this module uses `tokio::fs` rather than blocking
//! file I/O.

use crate::broker::error::BrokerError;
use crate::broker::types::{ComplexityReport, TaskCollection};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::paths;

type TaggedMap = HashMap<String, TaskCollection>;

/// A project's Task Store. Cheap to clone — the write lock and project
/// root are both shared via `Arc`/`PathBuf` clones.
#[derive(Clone)]
pub struct TaskStore {
    project_root: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl TaskStore {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        TaskStore {
            project_root: project_root.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn project_root(&self) -> &std::path::Path {
        &self.project_root
    }

    async fn read_map(&self) -> Result<TaggedMap, BrokerError> {
        let path = paths::tasks_file(&self.project_root);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| BrokerError::Persistence(format!("corrupt tasks.json: {e}"))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(TaggedMap::new()),
            Err(e) => Err(BrokerError::Persistence(format!(
                "failed to read tasks.json: {e}"
            ))),
        }
    }

    async fn write_map(&self, map: &TaggedMap) -> Result<(), BrokerError> {
        let path = paths::tasks_file(&self.project_root);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BrokerError::Persistence(format!("failed to create {parent:?}: {e}")))?;
        }
        let body = serde_json::to_vec_pretty(map)
            .map_err(|e| BrokerError::Persistence(format!("failed to serialize tasks.json: {e}")))?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| BrokerError::Persistence(format!("failed to write tasks.json: {e}")))
    }

    /// Fetch one tag's slice without mutating it.
    pub async fn read_tag(&self, tag: &str) -> Result<TaskCollection, BrokerError> {
        let map = self.read_map().await?;
        Ok(map.get(tag).cloned().unwrap_or_default())
    }

    /// One past the highest existing task id in `tag`, for `add-task` command
    /// cores to mint a `newTaskId` hint before delegating.
    pub async fn next_task_id(&self, tag: &str) -> Result<u32, BrokerError> {
        let collection = self.read_tag(tag).await?;
        Ok(collection.tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1)
    }

    /// Count of `task_id`'s existing subtasks, for `expand-task` to compute
    /// its `nextSubtaskId` hint before delegating.
    pub async fn subtask_count(&self, tag: &str, task_id: u32) -> Result<u32, BrokerError> {
        let collection = self.read_tag(tag).await?;
        let task = collection
            .tasks
            .iter()
            .find(|t| t.id == task_id)
            .ok_or_else(|| BrokerError::PayloadShape(format!("task {task_id} not found")))?;
        Ok(task.subtasks.len() as u32)
    }

    /// `expand-task`'s `force` flag: drop `task_id`'s existing non-completed
    /// subtasks before a fresh delegation is made, so the saver numbers the
    /// Agent's new subtasks starting at 1. Already-completed subtasks are
    /// kept under completed-item protection, and a completed parent task is
    /// left untouched entirely (returned `skipped = true`). Returns the
    /// task's resulting subtask count (for the `nextSubtaskId` hint), the
    /// surviving tasks of the mutated tag (for derived-file regeneration),
    /// and whether the clear was skipped.
    pub async fn clear_subtasks(
        &self,
        tag: &str,
        task_id: u32,
    ) -> Result<(u32, Vec<crate::broker::types::Task>, bool), BrokerError> {
        let mut skipped = false;
        let collection = self
            .mutate_tag(tag, |slot| {
                let task = slot
                    .tasks
                    .iter_mut()
                    .find(|t| t.id == task_id)
                    .ok_or_else(|| BrokerError::PayloadShape(format!("task {task_id} not found")))?;
                if task.status.is_completed() {
                    skipped = true;
                } else {
                    task.subtasks.retain(|s| s.status.is_completed());
                }
                Ok(())
            })
            .await?;
        let remaining = collection
            .tasks
            .iter()
            .find(|t| t.id == task_id)
            .map(|t| t.subtasks.len() as u32)
            .unwrap_or(0);
        Ok((remaining, collection.tasks, skipped))
    }

    /// Read-modify-write a single tag's slice under the store's global write
    /// lock, then return the mutated slice. `mutator` runs entirely in
    /// memory; the whole document is rewritten once on success.
    pub async fn mutate_tag<F>(&self, tag: &str, mutator: F) -> Result<TaskCollection, BrokerError>
    where
        F: FnOnce(&mut TaskCollection) -> Result<(), BrokerError>,
    {
        let _guard = self.write_lock.lock().await;
        let mut map = self.read_map().await?;
        let mut collection = map.remove(tag).unwrap_or_default();
        mutator(&mut collection)?;
        let result = collection.clone();
        map.insert(tag.to_string(), collection);
        self.write_map(&map).await?;
        Ok(result)
    }

    pub async fn read_complexity_report(&self) -> Result<Option<ComplexityReport>, BrokerError> {
        let path = paths::complexity_report_file(&self.project_root);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => serde_json::from_str(&contents)
                .map(Some)
                .map_err(|e| BrokerError::Persistence(format!("corrupt complexity report: {e}"))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BrokerError::Persistence(format!(
                "failed to read complexity report: {e}"
            ))),
        }
    }

    pub async fn write_complexity_report(&self, report: &ComplexityReport) -> Result<(), BrokerError> {
        let _guard = self.write_lock.lock().await;
        let path = paths::complexity_report_file(&self.project_root);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BrokerError::Persistence(format!("failed to create {parent:?}: {e}")))?;
        }
        let body = serde_json::to_vec_pretty(report)
            .map_err(|e| BrokerError::Persistence(format!("failed to serialize report: {e}")))?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| BrokerError::Persistence(format!("failed to write report: {e}")))
    }

    pub async fn write_research_doc(&self, file_name: &str, contents: &str) -> Result<(), BrokerError> {
        let _guard = self.write_lock.lock().await;
        let path = paths::taskmaster_root(&self.project_root)
            .join("docs")
            .join("research")
            .join(file_name);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BrokerError::Persistence(format!("failed to create {parent:?}: {e}")))?;
        }
        tokio::fs::write(&path, contents)
            .await
            .map_err(|e| BrokerError::Persistence(format!("failed to write research doc: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::types::{Task, TaskStatus};

    #[tokio::test]
    async fn mutate_tag_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = TaskStore::new(dir.path());
        store
            .mutate_tag("master", |collection| {
                collection.tasks.push(Task {
                    id: 1,
                    title: "A".to_string(),
                    description: String::new(),
                    details: String::new(),
                    status: TaskStatus::Pending,
                    priority: "medium".to_string(),
                    dependencies: vec![],
                    subtasks: vec![],
                });
                Ok(())
            })
            .await
            .unwrap();

        let reloaded = store.read_tag("master").await.unwrap();
        assert_eq!(reloaded.tasks.len(), 1);
        assert_eq!(reloaded.tasks[0].title, "A");
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty_collection() {
        let dir = tempfile::tempdir().unwrap();
        let store = TaskStore::new(dir.path());
        let collection = store.read_tag("master").await.unwrap();
        assert!(collection.tasks.is_empty());
    }

    #[tokio::test]
    async fn next_task_id_starts_at_one_for_an_empty_tag() {
        let dir = tempfile::tempdir().unwrap();
        let store = TaskStore::new(dir.path());
        assert_eq!(store.next_task_id("master").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn next_task_id_is_one_past_the_highest_existing_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = TaskStore::new(dir.path());
        store
            .mutate_tag("master", |collection| {
                collection.tasks.push(Task {
                    id: 5,
                    title: "A".to_string(),
                    description: String::new(),
                    details: String::new(),
                    status: TaskStatus::Pending,
                    priority: "medium".to_string(),
                    dependencies: vec![],
                    subtasks: vec![],
                });
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(store.next_task_id("master").await.unwrap(), 6);
    }

    #[tokio::test]
    async fn subtask_count_reports_missing_task_as_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = TaskStore::new(dir.path());
        assert!(store.subtask_count("master", 1).await.is_err());
    }
}
