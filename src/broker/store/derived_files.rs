//! Regeneration of the human-readable `task_<id>[_<tag>].txt` files that sit
//! alongside `tasks.json`.
//!
//! The exact prose format is this crate's own concern. What matters is that
//! regeneration happens under the same write serialization as the JSON
//! document and reflects the just-written task state.

use crate::broker::error::BrokerError;
use crate::broker::store::{paths, task_store::TaskStore};
use crate::broker::types::Task;
use std::fmt::Write as _;

fn render_task(task: &Task) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Task {}: {}", task.id, task.title);
    let _ = writeln!(out, "Status: {:?}", task.status);
    let _ = writeln!(out, "Priority: {}", task.priority);
    if !task.dependencies.is_empty() {
        let _ = writeln!(out, "Dependencies: {:?}", task.dependencies);
    }
    let _ = writeln!(out, "\n## Description\n{}", task.description);
    if !task.details.is_empty() {
        let _ = writeln!(out, "\n## Details\n{}", task.details);
    }
    if !task.subtasks.is_empty() {
        let _ = writeln!(out, "\n## Subtasks");
        for subtask in &task.subtasks {
            let _ = writeln!(
                out,
                "### {}.{} {} [{:?}]",
                task.id, subtask.id, subtask.title, subtask.status
            );
            if !subtask.details.is_empty() {
                let _ = writeln!(out, "{}", subtask.details);
            }
        }
    }
    out
}

/// Rewrite one derived file per task in `tasks`, under the store's write
/// lock (via [`TaskStore::write_research_doc`]'s sibling path helpers).
pub async fn regenerate(
    store: &TaskStore,
    tag: &str,
    default_tag: &str,
    tasks: &[Task],
) -> Result<(), BrokerError> {
    for task in tasks {
        let path = paths::derived_task_file(store.project_root(), task.id, tag, default_tag);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| BrokerError::Persistence(format!("failed to create {parent:?}: {e}")))?;
        }
        tokio::fs::write(&path, render_task(task))
            .await
            .map_err(|e| BrokerError::Persistence(format!("failed to write {path:?}: {e}")))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::types::TaskStatus;

    #[tokio::test]
    async fn regenerates_one_file_per_task() {
        let dir = tempfile::tempdir().unwrap();
        let store = TaskStore::new(dir.path());
        let tasks = vec![Task {
            id: 1,
            title: "A".to_string(),
            description: "desc".to_string(),
            details: String::new(),
            status: TaskStatus::Pending,
            priority: "high".to_string(),
            dependencies: vec![],
            subtasks: vec![],
        }];
        regenerate(&store, "master", "master", &tasks).await.unwrap();
        let path = paths::derived_task_file(dir.path(), 1, "master", "master");
        assert!(path.exists());
    }
}
