//! add-task → new-task saver.
//!
//! Composes a new task from the Agent's fields plus the `newTaskId`,
//! `userDependencies`, `userPriority` hints carried on the directive, and
//! refuses outright when a task with that id already exists.

use super::SaverInput;
use crate::broker::error::BrokerError;
use crate::broker::store::derived_files;
use crate::broker::types::{Task, TaskStatus};
use serde::Deserialize;
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Deserialize)]
struct NewTaskPayload {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    details: String,
}

pub async fn save(input: SaverInput) -> Result<(), BrokerError> {
    let payload: NewTaskPayload = serde_json::from_value(input.resolved.main_result.clone())
        .map_err(|e| BrokerError::PayloadShape(format!("malformed new task payload: {e}")))?;

    let new_task_id = input
        .directive
        .request_parameters
        .hint("newTaskId")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| BrokerError::PayloadShape("directive missing newTaskId hint".to_string()))?
        as u32;
    let dependencies = input
        .directive
        .request_parameters
        .hint("userDependencies")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    let priority = input
        .directive
        .request_parameters
        .hint("userPriority")
        .and_then(|v| v.as_str())
        .unwrap_or("medium")
        .to_string();

    let task = Task {
        id: new_task_id,
        title: payload.title,
        description: payload.description,
        details: payload.details,
        status: TaskStatus::Pending,
        priority,
        dependencies,
        subtasks: vec![],
    };

    let tag = input.tag();
    let collection = input
        .store
        .mutate_tag(&tag, move |slot| {
            if slot.tasks.iter().any(|t| t.id == new_task_id) {
                return Err(BrokerError::PayloadShape(format!(
                    "task id {new_task_id} already exists; add-task refused"
                )));
            }
            slot.tasks.push(task);
            Ok(())
        })
        .await?;

    let tasks = collection.tasks.clone();
    derived_files::regenerate(&input.store, &tag, &input.default_tag, &tasks).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_minimal_payload() {
        let value = serde_json::json!({"title": "New task"});
        let payload: NewTaskPayload = serde_json::from_value(value).unwrap();
        assert_eq!(payload.title, "New task");
    }
}
