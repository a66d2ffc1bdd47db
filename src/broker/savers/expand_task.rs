//! expand-task → subtasks saver.
//!
//! Parses the Agent's payload into an ordered list of new subtasks, numbers
//! them starting at the `nextSubtaskId` hint carried on the directive,
//! appends them to the parent task's existing subtasks, and regenerates
//! derived files.
//! Any clearing of old subtasks triggered by a `force` flag already
//! happened before delegation — this saver only ever appends.

use super::SaverInput;
use crate::broker::error::BrokerError;
use crate::broker::store::derived_files;
use crate::broker::types::{Subtask, TaskStatus};
use serde::Deserialize;
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Deserialize)]
struct SubtaskPayload {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    details: String,
    #[serde(default)]
    status: Option<TaskStatus>,
    #[serde(default)]
    dependencies: Vec<JsonValue>,
}

pub async fn save(input: SaverInput) -> Result<(), BrokerError> {
    let task_id = extract_task_id(&input.original_tool_args)?;
    let next_subtask_id = input
        .directive
        .request_parameters
        .hint("nextSubtaskId")
        .and_then(|v| v.as_u64())
        .unwrap_or(1) as u32;
    let payloads = parse_subtasks_payload(&input.resolved.main_result)?;

    let new_subtasks: Vec<Subtask> = payloads
        .into_iter()
        .enumerate()
        .map(|(offset, payload)| Subtask {
            id: next_subtask_id + offset as u32,
            title: payload.title,
            description: payload.description,
            details: payload.details,
            status: payload.status.unwrap_or(TaskStatus::Pending),
            dependencies: payload.dependencies,
        })
        .collect();

    let tag = input.tag();
    let mut protection_warning = None;
    let appended = new_subtasks.clone();
    let collection = input
        .store
        .mutate_tag(&tag, move |slot| {
            let task = slot
                .tasks
                .iter_mut()
                .find(|t| t.id == task_id)
                .ok_or_else(|| BrokerError::PayloadShape(format!("task {task_id} not found")))?;
            if task.status.is_completed() {
                protection_warning = Some(format!(
                    "task {task_id} is completed; new subtasks were not appended"
                ));
                return Ok(());
            }
            task.subtasks.extend(appended);
            Ok(())
        })
        .await?;

    if let Some(message) = protection_warning {
        input.warn(&message);
    }

    let tasks = collection.tasks.clone();
    derived_files::regenerate(&input.store, &tag, &input.default_tag, &tasks).await
}

fn extract_task_id(original_args: &JsonValue) -> Result<u32, BrokerError> {
    original_args
        .get("id")
        .and_then(|v| v.as_u64())
        .map(|v| v as u32)
        .ok_or_else(|| BrokerError::PayloadShape("original args missing task id".to_string()))
}

fn parse_subtasks_payload(value: &JsonValue) -> Result<Vec<SubtaskPayload>, BrokerError> {
    let array = if let Some(array) = value.as_array() {
        array.clone()
    } else if let Some(array) = value.get("subtasks").and_then(|v| v.as_array()) {
        array.clone()
    } else {
        return Err(BrokerError::PayloadShape(
            "expected an array of subtasks or {subtasks: [...]}".to_string(),
        ));
    };
    array
        .into_iter()
        .map(|item| {
            serde_json::from_value(item)
                .map_err(|e| BrokerError::PayloadShape(format!("malformed subtask: {e}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_start_at_next_subtask_id() {
        let value = serde_json::json!([
            {"title": "a"},
            {"title": "b"},
            {"title": "c"},
        ]);
        let payloads = parse_subtasks_payload(&value).unwrap();
        assert_eq!(payloads.len(), 3);
    }

    #[test]
    fn missing_task_id_is_a_payload_shape_error() {
        let args = serde_json::json!({});
        assert!(extract_task_id(&args).is_err());
    }
}
