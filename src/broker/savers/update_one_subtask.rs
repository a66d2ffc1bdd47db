//! update-one-subtask → subtask detail saver.
//!
//! The agent payload is plain text: wrapped in a timestamped delimited
//! block and appended to the subtask's details. When the original user
//! prompt was short, a dated marker is also appended to the description
//! (a short prompt usually means "just note this," which is easy to miss
//! buried in a long details block). A completed subtask is never modified.

use super::completed_item_protection;
use super::SaverInput;
use crate::broker::error::BrokerError;
use crate::broker::store::derived_files;
use chrono::Utc;
use serde_json::Value as JsonValue;

/// Prompts shorter than this are treated as quick notes, not full updates.
const SHORT_PROMPT_THRESHOLD: usize = 60;

pub async fn save(input: SaverInput) -> Result<(), BrokerError> {
    let (task_id, subtask_id) = extract_ids(&input.original_tool_args)?;
    let text = input
        .resolved
        .main_result
        .as_str()
        .ok_or_else(|| BrokerError::PayloadShape("subtask update payload must be text".to_string()))?
        .to_string();
    let prompt_is_short = input
        .original_tool_args
        .get("prompt")
        .and_then(|v| v.as_str())
        .map(|p| p.len() < SHORT_PROMPT_THRESHOLD)
        .unwrap_or(false);

    let block = format!("--- {} ---\n{text}", Utc::now().to_rfc3339());
    let marker = format!("[Updated: {}]", Utc::now().format("%Y-%m-%d"));

    let tag = input.tag();
    let mut warnings = Vec::new();
    let collection = input
        .store
        .mutate_tag(&tag, move |slot| {
            let task = slot
                .tasks
                .iter_mut()
                .find(|t| t.id == task_id)
                .ok_or_else(|| BrokerError::PayloadShape(format!("task {task_id} not found")))?;
            let subtask_idx = task
                .subtasks
                .iter()
                .position(|s| s.id == subtask_id)
                .ok_or_else(|| {
                    BrokerError::PayloadShape(format!("subtask {task_id}.{subtask_id} not found"))
                })?;
            let mut proposed = task.subtasks[subtask_idx].clone();
            if !proposed.details.is_empty() {
                proposed.details.push('\n');
            }
            proposed.details.push_str(&block);
            if prompt_is_short {
                proposed.description.push(' ');
                proposed.description.push_str(&marker);
            }
            let existing = task.subtasks[subtask_idx].clone();
            let merged = completed_item_protection::merge_subtask(
                Some(&existing),
                proposed,
                &mut |w| warnings.push(w),
            );
            task.subtasks[subtask_idx] = merged;
            Ok(())
        })
        .await?;
    for warning in warnings {
        input.warn(&warning);
    }
    let tasks = collection.tasks.clone();
    derived_files::regenerate(&input.store, &tag, &input.default_tag, &tasks).await
}

fn extract_ids(original_args: &JsonValue) -> Result<(u32, u32), BrokerError> {
    let raw = original_args
        .get("id")
        .and_then(|v| v.as_str().map(str::to_string).or_else(|| v.as_f64().map(|n| n.to_string())))
        .ok_or_else(|| BrokerError::PayloadShape("original args missing subtask id".to_string()))?;
    let mut parts = raw.splitn(2, '.');
    let task_id: u32 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(|| BrokerError::PayloadShape(format!("malformed subtask id {raw}")))?;
    let subtask_id: u32 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(|| BrokerError::PayloadShape(format!("malformed subtask id {raw}")))?;
    Ok((task_id, subtask_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dotted_subtask_id() {
        let args = serde_json::json!({"id": "7.3"});
        assert_eq!(extract_ids(&args).unwrap(), (7, 3));
    }

    #[test]
    fn rejects_non_dotted_id() {
        let args = serde_json::json!({"id": "7"});
        assert!(extract_ids(&args).is_err());
    }
}
