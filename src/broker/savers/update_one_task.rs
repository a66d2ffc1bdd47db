//! update-one-task → task update saver.
//!
//! Two modes, selected by the original call's `append` flag:
//! - **append mode**: the agent payload is opaque text, appended to the
//!   task's details as a timestamped block.
//! - **replace mode**: the agent payload is a full task object, merged into
//!   the existing task under completed-item protection.
//!
//! A completed parent task is never mutated in either mode.

use super::completed_item_protection;
use super::SaverInput;
use crate::broker::error::BrokerError;
use crate::broker::store::derived_files;
use crate::broker::types::Task;
use chrono::Utc;
use serde_json::Value as JsonValue;

pub async fn save(input: SaverInput) -> Result<(), BrokerError> {
    let task_id = extract_task_id(&input.original_tool_args)?;
    let append_mode = input
        .original_tool_args
        .get("append")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    let tag = input.tag();
    let mut warnings = Vec::new();

    if append_mode {
        let text = input
            .resolved
            .main_result
            .as_str()
            .ok_or_else(|| BrokerError::PayloadShape("append payload must be text".to_string()))?
            .to_string();
        let block = format_timestamped_block(&text);
        let collection = input
            .store
            .mutate_tag(&tag, move |slot| {
                let task = slot
                    .tasks
                    .iter_mut()
                    .find(|t| t.id == task_id)
                    .ok_or_else(|| BrokerError::PayloadShape(format!("task {task_id} not found")))?;
                if task.status.is_completed() {
                    warnings.push(format!(
                        "task {task_id} is completed; appended note was discarded"
                    ));
                    return Ok(());
                }
                if !task.details.is_empty() {
                    task.details.push('\n');
                }
                task.details.push_str(&block);
                Ok(())
            })
            .await?;
        for warning in warnings {
            input.warn(&warning);
        }
        let tasks = collection.tasks.clone();
        return derived_files::regenerate(&input.store, &tag, &input.default_tag, &tasks).await;
    }

    let proposed: Task = serde_json::from_value(input.resolved.main_result.clone())
        .map_err(|e| BrokerError::PayloadShape(format!("malformed task object: {e}")))?;
    let mut warnings = Vec::new();
    let collection = input
        .store
        .mutate_tag(&tag, move |slot| {
            let position = slot.tasks.iter().position(|t| t.id == task_id);
            let mut proposed = proposed;
            proposed.id = task_id;
            let merged = match position {
                Some(idx) => {
                    let existing = slot.tasks[idx].clone();
                    let merged = completed_item_protection::merge_task(
                        Some(&existing),
                        proposed,
                        &mut |w| warnings.push(w),
                    );
                    slot.tasks[idx] = merged.clone();
                    merged
                }
                None => {
                    slot.tasks.push(proposed.clone());
                    proposed
                }
            };
            let _ = merged;
            Ok(())
        })
        .await?;
    for warning in warnings {
        input.warn(&warning);
    }
    let tasks = collection.tasks.clone();
    derived_files::regenerate(&input.store, &tag, &input.default_tag, &tasks).await
}

fn format_timestamped_block(text: &str) -> String {
    format!("--- {} ---\n{text}", Utc::now().to_rfc3339())
}

fn extract_task_id(original_args: &JsonValue) -> Result<u32, BrokerError> {
    original_args
        .get("id")
        .and_then(|v| v.as_u64())
        .map(|v| v as u32)
        .ok_or_else(|| BrokerError::PayloadShape("original args missing task id".to_string()))
}
