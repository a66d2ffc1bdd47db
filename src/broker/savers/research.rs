//! research → research saver.
//!
//! Optionally writes the result to a Markdown document under the research
//! docs directory (filename derived from date + slugified query) and
//! optionally appends it as a timestamped block to a target task or
//! subtask. A parent-completed target is skipped with a warning rather than
//! failing the whole save.

use super::SaverInput;
use crate::broker::error::BrokerError;
use crate::broker::store::derived_files;
use crate::broker::store::paths;
use chrono::Utc;
use serde_json::Value as JsonValue;

pub async fn save(input: SaverInput) -> Result<(), BrokerError> {
    let text = extract_text(&input.resolved.main_result)?;
    let query = input
        .original_tool_args
        .get("query")
        .and_then(|v| v.as_str())
        .unwrap_or("research")
        .to_string();

    let save_to_file = input
        .original_tool_args
        .get("saveToFile")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    if save_to_file {
        let date = Utc::now().format("%Y-%m-%d").to_string();
        let slug = slugify_research_filename(&query);
        let file_name = paths::research_doc_file(std::path::Path::new(""), &date, &slug)
            .file_name()
            .expect("research doc path always has a file name")
            .to_string_lossy()
            .into_owned();
        let contents = format!("# {query}\n\n{text}\n");
        input.store.write_research_doc(&file_name, &contents).await?;
    }

    if let Some(target) = input.original_tool_args.get("saveTo").and_then(|v| v.as_str()) {
        let (task_id, subtask_id) = parse_target(target)?;
        let tag = input.tag();
        let block = format!("--- research {} ---\n{text}", Utc::now().to_rfc3339());
        let mut warnings = Vec::new();
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
                        "task {task_id} is completed; research note was not attached"
                    ));
                    return Ok(());
                }
                match subtask_id {
                    Some(sub_id) => {
                        let subtask = task
                            .subtasks
                            .iter_mut()
                            .find(|s| s.id == sub_id)
                            .ok_or_else(|| {
                                BrokerError::PayloadShape(format!("subtask {task_id}.{sub_id} not found"))
                            })?;
                        if subtask.status.is_completed() {
                            warnings.push(format!(
                                "subtask {task_id}.{sub_id} is completed; research note was not attached"
                            ));
                            return Ok(());
                        }
                        if !subtask.details.is_empty() {
                            subtask.details.push('\n');
                        }
                        subtask.details.push_str(&block);
                    }
                    None => {
                        if !task.details.is_empty() {
                            task.details.push('\n');
                        }
                        task.details.push_str(&block);
                    }
                }
                Ok(())
            })
            .await?;
        for warning in warnings {
            input.warn(&warning);
        }
        let tasks = collection.tasks.clone();
        derived_files::regenerate(&input.store, &tag, &input.default_tag, &tasks).await?;
    }

    Ok(())
}

fn extract_text(value: &JsonValue) -> Result<String, BrokerError> {
    if let Some(text) = value.as_str() {
        return Ok(text.to_string());
    }
    value
        .get("result")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| BrokerError::PayloadShape("research payload must be text or {result}".to_string()))
}

fn parse_target(target: &str) -> Result<(u32, Option<u32>), BrokerError> {
    let mut parts = target.splitn(2, '.');
    let task_id: u32 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(|| BrokerError::PayloadShape(format!("malformed saveTo target {target}")))?;
    let subtask_id = parts.next().and_then(|p| p.parse().ok());
    Ok((task_id, subtask_id))
}

/// Deterministic slug for a research query, independently testable per
/// the invariant (identical `(query, date)` must yield the same
/// filename and, given identical output text, byte-identical content).
pub fn slugify_research_filename(query: &str) -> String {
    let mut slug = String::new();
    let mut last_was_dash = false;
    for ch in query.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            last_was_dash = false;
        } else if !last_was_dash && !slug.is_empty() {
            slug.push('-');
            last_was_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("research");
    }
    slug.truncate(80);
    slug
}
