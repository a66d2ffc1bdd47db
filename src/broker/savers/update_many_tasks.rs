//! update-many-tasks → bulk update saver.
//!
//! Parses the agent payload into an array of task objects and applies the
//! single-task completed-item-protection invariant to each. Ids absent from
//! the store are reported via a warning but do not abort the rest of the
//! batch.

use super::completed_item_protection;
use super::SaverInput;
use crate::broker::error::BrokerError;
use crate::broker::store::derived_files;
use crate::broker::types::Task;
use serde_json::Value as JsonValue;

pub async fn save(input: SaverInput) -> Result<(), BrokerError> {
    let proposed_tasks = parse_payload(&input.resolved.main_result)?;
    let tag = input.tag();
    let mut warnings = Vec::new();
    let collection = input
        .store
        .mutate_tag(&tag, move |slot| {
            for proposed in proposed_tasks {
                let position = slot.tasks.iter().position(|t| t.id == proposed.id);
                match position {
                    Some(idx) => {
                        let existing = slot.tasks[idx].clone();
                        let merged = completed_item_protection::merge_task(
                            Some(&existing),
                            proposed,
                            &mut |w| warnings.push(w),
                        );
                        slot.tasks[idx] = merged;
                    }
                    None => {
                        warnings.push(format!(
                            "task {} not found in tag; skipped in bulk update",
                            proposed.id
                        ));
                    }
                }
            }
            Ok(())
        })
        .await?;
    for warning in warnings {
        input.warn(&warning);
    }
    let tasks = collection.tasks.clone();
    derived_files::regenerate(&input.store, &tag, &input.default_tag, &tasks).await
}

fn parse_payload(value: &JsonValue) -> Result<Vec<Task>, BrokerError> {
    let array = value
        .as_array()
        .cloned()
        .ok_or_else(|| BrokerError::PayloadShape("expected an array of tasks".to_string()))?;
    array
        .into_iter()
        .map(|item| {
            serde_json::from_value(item)
                .map_err(|e| BrokerError::PayloadShape(format!("malformed task in batch: {e}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_array_payload() {
        let value = serde_json::json!({"id": 1});
        assert!(parse_payload(&value).is_err());
    }
}
