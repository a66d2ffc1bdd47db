//! analyze-complexity → report saver.
//!
//! Parses the agent payload into an array of analysis items. When the
//! original call targeted specific ids (an `ids` array in the original
//! args), the new items are merged into the existing report by task id;
//! otherwise the whole report is overwritten. Either way a fresh `meta`
//! block is synthesized from the original args and the just-analyzed count.

use super::SaverInput;
use crate::broker::error::BrokerError;
use crate::broker::types::{ComplexityReport, ComplexityReportItem, ComplexityReportMeta};
use chrono::Utc;
use serde_json::Value as JsonValue;

pub async fn save(input: SaverInput) -> Result<(), BrokerError> {
    let new_items = parse_payload(&input.resolved.main_result)?;
    let targeted_ids = extract_targeted_ids(&input.original_tool_args);
    let threshold = input
        .original_tool_args
        .get("threshold")
        .and_then(|v| v.as_f64())
        .map(|v| v as f32);

    let merged_items = if targeted_ids.is_empty() {
        new_items.clone()
    } else {
        let existing = input.store.read_complexity_report().await?;
        let mut items = existing.map(|r| r.complexity_analysis).unwrap_or_default();
        items.retain(|item| !new_items.iter().any(|n| n.task_id == item.task_id));
        items.extend(new_items.clone());
        items
    };

    let report = ComplexityReport {
        meta: ComplexityReportMeta {
            generated_at: Utc::now(),
            analyzed_count: new_items.len(),
            threshold,
        },
        complexity_analysis: merged_items,
    };
    input.store.write_complexity_report(&report).await
}

fn extract_targeted_ids(original_args: &JsonValue) -> Vec<u64> {
    original_args
        .get("ids")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_u64()).collect())
        .unwrap_or_default()
}

fn parse_payload(value: &JsonValue) -> Result<Vec<ComplexityReportItem>, BrokerError> {
    let array = value
        .as_array()
        .cloned()
        .or_else(|| value.get("complexityAnalysis").and_then(|v| v.as_array()).cloned())
        .ok_or_else(|| BrokerError::PayloadShape("expected an array of analysis items".to_string()))?;
    array
        .into_iter()
        .map(|item| {
            serde_json::from_value(item)
                .map_err(|e| BrokerError::PayloadShape(format!("malformed analysis item: {e}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_ids_means_no_targeting() {
        let args = serde_json::json!({});
        assert!(extract_targeted_ids(&args).is_empty());
    }

    #[test]
    fn ids_array_is_extracted() {
        let args = serde_json::json!({"ids": [1, 2, 3]});
        assert_eq!(extract_targeted_ids(&args), vec![1, 2, 3]);
    }
}
