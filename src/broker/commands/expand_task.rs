//! expand-task command core.
//!
//! Delegates a `generate_object` call asking for N new subtasks, carrying
//! `nextSubtaskId` and `numSubtasksForAgent` as hints so the saver can
//! number the Agent's subtasks correctly on resumption.

use super::delegate;
use crate::broker::directive::{RequestParameters, Role, ServiceType};
use crate::broker::error::BrokerError;
use crate::broker::provider::LlmProvider;
use crate::broker::tool_channel::ToolContext;
use serde_json::Value as JsonValue;
use std::sync::Arc;

pub const ORIGINAL_COMMAND: &str = "expand-task";

pub async fn run(
    args: JsonValue,
    ctx: ToolContext,
    provider: Arc<dyn LlmProvider>,
    existing_subtask_count: u32,
) -> Result<JsonValue, BrokerError> {
    let task_id = super::require_u64(&args, "id")?;
    let num_requested = args.get("num").and_then(|v| v.as_u64()).unwrap_or(3);
    let next_subtask_id = existing_subtask_count + 1;

    let params = RequestParameters {
        model_id: "agent-llm".to_string(),
        messages: vec![serde_json::json!({
            "role": "user",
            "content": format!("Expand task {task_id} into {num_requested} new subtasks."),
        })],
        max_tokens: None,
        temperature: None,
        schema: Some(serde_json::json!({"type": "array"})),
        object_name: Some("Subtasks".to_string()),
        hints: JsonValue::Null,
    };

    let hints = serde_json::json!({
        "nextSubtaskId": next_subtask_id,
        "numSubtasksForAgent": num_requested,
        "tagInfo": { "tag": ctx.tag.clone().unwrap_or_else(|| "master".to_string()) },
    });

    delegate(
        &provider,
        ORIGINAL_COMMAND,
        Role::Main,
        ServiceType::GenerateObject,
        params,
        hints,
    )
    .await
}
