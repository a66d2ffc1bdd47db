//! add-task command core.
//!
//! Delegates a `generate_object` call asking the Agent to draft one new
//! task, carrying `newTaskId`, `userDependencies`, and `userPriority` as
//! hints so the saver can compose the final task without asking the Agent
//! to know anything about id allocation.

use super::delegate;
use crate::broker::directive::{RequestParameters, Role, ServiceType};
use crate::broker::error::BrokerError;
use crate::broker::provider::LlmProvider;
use crate::broker::tool_channel::ToolContext;
use serde_json::Value as JsonValue;
use std::sync::Arc;

pub const ORIGINAL_COMMAND: &str = "add-task";

pub async fn run(
    args: JsonValue,
    ctx: ToolContext,
    provider: Arc<dyn LlmProvider>,
    new_task_id: u32,
) -> Result<JsonValue, BrokerError> {
    let prompt = super::require_str(&args, "prompt")?;
    let dependencies = args
        .get("dependencies")
        .cloned()
        .unwrap_or_else(|| serde_json::json!([]));
    let priority = args
        .get("priority")
        .and_then(|v| v.as_str())
        .unwrap_or("medium")
        .to_string();

    let params = RequestParameters {
        model_id: "agent-llm".to_string(),
        messages: vec![serde_json::json!({
            "role": "user",
            "content": format!("Draft a new task given: {prompt}"),
        })],
        max_tokens: None,
        temperature: None,
        schema: Some(serde_json::json!({"type": "object"})),
        object_name: Some("Task".to_string()),
        hints: JsonValue::Null,
    };

    let hints = serde_json::json!({
        "newTaskId": new_task_id,
        "userDependencies": dependencies,
        "userPriority": priority,
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
