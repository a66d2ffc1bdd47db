//! parse-requirements command core.
//!
//! Reads a PRD file path and a target task count from the original args and
//! delegates a `generate_object` call that asks the Agent to produce a
//! `{ tasks, metadata }` document.

use super::delegate;
use crate::broker::directive::{RequestParameters, Role, ServiceType};
use crate::broker::error::BrokerError;
use crate::broker::provider::LlmProvider;
use crate::broker::tool_channel::ToolContext;
use serde_json::Value as JsonValue;
use std::sync::Arc;

pub const ORIGINAL_COMMAND: &str = "parse-prd";

pub async fn run(
    args: JsonValue,
    ctx: ToolContext,
    provider: Arc<dyn LlmProvider>,
) -> Result<JsonValue, BrokerError> {
    let input_path = super::require_str(&args, "input")?;
    let num_tasks = args.get("numTasks").and_then(|v| v.as_u64()).unwrap_or(10);

    let params = RequestParameters {
        model_id: "agent-llm".to_string(),
        messages: vec![serde_json::json!({
            "role": "user",
            "content": format!(
                "Parse the requirements document at {input_path} (project root {:?}) into {num_tasks} tasks.",
                ctx.project_root
            ),
        })],
        max_tokens: None,
        temperature: None,
        schema: Some(serde_json::json!({
            "type": "object",
            "required": ["tasks", "metadata"],
        })),
        object_name: Some("TaskCollection".to_string()),
        hints: JsonValue::Null,
    };

    let hints = serde_json::json!({ "numTasks": num_tasks, "tagInfo": { "tag": ctx.tag.clone().unwrap_or_else(|| "master".to_string()) } });

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
