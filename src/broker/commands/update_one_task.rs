//! update-one-task command core.
//!
//! Delegates either a free-text append or a full-object update, selected by
//! the caller's `append` flag, which travels through untouched as part of
//! the original tool args the Tool Wrapper stores on the Pending Record.

use super::delegate;
use crate::broker::directive::{RequestParameters, Role, ServiceType};
use crate::broker::error::BrokerError;
use crate::broker::provider::LlmProvider;
use crate::broker::tool_channel::ToolContext;
use serde_json::Value as JsonValue;
use std::sync::Arc;

pub const ORIGINAL_COMMAND: &str = "update-one-task";

pub async fn run(
    args: JsonValue,
    ctx: ToolContext,
    provider: Arc<dyn LlmProvider>,
) -> Result<JsonValue, BrokerError> {
    let task_id = super::require_u64(&args, "id")?;
    let prompt = super::require_str(&args, "prompt")?;
    let append = args.get("append").and_then(|v| v.as_bool()).unwrap_or(false);
    let service_type = if append {
        ServiceType::GenerateText
    } else {
        ServiceType::GenerateObject
    };

    let params = RequestParameters {
        model_id: "agent-llm".to_string(),
        messages: vec![serde_json::json!({
            "role": "user",
            "content": format!("Update task {task_id} given: {prompt}"),
        })],
        max_tokens: None,
        temperature: None,
        schema: (!append).then(|| serde_json::json!({"type": "object"})),
        object_name: (!append).then(|| "Task".to_string()),
        hints: JsonValue::Null,
    };

    let hints = serde_json::json!({
        "tagInfo": { "tag": ctx.tag.clone().unwrap_or_else(|| "master".to_string()) },
    });

    delegate(&provider, ORIGINAL_COMMAND, Role::Main, service_type, params, hints).await
}
