//! update-many-tasks command core.
//!
//! Delegates a `generate_object` call asking for an array of updated task
//! objects covering the ids/ranges the caller named.

use super::delegate;
use crate::broker::directive::{RequestParameters, Role, ServiceType};
use crate::broker::error::BrokerError;
use crate::broker::provider::LlmProvider;
use crate::broker::tool_channel::ToolContext;
use serde_json::Value as JsonValue;
use std::sync::Arc;

pub const ORIGINAL_COMMAND: &str = "update-many-tasks";

pub async fn run(
    args: JsonValue,
    ctx: ToolContext,
    provider: Arc<dyn LlmProvider>,
) -> Result<JsonValue, BrokerError> {
    let prompt = super::require_str(&args, "prompt")?;
    let ids = args
        .get("ids")
        .cloned()
        .unwrap_or_else(|| serde_json::json!([]));

    let params = RequestParameters {
        model_id: "agent-llm".to_string(),
        messages: vec![serde_json::json!({
            "role": "user",
            "content": format!("Update tasks {ids} given: {prompt}"),
        })],
        max_tokens: None,
        temperature: None,
        schema: Some(serde_json::json!({"type": "array"})),
        object_name: Some("Tasks".to_string()),
        hints: JsonValue::Null,
    };

    let hints = serde_json::json!({
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
