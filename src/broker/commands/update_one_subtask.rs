//! update-one-subtask command core.
//!
//! Always delegates a `generate_text` call; the Agent's free-text reply is
//! wrapped into a timestamped block by the matching saver.

use super::delegate;
use crate::broker::directive::{RequestParameters, Role, ServiceType};
use crate::broker::error::BrokerError;
use crate::broker::provider::LlmProvider;
use crate::broker::tool_channel::ToolContext;
use serde_json::Value as JsonValue;
use std::sync::Arc;

pub const ORIGINAL_COMMAND: &str = "update-one-subtask";

pub async fn run(
    args: JsonValue,
    ctx: ToolContext,
    provider: Arc<dyn LlmProvider>,
) -> Result<JsonValue, BrokerError> {
    let subtask_id = super::require_str(&args, "id")?;
    let prompt = super::require_str(&args, "prompt")?;

    let params = RequestParameters {
        model_id: "agent-llm".to_string(),
        messages: vec![serde_json::json!({
            "role": "user",
            "content": format!("Append a note to subtask {subtask_id} given: {prompt}"),
        })],
        max_tokens: None,
        temperature: None,
        schema: None,
        object_name: None,
        hints: JsonValue::Null,
    };

    let hints = serde_json::json!({
        "tagInfo": { "tag": ctx.tag.clone().unwrap_or_else(|| "master".to_string()) },
    });

    delegate(
        &provider,
        ORIGINAL_COMMAND,
        Role::Main,
        ServiceType::GenerateText,
        params,
        hints,
    )
    .await
}
