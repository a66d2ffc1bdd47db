//! research command core.
//!
//! Delegates a `generate_text` call for the research query under the
//! `research` role. `saveToFile`/`saveTo` travel through the original tool
//! args unchanged — the saver reads them directly rather than through a hint,
//! since they describe what to do with the result, not what the Agent
//! needs to produce it.

use super::delegate;
use crate::broker::directive::{RequestParameters, Role, ServiceType};
use crate::broker::error::BrokerError;
use crate::broker::provider::LlmProvider;
use crate::broker::tool_channel::ToolContext;
use serde_json::Value as JsonValue;
use std::sync::Arc;

pub const ORIGINAL_COMMAND: &str = "research";

pub async fn run(
    args: JsonValue,
    ctx: ToolContext,
    provider: Arc<dyn LlmProvider>,
) -> Result<JsonValue, BrokerError> {
    let query = super::require_str(&args, "query")?;

    let params = RequestParameters {
        model_id: "agent-llm".to_string(),
        messages: vec![serde_json::json!({
            "role": "user",
            "content": query,
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
        Role::Research,
        ServiceType::GenerateText,
        params,
        hints,
    )
    .await
}
