//! analyze-complexity command core.
//!
//! Delegates a `generate_object` call asking for a complexity score per
//! targeted task, carrying the original `threshold`/`ids` filters as hints
//! so the saver can decide whether to merge or overwrite the report.

use super::delegate;
use crate::broker::directive::{RequestParameters, Role, ServiceType};
use crate::broker::error::BrokerError;
use crate::broker::provider::LlmProvider;
use crate::broker::tool_channel::ToolContext;
use serde_json::Value as JsonValue;
use std::sync::Arc;

pub const ORIGINAL_COMMAND: &str = "analyze-complexity";

pub async fn run(
    args: JsonValue,
    _ctx: ToolContext,
    provider: Arc<dyn LlmProvider>,
) -> Result<JsonValue, BrokerError> {
    let ids = args.get("ids").cloned();
    let threshold = args.get("threshold").cloned();

    let params = RequestParameters {
        model_id: "agent-llm".to_string(),
        messages: vec![serde_json::json!({
            "role": "user",
            "content": "Analyze task complexity and recommend a subtask count for each targeted task.",
        })],
        max_tokens: None,
        temperature: None,
        schema: Some(serde_json::json!({"type": "array"})),
        object_name: Some("ComplexityAnalysis".to_string()),
        hints: JsonValue::Null,
    };

    let mut hints = serde_json::json!({});
    if let Some(ids) = ids {
        hints["ids"] = ids;
    }
    if let Some(threshold) = threshold {
        hints["threshold"] = threshold;
    }

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
