//! Detection of the delegation signal a command core returns in place of an
//! LLM completion.
//!
//! Two equivalent shapes exist:
//! - a plain object carrying `needsAgentDelegation: true` and a
//!   `pendingInteraction` object;
//! - an embedded resource whose URI is the sentinel
//!   [`PENDING_INTERACTION_URI`] and whose body parses to
//!   `{ isAgentLLMPendingInteraction: true, details: { ... } }`.
//!
//! One canonical emission, many acceptable readings: the broker only ever
//! *emits* the plain-object shape; the resource shape is accepted on read
//! for compatibility with command cores that prefer an embedded-resource
//! envelope (uri + mime type + body) over a bare field pair.

use crate::broker::directive::DelegationDirective;
use serde::Deserialize;
use serde_json::Value as JsonValue;

/// Sentinel URI identifying an embedded pending-interaction resource.
pub const PENDING_INTERACTION_URI: &str = "agent-llm://pending-interaction";

#[derive(Debug, Clone, Deserialize)]
struct PendingInteractionWrapper {
    #[serde(rename = "needsAgentDelegation")]
    needs_agent_delegation: bool,
    #[serde(rename = "pendingInteraction")]
    pending_interaction: PendingInteractionBody,
}

#[derive(Debug, Clone, Deserialize)]
struct PendingInteractionBody {
    #[serde(rename = "interactionId")]
    interaction_id: String,
    #[serde(rename = "delegatedCallDetails")]
    delegated_call_details: JsonValue,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddedResourceEnvelope {
    uri: String,
    #[serde(default)]
    body: Option<JsonValue>,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddedResourceBody {
    #[serde(rename = "isAgentLLMPendingInteraction")]
    is_pending: bool,
    details: PendingInteractionBody,
}

/// A detected, normalized delegation signal: the interaction id plus the
/// directive the command core asked the Agent to run.
#[derive(Debug, Clone)]
pub struct DelegationSignal {
    pub interaction_id: String,
    pub directive: DelegationDirective,
}

impl DelegationSignal {
    /// Inspect a tool's return value for either delegation-signal shape.
    /// Returns `None` when the value is an ordinary completion.
    pub fn detect(value: &JsonValue) -> Option<DelegationSignal> {
        Self::detect_plain_object(value).or_else(|| Self::detect_embedded_resource(value))
    }

    fn detect_plain_object(value: &JsonValue) -> Option<DelegationSignal> {
        let wrapper: PendingInteractionWrapper = serde_json::from_value(value.clone()).ok()?;
        if !wrapper.needs_agent_delegation {
            return None;
        }
        Self::from_body(wrapper.pending_interaction)
    }

    fn detect_embedded_resource(value: &JsonValue) -> Option<DelegationSignal> {
        let envelope: EmbeddedResourceEnvelope = serde_json::from_value(value.clone()).ok()?;
        if envelope.uri != PENDING_INTERACTION_URI {
            return None;
        }
        let body = envelope.body?;
        let body: EmbeddedResourceBody = serde_json::from_value(body).ok()?;
        if !body.is_pending {
            return None;
        }
        Self::from_body(body.details)
    }

    fn from_body(body: PendingInteractionBody) -> Option<DelegationSignal> {
        let directive: DelegationDirective =
            serde_json::from_value(body.delegated_call_details).ok()?;
        Some(DelegationSignal {
            interaction_id: body.interaction_id,
            directive,
        })
    }

    /// Build the canonical plain-object emission shape the broker's own
    /// command cores use.
    pub fn to_plain_object(&self) -> JsonValue {
        serde_json::json!({
            "needsAgentDelegation": true,
            "pendingInteraction": {
                "type": "agent_llm",
                "interactionId": self.interaction_id,
                "delegatedCallDetails": self.directive,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::directive::{RequestParameters, Role, ServiceType};

    fn sample_directive() -> DelegationDirective {
        DelegationDirective {
            interaction_id: "I1".to_string(),
            original_command: "parse-prd".to_string(),
            role: Role::Main,
            service_type: ServiceType::GenerateObject,
            request_parameters: RequestParameters {
                model_id: "gpt".to_string(),
                messages: vec![],
                max_tokens: None,
                temperature: None,
                schema: None,
                object_name: None,
                hints: JsonValue::Null,
            },
        }
    }

    #[test]
    fn detects_plain_object_shape() {
        let signal = DelegationSignal {
            interaction_id: "I1".to_string(),
            directive: sample_directive(),
        };
        let value = signal.to_plain_object();
        let detected = DelegationSignal::detect(&value).expect("should detect");
        assert_eq!(detected.interaction_id, "I1");
    }

    #[test]
    fn detects_embedded_resource_shape() {
        let directive = sample_directive();
        let value = serde_json::json!({
            "uri": PENDING_INTERACTION_URI,
            "body": {
                "isAgentLLMPendingInteraction": true,
                "details": {
                    "interactionId": "I1",
                    "delegatedCallDetails": directive,
                }
            }
        });
        let detected = DelegationSignal::detect(&value).expect("should detect");
        assert_eq!(detected.interaction_id, "I1");
    }

    #[test]
    fn ordinary_completion_is_not_a_signal() {
        let value = serde_json::json!({ "tasks": [] });
        assert!(DelegationSignal::detect(&value).is_none());
    }
}
