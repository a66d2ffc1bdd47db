//! The Broker Tool: a single bidirectional tool accepting a
//! discriminated-union payload. This module only validates the payload and
//! shapes the two response forms — it never touches the Interaction
//! Registry, which stays the Tool Wrapper's responsibility.
//!
//! [`BrokerToolResponse`] is always built through one of its named
//! constructors (`success`/`failure`/`with_metadata`), never a raw struct
//! literal at the call site.

use crate::broker::directive::{
    CompletionStatus, DelegationDirective, RequestParameters, Role, ServiceType,
};
use crate::broker::error::BrokerError;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Host→Agent half of the discriminated payload: present when a command
/// core delegated an LLM call.
#[derive(Debug, Clone, Deserialize)]
pub struct DelegatedCallDetailsArgs {
    pub original_command: String,
    pub role: Role,
    pub service_type: ServiceType,
    pub request_parameters: RequestParameters,
}

/// Agent→Host half of the discriminated payload: present when the Agent is
/// delivering the result of a previously delegated call.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentLlmResponseArgs {
    pub status: CompletionStatus,
    #[serde(default)]
    pub data: Option<JsonValue>,
    #[serde(default)]
    pub error_details: Option<JsonValue>,
}

/// Raw Broker Tool invocation arguments.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct BrokerToolArgs {
    #[serde(default)]
    pub interaction_id: Option<String>,
    #[serde(default)]
    pub delegated_call_details: Option<DelegatedCallDetailsArgs>,
    #[serde(default)]
    pub agent_llm_response: Option<AgentLlmResponseArgs>,
}

/// The validated, directional intent of one Broker Tool invocation.
pub enum BrokerToolRequest {
    HostToAgent {
        interaction_id: String,
        directive: DelegationDirective,
    },
    AgentToHost {
        interaction_id: String,
        response: AgentLlmResponseArgs,
    },
}

impl BrokerToolRequest {
    /// Validate and classify raw arguments.
    pub fn parse(args: BrokerToolArgs) -> Result<BrokerToolRequest, BrokerError> {
        match (args.delegated_call_details, args.agent_llm_response) {
            (Some(_), Some(_)) => Err(BrokerError::AmbiguousBrokerArgs),
            (None, None) => Err(BrokerError::InvalidBrokerArgs(
                "neither delegatedCallDetails nor agentLLMResponse was set".to_string(),
            )),
            (Some(details), None) => {
                let interaction_id = args
                    .interaction_id
                    .unwrap_or_else(|| Uuid::new_v4().to_string());
                let directive = DelegationDirective {
                    interaction_id: interaction_id.clone(),
                    original_command: details.original_command,
                    role: details.role,
                    service_type: details.service_type,
                    request_parameters: details.request_parameters,
                };
                Ok(BrokerToolRequest::HostToAgent {
                    interaction_id,
                    directive,
                })
            }
            (None, Some(response)) => {
                let interaction_id = args
                    .interaction_id
                    .ok_or(BrokerError::MissingInteractionId)?;
                Ok(BrokerToolRequest::AgentToHost {
                    interaction_id,
                    response,
                })
            }
        }
    }
}

/// The wire response the Broker Tool produces, in either direction.
#[derive(Debug, Clone)]
pub enum BrokerToolResponse {
    Pending {
        interaction_id: String,
        directive: DelegationDirective,
    },
    AgentAcknowledged {
        interaction_id: String,
    },
    Error {
        details: JsonValue,
    },
}

impl BrokerToolResponse {
    pub fn pending(interaction_id: String, directive: DelegationDirective) -> Self {
        BrokerToolResponse::Pending {
            interaction_id,
            directive,
        }
    }

    pub fn acknowledged(interaction_id: String) -> Self {
        BrokerToolResponse::AgentAcknowledged { interaction_id }
    }

    pub fn error(err: &BrokerError) -> Self {
        BrokerToolResponse::Error {
            details: err.as_error_details(),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            BrokerToolResponse::Pending {
                interaction_id,
                directive,
            } => serde_json::json!({
                "toolResponseSource": "taskmaster_to_agent",
                "status": "pending_agent_llm_action",
                "message": "An agent LLM call has been requested; respond via the broker tool with this interactionId.",
                "llmRequestForAgent": directive.request_parameters,
                "interactionId": interaction_id,
                "pendingInteractionSignalToAgent": {
                    "type": "agent_must_respond_via_agent_llm",
                    "interactionId": interaction_id,
                    "instructions": "Perform the requested LLM call yourself, then invoke this tool again with agentLLMResponse and this interactionId.",
                }
            }),
            BrokerToolResponse::AgentAcknowledged { interaction_id } => serde_json::json!({
                "toolResponseSource": "agent_to_taskmaster",
                "status": "agent_response_processed_by_taskmaster",
                "interactionId": interaction_id,
            }),
            BrokerToolResponse::Error { details } => serde_json::json!({
                "toolResponseSource": "agent_to_taskmaster",
                "error": details,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neither_form_present_is_invalid() {
        let args = BrokerToolArgs::default();
        assert!(matches!(
            BrokerToolRequest::parse(args),
            Err(BrokerError::InvalidBrokerArgs(_))
        ));
    }

    #[test]
    fn both_forms_present_is_ambiguous() {
        let args = BrokerToolArgs {
            interaction_id: Some("I1".to_string()),
            delegated_call_details: Some(DelegatedCallDetailsArgs {
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
            }),
            agent_llm_response: Some(AgentLlmResponseArgs {
                status: CompletionStatus::Success,
                data: None,
                error_details: None,
            }),
        };
        assert!(matches!(
            BrokerToolRequest::parse(args),
            Err(BrokerError::AmbiguousBrokerArgs)
        ));
    }

    #[test]
    fn agent_form_without_interaction_id_is_missing_interaction_id() {
        let args = BrokerToolArgs {
            interaction_id: None,
            delegated_call_details: None,
            agent_llm_response: Some(AgentLlmResponseArgs {
                status: CompletionStatus::Success,
                data: Some(JsonValue::Null),
                error_details: None,
            }),
        };
        assert!(matches!(
            BrokerToolRequest::parse(args),
            Err(BrokerError::MissingInteractionId)
        ));
    }

    #[test]
    fn host_form_generates_an_interaction_id_when_absent() {
        let args = BrokerToolArgs {
            interaction_id: None,
            delegated_call_details: Some(DelegatedCallDetailsArgs {
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
            }),
            agent_llm_response: None,
        };
        match BrokerToolRequest::parse(args).unwrap() {
            BrokerToolRequest::HostToAgent { interaction_id, .. } => {
                assert!(!interaction_id.is_empty())
            }
            _ => panic!("expected HostToAgent"),
        }
    }
}
