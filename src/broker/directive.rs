//! Wire types shared by the Delegating Provider, the Broker Tool, and the
//! Tool Wrapper: the Delegation Directive and Completion Envelope, plus the
//! smaller enums they're built from. The Completion Envelope follows the
//! same success/error discriminated-payload idiom as the role/message enums
//! it travels alongside.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Semantic LLM role a delegated call was made under. Mirrors the role
/// configuration slots a real multi-provider setup would have.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Main,
    Research,
    Fallback,
}

/// The Delegating Provider operation that produced this directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    GenerateText,
    StreamText,
    GenerateObject,
}

/// The would-be LLM inputs, plus command-specific hints the post-processor
/// needs on resumption. Hints are opaque to the Agent — it only
/// forwards them back unexamined as part of `delegatedCallDetails`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestParameters {
    pub model_id: String,
    pub messages: Vec<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Present only for `ServiceType::GenerateObject`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_name: Option<String>,
    /// Command-specific hints: `nextSubtaskId`, `numSubtasksForAgent`,
    /// `userDependencies`, `userPriority`, `newTaskId`, `tagInfo`, etc.
    /// Kept as a flat JSON map rather than one struct per command so that
    /// `delegatedCallDetails.requestParameters` round-trips byte-for-byte
    /// through the Agent per the invariant.
    #[serde(default, skip_serializing_if = "JsonValue::is_null")]
    pub hints: JsonValue,
}

impl RequestParameters {
    pub fn hint(&self, key: &str) -> Option<&JsonValue> {
        self.hints.get(key)
    }
}

/// Host→Agent payload of one interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegationDirective {
    pub interaction_id: String,
    pub original_command: String,
    pub role: Role,
    pub service_type: ServiceType,
    pub request_parameters: RequestParameters,
}

/// Agent→Host payload of one interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionEnvelope {
    pub interaction_id: String,
    pub status: CompletionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<JsonValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Success,
    Error,
}

impl CompletionEnvelope {
    pub fn is_success(&self) -> bool {
        self.status == CompletionStatus::Success
    }
}
