//! Error taxonomy for the delegation broker.
//!
//! A flat enum implementing `std::error::Error` by hand, no `thiserror`.
//! Each variant carries enough detail to be re-serialized into an
//! agent-facing `errorDetails` object by [`BrokerError::as_error_details`].

use serde_json::Value as JsonValue;
use std::error::Error;
use std::fmt;

/// Errors surfaced by the Broker Tool, the Tool Wrapper, or a post-processor.
#[derive(Debug, Clone)]
pub enum BrokerError {
    /// Broker Tool payload had neither a Host→Agent nor an Agent→Host shape.
    InvalidBrokerArgs(String),
    /// Broker Tool payload had both shapes set at once.
    AmbiguousBrokerArgs,
    /// Agent→Host payload omitted `interactionId`.
    MissingInteractionId,
    /// Agent callback named an interaction id with no Pending Record.
    UnknownInteraction(String),
    /// The Pending Record's TTL elapsed before the Agent responded.
    InteractionTimeout(String),
    /// Dispatching the directive (or the Broker Tool lookup) failed.
    DispatchFailed(String),
    /// The Agent reported `status: "error"` in its completion envelope.
    AgentReported {
        message: String,
        details: Option<JsonValue>,
    },
    /// A post-processor could not parse or validate the agent payload shape.
    PayloadShape(String),
    /// A post-processor failed to persist its mutation (I/O, serialization).
    Persistence(String),
}

impl BrokerError {
    /// Stable machine-readable code for this error variant.
    pub fn code(&self) -> &'static str {
        match self {
            BrokerError::InvalidBrokerArgs(_) => "ERR_INVALID_BROKER_ARGS",
            BrokerError::AmbiguousBrokerArgs => "ERR_AMBIGUOUS_BROKER_ARGS",
            BrokerError::MissingInteractionId => "ERR_MISSING_INTERACTION_ID",
            BrokerError::UnknownInteraction(_) => "ERR_UNKNOWN_INTERACTION",
            BrokerError::InteractionTimeout(_) => "ERR_INTERACTION_TIMEOUT",
            BrokerError::DispatchFailed(_) => "ERR_DISPATCH_FAILED",
            BrokerError::AgentReported { .. } => "ERR_AGENT_REPORTED",
            BrokerError::PayloadShape(_) => "ERR_PAYLOAD_SHAPE",
            BrokerError::Persistence(_) => "ERR_PERSISTENCE",
        }
    }

    /// Render as the structured `errorDetails` object carried on the wire.
    pub fn as_error_details(&self) -> JsonValue {
        serde_json::json!({
            "code": self.code(),
            "message": self.to_string(),
        })
    }
}

impl fmt::Display for BrokerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrokerError::InvalidBrokerArgs(msg) => write!(f, "invalid broker arguments: {msg}"),
            BrokerError::AmbiguousBrokerArgs => write!(
                f,
                "broker arguments carried both delegatedCallDetails and agentLLMResponse"
            ),
            BrokerError::MissingInteractionId => {
                write!(f, "agent callback is missing interactionId")
            }
            BrokerError::UnknownInteraction(id) => {
                write!(f, "no pending interaction for id {id}")
            }
            BrokerError::InteractionTimeout(id) => {
                write!(f, "interaction {id} timed out waiting for the agent")
            }
            BrokerError::DispatchFailed(msg) => write!(f, "directive dispatch failed: {msg}"),
            BrokerError::AgentReported { message, .. } => {
                write!(f, "agent reported an error: {message}")
            }
            BrokerError::PayloadShape(msg) => write!(f, "unexpected agent payload shape: {msg}"),
            BrokerError::Persistence(msg) => write!(f, "failed to persist result: {msg}"),
        }
    }
}

impl Error for BrokerError {}
