//! Command Cores: per-command logic that calls an LLM
//! through a role-configured [`LlmProvider`] and, when that provider
//! delegates, returns a pending-interaction signal instead of a completion.
//!
//! Every command core inspects the returned [`ProviderOutcome`] before
//! proceeding rather than assuming success.

pub mod add_task;
pub mod analyze_complexity;
pub mod expand_task;
pub mod parse_requirements;
pub mod research;
pub mod update_many_tasks;
pub mod update_one_subtask;
pub mod update_one_task;

use crate::broker::directive::{RequestParameters, Role, ServiceType};
use crate::broker::error::BrokerError;
use crate::broker::provider::{LlmProvider, ProviderOutcome};
use crate::broker::resource_signal::DelegationSignal;
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Call the role-configured provider for `service_type`, attach
/// command-specific `hints` to the outgoing request, and — since every
/// provider a command core is wired to is a [`DelegatingProvider`] — turn
/// the resulting delegation token into the canonical pending-interaction
/// signal.
pub async fn delegate(
    provider: &Arc<dyn LlmProvider>,
    original_command: &str,
    role: Role,
    service_type: ServiceType,
    mut params: RequestParameters,
    hints: JsonValue,
) -> Result<JsonValue, BrokerError> {
    params.hints = hints;
    let outcome = match service_type {
        ServiceType::GenerateText => provider.generate_text(params).await,
        ServiceType::StreamText => provider.stream_text(params).await,
        ServiceType::GenerateObject => provider.generate_object(params).await,
    };

    let ProviderOutcome::Delegation { interaction_id, details } = outcome;
    let directive = crate::broker::directive::DelegationDirective {
        interaction_id: interaction_id.clone(),
        original_command: original_command.to_string(),
        role,
        service_type,
        request_parameters: details,
    };
    let signal = DelegationSignal {
        interaction_id,
        directive,
    };
    Ok(signal.to_plain_object())
}

pub(crate) fn require_str<'a>(args: &'a JsonValue, key: &str) -> Result<&'a str, BrokerError> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| BrokerError::PayloadShape(format!("original args missing required field {key}")))
}

pub(crate) fn require_u64(args: &JsonValue, key: &str) -> Result<u64, BrokerError> {
    args.get(key)
        .and_then(|v| v.as_u64())
        .ok_or_else(|| BrokerError::PayloadShape(format!("original args missing required field {key}")))
}
