//! Observability events.
//!
//! A plain enum plus a trait with a no-op default method, so an embedder
//! can wire broker lifecycle notifications into whatever metrics/tracing
//! backend it already uses without the broker depending on one itself.

use std::sync::Arc;

/// Lifecycle events the broker emits as an interaction progresses through
/// its delegation state machine.
#[derive(Debug, Clone)]
pub enum BrokerEvent {
    /// A delegation signal was observed and a Pending Record was inserted.
    InteractionCreated {
        interaction_id: String,
        original_tool_name: String,
    },
    /// The directive was handed to the Tool Channel for the Agent to pick up.
    DirectiveDispatched { interaction_id: String },
    /// Dispatching the directive failed; the record was rejected and removed.
    DispatchFailed {
        interaction_id: String,
        reason: String,
    },
    /// The Agent returned a completion envelope and the record was resolved
    /// or rejected accordingly.
    InteractionResolved {
        interaction_id: String,
        succeeded: bool,
    },
    /// The reaper evicted a record whose TTL elapsed before the Agent responded.
    InteractionExpired { interaction_id: String },
    /// A post-processor finished running (successfully or not) for a resolved interaction.
    PostProcessorCompleted {
        interaction_id: String,
        original_tool_name: String,
        succeeded: bool,
    },
    /// A post-processor received a payload it could not validate. Raised
    /// in addition to the error return, since the Agent ack has already
    /// fired by the time the payload is inspected.
    PayloadShapeError {
        interaction_id: String,
        original_tool_name: String,
        message: String,
    },
}

/// Receiver for [`BrokerEvent`]s. All methods default to a no-op so an
/// embedder can override only the events it cares about.
pub trait EventHandler: Send + Sync {
    fn on_broker_event(&self, _event: &BrokerEvent) {}
}

/// An [`EventHandler`] that drops every event. Used as the broker's default
/// when the embedder does not supply one.
pub struct NoopEventHandler;

impl EventHandler for NoopEventHandler {}

pub(crate) fn emit(handler: &Arc<dyn EventHandler>, event: BrokerEvent) {
    handler.on_broker_event(&event);
}
