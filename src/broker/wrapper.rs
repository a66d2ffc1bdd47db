//! The Tool Wrapper — the hard part: interposes on every tool invocation,
//! detects the delegation signal, drives the Interaction Registry, and
//! dispatches post-processing on resumption.

use crate::broker::broker_tool::{BrokerToolArgs, BrokerToolRequest, BrokerToolResponse};
use crate::broker::error::BrokerError;
use crate::broker::event::{self, BrokerEvent, EventHandler};
use crate::broker::registry::{InteractionRegistry, PendingInteractionRecord, ResolvedResult};
use crate::broker::resource_signal::DelegationSignal;
use crate::broker::savers::{PostProcessorTable, SaverInput};
use crate::broker::store::TaskStore;
use crate::broker::tool_channel::{ToolChannel, ToolContext, ToolDescriptor};
use chrono::Utc;
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Name the Broker Tool is registered under on the Tool Channel.
pub const BROKER_TOOL_NAME: &str = "agent_llm_broker";

/// Wires together the Interaction Registry, the Tool Channel, the
/// post-processor table, and the Task Store, and implements the
/// delegation-detection-and-dispatch algorithm on top of them.
pub struct ToolWrapper {
    registry: Arc<InteractionRegistry>,
    tool_channel: Arc<dyn ToolChannel>,
    events: Arc<dyn EventHandler>,
    savers: Arc<PostProcessorTable>,
    store: TaskStore,
    default_tag: String,
    debug: bool,
}

impl ToolWrapper {
    pub fn new(
        registry: Arc<InteractionRegistry>,
        tool_channel: Arc<dyn ToolChannel>,
        events: Arc<dyn EventHandler>,
        store: TaskStore,
        default_tag: impl Into<String>,
    ) -> Arc<Self> {
        Self::with_debug(registry, tool_channel, events, store, default_tag, false)
    }

    pub fn with_debug(
        registry: Arc<InteractionRegistry>,
        tool_channel: Arc<dyn ToolChannel>,
        events: Arc<dyn EventHandler>,
        store: TaskStore,
        default_tag: impl Into<String>,
        debug: bool,
    ) -> Arc<Self> {
        Arc::new(ToolWrapper {
            registry,
            tool_channel,
            events,
            savers: Arc::new(PostProcessorTable::new()),
            store,
            default_tag: default_tag.into(),
            debug,
        })
    }

    /// Build the Broker Tool's [`ToolDescriptor`] so it can be registered on
    /// the Tool Channel like any other tool. Its `execute` closure is
    /// exactly [`Self::handle_broker_tool_call`].
    pub fn broker_tool_descriptor(self: &Arc<Self>) -> ToolDescriptor {
        let wrapper = Arc::clone(self);
        ToolDescriptor::new(
            BROKER_TOOL_NAME,
            "Bidirectional tool that carries delegated LLM interactions between the host and the agent.",
            move |args, ctx| {
                let wrapper = Arc::clone(&wrapper);
                async move { wrapper.handle_broker_tool_call(args, ctx).await }
            },
        )
    }

    /// Call the wrapped tool, detect a delegation signal in its result, and
    /// — if present — register and dispatch the interaction while still
    /// returning the original result unchanged.
    pub async fn invoke_wrapped(
        &self,
        tool: &ToolDescriptor,
        args: JsonValue,
        ctx: ToolContext,
    ) -> Result<JsonValue, BrokerError> {
        let result = tool.run(args.clone(), ctx.clone()).await?;

        if let Some(signal) = DelegationSignal::detect(&result) {
            self.begin_interaction(tool.name.clone(), args, ctx, signal)
                .await?;
        }

        // Step 3e / step 5: pass the wrapped tool's result through unchanged
        // regardless of whether a signal was detected.
        Ok(result)
    }

    async fn begin_interaction(
        &self,
        original_tool_name: String,
        original_tool_args: JsonValue,
        ctx: ToolContext,
        signal: DelegationSignal,
    ) -> Result<(), BrokerError> {
        // 3a: validate the Broker Tool is reachable before any state is created.
        if !self.tool_channel.has_tool(BROKER_TOOL_NAME).await {
            return Err(BrokerError::DispatchFailed(
                "broker tool is not registered on the tool channel".to_string(),
            ));
        }

        let interaction_id = signal.interaction_id.clone();
        let record = PendingInteractionRecord {
            interaction_id: interaction_id.clone(),
            original_tool_name: original_tool_name.clone(),
            original_tool_args: original_tool_args.clone(),
            session: ctx.clone(),
            delegated_call_details: signal.directive.clone(),
            timestamp: Utc::now(),
        };

        // 3b: insertion happens before dispatch is ever scheduled.
        let receiver = self.registry.insert(record).await;

        self.spawn_post_processor_waiter(
            interaction_id.clone(),
            original_tool_name,
            original_tool_args,
            signal.directive.clone(),
            receiver,
        );

        // 3c: dispatch the directive in the background; the original caller
        // never awaits this.
        self.spawn_directive_dispatch(interaction_id, signal, ctx);

        Ok(())
    }

    fn spawn_directive_dispatch(
        &self,
        interaction_id: String,
        signal: DelegationSignal,
        ctx: ToolContext,
    ) {
        let tool_channel = Arc::clone(&self.tool_channel);
        let registry = Arc::clone(&self.registry);
        let events = Arc::clone(&self.events);
        let debug = self.debug;
        tokio::spawn(async move {
            if debug {
                log::debug!("[{interaction_id}] dispatching directive to broker tool");
            }
            let directive = signal.directive;
            let host_args = serde_json::json!({
                "interactionId": interaction_id,
                "delegatedCallDetails": {
                    "originalCommand": directive.original_command,
                    "role": directive.role,
                    "serviceType": directive.service_type,
                    "requestParameters": directive.request_parameters,
                }
            });
            let dispatch_result = tool_channel.invoke(BROKER_TOOL_NAME, host_args, ctx).await;
            let dispatched_ok = matches!(
                &dispatch_result,
                Ok(value) if value.get("status").and_then(|s| s.as_str())
                    == Some("pending_agent_llm_action")
            );

            if dispatched_ok {
                log::info!("[{interaction_id}] directive dispatched");
                event::emit(&events, BrokerEvent::DirectiveDispatched { interaction_id });
                return;
            }

            // 3d: dispatch failed or returned an unexpected status — remove
            // and reject the record.
            let reason = match dispatch_result {
                Err(e) => e.to_string(),
                Ok(value) => format!("unexpected broker tool response: {value}"),
            };
            let _ = registry
                .reject(
                    &interaction_id,
                    BrokerError::DispatchFailed(reason.clone()),
                )
                .await;
            event::emit(
                &events,
                BrokerEvent::DispatchFailed {
                    interaction_id,
                    reason,
                },
            );
        });
    }

    /// Waits on the interaction's single-shot continuation and, if it
    /// resolved successfully, dispatches the matching post-processor
    /// — fire-and-forget with respect to the Agent ack.
    fn spawn_post_processor_waiter(
        &self,
        interaction_id: String,
        original_tool_name: String,
        original_tool_args: JsonValue,
        directive: crate::broker::directive::DelegationDirective,
        receiver: tokio::sync::oneshot::Receiver<Result<ResolvedResult, BrokerError>>,
    ) {
        let savers = Arc::clone(&self.savers);
        let events = Arc::clone(&self.events);
        let store = self.store.clone();
        let default_tag = self.default_tag.clone();
        let debug = self.debug;

        tokio::spawn(async move {
            let outcome = match receiver.await {
                Ok(outcome) => outcome,
                Err(_) => return, // sender dropped without resolving; nothing to post-process
            };

            let Ok(resolved) = outcome else {
                // Rejections (dispatch failure, agent error, timeout) are
                // already logged/emitted at their origin; no post-processing runs.
                return;
            };

            log::info!("[{interaction_id}] agent response received");
            if debug {
                log::debug!(
                    "[{interaction_id}] dispatching post-processor for {original_tool_name}"
                );
            }

            let input = SaverInput {
                interaction_id: interaction_id.clone(),
                original_tool_name: original_tool_name.clone(),
                original_tool_args,
                directive,
                resolved,
                store,
                default_tag,
                events: Arc::clone(&events),
            };

            let result = savers.dispatch(&original_tool_name, input).await;
            let succeeded = result.is_ok();
            if let Err(err) = &result {
                log::error!("[{interaction_id}] post-processor for {original_tool_name} failed: {err}");
                event::emit(
                    &events,
                    BrokerEvent::PayloadShapeError {
                        interaction_id: interaction_id.clone(),
                        original_tool_name: original_tool_name.clone(),
                        message: err.to_string(),
                    },
                );
            }
            log::info!("[{interaction_id}] post-processor completed (succeeded={succeeded})");
            event::emit(
                &events,
                BrokerEvent::PostProcessorCompleted {
                    interaction_id,
                    original_tool_name,
                    succeeded,
                },
            );
        });
    }

    /// Step 4 of : the Broker Tool's own execution, in both
    /// directions. Protocol errors are caught and shaped into an Agent-
    /// facing error response rather than propagated.
    async fn handle_broker_tool_call(
        &self,
        args: JsonValue,
        ctx: ToolContext,
    ) -> Result<JsonValue, BrokerError> {
        let parsed: BrokerToolArgs = match serde_json::from_value(args) {
            Ok(parsed) => parsed,
            Err(e) => {
                return Ok(BrokerToolResponse::error(&BrokerError::InvalidBrokerArgs(
                    e.to_string(),
                ))
                .to_json())
            }
        };

        let request = match BrokerToolRequest::parse(parsed) {
            Ok(request) => request,
            Err(e) => return Ok(BrokerToolResponse::error(&e).to_json()),
        };

        match request {
            BrokerToolRequest::HostToAgent {
                interaction_id,
                directive,
            } => Ok(BrokerToolResponse::pending(interaction_id, directive).to_json()),
            BrokerToolRequest::AgentToHost {
                interaction_id,
                response,
            } => self.complete_interaction(interaction_id, response, ctx).await,
        }
    }

    async fn complete_interaction(
        &self,
        interaction_id: String,
        response: crate::broker::broker_tool::AgentLlmResponseArgs,
        _ctx: ToolContext,
    ) -> Result<JsonValue, BrokerError> {
        use crate::broker::directive::CompletionStatus;

        let tag_info = self
            .registry
            .peek(&interaction_id)
            .await
            .and_then(|record| record.delegated_call_details.request_parameters.hint("tagInfo").cloned())
            .unwrap_or_else(|| serde_json::json!({ "tag": self.default_tag }));

        let outcome = match response.status {
            CompletionStatus::Success => {
                let resolved = ResolvedResult {
                    main_result: response.data.unwrap_or(JsonValue::Null),
                    telemetry_data: None,
                    tag_info,
                };
                self.registry.resolve_success(&interaction_id, resolved).await
            }
            CompletionStatus::Error => {
                let message = response
                    .error_details
                    .as_ref()
                    .and_then(|d| d.get("message"))
                    .and_then(|m| m.as_str())
                    .unwrap_or("agent reported an error")
                    .to_string();
                self.registry
                    .reject(
                        &interaction_id,
                        BrokerError::AgentReported {
                            message,
                            details: response.error_details,
                        },
                    )
                    .await
            }
        };

        match outcome {
            Ok(_record) => Ok(BrokerToolResponse::acknowledged(interaction_id).to_json()),
            Err(e) => Ok(BrokerToolResponse::error(&e).to_json()),
        }
    }
}
