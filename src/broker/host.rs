//! Broker host facade: wires the Interaction Registry, Tool Channel, Task
//! Store, command cores, and the Broker Tool into one invocable surface.
//! One facade, many wired collaborators, exposed as a single
//! [`BrokerHost::new`] plus [`BrokerHost::invoke`].

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::broker::commands;
use crate::broker::config::BrokerConfig;
use crate::broker::error::BrokerError;
use crate::broker::event::{EventHandler, NoopEventHandler};
use crate::broker::provider::LlmProvider;
use crate::broker::registry::InteractionRegistry;
use crate::broker::store::{derived_files, TaskStore};
use crate::broker::tool_channel::{InProcessToolChannel, ToolChannel, ToolContext, ToolDescriptor};
use crate::broker::wrapper::{ToolWrapper, BROKER_TOOL_NAME};

/// Everything a Host needs to drive the broker: register it once, then call
/// [`BrokerHost::invoke`] for every command the way it would call any other
/// tool. The Broker Tool itself is registered automatically; callers invoke
/// it directly (it is never itself passed through
/// [`ToolWrapper::invoke_wrapped`] — that algorithm exists to *detect*
/// delegation signals from command tools, and the Broker Tool's own
/// responses never carry one).
pub struct BrokerHost {
    wrapper: Arc<ToolWrapper>,
    tool_channel: Arc<dyn ToolChannel>,
    store: TaskStore,
    default_tag: String,
}

impl BrokerHost {
    /// Build a host wired to the given main-role and research-role
    /// providers. Spawns the Interaction Registry's TTL reaper.
    pub async fn new(
        project_root: impl Into<PathBuf>,
        config: BrokerConfig,
        main_provider: Arc<dyn LlmProvider>,
        research_provider: Arc<dyn LlmProvider>,
        events: Option<Arc<dyn EventHandler>>,
    ) -> Arc<Self> {
        let events = events.unwrap_or_else(|| Arc::new(NoopEventHandler));
        let registry = Arc::new(InteractionRegistry::with_debug(
            config.delegation_ttl,
            Arc::clone(&events),
            config.debug,
        ));
        registry.spawn_reaper();

        let tool_channel: Arc<dyn ToolChannel> = Arc::new(InProcessToolChannel::new());
        let store = TaskStore::new(project_root);
        let wrapper = ToolWrapper::with_debug(
            Arc::clone(&registry),
            Arc::clone(&tool_channel),
            Arc::clone(&events),
            store.clone(),
            config.default_tag.clone(),
            config.debug,
        );
        tool_channel.register(wrapper.broker_tool_descriptor()).await;

        let host = Arc::new(BrokerHost {
            wrapper,
            tool_channel,
            store: store.clone(),
            default_tag: config.default_tag.clone(),
        });
        host.register_commands(main_provider, research_provider).await;
        host
    }

    async fn register_commands(
        &self,
        main_provider: Arc<dyn LlmProvider>,
        research_provider: Arc<dyn LlmProvider>,
    ) {
        let store = self.store.clone();
        let default_tag = self.default_tag.clone();
        self.tool_channel
            .register(ToolDescriptor::new(
                commands::parse_requirements::ORIGINAL_COMMAND,
                "Parse a requirements document into an initial set of tasks.",
                {
                    let provider = Arc::clone(&main_provider);
                    move |args, ctx| {
                        let provider = Arc::clone(&provider);
                        async move { commands::parse_requirements::run(args, ctx, provider).await }
                    }
                },
            ))
            .await;

        self.tool_channel
            .register(ToolDescriptor::new(
                commands::expand_task::ORIGINAL_COMMAND,
                "Expand a task into new subtasks.",
                {
                    let provider = Arc::clone(&main_provider);
                    let store = store.clone();
                    let default_tag = default_tag.clone();
                    move |args, ctx| {
                        let provider = Arc::clone(&provider);
                        let store = store.clone();
                        let default_tag = default_tag.clone();
                        async move {
                            let task_id = commands::require_u64(&args, "id")? as u32;
                            let tag = ctx.tag.clone().unwrap_or_else(|| default_tag.clone());
                            let force = args.get("force").and_then(|v| v.as_bool()).unwrap_or(false);
                            let existing_subtask_count = if force {
                                let (count, tasks, skipped) =
                                    store.clear_subtasks(&tag, task_id).await?;
                                if skipped {
                                    log::warn!(
                                        "task {task_id} is completed; force clear of subtasks was skipped"
                                    );
                                }
                                derived_files::regenerate(&store, &tag, &default_tag, &tasks).await?;
                                count
                            } else {
                                store.subtask_count(&tag, task_id).await?
                            };
                            commands::expand_task::run(args, ctx, provider, existing_subtask_count).await
                        }
                    }
                },
            ))
            .await;

        self.tool_channel
            .register(ToolDescriptor::new(
                commands::update_one_task::ORIGINAL_COMMAND,
                "Update one task, either by appending a note or replacing its fields.",
                {
                    let provider = Arc::clone(&main_provider);
                    move |args, ctx| {
                        let provider = Arc::clone(&provider);
                        async move { commands::update_one_task::run(args, ctx, provider).await }
                    }
                },
            ))
            .await;

        self.tool_channel
            .register(ToolDescriptor::new(
                commands::update_one_subtask::ORIGINAL_COMMAND,
                "Append a timestamped note to one subtask.",
                {
                    let provider = Arc::clone(&main_provider);
                    move |args, ctx| {
                        let provider = Arc::clone(&provider);
                        async move { commands::update_one_subtask::run(args, ctx, provider).await }
                    }
                },
            ))
            .await;

        self.tool_channel
            .register(ToolDescriptor::new(
                commands::update_many_tasks::ORIGINAL_COMMAND,
                "Update a batch of tasks identified by id or range.",
                {
                    let provider = Arc::clone(&main_provider);
                    move |args, ctx| {
                        let provider = Arc::clone(&provider);
                        async move { commands::update_many_tasks::run(args, ctx, provider).await }
                    }
                },
            ))
            .await;

        self.tool_channel
            .register(ToolDescriptor::new(
                commands::analyze_complexity::ORIGINAL_COMMAND,
                "Analyze task complexity and recommend subtask counts.",
                {
                    let provider = Arc::clone(&main_provider);
                    move |args, ctx| {
                        let provider = Arc::clone(&provider);
                        async move { commands::analyze_complexity::run(args, ctx, provider).await }
                    }
                },
            ))
            .await;

        self.tool_channel
            .register(ToolDescriptor::new(
                commands::add_task::ORIGINAL_COMMAND,
                "Draft and add a new task.",
                {
                    let provider = Arc::clone(&main_provider);
                    let store = store.clone();
                    let default_tag = default_tag.clone();
                    move |args, ctx| {
                        let provider = Arc::clone(&provider);
                        let store = store.clone();
                        let default_tag = default_tag.clone();
                        async move {
                            let tag = ctx.tag.clone().unwrap_or(default_tag);
                            let new_task_id = store.next_task_id(&tag).await?;
                            commands::add_task::run(args, ctx, provider, new_task_id).await
                        }
                    }
                },
            ))
            .await;

        self.tool_channel
            .register(ToolDescriptor::new(
                commands::research::ORIGINAL_COMMAND,
                "Research a query and optionally attach the result to a task.",
                move |args, ctx| {
                    let provider = Arc::clone(&research_provider);
                    async move { commands::research::run(args, ctx, provider).await }
                },
            ))
            .await;
    }

    /// Invoke any registered tool by name. Every command tool is run through
    /// [`ToolWrapper::invoke_wrapped`] so a returned delegation signal is
    /// detected and dispatched; the Broker Tool is
    /// invoked directly since it implements step 4 itself.
    pub async fn invoke(
        &self,
        name: &str,
        args: JsonValue,
        ctx: ToolContext,
    ) -> Result<JsonValue, BrokerError> {
        if name == BROKER_TOOL_NAME {
            return self.tool_channel.invoke(name, args, ctx).await;
        }
        let tool = self.tool_channel.get(name).await.ok_or_else(|| {
            BrokerError::DispatchFailed(format!("no tool registered under name {name}"))
        })?;
        self.wrapper.invoke_wrapped(&tool, args, ctx).await
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::provider::DelegatingProvider;

    #[tokio::test]
    async fn parse_requirements_invocation_surfaces_a_delegation_signal() {
        let dir = tempfile::tempdir().unwrap();
        let main: Arc<dyn LlmProvider> = Arc::new(DelegatingProvider::new("main"));
        let research: Arc<dyn LlmProvider> = Arc::new(DelegatingProvider::new("research"));
        let host = BrokerHost::new(
            dir.path(),
            BrokerConfig::default(),
            main,
            research,
            None,
        )
        .await;

        let result = host
            .invoke(
                commands::parse_requirements::ORIGINAL_COMMAND,
                serde_json::json!({"input": "/p/prd.md", "numTasks": 3}),
                ToolContext::new(dir.path()),
            )
            .await
            .unwrap();

        assert_eq!(result["needsAgentDelegation"], serde_json::json!(true));
    }

    #[tokio::test]
    async fn unregistered_tool_name_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let main: Arc<dyn LlmProvider> = Arc::new(DelegatingProvider::new("main"));
        let research: Arc<dyn LlmProvider> = Arc::new(DelegatingProvider::new("research"));
        let host = BrokerHost::new(dir.path(), BrokerConfig::default(), main, research, None).await;

        let result = host
            .invoke("not-a-real-tool", JsonValue::Null, ToolContext::new(dir.path()))
            .await;
        assert!(result.is_err());
    }
}
