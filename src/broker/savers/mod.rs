//! Post-processor dispatch: a static mapping from `originalToolName` to a
//! handler, implemented as a name-keyed registry rather than a
//! switch-per-command. Each saver module exposes one
//! `save(SaverInput) -> ...` function; this module only wires them into the
//! table.

pub mod add_task;
pub mod analyze_complexity;
pub mod completed_item_protection;
pub mod expand_task;
pub mod parse_requirements;
pub mod research;
pub mod update_many_tasks;
pub mod update_one_subtask;
pub mod update_one_task;

use crate::broker::directive::DelegationDirective;
use crate::broker::error::BrokerError;
use crate::broker::event::EventHandler;
use crate::broker::registry::ResolvedResult;
use crate::broker::store::TaskStore;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub const TOOL_PARSE_REQUIREMENTS: &str = "parse-prd";
pub const TOOL_EXPAND_TASK: &str = "expand-task";
pub const TOOL_UPDATE_ONE_TASK: &str = "update-one-task";
pub const TOOL_UPDATE_ONE_SUBTASK: &str = "update-one-subtask";
pub const TOOL_UPDATE_MANY_TASKS: &str = "update-many-tasks";
pub const TOOL_ANALYZE_COMPLEXITY: &str = "analyze-complexity";
pub const TOOL_ADD_TASK: &str = "add-task";
pub const TOOL_RESEARCH: &str = "research";

/// Everything a post-processor needs. Post-processors are pure functions of
/// this input to a persistence side-effect — they never touch
/// the Interaction Registry.
pub struct SaverInput {
    pub interaction_id: String,
    pub original_tool_name: String,
    pub original_tool_args: JsonValue,
    pub directive: DelegationDirective,
    pub resolved: ResolvedResult,
    pub store: TaskStore,
    pub default_tag: String,
    pub events: Arc<dyn EventHandler>,
}

impl SaverInput {
    /// Tag the original call targeted, falling back to the default tag.
    /// Recovers from `delegatedCallDetails.requestParameters.tagInfo` first,
    /// then from `resolved.tag_info`, then from configuration.
    pub fn tag(&self) -> String {
        self.directive
            .request_parameters
            .hint("tagInfo")
            .and_then(|v| v.get("tag"))
            .and_then(|v| v.as_str())
            .or_else(|| self.resolved.tag_info.get("tag").and_then(|v| v.as_str()))
            .unwrap_or(&self.default_tag)
            .to_string()
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        log::warn!(
            "[{}] {}: {}",
            self.interaction_id,
            self.original_tool_name,
            message.as_ref()
        );
    }
}

type SaverFuture = Pin<Box<dyn Future<Output = Result<(), BrokerError>> + Send>>;
type SaverFn = fn(SaverInput) -> SaverFuture;

/// The static `originalToolName -> handler` table.
pub struct PostProcessorTable {
    handlers: HashMap<&'static str, SaverFn>,
}

impl Default for PostProcessorTable {
    fn default() -> Self {
        let mut handlers: HashMap<&'static str, SaverFn> = HashMap::new();
        handlers.insert(TOOL_PARSE_REQUIREMENTS, |input| {
            Box::pin(parse_requirements::save(input))
        });
        handlers.insert(TOOL_EXPAND_TASK, |input| Box::pin(expand_task::save(input)));
        handlers.insert(TOOL_UPDATE_ONE_TASK, |input| {
            Box::pin(update_one_task::save(input))
        });
        handlers.insert(TOOL_UPDATE_ONE_SUBTASK, |input| {
            Box::pin(update_one_subtask::save(input))
        });
        handlers.insert(TOOL_UPDATE_MANY_TASKS, |input| {
            Box::pin(update_many_tasks::save(input))
        });
        handlers.insert(TOOL_ANALYZE_COMPLEXITY, |input| {
            Box::pin(analyze_complexity::save(input))
        });
        handlers.insert(TOOL_ADD_TASK, |input| Box::pin(add_task::save(input)));
        handlers.insert(TOOL_RESEARCH, |input| Box::pin(research::save(input)));
        PostProcessorTable { handlers }
    }
}

impl PostProcessorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn dispatch(&self, original_tool_name: &str, input: SaverInput) -> Result<(), BrokerError> {
        match self.handlers.get(original_tool_name) {
            Some(handler) => handler(input).await,
            None => Err(BrokerError::PayloadShape(format!(
                "no post-processor registered for {original_tool_name}"
            ))),
        }
    }
}
