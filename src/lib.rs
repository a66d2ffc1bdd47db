// src/lib.rs

//! Delegated LLM interaction broker: a server-side coordination layer that
//! lets a task-management host off-load every LLM call to the agent
//! process driving it instead of calling models directly.

// Import the top-level `broker` module.
pub mod broker;

// Re-export the pieces an embedding Host actually needs at the crate root
// instead of making callers spell out the full module path.
pub use broker::broker_tool::{BrokerToolRequest, BrokerToolResponse};
pub use broker::config::BrokerConfig;
pub use broker::error::BrokerError;
pub use broker::event::{BrokerEvent, EventHandler, NoopEventHandler};
pub use broker::host::BrokerHost;
pub use broker::provider::{DelegatingProvider, LlmProvider, ProviderOutcome};
pub use broker::registry::InteractionRegistry;
pub use broker::store::TaskStore;
pub use broker::tool_channel::{InProcessToolChannel, ToolChannel, ToolContext, ToolDescriptor};
pub use broker::wrapper::{ToolWrapper, BROKER_TOOL_NAME};
