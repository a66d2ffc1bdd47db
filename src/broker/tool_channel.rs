//! The Tool Channel: the narrow RPC surface over which every command and
//! the Broker Tool itself are invoked. The broker only depends on
//! `register`/`invoke`; framing, transport, and parameter validation live
//! outside this crate.

use crate::broker::error::BrokerError;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Per-invocation context: a project-root resolver and a component tag for
/// structured logging. Logging itself goes through the `log` crate's
/// global facade, so only the resolved path travels here.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub project_root: PathBuf,
    pub tag: Option<String>,
}

impl ToolContext {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        ToolContext {
            project_root: project_root.into(),
            tag: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

type ToolFuture = Pin<Box<dyn Future<Output = Result<JsonValue, BrokerError>> + Send>>;

/// A registered tool: its name plus the async function that executes it.
#[derive(Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    execute: Arc<dyn Fn(JsonValue, ToolContext) -> ToolFuture + Send + Sync>,
}

impl ToolDescriptor {
    pub fn new<F, Fut>(name: impl Into<String>, description: impl Into<String>, execute: F) -> Self
    where
        F: Fn(JsonValue, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<JsonValue, BrokerError>> + Send + 'static,
    {
        ToolDescriptor {
            name: name.into(),
            description: description.into(),
            execute: Arc::new(move |args, ctx| Box::pin(execute(args, ctx))),
        }
    }

    pub async fn run(&self, args: JsonValue, ctx: ToolContext) -> Result<JsonValue, BrokerError> {
        (self.execute)(args, ctx).await
    }
}

/// The external RPC surface the broker depends on.
#[async_trait]
pub trait ToolChannel: Send + Sync {
    async fn register(&self, tool: ToolDescriptor);
    async fn invoke(
        &self,
        name: &str,
        args: JsonValue,
        ctx: ToolContext,
    ) -> Result<JsonValue, BrokerError>;
    /// Existence check used by the Tool Wrapper to validate the Broker Tool
    /// is reachable before it inserts a Pending Record.
    async fn has_tool(&self, name: &str) -> bool;
    /// Fetch a registered tool's descriptor so a caller can run it through
    /// [`crate::broker::wrapper::ToolWrapper::invoke_wrapped`] instead of
    /// invoking it directly (every command tool must go through the
    /// wrapper; only the Broker Tool itself is ever invoked plain).
    async fn get(&self, name: &str) -> Option<ToolDescriptor>;
}

/// An in-process [`ToolChannel`] that calls registered tools directly,
/// without any transport framing. Suitable for embedding the broker inside
/// a single Host process and for tests; a production Host would instead
/// adapt a JSON-over-stdio or HTTP transport to this trait.
#[derive(Default, Clone)]
pub struct InProcessToolChannel {
    tools: Arc<RwLock<HashMap<String, ToolDescriptor>>>,
}

impl InProcessToolChannel {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ToolChannel for InProcessToolChannel {
    async fn register(&self, tool: ToolDescriptor) {
        let mut tools = self.tools.write().await;
        tools.insert(tool.name.clone(), tool);
    }

    async fn invoke(
        &self,
        name: &str,
        args: JsonValue,
        ctx: ToolContext,
    ) -> Result<JsonValue, BrokerError> {
        let tool = {
            let tools = self.tools.read().await;
            tools.get(name).cloned()
        };
        match tool {
            Some(tool) => tool.run(args, ctx).await,
            None => Err(BrokerError::DispatchFailed(format!(
                "no tool registered under name {name}"
            ))),
        }
    }

    async fn has_tool(&self, name: &str) -> bool {
        self.tools.read().await.contains_key(name)
    }

    async fn get(&self, name: &str) -> Option<ToolDescriptor> {
        self.tools.read().await.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invoking_an_unregistered_tool_fails() {
        let channel = InProcessToolChannel::new();
        let result = channel
            .invoke("missing", JsonValue::Null, ToolContext::new("/tmp"))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn registered_tool_is_invokable() {
        let channel = InProcessToolChannel::new();
        channel
            .register(ToolDescriptor::new("echo", "echoes args", |args, _ctx| async move {
                Ok(args)
            }))
            .await;
        let result = channel
            .invoke(
                "echo",
                serde_json::json!({"x": 1}),
                ToolContext::new("/tmp"),
            )
            .await
            .unwrap();
        assert_eq!(result, serde_json::json!({"x": 1}));
    }
}
