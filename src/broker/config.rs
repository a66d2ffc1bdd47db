//! Broker configuration.
//!
//! A plain struct the embedder constructs directly, with a `Default` impl
//! for the common case. No TOML/YAML/env-file parsing dependency is
//! introduced — callers that want file-backed configuration load it
//! themselves and build this struct from the result.

use std::time::Duration;

/// Tunables recognized by the broker.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// How long a Pending Interaction Record may sit in the registry before
    /// the reaper times it out. Long enough to cover the Agent's longest
    /// expected LLM call.
    pub delegation_ttl: Duration,
    /// Tag used when a command does not specify one.
    pub default_tag: String,
    /// Enables verbose `trace`/`debug` logging for registry and dispatch
    /// bookkeeping that would otherwise be too noisy for normal operation.
    pub debug: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        BrokerConfig {
            delegation_ttl: Duration::from_secs(30 * 60),
            default_tag: "master".to_string(),
            debug: false,
        }
    }
}

impl BrokerConfig {
    /// Convenience constructor matching the common case of only overriding the TTL.
    pub fn with_ttl(delegation_ttl: Duration) -> Self {
        BrokerConfig {
            delegation_ttl,
            ..Default::default()
        }
    }
}
