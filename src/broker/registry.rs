//! The Interaction Registry. A process-local, never-persisted map from interaction id to a
//! Pending Interaction Record, plus a TTL reaper.
//!
//! Storage is an `Arc<RwLock<HashMap<...>>>`; the reaper is a background
//! `tokio::spawn` loop that wakes on an interval and evicts expired entries.
//! The single-shot resolve/reject continuation is modeled with
//! `tokio::sync::oneshot`, which enforces "insert before dispatch" and
//! "single-shot resolution" directly in the type system: a `Receiver` can
//! only ever be fulfilled once.

use crate::broker::directive::DelegationDirective;
use crate::broker::error::BrokerError;
use crate::broker::event::{self, BrokerEvent, EventHandler};
use crate::broker::tool_channel::ToolContext;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, RwLock};

/// What a resolved interaction hands to the command's post-processor.
#[derive(Debug, Clone)]
pub struct ResolvedResult {
    pub main_result: JsonValue,
    pub telemetry_data: Option<JsonValue>,
    pub tag_info: JsonValue,
}

/// A Pending Interaction Record, minus its resolver — the
/// resolver is consumed internally by the registry and never exposed so
/// that callers cannot fulfill an interaction twice.
#[derive(Debug, Clone)]
pub struct PendingInteractionRecord {
    pub interaction_id: String,
    pub original_tool_name: String,
    pub original_tool_args: JsonValue,
    pub session: ToolContext,
    pub delegated_call_details: DelegationDirective,
    pub timestamp: DateTime<Utc>,
}

struct StoredEntry {
    record: PendingInteractionRecord,
    resolver: oneshot::Sender<Result<ResolvedResult, BrokerError>>,
}

/// A read-only diagnostic view of the registry, used by
/// tests asserting the invariant and usable by an embedder's own
/// health checks.
#[derive(Debug, Clone, Copy)]
pub struct RegistrySnapshot {
    pub pending_count: usize,
    pub oldest_timestamp: Option<DateTime<Utc>>,
}

/// Process-wide map from interaction id to Pending Interaction Record.
pub struct InteractionRegistry {
    entries: Arc<RwLock<HashMap<String, StoredEntry>>>,
    ttl: Duration,
    events: Arc<dyn EventHandler>,
    debug: bool,
}

impl InteractionRegistry {
    pub fn new(ttl: Duration, events: Arc<dyn EventHandler>) -> Self {
        Self::with_debug(ttl, events, false)
    }

    pub fn with_debug(ttl: Duration, events: Arc<dyn EventHandler>, debug: bool) -> Self {
        InteractionRegistry {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            events,
            debug,
        }
    }

    /// Insert a new Pending Record and return the `Receiver` half of its
    /// single-shot continuation. Per rule 1, callers MUST complete
    /// this insertion before scheduling directive dispatch.
    pub async fn insert(
        &self,
        record: PendingInteractionRecord,
    ) -> oneshot::Receiver<Result<ResolvedResult, BrokerError>> {
        let (tx, rx) = oneshot::channel();
        let interaction_id = record.interaction_id.clone();
        let original_tool_name = record.original_tool_name.clone();
        let mut entries = self.entries.write().await;
        entries.insert(
            interaction_id.clone(),
            StoredEntry {
                record,
                resolver: tx,
            },
        );
        let pending_count = entries.len();
        drop(entries);
        if self.debug {
            log::debug!(
                "[{interaction_id}] registry insert for tool {original_tool_name} ({pending_count} pending)"
            );
        }
        event::emit(
            &self.events,
            BrokerEvent::InteractionCreated {
                interaction_id,
                original_tool_name,
            },
        );
        rx
    }

    /// Agent callback reported `status: success`. Removes the record
    /// (single-shot) and fulfills its continuation.
    pub async fn resolve_success(
        &self,
        interaction_id: &str,
        result: ResolvedResult,
    ) -> Result<PendingInteractionRecord, BrokerError> {
        self.finish(interaction_id, Ok(result), true).await
    }

    /// Agent callback reported `status: error`, or dispatch/timeout failed.
    /// Removes the record (single-shot) and rejects its continuation.
    pub async fn reject(
        &self,
        interaction_id: &str,
        error: BrokerError,
    ) -> Result<PendingInteractionRecord, BrokerError> {
        self.finish(interaction_id, Err(error), false).await
    }

    async fn finish(
        &self,
        interaction_id: &str,
        outcome: Result<ResolvedResult, BrokerError>,
        succeeded: bool,
    ) -> Result<PendingInteractionRecord, BrokerError> {
        let entry = {
            let mut entries = self.entries.write().await;
            entries.remove(interaction_id)
        };
        let entry = entry.ok_or_else(|| {
            BrokerError::UnknownInteraction(interaction_id.to_string())
        })?;
        if self.debug {
            log::debug!("[{interaction_id}] registry remove (succeeded={succeeded})");
        }
        // Receiver may already be gone if its task was cancelled; that is
        // not an error for the registry itself.
        let _ = entry.resolver.send(outcome);
        log::info!("[{interaction_id}] interaction resolved (succeeded={succeeded})");
        event::emit(
            &self.events,
            BrokerEvent::InteractionResolved {
                interaction_id: interaction_id.to_string(),
                succeeded,
            },
        );
        Ok(entry.record)
    }

    /// Read-only lookup that does not consume the record. Used to recover
    /// directive hints (e.g. `tagInfo`) needed to build a [`ResolvedResult`]
    /// before the record is removed by [`Self::resolve_success`].
    pub async fn peek(&self, interaction_id: &str) -> Option<PendingInteractionRecord> {
        let entries = self.entries.read().await;
        entries.get(interaction_id).map(|e| e.record.clone())
    }

    pub async fn snapshot(&self) -> RegistrySnapshot {
        let entries = self.entries.read().await;
        let oldest = entries.values().map(|e| e.record.timestamp).min();
        RegistrySnapshot {
            pending_count: entries.len(),
            oldest_timestamp: oldest,
        }
    }

    /// Spawn the TTL reaper: wake on a fixed interval, scan for entries
    /// whose `timestamp + ttl` has elapsed, reject and remove them.
    pub fn spawn_reaper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(1)).await;
                registry.reap_expired().await;
            }
        })
    }

    async fn reap_expired(&self) {
        let now = Utc::now();
        let expired: Vec<String> = {
            let entries = self.entries.read().await;
            if self.debug {
                log::trace!("reaper scanning {} pending entries", entries.len());
            }
            entries
                .iter()
                .filter(|(_, entry)| {
                    now.signed_duration_since(entry.record.timestamp)
                        .to_std()
                        .map(|elapsed| elapsed > self.ttl)
                        .unwrap_or(false)
                })
                .map(|(id, _)| id.clone())
                .collect()
        };
        for interaction_id in expired {
            let result = self
                .reject(
                    &interaction_id,
                    BrokerError::InteractionTimeout(interaction_id.clone()),
                )
                .await;
            if result.is_ok() {
                log::info!("[{interaction_id}] interaction expired");
                event::emit(
                    &self.events,
                    BrokerEvent::InteractionExpired { interaction_id },
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::directive::{RequestParameters, Role, ServiceType};
    use crate::broker::event::NoopEventHandler;

    fn sample_record(id: &str) -> PendingInteractionRecord {
        PendingInteractionRecord {
            interaction_id: id.to_string(),
            original_tool_name: "update-one-task".to_string(),
            original_tool_args: JsonValue::Null,
            session: ToolContext::new("/tmp/project"),
            delegated_call_details: DelegationDirective {
                interaction_id: id.to_string(),
                original_command: "update-one-task".to_string(),
                role: Role::Main,
                service_type: ServiceType::GenerateText,
                request_parameters: RequestParameters {
                    model_id: "gpt".to_string(),
                    messages: vec![],
                    max_tokens: None,
                    temperature: None,
                    schema: None,
                    object_name: None,
                    hints: JsonValue::Null,
                },
            },
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_then_resolve_empties_the_registry() {
        let registry = InteractionRegistry::new(Duration::from_secs(60), Arc::new(NoopEventHandler));
        let rx = registry.insert(sample_record("I1")).await;
        assert_eq!(registry.snapshot().await.pending_count, 1);

        registry
            .resolve_success(
                "I1",
                ResolvedResult {
                    main_result: JsonValue::Null,
                    telemetry_data: None,
                    tag_info: JsonValue::Null,
                },
            )
            .await
            .unwrap();

        assert_eq!(registry.snapshot().await.pending_count, 0);
        let outcome = rx.await.unwrap();
        assert!(outcome.is_ok());
    }

    #[tokio::test]
    async fn second_resolution_of_same_id_is_unknown_interaction() {
        let registry = InteractionRegistry::new(Duration::from_secs(60), Arc::new(NoopEventHandler));
        registry.insert(sample_record("I1")).await;
        registry
            .resolve_success(
                "I1",
                ResolvedResult {
                    main_result: JsonValue::Null,
                    telemetry_data: None,
                    tag_info: JsonValue::Null,
                },
            )
            .await
            .unwrap();

        let second = registry
            .resolve_success(
                "I1",
                ResolvedResult {
                    main_result: JsonValue::Null,
                    telemetry_data: None,
                    tag_info: JsonValue::Null,
                },
            )
            .await;
        assert!(matches!(second, Err(BrokerError::UnknownInteraction(_))));
    }

    #[tokio::test]
    async fn reaper_evicts_expired_entries() {
        let registry = Arc::new(InteractionRegistry::new(
            Duration::from_millis(10),
            Arc::new(NoopEventHandler),
        ));
        let mut record = sample_record("I1");
        record.timestamp = Utc::now() - chrono::Duration::seconds(5);
        registry.insert(record).await;
        registry.reap_expired().await;
        assert_eq!(registry.snapshot().await.pending_count, 0);
    }
}
