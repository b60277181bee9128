//! A fully wired in-process system.
//!
//! [`LifecycleSystem`] spawns the in-memory store task, builds an
//! orchestrator around it together with the in-memory engine, and keeps
//! the collaborator handles around so tests can drive the engine
//! (pausing, injecting failures) and inspect what happened. Shutdown
//! works the way actor-style tasks shut down: drop every client holding
//! a sender, then await the task.

use crate::domain::{Order, OrderKey};
use crate::notify::RecordingNotifier;
use crate::orchestrator::{Orchestrator, RecordingAnomalySink};
use crate::store::{MemoryStore, MemoryStoreTask, OrderStore};
use crate::workflow::InMemoryEngine;
use std::sync::Arc;
use tracing::{error, info};

/// Orchestrator plus in-memory collaborators, wired and running.
pub struct LifecycleSystem {
    pub orchestrator: Orchestrator,
    /// Engine handle for simulating pauses and injecting failures.
    pub engine: InMemoryEngine,
    /// Direct store client, useful for test-side inspection.
    pub store: MemoryStore,
    /// Recorded lifecycle events.
    pub notifier: RecordingNotifier,
    /// Recorded desync anomalies.
    pub anomalies: RecordingAnomalySink,
    store_handle: tokio::task::JoinHandle<()>,
}

impl LifecycleSystem {
    /// Builds the system and starts the store task.
    pub fn new() -> Self {
        let (store_task, store) = MemoryStoreTask::new(32);
        let store_handle = tokio::spawn(store_task.run());

        let engine = InMemoryEngine::new();
        let notifier = RecordingNotifier::new();
        let anomalies = RecordingAnomalySink::new();

        let orchestrator = Orchestrator::new(
            Arc::new(store.clone()),
            Arc::new(engine.clone()),
            Arc::new(notifier.clone()),
            Arc::new(anomalies.clone()),
        );

        Self {
            orchestrator,
            engine,
            store,
            notifier,
            anomalies,
            store_handle,
        }
    }

    /// Fetches a raw record straight from the store, bypassing the
    /// orchestrator's role scoping. For inspection in tests.
    pub async fn order(&self, key: &OrderKey) -> Option<Order> {
        self.store.get(key).await.expect("store task unavailable")
    }

    /// Shuts down cleanly: drops every sender into the store task, then
    /// waits for it to drain and exit. Fails if the task panicked.
    pub async fn shutdown(self) -> Result<(), String> {
        info!("shutting down lifecycle system");
        drop(self.orchestrator);
        drop(self.store);

        if let Err(e) = self.store_handle.await {
            error!("store task failed: {e:?}");
            return Err(format!("store task failed: {e:?}"));
        }
        info!("lifecycle system shut down");
        Ok(())
    }
}

impl Default for LifecycleSystem {
    fn default() -> Self {
        Self::new()
    }
}
