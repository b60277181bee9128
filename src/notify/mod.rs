//! The notification seam.
//!
//! Lifecycle events fan out to interested parties (staff dashboards,
//! customer email, and so on) through an external notifier. The
//! orchestrator calls it fire-and-forget: a notifier failure is logged
//! and swallowed, never propagated to the caller. That policy lives in
//! the orchestrator; implementations here just succeed or fail honestly.

use crate::domain::{OrderId, OrderStatus, TenantId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::info;

/// Events emitted by the orchestrator as orders move through their
/// lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    OrderCreated {
        tenant_id: TenantId,
        order_id: OrderId,
        customer_email: String,
    },
    OrderAdvanced {
        tenant_id: TenantId,
        order_id: OrderId,
        new_status: OrderStatus,
        advanced_by: String,
    },
}

/// Error surfaced by a notifier backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Outbound fan-out of lifecycle events.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(&self, event: &LifecycleEvent) -> Result<(), NotifyError>;
}

/// Notifier that writes events to the log and nothing else. The default
/// for local runs.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn publish(&self, event: &LifecycleEvent) -> Result<(), NotifyError> {
        match event {
            LifecycleEvent::OrderCreated {
                tenant_id,
                order_id,
                customer_email,
            } => {
                info!(%tenant_id, %order_id, %customer_email, "order created");
            }
            LifecycleEvent::OrderAdvanced {
                tenant_id,
                order_id,
                new_status,
                advanced_by,
            } => {
                info!(%tenant_id, %order_id, %new_status, %advanced_by, "order advanced");
            }
        }
        Ok(())
    }
}

/// Notifier that records every event for later assertions. Optionally
/// fails on demand to exercise the swallow-and-log policy.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<LifecycleEvent>>>,
    fail: Arc<Mutex<bool>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        *self.fail.lock().expect("notifier state poisoned") = fail;
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().expect("notifier state poisoned").clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn publish(&self, event: &LifecycleEvent) -> Result<(), NotifyError> {
        if *self.fail.lock().expect("notifier state poisoned") {
            return Err(NotifyError("injected notifier failure".into()));
        }
        self.events
            .lock()
            .expect("notifier state poisoned")
            .push(event.clone());
        Ok(())
    }
}
