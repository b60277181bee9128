//! Recording of store/engine desynchronization.
//!
//! When an advance commits in the store but the subsequent token
//! redemption fails, the order's visible status is correct while the
//! workflow execution is stuck. Retrying blind risks double-redeeming a
//! token the engine may in fact have consumed, so the event is recorded
//! for out-of-band reconciliation instead.

use crate::domain::{OrderKey, OrderStatus};
use crate::workflow::ContinuationToken;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::error;

/// One committed-but-unredeemed advance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesyncAnomaly {
    pub key: OrderKey,
    /// The status the store already holds.
    pub committed_status: OrderStatus,
    /// The token whose redemption failed. Kept verbatim so the
    /// reconciliation tooling can decide what to do with it.
    pub token: ContinuationToken,
    pub reason: String,
}

/// Destination for desync records.
#[async_trait]
pub trait AnomalySink: Send + Sync {
    async fn record(&self, anomaly: DesyncAnomaly);
}

/// Sink that writes anomalies to the error log. The default: in a
/// deployment the log stream is what reconciliation tooling tails.
pub struct LogAnomalySink;

#[async_trait]
impl AnomalySink for LogAnomalySink {
    async fn record(&self, anomaly: DesyncAnomaly) {
        error!(
            key = %anomaly.key,
            committed_status = %anomaly.committed_status,
            reason = %anomaly.reason,
            "workflow desynchronized after committed advance"
        );
    }
}

/// Sink that keeps anomalies in memory for test assertions.
#[derive(Clone, Default)]
pub struct RecordingAnomalySink {
    anomalies: Arc<Mutex<Vec<DesyncAnomaly>>>,
}

impl RecordingAnomalySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn anomalies(&self) -> Vec<DesyncAnomaly> {
        self.anomalies.lock().expect("anomaly state poisoned").clone()
    }
}

#[async_trait]
impl AnomalySink for RecordingAnomalySink {
    async fn record(&self, anomaly: DesyncAnomaly) {
        self.anomalies
            .lock()
            .expect("anomaly state poisoned")
            .push(anomaly);
    }
}
