//! In-memory order store built as a message-processing task.
//!
//! The store state lives in a single Tokio task that processes requests
//! sequentially from an mpsc channel and answers over oneshot channels.
//! Sequential processing is the whole point: each request runs
//! read-modify-write against the map with nothing interleaved, which
//! gives `conditional_update` the same atomicity the real storage engine
//! promises, without a lock in sight.
//!
//! [`MemoryStore`] is the cheap-to-clone client half; it implements
//! [`OrderStore`] and can be handed to the orchestrator like any other
//! backend.

use crate::domain::{Order, OrderKey, TenantId};
use crate::store::{OrderPatch, OrderStore, Precondition, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// One-shot response channel carried inside each request.
type Respond<T> = oneshot::Sender<Result<T, StoreError>>;

/// Requests understood by the store task.
#[derive(Debug)]
enum StoreRequest {
    Get {
        key: OrderKey,
        respond_to: Respond<Option<Order>>,
    },
    Put {
        order: Order,
        respond_to: Respond<()>,
    },
    Update {
        key: OrderKey,
        patch: OrderPatch,
        precondition: Precondition,
        respond_to: Respond<Order>,
    },
    Query {
        tenant_id: TenantId,
        respond_to: Respond<Vec<Order>>,
    },
}

/// The server half: owns the records and the receiver.
pub struct MemoryStoreTask {
    receiver: mpsc::Receiver<StoreRequest>,
    records: HashMap<OrderKey, Order>,
}

impl MemoryStoreTask {
    /// Creates the store task and its client side.
    pub fn new(buffer_size: usize) -> (Self, MemoryStore) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let task = Self {
            receiver,
            records: HashMap::new(),
        };
        (task, MemoryStore { sender })
    }

    /// Processes requests until every client has been dropped.
    pub async fn run(mut self) {
        info!("order store started");
        while let Some(request) = self.receiver.recv().await {
            match request {
                StoreRequest::Get { key, respond_to } => {
                    let record = self.records.get(&key).cloned();
                    debug!(%key, found = record.is_some(), "get");
                    let _ = respond_to.send(Ok(record));
                }
                StoreRequest::Put { order, respond_to } => {
                    let key = order.key();
                    if self.records.contains_key(&key) {
                        warn!(%key, "put refused, record already exists");
                        let _ = respond_to.send(Err(StoreError::Duplicate(key.to_string())));
                        continue;
                    }
                    self.records.insert(key.clone(), order);
                    info!(%key, size = self.records.len(), "record created");
                    let _ = respond_to.send(Ok(()));
                }
                StoreRequest::Update {
                    key,
                    patch,
                    precondition,
                    respond_to,
                } => {
                    let _ = respond_to.send(self.apply_update(&key, patch, precondition));
                }
                StoreRequest::Query {
                    tenant_id,
                    respond_to,
                } => {
                    let records: Vec<Order> = self
                        .records
                        .values()
                        .filter(|order| order.tenant_id == tenant_id)
                        .cloned()
                        .collect();
                    debug!(%tenant_id, count = records.len(), "query");
                    let _ = respond_to.send(Ok(records));
                }
            }
        }
        info!(size = self.records.len(), "order store shut down");
    }

    /// Evaluates the precondition and applies the patch in one step.
    /// Runs inside the task loop, so nothing can interleave with it.
    fn apply_update(
        &mut self,
        key: &OrderKey,
        patch: OrderPatch,
        precondition: Precondition,
    ) -> Result<Order, StoreError> {
        let record = match self.records.get_mut(key) {
            Some(record) => record,
            None => {
                warn!(%key, "update refused, record not found");
                return Err(StoreError::NotFound(key.to_string()));
            }
        };

        let holds = match &precondition {
            Precondition::Exists => true,
            Precondition::TokenEquals(expected) => {
                record.continuation_token.as_ref() == Some(expected)
            }
        };
        if !holds {
            debug!(%key, "conditional update lost the race");
            return Err(StoreError::ConditionFailed);
        }

        if let Some(status) = patch.status {
            record.status = status;
        }
        if let Some(token) = patch.continuation_token {
            record.continuation_token = token;
        }
        if let Some(url) = patch.receipt_url {
            record.receipt_url = Some(url);
        }
        if let Some(updated_by) = patch.updated_by {
            record.updated_by = Some(updated_by);
        }
        if let Some(notes) = patch.notes {
            record.notes = notes;
        }
        if let Some(updated_at) = patch.updated_at {
            record.updated_at = updated_at;
        }

        info!(%key, status = %record.status, "record updated");
        Ok(record.clone())
    }
}

/// Client half of the in-memory store. Holds only a sender, so cloning
/// is cheap and clones share the same records.
#[derive(Clone)]
pub struct MemoryStore {
    sender: mpsc::Sender<StoreRequest>,
}

impl MemoryStore {
    async fn send<T>(
        &self,
        request: StoreRequest,
        response: oneshot::Receiver<Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        self.sender
            .send(request)
            .await
            .map_err(|_| StoreError::Backend("store task closed".into()))?;
        response
            .await
            .map_err(|_| StoreError::Backend("store task dropped response".into()))?
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn get(&self, key: &OrderKey) -> Result<Option<Order>, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.send(
            StoreRequest::Get {
                key: key.clone(),
                respond_to,
            },
            response,
        )
        .await
    }

    async fn put(&self, order: Order) -> Result<(), StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.send(StoreRequest::Put { order, respond_to }, response).await
    }

    async fn conditional_update(
        &self,
        key: &OrderKey,
        patch: OrderPatch,
        precondition: Precondition,
    ) -> Result<Order, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.send(
            StoreRequest::Update {
                key: key.clone(),
                patch,
                precondition,
                respond_to,
            },
            response,
        )
        .await
    }

    async fn query(&self, tenant_id: &TenantId) -> Result<Vec<Order>, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.send(
            StoreRequest::Query {
                tenant_id: tenant_id.clone(),
                respond_to,
            },
            response,
        )
        .await
    }
}
