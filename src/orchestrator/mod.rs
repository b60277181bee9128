//! The lifecycle orchestrator.
//!
//! Mediates between the order store and the workflow engine: creates
//! orders and starts their executions, records continuation tokens when
//! the workflow pauses, advances orders by redeeming those tokens, and
//! answers role-scoped status queries.
//!
//! The orchestrator holds no mutable state of its own. Every operation
//! is request-scoped; all cross-request coordination happens through the
//! store's conditional update. The ordering inside [`Orchestrator::advance_order`]
//! is the load-bearing part: the store commit (step 4) strictly precedes
//! token redemption (step 5), so a failure in between leaves the
//! user-visible state correct and produces a recorded anomaly rather
//! than a lost or duplicated transition.

pub mod anomaly;
pub mod error;
pub mod inbound;
pub mod view;

pub use anomaly::{AnomalySink, DesyncAnomaly, LogAnomalySink, RecordingAnomalySink};
pub use error::OrchestratorError;
pub use inbound::{InboundCallback, TokenRegistration};
pub use view::{OrderView, OrdersList, PublicOrder};

use crate::domain::{
    now_ms, CustomerInfo, DeliveryType, Identity, LineItem, Order, OrderId, OrderKey, OrderStatus,
    Role, TenantId, order::TOTAL_TOLERANCE,
};
use crate::notify::{LifecycleEvent, Notifier};
use crate::store::{OrderPatch, OrderStore, Precondition, StoreError};
use crate::workflow::{
    ContinuationToken, EngineError, ExecutionHandle, ExecutionInput, Outcome, WorkflowEngine,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Input for order creation.
#[derive(Debug, Clone)]
pub struct CreateOrderRequest {
    /// Must match the requester's resolved tenant; a mismatch is
    /// `Forbidden`, not silently corrected.
    pub tenant_id: TenantId,
    pub items: Vec<LineItem>,
    pub total: Decimal,
    pub delivery_type: DeliveryType,
    pub customer_info: Option<CustomerInfo>,
}

/// Result of order creation.
#[derive(Debug, Clone)]
pub struct CreateOrderResponse {
    pub order_id: OrderId,
    pub status: OrderStatus,
    /// `None` when the engine could not start an execution. The order
    /// exists regardless; a paid order is never rolled back because the
    /// workflow was unavailable.
    pub execution: Option<ExecutionHandle>,
}

/// Result of advancing an order one lifecycle step.
#[derive(Debug, Clone)]
pub struct AdvanceResponse {
    pub order_id: OrderId,
    pub new_status: OrderStatus,
}

/// The core component. All collaborators are constructor-injected so
/// tests can substitute in-memory ones.
pub struct Orchestrator {
    store: Arc<dyn OrderStore>,
    engine: Arc<dyn WorkflowEngine>,
    notifier: Arc<dyn Notifier>,
    anomalies: Arc<dyn AnomalySink>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn OrderStore>,
        engine: Arc<dyn WorkflowEngine>,
        notifier: Arc<dyn Notifier>,
        anomalies: Arc<dyn AnomalySink>,
    ) -> Self {
        Self {
            store,
            engine,
            notifier,
            anomalies,
        }
    }

    /// Creates an order and starts its workflow execution.
    ///
    /// The store write comes first and must succeed; the engine start is
    /// attempted only afterwards and is allowed to fail into a recorded
    /// degraded state (order without execution). The created event is
    /// fire-and-forget.
    #[instrument(skip(self, request), fields(tenant = %identity.tenant_id))]
    pub async fn create_order(
        &self,
        identity: &Identity,
        request: CreateOrderRequest,
    ) -> Result<CreateOrderResponse, OrchestratorError> {
        debug!(?request, "create_order called");
        if request.tenant_id != identity.tenant_id {
            return Err(OrchestratorError::Forbidden(
                "request tenant does not match caller tenant".into(),
            ));
        }
        validate_items(&request.items, request.total)?;

        let now = now_ms();
        let order = Order {
            tenant_id: identity.tenant_id.clone(),
            order_id: OrderId::generate(),
            customer_email: identity.email.clone(),
            items: request.items,
            total: request.total,
            customer_info: request.customer_info,
            delivery_type: request.delivery_type,
            status: OrderStatus::initial(),
            continuation_token: None,
            receipt_url: None,
            updated_by: None,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        let key = order.key();

        self.store
            .put(order.clone())
            .await
            .map_err(|e| OrchestratorError::upstream("create_order/put", e))?;
        info!(%key, "order record created");

        let input = ExecutionInput {
            order_id: order.order_id,
            tenant_id: order.tenant_id.clone(),
            customer_email: order.customer_email.clone(),
            items: order.items.clone(),
            total: order.total,
        };
        let execution = match self.engine.start(&key, input).await {
            Ok(handle) => Some(handle),
            Err(e) => {
                // Degraded, not fatal: the paid order outlives a flaky
                // engine. Reconciliation can start the execution later.
                warn!(%key, error = %e, "workflow start failed; order exists without execution");
                None
            }
        };

        self.publish(LifecycleEvent::OrderCreated {
            tenant_id: order.tenant_id.clone(),
            order_id: order.order_id,
            customer_email: order.customer_email.clone(),
        })
        .await;

        Ok(CreateOrderResponse {
            order_id: order.order_id,
            status: order.status,
            execution,
        })
    }

    /// Records a continuation token against an order when the workflow
    /// pauses at a wait step. Invoked by the engine, not by end users.
    ///
    /// Sets both the token and the order's status to the wait step's
    /// label, atomically, which is how the persisted status stays equal
    /// to "the step currently awaiting external action". An existing
    /// token is overwritten with a warning: the newest token wins, and a
    /// stale one fails harmlessly at the engine.
    #[instrument(skip(self, callback))]
    pub async fn register_token(
        &self,
        callback: InboundCallback,
    ) -> Result<(), OrchestratorError> {
        let registration = callback.normalize();
        debug!(?registration, "register_token called");

        let status: OrderStatus = registration
            .status_label
            .parse()
            .map_err(|e: crate::domain::status::UnknownStatusLabel| {
                OrchestratorError::validation("status_label", e.to_string())
            })?;
        let token = ContinuationToken::try_from(registration.token)
            .map_err(|e| OrchestratorError::validation("token", e.to_string()))?;
        let key = OrderKey::new(registration.tenant_id, registration.order_id);

        let existing = self
            .store
            .get(&key)
            .await
            .map_err(|e| OrchestratorError::upstream("register_token/get", e))?
            .ok_or_else(|| OrchestratorError::NotFound(key.to_string()))?;
        if existing.continuation_token.is_some() {
            warn!(%key, "overwriting outstanding continuation token; newest wins");
        }

        let patch = OrderPatch {
            status: Some(status),
            continuation_token: Some(Some(token)),
            notes: registration.message.map(Some),
            updated_at: Some(now_ms()),
            ..OrderPatch::default()
        };
        match self
            .store
            .conditional_update(&key, patch, Precondition::Exists)
            .await
        {
            Ok(_) => {
                info!(%key, %status, "continuation token registered");
                Ok(())
            }
            Err(StoreError::NotFound(k)) => Err(OrchestratorError::NotFound(k)),
            Err(e) => Err(OrchestratorError::upstream("register_token/update", e)),
        }
    }

    /// Advances an order one lifecycle step by redeeming its outstanding
    /// continuation token. Staff only, within the caller's own tenant.
    ///
    /// The next status is a pure lookup from the current status and the
    /// order's delivery type; callers never name a target state. The
    /// conditional write on the stored token is the sole
    /// concurrency-control point in the system: of any number of
    /// concurrent callers, exactly one advances the order.
    #[instrument(skip(self, identity, notes), fields(caller = %identity.email))]
    pub async fn advance_order(
        &self,
        identity: &Identity,
        tenant_id: &TenantId,
        order_id: OrderId,
        notes: Option<String>,
    ) -> Result<AdvanceResponse, OrchestratorError> {
        if identity.role != Role::Staff {
            return Err(OrchestratorError::Forbidden(
                "only STAFF may advance orders".into(),
            ));
        }
        if &identity.tenant_id != tenant_id {
            return Err(OrchestratorError::Forbidden(
                "caller belongs to a different tenant".into(),
            ));
        }
        let key = OrderKey::new(tenant_id.clone(), order_id);

        // Step 1: read.
        let order = self
            .store
            .get(&key)
            .await
            .map_err(|e| OrchestratorError::upstream("advance_order/get", e))?
            .ok_or_else(|| OrchestratorError::NotFound(key.to_string()))?;

        // Step 2: nothing to redeem means nothing to advance.
        let token = order.continuation_token.clone().ok_or_else(|| {
            OrchestratorError::InvalidState(
                "no continuation token outstanding; the workflow has not paused here \
                 or the order was already advanced"
                    .into(),
            )
        })?;

        // Step 3: pure next-state lookup.
        let next = order.status.next(order.delivery_type).ok_or_else(|| {
            OrchestratorError::InvalidState(format!("{} is terminal", order.status))
        })?;

        // Step 4: the one atomic commit, guarded by the token we read.
        let now = now_ms();
        // Notes are overwritten on every advance, cleared when absent,
        // so stale free-text is never attributed to a later step.
        let patch = OrderPatch {
            status: Some(next),
            continuation_token: Some(None),
            updated_by: Some(identity.email.clone()),
            notes: Some(notes.clone()),
            updated_at: Some(now),
            ..OrderPatch::default()
        };
        match self
            .store
            .conditional_update(&key, patch, Precondition::TokenEquals(token.clone()))
            .await
        {
            Ok(_) => {}
            Err(StoreError::ConditionFailed) => {
                debug!(%key, "lost the advance race");
                return Err(OrchestratorError::Conflict);
            }
            Err(StoreError::NotFound(k)) => return Err(OrchestratorError::NotFound(k)),
            Err(e) => return Err(OrchestratorError::upstream("advance_order/update", e)),
        }
        info!(%key, from = %order.status, to = %next, "order advanced");

        // Step 5: redeem only after the commit. A failure here leaves
        // the visible state correct and the execution desynchronized;
        // that is recorded, never retried blind.
        let payload = serde_json::json!({
            "order_id": order_id,
            "step": next,
            "completed_by": identity.email,
            "completed_at": now,
            "notes": notes,
        });
        if let Err(e) = self.engine.redeem(&token, Outcome::Success(payload)).await {
            warn!(%key, error = %e, "token redemption failed after committed advance");
            self.anomalies
                .record(DesyncAnomaly {
                    key: key.clone(),
                    committed_status: next,
                    token,
                    reason: e.to_string(),
                })
                .await;
        }

        self.publish(LifecycleEvent::OrderAdvanced {
            tenant_id: tenant_id.clone(),
            order_id,
            new_status: next,
            advanced_by: identity.email.clone(),
        })
        .await;

        Ok(AdvanceResponse {
            order_id,
            new_status: next,
        })
    }

    /// Lists orders visible to the caller: every order of the tenant for
    /// `STAFF`, only the caller's own orders for `CLIENTE`. The scoping
    /// runs entirely server-side from the resolved identity.
    #[instrument(skip(self, identity), fields(caller = %identity.email, role = %identity.role))]
    pub async fn list_orders(&self, identity: &Identity) -> Result<OrdersList, OrchestratorError> {
        let mut orders = self
            .store
            .query(&identity.tenant_id)
            .await
            .map_err(|e| OrchestratorError::upstream("list_orders/query", e))?;

        if identity.role == Role::Cliente {
            orders.retain(|order| order.customer_email == identity.email);
        }
        orders.sort_by_key(|order| order.created_at);
        debug!(count = orders.len(), "listing orders");

        Ok(OrdersList {
            orders: orders.into_iter().map(OrderView::from).collect(),
            role: identity.role,
        })
    }

    /// Public status lookup: the safe subset only.
    #[instrument(skip(self))]
    pub async fn get_order(
        &self,
        tenant_id: &TenantId,
        order_id: OrderId,
    ) -> Result<PublicOrder, OrchestratorError> {
        let key = OrderKey::new(tenant_id.clone(), order_id);
        let order = self
            .store
            .get(&key)
            .await
            .map_err(|e| OrchestratorError::upstream("get_order/get", e))?
            .ok_or_else(|| OrchestratorError::NotFound(key.to_string()))?;
        Ok(PublicOrder::from(order))
    }

    /// Single-field side channel for the external document renderer:
    /// records the rendered receipt's URL and touches nothing else.
    #[instrument(skip(self, url))]
    pub async fn attach_receipt(
        &self,
        tenant_id: &TenantId,
        order_id: OrderId,
        url: String,
    ) -> Result<(), OrchestratorError> {
        if url.is_empty() {
            return Err(OrchestratorError::validation(
                "receipt_url",
                "must not be empty",
            ));
        }
        let key = OrderKey::new(tenant_id.clone(), order_id);
        let patch = OrderPatch {
            receipt_url: Some(url),
            ..OrderPatch::default()
        };
        match self
            .store
            .conditional_update(&key, patch, Precondition::Exists)
            .await
        {
            Ok(_) => {
                info!(%key, "receipt attached");
                Ok(())
            }
            Err(StoreError::NotFound(k)) => Err(OrchestratorError::NotFound(k)),
            Err(e) => Err(OrchestratorError::upstream("attach_receipt/update", e)),
        }
    }

    /// Best-effort fan-out. Failures are logged and swallowed; no
    /// lifecycle operation depends on the notifier.
    async fn publish(&self, event: LifecycleEvent) {
        if let Err(e) = self.notifier.publish(&event).await {
            warn!(error = %e, "notification dropped");
        }
    }
}

/// Creation-time validation, all of it before any write.
fn validate_items(items: &[LineItem], total: Decimal) -> Result<(), OrchestratorError> {
    if items.is_empty() {
        return Err(OrchestratorError::validation(
            "items",
            "at least one line item is required",
        ));
    }
    for item in items {
        if item.quantity == 0 {
            return Err(OrchestratorError::validation(
                "items",
                format!("quantity for product {} must be at least 1", item.product_id),
            ));
        }
        if item.unit_price.is_sign_negative() {
            return Err(OrchestratorError::validation(
                "items",
                format!("unit price for product {} must not be negative", item.product_id),
            ));
        }
    }
    let computed = Order::items_total(items).ok_or_else(|| {
        OrchestratorError::validation("items", "item subtotals overflow the decimal range")
    })?;
    // A drift too large to even subtract is certainly not within
    // tolerance.
    let drift = total.checked_sub(computed).map(|d| d.abs());
    match drift {
        Some(drift) if drift < TOTAL_TOLERANCE => Ok(()),
        _ => Err(OrchestratorError::validation(
            "total",
            format!("total {total} does not match item sum {computed}"),
        )),
    }
}
