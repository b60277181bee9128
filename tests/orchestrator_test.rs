//! Orchestrator behavior against in-memory collaborators: creation,
//! token registration, advancement, and the failure paths around them.

use order_lifecycle::domain::{DeliveryType, Identity, LineItem, OrderId, Role, TenantId};
use order_lifecycle::notify::LifecycleEvent;
use order_lifecycle::orchestrator::{
    CreateOrderRequest, InboundCallback, OrchestratorError, TokenRegistration,
};
use order_lifecycle::runtime::LifecycleSystem;
use order_lifecycle::OrderStatus;
use rust_decimal::Decimal;

fn cliente(email: &str, tenant: &str) -> Identity {
    Identity::new(email, Role::Cliente, tenant)
}

fn staff(email: &str, tenant: &str) -> Identity {
    Identity::new(email, Role::Staff, tenant)
}

fn line_item(price: Decimal, quantity: u32) -> LineItem {
    LineItem {
        product_id: "maki-clasico".to_string(),
        name: "Maki clásico".to_string(),
        quantity,
        unit_price: price,
    }
}

fn request(tenant: &str, total: Decimal, delivery_type: DeliveryType) -> CreateOrderRequest {
    CreateOrderRequest {
        tenant_id: TenantId::from(tenant),
        items: vec![line_item(Decimal::new(1000, 2), 2)],
        total,
        delivery_type,
        customer_info: None,
    }
}

/// Creates an order as `a@x.com` and returns its id.
async fn create_order(
    system: &LifecycleSystem,
    tenant: &str,
    delivery_type: DeliveryType,
) -> OrderId {
    system
        .orchestrator
        .create_order(
            &cliente("a@x.com", tenant),
            request(tenant, Decimal::new(2000, 2), delivery_type),
        )
        .await
        .expect("order creation failed")
        .order_id
}

/// Simulates the engine pausing: issues a token and registers it with
/// the given wait-step label.
async fn pause_at(
    system: &LifecycleSystem,
    tenant: &str,
    order_id: OrderId,
    label: &str,
) -> order_lifecycle::workflow::ContinuationToken {
    let key = order_lifecycle::domain::OrderKey::new(TenantId::from(tenant), order_id);
    let token = system.engine.pause(&key);
    system
        .orchestrator
        .register_token(InboundCallback::from(TokenRegistration {
            order_id,
            tenant_id: TenantId::from(tenant),
            token: token.as_str().to_string(),
            status_label: label.to_string(),
            message: None,
        }))
        .await
        .expect("token registration failed");
    token
}

#[tokio::test]
async fn create_then_get_returns_received_with_no_receipt() {
    let system = LifecycleSystem::new();
    let order_id = create_order(&system, "sede-1", DeliveryType::Delivery).await;

    let public = system
        .orchestrator
        .get_order(&TenantId::from("sede-1"), order_id)
        .await
        .unwrap();
    assert_eq!(public.status, OrderStatus::Received);
    assert_eq!(public.receipt_url, None);
    assert_eq!(public.delivery_type, DeliveryType::Delivery);

    // The execution was started and keyed by the order.
    let executions = system.engine.executions();
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].0.order_id, order_id);
}

#[tokio::test]
async fn creation_checks_total_against_item_sum() {
    let system = LifecycleSystem::new();
    let identity = cliente("a@x.com", "sede-1");

    // items = [{10.00 x 2}], total = 20.00 -> accepted
    let ok = system
        .orchestrator
        .create_order(&identity, request("sede-1", Decimal::new(2000, 2), DeliveryType::Pickup))
        .await;
    assert_eq!(ok.unwrap().status, OrderStatus::Received);

    // same items, total = 19.00 -> rejected before any write
    let err = system
        .orchestrator
        .create_order(&identity, request("sede-1", Decimal::new(1900, 2), DeliveryType::Pickup))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::Validation { field: "total", .. }
    ));
}

#[tokio::test]
async fn creation_rejects_overflowing_prices_without_panicking() {
    let system = LifecycleSystem::new();
    let err = system
        .orchestrator
        .create_order(
            &cliente("a@x.com", "sede-1"),
            CreateOrderRequest {
                tenant_id: TenantId::from("sede-1"),
                items: vec![line_item(Decimal::MAX, 2)],
                total: Decimal::MAX,
                delivery_type: DeliveryType::Pickup,
                customer_info: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrchestratorError::Validation { field: "items", .. }
    ));
    assert!(system.engine.executions().is_empty());
}

#[tokio::test]
async fn creation_rejects_foreign_tenant_requests() {
    let system = LifecycleSystem::new();
    let err = system
        .orchestrator
        .create_order(
            &cliente("a@x.com", "sede-1"),
            request("sede-2", Decimal::new(2000, 2), DeliveryType::Pickup),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::Forbidden(_)));
    assert!(system.engine.executions().is_empty());
}

#[tokio::test]
async fn engine_start_failure_degrades_instead_of_rolling_back() {
    let system = LifecycleSystem::new();
    system.engine.fail_next_start();

    let created = system
        .orchestrator
        .create_order(
            &cliente("a@x.com", "sede-1"),
            request("sede-1", Decimal::new(2000, 2), DeliveryType::Delivery),
        )
        .await
        .unwrap();

    // No execution, but the order row exists with RECEIVED status.
    assert!(created.execution.is_none());
    let public = system
        .orchestrator
        .get_order(&TenantId::from("sede-1"), created.order_id)
        .await
        .unwrap();
    assert_eq!(public.status, OrderStatus::Received);
}

#[tokio::test]
async fn advance_without_outstanding_token_is_invalid_state() {
    let system = LifecycleSystem::new();
    let order_id = create_order(&system, "sede-1", DeliveryType::Delivery).await;

    let err = system
        .orchestrator
        .advance_order(&staff("s@x.com", "sede-1"), &TenantId::from("sede-1"), order_id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::InvalidState(_)));
}

#[tokio::test]
async fn advance_requires_staff_in_the_same_tenant() {
    let system = LifecycleSystem::new();
    let order_id = create_order(&system, "sede-1", DeliveryType::Delivery).await;
    pause_at(&system, "sede-1", order_id, "IN_KITCHEN").await;

    let as_cliente = system
        .orchestrator
        .advance_order(&cliente("a@x.com", "sede-1"), &TenantId::from("sede-1"), order_id, None)
        .await
        .unwrap_err();
    assert!(matches!(as_cliente, OrchestratorError::Forbidden(_)));

    let wrong_tenant = system
        .orchestrator
        .advance_order(&staff("s@x.com", "sede-2"), &TenantId::from("sede-1"), order_id, None)
        .await
        .unwrap_err();
    assert!(matches!(wrong_tenant, OrchestratorError::Forbidden(_)));
}

#[tokio::test]
async fn registered_token_advances_then_demands_a_fresh_token() {
    let system = LifecycleSystem::new();
    let order_id = create_order(&system, "sede-1", DeliveryType::Delivery).await;
    let token = pause_at(&system, "sede-1", order_id, "IN_KITCHEN").await;

    let advanced = system
        .orchestrator
        .advance_order(
            &staff("s@x.com", "sede-1"),
            &TenantId::from("sede-1"),
            order_id,
            Some("sin wasabi".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(advanced.new_status, OrderStatus::Packing);

    // Token redeemed exactly once, cleared from the record.
    assert!(!system.engine.is_outstanding(&token));
    let key = order_lifecycle::domain::OrderKey::new(TenantId::from("sede-1"), order_id);
    let stored = system.order(&key).await.unwrap();
    assert_eq!(stored.continuation_token, None);
    assert_eq!(stored.status, OrderStatus::Packing);
    assert_eq!(stored.updated_by.as_deref(), Some("s@x.com"));
    assert_eq!(stored.notes.as_deref(), Some("sin wasabi"));

    // A second advance before the workflow pauses again has nothing to
    // redeem.
    let err = system
        .orchestrator
        .advance_order(&staff("s@x.com", "sede-1"), &TenantId::from("sede-1"), order_id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::InvalidState(_)));
}

#[tokio::test]
async fn advance_without_notes_clears_registration_notes() {
    let system = LifecycleSystem::new();
    let order_id = create_order(&system, "sede-1", DeliveryType::Delivery).await;

    let key = order_lifecycle::domain::OrderKey::new(TenantId::from("sede-1"), order_id);
    let token = system.engine.pause(&key);
    system
        .orchestrator
        .register_token(InboundCallback::from(TokenRegistration {
            order_id,
            tenant_id: TenantId::from("sede-1"),
            token: token.as_str().to_string(),
            status_label: "IN_KITCHEN".to_string(),
            message: Some("Pedido en cocina".to_string()),
        }))
        .await
        .unwrap();
    let stored = system.order(&key).await.unwrap();
    assert_eq!(stored.notes.as_deref(), Some("Pedido en cocina"));

    // A note-less advance must not leave the registration message
    // attributed to the new step.
    system
        .orchestrator
        .advance_order(&staff("s@x.com", "sede-1"), &TenantId::from("sede-1"), order_id, None)
        .await
        .unwrap();
    let stored = system.order(&key).await.unwrap();
    assert_eq!(stored.status, OrderStatus::Packing);
    assert_eq!(stored.notes, None);
    assert_eq!(stored.updated_by.as_deref(), Some("s@x.com"));
}

#[tokio::test]
async fn pickup_orders_branch_to_ready_for_pickup() {
    let system = LifecycleSystem::new();
    let order_id = create_order(&system, "sede-1", DeliveryType::Pickup).await;
    let operator = staff("s@x.com", "sede-1");
    let tenant = TenantId::from("sede-1");

    pause_at(&system, "sede-1", order_id, "IN_KITCHEN").await;
    system
        .orchestrator
        .advance_order(&operator, &tenant, order_id, None)
        .await
        .unwrap();

    pause_at(&system, "sede-1", order_id, "PACKING").await;
    let after_packing = system
        .orchestrator
        .advance_order(&operator, &tenant, order_id, None)
        .await
        .unwrap();
    assert_eq!(after_packing.new_status, OrderStatus::ReadyForPickup);
}

#[tokio::test]
async fn delivery_orders_branch_to_in_delivery() {
    let system = LifecycleSystem::new();
    let order_id = create_order(&system, "sede-1", DeliveryType::Delivery).await;
    let operator = staff("s@x.com", "sede-1");
    let tenant = TenantId::from("sede-1");

    pause_at(&system, "sede-1", order_id, "IN_KITCHEN").await;
    system
        .orchestrator
        .advance_order(&operator, &tenant, order_id, None)
        .await
        .unwrap();

    pause_at(&system, "sede-1", order_id, "PACKING").await;
    let after_packing = system
        .orchestrator
        .advance_order(&operator, &tenant, order_id, None)
        .await
        .unwrap();
    assert_eq!(after_packing.new_status, OrderStatus::InDelivery);
}

#[tokio::test]
async fn duplicate_registration_overwrites_and_newest_token_wins() {
    let system = LifecycleSystem::new();
    let order_id = create_order(&system, "sede-1", DeliveryType::Delivery).await;

    let first = pause_at(&system, "sede-1", order_id, "IN_KITCHEN").await;
    let second = pause_at(&system, "sede-1", order_id, "IN_KITCHEN").await;
    assert_ne!(first, second);

    let key = order_lifecycle::domain::OrderKey::new(TenantId::from("sede-1"), order_id);
    let stored = system.order(&key).await.unwrap();
    assert_eq!(stored.continuation_token.as_ref(), Some(&second));

    // Advancing redeems the newest token; the stale one stays
    // unredeemed at the engine and would fail harmlessly there.
    system
        .orchestrator
        .advance_order(&staff("s@x.com", "sede-1"), &TenantId::from("sede-1"), order_id, None)
        .await
        .unwrap();
    assert!(!system.engine.is_outstanding(&second));
    assert!(system.engine.is_outstanding(&first));
}

#[tokio::test]
async fn registration_rejects_unknown_labels_and_empty_tokens() {
    let system = LifecycleSystem::new();
    let order_id = create_order(&system, "sede-1", DeliveryType::Delivery).await;

    let bad_label = system
        .orchestrator
        .register_token(InboundCallback::from(TokenRegistration {
            order_id,
            tenant_id: TenantId::from("sede-1"),
            token: "tok-1".to_string(),
            status_label: "EN_COCINA".to_string(),
            message: None,
        }))
        .await
        .unwrap_err();
    assert!(matches!(
        bad_label,
        OrchestratorError::Validation { field: "status_label", .. }
    ));

    let empty_token = system
        .orchestrator
        .register_token(InboundCallback::from(TokenRegistration {
            order_id,
            tenant_id: TenantId::from("sede-1"),
            token: String::new(),
            status_label: "IN_KITCHEN".to_string(),
            message: None,
        }))
        .await
        .unwrap_err();
    assert!(matches!(
        empty_token,
        OrchestratorError::Validation { field: "token", .. }
    ));
}

#[tokio::test]
async fn registration_against_unknown_order_is_not_found() {
    let system = LifecycleSystem::new();
    let err = system
        .orchestrator
        .register_token(InboundCallback::from(TokenRegistration {
            order_id: OrderId::generate(),
            tenant_id: TenantId::from("sede-1"),
            token: "tok-1".to_string(),
            status_label: "IN_KITCHEN".to_string(),
            message: None,
        }))
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::NotFound(_)));
}

#[tokio::test]
async fn concurrent_advances_move_the_order_forward_exactly_once() {
    let system = LifecycleSystem::new();
    let order_id = create_order(&system, "sede-1", DeliveryType::Delivery).await;
    pause_at(&system, "sede-1", order_id, "IN_KITCHEN").await;

    let system = std::sync::Arc::new(system);
    let mut handles = Vec::new();
    for i in 0..4 {
        let system = system.clone();
        handles.push(tokio::spawn(async move {
            system
                .orchestrator
                .advance_order(
                    &staff(&format!("s{i}@x.com"), "sede-1"),
                    &TenantId::from("sede-1"),
                    order_id,
                    None,
                )
                .await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(advanced) => {
                successes += 1;
                assert_eq!(advanced.new_status, OrderStatus::Packing);
            }
            // Losers either hit the conditional write (Conflict) or
            // read the record after the winner cleared the token
            // (InvalidState). Both are "refresh and decide again".
            Err(OrchestratorError::Conflict) | Err(OrchestratorError::InvalidState(_)) => {}
            Err(other) => panic!("unexpected advance failure: {other}"),
        }
    }
    assert_eq!(successes, 1, "exactly one racer may advance the order");

    // Status moved forward exactly one step.
    let key = order_lifecycle::domain::OrderKey::new(TenantId::from("sede-1"), order_id);
    let stored = system.order(&key).await.unwrap();
    assert_eq!(stored.status, OrderStatus::Packing);
    assert_eq!(system.engine.redeemed().len(), 1);
}

#[tokio::test]
async fn losing_the_conditional_write_surfaces_conflict() {
    use async_trait::async_trait;
    use order_lifecycle::domain::{Order, OrderKey};
    use order_lifecycle::notify::LogNotifier;
    use order_lifecycle::orchestrator::{Orchestrator, RecordingAnomalySink};
    use order_lifecycle::store::{
        MemoryStore, MemoryStoreTask, OrderPatch, OrderStore, Precondition, StoreError,
    };
    use order_lifecycle::workflow::InMemoryEngine;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Store wrapper that interposes a competing advance between the
    /// orchestrator's read and its conditional write, serializing the
    /// race deterministically.
    struct ContendedStore {
        inner: MemoryStore,
        contended: AtomicBool,
    }

    #[async_trait]
    impl OrderStore for ContendedStore {
        async fn get(&self, key: &OrderKey) -> Result<Option<Order>, StoreError> {
            self.inner.get(key).await
        }

        async fn put(&self, order: Order) -> Result<(), StoreError> {
            self.inner.put(order).await
        }

        async fn conditional_update(
            &self,
            key: &OrderKey,
            patch: OrderPatch,
            precondition: Precondition,
        ) -> Result<Order, StoreError> {
            if let Precondition::TokenEquals(_) = &precondition {
                if !self.contended.swap(true, Ordering::SeqCst) {
                    // The other staff member gets there first.
                    let competing = OrderPatch {
                        status: Some(OrderStatus::Packing),
                        continuation_token: Some(None),
                        ..OrderPatch::default()
                    };
                    self.inner
                        .conditional_update(key, competing, precondition.clone())
                        .await?;
                }
            }
            self.inner.conditional_update(key, patch, precondition).await
        }

        async fn query(&self, tenant_id: &TenantId) -> Result<Vec<Order>, StoreError> {
            self.inner.query(tenant_id).await
        }
    }

    let (store_task, memory_store) = MemoryStoreTask::new(32);
    tokio::spawn(store_task.run());
    let engine = InMemoryEngine::new();
    let orchestrator = Orchestrator::new(
        Arc::new(ContendedStore {
            inner: memory_store.clone(),
            contended: AtomicBool::new(false),
        }),
        Arc::new(engine.clone()),
        Arc::new(LogNotifier),
        Arc::new(RecordingAnomalySink::new()),
    );

    let created = orchestrator
        .create_order(
            &cliente("a@x.com", "sede-1"),
            request("sede-1", Decimal::new(2000, 2), DeliveryType::Delivery),
        )
        .await
        .unwrap();
    let key = OrderKey::new(TenantId::from("sede-1"), created.order_id);
    let token = engine.pause(&key);
    orchestrator
        .register_token(InboundCallback::from(TokenRegistration {
            order_id: created.order_id,
            tenant_id: TenantId::from("sede-1"),
            token: token.as_str().to_string(),
            status_label: "IN_KITCHEN".to_string(),
            message: None,
        }))
        .await
        .unwrap();

    let err = orchestrator
        .advance_order(&staff("s@x.com", "sede-1"), &TenantId::from("sede-1"), created.order_id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::Conflict));
}

#[tokio::test]
async fn redeem_failure_after_commit_records_an_anomaly() {
    let system = LifecycleSystem::new();
    let order_id = create_order(&system, "sede-1", DeliveryType::Delivery).await;
    pause_at(&system, "sede-1", order_id, "IN_KITCHEN").await;

    system.engine.set_fail_redeem(true);
    let advanced = system
        .orchestrator
        .advance_order(&staff("s@x.com", "sede-1"), &TenantId::from("sede-1"), order_id, None)
        .await
        .unwrap();

    // The caller still sees the committed state...
    assert_eq!(advanced.new_status, OrderStatus::Packing);
    let public = system
        .orchestrator
        .get_order(&TenantId::from("sede-1"), order_id)
        .await
        .unwrap();
    assert_eq!(public.status, OrderStatus::Packing);

    // ...and the desync is on record for reconciliation.
    let anomalies = system.anomalies.anomalies();
    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].committed_status, OrderStatus::Packing);
    assert_eq!(anomalies[0].key.order_id, order_id);
}

#[tokio::test]
async fn listing_is_scoped_by_role_and_tenant() {
    let system = LifecycleSystem::new();

    // Two orders in sede-1, one of them for a@x.com, plus an order for
    // the same email in a different tenant.
    create_order(&system, "sede-1", DeliveryType::Delivery).await;
    system
        .orchestrator
        .create_order(
            &cliente("b@x.com", "sede-1"),
            request("sede-1", Decimal::new(2000, 2), DeliveryType::Pickup),
        )
        .await
        .unwrap();
    create_order(&system, "sede-2", DeliveryType::Pickup).await;

    let staff_list = system
        .orchestrator
        .list_orders(&staff("s@x.com", "sede-1"))
        .await
        .unwrap();
    assert_eq!(staff_list.role, Role::Staff);
    assert_eq!(staff_list.orders.len(), 2);

    let cliente_list = system
        .orchestrator
        .list_orders(&cliente("a@x.com", "sede-1"))
        .await
        .unwrap();
    assert_eq!(cliente_list.role, Role::Cliente);
    assert_eq!(cliente_list.orders.len(), 1);
    assert_eq!(cliente_list.orders[0].customer_email, "a@x.com");
}

#[tokio::test]
async fn receipt_side_channel_touches_only_the_receipt() {
    let system = LifecycleSystem::new();
    let order_id = create_order(&system, "sede-1", DeliveryType::Delivery).await;

    system
        .orchestrator
        .attach_receipt(
            &TenantId::from("sede-1"),
            order_id,
            "https://receipts.example/r.html".to_string(),
        )
        .await
        .unwrap();

    let public = system
        .orchestrator
        .get_order(&TenantId::from("sede-1"), order_id)
        .await
        .unwrap();
    assert_eq!(
        public.receipt_url.as_deref(),
        Some("https://receipts.example/r.html")
    );
    assert_eq!(public.status, OrderStatus::Received);

    let missing = system
        .orchestrator
        .attach_receipt(
            &TenantId::from("sede-1"),
            OrderId::generate(),
            "https://receipts.example/r.html".to_string(),
        )
        .await
        .unwrap_err();
    assert!(matches!(missing, OrchestratorError::NotFound(_)));
}

#[tokio::test]
async fn notifier_failures_never_fail_the_operation() {
    let system = LifecycleSystem::new();
    system.notifier.set_fail(true);

    let order_id = create_order(&system, "sede-1", DeliveryType::Delivery).await;
    pause_at(&system, "sede-1", order_id, "IN_KITCHEN").await;
    system
        .orchestrator
        .advance_order(&staff("s@x.com", "sede-1"), &TenantId::from("sede-1"), order_id, None)
        .await
        .unwrap();

    assert!(system.notifier.events().is_empty());
}

#[tokio::test]
async fn lifecycle_events_are_published_in_order() {
    let system = LifecycleSystem::new();
    let order_id = create_order(&system, "sede-1", DeliveryType::Delivery).await;
    pause_at(&system, "sede-1", order_id, "IN_KITCHEN").await;
    system
        .orchestrator
        .advance_order(&staff("s@x.com", "sede-1"), &TenantId::from("sede-1"), order_id, None)
        .await
        .unwrap();

    let events = system.notifier.events();
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], LifecycleEvent::OrderCreated { .. }));
    assert!(matches!(
        events[1],
        LifecycleEvent::OrderAdvanced {
            new_status: OrderStatus::Packing,
            ..
        }
    ));
}
