//! # Order Lifecycle Orchestrator
//!
//! Coordinates the lifecycle of a retail order from creation through
//! delivery across a durable order store and an external workflow engine
//! that pauses at wait steps and resumes via one-time continuation
//! tokens.
//!
//! ## The model
//!
//! An order is a state machine walking a fixed forward sequence
//! (`RECEIVED → IN_KITCHEN → PACKING → IN_DELIVERY | READY_FOR_PICKUP →
//! COMPLETED`). Progress is engine-driven: when the workflow pauses it
//! registers a continuation token against the order, and staff advance
//! the order by redeeming that token. The next state is always a pure
//! lookup from the current state and the delivery type; no caller ever
//! names a target state, which is what makes skipping and replaying
//! steps impossible by construction.
//!
//! ## Concurrency
//!
//! The orchestrator is stateless between requests. Many staff members
//! may race to advance the same order; the race is settled by a single
//! conditional store write guarded by the stored token
//! ([`store::Precondition::TokenEquals`]). Exactly one caller wins, the
//! rest get a retryable [`orchestrator::OrchestratorError::Conflict`].
//!
//! ## Module tour
//!
//! - [`domain`]: orders, line items, statuses, identities. Pure data.
//! - [`store`]: the [`store::OrderStore`] seam and the in-memory
//!   message-loop implementation whose sequential processing provides
//!   the atomicity the contract requires.
//! - [`workflow`]: the [`workflow::WorkflowEngine`] seam, opaque
//!   continuation tokens, and the in-memory engine.
//! - [`notify`]: best-effort lifecycle event fan-out.
//! - [`orchestrator`]: the core: create, register-token, advance,
//!   role-scoped queries, the receipt side channel, the error taxonomy,
//!   and desync anomaly recording.
//! - [`runtime`]: wiring ([`runtime::LifecycleSystem`]) and tracing
//!   setup.
//!
//! ## Quick start
//!
//! ```no_run
//! use order_lifecycle::domain::{DeliveryType, Identity, LineItem, Role, TenantId};
//! use order_lifecycle::orchestrator::CreateOrderRequest;
//! use order_lifecycle::runtime::LifecycleSystem;
//! use rust_decimal::Decimal;
//!
//! #[tokio::main]
//! async fn main() {
//!     let system = LifecycleSystem::new();
//!     let cliente = Identity::new("a@x.com", Role::Cliente, "sede-1");
//!
//!     let created = system
//!         .orchestrator
//!         .create_order(&cliente, CreateOrderRequest {
//!             tenant_id: TenantId::from("sede-1"),
//!             items: vec![LineItem {
//!                 product_id: "maki-clasico".into(),
//!                 name: "Maki clásico".into(),
//!                 quantity: 2,
//!                 unit_price: Decimal::new(1000, 2),
//!             }],
//!             total: Decimal::new(2000, 2),
//!             delivery_type: DeliveryType::Delivery,
//!             customer_info: None,
//!         })
//!         .await
//!         .unwrap();
//!     println!("order {} is {}", created.order_id, created.status);
//! }
//! ```

pub mod domain;
pub mod notify;
pub mod orchestrator;
pub mod runtime;
pub mod store;
pub mod workflow;

pub use domain::{DeliveryType, Identity, Order, OrderId, OrderStatus, Role, TenantId};
pub use orchestrator::{Orchestrator, OrchestratorError};
