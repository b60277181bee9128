//! The order store seam.
//!
//! The storage engine itself is external; what this crate relies on is a
//! narrow contract: atomic single-record get/put, a conditional update
//! that either applies all of its fields or none of them, and a
//! tenant-scoped query. [`OrderStore`] captures exactly that contract,
//! and [`memory`] provides the in-process implementation used by tests
//! and local runs.
//!
//! The conditional update is the system's only concurrency-control
//! point: advancing an order is guarded by
//! [`Precondition::TokenEquals`], which stands in for a mutex on a
//! record that kitchen staff, packers, and couriers may race to update.

pub mod memory;

pub use memory::{MemoryStore, MemoryStoreTask};

use crate::domain::{Order, OrderKey, OrderStatus, TenantId};
use crate::workflow::ContinuationToken;
use async_trait::async_trait;

/// Errors surfaced by an order store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The precondition of a conditional update did not hold. For an
    /// advance this means another caller redeemed the token first.
    #[error("conditional update precondition failed")]
    ConditionFailed,

    /// No record under the given key.
    #[error("no order record under key {0}")]
    NotFound(String),

    /// A `put` hit an existing key. Creation is the only unconditional
    /// write, so this always indicates a caller bug.
    #[error("order record already exists under key {0}")]
    Duplicate(String),

    /// The backend was unreachable or failed internally.
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Partial update applied atomically by `conditional_update`.
///
/// `None` leaves a field untouched. The token and notes fields are
/// doubly optional: `Some(None)` clears the field, `Some(Some(v))`
/// replaces it.
#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    pub continuation_token: Option<Option<ContinuationToken>>,
    pub receipt_url: Option<String>,
    pub updated_by: Option<String>,
    pub notes: Option<Option<String>>,
    pub updated_at: Option<i64>,
}

/// Guard evaluated atomically with the patch it protects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// The record merely has to exist.
    Exists,
    /// The stored continuation token must still equal the given one.
    /// This is the optimistic-concurrency guard for order advancement.
    TokenEquals(ContinuationToken),
}

/// Contract consumed from the order storage engine.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Fetches one record, or `None` if absent.
    async fn get(&self, key: &OrderKey) -> Result<Option<Order>, StoreError>;

    /// Unconditional write, used for creation only.
    async fn put(&self, order: Order) -> Result<(), StoreError>;

    /// Applies `patch` to the record under `key` if `precondition`
    /// holds, atomically: no partial writes, no lost intermediate
    /// state. Returns the updated record.
    async fn conditional_update(
        &self,
        key: &OrderKey,
        patch: OrderPatch,
        precondition: Precondition,
    ) -> Result<Order, StoreError>;

    /// All records of one tenant.
    async fn query(&self, tenant_id: &TenantId) -> Result<Vec<Order>, StoreError>;
}
