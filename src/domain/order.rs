//! The order record and its line items.

use crate::domain::identity::TenantId;
use crate::domain::status::OrderStatus;
use crate::workflow::ContinuationToken;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique order identifier within a tenant.
///
/// A 128-bit random UUID, so collisions are negligible without any
/// coordination between request handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(Uuid);

impl OrderId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Composite key of an order record: `(tenant_id, order_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderKey {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
}

impl OrderKey {
    pub fn new(tenant_id: TenantId, order_id: OrderId) -> Self {
        Self {
            tenant_id,
            order_id,
        }
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tenant_id, self.order_id)
    }
}

/// How the customer receives the order. Decides the branch the lifecycle
/// takes after `PACKING`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryType {
    Delivery,
    Pickup,
}

/// One position on an order: a product reference, a quantity, and the
/// unit price frozen at ordering time.
///
/// Prices are [`Decimal`] throughout; money never touches a float in
/// this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

impl LineItem {
    /// Quantity times unit price, or `None` when the product overflows
    /// the decimal range. Overflow is a validation matter for the
    /// caller, not a panic.
    pub fn subtotal(&self) -> Option<Decimal> {
        Decimal::from(self.quantity).checked_mul(self.unit_price)
    }
}

/// Contact snapshot embedded in the order at creation time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// The central entity: one durable record per order.
///
/// Mutated only by the orchestrator's transition operations (status,
/// `continuation_token`, `updated_at` and the audit fields), plus a
/// single-field side channel for the document renderer (`receipt_url`).
/// Orders are never deleted by this system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub tenant_id: TenantId,
    pub order_id: OrderId,
    pub customer_email: String,
    pub items: Vec<LineItem>,
    pub total: Decimal,
    #[serde(default)]
    pub customer_info: Option<CustomerInfo>,
    pub delivery_type: DeliveryType,
    pub status: OrderStatus,
    /// The one outstanding continuation token, if a workflow branch is
    /// currently paused on this order. At most one at any time.
    #[serde(default)]
    pub continuation_token: Option<ContinuationToken>,
    /// Filled asynchronously by the external document renderer.
    #[serde(default)]
    pub receipt_url: Option<String>,
    /// Email of the staff member who performed the last advance.
    #[serde(default)]
    pub updated_by: Option<String>,
    /// Free-text carried along with the last registration or advance.
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Order {
    pub fn key(&self) -> OrderKey {
        OrderKey::new(self.tenant_id.clone(), self.order_id)
    }

    /// Sum of per-item subtotals, the amount `total` is validated
    /// against at creation time. `None` when any subtotal or the
    /// running sum overflows.
    pub fn items_total(items: &[LineItem]) -> Option<Decimal> {
        items.iter().try_fold(Decimal::ZERO, |sum, item| {
            sum.checked_add(item.subtotal()?)
        })
    }
}

/// Tolerance for comparing a supplied total against the item sum.
/// Fixed-point comparison, so anything under one cent is equal.
pub const TOTAL_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);
