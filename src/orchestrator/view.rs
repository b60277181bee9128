//! Outbound shapes for status queries.
//!
//! Two rules govern everything here. Monetary fields leave the system in
//! rust_decimal's string serde representation, never as a raw float or a
//! storage-layer numeric. And the continuation token never appears in
//! any view: it is a capability, not data.

use crate::domain::{CustomerInfo, DeliveryType, LineItem, Order, OrderId, OrderStatus, Role};
use rust_decimal::Decimal;
use serde::Serialize;

/// Full order view returned to authenticated listings.
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub items: Vec<LineItem>,
    pub total: Decimal,
    pub customer_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_info: Option<CustomerInfo>,
    pub delivery_type: DeliveryType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Order> for OrderView {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.order_id,
            status: order.status,
            items: order.items,
            total: order.total,
            customer_email: order.customer_email,
            customer_info: order.customer_info,
            delivery_type: order.delivery_type,
            receipt_url: order.receipt_url,
            notes: order.notes,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// Result of a role-scoped listing: the visible orders plus the role the
/// scoping was computed under.
#[derive(Debug, Serialize)]
pub struct OrdersList {
    pub orders: Vec<OrderView>,
    pub role: Role,
}

/// Public subset of an order, safe to return without authentication.
#[derive(Debug, Clone, Serialize)]
pub struct PublicOrder {
    pub order_id: OrderId,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_url: Option<String>,
    pub created_at: i64,
    pub delivery_type: DeliveryType,
}

impl From<Order> for PublicOrder {
    fn from(order: Order) -> Self {
        Self {
            order_id: order.order_id,
            status: order.status,
            receipt_url: order.receipt_url,
            created_at: order.created_at,
            delivery_type: order.delivery_type,
        }
    }
}
