//! Domain model: orders, line items, lifecycle statuses, and identities.
//!
//! Everything in this module is plain data plus pure logic. No I/O, no
//! channels, no clocks other than [`now_ms`]. The orchestrator and the
//! store both depend on these types; nothing here depends on them.

pub mod identity;
pub mod order;
pub mod status;

pub use identity::{Identity, Role, TenantId};
pub use order::{CustomerInfo, DeliveryType, LineItem, Order, OrderId, OrderKey};
pub use status::OrderStatus;

/// Current wall-clock time in milliseconds since the Unix epoch.
///
/// Order timestamps are stored in this representation end to end, so the
/// conversion happens exactly once, here.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
