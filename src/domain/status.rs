//! The order lifecycle state machine.
//!
//! Statuses move forward through a fixed sequence and never backward:
//!
//! ```text
//! RECEIVED -> IN_KITCHEN -> PACKING -> IN_DELIVERY       -> COMPLETED
//!                                   \> READY_FOR_PICKUP  -> COMPLETED
//! ```
//!
//! The branch after `PACKING` is chosen by the order's [`DeliveryType`],
//! never by a caller. [`OrderStatus::next`] is the only transition
//! function in the system; there is deliberately no "set status to X"
//! operation anywhere in the public API, since that would let a caller
//! skip or replay lifecycle steps.

use crate::domain::order::DeliveryType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single step in the order lifecycle.
///
/// Serialized (and displayed) using the wire labels `RECEIVED`,
/// `IN_KITCHEN`, `PACKING`, `IN_DELIVERY`, `READY_FOR_PICKUP`,
/// `COMPLETED`. These labels are also what the workflow engine sends in
/// its token-registration callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Received,
    InKitchen,
    Packing,
    InDelivery,
    ReadyForPickup,
    Completed,
}

impl OrderStatus {
    /// The status a new order starts in.
    pub const fn initial() -> Self {
        OrderStatus::Received
    }

    /// Computes the next lifecycle step for an order of the given
    /// delivery type. Returns `None` when the current status is terminal.
    pub fn next(self, delivery_type: DeliveryType) -> Option<OrderStatus> {
        use OrderStatus::*;
        match self {
            Received => Some(InKitchen),
            InKitchen => Some(Packing),
            Packing => Some(match delivery_type {
                DeliveryType::Delivery => InDelivery,
                DeliveryType::Pickup => ReadyForPickup,
            }),
            InDelivery | ReadyForPickup => Some(Completed),
            Completed => None,
        }
    }

    /// Whether no further transitions are possible from this status.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed)
    }

    /// The wire label for this status.
    pub fn label(self) -> &'static str {
        match self {
            OrderStatus::Received => "RECEIVED",
            OrderStatus::InKitchen => "IN_KITCHEN",
            OrderStatus::Packing => "PACKING",
            OrderStatus::InDelivery => "IN_DELIVERY",
            OrderStatus::ReadyForPickup => "READY_FOR_PICKUP",
            OrderStatus::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when parsing an unrecognized status label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status label: {0}")]
pub struct UnknownStatusLabel(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatusLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RECEIVED" => Ok(OrderStatus::Received),
            "IN_KITCHEN" => Ok(OrderStatus::InKitchen),
            "PACKING" => Ok(OrderStatus::Packing),
            "IN_DELIVERY" => Ok(OrderStatus::InDelivery),
            "READY_FOR_PICKUP" => Ok(OrderStatus::ReadyForPickup),
            "COMPLETED" => Ok(OrderStatus::Completed),
            other => Err(UnknownStatusLabel(other.to_string())),
        }
    }
}
