//! Normalization of the engine's token-registration callback.
//!
//! The callback can arrive two ways: as a direct invocation carrying the
//! registration fields at the top level, or routed through an event bus
//! that wraps the same fields in a `detail` envelope. Rather than
//! probing a loose map for both shapes at every use site, the boundary
//! parses into one tagged union and a single [`InboundCallback::normalize`]
//! step produces the canonical [`TokenRegistration`] the orchestrator
//! works with.

use crate::domain::{OrderId, TenantId};
use serde::{Deserialize, Serialize};

/// Canonical token-registration request, whatever its origin.
///
/// `token` stays a raw string here: this type is the wire boundary, and
/// validation into a [`crate::workflow::ContinuationToken`] happens in
/// the orchestrator where the failure can be reported per-field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRegistration {
    pub order_id: OrderId,
    pub tenant_id: TenantId,
    pub token: String,
    /// Wire label of the wait step this registration represents,
    /// e.g. `IN_KITCHEN`.
    pub status_label: String,
    /// Optional operator-facing message stored alongside the order.
    #[serde(default)]
    pub message: Option<String>,
}

/// The two shapes a callback payload can take on the wire.
///
/// Deserialization tries the bus envelope first; a payload with a
/// `detail` object is unambiguous, everything else must parse as a
/// direct registration or fail loudly.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum InboundCallback {
    Bus { detail: TokenRegistration },
    Direct(TokenRegistration),
}

impl InboundCallback {
    /// Collapses either origin into the canonical registration.
    pub fn normalize(self) -> TokenRegistration {
        match self {
            InboundCallback::Bus { detail } => detail,
            InboundCallback::Direct(registration) => registration,
        }
    }
}

impl From<TokenRegistration> for InboundCallback {
    fn from(registration: TokenRegistration) -> Self {
        InboundCallback::Direct(registration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_payload_normalizes() {
        let raw = serde_json::json!({
            "order_id": "8f2a1de4-2c3b-4f6d-9a4e-5b1c2d3e4f50",
            "tenant_id": "sede-1",
            "token": "tok-1",
            "status_label": "IN_KITCHEN"
        });
        let callback: InboundCallback = serde_json::from_value(raw).unwrap();
        let registration = callback.normalize();
        assert_eq!(registration.status_label, "IN_KITCHEN");
        assert_eq!(registration.message, None);
    }

    #[test]
    fn bus_envelope_normalizes_to_the_same_registration() {
        let detail = serde_json::json!({
            "order_id": "8f2a1de4-2c3b-4f6d-9a4e-5b1c2d3e4f50",
            "tenant_id": "sede-1",
            "token": "tok-1",
            "status_label": "IN_KITCHEN",
            "message": "Pedido listo para cocina"
        });
        let wrapped = serde_json::json!({ "detail": detail });

        let from_bus: InboundCallback = serde_json::from_value(wrapped).unwrap();
        let from_direct: InboundCallback = serde_json::from_value(detail).unwrap();
        assert_eq!(from_bus.normalize(), from_direct.normalize());
    }

    #[test]
    fn unrecognized_shape_fails_to_parse() {
        let raw = serde_json::json!({ "taskToken": "tok-1" });
        assert!(serde_json::from_value::<InboundCallback>(raw).is_err());
    }
}
