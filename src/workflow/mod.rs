//! The workflow engine seam.
//!
//! The engine itself is an external collaborator: a resumable
//! state-machine executor that pauses at wait steps and hands out
//! one-time continuation tokens. This crate only ever does two things
//! with it: start an execution after an order is created, and redeem a
//! token when staff advances an order. Both go through the
//! [`WorkflowEngine`] trait so tests can substitute the in-memory
//! implementation in [`memory`].

pub mod memory;

pub use memory::InMemoryEngine;

use crate::domain::{LineItem, OrderId, OrderKey, TenantId};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One-time capability marking a paused execution branch.
///
/// The value is opaque to the orchestrator: it is stored verbatim on the
/// order and handed back to the engine for verification, never parsed.
/// The only structural rule is that an empty token does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContinuationToken(String);

/// Error for the one malformed shape a token can have.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("continuation token must not be empty")]
pub struct EmptyToken;

impl ContinuationToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ContinuationToken {
    type Error = EmptyToken;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        if raw.is_empty() {
            Err(EmptyToken)
        } else {
            Ok(Self(raw))
        }
    }
}

impl From<ContinuationToken> for String {
    fn from(token: ContinuationToken) -> Self {
        token.0
    }
}

impl fmt::Display for ContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a started execution, returned by [`WorkflowEngine::start`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionHandle(pub String);

/// Input payload handed to the engine when an execution starts,
/// keyed by order id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionInput {
    pub order_id: OrderId,
    pub tenant_id: TenantId,
    pub customer_email: String,
    pub items: Vec<LineItem>,
    pub total: Decimal,
}

/// Outcome delivered when redeeming a token: the paused branch resumes
/// with either a success payload or a failure reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    Success(serde_json::Value),
    Failure { error: String, cause: String },
}

/// Errors surfaced by the workflow engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The token was already redeemed, or was never issued. Distinct
    /// from any "order not found" condition by construction: the engine
    /// knows nothing about orders, only tokens.
    #[error("continuation token is invalid or already redeemed")]
    TokenInvalid,

    /// The engine was unreachable or rejected the request outright.
    #[error("workflow engine failure: {0}")]
    Unavailable(String),
}

/// The two operations this system consumes from the engine.
#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    /// Starts an execution for a freshly created order.
    async fn start(
        &self,
        key: &OrderKey,
        input: ExecutionInput,
    ) -> Result<ExecutionHandle, EngineError>;

    /// Redeems a continuation token, resuming the paused branch with the
    /// given outcome. Each token redeems at most once.
    async fn redeem(&self, token: &ContinuationToken, outcome: Outcome) -> Result<(), EngineError>;
}
