//! In-memory workflow engine for tests and local runs.
//!
//! Keeps the same contract as the real engine: executions start keyed by
//! order, tokens are issued when a branch pauses, and each token redeems
//! exactly once. State lives behind an `Arc<Mutex<..>>` so the engine is
//! cheap to clone into the orchestrator and still inspectable from the
//! test afterwards. Failure injection mirrors what a mock gives you:
//! flip a flag, observe how the orchestrator degrades.

use crate::domain::OrderKey;
use crate::workflow::{
    ContinuationToken, EngineError, ExecutionHandle, ExecutionInput, Outcome, WorkflowEngine,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

#[derive(Default)]
struct EngineState {
    counter: u64,
    executions: Vec<(OrderKey, ExecutionInput)>,
    /// Tokens issued but not yet redeemed, by raw value.
    outstanding: HashMap<String, OrderKey>,
    redeemed: Vec<(ContinuationToken, Outcome)>,
    fail_next_start: bool,
    fail_redeem: bool,
}

/// An engine that runs entirely in process.
#[derive(Clone, Default)]
pub struct InMemoryEngine {
    state: Arc<Mutex<EngineState>>,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates the engine reaching a wait step for `key`: issues a
    /// fresh one-time token. The caller is expected to feed it back to
    /// the orchestrator via token registration, exactly as the real
    /// engine does through its callback.
    pub fn pause(&self, key: &OrderKey) -> ContinuationToken {
        let mut state = self.state.lock().expect("engine state poisoned");
        state.counter += 1;
        let raw = format!("wf-token-{}-{}", state.counter, key.order_id);
        state.outstanding.insert(raw.clone(), key.clone());
        debug!(%key, token = %raw, "issued continuation token");
        ContinuationToken::try_from(raw).expect("generated token is non-empty")
    }

    /// Makes the next `start` call fail with [`EngineError::Unavailable`].
    pub fn fail_next_start(&self) {
        self.state.lock().expect("engine state poisoned").fail_next_start = true;
    }

    /// Makes every `redeem` call fail with [`EngineError::Unavailable`]
    /// until called again with `false`.
    pub fn set_fail_redeem(&self, fail: bool) {
        self.state.lock().expect("engine state poisoned").fail_redeem = fail;
    }

    /// Executions started so far, in order.
    pub fn executions(&self) -> Vec<(OrderKey, ExecutionInput)> {
        self.state.lock().expect("engine state poisoned").executions.clone()
    }

    /// Tokens redeemed so far with their outcomes, in order.
    pub fn redeemed(&self) -> Vec<(ContinuationToken, Outcome)> {
        self.state.lock().expect("engine state poisoned").redeemed.clone()
    }

    /// Whether a token is still outstanding (issued, not redeemed).
    pub fn is_outstanding(&self, token: &ContinuationToken) -> bool {
        self.state
            .lock()
            .expect("engine state poisoned")
            .outstanding
            .contains_key(token.as_str())
    }
}

#[async_trait]
impl WorkflowEngine for InMemoryEngine {
    async fn start(
        &self,
        key: &OrderKey,
        input: ExecutionInput,
    ) -> Result<ExecutionHandle, EngineError> {
        let mut state = self.state.lock().expect("engine state poisoned");
        if state.fail_next_start {
            state.fail_next_start = false;
            return Err(EngineError::Unavailable("injected start failure".into()));
        }
        state.counter += 1;
        let handle = ExecutionHandle(format!("exec-{}-{}", state.counter, key.order_id));
        state.executions.push((key.clone(), input));
        info!(%key, handle = %handle.0, "execution started");
        Ok(handle)
    }

    async fn redeem(&self, token: &ContinuationToken, outcome: Outcome) -> Result<(), EngineError> {
        let mut state = self.state.lock().expect("engine state poisoned");
        if state.fail_redeem {
            return Err(EngineError::Unavailable("injected redeem failure".into()));
        }
        match state.outstanding.remove(token.as_str()) {
            Some(key) => {
                info!(%key, token = %token, "token redeemed");
                state.redeemed.push((token.clone(), outcome));
                Ok(())
            }
            None => Err(EngineError::TokenInvalid),
        }
    }
}
