//! Tenants, roles, and resolved caller identities.
//!
//! Credential issuance and validation live outside this crate; by the
//! time a request reaches the orchestrator the caller has already been
//! resolved by the credential oracle into an [`Identity`] triple. The
//! orchestrator enforces tenancy and role from that triple alone and
//! never trusts a client-supplied tenant or email override.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Partition discriminator for an isolated business unit.
///
/// Every order and every user belongs to exactly one tenant; all store
/// keys and queries are scoped by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TenantId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TenantId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Authorization role of a caller.
///
/// `Staff` may advance any order in its tenant and sees every order when
/// listing. `Cliente` may only view orders placed under their own email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Cliente,
    Staff,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Cliente => f.write_str("CLIENTE"),
            Role::Staff => f.write_str("STAFF"),
        }
    }
}

/// A resolved caller: who they are, what they may do, where they belong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub email: String,
    pub role: Role,
    pub tenant_id: TenantId,
}

impl Identity {
    pub fn new(email: impl Into<String>, role: Role, tenant_id: impl Into<TenantId>) -> Self {
        Self {
            email: email.into(),
            role,
            tenant_id: tenant_id.into(),
        }
    }
}
