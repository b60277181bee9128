//! Runtime wiring: assembling a working system out of the orchestrator
//! and its collaborators, plus the tracing setup shared by binaries and
//! tests.

pub mod system;
pub mod tracing;

pub use system::LifecycleSystem;
pub use tracing::setup_tracing;
