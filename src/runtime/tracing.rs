//! Structured logging setup.
//!
//! One subscriber for the whole process, filtered through `RUST_LOG`:
//!
//! ```bash
//! RUST_LOG=info cargo run      # lifecycle events only
//! RUST_LOG=debug cargo run     # full request payloads
//! RUST_LOG=order_lifecycle=debug cargo run
//! ```
//!
//! Operations log full payloads once at entry via `debug!(?request, ..)`;
//! everything after that is compact structured fields (order key, status,
//! caller) suitable for production log search.

/// Initializes the tracing subscriber. Call once at process start.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
