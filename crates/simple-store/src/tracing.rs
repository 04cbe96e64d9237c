//! # Observability & Tracing
//!
//! The store logs through the `tracing` crate with structured fields:
//!
//! - **Requests**: `model`, `method` and `url` of every request, at `debug`.
//! - **Reconciliation**: collection size after `find_all` / `load_all`.
//! - **Records**: saves, deletes and on-demand fetches, at `info`.
//! - **Failures**: validation and transport errors, at `warn`.
//!
//! ```bash
//! RUST_LOG=info cargo run                      # state changes only
//! RUST_LOG=simple_store=debug cargo run        # every request and payload
//! ```

/// Installs a compact `tracing-subscriber` formatter filtered by `RUST_LOG`.
///
/// Call once at startup. Panics if a global subscriber is already set.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
