//! Experiment tooling for the Chirplink transport.
//!
//! Drives deterministic `run_once` batches over seeded parameter grids
//! and aggregates the outcomes into comparable summaries. Everything
//! here runs on the virtual clock, so a 200-run grid finishes in
//! milliseconds and reproduces exactly across machines.

pub mod grid;
pub mod summary;

/// Install a compact stdout subscriber honouring `RUST_LOG`, defaulting
/// to `info`. Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .compact()
        .try_init();
}
