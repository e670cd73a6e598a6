//! Freight quoting: rate calculation, cached distance resolution and a local quote ledger.

pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infra;
pub mod util;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing/logging. Defaults to `info`; override with `RUST_LOG`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}
