//! # Sentinel
//!
//! Headless host that runs agents through a scripted encounter.
//!
//! Usage: `sentinel [scenario.toml]`. Without a path the built-in
//! encounter runs. Set `RUST_LOG=sentinel_ai=debug` to see every state
//! change.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod scenario;

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::scenario::Scenario;

/// Main entry point.
fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("sentinel=info".parse()?))
        .init();

    info!("Sentinel starting...");
    info!("Version: {}", sentinel_common::VERSION);

    let scenario = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => Scenario::load(&path)?,
        None => {
            info!("No scenario given, running the built-in encounter");
            Scenario::builtin()?
        },
    };

    let summary = scenario::run(&scenario)?;
    info!(
        "Encounter over after {:.2}s ({} ticks): player health {}, {} deaths, {} attacks, {} drops, {} agents left",
        summary.elapsed,
        summary.ticks,
        summary.player_health,
        summary.deaths,
        summary.attacks,
        summary.drops,
        summary.agents_left
    );

    info!("Sentinel shutdown complete");
    Ok(())
}
