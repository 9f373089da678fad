//! Logging setup and progress reporting helpers.

use crate::types::Stats;
use anyhow::Result;
use log::{error, info};

/// Initialise the env_logger sink. `level` is the default filter; the
/// RUST_LOG environment variable still wins when set.
pub fn setup_logging(level: &str) -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .try_init()?;
    Ok(())
}

/// One progress line per stats poll.
pub fn log_stats(stats: &Stats) {
    let rate = if stats.elapsed_seconds > 0 {
        stats.jumps_total / stats.elapsed_seconds
    } else {
        stats.jumps_total
    };
    info!(
        "{} jumps ({}/s), {} distinguished points, {} collisions, {} threads, {}s elapsed",
        stats.jumps_total,
        rate,
        stats.dps_total,
        stats.collisions_total,
        stats.threads_active,
        stats.elapsed_seconds
    );
}

/// Announce the outcome of a finished hunt.
pub fn log_outcome(stats: &Stats) {
    match &stats.found_key_hex {
        Some(key) => info!("SOLUTION VERIFIED: {}", key),
        None => error!("no solution found in {} jumps", stats.jumps_total),
    }
}
