//! Command-line configuration.
//!
//! clap::Parser struct with defaults and validation; the engine re-validates
//! the search parameters itself, this layer catches operator mistakes early
//! with friendlier messages.

use crate::math::constants::{
    DEFAULT_DP_CAPACITY, MAX_DP_BITS, MAX_WORKERS, MIN_DP_BITS, MIN_WORKERS,
};
use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;

/// rangecrack - Pollard's parallel kangaroo ECDLP solver for secp256k1
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Target public key: compressed (66 hex chars), uncompressed (130), or
    /// raw x||y (128); optional 0x prefix
    #[arg(long)]
    pub pubkey: String,

    /// Inclusive lower bound of the private-key range (hex)
    #[arg(long)]
    pub range_start: String,

    /// Upper bound of the private-key range (hex)
    #[arg(long)]
    pub range_end: String,

    /// Worker threads (1-64)
    #[arg(long, default_value = "8")]
    pub threads: usize,

    /// Low zero bits of x required for a distinguished point (8-32)
    #[arg(long, default_value = "20")]
    pub dp_bits: u32,

    /// Cap on in-memory distinguished-point records
    #[arg(long, default_value_t = DEFAULT_DP_CAPACITY)]
    pub max_dps: usize,

    /// Checkpoint file written periodically while running
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,

    /// Seconds between checkpoint saves
    #[arg(long, default_value = "60")]
    pub checkpoint_interval: u64,

    /// Resume counters and distinguished points from a saved checkpoint
    #[arg(long)]
    pub resume: Option<PathBuf>,

    /// Stop after this many seconds (0 = run until solved or interrupted)
    #[arg(long, default_value = "0")]
    pub max_seconds: u64,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_WORKERS..=MAX_WORKERS).contains(&self.threads) {
            return Err(anyhow!(
                "threads must be between {} and {}, got {}",
                MIN_WORKERS,
                MAX_WORKERS,
                self.threads
            ));
        }

        if !(MIN_DP_BITS..=MAX_DP_BITS).contains(&self.dp_bits) {
            return Err(anyhow!(
                "dp-bits must be between {} and {}, got {}",
                MIN_DP_BITS,
                MAX_DP_BITS,
                self.dp_bits
            ));
        }

        if self.max_dps == 0 {
            return Err(anyhow!("max-dps must be > 0"));
        }

        if self.checkpoint.is_some() && self.checkpoint_interval == 0 {
            return Err(anyhow!("checkpoint-interval must be > 0"));
        }

        Ok(())
    }
}
