//! rangecrack binary: configure an engine from the command line, run it, and
//! report progress until it solves, times out, or is stopped.

use anyhow::{bail, Result};
use clap::Parser;
use log::info;
use std::thread;
use std::time::{Duration, Instant};

use rangecrack::config::Config;
use rangecrack::kangaroo::KangarooEngine;
use rangecrack::utils::logging::{log_outcome, log_stats, setup_logging};

fn main() -> Result<()> {
    let config = Config::parse();
    setup_logging(&config.log_level)?;
    config.validate()?;

    let mut engine = KangarooEngine::with_dp_capacity(config.max_dps);
    if !engine.initialize(
        &config.pubkey,
        &config.range_start,
        &config.range_end,
        config.threads,
        config.dp_bits,
    ) {
        bail!("engine initialization failed, see log for the cause");
    }

    if let Some(path) = &config.resume {
        if !engine.load_checkpoint(path) {
            bail!("failed to load checkpoint {}", path.display());
        }
    }

    if !engine.start() {
        bail!("engine failed to start");
    }

    let started = Instant::now();
    let mut last_checkpoint = Instant::now();
    loop {
        thread::sleep(Duration::from_secs(1));

        let Some(stats) = engine.stats() else { break };
        log_stats(&stats);

        if stats.is_solved {
            break;
        }
        if config.max_seconds > 0 && started.elapsed().as_secs() >= config.max_seconds {
            info!("time budget of {}s exhausted, stopping", config.max_seconds);
            break;
        }

        if let Some(path) = &config.checkpoint {
            if last_checkpoint.elapsed().as_secs() >= config.checkpoint_interval {
                engine.save_checkpoint(path);
                last_checkpoint = Instant::now();
            }
        }
    }

    engine.stop();

    // Final checkpoint so an interrupted hunt can resume where it left off.
    if let Some(path) = &config.checkpoint {
        engine.save_checkpoint(path);
    }

    if let Some(stats) = engine.stats() {
        log_outcome(&stats);
        if let Some(key) = stats.found_key_hex {
            println!("{key}");
        }
    }

    Ok(())
}
