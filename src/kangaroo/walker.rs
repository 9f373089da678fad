//! Per-worker kangaroo state machine.
//!
//! Tame walkers start at a random known scalar inside the search range; wild
//! walkers start at the target with distance zero. Both run the same step
//! loop: deposit distinguished points, take the jump selected by the current
//! x-coordinate, and re-randomise when they leave their productive window.

use crate::kangaroo::engine::EngineContext;
use crate::kangaroo::jumps::JumpTable;
use crate::math::bigint::BigInt;
use crate::math::constants::{JUMP_FLUSH_INTERVAL, WILD_DISTANCE_MAX_BITS};
use crate::types::{Herd, Point};
use log::{debug, trace};
use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};
use std::sync::atomic::Ordering;

/// One walker's exclusive state. Nothing here is shared; all cross-worker
/// traffic goes through the context's atomics and the DP store.
pub struct Walker {
    id: usize,
    herd: Herd,
    rng: StdRng,
    current: Point,
    distance: BigInt,
    local_jumps: u64,
}

impl Walker {
    /// Even-numbered workers walk tame, odd-numbered wild.
    pub fn herd_for_id(id: usize) -> Herd {
        if id % 2 == 0 {
            Herd::Tame
        } else {
            Herd::Wild
        }
    }

    pub fn new(ctx: &EngineContext, id: usize) -> Self {
        // OS entropy mixed with the worker id; OsRng failure is fatal by
        // design.
        let seed = OsRng.next_u64() ^ id as u64;
        let mut rng = StdRng::seed_from_u64(seed);

        let herd = Self::herd_for_id(id);
        let (current, distance) = match herd {
            Herd::Tame => {
                let k = ctx.config.random_start(&mut rng);
                (ctx.config.curve.mul(&k, &ctx.config.curve.g), k)
            }
            Herd::Wild => (ctx.config.target.clone(), BigInt::zero()),
        };

        Walker {
            id,
            herd,
            rng,
            current,
            distance,
            local_jumps: 0,
        }
    }

    /// Walk until the engine stops or the puzzle is solved.
    pub fn run(mut self, ctx: &EngineContext) {
        trace!("walker {} ({}) started", self.id, self.herd);

        while ctx.running.load(Ordering::Acquire) && !ctx.store.is_solved() {
            if ctx.config.is_distinguished(&self.current) {
                let elapsed = ctx.elapsed_seconds();
                if ctx
                    .store
                    .observe(&self.current, &self.distance, self.herd, elapsed)
                    .is_some()
                {
                    break;
                }
            }

            let i = JumpTable::index(&self.current);
            self.current = ctx.config.curve.add(&self.current, ctx.config.jumps.point(i));
            self.distance = &self.distance + ctx.config.jumps.distance(i);

            self.local_jumps += 1;
            if self.local_jumps % JUMP_FLUSH_INTERVAL == 0 {
                ctx.jumps_total.fetch_add(JUMP_FLUSH_INTERVAL, Ordering::Relaxed);
            }

            self.restart_if_out_of_bounds(ctx);
        }

        // Flush the residual count before exiting.
        ctx.jumps_total
            .fetch_add(self.local_jumps % JUMP_FLUSH_INTERVAL, Ordering::Relaxed);
        trace!("walker {} ({}) exited", self.id, self.herd);
    }

    /// Tame walks restart from a fresh random scalar once their distance
    /// passes range_hi; wild walks restart from the target once their
    /// distance would poison the key-difference calculation.
    fn restart_if_out_of_bounds(&mut self, ctx: &EngineContext) {
        match self.herd {
            Herd::Tame => {
                if self.distance > ctx.config.range_hi {
                    let k = ctx.config.random_start(&mut self.rng);
                    self.current = ctx.config.curve.mul(&k, &ctx.config.curve.g);
                    self.distance = k;
                    debug!("walker {} left the tame window, restarted", self.id);
                }
            }
            Herd::Wild => {
                if self.distance.bit_length() > WILD_DISTANCE_MAX_BITS {
                    self.current = ctx.config.target.clone();
                    self.distance = BigInt::zero();
                    debug!("walker {} wild distance overflowed, restarted", self.id);
                }
            }
        }
    }
}
