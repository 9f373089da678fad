//! Engine orchestrator.
//!
//! [`KangarooEngine`] owns two disjoint graphs: an immutable
//! [`EngineContext`] (configuration, jump table, atomics, DP store) shared by
//! reference with every worker, and a flat vector of worker join handles. No
//! walker holds a reference back to the orchestrator.

use crate::checkpoint::{Checkpoint, CheckpointDp, CHECKPOINT_VERSION};
use crate::dp::DpStore;
use crate::kangaroo::jumps::JumpTable;
use crate::kangaroo::walker::Walker;
use crate::math::bigint::BigInt;
use crate::math::constants::{
    DEFAULT_DP_CAPACITY, MAX_DP_BITS, MAX_WORKERS, MIN_DP_BITS, MIN_WORKERS,
};
use crate::math::secp::Secp256k1;
use crate::types::{DpRecord, Herd, Point, Stats};
use anyhow::{anyhow, bail, ensure, Context, Result};
use log::{info, warn};
use rand::Rng;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Immutable search parameters, fixed by a successful `initialize`.
pub struct EngineConfig {
    pub curve: Secp256k1,
    pub target: Point,
    pub range_lo: BigInt,
    pub range_hi: BigInt,
    pub workers: usize,
    pub dp_bits: u32,
    pub dp_mask: u64,
    pub jumps: JumpTable,
}

impl EngineConfig {
    /// A non-infinity point is distinguished when the low `dp_bits` of its
    /// x-coordinate are all zero.
    pub fn is_distinguished(&self, point: &Point) -> bool {
        !point.is_infinity() && point.x.low_u64() & self.dp_mask == 0
    }

    /// Uniform tame start scalar in [range_lo, range_hi).
    pub fn random_start<R: Rng + ?Sized>(&self, rng: &mut R) -> BigInt {
        let width = &self.range_hi - &self.range_lo;
        &self.range_lo + &BigInt::random_below(rng, &width)
    }
}

/// Shared state referenced by every worker. Configuration and the jump table
/// are immutable after `start` returns; the rest is atomics and the
/// mutex-guarded store.
pub struct EngineContext {
    pub config: EngineConfig,
    pub running: AtomicBool,
    pub jumps_total: AtomicU64,
    pub store: DpStore,
    t_start: Mutex<Option<Instant>>,
}

impl EngineContext {
    /// Monotonic seconds since the last `start`; 0 if never started.
    pub fn elapsed_seconds(&self) -> u64 {
        self.t_start
            .lock()
            .expect("t_start mutex poisoned")
            .map(|t| t.elapsed().as_secs())
            .unwrap_or(0)
    }

    fn mark_started(&self) {
        *self.t_start.lock().expect("t_start mutex poisoned") = Some(Instant::now());
    }
}

/// The kangaroo solver: configure with `initialize`, drive with
/// `start`/`stop`, read with `stats`, persist with the checkpoint calls.
pub struct KangarooEngine {
    ctx: Option<Arc<EngineContext>>,
    handles: Vec<JoinHandle<()>>,
    dp_capacity: usize,
    restored: bool,
}

impl KangarooEngine {
    pub fn new() -> Self {
        Self::with_dp_capacity(DEFAULT_DP_CAPACITY)
    }

    /// Engine with an explicit cap on in-memory distinguished points. When
    /// the cap is hit the store stops admitting new records but keeps
    /// checking collisions against resident ones.
    pub fn with_dp_capacity(dp_capacity: usize) -> Self {
        KangarooEngine {
            ctx: None,
            handles: Vec::new(),
            dp_capacity,
            restored: false,
        }
    }

    /// Parse and validate the search parameters and build the jump table.
    /// Returns false (with the cause logged) on any malformed or
    /// out-of-range input; the engine is left unconfigured in that case.
    pub fn initialize(
        &mut self,
        pubkey_hex: &str,
        range_start_hex: &str,
        range_end_hex: &str,
        workers: usize,
        dp_bits: u32,
    ) -> bool {
        match self.build_context(pubkey_hex, range_start_hex, range_end_hex, workers, dp_bits) {
            Ok(ctx) => {
                self.ctx = Some(Arc::new(ctx));
                self.restored = false;
                true
            }
            Err(e) => {
                warn!("initialize failed: {e:#}");
                false
            }
        }
    }

    fn build_context(
        &self,
        pubkey_hex: &str,
        range_start_hex: &str,
        range_end_hex: &str,
        workers: usize,
        dp_bits: u32,
    ) -> Result<EngineContext> {
        ensure!(!self.is_running(), "engine is running; stop it first");
        ensure!(
            (MIN_WORKERS..=MAX_WORKERS).contains(&workers),
            "worker count {} outside [{}, {}]",
            workers,
            MIN_WORKERS,
            MAX_WORKERS
        );
        ensure!(
            (MIN_DP_BITS..=MAX_DP_BITS).contains(&dp_bits),
            "dp_bits {} outside [{}, {}]",
            dp_bits,
            MIN_DP_BITS,
            MAX_DP_BITS
        );

        let curve = Secp256k1::new();
        let target = curve
            .parse_pubkey(pubkey_hex)
            .ok_or_else(|| anyhow!("invalid public key (malformed hex or not on curve)"))?;

        let range_lo = BigInt::from_hex(range_start_hex)
            .ok_or_else(|| anyhow!("malformed range start {range_start_hex:?}"))?;
        let range_hi = BigInt::from_hex(range_end_hex)
            .ok_or_else(|| anyhow!("malformed range end {range_end_hex:?}"))?;
        ensure!(!range_lo.is_zero(), "range start must be positive");
        ensure!(range_lo < range_hi, "empty or inverted range");
        ensure!(range_hi < curve.n, "range end must be below the group order");

        let jumps = JumpTable::build(&curve, &range_lo, &range_hi);
        let dp_mask = (1u64 << dp_bits) - 1;

        info!(
            "kangaroo engine initialised: range 0x{} - 0x{}, {} workers, {} dp bits",
            range_lo.to_hex(),
            range_hi.to_hex(),
            workers,
            dp_bits
        );

        let store = DpStore::new(curve.clone(), target.clone(), self.dp_capacity);
        Ok(EngineContext {
            config: EngineConfig {
                curve,
                target,
                range_lo,
                range_hi,
                workers,
                dp_bits,
                dp_mask,
                jumps,
            },
            running: AtomicBool::new(false),
            jumps_total: AtomicU64::new(0),
            store,
            t_start: Mutex::new(None),
        })
    }

    /// Spawn the workers. Fails when not initialised or already running.
    /// Counters and the DP store are cleared, except on the first start
    /// after a checkpoint load, where the restored state seeds the run.
    pub fn start(&mut self) -> bool {
        let Some(ctx) = &self.ctx else {
            warn!("start called before a successful initialize");
            return false;
        };
        if ctx.running.load(Ordering::Acquire) {
            warn!("start called while already running");
            return false;
        }

        if self.restored {
            self.restored = false;
        } else {
            ctx.store.clear();
            ctx.jumps_total.store(0, Ordering::Relaxed);
        }

        ctx.mark_started();
        ctx.running.store(true, Ordering::Release);

        for id in 0..ctx.config.workers {
            let ctx = Arc::clone(ctx);
            let handle = std::thread::Builder::new()
                .name(format!("walker-{id}"))
                .spawn(move || Walker::new(&ctx, id).run(&ctx))
                .expect("spawn walker thread");
            self.handles.push(handle);
        }

        info!("kangaroo engine started with {} workers", ctx.config.workers);
        true
    }

    /// Signal cancellation and join every worker. Idempotent; a no-op
    /// before the first start.
    pub fn stop(&mut self) {
        let Some(ctx) = &self.ctx else {
            return;
        };

        ctx.running.store(false, Ordering::Release);
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
        info!("kangaroo engine stopped");
    }

    pub fn is_running(&self) -> bool {
        self.ctx
            .as_ref()
            .map(|ctx| ctx.running.load(Ordering::Acquire))
            .unwrap_or(false)
    }

    pub fn is_solved(&self) -> bool {
        self.ctx
            .as_ref()
            .map(|ctx| ctx.store.is_solved())
            .unwrap_or(false)
    }

    /// The verified private key, once solved.
    pub fn solution(&self) -> Option<BigInt> {
        self.ctx.as_ref().and_then(|ctx| ctx.store.solution())
    }

    /// Advisory snapshot of the counters. Never blocks on a walker; `None`
    /// before initialization.
    pub fn stats(&self) -> Option<Stats> {
        let ctx = self.ctx.as_ref()?;
        let running = ctx.running.load(Ordering::Acquire);
        let is_solved = ctx.store.is_solved();
        let found_key_hex = if is_solved {
            ctx.store.solution().map(|k| k.to_hex_padded(64))
        } else {
            None
        };

        Some(Stats {
            jumps_total: ctx.jumps_total.load(Ordering::Relaxed),
            dps_total: ctx.store.dps_total(),
            collisions_total: ctx.store.collisions_total(),
            elapsed_seconds: ctx.elapsed_seconds(),
            threads_active: if running { ctx.config.workers as i32 } else { 0 },
            range_start_hex: ctx.config.range_lo.to_hex_padded(64),
            range_end_hex: ctx.config.range_hi.to_hex_padded(64),
            found_key_hex,
            is_solved,
        })
    }

    /// Serialize the current snapshot. Legal against a live engine; the
    /// result may mix counter and store states and is advisory only.
    pub fn write_checkpoint<W: Write>(&self, writer: W) -> Result<()> {
        let ctx = self
            .ctx
            .as_ref()
            .ok_or_else(|| anyhow!("engine not initialised"))?;
        self.snapshot(ctx).write_to(writer)
    }

    /// Replace counters and the DP store from a serialized checkpoint.
    /// Refused while running; engine state is untouched on any failure.
    pub fn read_checkpoint<R: Read>(&mut self, reader: R) -> Result<()> {
        let ctx = self
            .ctx
            .as_ref()
            .ok_or_else(|| anyhow!("engine not initialised"))?;
        ensure!(
            !ctx.running.load(Ordering::Acquire),
            "checkpoint load requires a stopped engine"
        );

        let checkpoint = Checkpoint::read_from(reader)?;
        if checkpoint.range_start != ctx.config.range_lo.to_hex()
            || checkpoint.range_end != ctx.config.range_hi.to_hex()
        {
            warn!("checkpoint range differs from the configured range");
        }

        // Parse every record before touching live state.
        let mut records = Vec::with_capacity(checkpoint.distinguished_points.len());
        for dp in &checkpoint.distinguished_points {
            records.push(Self::parse_checkpoint_dp(&ctx.config.curve, dp)?);
        }

        ctx.store.restore(records);
        ctx.jumps_total
            .store(checkpoint.total_jumps, Ordering::Relaxed);
        self.restored = true;

        info!(
            "checkpoint restored: {} jumps, {} distinguished points",
            checkpoint.total_jumps, checkpoint.distinguished_points_count
        );
        Ok(())
    }

    /// Write a checkpoint file; false (logged) on any failure. Writes to a
    /// temporary sibling first and renames, so a crash mid-save never
    /// truncates an existing checkpoint.
    pub fn save_checkpoint(&self, path: &Path) -> bool {
        let tmp = path.with_extension("tmp");
        let result = File::create(&tmp)
            .with_context(|| format!("create {}", tmp.display()))
            .and_then(|file| self.write_checkpoint(file))
            .and_then(|()| {
                std::fs::rename(&tmp, path)
                    .with_context(|| format!("rename {} into place", tmp.display()))
            });
        match result {
            Ok(()) => {
                info!("checkpoint saved to {}", path.display());
                true
            }
            Err(e) => {
                warn!("checkpoint save failed: {e:#}");
                false
            }
        }
    }

    /// Load a checkpoint file; false (logged) on any failure, in which case
    /// the engine state is untouched.
    pub fn load_checkpoint(&mut self, path: &Path) -> bool {
        let result = File::open(path)
            .with_context(|| format!("open {}", path.display()))
            .and_then(|file| self.read_checkpoint(file));
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("checkpoint load failed: {e:#}");
                false
            }
        }
    }

    fn snapshot(&self, ctx: &EngineContext) -> Checkpoint {
        let records = ctx.store.snapshot();
        let distinguished_points: Vec<CheckpointDp> = records
            .iter()
            .map(|r| CheckpointDp {
                point: format!("{}:{}", r.point.x.to_hex(), r.point.y.to_hex()),
                distance: r.distance.to_hex(),
                is_tame: r.herd.is_tame(),
                timestamp: r.t_observed,
            })
            .collect();

        Checkpoint {
            version: CHECKPOINT_VERSION.to_string(),
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(1),
            total_jumps: ctx.jumps_total.load(Ordering::Relaxed),
            distinguished_points_count: distinguished_points.len() as u64,
            range_start: ctx.config.range_lo.to_hex(),
            range_end: ctx.config.range_hi.to_hex(),
            num_threads: ctx.config.workers as i32,
            distinguished_bits: ctx.config.dp_bits as i32,
            distinguished_points,
        }
    }

    fn parse_checkpoint_dp(curve: &Secp256k1, dp: &CheckpointDp) -> Result<DpRecord> {
        let (x_hex, y_hex) = dp
            .point
            .split_once(':')
            .ok_or_else(|| anyhow!("malformed checkpoint point {:?}", dp.point))?;
        let x = BigInt::from_hex(x_hex).ok_or_else(|| anyhow!("malformed point x"))?;
        let y = BigInt::from_hex(y_hex).ok_or_else(|| anyhow!("malformed point y"))?;
        let point = Point::new(x, y);
        if !curve.is_on_curve(&point) {
            bail!("checkpoint point is not on the curve");
        }

        let distance = BigInt::from_hex(&dp.distance)
            .ok_or_else(|| anyhow!("malformed checkpoint distance {:?}", dp.distance))?;

        Ok(DpRecord {
            point,
            distance,
            herd: Herd::from_is_tame(dp.is_tame),
            t_observed: dp.timestamp,
        })
    }
}

impl Default for KangarooEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for KangarooEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn pubkey_for(curve: &Secp256k1, k: u64) -> String {
        let point = curve.mul(&BigInt::from_u64(k), &curve.g);
        hex::encode(curve.encode_compressed(&point).unwrap())
    }

    #[test]
    fn test_initialize_validates_parameters() {
        let curve = Secp256k1::new();
        let pubkey = pubkey_for(&curve, 0x1337);
        let mut engine = KangarooEngine::new();

        // Valid baseline.
        assert!(engine.initialize(&pubkey, "1000", "2000", 4, 16));

        // Malformed hex.
        assert!(!engine.initialize("zzzz", "1000", "2000", 4, 16));
        assert!(!engine.initialize(&pubkey, "10zz", "2000", 4, 16));

        // Inverted, empty, or zero-based range.
        assert!(!engine.initialize(&pubkey, "2000", "1000", 4, 16));
        assert!(!engine.initialize(&pubkey, "1000", "1000", 4, 16));
        assert!(!engine.initialize(&pubkey, "0", "2000", 4, 16));

        // Worker and dp_bits bounds fail rather than clamp.
        assert!(!engine.initialize(&pubkey, "1000", "2000", 0, 16));
        assert!(!engine.initialize(&pubkey, "1000", "2000", 65, 16));
        assert!(!engine.initialize(&pubkey, "1000", "2000", 4, 7));
        assert!(!engine.initialize(&pubkey, "1000", "2000", 4, 33));

        // Range must stay below the group order.
        let n_hex = curve.n.to_hex();
        assert!(!engine.initialize(&pubkey, "1000", &n_hex, 4, 16));
    }

    #[test]
    fn test_initialize_rejects_off_curve_target() {
        let mut engine = KangarooEngine::new();
        // 04 ‖ x=1 ‖ y=1 is well-formed hex but not a curve point.
        let bogus = format!("04{:0>64}{:0>64}", "1", "1");
        assert_eq!(bogus.len(), 130);
        assert!(!engine.initialize(&bogus, "1000", "2000", 4, 16));
        // Nothing was configured.
        assert!(engine.stats().is_none());
    }

    #[test]
    fn test_lifecycle_flags() {
        let curve = Secp256k1::new();
        let pubkey = pubkey_for(&curve, 5);
        let mut engine = KangarooEngine::new();

        // Stop before start is a clean no-op.
        engine.stop();
        assert!(!engine.start());

        assert!(engine.initialize(&pubkey, "100", "200", 2, 20));
        assert!(engine.start());
        assert!(engine.is_running());
        // Double start fails.
        assert!(!engine.start());

        engine.stop();
        assert!(!engine.is_running());
        // Stop is idempotent.
        engine.stop();

        let stats = engine.stats().unwrap();
        assert_eq!(stats.threads_active, 0);
    }

    #[test]
    fn test_stats_before_start() {
        let curve = Secp256k1::new();
        let pubkey = pubkey_for(&curve, 5);
        let mut engine = KangarooEngine::new();
        assert!(engine.initialize(&pubkey, "100", "200", 2, 20));

        let stats = engine.stats().unwrap();
        assert_eq!(stats.jumps_total, 0);
        assert_eq!(stats.elapsed_seconds, 0);
        assert_eq!(stats.threads_active, 0);
        assert!(!stats.is_solved);
        assert!(stats.found_key_hex.is_none());
        assert_eq!(stats.range_start_hex.len(), 64);
        assert!(stats.range_start_hex.ends_with("100"));
    }

    #[test]
    fn test_distinguished_predicate() {
        let curve = Secp256k1::new();
        let pubkey = pubkey_for(&curve, 5);
        let mut engine = KangarooEngine::new();
        assert!(engine.initialize(&pubkey, "100", "200", 2, 8));
        let ctx = engine.ctx.as_ref().unwrap();

        let zero_tail = Point::new(BigInt::from_u64(0x500), BigInt::one());
        assert!(ctx.config.is_distinguished(&zero_tail));

        let nonzero_tail = Point::new(BigInt::from_u64(0x501), BigInt::one());
        assert!(!ctx.config.is_distinguished(&nonzero_tail));

        assert!(!ctx.config.is_distinguished(&Point::infinity()));
    }

    #[test]
    fn test_random_start_stays_in_range() {
        let curve = Secp256k1::new();
        let pubkey = pubkey_for(&curve, 5);
        let mut engine = KangarooEngine::new();
        assert!(engine.initialize(&pubkey, "100", "200", 2, 20));
        let ctx = engine.ctx.as_ref().unwrap();

        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let lo = BigInt::from_hex("100").unwrap();
        let hi = BigInt::from_hex("200").unwrap();
        for _ in 0..200 {
            let k = ctx.config.random_start(&mut rng);
            assert!(k >= lo && k < hi);
        }
    }
}
