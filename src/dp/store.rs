//! Shared distinguished-point store.
//!
//! One mutex-guarded map from x-coordinate fingerprint to the first observer's
//! record. `observe` serialises lookup-and-insert so no two observations race,
//! runs the cross-herd collision protocol, and verifies every candidate key
//! against the target before publishing it.

use crate::math::bigint::BigInt;
use crate::math::secp::Secp256k1;
use crate::types::{DpRecord, Herd, Point};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

/// Concurrent map of distinguished points with collision detection.
pub struct DpStore {
    curve: Secp256k1,
    target: Point,
    capacity: usize,
    records: Mutex<HashMap<[u8; 32], DpRecord>>,
    dps_total: AtomicU64,
    collisions_total: AtomicU64,
    solved: AtomicBool,
    solution: Mutex<Option<BigInt>>,
    capacity_warned: AtomicBool,
}

impl DpStore {
    pub fn new(curve: Secp256k1, target: Point, capacity: usize) -> Self {
        DpStore {
            curve,
            target,
            capacity,
            records: Mutex::new(HashMap::new()),
            dps_total: AtomicU64::new(0),
            collisions_total: AtomicU64::new(0),
            solved: AtomicBool::new(false),
            solution: Mutex::new(None),
            capacity_warned: AtomicBool::new(false),
        }
    }

    /// Record a distinguished point, or solve from it.
    ///
    /// First observer wins the slot. A same-herd revisit is a merged walk and
    /// is ignored (the walker re-randomises on its own bounds). A cross-herd
    /// hit yields candidate k = (tame distance - wild distance) mod n, which
    /// is accepted only if k·G equals the target; x-only fingerprints alias
    /// y and -y, so a failed verification is a normal event and leaves the
    /// existing record in place.
    ///
    /// Returns the solved key when this observation closed the search.
    pub fn observe(
        &self,
        point: &Point,
        distance: &BigInt,
        herd: Herd,
        elapsed_seconds: u64,
    ) -> Option<BigInt> {
        let fp = point.fingerprint();
        let mut records = self.records.lock().expect("dp store mutex poisoned");

        if let Some(prev) = records.get(&fp) {
            if prev.herd == herd {
                return None;
            }

            let (tame_d, wild_d) = match herd {
                Herd::Tame => (distance, &prev.distance),
                Herd::Wild => (&prev.distance, distance),
            };
            let key = self.curve.sub_mod_n(tame_d, wild_d);

            if self.curve.mul(&key, &self.curve.g) == self.target {
                self.collisions_total.fetch_add(1, Ordering::Relaxed);
                // Publish the key before raising the flag; readers that see
                // solved == true must see the solution.
                *self.solution.lock().expect("solution mutex poisoned") = Some(key.clone());
                self.solved.store(true, Ordering::Release);
                info!("collision solved the target, key {}", key.to_hex());
                return Some(key);
            }

            debug!("cross-herd fingerprint match failed verification (y aliasing)");
            return None;
        }

        if records.len() >= self.capacity {
            if !self.capacity_warned.swap(true, Ordering::Relaxed) {
                warn!(
                    "dp store reached its {} record cap; new points are dropped",
                    self.capacity
                );
            }
            return None;
        }

        records.insert(
            fp,
            DpRecord {
                point: point.clone(),
                distance: distance.clone(),
                herd,
                t_observed: elapsed_seconds,
            },
        );
        self.dps_total.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn is_solved(&self) -> bool {
        self.solved.load(Ordering::Acquire)
    }

    /// The verified key, once solved.
    pub fn solution(&self) -> Option<BigInt> {
        self.solution.lock().expect("solution mutex poisoned").clone()
    }

    pub fn dps_total(&self) -> u64 {
        self.dps_total.load(Ordering::Relaxed)
    }

    pub fn collisions_total(&self) -> u64 {
        self.collisions_total.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.records.lock().expect("dp store mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all records and reset counters and the solved state.
    pub fn clear(&self) {
        self.records.lock().expect("dp store mutex poisoned").clear();
        self.dps_total.store(0, Ordering::Relaxed);
        self.collisions_total.store(0, Ordering::Relaxed);
        *self.solution.lock().expect("solution mutex poisoned") = None;
        self.solved.store(false, Ordering::Relaxed);
        self.capacity_warned.store(false, Ordering::Relaxed);
    }

    /// Copy out every record. Taken against a live engine this is an
    /// advisory snapshot, not a consistent cut.
    pub fn snapshot(&self) -> Vec<DpRecord> {
        self.records
            .lock()
            .expect("dp store mutex poisoned")
            .values()
            .cloned()
            .collect()
    }

    /// Replace the map wholesale from checkpointed records. Only called on a
    /// stopped engine; the DP counter follows the restored record count.
    pub fn restore(&self, restored: Vec<DpRecord>) {
        let mut map = HashMap::with_capacity(restored.len());
        for record in restored {
            map.insert(record.point.fingerprint(), record);
        }
        let count = map.len() as u64;

        *self.records.lock().expect("dp store mutex poisoned") = map;
        self.dps_total.store(count, Ordering::Relaxed);
        self.collisions_total.store(0, Ordering::Relaxed);
        *self.solution.lock().expect("solution mutex poisoned") = None;
        self.solved.store(false, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_for_key(key: u64, capacity: usize) -> (DpStore, Secp256k1) {
        let curve = Secp256k1::new();
        let target = curve.mul(&BigInt::from_u64(key), &curve.g);
        (DpStore::new(curve.clone(), target, capacity), curve)
    }

    #[test]
    fn test_first_observer_wins() {
        let (store, curve) = store_for_key(5, 1024);
        let p = curve.mul(&BigInt::from_u64(12), &curve.g);

        assert!(store
            .observe(&p, &BigInt::from_u64(12), Herd::Tame, 1)
            .is_none());
        assert_eq!(store.dps_total(), 1);
        assert_eq!(store.len(), 1);

        // Same herd, same fingerprint: merged walks, record unchanged.
        assert!(store
            .observe(&p, &BigInt::from_u64(99), Herd::Tame, 2)
            .is_none());
        assert_eq!(store.dps_total(), 1);
        let kept = &store.snapshot()[0];
        assert_eq!(kept.distance, BigInt::from_u64(12));
        assert_eq!(kept.t_observed, 1);
    }

    #[test]
    fn test_cross_herd_collision_solves() {
        // target = 5G; tame at distance 12 and wild at distance 7 both sit
        // on 12G, and 12 - 7 = 5.
        let (store, curve) = store_for_key(5, 1024);
        let meeting = curve.mul(&BigInt::from_u64(12), &curve.g);

        assert!(store
            .observe(&meeting, &BigInt::from_u64(7), Herd::Wild, 0)
            .is_none());
        let key = store
            .observe(&meeting, &BigInt::from_u64(12), Herd::Tame, 3)
            .expect("collision should solve");

        assert_eq!(key, BigInt::from_u64(5));
        assert!(store.is_solved());
        assert_eq!(store.solution().unwrap(), BigInt::from_u64(5));
        assert_eq!(store.collisions_total(), 1);
    }

    #[test]
    fn test_collision_order_is_symmetric() {
        // Tame first, wild second: k = tame - wild either way.
        let (store, curve) = store_for_key(5, 1024);
        let meeting = curve.mul(&BigInt::from_u64(12), &curve.g);

        assert!(store
            .observe(&meeting, &BigInt::from_u64(12), Herd::Tame, 0)
            .is_none());
        let key = store
            .observe(&meeting, &BigInt::from_u64(7), Herd::Wild, 1)
            .expect("collision should solve");
        assert_eq!(key, BigInt::from_u64(5));
    }

    #[test]
    fn test_failed_verification_keeps_record() {
        let (store, curve) = store_for_key(5, 1024);
        let meeting = curve.mul(&BigInt::from_u64(12), &curve.g);

        // Distances whose difference is not the key: verification must fail.
        assert!(store
            .observe(&meeting, &BigInt::from_u64(40), Herd::Wild, 0)
            .is_none());
        assert!(store
            .observe(&meeting, &BigInt::from_u64(41), Herd::Tame, 1)
            .is_none());

        assert!(!store.is_solved());
        assert!(store.solution().is_none());
        assert_eq!(store.collisions_total(), 0);
        // The wild record is still the one in the slot.
        let kept = &store.snapshot()[0];
        assert_eq!(kept.herd, Herd::Wild);
        assert_eq!(kept.distance, BigInt::from_u64(40));
    }

    #[test]
    fn test_capacity_caps_admissions_not_collisions() {
        let (store, curve) = store_for_key(5, 1);
        let meeting = curve.mul(&BigInt::from_u64(12), &curve.g);
        let other = curve.mul(&BigInt::from_u64(99), &curve.g);

        assert!(store
            .observe(&meeting, &BigInt::from_u64(7), Herd::Wild, 0)
            .is_none());
        // Full: a fresh fingerprint is dropped.
        assert!(store
            .observe(&other, &BigInt::from_u64(99), Herd::Tame, 0)
            .is_none());
        assert_eq!(store.len(), 1);
        assert_eq!(store.dps_total(), 1);

        // But collisions against resident records still resolve.
        let key = store
            .observe(&meeting, &BigInt::from_u64(12), Herd::Tame, 1)
            .expect("collision past capacity should still solve");
        assert_eq!(key, BigInt::from_u64(5));
    }

    #[test]
    fn test_clear_resets_everything() {
        let (store, curve) = store_for_key(5, 1024);
        let meeting = curve.mul(&BigInt::from_u64(12), &curve.g);
        store.observe(&meeting, &BigInt::from_u64(7), Herd::Wild, 0);
        store.observe(&meeting, &BigInt::from_u64(12), Herd::Tame, 1);
        assert!(store.is_solved());

        store.clear();
        assert!(store.is_empty());
        assert!(!store.is_solved());
        assert!(store.solution().is_none());
        assert_eq!(store.dps_total(), 0);
        assert_eq!(store.collisions_total(), 0);
    }

    #[test]
    fn test_restore_replaces_map() {
        let (store, curve) = store_for_key(5, 1024);
        let p = curve.mul(&BigInt::from_u64(3), &curve.g);
        store.observe(&p, &BigInt::from_u64(3), Herd::Tame, 0);

        let meeting = curve.mul(&BigInt::from_u64(12), &curve.g);
        store.restore(vec![DpRecord {
            point: meeting.clone(),
            distance: BigInt::from_u64(7),
            herd: Herd::Wild,
            t_observed: 42,
        }]);

        assert_eq!(store.len(), 1);
        assert_eq!(store.dps_total(), 1);
        // The restored record participates in the collision protocol.
        let key = store
            .observe(&meeting, &BigInt::from_u64(12), Herd::Tame, 50)
            .expect("restored record should collide");
        assert_eq!(key, BigInt::from_u64(5));
    }
}
