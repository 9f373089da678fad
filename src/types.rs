//! Shared types for the kangaroo engine.
//!
//! Contains the affine curve point, the tame/wild herd tag, the
//! distinguished-point record, and the statistics snapshot.

use crate::math::bigint::BigInt;
use std::fmt;

/// Affine secp256k1 point, or the point at infinity.
///
/// Invariant: every non-infinity point handed around by the engine is
/// on-curve; the curve layer enforces this at decode and construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Point {
    /// X coordinate in F_p.
    pub x: BigInt,
    /// Y coordinate in F_p.
    pub y: BigInt,
    infinity: bool,
}

impl Point {
    /// The point at infinity (group identity).
    pub fn infinity() -> Self {
        Point {
            x: BigInt::zero(),
            y: BigInt::zero(),
            infinity: true,
        }
    }

    /// Affine point from coordinates.
    pub fn new(x: BigInt, y: BigInt) -> Self {
        Point { x, y, infinity: false }
    }

    /// Check if this is the point at infinity.
    pub fn is_infinity(&self) -> bool {
        self.infinity
    }

    /// Canonical 32-byte big-endian x-coordinate.
    ///
    /// X-only: the two points (x, y) and (x, p-y) share a fingerprint. The
    /// collision protocol absorbs the resulting aliasing by verifying every
    /// candidate key against the target.
    pub fn fingerprint(&self) -> [u8; 32] {
        self.x.to_bytes_be32()
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.infinity {
            write!(f, "Infinity")
        } else {
            write!(f, "({}, {})", self.x, self.y)
        }
    }
}

/// Which herd a walker belongs to.
///
/// Tame walkers start at a known scalar inside the search range; wild
/// walkers start at the target with distance zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Herd {
    Tame,
    Wild,
}

impl Herd {
    pub fn is_tame(self) -> bool {
        matches!(self, Herd::Tame)
    }

    pub fn from_is_tame(is_tame: bool) -> Self {
        if is_tame {
            Herd::Tame
        } else {
            Herd::Wild
        }
    }
}

impl fmt::Display for Herd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Herd::Tame => write!(f, "tame"),
            Herd::Wild => write!(f, "wild"),
        }
    }
}

/// A distinguished point observed by some walker.
#[derive(Debug, Clone)]
pub struct DpRecord {
    /// The observed point. Retained in full so checkpoints can emit X:Y.
    pub point: Point,
    /// Distance accumulated from the walker's start.
    pub distance: BigInt,
    /// Herd of the observing walker.
    pub herd: Herd,
    /// Monotonic seconds since engine start at observation time.
    pub t_observed: u64,
}

/// Point-in-time statistics snapshot. Counters may be a relaxed mix; the
/// snapshot is advisory.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub jumps_total: u64,
    pub dps_total: u64,
    pub collisions_total: u64,
    pub elapsed_seconds: u64,
    /// 0 when stopped, otherwise the configured worker count.
    pub threads_active: i32,
    /// Uppercase hex, zero-padded to 64 characters.
    pub range_start_hex: String,
    pub range_end_hex: String,
    /// Present only once solved; same 64-character padded form.
    pub found_key_hex: Option<String>,
    pub is_solved: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infinity_point() {
        let o = Point::infinity();
        assert!(o.is_infinity());
        assert_eq!(o.to_string(), "Infinity");
    }

    #[test]
    fn test_fingerprint_is_padded_x() {
        let p = Point::new(BigInt::from_u64(0xAB), BigInt::from_u64(1));
        let fp = p.fingerprint();
        assert_eq!(fp[31], 0xAB);
        assert!(fp[..31].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_negated_points_share_fingerprint() {
        let x = BigInt::from_u64(42);
        let a = Point::new(x.clone(), BigInt::from_u64(5));
        let b = Point::new(x, BigInt::from_u64(95));
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a, b);
    }

    #[test]
    fn test_herd_tag() {
        assert!(Herd::Tame.is_tame());
        assert!(!Herd::Wild.is_tame());
        assert_eq!(Herd::from_is_tame(true), Herd::Tame);
        assert_eq!(Herd::from_is_tame(false), Herd::Wild);
        assert_eq!(Herd::Wild.to_string(), "wild");
    }
}
