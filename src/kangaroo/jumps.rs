//! Deterministic jump table for the kangaroo walk.
//!
//! 256 precomputed (distance, distance·G) pairs sized to the search range,
//! plus the x-only index function both herds share. Tame and wild walkers
//! visiting the same point must select the same jump or the walks never
//! merge.

use crate::math::bigint::BigInt;
use crate::math::constants::JUMP_TABLE_SIZE;
use crate::math::secp::Secp256k1;
use crate::types::Point;
use log::info;

/// Precomputed jump distances and their curve images.
#[derive(Debug, Clone)]
pub struct JumpTable {
    distances: Vec<BigInt>,
    points: Vec<Point>,
}

impl JumpTable {
    /// Build the table for a search range.
    ///
    /// With W = bit_length(range_hi - range_lo) and e = max(1, W/2 - 8),
    /// entry i carries d_i = 2^e + (i + 1). The mean jump is near
    /// sqrt(range width) / 256, Pollard's optimal step size, and the strictly
    /// increasing distances keep index-to-distance unambiguous.
    pub fn build(curve: &Secp256k1, range_lo: &BigInt, range_hi: &BigInt) -> Self {
        let width = range_hi - range_lo;
        let base_bits = (width.bit_length() as i64 / 2 - 8).max(1) as u64;
        let base = &BigInt::one() << base_bits;

        let mut distances = Vec::with_capacity(JUMP_TABLE_SIZE);
        let mut points = Vec::with_capacity(JUMP_TABLE_SIZE);
        for i in 0..JUMP_TABLE_SIZE {
            let d = &base + &BigInt::from_u64(i as u64 + 1);
            points.push(curve.mul(&d, &curve.g));
            distances.push(d);
        }

        info!(
            "precomputed {} jump distances, base 2^{}",
            JUMP_TABLE_SIZE, base_bits
        );
        JumpTable { distances, points }
    }

    /// Jump index for a point: the low byte of its x-coordinate.
    ///
    /// Deterministic and x-only, so both herds pick the same jump at the
    /// same x. Equivalent to parsing the last two uppercase hex characters
    /// of x as a byte.
    pub fn index(point: &Point) -> usize {
        (point.x.low_u64() & 0xFF) as usize
    }

    pub fn distance(&self, i: usize) -> &BigInt {
        &self.distances[i]
    }

    pub fn point(&self, i: usize) -> &Point {
        &self.points[i]
    }

    pub fn len(&self) -> usize {
        self.distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_range() -> (BigInt, BigInt) {
        (
            BigInt::from_hex("1000000").unwrap(),
            BigInt::from_hex("2000000").unwrap(),
        )
    }

    #[test]
    fn test_table_shape() {
        let curve = Secp256k1::new();
        let (lo, hi) = small_range();
        let table = JumpTable::build(&curve, &lo, &hi);

        assert_eq!(table.len(), 256);
        for i in 1..table.len() {
            assert!(table.distance(i) > table.distance(i - 1));
        }
        assert!(!table.distance(0).is_zero());
    }

    #[test]
    fn test_base_exponent_tracks_range_width() {
        let curve = Secp256k1::new();
        let (lo, hi) = small_range();
        let table = JumpTable::build(&curve, &lo, &hi);

        // width 2^24 -> e = 4, so d_0 = 2^4 + 1.
        assert_eq!(*table.distance(0), BigInt::from_u64(17));
        assert_eq!(*table.distance(255), BigInt::from_u64(16 + 256));

        // A narrow range clamps the exponent at 1.
        let narrow = JumpTable::build(
            &curve,
            &BigInt::from_hex("100").unwrap(),
            &BigInt::from_hex("200").unwrap(),
        );
        assert_eq!(*narrow.distance(0), BigInt::from_u64(3));
    }

    #[test]
    fn test_entries_are_distance_times_g() {
        let curve = Secp256k1::new();
        let (lo, hi) = small_range();
        let table = JumpTable::build(&curve, &lo, &hi);

        for &i in &[0usize, 1, 42, 128, 255] {
            let expected = curve.mul(table.distance(i), &curve.g);
            assert_eq!(table.point(i), &expected);
            assert!(curve.is_on_curve(table.point(i)));
        }
    }

    #[test]
    fn test_index_is_low_byte_of_x() {
        let p = Point::new(BigInt::from_hex("ABCDEF").unwrap(), BigInt::one());
        assert_eq!(JumpTable::index(&p), 0xEF);

        let q = Point::new(BigInt::from_u64(0x100), BigInt::one());
        assert_eq!(JumpTable::index(&q), 0);
    }

    #[test]
    fn test_index_deterministic_across_threads() {
        let curve = Secp256k1::new();
        let p = curve.mul(&BigInt::from_u64(987_654_321), &curve.g);

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let p = p.clone();
                std::thread::spawn(move || JumpTable::index(&p))
            })
            .collect();
        let results: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results[0], results[1]);
        assert_eq!(results[0], JumpTable::index(&p));
    }
}
