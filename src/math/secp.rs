//! secp256k1 elliptic curve operations.
//!
//! Affine group law over F_p for y^2 = x^3 + 7, scalar multiplication,
//! on-curve checks, and SEC1 point decoding/encoding including the modular
//! square root needed for compressed keys.

use super::bigint::BigInt;
use super::constants::{CURVE_B, GX_HEX, GY_HEX, N_HEX, P_HEX};
use crate::types::Point;
use log::warn;

/// secp256k1 curve parameters and group operations.
#[derive(Debug, Clone)]
pub struct Secp256k1 {
    /// Prime modulus p = 2^256 - 2^32 - 977.
    pub p: BigInt,
    /// Group order n.
    pub n: BigInt,
    /// Curve parameter b = 7 (a = 0).
    pub b: BigInt,
    /// Generator point G.
    pub g: Point,
}

impl Secp256k1 {
    /// Create a curve instance from the published parameters.
    pub fn new() -> Self {
        let p = BigInt::from_hex(P_HEX).expect("valid secp256k1 prime p");
        let n = BigInt::from_hex(N_HEX).expect("valid secp256k1 order n");
        let g = Point::new(
            BigInt::from_hex(GX_HEX).expect("valid generator x"),
            BigInt::from_hex(GY_HEX).expect("valid generator y"),
        );

        Secp256k1 {
            p,
            n,
            b: BigInt::from_u64(CURVE_B),
            g,
        }
    }

    /// Point addition: P + Q.
    ///
    /// Affine chord rule: identity and inverse cases first, doubling when the
    /// operands coincide, otherwise s = (y2-y1)/(x2-x1) and the usual
    /// x3 = s^2 - x1 - x2, y3 = s(x1 - x3) - y1.
    pub fn add(&self, p: &Point, q: &Point) -> Point {
        if p.is_infinity() {
            return q.clone();
        }
        if q.is_infinity() {
            return p.clone();
        }

        if p.x == q.x {
            if p.y == q.y {
                return self.double(p);
            }
            // Additive inverses.
            return Point::infinity();
        }

        let dy = self.sub_mod(&q.y, &p.y, &self.p);
        let dx = self.sub_mod(&q.x, &p.x, &self.p);
        let dx_inv = match dx.mod_inverse(&self.p) {
            Some(inv) => inv,
            // Unreachable for distinct x below p; treated as an infinity
            // transition like the other degenerate cases.
            None => return Point::infinity(),
        };
        let s = self.mul_mod(&dy, &dx_inv, &self.p);

        let s2 = self.mul_mod(&s, &s, &self.p);
        let x3 = self.sub_mod(&self.sub_mod(&s2, &p.x, &self.p), &q.x, &self.p);
        let y3 = self.sub_mod(
            &self.mul_mod(&s, &self.sub_mod(&p.x, &x3, &self.p), &self.p),
            &p.y,
            &self.p,
        );

        Point::new(x3, y3)
    }

    /// Point doubling: 2P.
    pub fn double(&self, p: &Point) -> Point {
        if p.is_infinity() || p.y.is_zero() {
            return Point::infinity();
        }

        // s = 3x^2 / 2y
        let x2 = self.mul_mod(&p.x, &p.x, &self.p);
        let num = self.mul_mod(&BigInt::from_u64(3), &x2, &self.p);
        let den = self.mul_mod(&BigInt::from_u64(2), &p.y, &self.p);
        let den_inv = match den.mod_inverse(&self.p) {
            Some(inv) => inv,
            None => return Point::infinity(),
        };
        let s = self.mul_mod(&num, &den_inv, &self.p);

        let s2 = self.mul_mod(&s, &s, &self.p);
        let two_x = self.mul_mod(&BigInt::from_u64(2), &p.x, &self.p);
        let x3 = self.sub_mod(&s2, &two_x, &self.p);
        let y3 = self.sub_mod(
            &self.mul_mod(&s, &self.sub_mod(&p.x, &x3, &self.p), &self.p),
            &p.y,
            &self.p,
        );

        Point::new(x3, y3)
    }

    /// Scalar multiplication: k * P, left-to-right double-and-add from O.
    /// k = 0 yields O; inputs are always nonnegative.
    pub fn mul(&self, k: &BigInt, point: &Point) -> Point {
        if k.is_zero() || point.is_infinity() {
            return Point::infinity();
        }

        let mut acc = Point::infinity();
        for i in (0..k.bit_length()).rev() {
            acc = self.double(&acc);
            if k.bit(i) {
                acc = self.add(&acc, point);
            }
        }
        acc
    }

    /// Negate: -P = (x, p - y).
    pub fn negate(&self, point: &Point) -> Point {
        if point.is_infinity() {
            return Point::infinity();
        }
        Point::new(point.x.clone(), self.sub_mod(&BigInt::zero(), &point.y, &self.p))
    }

    /// Check y^2 = x^3 + 7 (mod p); O counts as on-curve.
    pub fn is_on_curve(&self, point: &Point) -> bool {
        if point.is_infinity() {
            return true;
        }

        let y2 = self.mul_mod(&point.y, &point.y, &self.p);
        let x2 = self.mul_mod(&point.x, &point.x, &self.p);
        let x3 = self.mul_mod(&x2, &point.x, &self.p);
        let rhs = self.add_mod(&x3, &self.b, &self.p);
        y2 == rhs
    }

    /// Modular square root for p ≡ 3 (mod 4): a^((p+1)/4) mod p.
    /// Returns `None` when `a` is a non-residue (the candidate fails to
    /// square back to `a`).
    pub fn sqrt_mod_p(&self, a: &BigInt) -> Option<BigInt> {
        if a.is_zero() {
            return Some(BigInt::zero());
        }

        let exp = &(&self.p + &BigInt::one()) >> 2;
        let candidate = a.modpow(&exp, &self.p);
        let check = self.mul_mod(&candidate, &candidate, &self.p);
        if check == *a {
            Some(candidate)
        } else {
            None
        }
    }

    /// Decode a SEC1 point: 33-byte compressed (02/03 ‖ x) or 65-byte
    /// uncompressed (04 ‖ x ‖ y). Rejects off-curve input and non-residue
    /// x-coordinates.
    pub fn decode_point(&self, bytes: &[u8]) -> Option<Point> {
        match bytes.len() {
            33 if bytes[0] == 0x02 || bytes[0] == 0x03 => {
                let x = BigInt::from_bytes_be(&bytes[1..33]);
                if x >= self.p {
                    warn!("compressed point x >= p: {}", x);
                    return None;
                }

                let x2 = self.mul_mod(&x, &x, &self.p);
                let x3 = self.mul_mod(&x2, &x, &self.p);
                let rhs = self.add_mod(&x3, &self.b, &self.p);
                let root = match self.sqrt_mod_p(&rhs) {
                    Some(root) => root,
                    None => {
                        warn!("non-residue x in compressed point: {}", x);
                        return None;
                    }
                };

                let want_odd = bytes[0] == 0x03;
                let root_odd = root.low_u64() & 1 == 1;
                let y = if root_odd == want_odd {
                    root
                } else {
                    self.sub_mod(&BigInt::zero(), &root, &self.p)
                };

                Some(Point::new(x, y))
            }
            65 if bytes[0] == 0x04 => {
                let x = BigInt::from_bytes_be(&bytes[1..33]);
                let y = BigInt::from_bytes_be(&bytes[33..65]);
                if x >= self.p || y >= self.p {
                    return None;
                }
                let point = Point::new(x, y);
                if !self.is_on_curve(&point) {
                    warn!("uncompressed point not on curve");
                    return None;
                }
                Some(point)
            }
            _ => None,
        }
    }

    /// Encode compressed: (02 | 03) ‖ x, prefix from y parity. `None` for O.
    pub fn encode_compressed(&self, point: &Point) -> Option<[u8; 33]> {
        if point.is_infinity() {
            return None;
        }
        let mut out = [0u8; 33];
        out[0] = if point.y.low_u64() & 1 == 1 { 0x03 } else { 0x02 };
        out[1..33].copy_from_slice(&point.x.to_bytes_be32());
        Some(out)
    }

    /// Encode uncompressed: 04 ‖ x ‖ y. `None` for O.
    pub fn encode_uncompressed(&self, point: &Point) -> Option<[u8; 65]> {
        if point.is_infinity() {
            return None;
        }
        let mut out = [0u8; 65];
        out[0] = 0x04;
        out[1..33].copy_from_slice(&point.x.to_bytes_be32());
        out[33..65].copy_from_slice(&point.y.to_bytes_be32());
        Some(out)
    }

    /// Parse a public key from hex text. Accepts an optional `0x` prefix and
    /// three layouts: 66 hex chars (compressed), 130 hex chars beginning
    /// `04` (uncompressed), or 128 hex chars of raw x ‖ y.
    pub fn parse_pubkey(&self, hex_str: &str) -> Option<Point> {
        let digits = hex_str
            .strip_prefix("0x")
            .or_else(|| hex_str.strip_prefix("0X"))
            .unwrap_or(hex_str);

        match digits.len() {
            66 | 130 => {
                let bytes = hex::decode(digits).ok()?;
                self.decode_point(&bytes)
            }
            128 => {
                let bytes = hex::decode(digits).ok()?;
                let x = BigInt::from_bytes_be(&bytes[..32]);
                let y = BigInt::from_bytes_be(&bytes[32..]);
                if x >= self.p || y >= self.p {
                    return None;
                }
                let point = Point::new(x, y);
                if !self.is_on_curve(&point) {
                    return None;
                }
                Some(point)
            }
            _ => None,
        }
    }

    /// (a - b) mod n, both operands already below n.
    pub fn sub_mod_n(&self, a: &BigInt, b: &BigInt) -> BigInt {
        self.sub_mod(&(a % &self.n), &(b % &self.n), &self.n)
    }

    fn add_mod(&self, a: &BigInt, b: &BigInt, m: &BigInt) -> BigInt {
        &(a + b) % m
    }

    fn sub_mod(&self, a: &BigInt, b: &BigInt, m: &BigInt) -> BigInt {
        // Both operands are reduced; lift a by m before subtracting.
        &(&(a + m) - b) % m
    }

    fn mul_mod(&self, a: &BigInt, b: &BigInt, m: &BigInt) -> BigInt {
        &(a * b) % m
    }
}

impl Default for Secp256k1 {
    fn default() -> Self {
        Self::new()
    }
}
