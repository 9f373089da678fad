//! Arbitrary-precision integer helpers.
//!
//! A thin wrapper over `num_bigint::BigUint` carrying the exact operation set
//! the solver needs: hex round-trips, bit inspection, modular inverse and
//! exponentiation, and unbiased range sampling for walker starts.

use num_bigint::{BigUint, RandBigInt};
use num_traits::{One, ToPrimitive, Zero};
use rand::Rng;
use std::fmt;
use std::ops::{Add, Mul, Rem, Shl, Shr, Sub};

/// Unbounded nonnegative integer.
///
/// Used both for scalars (reduced mod n by the curve layer) and field
/// elements (reduced mod p). The two moduli live on [`crate::math::Secp256k1`];
/// this type itself is modulus-agnostic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BigInt(BigUint);

impl BigInt {
    /// Create zero.
    pub fn zero() -> Self {
        BigInt(BigUint::zero())
    }

    /// Create one.
    pub fn one() -> Self {
        BigInt(BigUint::one())
    }

    /// Create from u64.
    pub fn from_u64(x: u64) -> Self {
        BigInt(BigUint::from(x))
    }

    /// Parse from hex. Accepts an optional `0x`/`0X` prefix, is
    /// case-insensitive, and rejects empty or non-hex input.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex
            .strip_prefix("0x")
            .or_else(|| hex.strip_prefix("0X"))
            .unwrap_or(hex);
        if digits.is_empty() {
            return None;
        }
        BigUint::parse_bytes(digits.as_bytes(), 16).map(BigInt)
    }

    /// Uppercase hex, no prefix, no leading-zero padding (`"0"` for zero).
    pub fn to_hex(&self) -> String {
        format!("{:X}", self.0)
    }

    /// Uppercase hex left-padded with zeros to `width` characters.
    pub fn to_hex_padded(&self, width: usize) -> String {
        format!("{:0>width$}", self.to_hex(), width = width)
    }

    /// Create from big-endian bytes.
    pub fn from_bytes_be(bytes: &[u8]) -> Self {
        BigInt(BigUint::from_bytes_be(bytes))
    }

    /// Canonical 32-byte big-endian form. Values of 256 bits or fewer only.
    pub fn to_bytes_be32(&self) -> [u8; 32] {
        let raw = self.0.to_bytes_be();
        let mut out = [0u8; 32];
        out[32 - raw.len()..].copy_from_slice(&raw);
        out
    }

    /// Number of significant bits (0 for zero).
    pub fn bit_length(&self) -> u64 {
        self.0.bits()
    }

    /// Bit at position `i` (little-endian numbering).
    pub fn bit(&self, i: u64) -> bool {
        let digit = self.0.iter_u64_digits().nth((i / 64) as usize).unwrap_or(0);
        (digit >> (i % 64)) & 1 == 1
    }

    /// Least-significant 64 bits.
    pub fn low_u64(&self) -> u64 {
        self.0.iter_u64_digits().next().unwrap_or(0)
    }

    /// Check if zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Modular exponentiation: self^exp mod modulus.
    pub fn modpow(&self, exp: &BigInt, modulus: &BigInt) -> BigInt {
        BigInt(self.0.modpow(&exp.0, &modulus.0))
    }

    /// Modular inverse via the extended Euclidean algorithm.
    ///
    /// Returns `None` when gcd(self, modulus) != 1; a legitimate inverse is
    /// never zero, so callers need no sentinel check.
    pub fn mod_inverse(&self, modulus: &BigInt) -> Option<BigInt> {
        use num_bigint::BigInt as SignedInt;

        if self.is_zero() || modulus.is_zero() {
            return None;
        }

        let m = SignedInt::from(modulus.0.clone());
        let mut old_r = SignedInt::from(&self.0 % &modulus.0);
        let mut r = m.clone();
        let mut old_s = SignedInt::one();
        let mut s = SignedInt::zero();

        while !r.is_zero() {
            let quotient = &old_r / &r;
            let next_r = &old_r - &quotient * &r;
            old_r = std::mem::replace(&mut r, next_r);
            let next_s = &old_s - &quotient * &s;
            old_s = std::mem::replace(&mut s, next_s);
        }

        if old_r != SignedInt::one() {
            return None;
        }

        let inv = ((old_s % &m) + &m) % &m;
        Some(BigInt(inv.to_biguint().expect("reduced inverse is nonnegative")))
    }

    /// Uniform draw in [0, bound) by rejection sampling. `bound` must be
    /// positive.
    pub fn random_below<R: Rng + ?Sized>(rng: &mut R, bound: &BigInt) -> BigInt {
        BigInt(rng.gen_biguint_below(&bound.0))
    }

    /// Truncate to u64 if the value fits.
    pub fn to_u64(&self) -> Option<u64> {
        self.0.to_u64()
    }
}

impl From<u64> for BigInt {
    fn from(x: u64) -> Self {
        BigInt::from_u64(x)
    }
}

impl Add for &BigInt {
    type Output = BigInt;

    fn add(self, other: &BigInt) -> BigInt {
        BigInt(&self.0 + &other.0)
    }
}

impl Sub for &BigInt {
    type Output = BigInt;

    /// Plain subtraction; callers guarantee self >= other. Modular
    /// subtraction lives on the curve layer.
    fn sub(self, other: &BigInt) -> BigInt {
        BigInt(&self.0 - &other.0)
    }
}

impl Mul for &BigInt {
    type Output = BigInt;

    fn mul(self, other: &BigInt) -> BigInt {
        BigInt(&self.0 * &other.0)
    }
}

impl Rem for &BigInt {
    type Output = BigInt;

    fn rem(self, other: &BigInt) -> BigInt {
        BigInt(&self.0 % &other.0)
    }
}

impl Shl<u64> for &BigInt {
    type Output = BigInt;

    fn shl(self, bits: u64) -> BigInt {
        BigInt(&self.0 << bits)
    }
}

impl Shr<u64> for &BigInt {
    type Output = BigInt;

    fn shr(self, bits: u64) -> BigInt {
        BigInt(&self.0 >> bits)
    }
}

impl fmt::Display for BigInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
