//! rangecrack - Pollard's parallel kangaroo ECDLP solver for secp256k1.
//!
//! Given a target public key Q and a bounded range [a, b] of candidate
//! private scalars, finds k with k·G = Q. A herd of tame walkers (starting at
//! known scalars inside the range) and wild walkers (starting at Q) perform
//! the same pseudo-random walk over the curve; both deposit distinguished
//! points into a shared store, and a cross-herd collision yields the key from
//! the difference of the accumulated distances.
//!
//! Practical for ranges up to roughly 80 bits; wider ranges make the
//! expected sqrt-of-width work infeasible.

#![deny(unsafe_code)]

pub mod checkpoint;
pub mod config;
pub mod dp;
pub mod kangaroo;
pub mod math;
pub mod types;
pub mod utils;

// Re-export key types for library usage
pub use checkpoint::Checkpoint;
pub use config::Config;
pub use dp::DpStore;
pub use kangaroo::{JumpTable, KangarooEngine};
pub use math::{BigInt, Secp256k1};
pub use types::{Herd, Point, Stats};
