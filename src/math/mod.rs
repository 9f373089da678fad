//! Mathematics module.
//!
//! Arbitrary-precision integers, secp256k1 curve operations, and the shared
//! numeric constants.

pub mod bigint;
pub mod constants;
pub mod secp;

// Re-export commonly used types
pub use bigint::BigInt;
pub use secp::Secp256k1;
