//! Checkpoint schema and serialization.
//!
//! A self-describing JSON record of the engine's counters and every
//! distinguished point, so a long hunt can be inspected or resumed. The
//! carrier is plain serde_json over any `Read`/`Write`.

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Current checkpoint format version.
pub const CHECKPOINT_VERSION: &str = "1.0.0";

/// One distinguished point: `point` is `XHEX:YHEX`, `distance` is the
/// observer's accumulated distance in hex, `timestamp` is seconds since
/// engine start at observation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointDp {
    pub point: String,
    pub distance: String,
    pub is_tame: bool,
    pub timestamp: u64,
}

/// Full engine snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: String,
    /// Wall-clock seconds at save time.
    pub timestamp: u64,
    pub total_jumps: u64,
    pub distinguished_points_count: u64,
    /// Uppercase hex scalars, unpadded.
    pub range_start: String,
    pub range_end: String,
    pub num_threads: i32,
    pub distinguished_bits: i32,
    pub distinguished_points: Vec<CheckpointDp>,
}

impl Checkpoint {
    /// Serialize as pretty JSON.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self).context("serialize checkpoint")?;
        Ok(())
    }

    /// Deserialize and validate.
    pub fn read_from<R: Read>(reader: R) -> Result<Self> {
        let checkpoint: Checkpoint =
            serde_json::from_reader(reader).context("parse checkpoint json")?;
        checkpoint.validate()?;
        Ok(checkpoint)
    }

    /// Structural validation: a version string, a nonzero save time, and a
    /// DP count consistent with the record list.
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.version.is_empty(), "checkpoint has no version");
        ensure!(self.timestamp != 0, "checkpoint has a zero timestamp");
        ensure!(
            self.distinguished_points_count == self.distinguished_points.len() as u64,
            "distinguished point count {} does not match the {} records",
            self.distinguished_points_count,
            self.distinguished_points.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Checkpoint {
        Checkpoint {
            version: CHECKPOINT_VERSION.to_string(),
            timestamp: 1_700_000_000,
            total_jumps: 123_456,
            distinguished_points_count: 1,
            range_start: "1000000".to_string(),
            range_end: "2000000".to_string(),
            num_threads: 4,
            distinguished_bits: 12,
            distinguished_points: vec![CheckpointDp {
                point: "AB12:CD34".to_string(),
                distance: "1F".to_string(),
                is_tame: true,
                timestamp: 7,
            }],
        }
    }

    #[test]
    fn test_round_trip() {
        let checkpoint = sample();
        let mut buf = Vec::new();
        checkpoint.write_to(&mut buf).unwrap();

        let loaded = Checkpoint::read_from(buf.as_slice()).unwrap();
        assert_eq!(loaded.version, checkpoint.version);
        assert_eq!(loaded.total_jumps, checkpoint.total_jumps);
        assert_eq!(loaded.distinguished_points, checkpoint.distinguished_points);
    }

    #[test]
    fn test_validation_rejects_bad_metadata() {
        let mut checkpoint = sample();
        checkpoint.version = String::new();
        assert!(checkpoint.validate().is_err());

        let mut checkpoint = sample();
        checkpoint.timestamp = 0;
        assert!(checkpoint.validate().is_err());

        let mut checkpoint = sample();
        checkpoint.distinguished_points_count = 9;
        assert!(checkpoint.validate().is_err());
    }

    #[test]
    fn test_read_rejects_garbage() {
        assert!(Checkpoint::read_from(&b"not json"[..]).is_err());
        assert!(Checkpoint::read_from(&b"{}"[..]).is_err());
    }
}
