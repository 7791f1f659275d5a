use std::io;
use thiserror::Error;

use crate::decode::Quantity;

/// The primary error type for the `hlw8032-rs` library.
#[derive(Error, Debug)]
pub enum MeterError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Checksum mismatch: frame carries {expected:#04x}, calculated {calculated:#04x}")]
    ChecksumMismatch { expected: u8, calculated: u8 },

    #[error("Sync marker missing: expected 0x5a at frame offset 1, got {0:#04x}")]
    SyncMismatch(u8),

    #[error("Truncated frame: expected {expected} bytes, got {actual}")]
    TruncatedFrame { expected: usize, actual: usize },

    #[error("{0} register has not been marked ready by the chip yet")]
    RegisterUnready(Quantity),

    #[error("Invalid calibration: {0}")]
    InvalidCalibration(String),
}
