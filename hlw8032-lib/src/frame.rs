use modular_bitfield::prelude::*;
use num_enum::{FromPrimitive, IntoPrimitive};
use zerocopy::byteorder::big_endian::U16;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::constants::{
    CHECKSUM_END, CHECKSUM_START, FRAME_SIZE, STATUS_POWER_OUT_OF_RANGE, SYNC_MARKER,
};
use crate::error::MeterError;

/// Per-frame bitfield telling which measurement registers carry fresh data
/// and whether the hardware pulse counter wrapped since the last frame.
#[bitfield(bytes = 1)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateFlags {
    #[skip]
    unused: B4,
    pub power_ready: bool,
    pub current_ready: bool,
    pub voltage_ready: bool,
    pub pulse_overflow: bool,
}

/// Interpretation of the status register (frame byte 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum StatusWord {
    /// Chip operating normally
    Normal = 0x55,
    /// Calibration storage check failed; register contents are unusable
    Unprogrammed = 0xAA,
    #[num_enum(catch_all)]
    Other(u8),
}

/// One 24-byte telemetry frame exactly as it appears on the wire.
///
/// The three measurement registers and their calibration-reference
/// parameters are 24-bit big-endian; the pulse counter is 16-bit big-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct RawFrame {
    pub status: u8,
    pub sync: u8,
    pub voltage_parameter: [u8; 3],
    pub voltage_register: [u8; 3],
    pub current_parameter: [u8; 3],
    pub current_register: [u8; 3],
    pub power_parameter: [u8; 3],
    pub power_register: [u8; 3],
    pub update_flags: u8,
    pub pulse_count: U16,
    pub checksum: u8,
}

fn u24_be(bytes: [u8; 3]) -> u32 {
    ((bytes[0] as u32) << 16) | ((bytes[1] as u32) << 8) | bytes[2] as u32
}

impl RawFrame {
    /// Parse a frame from the first 24 bytes of `bytes`.
    pub fn parse(bytes: &[u8]) -> Result<Self, MeterError> {
        if bytes.len() < FRAME_SIZE {
            return Err(MeterError::TruncatedFrame {
                expected: FRAME_SIZE,
                actual: bytes.len(),
            });
        }
        RawFrame::read_from_bytes(&bytes[..FRAME_SIZE]).map_err(|_| MeterError::TruncatedFrame {
            expected: FRAME_SIZE,
            actual: bytes.len(),
        })
    }

    /// Checksum as defined by the chip: unsigned sum of bytes 2..=22 mod 256.
    pub fn computed_checksum(&self) -> u8 {
        self.as_bytes()[CHECKSUM_START..CHECKSUM_END]
            .iter()
            .fold(0u8, |acc, b| acc.wrapping_add(*b))
    }

    /// Pure checksum check; total over any 24-byte frame, never panics.
    pub fn checksum_valid(&self) -> bool {
        self.computed_checksum() == self.checksum
    }

    /// Full acceptance check: sync marker and checksum must both match.
    /// A frame failing either is discarded in its entirety upstream.
    pub fn verify(&self) -> Result<(), MeterError> {
        if self.sync != SYNC_MARKER {
            return Err(MeterError::SyncMismatch(self.sync));
        }
        let calculated = self.computed_checksum();
        if calculated != self.checksum {
            return Err(MeterError::ChecksumMismatch {
                expected: self.checksum,
                calculated,
            });
        }
        Ok(())
    }

    pub fn status_word(&self) -> StatusWord {
        StatusWord::from_primitive(self.status)
    }

    /// True when the status byte carries the chip's "power cycle exceeds
    /// range" pattern, emitted under no-load. Active power reads as 0 then.
    pub fn power_out_of_range(&self) -> bool {
        self.status & STATUS_POWER_OUT_OF_RANGE == STATUS_POWER_OUT_OF_RANGE
    }

    pub fn flags(&self) -> UpdateFlags {
        UpdateFlags::from_bytes([self.update_flags])
    }

    pub fn voltage_parameter(&self) -> u32 {
        u24_be(self.voltage_parameter)
    }

    pub fn voltage_register(&self) -> u32 {
        u24_be(self.voltage_register)
    }

    pub fn current_parameter(&self) -> u32 {
        u24_be(self.current_parameter)
    }

    pub fn current_register(&self) -> u32 {
        u24_be(self.current_register)
    }

    pub fn power_parameter(&self) -> u32 {
        u24_be(self.power_parameter)
    }

    pub fn power_register(&self) -> u32 {
        u24_be(self.power_register)
    }
}
