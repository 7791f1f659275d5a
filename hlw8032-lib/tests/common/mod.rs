//! Common test utilities and shared imports

// Allow unused imports and dead code since this is a shared module
// used across multiple test files - not all items are used in every test file
#[allow(unused_imports)]
pub use hlw8032_lib::constants::{FRAME_SIZE, STATUS_NORMAL, STATUS_POWER_OUT_OF_RANGE, SYNC_MARKER};
#[allow(unused_imports)]
pub use hlw8032_lib::decode::{DecodedFrame, Quantity};
#[allow(unused_imports)]
pub use hlw8032_lib::error::MeterError;
#[allow(unused_imports)]
pub use hlw8032_lib::frame::{RawFrame, StatusWord, UpdateFlags};
#[allow(unused_imports)]
pub use hlw8032_lib::meter::{CalibrationConstants, Meter, Reading};
#[allow(unused_imports)]
pub use hlw8032_lib::sync::{FrameReader, FrameSynchronizer};

/// Register values for building a wire frame in tests.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy)]
pub struct FrameFields {
    pub status: u8,
    pub voltage_parameter: u32,
    pub voltage_register: u32,
    pub current_parameter: u32,
    pub current_register: u32,
    pub power_parameter: u32,
    pub power_register: u32,
    pub update_flags: u8,
    pub pulse_count: u16,
}

#[allow(dead_code)]
impl FrameFields {
    /// The pinned-arithmetic scenario: voltage, current and power all
    /// ready, register/parameter ratios 0.5, 0.1 and 0.05, pulse count 1.
    pub fn reference() -> Self {
        Self {
            status: 0x00,
            voltage_parameter: 0x64,
            voltage_register: 0x32,
            current_parameter: 0x64,
            current_register: 0x0A,
            power_parameter: 0x64,
            power_register: 0x05,
            update_flags: 0x70,
            pulse_count: 0x0001,
        }
    }

    /// Serialize to the 24-byte wire layout with a correct trailing
    /// checksum.
    pub fn to_bytes(&self) -> [u8; FRAME_SIZE] {
        let mut bytes = [0u8; FRAME_SIZE];
        bytes[0] = self.status;
        bytes[1] = SYNC_MARKER;
        put_u24(&mut bytes[2..5], self.voltage_parameter);
        put_u24(&mut bytes[5..8], self.voltage_register);
        put_u24(&mut bytes[8..11], self.current_parameter);
        put_u24(&mut bytes[11..14], self.current_register);
        put_u24(&mut bytes[14..17], self.power_parameter);
        put_u24(&mut bytes[17..20], self.power_register);
        bytes[20] = self.update_flags;
        bytes[21..23].copy_from_slice(&self.pulse_count.to_be_bytes());
        bytes[23] = checksum_of(&bytes);
        bytes
    }

    pub fn to_frame(&self) -> RawFrame {
        RawFrame::parse(&self.to_bytes()).expect("24 bytes always parse")
    }
}

#[allow(dead_code)]
pub fn put_u24(dst: &mut [u8], value: u32) {
    dst[0] = (value >> 16) as u8;
    dst[1] = (value >> 8) as u8;
    dst[2] = value as u8;
}

/// Plain-sum checksum over bytes 2..=22, the chip's published formula.
#[allow(dead_code)]
pub fn checksum_of(bytes: &[u8; FRAME_SIZE]) -> u8 {
    bytes[2..23].iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// Decode hex string to bytes for testing
#[allow(dead_code)]
pub fn hex_to_bytes(hex_data: &str) -> Vec<u8> {
    hex::decode(hex_data).expect("Failed to decode hex")
}
