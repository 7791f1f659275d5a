use strum_macros::Display;

use crate::frame::{RawFrame, StatusWord, UpdateFlags};

/// The physical quantity a register/parameter pair measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Quantity {
    #[strum(to_string = "voltage")]
    Voltage,
    #[strum(to_string = "current")]
    Current,
    #[strum(to_string = "active power")]
    ActivePower,
}

/// Typed register contents extracted from a validated frame.
///
/// A measurement register whose ready bit is clear decodes to `None`: its
/// raw bytes are leftover data the chip has not refreshed, and treating
/// them as a value would silently produce garbage (or a division by zero
/// downstream). The parameter registers are valid in every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedFrame {
    pub status: u8,
    pub voltage_parameter: u32,
    pub voltage_register: Option<u32>,
    pub current_parameter: u32,
    pub current_register: Option<u32>,
    pub power_parameter: u32,
    pub power_register: Option<u32>,
    pub flags: UpdateFlags,
    pub pulse_count: u16,
}

impl From<&RawFrame> for DecodedFrame {
    fn from(frame: &RawFrame) -> Self {
        let flags = frame.flags();
        DecodedFrame {
            status: frame.status,
            voltage_parameter: frame.voltage_parameter(),
            voltage_register: flags.voltage_ready().then(|| frame.voltage_register()),
            current_parameter: frame.current_parameter(),
            current_register: flags.current_ready().then(|| frame.current_register()),
            power_parameter: frame.power_parameter(),
            power_register: flags.power_ready().then(|| frame.power_register()),
            flags,
            pulse_count: frame.pulse_count.get(),
        }
    }
}

impl DecodedFrame {
    pub fn status_word(&self) -> StatusWord {
        StatusWord::from(self.status)
    }

    /// See [`RawFrame::power_out_of_range`].
    pub fn power_out_of_range(&self) -> bool {
        self.status & crate::constants::STATUS_POWER_OUT_OF_RANGE
            == crate::constants::STATUS_POWER_OUT_OF_RANGE
    }
}
