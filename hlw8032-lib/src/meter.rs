use serde::Serialize;
use std::fmt;
use tracing::debug;

use crate::constants::PULSE_COUNTER_MODULUS;
use crate::decode::{DecodedFrame, Quantity};
use crate::error::MeterError;
use crate::frame::StatusWord;

/// Installation-specific scale factors, fixed for the lifetime of a sensor.
///
/// `kv` converts the dimensionless voltage register ratio into volts and is
/// set by the external resistor divider; `ki` converts the current ratio
/// into amperes and is set by the shunt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationConstants {
    kv: f64,
    ki: f64,
}

impl CalibrationConstants {
    pub fn new(kv: f64, ki: f64) -> Result<Self, MeterError> {
        for (name, value) in [("Kv", kv), ("Ki", ki)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(MeterError::InvalidCalibration(format!(
                    "{name} must be a positive finite number, got {value}"
                )));
            }
        }
        Ok(Self { kv, ki })
    }

    /// Derive the constants from the resistor values of the chip's
    /// reference circuit: `vol_r1` is the upper divider chain, `vol_r2` the
    /// lower divider resistor, `shunt` the current sense resistor, all in
    /// ohms.
    pub fn from_circuit(vol_r1: f64, vol_r2: f64, shunt: f64) -> Result<Self, MeterError> {
        for (name, value) in [("vol_r1", vol_r1), ("vol_r2", vol_r2), ("shunt", shunt)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(MeterError::InvalidCalibration(format!(
                    "{name} must be a positive finite resistance, got {value}"
                )));
            }
        }
        Self::new(vol_r1 / (vol_r2 * 1000.0), 1.0 / (shunt * 1000.0))
    }

    pub fn kv(&self) -> f64 {
        self.kv
    }

    pub fn ki(&self) -> f64 {
        self.ki
    }

    /// Energy pulses per kWh for a given power-parameter register value.
    /// Ties the chip's internal pulse frequency to physical power; the
    /// caller must ensure `power_parameter` is nonzero.
    pub fn pulses_per_kwh(&self, power_parameter: u32) -> f64 {
        (1e9 * 3600.0) / (power_parameter as f64 * self.kv * self.ki)
    }
}

/// One calibrated measurement, produced per accepted frame.
///
/// A quantity is `None` until its register has been observed ready at
/// least once since sensor start; "not yet measured" is never reported as
/// zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reading {
    pub voltage_v: Option<f64>,
    pub current_a: Option<f64>,
    pub active_power_w: Option<f64>,
    pub apparent_power_w: Option<f64>,
    pub power_factor: Option<f64>,
    pub cumulative_pulses: u64,
    pub energy_kwh: Option<f64>,
}

impl Reading {
    pub fn voltage(&self) -> Result<f64, MeterError> {
        self.voltage_v
            .ok_or(MeterError::RegisterUnready(Quantity::Voltage))
    }

    pub fn current(&self) -> Result<f64, MeterError> {
        self.current_a
            .ok_or(MeterError::RegisterUnready(Quantity::Current))
    }

    pub fn active_power(&self) -> Result<f64, MeterError> {
        self.active_power_w
            .ok_or(MeterError::RegisterUnready(Quantity::ActivePower))
    }
}

fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{v:.precision$}"),
        None => "n/a".to_string(),
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "U: {} V, I: {} A, P: {} W, S: {} VA, PF: {}, pulses: {}, E: {} kWh",
            fmt_opt(self.voltage_v, 2),
            fmt_opt(self.current_a, 3),
            fmt_opt(self.active_power_w, 2),
            fmt_opt(self.apparent_power_w, 2),
            fmt_opt(self.power_factor, 3),
            self.cumulative_pulses,
            fmt_opt(self.energy_kwh, 6),
        )
    }
}

/// Per-sensor metering state. One instance per physical sensor, owned by a
/// single pipeline; nothing here is shared across sensors.
///
/// Frames must be folded in strictly in arrival order. The wide pulse
/// counter is reconstructed from an edge-triggered carry bit, so a frame
/// lost below this layer whose overflow bit was set is indistinguishable
/// from "no overflow happened" and the cumulative count silently
/// undercounts by 65536. That drift is inherent to the transport and is
/// not detected or corrected here.
#[derive(Debug)]
pub struct Meter {
    calibration: CalibrationConstants,
    voltage_v: Option<f64>,
    current_a: Option<f64>,
    active_power_w: Option<f64>,
    power_parameter: Option<u32>,
    pulse_overflows: u32,
    pulse_count: u16,
    frames_accepted: u64,
}

impl Meter {
    pub fn new(calibration: CalibrationConstants) -> Self {
        Self {
            calibration,
            voltage_v: None,
            current_a: None,
            active_power_w: None,
            power_parameter: None,
            pulse_overflows: 0,
            pulse_count: 0,
            frames_accepted: 0,
        }
    }

    /// Fold one decoded frame into the meter state and return the current
    /// reading.
    ///
    /// A register that is not ready this frame (or whose parameter is
    /// zero) leaves the previously retained conversion in place rather
    /// than overwriting it.
    pub fn update(&mut self, frame: &DecodedFrame) -> Reading {
        if frame.status_word() == StatusWord::Unprogrammed {
            // Calibration storage check failed: every register in this
            // frame is unusable, including the pulse counter. Keep the
            // retained state.
            debug!("skipping frame with unprogrammed status register");
            self.frames_accepted += 1;
            return self.reading();
        }

        if let Some(reg) = frame.voltage_register {
            if frame.voltage_parameter != 0 {
                self.voltage_v =
                    Some(reg as f64 / frame.voltage_parameter as f64 * self.calibration.kv);
            }
        }

        if let Some(reg) = frame.current_register {
            if frame.current_parameter != 0 {
                self.current_a =
                    Some(reg as f64 / frame.current_parameter as f64 * self.calibration.ki);
            }
        }

        if frame.power_out_of_range() {
            // No-load condition signalled by the chip, not a fault. The
            // power register contents are meaningless in this state.
            self.active_power_w = Some(0.0);
        } else if let Some(reg) = frame.power_register {
            if frame.power_parameter != 0 {
                self.active_power_w = Some(
                    reg as f64 / frame.power_parameter as f64
                        * self.calibration.kv
                        * self.calibration.ki,
                );
            }
        }

        if frame.power_parameter != 0 {
            self.power_parameter = Some(frame.power_parameter);
        }

        if frame.flags.pulse_overflow() {
            self.pulse_overflows = self.pulse_overflows.saturating_add(1);
            debug!(
                pulse_overflows = self.pulse_overflows,
                "hardware pulse counter wrapped"
            );
        }
        self.pulse_count = frame.pulse_count;
        self.frames_accepted += 1;

        self.reading()
    }

    /// Wide monotonic pulse counter reconstructed from the 16-bit hardware
    /// register plus the software-tracked overflow count.
    pub fn cumulative_pulses(&self) -> u64 {
        self.pulse_overflows as u64 * PULSE_COUNTER_MODULUS + self.pulse_count as u64
    }

    /// Snapshot of the current state as a reading, without consuming a
    /// frame.
    pub fn reading(&self) -> Reading {
        let apparent_power_w = match (self.voltage_v, self.current_a) {
            (Some(v), Some(i)) => Some(v * i),
            _ => None,
        };
        let power_factor = match (self.active_power_w, apparent_power_w) {
            (Some(_), Some(s)) if s == 0.0 => Some(0.0),
            (Some(p), Some(s)) => Some(p / s),
            _ => None,
        };
        let energy_kwh = self.power_parameter.map(|parameter| {
            self.cumulative_pulses() as f64 / self.calibration.pulses_per_kwh(parameter)
        });

        Reading {
            voltage_v: self.voltage_v,
            current_a: self.current_a,
            active_power_w: self.active_power_w,
            apparent_power_w,
            power_factor,
            cumulative_pulses: self.cumulative_pulses(),
            energy_kwh,
        }
    }

    pub fn calibration(&self) -> CalibrationConstants {
        self.calibration
    }

    pub fn frames_accepted(&self) -> u64 {
        self.frames_accepted
    }

    pub fn pulse_overflows(&self) -> u32 {
        self.pulse_overflows
    }

    /// Explicit sensor re-initialization. This is the only operation that
    /// resets the overflow counter; frame content never does.
    pub fn reset(&mut self) {
        *self = Self::new(self.calibration);
    }
}
