// Protocol constants for the HLW8032 UART telemetry frame

/// Total size of one telemetry frame (24 bytes)
pub const FRAME_SIZE: usize = 24;

/// Fixed marker at frame offset 1, anchors frame boundaries
pub const SYNC_MARKER: u8 = 0x5A;

/// Offset of the sync marker inside a frame
pub const SYNC_OFFSET: usize = 1;

/// First byte covered by the checksum (inclusive)
pub const CHECKSUM_START: usize = 2;

/// Last byte covered by the checksum (exclusive); byte 23 is the checksum itself
pub const CHECKSUM_END: usize = 23;

/// Status register value when the chip is operating normally
pub const STATUS_NORMAL: u8 = 0x55;

/// Status register value when the chip's calibration storage failed
pub const STATUS_UNPROGRAMMED: u8 = 0xAA;

/// Status pattern signalling the power register cycle exceeded its range.
/// The chip emits this under no-load; active power must be read as 0.
pub const STATUS_POWER_OUT_OF_RANGE: u8 = 0xF2;

/// The hardware pulse counter is 16 bits wide and wraps here
pub const PULSE_COUNTER_MODULUS: u64 = 65536;

/// Fixed UART rate of the chip's TX line
pub const UART_BAUD: u32 = 4800;
