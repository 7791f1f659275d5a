pub mod constants;
pub mod decode;
pub mod error;
pub mod frame;
pub mod meter;
pub mod sync;

// Re-export the pipeline types for easy access
pub use decode::{DecodedFrame, Quantity};
pub use error::MeterError;
pub use frame::{RawFrame, StatusWord, UpdateFlags};
pub use meter::{CalibrationConstants, Meter, Reading};
pub use sync::{FrameReader, FrameSynchronizer, SyncStats};
