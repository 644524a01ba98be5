//! Sensor drivers and wire-protocol codecs.
//!
//! Each driver speaks its transport through the async HAL traits
//! (`embedded-io-async` for the serial sensors, `embedded-hal-async`
//! for I2C), so the firmware decides which peripheral backs it and the
//! frame/packet handling stays host-testable.

mod max44009;
mod mhz19;
mod pms5003;

pub use max44009::{Max44009, lux_from_registers};
pub use mhz19::{Mhz19, Mhz19Reading};
pub use pms5003::{PMS_FRAME_LEN, PmsMode, PmsReading, Pms5003};

use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor}: {operation} failed: {details}")]
    ReadFailed {
        sensor: &'static str,
        operation: &'static str,
        details: &'static str,
    },
    #[error("frame header mismatch")]
    BadHeader,
    #[error("frame length field mismatch")]
    BadLength,
    #[error("checksum mismatch (expected {expected:#06x}, got {actual:#06x})")]
    Checksum { expected: u16, actual: u16 },
}

/// A sensor that yields one typed, structured reading per call.
///
/// Read failures come back as [`SensorError`]; retry and restart policy
/// belongs to the sampling loop, never to the driver.
pub trait Sensor {
    type Reading;

    fn read(&mut self) -> impl Future<Output = Result<Self::Reading, SensorError>>;
}
