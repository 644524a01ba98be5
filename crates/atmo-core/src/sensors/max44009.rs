//! MAX44009 ambient light sensor (I2C).
//!
//! The lux value is packed into two registers as a 4-bit exponent and
//! an 8-bit mantissa; one count is 0.045 lux at exponent zero and the
//! exponent doubles the step. Dynamic range runs from 0.045 to about
//! 188,000 lux, which comfortably covers a dark room through direct sun.

use embedded_hal_async::i2c::I2c;
use log::debug;

use super::{Sensor, SensorError};

/// Device address with A0 tied low.
pub const DEFAULT_ADDRESS: u8 = 0x4A;

const REG_CONFIGURATION: u8 = 0x02;
const REG_LUX_HIGH: u8 = 0x03;
const REG_LUX_LOW: u8 = 0x04;

/// Continuous-conversion bit in the configuration register.
const CONFIG_CONTINUOUS: u8 = 0x80;

/// Decode the lux register pair.
///
/// `lux = mantissa * 0.045 * 2^exponent`, where the mantissa's upper
/// nibble lives in the high register and its lower nibble in the low
/// register. Exponent 0xF marks overrange and saturates.
pub fn lux_from_registers(high: u8, low: u8) -> f32 {
    let exponent = high >> 4;
    let mantissa = ((high & 0x0F) << 4) | (low & 0x0F);
    f32::from(mantissa) * 0.045 * f32::from(1u16 << exponent.min(14))
}

/// MAX44009 driver over an async I2C bus.
pub struct Max44009<I> {
    i2c: I,
    address: u8,
}

impl<I: I2c> Max44009<I> {
    pub fn new(i2c: I) -> Self {
        Self {
            i2c,
            address: DEFAULT_ADDRESS,
        }
    }

    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    /// Put the sensor in continuous conversion so every read returns a
    /// fresh value. Also serves as the probe that the device is wired.
    pub async fn start(&mut self) -> Result<(), SensorError> {
        self.i2c
            .write(self.address, &[REG_CONFIGURATION, CONFIG_CONTINUOUS])
            .await
            .map_err(|_| SensorError::ReadFailed {
                sensor: "MAX44009",
                operation: "configure",
                details: "I2C write failed, sensor missing or miswired",
            })
    }

    async fn read_register(&mut self, register: u8) -> Result<u8, SensorError> {
        let mut value = [0u8];
        self.i2c
            .write_read(self.address, &[register], &mut value)
            .await
            .map_err(|_| SensorError::ReadFailed {
                sensor: "MAX44009",
                operation: "read lux register",
                details: "I2C transaction failed",
            })?;
        Ok(value[0])
    }
}

impl<I: I2c> Sensor for Max44009<I> {
    type Reading = f32;

    /// Current ambient brightness in lux.
    async fn read(&mut self) -> Result<f32, SensorError> {
        // Two single-register reads; the datasheet's combined read
        // requires a repeated-start per register anyway.
        let high = self.read_register(REG_LUX_HIGH).await?;
        let low = self.read_register(REG_LUX_LOW).await?;
        let lux = lux_from_registers(high, low);
        debug!("MAX44009: lux={}", lux);
        Ok(lux)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_registers_decode_to_darkness() {
        assert_eq!(lux_from_registers(0x00, 0x00), 0.0);
    }

    #[test]
    fn one_count_is_the_datasheet_step() {
        assert_eq!(lux_from_registers(0x00, 0x01), 0.045);
    }

    #[test]
    fn decodes_a_daylight_value() {
        // Exponent 8, mantissa 0x65 (101): 101 * 0.045 * 256 = 1163.52
        let lux = lux_from_registers(0x86, 0x05);
        assert!((lux - 1163.52).abs() < 0.01);
    }

    #[test]
    fn overrange_exponent_saturates_instead_of_overflowing() {
        let lux = lux_from_registers(0xFF, 0x0F);
        // Clamped to exponent 14: 255 mantissa * 0.045 * 16384
        assert!((lux - 255.0 * 0.045 * 16384.0).abs() < 1.0);
    }
}
