//! MH-Z19 NDIR CO2 sensor (Winsen 9-byte serial protocol).
//!
//! Requests and responses are both nine bytes: a `0xFF` start byte, a
//! command (or `0x01` sensor number on requests), six data bytes, and a
//! one-byte checksum of everything between. Automatic baseline
//! calibration gets switched off at startup: the node often lives in
//! rooms that never see fresh-air CO2 levels, which is exactly the case
//! ABC miscalibrates on.

use embedded_io_async::{Read, Write};
use log::debug;

use super::{Sensor, SensorError};

const PACKET_LEN: usize = 9;
const START_BYTE: u8 = 0xFF;
const SENSOR_NUMBER: u8 = 0x01;

const CMD_READ_CO2: u8 = 0x86;
const CMD_ABC_TOGGLE: u8 = 0x79;
const CMD_ABC_STATUS: u8 = 0x7D;

const ABC_ON: u8 = 0xA0;
const ABC_OFF: u8 = 0x00;

/// CO2 concentration plus the sensor's internal temperature, which the
/// response carries for free.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mhz19Reading {
    pub co2_ppm: u16,
    pub temperature_celsius: i16,
}

/// Winsen checksum: over bytes 1..=7, negated plus one.
pub fn checksum(packet: &[u8; PACKET_LEN]) -> u8 {
    let sum = packet[1..PACKET_LEN - 1]
        .iter()
        .fold(0u8, |acc, &b| acc.wrapping_add(b));
    (!sum).wrapping_add(1)
}

fn build_request(command: u8, argument: u8) -> [u8; PACKET_LEN] {
    let mut packet = [0u8; PACKET_LEN];
    packet[0] = START_BYTE;
    packet[1] = SENSOR_NUMBER;
    packet[2] = command;
    packet[3] = argument;
    packet[8] = checksum(&packet);
    packet
}

/// Verify and decode a gas-concentration response.
pub fn parse_gas_response(packet: &[u8; PACKET_LEN]) -> Result<Mhz19Reading, SensorError> {
    if packet[0] != START_BYTE || packet[1] != CMD_READ_CO2 {
        return Err(SensorError::BadHeader);
    }
    let expected = checksum(packet);
    if expected != packet[8] {
        return Err(SensorError::Checksum {
            expected: u16::from(expected),
            actual: u16::from(packet[8]),
        });
    }
    Ok(Mhz19Reading {
        co2_ppm: u16::from_be_bytes([packet[2], packet[3]]),
        // Offset-40 raw byte, same trick the datasheet uses.
        temperature_celsius: i16::from(packet[4]) - 40,
    })
}

/// MH-Z19 driver over an async serial port (9600 8N1).
pub struct Mhz19<U> {
    serial: U,
}

impl<U: Read + Write> Mhz19<U> {
    pub fn new(serial: U) -> Self {
        Self { serial }
    }

    /// Enable or disable automatic baseline calibration.
    pub async fn set_auto_calibration(&mut self, enabled: bool) -> Result<(), SensorError> {
        let argument = if enabled { ABC_ON } else { ABC_OFF };
        self.transmit(build_request(CMD_ABC_TOGGLE, argument), "set ABC")
            .await
    }

    /// Query whether automatic baseline calibration is active.
    pub async fn auto_calibration(&mut self) -> Result<bool, SensorError> {
        self.transmit(build_request(CMD_ABC_STATUS, 0), "query ABC")
            .await?;
        let packet = self.receive("query ABC").await?;
        Ok(packet[7] == 1)
    }

    async fn transmit(
        &mut self,
        packet: [u8; PACKET_LEN],
        operation: &'static str,
    ) -> Result<(), SensorError> {
        self.serial
            .write_all(&packet)
            .await
            .map_err(|_| SensorError::ReadFailed {
                sensor: "MH-Z19",
                operation,
                details: "serial write failed",
            })
    }

    async fn receive(&mut self, operation: &'static str) -> Result<[u8; PACKET_LEN], SensorError> {
        let mut packet = [0u8; PACKET_LEN];
        self.serial
            .read_exact(&mut packet)
            .await
            .map_err(|_| SensorError::ReadFailed {
                sensor: "MH-Z19",
                operation,
                details: "serial read failed or closed",
            })?;
        Ok(packet)
    }
}

impl<U: Read + Write> Sensor for Mhz19<U> {
    type Reading = Mhz19Reading;

    async fn read(&mut self) -> Result<Mhz19Reading, SensorError> {
        self.transmit(build_request(CMD_READ_CO2, 0), "read CO2")
            .await?;
        let packet = self.receive("read CO2").await?;
        let reading = parse_gas_response(&packet)?;
        debug!(
            "MH-Z19: co2={} ppm, sensor temperature={} C",
            reading.co2_ppm, reading.temperature_celsius
        );
        Ok(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_request_has_documented_checksum() {
        // The canonical read command from the datasheet.
        let packet = build_request(CMD_READ_CO2, 0);
        assert_eq!(
            packet,
            [0xFF, 0x01, 0x86, 0x00, 0x00, 0x00, 0x00, 0x00, 0x79]
        );
    }

    #[test]
    fn decodes_a_gas_response() {
        let mut packet = [0xFF, 0x86, 0x02, 0x64, 0x45, 0x00, 0x00, 0x00, 0x00];
        packet[8] = checksum(&packet);
        let reading = parse_gas_response(&packet).unwrap();
        assert_eq!(reading.co2_ppm, 612);
        assert_eq!(reading.temperature_celsius, 29);
    }

    #[test]
    fn rejects_wrong_start_or_echo() {
        let mut packet = [0xFE, 0x86, 0x02, 0x64, 0x45, 0x00, 0x00, 0x00, 0x00];
        packet[8] = checksum(&packet);
        assert_eq!(parse_gas_response(&packet), Err(SensorError::BadHeader));
    }

    #[test]
    fn rejects_corrupted_response() {
        let mut packet = [0xFF, 0x86, 0x02, 0x64, 0x45, 0x00, 0x00, 0x00, 0x00];
        packet[8] = checksum(&packet) ^ 0x55;
        assert!(matches!(
            parse_gas_response(&packet),
            Err(SensorError::Checksum { .. })
        ));
    }
}
