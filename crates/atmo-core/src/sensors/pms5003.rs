//! PMS5003 particulate matter sensor (Plantower serial protocol).
//!
//! The sensor streams 32-byte data frames: a `0x42 0x4D` magic, a
//! big-endian length word (always 28), thirteen big-endian data words,
//! and a 16-bit checksum over everything before it. In passive mode it
//! only answers when asked, which is what the one-reading-a-minute
//! sampling loop wants. The codec lives here; the cadence does not.

use embedded_io_async::{Read, Write};
use log::debug;

use super::{Sensor, SensorError};

/// Full data frame length on the wire.
pub const PMS_FRAME_LEN: usize = 32;

const MAGIC_HIGH: u8 = 0x42;
const MAGIC_LOW: u8 = 0x4D;
/// Value of the frame's own length field: 13 data words + checksum.
const PAYLOAD_LEN: u16 = 28;

const CMD_CHANGE_MODE: u8 = 0xE1;
const CMD_PASSIVE_READ: u8 = 0xE2;
const CMD_SLEEP_WAKE: u8 = 0xE4;

/// One structured particulate reading.
///
/// Mass concentrations are µg/m³; particle counts are per 0.1 L of air.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PmsReading {
    pub pm10_standard: u16,
    pub pm25_standard: u16,
    pub pm100_standard: u16,
    pub pm10_env: u16,
    pub pm25_env: u16,
    pub pm100_env: u16,
    pub particles_03um: u16,
    pub particles_05um: u16,
    pub particles_10um: u16,
    pub particles_25um: u16,
    pub particles_50um: u16,
    pub particles_100um: u16,
}

/// Reporting mode of the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PmsMode {
    /// Sensor pushes a frame roughly every second.
    Active,
    /// Sensor answers only to a passive-read command.
    Passive,
}

/// Parse and verify one 32-byte data frame.
pub fn parse_frame(frame: &[u8; PMS_FRAME_LEN]) -> Result<PmsReading, SensorError> {
    if frame[0] != MAGIC_HIGH || frame[1] != MAGIC_LOW {
        return Err(SensorError::BadHeader);
    }

    let word = |i: usize| u16::from_be_bytes([frame[2 + 2 * i], frame[3 + 2 * i]]);

    if word(0) != PAYLOAD_LEN {
        return Err(SensorError::BadLength);
    }

    let expected: u16 = frame[..PMS_FRAME_LEN - 2]
        .iter()
        .fold(0u16, |sum, &b| sum.wrapping_add(u16::from(b)));
    let actual = u16::from_be_bytes([frame[30], frame[31]]);
    if expected != actual {
        return Err(SensorError::Checksum { expected, actual });
    }

    Ok(PmsReading {
        pm10_standard: word(1),
        pm25_standard: word(2),
        pm100_standard: word(3),
        pm10_env: word(4),
        pm25_env: word(5),
        pm100_env: word(6),
        particles_03um: word(7),
        particles_05um: word(8),
        particles_10um: word(9),
        particles_25um: word(10),
        particles_50um: word(11),
        particles_100um: word(12),
        // word(13) is reserved
    })
}

/// Build one 7-byte host-to-sensor command frame.
pub fn build_command(command: u8, data: u16) -> [u8; 7] {
    let [data_high, data_low] = data.to_be_bytes();
    let mut frame = [MAGIC_HIGH, MAGIC_LOW, command, data_high, data_low, 0, 0];
    let checksum: u16 = frame[..5]
        .iter()
        .fold(0u16, |sum, &b| sum.wrapping_add(u16::from(b)));
    frame[5..].copy_from_slice(&checksum.to_be_bytes());
    frame
}

/// PMS5003 driver over an async serial port (9600 8N1).
pub struct Pms5003<U> {
    serial: U,
}

impl<U: Read + Write> Pms5003<U> {
    pub fn new(serial: U) -> Self {
        Self { serial }
    }

    /// Switch between active streaming and on-demand passive reads.
    pub async fn set_mode(&mut self, mode: PmsMode) -> Result<(), SensorError> {
        let data = match mode {
            PmsMode::Active => 1,
            PmsMode::Passive => 0,
        };
        self.send(build_command(CMD_CHANGE_MODE, data), "set mode")
            .await
    }

    /// Wake the sensor from sleep. The fan needs ~30 s before readings
    /// stabilize; the caller owns that wait.
    pub async fn wake(&mut self) -> Result<(), SensorError> {
        self.send(build_command(CMD_SLEEP_WAKE, 1), "wake").await
    }

    pub async fn sleep(&mut self) -> Result<(), SensorError> {
        self.send(build_command(CMD_SLEEP_WAKE, 0), "sleep").await
    }

    async fn send(&mut self, frame: [u8; 7], operation: &'static str) -> Result<(), SensorError> {
        self.serial
            .write_all(&frame)
            .await
            .map_err(|_| SensorError::ReadFailed {
                sensor: "PMS5003",
                operation,
                details: "serial write failed",
            })
    }

    /// Resynchronize on the frame magic, then pull in the rest of the
    /// frame. Tolerates a partial frame left in the UART FIFO.
    async fn read_frame(&mut self) -> Result<PmsReading, SensorError> {
        let read_error = |operation| SensorError::ReadFailed {
            sensor: "PMS5003",
            operation,
            details: "serial read failed or closed",
        };

        let mut frame = [0u8; PMS_FRAME_LEN];
        // Scan past garbage until the two magic bytes line up. Bounded
        // so a dead or desynced line cannot spin forever.
        let mut skipped = 0usize;
        loop {
            let mut byte = [0u8; 1];
            self.serial
                .read_exact(&mut byte)
                .await
                .map_err(|_| read_error("sync"))?;
            if byte[0] == MAGIC_HIGH {
                self.serial
                    .read_exact(&mut byte)
                    .await
                    .map_err(|_| read_error("sync"))?;
                if byte[0] == MAGIC_LOW {
                    break;
                }
            }
            skipped += 1;
            if skipped > 2 * PMS_FRAME_LEN {
                return Err(SensorError::BadHeader);
            }
        }
        frame[0] = MAGIC_HIGH;
        frame[1] = MAGIC_LOW;
        self.serial
            .read_exact(&mut frame[2..])
            .await
            .map_err(|_| read_error("read frame"))?;

        let reading = parse_frame(&frame)?;
        debug!(
            "PMS5003: pm1.0={} pm2.5={} pm10={} (standard, ug/m3)",
            reading.pm10_standard, reading.pm25_standard, reading.pm100_standard
        );
        Ok(reading)
    }
}

impl<U: Read + Write> Sensor for Pms5003<U> {
    type Reading = PmsReading;

    /// Request one reading in passive mode and wait for the frame.
    async fn read(&mut self) -> Result<PmsReading, SensorError> {
        self.send(build_command(CMD_PASSIVE_READ, 0), "passive read")
            .await?;
        self.read_frame().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> [u8; PMS_FRAME_LEN] {
        let words: [u16; 13] = [
            PAYLOAD_LEN,
            3,    // pm1.0 standard
            5,    // pm2.5 standard
            8,    // pm10 standard
            3,    // pm1.0 env
            5,    // pm2.5 env
            8,    // pm10 env
            1500, // >0.3um
            400,  // >0.5um
            120,  // >1.0um
            20,   // >2.5um
            4,    // >5.0um
            2,    // >10um
        ];
        let mut frame = [0u8; PMS_FRAME_LEN];
        frame[0] = MAGIC_HIGH;
        frame[1] = MAGIC_LOW;
        for (i, w) in words.iter().enumerate() {
            frame[2 + 2 * i..4 + 2 * i].copy_from_slice(&w.to_be_bytes());
        }
        // word 13 (reserved) stays zero
        let checksum: u16 = frame[..30]
            .iter()
            .fold(0u16, |sum, &b| sum.wrapping_add(u16::from(b)));
        frame[30..].copy_from_slice(&checksum.to_be_bytes());
        frame
    }

    #[test]
    fn parses_a_valid_frame() {
        let reading = parse_frame(&sample_frame()).unwrap();
        assert_eq!(reading.pm10_standard, 3);
        assert_eq!(reading.pm25_standard, 5);
        assert_eq!(reading.pm100_standard, 8);
        assert_eq!(reading.particles_03um, 1500);
        assert_eq!(reading.particles_100um, 2);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut frame = sample_frame();
        frame[0] = 0x41;
        assert_eq!(parse_frame(&frame), Err(SensorError::BadHeader));
    }

    #[test]
    fn rejects_bad_length_field() {
        let mut frame = sample_frame();
        frame[2..4].copy_from_slice(&20u16.to_be_bytes());
        assert_eq!(parse_frame(&frame), Err(SensorError::BadLength));
    }

    #[test]
    fn rejects_corrupted_payload() {
        let mut frame = sample_frame();
        frame[10] ^= 0xFF;
        assert!(matches!(
            parse_frame(&frame),
            Err(SensorError::Checksum { .. })
        ));
    }

    #[test]
    fn command_frames_carry_their_checksum() {
        let frame = build_command(CMD_PASSIVE_READ, 0);
        assert_eq!(frame[..5], [0x42, 0x4D, 0xE2, 0x00, 0x00]);
        let sum = 0x42u16 + 0x4D + 0xE2;
        assert_eq!(frame[5..], sum.to_be_bytes());
    }
}
