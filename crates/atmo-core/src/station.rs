//! Per-node sensor state: one history per tracked quantity.
//!
//! Instead of five file-scope globals, a single owned struct is handed
//! to the sampling loop (writer) and the rendering/telemetry code
//! (readers), so lifetime and ownership stay explicit and the whole
//! thing is testable off-device.

use crate::history::ValueHistory;
use crate::sensors::PmsReading;

/// Fine-grained ring capacity: one sample a minute for an hour.
pub const MINUTE_SLOTS: usize = 60;

/// Aggregate ring capacity: one bucket an hour for a day.
pub const HOUR_SLOTS: usize = 24;

pub type ParticleHistory = ValueHistory<u16, MINUTE_SLOTS, HOUR_SLOTS>;
pub type GasHistory = ValueHistory<u16, MINUTE_SLOTS, HOUR_SLOTS>;
pub type BrightnessHistory = ValueHistory<f32, MINUTE_SLOTS, HOUR_SLOTS>;

/// One complete sampling cycle's worth of sensor values.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AtmoReading {
    pub particulate: PmsReading,
    pub co2_ppm: u16,
    pub lux: f32,
}

/// Histories for every quantity the node tracks: the three standard
/// particulate channels, CO2, and ambient brightness.
pub struct SensorHistories {
    pm010: ParticleHistory,
    pm025: ParticleHistory,
    pm100: ParticleHistory,
    co2: GasHistory,
    brightness: BrightnessHistory,
}

impl Default for SensorHistories {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorHistories {
    pub const fn new() -> Self {
        Self {
            pm010: ParticleHistory::new(),
            pm025: ParticleHistory::new(),
            pm100: ParticleHistory::new(),
            co2: GasHistory::new(),
            brightness: BrightnessHistory::new(),
        }
    }

    /// Record one sampling cycle into all histories. Rollovers stay in
    /// lock-step across quantities because every history sees exactly
    /// one measurement per cycle.
    pub fn record(&mut self, reading: &AtmoReading) {
        self.co2.add_measurement(reading.co2_ppm);
        self.pm010.add_measurement(reading.particulate.pm10_standard);
        self.pm025.add_measurement(reading.particulate.pm25_standard);
        self.pm100.add_measurement(reading.particulate.pm100_standard);
        self.brightness.add_measurement(reading.lux);
    }

    pub fn pm010(&self) -> &ParticleHistory {
        &self.pm010
    }

    pub fn pm025(&self) -> &ParticleHistory {
        &self.pm025
    }

    pub fn pm100(&self) -> &ParticleHistory {
        &self.pm100
    }

    pub fn co2(&self) -> &GasHistory {
        &self.co2
    }

    pub fn brightness(&self) -> &BrightnessHistory {
        &self.brightness
    }

    /// Lower bound for the stacked particle chart: the channel minima
    /// summed, as if the three channels hit their minima together.
    pub fn particle_floor(&self) -> u32 {
        u32::from(self.pm010.min_value())
            + u32::from(self.pm025.min_value())
            + u32::from(self.pm100.min_value())
    }

    /// Upper bound for the stacked particle chart, channel maxima summed.
    pub fn particle_ceiling(&self) -> u32 {
        u32::from(self.pm010.max_value())
            + u32::from(self.pm025.max_value())
            + u32::from(self.pm100.max_value())
    }
}
