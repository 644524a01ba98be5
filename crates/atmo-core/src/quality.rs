//! Quality assessment for sensor readings.
//!
//! Thresholds drive the headline value colors on the trend display.

use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::RgbColor;

/// Fine particulate concentration considered elevated (µg/m³).
pub const PM_WARN_THRESHOLD: u16 = 10;

/// Fine particulate concentration considered unhealthy (µg/m³).
pub const PM_DANGER_THRESHOLD: u16 = 25;

/// CO2 concentration above which a room wants ventilation (ppm).
pub const CO2_WARN_THRESHOLD: u16 = 1000;

/// CO2 concentration at which concentration measurably suffers (ppm).
pub const CO2_DANGER_THRESHOLD: u16 = 2000;

/// Quantities that have meaningful quality bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityKind {
    /// Any of the particulate mass channels, µg/m³.
    Particulate,
    /// CO2 concentration, ppm.
    Co2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityLevel {
    Good,
    Warn,
    Danger,
}

impl QualityLevel {
    pub fn assess(kind: QualityKind, value: u16) -> Self {
        let (warn, danger) = match kind {
            QualityKind::Particulate => (PM_WARN_THRESHOLD, PM_DANGER_THRESHOLD),
            QualityKind::Co2 => (CO2_WARN_THRESHOLD, CO2_DANGER_THRESHOLD),
        };
        if value >= danger {
            Self::Danger
        } else if value >= warn {
            Self::Warn
        } else {
            Self::Good
        }
    }

    /// Display color for a headline value at this level.
    pub const fn color(self) -> Rgb565 {
        match self {
            Self::Good => Rgb565::GREEN,
            Self::Warn => Rgb565::YELLOW,
            Self::Danger => Rgb565::RED,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Warn => "elevated",
            Self::Danger => "unhealthy",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn particulate_bands_match_display_thresholds() {
        assert_eq!(
            QualityLevel::assess(QualityKind::Particulate, 9),
            QualityLevel::Good
        );
        assert_eq!(
            QualityLevel::assess(QualityKind::Particulate, 10),
            QualityLevel::Warn
        );
        assert_eq!(
            QualityLevel::assess(QualityKind::Particulate, 25),
            QualityLevel::Danger
        );
    }

    #[test]
    fn co2_bands() {
        assert_eq!(QualityLevel::assess(QualityKind::Co2, 450), QualityLevel::Good);
        assert_eq!(QualityLevel::assess(QualityKind::Co2, 1200), QualityLevel::Warn);
        assert_eq!(
            QualityLevel::assess(QualityKind::Co2, 2400),
            QualityLevel::Danger
        );
    }
}
