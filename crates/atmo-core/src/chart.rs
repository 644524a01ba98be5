//! Particle trend chart.
//!
//! Renders the hourly history followed by the minute history of the
//! three particulate channels into one auto-scaled plot: hour buckets
//! get a wide column each on the left, the last hour of raw samples
//! runs at one pixel per sample on the right. The two sections are
//! strictly concatenated: the minute window is the newest data, the
//! hour buckets the strictly older history, and no sample is ever drawn
//! twice.
//!
//! Time labels are derived from a slot's distance to the write cursor
//! ("-6h", "-12h", …); there is no clock on the device.

use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::mono_font::ascii::{FONT_6X10, FONT_9X15_BOLD};
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Circle, Line, PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Alignment, Text};

use heapless::String;
use core::fmt::Write as _;

use crate::quality::{QualityKind, QualityLevel};
use crate::station::SensorHistories;

const PADDING_LEFT: u32 = 25;
const PADDING_RIGHT: u32 = 10;
const PADDING_TOP: u32 = 35;
const PADDING_BOTTOM: u32 = 20;

/// Horizontal pixels reserved for the minute section (1 px a sample).
const MINUTE_SECTION_WIDTH: u32 = 60;

/// Hour gridlines every this many buckets.
const HOUR_GRID_STEP: usize = 6;

/// Horizontal divisions of the value axis.
const VALUE_GRID_LINES: u32 = 5;

const BACKGROUND: Rgb565 = rgb565(0x10A3);
const GRID: Rgb565 = rgb565(0x8410); // dark grey
const PM010_COLOR: Rgb565 = rgb565(0x854E);
const PM025_COLOR: Rgb565 = rgb565(0xDDAA);
const PM100_COLOR: Rgb565 = rgb565(0x865A);

const fn rgb565(raw: u16) -> Rgb565 {
    Rgb565::new(
        ((raw >> 11) & 0x1F) as u8,
        ((raw >> 5) & 0x3F) as u8,
        (raw & 0x1F) as u8,
    )
}

/// Snap the retained extremes to the surrounding multiples of ten, so
/// the axis labels stay round and the trace never touches the frame.
pub fn axis_bounds(min: u32, max: u32) -> (u32, u32) {
    ((min / 10) * 10, (max / 10 + 1) * 10)
}

/// Height of a value above the plot floor, in pixels.
pub fn bar_height(value: u32, lower: u32, upper: u32, plot_height: u32) -> u32 {
    debug_assert!(lower < upper);
    let clamped = value.clamp(lower, upper);
    let unit = plot_height as f32 / (upper - lower) as f32;
    ((clamped - lower) as f32 * unit) as u32
}

/// The trend chart, drawable onto any RGB565 target.
pub struct ParticleTrend<'a> {
    histories: &'a SensorHistories,
    bounds: Rectangle,
}

impl<'a> ParticleTrend<'a> {
    pub fn new(histories: &'a SensorHistories, bounds: Rectangle) -> Self {
        Self { histories, bounds }
    }

    fn plot_height(&self) -> u32 {
        self.bounds
            .size
            .height
            .saturating_sub(PADDING_TOP + PADDING_BOTTOM)
    }

    /// Bottom-left origin of the plot area in target coordinates.
    fn plot_baseline(&self) -> i32 {
        self.bounds.top_left.y + self.bounds.size.height as i32 - PADDING_BOTTOM as i32
    }

    fn hour_column_width(&self) -> u32 {
        let usable = self
            .bounds
            .size
            .width
            .saturating_sub(MINUTE_SECTION_WIDTH + PADDING_LEFT + PADDING_RIGHT);
        let capacity = crate::station::HOUR_SLOTS as u32;
        (usable / capacity).max(1)
    }

    fn draw_grid<D>(&self, target: &mut D, lower: u32, upper: u32) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        let grid_style = PrimitiveStyle::with_stroke(GRID, 1);
        let label_style = MonoTextStyle::new(&FONT_6X10, GRID);
        let left = self.bounds.top_left.x + PADDING_LEFT as i32;
        let top = self.bounds.top_left.y + PADDING_TOP as i32;
        let baseline = self.plot_baseline();
        let column = self.hour_column_width() as i32;
        let hour_capacity = crate::station::HOUR_SLOTS;

        // Vertical lines every six hour-columns, labeled with how far
        // back that column reaches.
        for step in 0..=(hour_capacity / HOUR_GRID_STEP) {
            let x = left + (step * HOUR_GRID_STEP) as i32 * column;
            Line::new(Point::new(x, top), Point::new(x, baseline))
                .into_styled(grid_style)
                .draw(target)?;

            let hours_back = hour_capacity - HOUR_GRID_STEP * step + 1;
            let mut label: String<8> = String::new();
            let _ = write!(label, "-{hours_back}h");
            Text::with_alignment(
                &label,
                Point::new(x, baseline + 10),
                label_style,
                Alignment::Center,
            )
            .draw(target)?;
        }

        // Horizontal lines dividing the value axis, labeled at the left.
        let right = self.bounds.top_left.x
            + (self.bounds.size.width - PADDING_RIGHT) as i32;
        let chart_height = self.plot_height() as i32;
        for step in 0..VALUE_GRID_LINES {
            let y = top + (chart_height / VALUE_GRID_LINES as i32) * step as i32;
            Line::new(Point::new(left, y), Point::new(right, y))
                .into_styled(grid_style)
                .draw(target)?;

            let value = ((upper - lower) / VALUE_GRID_LINES) * (VALUE_GRID_LINES - step) + lower;
            let mut label: String<8> = String::new();
            let _ = write!(label, "{value}");
            Text::with_alignment(
                &label,
                Point::new(left - 2, y + 4),
                label_style,
                Alignment::Right,
            )
            .draw(target)?;
        }

        Ok(())
    }

    fn draw_series<D>(&self, target: &mut D, lower: u32, upper: u32) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        let plot_height = self.plot_height();
        let baseline = self.plot_baseline();
        let column = self.hour_column_width() as i32;
        let mut x = self.bounds.top_left.x + PADDING_LEFT as i32;

        let dot = |target: &mut D, x: i32, value: u16, color: Rgb565| {
            let height = bar_height(u32::from(value), lower, upper, plot_height) as i32;
            Circle::with_center(Point::new(x, baseline - height), 3)
                .into_styled(PrimitiveStyle::with_fill(color))
                .draw(target)
        };

        // Hour buckets first (oldest history), one column each. All
        // three channels share rollover cadence, so the three iterators
        // stay aligned.
        let hour_buckets = self
            .histories
            .pm010()
            .hours()
            .zip(self.histories.pm025().hours())
            .zip(self.histories.pm100().hours());
        for ((pm10, pm25), pm100) in hour_buckets {
            dot(target, x, pm10, PM010_COLOR)?;
            dot(target, x, pm25, PM025_COLOR)?;
            dot(target, x, pm100, PM100_COLOR)?;
            x += column;
        }

        // Then the minute window (newest data), one pixel per sample.
        let minute_samples = self
            .histories
            .pm010()
            .minutes()
            .zip(self.histories.pm025().minutes())
            .zip(self.histories.pm100().minutes());
        for ((pm10, pm25), pm100) in minute_samples {
            dot(target, x, pm10, PM010_COLOR)?;
            dot(target, x, pm25, PM025_COLOR)?;
            dot(target, x, pm100, PM100_COLOR)?;
            x += 1;
        }

        Ok(())
    }

    fn draw_headline<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        let label_style = |color| MonoTextStyle::new(&FONT_6X10, color);

        let width = self.bounds.size.width as i32;
        let headline = [
            ("PM", "1.0", self.histories.pm010(), PM010_COLOR, 0),
            ("PM", "2.5", self.histories.pm025(), PM025_COLOR, width / 3),
            ("PM", "10", self.histories.pm100(), PM100_COLOR, 2 * width / 3),
        ];

        for (line1, line2, history, color, offset) in headline {
            let x = self.bounds.top_left.x + offset + 13;
            let y = self.bounds.top_left.y;
            Text::with_alignment(
                line1,
                Point::new(x, y + 8),
                label_style(color),
                Alignment::Center,
            )
            .draw(target)?;
            Text::with_alignment(
                line2,
                Point::new(x, y + 18),
                label_style(color),
                Alignment::Center,
            )
            .draw(target)?;

            let value = history.last_data();
            let level = QualityLevel::assess(QualityKind::Particulate, value);
            let mut text: String<8> = String::new();
            let _ = write!(text, "{value}");
            Text::new(
                &text,
                Point::new(x + 17, y + 16),
                MonoTextStyle::new(&FONT_9X15_BOLD, level.color()),
            )
            .draw(target)?;
        }

        Ok(())
    }
}

impl Drawable for ParticleTrend<'_> {
    type Color = Rgb565;
    type Output = ();

    fn draw<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb565>,
    {
        self.bounds
            .into_styled(PrimitiveStyle::with_fill(BACKGROUND))
            .draw(target)?;

        // Before the first sample there is nothing meaningful to scale
        // by; fall back to a fixed band instead of reading undefined
        // extremes.
        let (lower, upper) = if self.histories.pm010().is_empty() {
            (0, 10)
        } else {
            axis_bounds(
                self.histories.particle_floor(),
                self.histories.particle_ceiling(),
            )
        };

        self.draw_grid(target, lower, upper)?;
        self.draw_series(target, lower, upper)?;
        self.draw_headline(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_snap_to_tens() {
        assert_eq!(axis_bounds(13, 47), (10, 50));
        assert_eq!(axis_bounds(0, 0), (0, 10));
        assert_eq!(axis_bounds(10, 20), (10, 30));
    }

    #[test]
    fn bar_height_is_linear_within_bounds() {
        assert_eq!(bar_height(10, 10, 50, 100), 0);
        assert_eq!(bar_height(30, 10, 50, 100), 50);
        assert_eq!(bar_height(50, 10, 50, 100), 100);
    }

    #[test]
    fn bar_height_clamps_out_of_range_values() {
        assert_eq!(bar_height(5, 10, 50, 100), 0);
        assert_eq!(bar_height(80, 10, 50, 100), 100);
    }
}
