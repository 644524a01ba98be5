//! The sampling loop: the only writer of the history store.
//!
//! One cycle a minute: read the three sensors, record into the shared
//! histories, hand the reading to the telemetry task. A failed read
//! skips the cycle instead of writing a bogus sample; a sensor that
//! stays dead takes the whole node down for a restart.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Sender;
use embassy_time::{Duration, Instant, Timer};
use esp_hal::Async;
use esp_hal::i2c::master::I2c;
use esp_hal::uart::Uart;
use log::{error, info};

use atmo_core::sensors::{Max44009, Mhz19, Pms5003, Sensor, SensorError};
use atmo_core::station::AtmoReading;

use crate::app_state::{NodeRunState, SharedNodeState};
use crate::net::TELEMETRY_QUEUE_DEPTH;

/// One sample per minute, the cadence the history capacities assume.
pub const SAMPLE_PERIOD: Duration = Duration::from_secs(60);

/// Consecutive failed cycles before the node restarts.
const MAX_FAILED_CYCLES: u32 = 5;

pub type Particulate = Pms5003<Uart<'static, Async>>;
pub type CarbonDioxide = Mhz19<Uart<'static, Async>>;
pub type Brightness = Max44009<I2c<'static, Async>>;

pub type TelemetrySender =
    Sender<'static, CriticalSectionRawMutex, AtmoReading, TELEMETRY_QUEUE_DEPTH>;

async fn read_cycle(
    particulate: &mut Particulate,
    co2: &mut CarbonDioxide,
    brightness: &mut Brightness,
) -> Result<AtmoReading, SensorError> {
    let pms = particulate.read().await?;
    let gas = co2.read().await?;
    let lux = brightness.read().await?;
    Ok(AtmoReading {
        particulate: pms,
        co2_ppm: gas.co2_ppm,
        lux,
    })
}

#[embassy_executor::task]
pub async fn sample_task(
    state: &'static SharedNodeState,
    mut particulate: Particulate,
    mut co2: CarbonDioxide,
    mut brightness: Brightness,
    telemetry: TelemetrySender,
) {
    state.lock().await.run_state = NodeRunState::Sampling;

    let mut failed_cycles = 0u32;
    loop {
        let cycle_start = Instant::now();

        match read_cycle(&mut particulate, &mut co2, &mut brightness).await {
            Ok(reading) => {
                failed_cycles = 0;
                info!(
                    "sampled: pm1.0={} pm2.5={} pm10={} ug/m3, co2={} ppm, {} lux",
                    reading.particulate.pm10_standard,
                    reading.particulate.pm25_standard,
                    reading.particulate.pm100_standard,
                    reading.co2_ppm,
                    reading.lux
                );

                state.lock().await.histories.record(&reading);

                // Telemetry must never stall sampling; with the broker
                // gone the queue fills and the oldest cycles are lost.
                if telemetry.try_send(reading).is_err() {
                    error!("telemetry queue full, dropping this cycle's messages");
                }
            }
            Err(e) => {
                failed_cycles += 1;
                error!("sensor cycle failed ({failed_cycles}/{MAX_FAILED_CYCLES}): {e}");
                if failed_cycles >= MAX_FAILED_CYCLES {
                    esp_hal::system::software_reset();
                }
            }
        }

        // Pace the loop so one cycle lands every SAMPLE_PERIOD no
        // matter how long the reads took.
        let elapsed = cycle_start.elapsed();
        if elapsed < SAMPLE_PERIOD {
            Timer::after(SAMPLE_PERIOD - elapsed).await;
        }
    }
}
