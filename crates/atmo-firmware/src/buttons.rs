//! Front-panel buttons.
//!
//! Two active-low buttons, polled every few milliseconds: GPIO0
//! restarts the node, GPIO35 drops the stored provisioning so the next
//! boot starts clean.

use embassy_time::{Duration, Timer};
use esp_hal::gpio::Input;
use log::warn;

const POLL_INTERVAL: Duration = Duration::from_millis(5);

#[embassy_executor::task]
pub async fn button_task(restart: Input<'static>, reset_config: Input<'static>) {
    loop {
        if restart.is_low() {
            warn!("restart button pressed, resetting");
            esp_hal::system::software_reset();
        }

        if reset_config.is_low() {
            // Provisioning comes from the build environment on this
            // hardware revision, so a reset back to defaults is just a
            // restart; keep the button's meaning anyway.
            warn!("config-reset button pressed, resetting");
            esp_hal::system::software_reset();
        }

        Timer::after(POLL_INTERVAL).await;
    }
}
