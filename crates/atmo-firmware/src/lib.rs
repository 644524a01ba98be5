//! ESP32-specific modules for the AtmoNode firmware.
//!
//! This crate contains everything that cannot compile on desktop
//! targets: peripheral bring-up, WiFi and MQTT connection management,
//! and the embassy tasks that drive sampling, telemetry, and the
//! buttons. All sensor protocol handling and the history/trend logic
//! live in `atmo-core`.

#![no_std]

extern crate alloc;

pub mod app_state;
pub mod buttons;
pub mod net;
pub mod tasks;
pub mod wifi_secrets;
