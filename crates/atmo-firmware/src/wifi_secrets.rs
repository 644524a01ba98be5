//! Build-time provisioning values.
//!
//! Captive-portal provisioning is out of scope on this hardware
//! revision; a `.env` file read at build time (see build.rs) supplies
//! the same four values a portal would collect. Missing entries fall
//! back to the defaults the node ships with.

pub const WIFI_SSID: &str = match option_env!("WIFI_SSID") {
    Some(ssid) => ssid,
    None => "",
};

pub const WIFI_PASSWORD: &str = match option_env!("WIFI_PASSWORD") {
    Some(password) => password,
    None => "",
};

pub const MQTT_SERVER: &str = match option_env!("MQTT_SERVER") {
    Some(server) => server,
    None => atmo_core::config::DEFAULT_MQTT_SERVER,
};

/// Room tag attached to every published message and the MQTT client id.
pub const ROOM: &str = match option_env!("ROOM") {
    Some(room) => room,
    None => "",
};
