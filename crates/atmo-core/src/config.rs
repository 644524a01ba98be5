//! Node configuration: where to publish and which room this is.
//!
//! The struct borrows its strings so a config blob can be decoded in
//! place from whatever storage the firmware gives it. Encoding goes
//! through postcard into a caller-provided buffer; the history state
//! itself is deliberately never persisted.

use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

/// Broker the node publishes to when no configuration exists yet.
pub const DEFAULT_MQTT_SERVER: &str = "192.168.178.150";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("config does not fit the provided buffer")]
    Encode,
    #[error("stored config is corrupt or from an incompatible version")]
    Decode,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct NodeConfig<'a> {
    /// MQTT broker, IP or hostname.
    pub mqtt_server: &'a str,
    /// Room tag attached to every published message.
    pub room: &'a str,
}

impl Default for NodeConfig<'_> {
    fn default() -> Self {
        Self {
            mqtt_server: DEFAULT_MQTT_SERVER,
            room: "",
        }
    }
}

impl<'a> NodeConfig<'a> {
    /// Serialize into `buffer`, returning the written prefix.
    pub fn encode<'b>(&self, buffer: &'b mut [u8]) -> Result<&'b [u8], ConfigError> {
        postcard::to_slice(self, buffer)
            .map(|written| &*written)
            .map_err(|_| ConfigError::Encode)
    }

    /// Deserialize a config blob previously produced by [`Self::encode`].
    pub fn decode(bytes: &'a [u8]) -> Result<Self, ConfigError> {
        postcard::from_bytes(bytes).map_err(|_| ConfigError::Decode)
    }
}
