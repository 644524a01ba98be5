//! WiFi and MQTT connection management.
//!
//! Connectivity policy is deliberately blunt: reconnect a few times,
//! then reset the whole node. A restart is cheap, returns the device to
//! a known-good state, and the history starts over empty after one, so
//! there is nothing to salvage by being clever here.

use core::net::IpAddr;
use core::str::FromStr;

use embassy_net::dns::DnsQueryType;
use embassy_net::tcp::TcpSocket;
use embassy_net::{IpEndpoint, Runner, Stack};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Receiver;
use embassy_time::{Duration, Timer};
use esp_radio::wifi::{ClientConfig as WifiClientConfig, ModeConfig, WifiController, WifiDevice};
use heapless::String;
use log::{error, info, warn};
use rust_mqtt::client::client::MqttClient;
use rust_mqtt::client::client_config::ClientConfig;
use rust_mqtt::packet::v5::publish_packet::QualityOfService;
use rust_mqtt::packet::v5::reason_codes::ReasonCode;
use rust_mqtt::utils::rng_generator::CountingRng;

use atmo_core::config::NodeConfig;
use atmo_core::station::AtmoReading;
use atmo_core::telemetry::{self, MqttPublish};

use crate::wifi_secrets;

/// Queue depth between the sampling loop and the publisher.
pub const TELEMETRY_QUEUE_DEPTH: usize = 4;

pub type TelemetryReceiver =
    Receiver<'static, CriticalSectionRawMutex, AtmoReading, TELEMETRY_QUEUE_DEPTH>;

const MQTT_PORT: u16 = 1883;
const MQTT_BUFFER_SIZE: usize = 512;
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Connection attempts before giving up and resetting the node.
const MAX_CONSECUTIVE_FAILURES: u32 = 5;

/// Keep the WiFi association alive, reconnecting whenever it drops.
#[embassy_executor::task]
pub async fn connection_task(mut controller: WifiController<'static>) {
    let client = WifiClientConfig::default()
        .with_ssid(wifi_secrets::WIFI_SSID.into())
        .with_password(wifi_secrets::WIFI_PASSWORD.into());
    if let Err(e) = controller.set_config(&ModeConfig::Client(client)) {
        error!("WiFi configuration rejected: {e:?}");
        esp_hal::system::software_reset();
    }
    if let Err(e) = controller.start() {
        error!("WiFi start failed: {e:?}");
        esp_hal::system::software_reset();
    }
    info!("WiFi started, connecting to '{}'", wifi_secrets::WIFI_SSID);

    let mut failures = 0u32;
    if let Err(e) = controller.connect() {
        error!("WiFi connect failed: {e:?}");
        failures += 1;
    }

    loop {
        Timer::after(RECONNECT_DELAY).await;

        if controller.is_connected().unwrap_or(false) {
            failures = 0;
            continue;
        }

        failures += 1;
        if failures >= MAX_CONSECUTIVE_FAILURES {
            error!("WiFi down after {failures} attempts, resetting");
            esp_hal::system::software_reset();
        }

        warn!("WiFi disconnected, reconnecting");
        if let Err(e) = controller.connect() {
            error!("WiFi reconnect failed: {e:?}");
        }
    }
}

/// Drive the network stack.
#[embassy_executor::task]
pub async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}

/// Resolve the configured broker: a dotted IP short-circuits DNS.
async fn broker_endpoint(stack: Stack<'static>, server: &str) -> Option<IpEndpoint> {
    if let Ok(address) = IpAddr::from_str(server) {
        return Some(IpEndpoint::from((address, MQTT_PORT)));
    }
    match stack.dns_query(server, DnsQueryType::A).await {
        Ok(addresses) => addresses
            .first()
            .map(|&address| IpEndpoint::from((address, MQTT_PORT))),
        Err(e) => {
            error!("DNS lookup for '{server}' failed: {e:?}");
            None
        }
    }
}

struct MqttLink<'a> {
    client: MqttClient<'a, TcpSocket<'a>, 5, CountingRng>,
}

impl MqttPublish for MqttLink<'_> {
    type Error = ReasonCode;

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), ReasonCode> {
        self.client
            .send_message(topic, payload, QualityOfService::QoS0, false)
            .await
    }
}

/// Publish every sampled reading; owns the broker connection.
#[embassy_executor::task]
pub async fn telemetry_task(
    stack: Stack<'static>,
    readings: TelemetryReceiver,
    node: NodeConfig<'static>,
) {
    stack.wait_config_up().await;
    if let Some(config) = stack.config_v4() {
        info!("network up, address {}", config.address);
    }

    let mut client_id: String<64> = String::new();
    let _ = core::fmt::Write::write_fmt(
        &mut client_id,
        format_args!("AtmoNode-{}", node.room),
    );

    let mut rx_buffer = [0u8; 1024];
    let mut tx_buffer = [0u8; 1024];
    let mut mqtt_rx = [0u8; MQTT_BUFFER_SIZE];
    let mut mqtt_tx = [0u8; MQTT_BUFFER_SIZE];

    let mut failures = 0u32;
    loop {
        if failures >= MAX_CONSECUTIVE_FAILURES {
            error!("giving up on MQTT after {failures} attempts, resetting");
            esp_hal::system::software_reset();
        }

        let Some(endpoint) = broker_endpoint(stack, node.mqtt_server).await else {
            failures += 1;
            Timer::after(RECONNECT_DELAY).await;
            continue;
        };

        let mut socket = TcpSocket::new(stack, &mut rx_buffer, &mut tx_buffer);
        socket.set_timeout(Some(Duration::from_secs(30)));
        if let Err(e) = socket.connect(endpoint).await {
            error!("TCP connect to {endpoint} failed: {e:?}");
            failures += 1;
            Timer::after(RECONNECT_DELAY).await;
            continue;
        }

        let mut config: ClientConfig<'_, 5, CountingRng> = ClientConfig::new(
            rust_mqtt::client::client_config::MqttVersion::MQTTv5,
            CountingRng(20000),
        );
        config.add_client_id(&client_id);
        config.max_packet_size = MQTT_BUFFER_SIZE as u32;

        let mut link = MqttLink {
            client: MqttClient::new(
                socket,
                &mut mqtt_tx,
                MQTT_BUFFER_SIZE,
                &mut mqtt_rx,
                MQTT_BUFFER_SIZE,
                config,
            ),
        };

        if let Err(e) = link.client.connect_to_broker().await {
            error!("MQTT connect failed: {e:?}");
            failures += 1;
            Timer::after(RECONNECT_DELAY).await;
            continue;
        }
        info!("MQTT connected as '{}'", client_id);
        failures = 0;

        loop {
            let reading = readings.receive().await;
            if let Err(e) = telemetry::publish_reading(&mut link, node.room, &reading).await {
                // Drop the connection and rebuild it; the reading is
                // lost, the next one is a minute away.
                warn!("publish failed: {e:?}, reconnecting");
                failures += 1;
                break;
            }
        }
    }
}
