//! Telemetry encoding and the publish seam.
//!
//! Two message families go out every sampling cycle, matching what the
//! receiving side expects:
//!
//! - per-quantity topics (`atmonode/<room>/co2`, …) carrying the bare
//!   value, for live dashboards;
//! - a shared persistent topic carrying line-protocol records
//!   (`co2,site=<room> value=612.00`) that a bridge appends straight
//!   into the time-series database.
//!
//! Everything is built into `heapless` strings; an oversized room name
//! truncates instead of failing the cycle.

use core::fmt::Write as _;

use heapless::String;

use crate::station::AtmoReading;

/// Topic every line-protocol record is published to.
pub const PERSISTENT_TOPIC: &str = "atmonode";

/// Capacity for topic strings.
pub const TOPIC_CAPACITY: usize = 64;

/// Capacity for a single published payload.
pub const MESSAGE_CAPACITY: usize = 64;

pub type Topic = String<TOPIC_CAPACITY>;
pub type Message = String<MESSAGE_CAPACITY>;

/// Minimal publish interface, so the encoding stays independent of the
/// concrete MQTT client and can be exercised against a mock.
pub trait MqttPublish {
    type Error;

    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
    ) -> impl Future<Output = Result<(), Self::Error>>;
}

/// Per-quantity live topic: `atmonode/<room>/<quantity>`.
pub fn value_topic(room: &str, quantity: &str) -> Topic {
    let mut topic = Topic::new();
    let _ = write!(topic, "{PERSISTENT_TOPIC}/{room}/{quantity}");
    topic
}

/// Line-protocol record for one measurement:
/// `<measurement>,site=<room> value=<value>`.
pub fn measurement_line(measurement: &str, site: &str, value: f32) -> Message {
    let mut line = Message::new();
    let _ = write!(line, "{measurement},site={site} value={value:.2}");
    line
}

/// Line-protocol record for one particle-count bin:
/// `particles,site=<room>,size=<size> value=<count>`.
pub fn particle_line(site: &str, size_um: f32, count: u16) -> Message {
    let mut line = Message::new();
    let _ = write!(line, "particles,site={site},size={size_um:.1} value={count}");
    line
}

fn integer_payload(value: u16) -> Message {
    let mut payload = Message::new();
    let _ = write!(payload, "{value}");
    payload
}

/// Publish the full message set for one sampling cycle: live values
/// for CO2 and the three standard particulate channels, then
/// line-protocol records for every concentration variant and
/// particle-count bin.
pub async fn publish_reading<P: MqttPublish>(
    mqtt: &mut P,
    room: &str,
    reading: &AtmoReading,
) -> Result<(), P::Error> {
    let pm = &reading.particulate;

    let live: [(&str, u16); 4] = [
        ("co2", reading.co2_ppm),
        ("pm10", pm.pm10_standard),
        ("pm25", pm.pm25_standard),
        ("pm100", pm.pm100_standard),
    ];
    for (quantity, value) in live {
        let topic = value_topic(room, quantity);
        mqtt.publish(&topic, integer_payload(value).as_bytes())
            .await?;
    }

    let lines: [(&str, u16); 7] = [
        ("co2", reading.co2_ppm),
        ("pm10_std", pm.pm10_standard),
        ("pm25_std", pm.pm25_standard),
        ("pm100_std", pm.pm100_standard),
        ("pm10_env", pm.pm10_env),
        ("pm25_env", pm.pm25_env),
        ("pm100_env", pm.pm100_env),
    ];
    for (measurement, value) in lines {
        let line = measurement_line(measurement, room, f32::from(value));
        mqtt.publish(PERSISTENT_TOPIC, line.as_bytes()).await?;
    }

    let bins: [(f32, u16); 6] = [
        (0.3, pm.particles_03um),
        (0.5, pm.particles_05um),
        (1.0, pm.particles_10um),
        (2.5, pm.particles_25um),
        (5.0, pm.particles_50um),
        (10.0, pm.particles_100um),
    ];
    for (size_um, count) in bins {
        let line = particle_line(room, size_um, count);
        mqtt.publish(PERSISTENT_TOPIC, line.as_bytes()).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::PmsReading;

    use std::string::String as StdString;
    use std::vec::Vec;

    #[derive(Default)]
    struct CapturingPublisher {
        messages: Vec<(StdString, StdString)>,
    }

    impl MqttPublish for CapturingPublisher {
        type Error = core::convert::Infallible;

        async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), Self::Error> {
            self.messages.push((
                topic.into(),
                StdString::from_utf8(payload.to_vec()).unwrap(),
            ));
            Ok(())
        }
    }

    fn block_on<F: Future>(future: F) -> F::Output {
        // The futures under test never yield; a no-op waker suffices.
        use core::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

        fn raw_waker() -> RawWaker {
            fn no_op(_: *const ()) {}
            fn clone(_: *const ()) -> RawWaker {
                raw_waker()
            }
            RawWaker::new(
                core::ptr::null(),
                &RawWakerVTable::new(clone, no_op, no_op, no_op),
            )
        }

        let waker = unsafe { Waker::from_raw(raw_waker()) };
        let mut context = Context::from_waker(&waker);
        let mut future = core::pin::pin!(future);
        loop {
            if let Poll::Ready(output) = future.as_mut().poll(&mut context) {
                return output;
            }
        }
    }

    #[test]
    fn topics_are_namespaced_by_room() {
        assert_eq!(value_topic("office", "co2").as_str(), "atmonode/office/co2");
    }

    #[test]
    fn line_protocol_matches_the_ingest_format() {
        assert_eq!(
            measurement_line("co2", "office", 612.0).as_str(),
            "co2,site=office value=612.00"
        );
        assert_eq!(
            particle_line("office", 0.3, 1500).as_str(),
            "particles,site=office,size=0.3 value=1500"
        );
    }

    #[test]
    fn one_cycle_publishes_the_full_message_set() {
        let reading = AtmoReading {
            particulate: PmsReading {
                pm10_standard: 3,
                pm25_standard: 5,
                pm100_standard: 8,
                pm10_env: 3,
                pm25_env: 6,
                pm100_env: 9,
                particles_03um: 1500,
                particles_05um: 400,
                particles_10um: 120,
                particles_25um: 20,
                particles_50um: 4,
                particles_100um: 2,
            },
            co2_ppm: 612,
            lux: 80.0,
        };

        let mut mqtt = CapturingPublisher::default();
        block_on(publish_reading(&mut mqtt, "office", &reading)).unwrap();

        // 4 live values + 7 concentration lines + 6 particle bins
        assert_eq!(mqtt.messages.len(), 17);
        assert_eq!(mqtt.messages[0], ("atmonode/office/co2".into(), "612".into()));
        assert_eq!(mqtt.messages[2], ("atmonode/office/pm25".into(), "5".into()));
        assert_eq!(
            mqtt.messages[4],
            ("atmonode".into(), "co2,site=office value=612.00".into())
        );
        assert_eq!(
            mqtt.messages[8],
            ("atmonode".into(), "pm10_env,site=office value=3.00".into())
        );
        assert_eq!(
            mqtt.messages[11],
            (
                "atmonode".into(),
                "particles,site=office,size=0.3 value=1500".into()
            )
        );
        assert_eq!(
            mqtt.messages[16],
            (
                "atmonode".into(),
                "particles,site=office,size=10.0 value=2".into()
            )
        );
    }
}
