//! The gateway process.
//!
//! Polls the local temperature sensor and publishes each reading, and turns
//! `new_state` commands from the cloud into writes on the BLE alarm's Alert
//! Level characteristic. After every write the level is read back from the
//! device and reported as a `current_state` event.

use rumqttc::QoS;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::ble::{
    fetch_devices, AdapterScanner, BleCharacteristic, BleDevice, NameFilter, ObjectBus,
    ALERT_LEVEL_UUID, IMMEDIATE_ALERT_SERVICE_UUID,
};
use crate::cloud::{
    actuator_device, sensor_device, AlarmPayload, CloudClient, CloudMessage, DeviceId,
    ReadingPayload, CURRENT_STATE_EVENT, NEW_STATE_COMMAND, READING_EVENT,
};
use crate::config::ActuatorConfig;
use crate::context::AppContext;
use crate::error::{Error, Result};
use crate::sensor::TemperatureSensor;

/// The BLE alarm: a device and its Alert Level characteristic.
#[derive(Debug, Clone)]
pub struct Actuator {
    device: Arc<BleDevice>,
    alert_level: Arc<BleCharacteristic>,
}

impl Actuator {
    /// Pair a device with its alert level characteristic.
    pub fn new(device: Arc<BleDevice>, alert_level: Arc<BleCharacteristic>) -> Self {
        Self {
            device,
            alert_level,
        }
    }

    /// The underlying device.
    pub fn device(&self) -> &Arc<BleDevice> {
        &self.device
    }

    /// Write `level` and return the level the device reports afterwards.
    pub async fn set_level(&self, level: u8) -> Result<u8> {
        self.alert_level.write_value(&[level]).await?;
        self.level().await
    }

    /// Current level as reported by the device.
    pub async fn level(&self) -> Result<u8> {
        let value = self.alert_level.read_value().await?;
        value.first().copied().ok_or_else(|| Error::InvalidData {
            context: format!("empty alert level from {}", self.alert_level.path()),
        })
    }
}

/// Find the configured alarm and its Alert Level characteristic.
///
/// Runs a discovery scan first when `scan_seconds` is set. A device found by
/// name but not connected is connected to when `require_connected` is off.
///
/// # Errors
///
/// Returns [`Error::DeviceNotFound`], [`Error::ServiceNotFound`] or
/// [`Error::CharacteristicNotFound`] when the GATT path to the
/// characteristic is incomplete; bus errors are passed through.
pub async fn locate_actuator(bus: &Arc<dyn ObjectBus>, config: &ActuatorConfig) -> Result<Actuator> {
    if config.scan_seconds > 0 {
        match AdapterScanner::new(&config.adapter).await {
            Ok(scanner) => match scanner.scan_for(Duration::from_secs(config.scan_seconds)).await {
                Ok(seen) => debug!("Scan saw {} peripherals", seen.len()),
                Err(e) => warn!("Discovery scan failed: {}", e),
            },
            Err(e) => warn!("Discovery scan unavailable: {}", e),
        }
    }

    let filter = NameFilter {
        name: config.name.clone(),
        require_connected: config.require_connected,
    };
    let device = fetch_devices(bus, &filter, &config.adapter)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| Error::DeviceNotFound {
            identifier: format!("{} on {}", config.name, config.adapter),
        })?;

    info!("Found actuator {} at {}", config.name, device.path());

    if !config.require_connected && device.connected().await? != Some(true) {
        info!("Connecting to {}", device.path());
        device.connect().await?;
    }

    let service = device
        .service(&IMMEDIATE_ALERT_SERVICE_UUID)
        .await?
        .ok_or_else(|| Error::ServiceNotFound {
            uuid: IMMEDIATE_ALERT_SERVICE_UUID.to_string(),
        })?;
    let alert_level = service
        .characteristic(&ALERT_LEVEL_UUID)
        .await?
        .ok_or_else(|| Error::CharacteristicNotFound {
            uuid: ALERT_LEVEL_UUID.to_string(),
        })?;

    Ok(Actuator::new(device, alert_level))
}

/// Sensor-to-cloud and cloud-to-actuator bridge.
pub struct Gateway<C, S> {
    cloud: C,
    sensor: S,
    actuator: Option<Actuator>,
    sensor_device: DeviceId,
    actuator_device: DeviceId,
    interval: Duration,
}

impl<C: CloudClient, S: TemperatureSensor> Gateway<C, S> {
    /// Create a gateway. Without an actuator, alarm commands are dropped.
    pub fn new(cloud: C, sensor: S, actuator: Option<Actuator>, interval: Duration) -> Self {
        Self {
            cloud,
            sensor,
            actuator,
            sensor_device: sensor_device(),
            actuator_device: actuator_device(),
            interval,
        }
    }

    /// The cloud client.
    pub fn cloud(&self) -> &C {
        &self.cloud
    }

    /// Announce the initial alarm state and subscribe to alarm commands.
    pub async fn start(&self) -> Result<()> {
        self.cloud
            .publish_device_event(
                &self.actuator_device,
                CURRENT_STATE_EVENT,
                &serde_json::to_value(AlarmPayload { alarm: 0 })?,
                QoS::AtLeastOnce,
            )
            .await?;

        self.cloud
            .subscribe_device_commands(&self.actuator_device, NEW_STATE_COMMAND, QoS::ExactlyOnce)
            .await?;

        info!("Gateway started, polling every {:?}", self.interval);
        Ok(())
    }

    /// Take one reading and publish it.
    ///
    /// A failed publish is logged; only a failed read is an error.
    pub async fn poll_sensor(&mut self) -> Result<i32> {
        let temperature = self.sensor.read()?;
        info!("Temperature: {} C", temperature);

        let payload = serde_json::to_value(ReadingPayload { temperature })?;
        if let Err(e) = self
            .cloud
            .publish_device_event(&self.sensor_device, READING_EVENT, &payload, QoS::AtLeastOnce)
            .await
        {
            warn!("Failed to publish reading: {}", e);
        }

        Ok(temperature)
    }

    /// React to an inbound message. Failures are logged.
    pub async fn handle_message(&self, message: &CloudMessage) {
        let CloudMessage::Command {
            device, command, ..
        } = message
        else {
            debug!("Ignoring {:?}", message);
            return;
        };

        if device != &self.actuator_device || command != NEW_STATE_COMMAND {
            debug!("Ignoring command {} for {}", command, device);
            return;
        }

        let payload: AlarmPayload = match message.json() {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Malformed {} command: {}", NEW_STATE_COMMAND, e);
                return;
            }
        };

        info!("Command {} alarm={}", NEW_STATE_COMMAND, payload.alarm);

        if let Err(e) = self.apply_alarm(payload.alarm).await {
            warn!("Failed to apply alarm level {}: {}", payload.alarm, e);
        }
    }

    /// Write `level` to the actuator, read it back and report it.
    pub async fn apply_alarm(&self, level: u8) -> Result<()> {
        let Some(actuator) = &self.actuator else {
            info!("No actuator attached, dropping alarm level {}", level);
            return Ok(());
        };

        let reported = actuator.set_level(level).await?;
        debug!("Actuator reports level {}", reported);

        self.cloud
            .publish_device_event(
                &self.actuator_device,
                CURRENT_STATE_EVENT,
                &serde_json::to_value(AlarmPayload { alarm: reported })?,
                QoS::AtLeastOnce,
            )
            .await
    }

    /// Run until shutdown is requested or the cloud connection goes away.
    pub async fn run(
        mut self,
        context: &AppContext,
        mut inbound: mpsc::Receiver<CloudMessage>,
    ) -> Result<()> {
        let mut shutdown = context.shutdown_signal();
        self.start().await?;

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Gateway stopping");
                    break;
                }
                message = inbound.recv() => match message {
                    Some(message) => self.handle_message(&message).await,
                    None => {
                        error!("Cloud connection closed");
                        break;
                    }
                },
                _ = ticker.tick() => {
                    if let Err(e) = self.poll_sensor().await {
                        warn!("Sensor read failed: {}", e);
                    }
                }
            }
        }

        self.cloud.disconnect().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::testing::BusFixture;
    use crate::ble::ObjectPath;
    use crate::cloud::{MockCloudClient, ACTUATOR_ID, SENSOR_ID};
    use crate::sensor::DummySensor;
    use bytes::Bytes;
    use tokio_test::assert_ok;
    use serde_json::json;

    const ADAPTER: &str = "/org/bluez/hci0";
    const DEVICE: &str = "/org/bluez/hci0/dev_FF_FF_10_2E_4B_91";
    const SERVICE: &str = "/org/bluez/hci0/dev_FF_FF_10_2E_4B_91/service000a";
    const CHAR: &str = "/org/bluez/hci0/dev_FF_FF_10_2E_4B_91/service000a/char000b";

    fn itag(connected: bool) -> BusFixture {
        BusFixture::new()
            .node(ADAPTER, "dev_FF_FF_10_2E_4B_91")
            .property(DEVICE, "Name", "ITAG")
            .property(DEVICE, "Connected", connected)
            .node(DEVICE, "service000a")
            .uuid(SERVICE, IMMEDIATE_ALERT_SERVICE_UUID)
            .node(SERVICE, "char000b")
            .uuid(CHAR, ALERT_LEVEL_UUID)
    }

    fn actuator_config() -> ActuatorConfig {
        ActuatorConfig::default()
    }

    fn command(payload: &'static [u8]) -> CloudMessage {
        CloudMessage::from_publish(
            "iot-2/type/DEMOACTUATOR_T/id/ITAG_ALARM_1/cmd/new_state/fmt/json",
            Bytes::from_static(payload),
        )
        .unwrap()
    }

    async fn actuator_with(bus: crate::ble::bus::MockObjectBus) -> Actuator {
        let bus: Arc<dyn ObjectBus> = Arc::new(bus);
        locate_actuator(&bus, &actuator_config()).await.unwrap()
    }

    #[tokio::test]
    async fn test_start_announces_and_subscribes() {
        let mut cloud = MockCloudClient::new();
        cloud
            .expect_publish_device_event()
            .withf(|device, event, payload, qos| {
                device.device_id == ACTUATOR_ID
                    && event == CURRENT_STATE_EVENT
                    && *payload == json!({ "alarm": 0 })
                    && *qos == QoS::AtLeastOnce
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));
        cloud
            .expect_subscribe_device_commands()
            .withf(|device, command, qos| {
                device.device_id == ACTUATOR_ID
                    && command == NEW_STATE_COMMAND
                    && *qos == QoS::ExactlyOnce
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let gateway = Gateway::new(cloud, DummySensor::new(), None, Duration::from_secs(3));
        assert_ok!(gateway.start().await);
    }

    #[tokio::test]
    async fn test_poll_publishes_reading() {
        let mut cloud = MockCloudClient::new();
        let mut seq = mockall::Sequence::new();
        for expected in [1, 2] {
            cloud
                .expect_publish_device_event()
                .withf(move |device, event, payload, _| {
                    device.device_id == SENSOR_ID
                        && event == READING_EVENT
                        && *payload == json!({ "temperature": expected })
                })
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, _, _, _| Ok(()));
        }

        let mut gateway = Gateway::new(cloud, DummySensor::new(), None, Duration::from_secs(3));
        assert_eq!(gateway.poll_sensor().await.unwrap(), 1);
        assert_eq!(gateway.poll_sensor().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_poll_survives_publish_failure() {
        let mut cloud = MockCloudClient::new();
        cloud.expect_publish_device_event().returning(|_, _, _, _| {
            Err(Error::InvalidData {
                context: "offline".to_string(),
            })
        });

        let mut gateway = Gateway::new(cloud, DummySensor::new(), None, Duration::from_secs(3));
        assert_eq!(gateway.poll_sensor().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_command_writes_and_reports_readback() {
        let mut bus = itag(true).into_mock();
        bus.expect_write_value()
            .withf(|path, value| path.as_str() == CHAR && value.to_vec() == vec![2])
            .times(1)
            .returning(|_, _| Ok(()));
        bus.expect_read_value()
            .times(1)
            .returning(|_| Ok(vec![2]));
        let actuator = actuator_with(bus).await;

        let mut cloud = MockCloudClient::new();
        cloud
            .expect_publish_device_event()
            .withf(|device, event, payload, _| {
                device.device_id == ACTUATOR_ID
                    && event == CURRENT_STATE_EVENT
                    && *payload == json!({ "alarm": 2 })
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let gateway = Gateway::new(
            cloud,
            DummySensor::new(),
            Some(actuator),
            Duration::from_secs(3),
        );
        gateway.handle_message(&command(br#"{"alarm": 2}"#)).await;
    }

    #[tokio::test]
    async fn test_failed_write_is_not_reported() {
        let mut bus = itag(true).into_mock();
        bus.expect_write_value().returning(|_, _| {
            Err(Error::Bus(zbus::Error::Failure(
                "org.bluez.Error.NotConnected".to_string(),
            )))
        });
        bus.expect_read_value().never();
        let actuator = actuator_with(bus).await;

        let mut cloud = MockCloudClient::new();
        cloud.expect_publish_device_event().never();

        let gateway = Gateway::new(
            cloud,
            DummySensor::new(),
            Some(actuator),
            Duration::from_secs(3),
        );
        gateway.handle_message(&command(br#"{"alarm": 1}"#)).await;
    }

    #[tokio::test]
    async fn test_malformed_and_foreign_messages_ignored() {
        let mut cloud = MockCloudClient::new();
        cloud.expect_publish_device_event().never();
        let gateway = Gateway::new(cloud, DummySensor::new(), None, Duration::from_secs(3));

        gateway.handle_message(&command(b"not json")).await;
        let reading = CloudMessage::from_publish(
            "iot-2/type/DEMOSENSOR_T/id/TEMPSENSOR_1/evt/reading/fmt/json",
            Bytes::from_static(br#"{"temperature": 50}"#),
        )
        .unwrap();
        gateway.handle_message(&reading).await;
    }

    #[tokio::test]
    async fn test_no_actuator_drops_command() {
        let mut cloud = MockCloudClient::new();
        cloud.expect_publish_device_event().never();
        let gateway = Gateway::new(cloud, DummySensor::new(), None, Duration::from_secs(3));

        assert_ok!(gateway.apply_alarm(2).await);
    }

    #[tokio::test]
    async fn test_locate_requires_connection() {
        let bus = itag(false).into_bus();
        let result = locate_actuator(&bus, &actuator_config()).await;
        assert!(matches!(result, Err(Error::DeviceNotFound { .. })));
    }

    #[tokio::test]
    async fn test_locate_connects_when_allowed() {
        let mut bus = itag(false).into_mock();
        bus.expect_call_method()
            .withf(|path, _, method| path.as_str() == DEVICE && method == "Connect")
            .times(1)
            .returning(|_, _, _| Ok(()));
        let bus: Arc<dyn ObjectBus> = Arc::new(bus);

        let config = ActuatorConfig {
            require_connected: false,
            ..ActuatorConfig::default()
        };
        let actuator = locate_actuator(&bus, &config).await.unwrap();
        assert_eq!(actuator.device().path(), &ObjectPath::new(DEVICE));
    }

    #[tokio::test]
    async fn test_locate_missing_characteristic() {
        let bus = BusFixture::new()
            .node(ADAPTER, "dev_FF_FF_10_2E_4B_91")
            .property(DEVICE, "Name", "ITAG")
            .property(DEVICE, "Connected", true)
            .node(DEVICE, "service000a")
            .uuid(SERVICE, IMMEDIATE_ALERT_SERVICE_UUID)
            .into_bus();

        let result = locate_actuator(&bus, &actuator_config()).await;
        assert!(matches!(result, Err(Error::CharacteristicNotFound { .. })));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let mut cloud = MockCloudClient::new();
        cloud
            .expect_publish_device_event()
            .returning(|_, _, _, _| Ok(()));
        cloud
            .expect_subscribe_device_commands()
            .returning(|_, _, _| Ok(()));
        cloud.expect_disconnect().times(1).returning(|| Ok(()));

        let context = AppContext::new();
        let (_tx, rx) = mpsc::channel(1);
        let gateway = Gateway::new(cloud, DummySensor::new(), None, Duration::from_secs(3600));

        let stopper = context.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            stopper.request_shutdown();
        });

        assert_ok!(gateway.run(&context, rx).await);
    }
}
