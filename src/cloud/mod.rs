//! Cloud messaging.
//!
//! Devices publish events and receive commands over MQTT using the IoT
//! platform's `iot-2/type/{type}/id/{id}/...` topic scheme. [`CloudClient`]
//! is the seam the gateway and control applications are written against;
//! [`MqttCloudClient`] is the rumqttc implementation.

pub mod client;
pub mod message;
pub mod topic;

pub use client::{CloudClient, MqttCloudClient, JSON_FORMAT};
pub use message::{AlarmPayload, CloudMessage, ReadingPayload, StatusPayload};
pub use topic::{DeviceId, Topic, ANY};

#[cfg(test)]
pub use client::MockCloudClient;

/// Device type of the temperature sensor.
pub const SENSOR_TYPE: &str = "DEMOSENSOR_T";
/// Device id of the temperature sensor.
pub const SENSOR_ID: &str = "TEMPSENSOR_1";
/// Device type of the BLE alarm.
pub const ACTUATOR_TYPE: &str = "DEMOACTUATOR_T";
/// Device id of the BLE alarm.
pub const ACTUATOR_ID: &str = "ITAG_ALARM_1";

/// Event carrying a temperature reading.
pub const READING_EVENT: &str = "reading";
/// Event carrying the alarm level the actuator reports.
pub const CURRENT_STATE_EVENT: &str = "current_state";
/// Command setting a new alarm level.
pub const NEW_STATE_COMMAND: &str = "new_state";

/// The temperature sensor's platform identity.
pub fn sensor_device() -> DeviceId {
    DeviceId::new(SENSOR_TYPE, SENSOR_ID)
}

/// The BLE alarm's platform identity.
pub fn actuator_device() -> DeviceId {
    DeviceId::new(ACTUATOR_TYPE, ACTUATOR_ID)
}
