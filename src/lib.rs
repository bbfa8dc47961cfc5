// Allow unusual byte groupings for UUIDs which have standard format
#![allow(clippy::unusual_byte_groupings)]

//! # iot-alarm-gateway
//!
//! A temperature alarm demo spanning a Linux gateway, the cloud and a BLE
//! key-finder tag.
//!
//! The gateway polls a Microchip TC74 thermometer over I2C and publishes each
//! reading to the IoT platform over MQTT. A control application in the cloud
//! maps readings to an alarm level and sends a command back whenever the level
//! changes. The gateway writes the level to the tag's Alert Level
//! characteristic through BlueZ, reads it back and reports it.
//!
//! ## Components
//!
//! - **BLE client** ([`ble`]): devices, GATT services and characteristics on
//!   the system bus, addressed by UUID and discovered lazily
//! - **Sensors** ([`sensor`]): the TC74 driver and a hardware-free counter
//! - **Thresholds** ([`alarm`]): temperature to alarm level, edge-triggered
//! - **Cloud** ([`cloud`]): MQTT topics, payloads and the client seam
//! - **Applications** ([`gateway`], [`control`])
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use iot_alarm_gateway::ble::{fetch_devices, DbusBus, NameFilter, ObjectBus};
//! use iot_alarm_gateway::ble::{ALERT_LEVEL_UUID, IMMEDIATE_ALERT_SERVICE_UUID};
//! use iot_alarm_gateway::Result;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let bus: Arc<dyn ObjectBus> = Arc::new(DbusBus::system().await?);
//!
//!     for device in fetch_devices(&bus, &NameFilter::connected("ITAG"), "hci0").await? {
//!         let Some(service) = device.service(&IMMEDIATE_ALERT_SERVICE_UUID).await? else {
//!             continue;
//!         };
//!         if let Some(level) = service.characteristic(&ALERT_LEVEL_UUID).await? {
//!             level.write_value(&[2]).await?;
//!             println!("{:?}", level.read_value().await?);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Platform Notes
//!
//! Linux only. Requires BlueZ and access to the system bus; the user may need
//! to be in the `bluetooth` group. The TC74 sensor needs read/write access to
//! `/dev/i2c-*`.

// Public modules
pub mod alarm;
pub mod ble;
pub mod cloud;
pub mod config;
pub mod context;
pub mod control;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod sensor;

// Re-exports for convenience
pub use alarm::{AlarmLevel, AlarmTracker, Thresholds};
pub use context::AppContext;
pub use error::{Error, Result};

pub use ble::{BleCharacteristic, BleDevice, BleService, ObjectBus, ObjectPath};
pub use cloud::{CloudClient, CloudMessage, DeviceId, MqttCloudClient};
pub use config::{ControlConfig, GatewayConfig};
pub use control::ControlApplication;
pub use gateway::{Actuator, Gateway};
pub use sensor::{create_sensor, Sensor, SensorKind, TemperatureSensor};
