//! Error types for the iot-alarm-gateway crate.

use thiserror::Error;

/// The main error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// A system bus call failed (object gone, permission denied, bad arguments...).
    #[error("D-Bus error: {0}")]
    Bus(#[from] zbus::Error),

    /// A standard `org.freedesktop.DBus` interface call failed.
    #[error("D-Bus error: {0}")]
    BusInterface(#[from] zbus::fdo::Error),

    /// Bluetooth-related error from the adapter scanner.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Bluetooth is not available or is disabled on this system.
    #[error("Bluetooth not available or disabled")]
    BluetoothUnavailable,

    /// No BLE device matched the requested filter.
    #[error("Device not found: {identifier}")]
    DeviceNotFound {
        /// The identifier that was searched for.
        identifier: String,
    },

    /// Service not found on the device.
    #[error("Service not found: {uuid}")]
    ServiceNotFound {
        /// The UUID of the service that was not found.
        uuid: String,
    },

    /// Characteristic not found on the device.
    #[error("Characteristic not found: {uuid}")]
    CharacteristicNotFound {
        /// The UUID of the characteristic that was not found.
        uuid: String,
    },

    /// Invalid data was received from a remote peer.
    #[error("Invalid data received: {context}")]
    InvalidData {
        /// Description of what was invalid about the data.
        context: String,
    },

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {name} = {value}")]
    InvalidParameter {
        /// The name of the parameter.
        name: String,
        /// The invalid value that was provided.
        value: String,
    },

    /// The sensor factory was asked for a kind it does not know.
    #[error("Unknown sensor kind: {name}")]
    UnknownSensorKind {
        /// The name that was requested.
        name: String,
    },

    /// The I2C bus reported an error.
    #[error("I2C error: {reason}")]
    I2c {
        /// Description of the bus failure.
        reason: String,
    },

    /// The MQTT client rejected a request.
    #[error("MQTT client error: {0}")]
    Mqtt(#[from] rumqttc::ClientError),

    /// The MQTT connection to the cloud failed.
    #[error("Cloud connection failed: {0}")]
    CloudConnection(#[from] rumqttc::ConnectionError),

    /// The cloud did not acknowledge the connection in time.
    #[error("Cloud connection timeout")]
    Timeout,

    /// A configuration file could not be used.
    #[error("Configuration error: {reason}")]
    Config {
        /// Description of the problem.
        reason: String,
    },

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
