//! Inbound messages and the JSON payloads the demo exchanges.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::cloud::topic::{DeviceId, Topic};
use crate::error::{Error, Result};

/// `{"temperature": t}` published by the gateway for the sensor device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingPayload {
    /// Whole degrees Celsius.
    pub temperature: i32,
}

/// `{"alarm": n}` used both as the `new_state` command and the
/// `current_state` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmPayload {
    /// Alert level byte.
    pub alarm: u8,
}

/// Connection status the platform publishes on a device's `mon` topic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatusPayload {
    /// `Connect` or `Disconnect`.
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub client_addr: Option<String>,
    #[serde(default, rename = "ClientID")]
    pub client_id: Option<String>,
    /// Set on disconnects.
    #[serde(default)]
    pub reason: Option<String>,
}

/// A message delivered to a subscriber.
#[derive(Debug, Clone, PartialEq)]
pub enum CloudMessage {
    /// A device event.
    Event {
        device: DeviceId,
        event: String,
        format: String,
        payload: Bytes,
        received_at: DateTime<Utc>,
    },
    /// A device connection status change.
    Status {
        device: DeviceId,
        payload: Bytes,
        received_at: DateTime<Utc>,
    },
    /// A command addressed to a device.
    Command {
        device: DeviceId,
        command: String,
        format: String,
        payload: Bytes,
        received_at: DateTime<Utc>,
    },
}

impl CloudMessage {
    /// Classify a raw publish by its topic.
    pub fn from_publish(topic: &str, payload: Bytes) -> Result<Self> {
        let received_at = Utc::now();
        let message = match Topic::parse(topic)? {
            Topic::Event {
                device,
                event,
                format,
            } => Self::Event {
                device,
                event,
                format,
                payload,
                received_at,
            },
            Topic::Command {
                device,
                command,
                format,
            } => Self::Command {
                device,
                command,
                format,
                payload,
                received_at,
            },
            Topic::Status { device } => Self::Status {
                device,
                payload,
                received_at,
            },
        };
        Ok(message)
    }

    /// The device the message concerns.
    pub fn device(&self) -> &DeviceId {
        match self {
            Self::Event { device, .. } | Self::Status { device, .. } | Self::Command { device, .. } => {
                device
            }
        }
    }

    /// Raw payload bytes.
    pub fn payload(&self) -> &Bytes {
        match self {
            Self::Event { payload, .. }
            | Self::Status { payload, .. }
            | Self::Command { payload, .. } => payload,
        }
    }

    /// Decode the payload as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(self.payload()).map_err(|e| Error::InvalidData {
            context: format!("payload from {}: {}", self.device(), e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_event_from_publish() {
        let message = CloudMessage::from_publish(
            "iot-2/type/DEMOSENSOR_T/id/TEMPSENSOR_1/evt/reading/fmt/json",
            Bytes::from_static(br#"{"temperature": 42}"#),
        )
        .unwrap();

        match &message {
            CloudMessage::Event { device, event, .. } => {
                assert_eq!(device, &DeviceId::new("DEMOSENSOR_T", "TEMPSENSOR_1"));
                assert_eq!(event, "reading");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            message.json::<ReadingPayload>().unwrap(),
            ReadingPayload { temperature: 42 }
        );
    }

    #[test]
    fn test_malformed_payload() {
        let message = CloudMessage::from_publish(
            "iot-2/type/DEMOACTUATOR_T/id/ITAG_ALARM_1/cmd/new_state/fmt/json",
            Bytes::from_static(b"{\"alarm\": \"loud\"}"),
        )
        .unwrap();
        assert!(matches!(
            message.json::<AlarmPayload>(),
            Err(Error::InvalidData { .. })
        ));
    }

    #[test]
    fn test_status_payload() {
        let message = CloudMessage::from_publish(
            "iot-2/type/DEMOSENSOR_T/id/TEMPSENSOR_1/mon",
            Bytes::from_static(
                br#"{"Action":"Disconnect","ClientAddr":"10.0.0.7","ClientID":"g:org:T:D","Reason":"The connection has completed normally.","Port":8883}"#,
            ),
        )
        .unwrap();

        let status: StatusPayload = message.json().unwrap();
        assert_eq!(status.action.as_deref(), Some("Disconnect"));
        assert_eq!(status.client_id.as_deref(), Some("g:org:T:D"));
        assert!(status.reason.is_some());
    }

    #[test]
    fn test_alarm_payload_shape() {
        let json = serde_json::to_value(AlarmPayload { alarm: 2 }).unwrap();
        assert_eq!(json, serde_json::json!({ "alarm": 2 }));
    }
}
