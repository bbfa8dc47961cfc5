//! Watson IoT MQTT topic scheme.

use std::fmt;

use crate::error::{Error, Result};

/// Single-level wildcard.
pub const ANY: &str = "+";

const ROOT: &str = "iot-2";

/// A device as the platform addresses it: `(type, id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId {
    /// Device type.
    pub type_id: String,
    /// Device id within its type.
    pub device_id: String,
}

impl DeviceId {
    /// Create a device id.
    pub fn new(type_id: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            device_id: device_id.into(),
        }
    }

    /// Matches every device.
    pub fn any() -> Self {
        Self::new(ANY, ANY)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_id, self.device_id)
    }
}

/// A concrete or wildcard topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topic {
    /// `iot-2/type/{t}/id/{d}/evt/{event}/fmt/{format}`
    Event {
        device: DeviceId,
        event: String,
        format: String,
    },
    /// `iot-2/type/{t}/id/{d}/cmd/{command}/fmt/{format}`
    Command {
        device: DeviceId,
        command: String,
        format: String,
    },
    /// `iot-2/type/{t}/id/{d}/mon`
    Status { device: DeviceId },
}

impl Topic {
    /// Event topic.
    pub fn event(device: DeviceId, event: impl Into<String>, format: impl Into<String>) -> Self {
        Self::Event {
            device,
            event: event.into(),
            format: format.into(),
        }
    }

    /// Command topic.
    pub fn command(
        device: DeviceId,
        command: impl Into<String>,
        format: impl Into<String>,
    ) -> Self {
        Self::Command {
            device,
            command: command.into(),
            format: format.into(),
        }
    }

    /// Status topic.
    pub fn status(device: DeviceId) -> Self {
        Self::Status { device }
    }

    /// The device this topic addresses.
    pub fn device(&self) -> &DeviceId {
        match self {
            Self::Event { device, .. } | Self::Command { device, .. } | Self::Status { device } => {
                device
            }
        }
    }

    /// Parse a topic string as received on the wire.
    pub fn parse(topic: &str) -> Result<Self> {
        let parts: Vec<&str> = topic.split('/').collect();
        let invalid = || Error::InvalidData {
            context: format!("unrecognised topic {}", topic),
        };

        match parts.as_slice() {
            [ROOT, "type", t, "id", d, "evt", e, "fmt", f] => {
                Ok(Self::event(DeviceId::new(*t, *d), *e, *f))
            }
            [ROOT, "type", t, "id", d, "cmd", c, "fmt", f] => {
                Ok(Self::command(DeviceId::new(*t, *d), *c, *f))
            }
            [ROOT, "type", t, "id", d, "mon"] => Ok(Self::status(DeviceId::new(*t, *d))),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Event {
                device,
                event,
                format,
            } => write!(
                f,
                "{}/type/{}/id/{}/evt/{}/fmt/{}",
                ROOT, device.type_id, device.device_id, event, format
            ),
            Self::Command {
                device,
                command,
                format,
            } => write!(
                f,
                "{}/type/{}/id/{}/cmd/{}/fmt/{}",
                ROOT, device.type_id, device.device_id, command, format
            ),
            Self::Status { device } => write!(
                f,
                "{}/type/{}/id/{}/mon",
                ROOT, device.type_id, device.device_id
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_event_topic() {
        let topic = Topic::event(DeviceId::new("DEMOSENSOR_T", "TEMPSENSOR_1"), "reading", "json");
        assert_eq!(
            topic.to_string(),
            "iot-2/type/DEMOSENSOR_T/id/TEMPSENSOR_1/evt/reading/fmt/json"
        );
    }

    #[test]
    fn test_wildcard_subscriptions() {
        assert_eq!(
            Topic::event(DeviceId::any(), ANY, ANY).to_string(),
            "iot-2/type/+/id/+/evt/+/fmt/+"
        );
        assert_eq!(
            Topic::status(DeviceId::any()).to_string(),
            "iot-2/type/+/id/+/mon"
        );
    }

    #[test]
    fn test_parse_command() {
        let topic = Topic::parse("iot-2/type/DEMOACTUATOR_T/id/ITAG_ALARM_1/cmd/new_state/fmt/json")
            .unwrap();
        assert_eq!(
            topic,
            Topic::command(DeviceId::new("DEMOACTUATOR_T", "ITAG_ALARM_1"), "new_state", "json")
        );
    }

    #[test]
    fn test_parse_status() {
        let topic = Topic::parse("iot-2/type/T/id/D/mon").unwrap();
        assert_eq!(topic.device(), &DeviceId::new("T", "D"));
    }

    #[test]
    fn test_parse_rejects_foreign_topic() {
        assert!(Topic::parse("iot-2/type/T/id/D/evt/reading").is_err());
        assert!(Topic::parse("home/kitchen/temp").is_err());
    }
}
