//! JSON configuration for the demo binaries.
//!
//! Keys are kebab-case, mirroring the connection options the IoT platform
//! documents (`org`, `auth-method`, `auth-token`, ...).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::alarm::Thresholds;
use crate::ble::DEFAULT_ADAPTER;
use crate::error::{Error, Result};
use crate::sensor::{SensorKind, TC74_DEFAULT_ADDRESS};

/// Organisation id of the unauthenticated sandbox.
pub const QUICKSTART_ORG: &str = "quickstart";

/// Default platform domain.
pub const DEFAULT_DOMAIN: &str = "internetofthings.ibmcloud.com";

/// Username a gateway presents with token authentication.
pub const TOKEN_AUTH_USER: &str = "use-token-auth";

const TLS_PORT: u16 = 8883;
const PLAIN_PORT: u16 = 1883;

/// Which side of the platform a client connects as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientIdentity {
    /// A gateway publishing for its devices.
    Gateway,
    /// An application observing and commanding devices.
    Application,
}

/// Connection options for the IoT platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CloudOptions {
    pub org: String,
    /// Gateway device type. Required for gateways.
    #[serde(rename = "type", default)]
    pub type_id: Option<String>,
    pub id: String,
    #[serde(default = "default_auth_method")]
    pub auth_method: String,
    /// API key. Required for authenticated applications.
    #[serde(default)]
    pub auth_key: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "default_domain")]
    pub domain: String,
    /// Overrides the port derived from the organisation.
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default = "default_true")]
    pub clean_session: bool,
    #[serde(default = "default_keep_alive")]
    pub keep_alive_secs: u64,
}

fn default_auth_method() -> String {
    "token".to_string()
}

fn default_domain() -> String {
    DEFAULT_DOMAIN.to_string()
}

fn default_true() -> bool {
    true
}

fn default_keep_alive() -> u64 {
    60
}

impl CloudOptions {
    /// Whether this is the unauthenticated sandbox.
    pub fn is_quickstart(&self) -> bool {
        self.org == QUICKSTART_ORG
    }

    /// Broker host name.
    pub fn host(&self) -> String {
        format!("{}.messaging.{}", self.org, self.domain)
    }

    /// Broker port; TLS unless quickstart.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(if self.is_quickstart() {
            PLAIN_PORT
        } else {
            TLS_PORT
        })
    }

    /// Whether the connection should use TLS.
    pub fn use_tls(&self) -> bool {
        self.port() != PLAIN_PORT
    }

    /// MQTT client id for `identity`.
    pub fn client_id(&self, identity: ClientIdentity) -> String {
        match identity {
            ClientIdentity::Gateway => format!(
                "g:{}:{}:{}",
                self.org,
                self.type_id.as_deref().unwrap_or_default(),
                self.id
            ),
            ClientIdentity::Application => format!("a:{}:{}", self.org, self.id),
        }
    }

    /// Username and password, or `None` for quickstart.
    pub fn credentials(&self, identity: ClientIdentity) -> Option<(String, String)> {
        if self.is_quickstart() {
            return None;
        }
        let token = self.auth_token.clone()?;
        let user = match identity {
            ClientIdentity::Gateway => TOKEN_AUTH_USER.to_string(),
            ClientIdentity::Application => self.auth_key.clone()?,
        };
        Some((user, token))
    }

    /// Keep-alive interval.
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }

    /// Check the fields `identity` needs are present.
    pub fn validate(&self, identity: ClientIdentity) -> Result<()> {
        if self.org.is_empty() {
            return Err(invalid("org", &self.org));
        }
        if self.id.is_empty() {
            return Err(invalid("id", &self.id));
        }
        if identity == ClientIdentity::Gateway && self.type_id.as_deref().unwrap_or("").is_empty()
        {
            return Err(invalid("type", ""));
        }
        if self.keep_alive_secs < 5 {
            return Err(invalid("keep-alive-secs", &self.keep_alive_secs.to_string()));
        }
        if self.is_quickstart() {
            return Ok(());
        }

        match (identity, self.auth_method.as_str()) {
            (ClientIdentity::Gateway, "token") => {}
            (ClientIdentity::Application, "apikey") => {
                if self.auth_key.is_none() {
                    return Err(invalid("auth-key", ""));
                }
            }
            (_, other) => return Err(invalid("auth-method", other)),
        }
        if self.auth_token.is_none() {
            return Err(invalid("auth-token", ""));
        }
        Ok(())
    }
}

fn invalid(name: &str, value: &str) -> Error {
    Error::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
    }
}

/// Where the gateway takes its readings from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SensorConfig {
    pub kind: SensorKind,
    pub i2c_bus: u8,
    pub address: u8,
    pub interval_ms: u64,
}

impl SensorConfig {
    /// Polling interval.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            kind: SensorKind::Dummy,
            i2c_bus: 1,
            address: TC74_DEFAULT_ADDRESS,
            interval_ms: 3000,
        }
    }
}

/// How the gateway finds its BLE alarm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ActuatorConfig {
    /// Run without an actuator; commands are logged and dropped.
    pub enabled: bool,
    pub adapter: String,
    pub name: String,
    pub require_connected: bool,
    /// Discovery scan before enumerating. 0 disables.
    pub scan_seconds: u64,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            adapter: DEFAULT_ADAPTER.to_string(),
            name: "ITAG".to_string(),
            require_connected: true,
            scan_seconds: 0,
        }
    }
}

/// `iot-demo-gateway` configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GatewayConfig {
    pub cloud: CloudOptions,
    #[serde(default)]
    pub sensor: SensorConfig,
    #[serde(default)]
    pub actuator: ActuatorConfig,
}

impl GatewayConfig {
    /// Validate all sections.
    pub fn validate(&self) -> Result<()> {
        self.cloud.validate(ClientIdentity::Gateway)?;
        if self.sensor.interval_ms == 0 {
            return Err(invalid("interval-ms", "0"));
        }
        if self.sensor.address > 0x7f {
            return Err(invalid("address", &format!("{:#04x}", self.sensor.address)));
        }
        Ok(())
    }
}

/// `iot-demo-control` configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ControlConfig {
    pub cloud: CloudOptions,
    #[serde(default)]
    pub thresholds: Thresholds,
}

impl ControlConfig {
    /// Validate all sections.
    pub fn validate(&self) -> Result<()> {
        self.cloud.validate(ClientIdentity::Application)?;
        Thresholds::new(self.thresholds.warning, self.thresholds.critical)?;
        Ok(())
    }
}

/// Read and parse a JSON configuration file.
pub fn load<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    debug!("Loading configuration from {}", path.display());

    let text = std::fs::read_to_string(path).map_err(|e| Error::Config {
        reason: format!("{}: {}", path.display(), e),
    })?;
    serde_json::from_str(&text).map_err(|e| Error::Config {
        reason: format!("{}: {}", path.display(), e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn gateway_json() -> &'static str {
        r#"{
            "cloud": {
                "org": "abc123",
                "type": "DEMOGATEWAY_T",
                "id": "GATEWAY_1",
                "auth-method": "token",
                "auth-token": "secret"
            }
        }"#
    }

    #[test]
    fn test_gateway_defaults() {
        let config: GatewayConfig = serde_json::from_str(gateway_json()).unwrap();
        config.validate().unwrap();

        assert_eq!(config.sensor, SensorConfig::default());
        assert_eq!(config.sensor.address, 0x4a);
        assert_eq!(config.sensor.interval(), Duration::from_millis(3000));
        assert_eq!(config.actuator.adapter, "hci0");
        assert_eq!(config.actuator.name, "ITAG");
        assert!(config.actuator.require_connected);
    }

    #[test]
    fn test_gateway_connection_parameters() {
        let config: GatewayConfig = serde_json::from_str(gateway_json()).unwrap();
        let cloud = &config.cloud;

        assert_eq!(cloud.host(), "abc123.messaging.internetofthings.ibmcloud.com");
        assert_eq!(cloud.port(), 8883);
        assert!(cloud.use_tls());
        assert_eq!(
            cloud.client_id(ClientIdentity::Gateway),
            "g:abc123:DEMOGATEWAY_T:GATEWAY_1"
        );
        assert_eq!(
            cloud.credentials(ClientIdentity::Gateway),
            Some(("use-token-auth".to_string(), "secret".to_string()))
        );
    }

    #[test]
    fn test_application_options() {
        let config: ControlConfig = serde_json::from_str(
            r#"{
                "cloud": {
                    "org": "abc123",
                    "id": "control",
                    "auth-method": "apikey",
                    "auth-key": "a-abc123-xyz",
                    "auth-token": "secret"
                },
                "thresholds": { "warning": 30, "critical": 35 }
            }"#,
        )
        .unwrap();
        config.validate().unwrap();

        assert_eq!(config.thresholds, Thresholds::new(30, 35).unwrap());
        assert_eq!(
            config.cloud.client_id(ClientIdentity::Application),
            "a:abc123:control"
        );
        assert_eq!(
            config.cloud.credentials(ClientIdentity::Application),
            Some(("a-abc123-xyz".to_string(), "secret".to_string()))
        );
    }

    #[test]
    fn test_quickstart_is_plain_and_anonymous() {
        let options: CloudOptions =
            serde_json::from_str(r#"{ "org": "quickstart", "type": "T", "id": "D" }"#).unwrap();
        options.validate(ClientIdentity::Gateway).unwrap();

        assert_eq!(options.port(), 1883);
        assert!(!options.use_tls());
        assert_eq!(options.credentials(ClientIdentity::Gateway), None);
    }

    #[test]
    fn test_validation_failures() {
        let mut config: GatewayConfig = serde_json::from_str(gateway_json()).unwrap();
        config.cloud.type_id = None;
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidParameter { name, .. }) if name == "type"
        ));

        let mut config: GatewayConfig = serde_json::from_str(gateway_json()).unwrap();
        config.cloud.auth_token = None;
        assert!(config.validate().is_err());

        let mut config: GatewayConfig = serde_json::from_str(gateway_json()).unwrap();
        config.cloud.auth_method = "apikey".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_sensor_kind_rejected() {
        let result: std::result::Result<GatewayConfig, _> = serde_json::from_str(
            r#"{ "cloud": { "org": "quickstart", "type": "T", "id": "D" }, "sensor": { "kind": "LM75" } }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let result: Result<GatewayConfig> = load("/nonexistent/gateway.json");
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
