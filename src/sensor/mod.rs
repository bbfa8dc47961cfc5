//! Temperature sensor drivers.
//!
//! A single capability, [`TemperatureSensor::read`], with two variants: the
//! TC74 on an I2C bus and a dummy counter for running without hardware. The
//! variant is picked by name through [`SensorKind`]; unknown names are
//! rejected.

mod dummy;
mod tc74;

use std::fmt;
use std::str::FromStr;

use linux_embedded_hal::I2cdev;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};

pub use dummy::DummySensor;
pub use tc74::{Tc74Sensor, TC74_DEFAULT_ADDRESS};

/// Something that yields a temperature in whole degrees Celsius.
pub trait TemperatureSensor {
    /// Take one reading.
    fn read(&mut self) -> Result<i32>;
}

/// The sensor variants the factory can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SensorKind {
    /// Counter cycling through 1..=101.
    Dummy,
    /// TC74 digital thermometer on I2C.
    Tc74,
}

impl SensorKind {
    /// Canonical name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dummy => "dummy",
            Self::Tc74 => "tc74",
        }
    }
}

impl FromStr for SensorKind {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "dummy" | "TC74SensorDummy" => Ok(Self::Dummy),
            "tc74" | "TC74SensorImpl" => Ok(Self::Tc74),
            other => Err(Error::UnknownSensorKind {
                name: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for SensorKind {
    type Error = Error;

    fn try_from(name: String) -> Result<Self> {
        name.parse()
    }
}

impl From<SensorKind> for String {
    fn from(kind: SensorKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A constructed sensor of either kind.
pub enum Sensor {
    /// See [`DummySensor`].
    Dummy(DummySensor),
    /// See [`Tc74Sensor`].
    Tc74(Tc74Sensor<I2cdev>),
}

impl Sensor {
    /// The kind of this sensor.
    pub fn kind(&self) -> SensorKind {
        match self {
            Self::Dummy(_) => SensorKind::Dummy,
            Self::Tc74(_) => SensorKind::Tc74,
        }
    }
}

impl TemperatureSensor for Sensor {
    fn read(&mut self) -> Result<i32> {
        match self {
            Self::Dummy(sensor) => sensor.read(),
            Self::Tc74(sensor) => sensor.read(),
        }
    }
}

/// Build a sensor of the requested kind.
///
/// For [`SensorKind::Tc74`] this opens `/dev/i2c-{i2c_bus}` and selects the
/// temperature register of the chip at `address`.
///
/// # Errors
///
/// Returns [`Error::I2c`] if the bus cannot be opened or the chip does not
/// acknowledge.
pub fn create_sensor(kind: SensorKind, i2c_bus: u8, address: u8) -> Result<Sensor> {
    let sensor = match kind {
        SensorKind::Dummy => Sensor::Dummy(DummySensor::new()),
        SensorKind::Tc74 => {
            let device = format!("/dev/i2c-{}", i2c_bus);
            let i2c = I2cdev::new(&device).map_err(|e| Error::I2c {
                reason: format!("{}: {}", device, e),
            })?;
            Sensor::Tc74(Tc74Sensor::new(i2c, address)?)
        }
    };

    info!("Created {} temperature sensor", kind);

    Ok(sensor)
}
