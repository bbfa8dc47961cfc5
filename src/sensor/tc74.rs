use embedded_hal::i2c::I2c;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::sensor::TemperatureSensor;

/// Factory default address of the TC74A2 variant used on the demo board.
pub const TC74_DEFAULT_ADDRESS: u8 = 0x4a;

/// Read Temperature (RTR) command.
const READ_TEMPERATURE: u8 = 0x00;

/// Microchip TC74 digital thermometer.
///
/// The register pointer is set to the temperature register once at
/// construction; every read afterwards is a single-byte bus read returning
/// the temperature as a two's complement value in °C.
pub struct Tc74Sensor<I> {
    i2c: I,
    address: u8,
}

impl<I: I2c> Tc74Sensor<I> {
    /// Select the temperature register of the chip at `address`.
    pub fn new(mut i2c: I, address: u8) -> Result<Self> {
        i2c.write(address, &[READ_TEMPERATURE])
            .map_err(|e| bus_error(address, e))?;

        debug!("TC74 at {:#04x} ready", address);

        Ok(Self { i2c, address })
    }

    /// Bus address of the chip.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Release the underlying bus.
    pub fn release(self) -> I {
        self.i2c
    }
}

impl<I: I2c> TemperatureSensor for Tc74Sensor<I> {
    fn read(&mut self) -> Result<i32> {
        let mut buf = [0u8; 1];
        self.i2c
            .read(self.address, &mut buf)
            .map_err(|e| bus_error(self.address, e))?;

        let celsius = i32::from(buf[0] as i8);
        trace!("TC74 raw {:#04x} = {} C", buf[0], celsius);

        Ok(celsius)
    }
}

fn bus_error<E: embedded_hal::i2c::Error>(address: u8, e: E) -> Error {
    Error::I2c {
        reason: format!("TC74 at {:#04x}: {:?}", address, e.kind()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::{ErrorKind, ErrorType, NoAcknowledgeSource, Operation};
    use std::collections::VecDeque;

    /// Bus double recording writes and serving queued read bytes.
    #[derive(Default)]
    struct ScriptedBus {
        writes: Vec<(u8, Vec<u8>)>,
        reads: VecDeque<u8>,
        present: bool,
    }

    impl ErrorType for ScriptedBus {
        type Error = ErrorKind;
    }

    impl I2c for ScriptedBus {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> std::result::Result<(), Self::Error> {
            if !self.present {
                return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
            }
            for op in operations {
                match op {
                    Operation::Write(bytes) => self.writes.push((address, bytes.to_vec())),
                    Operation::Read(buf) => {
                        for b in buf.iter_mut() {
                            *b = self.reads.pop_front().ok_or(ErrorKind::Other)?;
                        }
                    }
                }
            }
            Ok(())
        }
    }

    fn bus(reads: &[u8]) -> ScriptedBus {
        ScriptedBus {
            writes: Vec::new(),
            reads: reads.iter().copied().collect(),
            present: true,
        }
    }

    #[test]
    fn test_selects_temperature_register_once() {
        let mut sensor = Tc74Sensor::new(bus(&[25, 26]), TC74_DEFAULT_ADDRESS).unwrap();
        assert_eq!(sensor.read().unwrap(), 25);
        assert_eq!(sensor.read().unwrap(), 26);

        let bus = sensor.release();
        assert_eq!(bus.writes, vec![(TC74_DEFAULT_ADDRESS, vec![READ_TEMPERATURE])]);
    }

    #[test]
    fn test_negative_temperature() {
        let mut sensor = Tc74Sensor::new(bus(&[0xF6]), TC74_DEFAULT_ADDRESS).unwrap();
        assert_eq!(sensor.read().unwrap(), -10);
    }

    #[test]
    fn test_missing_chip() {
        let result = Tc74Sensor::new(ScriptedBus::default(), TC74_DEFAULT_ADDRESS);
        assert!(matches!(result, Err(Error::I2c { .. })));
    }
}
