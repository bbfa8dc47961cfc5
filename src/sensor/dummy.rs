use crate::error::Result;
use crate::sensor::TemperatureSensor;

/// Hardware-free sensor that counts upward.
///
/// Reads yield 1, 2, ..., 100, 101 and then start over at 1: a value above
/// 100 is reset to zero before the next increment.
#[derive(Debug, Clone, Default)]
pub struct DummySensor {
    value: i32,
}

impl DummySensor {
    /// Upper bound before the counter resets.
    pub const LIMIT: i32 = 100;

    /// Create a sensor whose first reading is 1.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TemperatureSensor for DummySensor {
    fn read(&mut self) -> Result<i32> {
        if self.value > Self::LIMIT {
            self.value = 0;
        }
        self.value += 1;
        Ok(self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_counts_from_one() {
        let mut sensor = DummySensor::new();
        let first: Vec<i32> = (0..5).map(|_| sensor.read().unwrap()).collect();
        assert_eq!(first, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_wrap_point() {
        let mut sensor = DummySensor::new();
        let readings: Vec<i32> = (0..104).map(|_| sensor.read().unwrap()).collect();

        assert_eq!(readings[99], 100);
        assert_eq!(readings[100], 101);
        assert_eq!(&readings[101..], &[1, 2, 3]);
        assert_eq!(readings.iter().copied().max(), Some(101));
    }
}
