//! Temperature thresholds and alarm levels.
//!
//! A reading maps to one of three alarm levels. The level is only reported
//! when it differs from the last known one, so a steady temperature produces
//! no command traffic.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::error::{Error, Result};

/// Alarm level written to the actuator's Alert Level characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum AlarmLevel {
    /// No alert.
    #[default]
    Off = 0,
    /// Mild alert.
    Warning = 1,
    /// High alert.
    Critical = 2,
}

impl AlarmLevel {
    /// Level for a reading using the default thresholds.
    pub fn from_temperature(celsius: i32) -> Self {
        Thresholds::default().level_for(celsius)
    }

    /// Wire value.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// The next level in the Off → Warning → Critical → Off cycle.
    pub fn next(self) -> Self {
        match self {
            Self::Off => Self::Warning,
            Self::Warning => Self::Critical,
            Self::Critical => Self::Off,
        }
    }
}

impl TryFrom<u8> for AlarmLevel {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Off),
            1 => Ok(Self::Warning),
            2 => Ok(Self::Critical),
            other => Err(Error::InvalidParameter {
                name: "alarm".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl From<AlarmLevel> for u8 {
    fn from(level: AlarmLevel) -> Self {
        level.as_u8()
    }
}

impl fmt::Display for AlarmLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => write!(f, "Off"),
            Self::Warning => write!(f, "Warning"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

/// The two temperature thresholds, in °C.
///
/// A reading equal to a threshold resolves to the lower level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Thresholds {
    /// Above this: [`AlarmLevel::Warning`].
    pub warning: i32,
    /// Above this: [`AlarmLevel::Critical`].
    pub critical: i32,
}

impl Thresholds {
    /// Default warning threshold.
    pub const DEFAULT_WARNING: i32 = 40;
    /// Default critical threshold.
    pub const DEFAULT_CRITICAL: i32 = 45;

    /// Validate that `warning <= critical`.
    pub fn new(warning: i32, critical: i32) -> Result<Self> {
        if warning > critical {
            return Err(Error::InvalidParameter {
                name: "thresholds".to_string(),
                value: format!("warning {} > critical {}", warning, critical),
            });
        }
        Ok(Self { warning, critical })
    }

    /// Map a reading to a level.
    pub fn level_for(&self, celsius: i32) -> AlarmLevel {
        if celsius > self.critical {
            AlarmLevel::Critical
        } else if celsius > self.warning {
            AlarmLevel::Warning
        } else {
            AlarmLevel::Off
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            warning: Self::DEFAULT_WARNING,
            critical: Self::DEFAULT_CRITICAL,
        }
    }
}

/// Edge-triggered alarm state.
#[derive(Debug, Clone, Default)]
pub struct AlarmTracker {
    thresholds: Thresholds,
    current: AlarmLevel,
}

impl AlarmTracker {
    /// Start at [`AlarmLevel::Off`].
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            current: AlarmLevel::Off,
        }
    }

    /// Last known level.
    pub fn current(&self) -> AlarmLevel {
        self.current
    }

    /// Thresholds in use.
    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Feed a reading. Returns the new level if it changed.
    pub fn update(&mut self, celsius: i32) -> Option<AlarmLevel> {
        let desired = self.thresholds.level_for(celsius);
        if desired == self.current {
            return None;
        }

        debug!("Alarm level {} -> {} at {} C", self.current, desired, celsius);
        self.current = desired;
        Some(desired)
    }

    /// Record the level the actuator reports it is at.
    pub fn observe(&mut self, level: AlarmLevel) {
        self.current = level;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_boundaries_resolve_low() {
        assert_eq!(AlarmLevel::from_temperature(40), AlarmLevel::Off);
        assert_eq!(AlarmLevel::from_temperature(41), AlarmLevel::Warning);
        assert_eq!(AlarmLevel::from_temperature(45), AlarmLevel::Warning);
        assert_eq!(AlarmLevel::from_temperature(46), AlarmLevel::Critical);
    }

    #[test]
    fn test_publishes_on_change_only() {
        // Readings mapping to levels [0, 0, 1, 1, 2, 0].
        let readings = [20, 35, 42, 44, 60, 10];
        let mut tracker = AlarmTracker::default();

        let changes: Vec<AlarmLevel> = readings
            .iter()
            .filter_map(|&t| tracker.update(t))
            .collect();

        assert_eq!(
            changes,
            vec![AlarmLevel::Warning, AlarmLevel::Critical, AlarmLevel::Off]
        );
    }

    #[test]
    fn test_observe_suppresses_repeat() {
        let mut tracker = AlarmTracker::default();
        tracker.observe(AlarmLevel::Critical);
        assert_eq!(tracker.update(50), None);
        assert_eq!(tracker.update(30), Some(AlarmLevel::Off));
    }

    #[test]
    fn test_level_from_wire() {
        assert_eq!(AlarmLevel::try_from(2).unwrap(), AlarmLevel::Critical);
        assert!(AlarmLevel::try_from(3).is_err());
        assert_eq!(u8::from(AlarmLevel::Warning), 1);
    }

    #[test]
    fn test_cycle() {
        assert_eq!(AlarmLevel::Off.next(), AlarmLevel::Warning);
        assert_eq!(AlarmLevel::Critical.next(), AlarmLevel::Off);
    }

    #[test]
    fn test_invalid_thresholds() {
        assert!(Thresholds::new(50, 45).is_err());
        assert!(Thresholds::new(45, 45).is_ok());
    }

    proptest! {
        #[test]
        fn prop_levels_partition(t in -55i32..=150) {
            let level = AlarmLevel::from_temperature(t);
            let expected = if t <= 40 {
                AlarmLevel::Off
            } else if t <= 45 {
                AlarmLevel::Warning
            } else {
                AlarmLevel::Critical
            };
            prop_assert_eq!(level, expected);
        }

        #[test]
        fn prop_publish_count_matches_transitions(readings in proptest::collection::vec(-20i32..80, 0..50)) {
            let mut tracker = AlarmTracker::default();
            let published = readings.iter().filter(|&&t| tracker.update(t).is_some()).count();

            let mut levels = vec![AlarmLevel::Off];
            levels.extend(readings.iter().map(|&t| AlarmLevel::from_temperature(t)));
            let transitions = levels.windows(2).filter(|w| w[0] != w[1]).count();

            prop_assert_eq!(published, transitions);
        }
    }
}
