//! Normalized level for brightness, hue and saturation.

use serde::{Deserialize, Serialize};

use crate::units;

/// A normalized value from 0.0 to 1.0.
///
/// Out-of-range input is clamped rather than rejected, since the bus is a
/// best-effort control path.
///
/// # Examples
///
/// ```
/// use lifx_bridge::Level;
///
/// assert_eq!(Level::new(0.25).value(), 0.25);
/// assert_eq!(Level::new(1.5).value(), 1.0);
/// assert_eq!(Level::new(-3.0).value(), 0.0);
/// ```
#[derive(Default, Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(from = "f64", into = "f64")]
pub struct Level {
    value: f64,
}

impl Level {
    pub const MIN: Level = Level { value: 0.0 };
    pub const MAX: Level = Level { value: 1.0 };

    pub fn new(value: f64) -> Self {
        Level {
            value: units::clamp_level(value),
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Create a level from a 16-bit device value.
    pub fn from_device(value: u16) -> Self {
        Level::new(units::from_device_level(value))
    }
}

impl From<f64> for Level {
    fn from(value: f64) -> Self {
        Level::new(value)
    }
}

impl From<Level> for f64 {
    fn from(level: Level) -> Self {
        level.value
    }
}
