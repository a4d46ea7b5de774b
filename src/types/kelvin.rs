//! Color temperature control.

use serde::{Deserialize, Serialize};

use crate::units::{self, MAX_KELVIN, MIN_KELVIN};

/// Color temperature in Kelvin, with valid values from 1500K to 9000K.
///
/// Lower values produce warmer (more yellow/orange) light, while higher
/// values produce cooler (more blue) light. Typical values:
/// - 2700K: Warm white (incandescent-like)
/// - 4000K: Neutral white
/// - 6500K: Daylight
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(from = "u16", into = "u16")]
pub struct Kelvin {
    pub(crate) kelvin: u16,
}

impl Kelvin {
    /// Get the kelvin value.
    pub fn kelvin(&self) -> u16 {
        self.kelvin
    }

    /// Create a new Kelvin with the given value.
    ///
    /// Returns `None` if value is outside the valid range (1500-9000).
    ///
    /// # Examples
    ///
    /// ```
    /// use lifx_bridge::Kelvin;
    ///
    /// assert!(Kelvin::create(1499).is_none());
    /// assert!(Kelvin::create(1500).is_some());
    /// assert!(Kelvin::create(9000).is_some());
    /// assert!(Kelvin::create(9001).is_none());
    /// ```
    pub fn create(kelvin: u16) -> Option<Self> {
        if (MIN_KELVIN..=MAX_KELVIN).contains(&kelvin) {
            Some(Kelvin { kelvin })
        } else {
            None
        }
    }

    /// Create a Kelvin from a bus temperature value, clamping to the valid range.
    ///
    /// # Examples
    ///
    /// ```
    /// use lifx_bridge::Kelvin;
    ///
    /// assert_eq!(Kelvin::clamped(4000.0).kelvin(), 4000);
    /// assert_eq!(Kelvin::clamped(100.0).kelvin(), 1500);
    /// ```
    pub fn clamped(temperature: f64) -> Self {
        Kelvin {
            kelvin: units::to_device_kelvin(temperature),
        }
    }
}

impl From<u16> for Kelvin {
    fn from(kelvin: u16) -> Self {
        Kelvin::clamped(f64::from(kelvin))
    }
}

impl From<Kelvin> for u16 {
    fn from(kelvin: Kelvin) -> Self {
        kelvin.kelvin
    }
}
