//! Transition duration.

use serde::{Deserialize, Serialize};

use crate::units;

/// Duration of the next applied change, in milliseconds.
///
/// The bulb only accepts whole seconds, see [`Transition::device_seconds`].
#[derive(Default, Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(transparent)]
pub struct Transition {
    pub(crate) millis: u32,
}

impl Transition {
    /// Create a transition, clamping negative durations to zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use lifx_bridge::Transition;
    ///
    /// assert_eq!(Transition::from_millis(2000).millis(), 2000);
    /// assert_eq!(Transition::from_millis(-5).millis(), 0);
    /// ```
    pub fn from_millis(millis: i64) -> Self {
        Transition {
            millis: millis.clamp(0, i64::from(u32::MAX)) as u32,
        }
    }

    pub fn millis(&self) -> u32 {
        self.millis
    }

    /// Whole seconds as sent to the bulb; 999ms rounds down to 0.
    pub fn device_seconds(&self) -> u32 {
        units::to_device_transition_seconds(i64::from(self.millis))
    }
}
