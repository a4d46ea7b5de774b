//! Device-side command and state report.

use serde::{Deserialize, Serialize};

/// A command to send to a LIFX bulb, in device units.
///
/// Only the color fields of the active color mode are present: `hue` and
/// `saturation` in hue mode, `kelvin` in temperature mode. Absent fields are
/// omitted when serialized.
///
/// # Examples
///
/// ```
/// use lifx_bridge::{ColorParams, LightState};
///
/// let mut state = LightState::new();
/// state.set_brightness(1.0);
/// state.set_color("temperature", &ColorParams::temperature(4000.0)).unwrap();
///
/// let command = state.device_command();
/// assert_eq!(command.brightness(), 65535);
/// assert_eq!(command.kelvin(), Some(4000));
/// assert_eq!(command.hue(), None);
/// assert_eq!(command.hsbk(), (0, 0, 65535, 4000));
/// ```
#[serde_with::skip_serializing_none]
#[derive(Default, Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct DeviceCommand {
    pub(crate) power: bool,
    pub(crate) brightness: u16,
    pub(crate) hue: Option<u16>,
    pub(crate) saturation: Option<u16>,
    pub(crate) kelvin: Option<u16>,
    #[serde(rename = "duration")]
    pub(crate) transition_secs: u32,
}

impl DeviceCommand {
    /// Whether the bulb should be emitting light.
    pub fn power(&self) -> bool {
        self.power
    }

    pub fn brightness(&self) -> u16 {
        self.brightness
    }

    pub fn hue(&self) -> Option<u16> {
        self.hue
    }

    pub fn saturation(&self) -> Option<u16> {
        self.saturation
    }

    pub fn kelvin(&self) -> Option<u16> {
        self.kelvin
    }

    /// Transition duration in whole seconds.
    pub fn transition_secs(&self) -> u32 {
        self.transition_secs
    }

    /// The hue, saturation, brightness and kelvin words of a LIFX color message.
    ///
    /// Fields of the inactive color mode are sent as zero.
    pub fn hsbk(&self) -> (u16, u16, u16, u16) {
        (
            self.hue.unwrap_or(0),
            self.saturation.unwrap_or(0),
            self.brightness,
            self.kelvin.unwrap_or(0),
        )
    }
}

/// A state notification pushed by a bulb, in LIFX HSBK units.
///
/// A bulb with zero saturation is showing white light and is reported in
/// temperature mode.
#[derive(Default, Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct DeviceReport {
    /// Zero when off; LIFX bulbs report 65535 when on.
    pub power: u16,
    pub hue: u16,
    pub saturation: u16,
    pub brightness: u16,
    pub kelvin: u16,
}

impl DeviceReport {
    pub fn is_on(&self) -> bool {
        self.power > 0
    }

    pub fn is_white(&self) -> bool {
        self.saturation == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialize_omits_inactive_mode() {
        let command = DeviceCommand {
            power: true,
            brightness: 100,
            hue: Some(10),
            saturation: Some(20),
            kelvin: None,
            transition_secs: 2,
        };
        assert_eq!(
            serde_json::to_value(&command).unwrap(),
            json!({"power": true, "brightness": 100, "hue": 10, "saturation": 20, "duration": 2})
        );
    }

    #[test]
    fn test_report_flags() {
        let report = DeviceReport {
            power: 65535,
            saturation: 0,
            kelvin: 2700,
            ..Default::default()
        };
        assert!(report.is_on());
        assert!(report.is_white());
    }
}
