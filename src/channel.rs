//! Bus channels announced for each bulb.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// A per-bulb channel on the bus.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
/// use lifx_bridge::Channel;
///
/// assert_eq!(Channel::from_str("on-off").unwrap(), Channel::OnOff);
/// assert_eq!(Channel::Batching.to_string(), "core.batching");
/// assert_eq!(Channel::OnOff.methods(), &["turnOn", "turnOff", "set"]);
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, EnumIter, Serialize, Deserialize,
)]
pub enum Channel {
    #[strum(serialize = "on-off")]
    #[serde(rename = "on-off")]
    OnOff,
    #[strum(serialize = "brightness")]
    #[serde(rename = "brightness")]
    Brightness,
    #[strum(serialize = "color")]
    #[serde(rename = "color")]
    Color,
    #[strum(serialize = "core.batching")]
    #[serde(rename = "core.batching")]
    Batching,
    #[strum(serialize = "illuminance")]
    #[serde(rename = "illuminance")]
    Illuminance,
}

impl Channel {
    /// Name of the only event a channel emits.
    pub const STATE_EVENT: &'static str = "state";

    /// Methods the channel accepts, in the order they are announced.
    pub fn methods(&self) -> &'static [&'static str] {
        match self {
            Channel::OnOff => &["turnOn", "turnOff", "set"],
            Channel::Brightness | Channel::Color => &["set"],
            Channel::Batching => &["setBatch"],
            Channel::Illuminance => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_names_round_trip() {
        for channel in Channel::iter() {
            let name = channel.to_string();
            assert_eq!(name.parse::<Channel>().unwrap(), channel);
            assert_eq!(
                serde_json::to_value(channel).unwrap(),
                serde_json::Value::String(name)
            );
        }
    }
}
