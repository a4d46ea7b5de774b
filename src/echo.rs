//! State events sent back to the bus.

use serde::{Deserialize, Serialize};

use crate::channel::Channel;
use crate::state::LightState;
use crate::types::{ColorMode, ColorModeName};

/// The light state as published on the bus.
///
/// Only the active color mode's fields are populated: `hue` and `sat` in hue
/// mode, `ct` in temperature mode. Unset fields are omitted from the JSON.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatePayload {
    pub on: bool,
    #[serde(rename = "bri")]
    pub brightness: f64,
    pub mode: ColorModeName,
    pub hue: Option<f64>,
    #[serde(rename = "sat")]
    pub saturation: Option<f64>,
    /// Kelvin.
    #[serde(rename = "ct")]
    pub color_temperature: Option<u16>,
    #[serde(rename = "transitionMillis")]
    pub transition_millis: u32,
}

/// Convert a light state into its bus payload.
///
/// # Examples
///
/// ```
/// use lifx_bridge::{ColorParams, LightState, to_event_payload};
///
/// let mut state = LightState::new();
/// state.set_color("temperature", &ColorParams::temperature(4000.0)).unwrap();
///
/// let payload = to_event_payload(&state);
/// assert_eq!(payload.color_temperature, Some(4000));
/// assert!(payload.hue.is_none() && payload.saturation.is_none());
/// ```
pub fn to_event_payload(state: &LightState) -> StatePayload {
    let mut payload = StatePayload {
        on: state.on(),
        brightness: state.brightness().value(),
        mode: state.color().name(),
        hue: None,
        saturation: None,
        color_temperature: None,
        transition_millis: state.transition().millis(),
    };

    match *state.color() {
        ColorMode::Hue { hue, saturation } => {
            payload.hue = Some(hue.value());
            payload.saturation = Some(saturation.value());
        }
        ColorMode::Temperature { kelvin } => {
            payload.color_temperature = Some(kelvin.kelvin());
        }
    }
    payload
}

impl From<&LightState> for StatePayload {
    fn from(state: &LightState) -> Self {
        to_event_payload(state)
    }
}

/// Payload of a bus event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventPayload {
    Light(StatePayload),
    /// Ambient light in lux.
    Illuminance(f64),
}

/// An event to publish on one of a bulb's channels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusEvent {
    pub channel: Channel,
    pub event: &'static str,
    pub payload: EventPayload,
}

impl BusEvent {
    /// A `state` event carrying the light state.
    pub fn state(channel: Channel, state: &LightState) -> Self {
        BusEvent {
            channel,
            event: Channel::STATE_EVENT,
            payload: EventPayload::Light(to_event_payload(state)),
        }
    }

    /// A `state` event on the illuminance channel.
    pub fn illuminance(lux: f64) -> Self {
        BusEvent {
            channel: Channel::Illuminance,
            event: Channel::STATE_EVENT,
            payload: EventPayload::Illuminance(lux),
        }
    }

    /// The light payload, if this is a light state event.
    pub fn light(&self) -> Option<&StatePayload> {
        match &self.payload {
            EventPayload::Light(payload) => Some(payload),
            EventPayload::Illuminance(_) => None,
        }
    }
}
