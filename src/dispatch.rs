//! Parsing of bus commands and routing to the light state.

use std::str::FromStr;

use log::{debug, warn};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::batch::{BatchCoordinator, Field};
use crate::channel::Channel;
use crate::command::{DeviceCommand, DeviceReport};
use crate::echo::BusEvent;
use crate::errors::Error;
use crate::state::{ColorChange, LightState};
use crate::types::{ColorModeName, ColorParams};

type Result<T> = std::result::Result<T, Error>;

/// Names of the commands a bulb accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, EnumIter)]
#[strum(serialize_all = "camelCase")]
pub enum CommandName {
    TurnOn,
    TurnOff,
    SetOnOff,
    SetBrightness,
    SetColor,
    SetBatch,
}

impl CommandName {
    /// Map a channel method to a command name.
    ///
    /// # Examples
    ///
    /// ```
    /// use lifx_bridge::{Channel, CommandName};
    ///
    /// assert_eq!(CommandName::from_channel(Channel::OnOff, "set"), Some(CommandName::SetOnOff));
    /// assert_eq!(CommandName::from_channel(Channel::Color, "set"), Some(CommandName::SetColor));
    /// assert_eq!(CommandName::from_channel(Channel::Brightness, "turnOn"), None);
    /// ```
    pub fn from_channel(channel: Channel, method: &str) -> Option<Self> {
        match (channel, method) {
            (Channel::OnOff, "turnOn") => Some(CommandName::TurnOn),
            (Channel::OnOff, "turnOff") => Some(CommandName::TurnOff),
            (Channel::OnOff, "set") => Some(CommandName::SetOnOff),
            (Channel::Brightness, "set") => Some(CommandName::SetBrightness),
            (Channel::Color, "set") => Some(CommandName::SetColor),
            (Channel::Batching, "setBatch") => Some(CommandName::SetBatch),
            _ => None,
        }
    }

    /// Channel on which the resulting state is echoed.
    pub fn channel(&self) -> Channel {
        match self {
            CommandName::TurnOn | CommandName::TurnOff | CommandName::SetOnOff => Channel::OnOff,
            CommandName::SetBrightness => Channel::Brightness,
            CommandName::SetColor => Channel::Color,
            CommandName::SetBatch => Channel::OnOff,
        }
    }
}

/// Fields of a `setBatch` command. Absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchRequest {
    pub color: Option<ColorChange>,
    pub brightness: Option<f64>,
    pub on_off: Option<bool>,
    /// Milliseconds.
    pub transition: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct BatchParams {
    color: Option<Value>,
    brightness: Option<f64>,
    #[serde(rename = "on-off")]
    on_off: Option<bool>,
    transition: Option<i64>,
}

impl BatchRequest {
    /// Parse and validate a `setBatch` payload, either an object or a
    /// single-element array wrapping one.
    ///
    /// A `color` without a `mode` is read as hue.
    pub fn parse(payload: &Value) -> Result<Self> {
        let payload = single(payload);
        if payload.is_null() {
            return Err(Self::empty_error());
        }

        let params: BatchParams = from_object(payload, "setBatch")?;
        let color = params
            .color
            .map(|color| {
                let color: ColorParams = from_object(&color, "color")?;
                let mode = color.mode.as_deref().unwrap_or(ColorModeName::Hue.as_ref());
                ColorChange::resolve(mode, &color)
            })
            .transpose()?;

        let request = BatchRequest {
            color,
            brightness: params.brightness,
            on_off: params.on_off,
            transition: params.transition,
        };
        if request.is_empty() {
            return Err(Self::empty_error());
        }
        Ok(request)
    }

    pub fn is_empty(&self) -> bool {
        self.color.is_none()
            && self.brightness.is_none()
            && self.on_off.is_none()
            && self.transition.is_none()
    }

    fn empty_error() -> Error {
        Error::missing_field("setBatch", "color, brightness, on-off or transition")
    }
}

/// A validated command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    TurnOn,
    TurnOff,
    SetOnOff(bool),
    SetBrightness(f64),
    SetColor(ColorChange),
    SetBatch(BatchRequest),
}

impl Command {
    /// Parse a command by name.
    ///
    /// # Examples
    ///
    /// ```
    /// use serde_json::json;
    /// use lifx_bridge::Command;
    ///
    /// assert_eq!(Command::parse("setOnOff", &json!([true])).unwrap(), Command::SetOnOff(true));
    /// assert_eq!(Command::parse("setBrightness", &json!([0.4])).unwrap(), Command::SetBrightness(0.4));
    /// assert!(Command::parse("explode", &json!({})).is_err());
    /// ```
    pub fn parse(name: &str, payload: &Value) -> Result<Self> {
        let name =
            CommandName::from_str(name).map_err(|_| Error::UnknownCommand(name.to_string()))?;
        Self::parse_named(name, payload)
    }

    /// Parse a command from a channel method call.
    pub fn parse_channel(channel: &str, method: &str, payload: &Value) -> Result<Self> {
        let name = Channel::from_str(channel)
            .ok()
            .and_then(|channel| CommandName::from_channel(channel, method))
            .ok_or_else(|| Error::UnknownCommand(format!("{channel}.{method}")))?;
        Self::parse_named(name, payload)
    }

    pub fn parse_named(name: CommandName, payload: &Value) -> Result<Self> {
        match name {
            CommandName::TurnOn => Ok(Command::TurnOn),
            CommandName::TurnOff => Ok(Command::TurnOff),
            CommandName::SetOnOff => positional(payload, name)?
                .as_bool()
                .map(Command::SetOnOff)
                .ok_or_else(|| Error::invalid_field("0", "expected a boolean")),
            CommandName::SetBrightness => positional(payload, name)?
                .as_f64()
                .map(Command::SetBrightness)
                .ok_or_else(|| Error::invalid_field("0", "expected a number")),
            CommandName::SetColor => {
                let params: ColorParams = from_object(single(payload), "setColor")?;
                let mode = params
                    .mode
                    .as_deref()
                    .ok_or_else(|| Error::missing_field(name.as_ref(), "mode"))?;
                ColorChange::resolve(mode, &params).map(Command::SetColor)
            }
            CommandName::SetBatch => BatchRequest::parse(payload).map(Command::SetBatch),
        }
    }

    pub fn name(&self) -> CommandName {
        match self {
            Command::TurnOn => CommandName::TurnOn,
            Command::TurnOff => CommandName::TurnOff,
            Command::SetOnOff(_) => CommandName::SetOnOff,
            Command::SetBrightness(_) => CommandName::SetBrightness,
            Command::SetColor(_) => CommandName::SetColor,
            Command::SetBatch(_) => CommandName::SetBatch,
        }
    }
}

/// The first element of a positional payload; a bare value is accepted too.
fn positional(payload: &Value, name: CommandName) -> Result<&Value> {
    match payload {
        Value::Array(items) => items
            .first()
            .ok_or_else(|| Error::missing_field(name.as_ref(), "0")),
        Value::Null => Err(Error::missing_field(name.as_ref(), "0")),
        other => Ok(other),
    }
}

/// Unwrap a single-element array around an object payload.
fn single(payload: &Value) -> &Value {
    match payload {
        Value::Array(items) if items.len() == 1 => &items[0],
        other => other,
    }
}

/// Deserialize an object payload. Positional arrays are not accepted.
fn from_object<T: DeserializeOwned>(payload: &Value, field: &str) -> Result<T> {
    if !payload.is_object() {
        return Err(Error::invalid_field(field, "expected an object"));
    }
    T::deserialize(payload).map_err(|e| Error::invalid_field(field, e))
}

/// What a dispatched command requires from the caller.
///
/// Staged mutations produce an empty outcome. Otherwise the caller applies
/// `command` to the bulb and then publishes `event`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    pub command: Option<DeviceCommand>,
    pub event: Option<BusEvent>,
}

impl Outcome {
    fn flush(channel: Channel, state: &LightState) -> Self {
        Outcome {
            command: Some(state.device_command()),
            event: Some(BusEvent::state(channel, state)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.command.is_none() && self.event.is_none()
    }
}

/// Routes commands to the light state, consulting the batch coordinator to
/// decide whether a mutation is flushed or staged.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use lifx_bridge::Dispatcher;
///
/// let mut dispatcher = Dispatcher::new();
/// let outcome = dispatcher
///     .dispatch("setBatch", &json!({"brightness": 0.75, "on-off": true, "transition": 2000}))
///     .unwrap();
///
/// let command = outcome.command.unwrap();
/// assert_eq!(command.brightness(), 49151);
/// assert!(command.power());
/// assert_eq!(command.transition_secs(), 2);
/// assert!(outcome.event.is_some());
/// ```
#[derive(Debug, Default)]
pub struct Dispatcher {
    state: LightState,
    batch: BatchCoordinator,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: LightState) -> Self {
        Dispatcher {
            state,
            batch: BatchCoordinator::new(),
        }
    }

    pub fn state(&self) -> &LightState {
        &self.state
    }

    pub fn batch(&self) -> &BatchCoordinator {
        &self.batch
    }

    /// Parse and execute a command by name.
    ///
    /// An invalid or unknown command is rejected before anything changes.
    pub fn dispatch(&mut self, name: &str, payload: &Value) -> Result<Outcome> {
        let command = Command::parse(name, payload).inspect_err(|e| {
            warn!("rejected command {name}: {e}");
        })?;
        Ok(self.execute(command))
    }

    /// Parse and execute a channel method call.
    pub fn dispatch_channel(
        &mut self,
        channel: &str,
        method: &str,
        payload: &Value,
    ) -> Result<Outcome> {
        let command = Command::parse_channel(channel, method, payload).inspect_err(|e| {
            warn!("rejected {channel}.{method}: {e}");
        })?;
        Ok(self.execute(command))
    }

    pub fn execute(&mut self, command: Command) -> Outcome {
        debug!("executing {:?}", command);
        let channel = command.name().channel();

        match command {
            Command::TurnOn => self.mutate(Field::OnOff, channel, |s| s.set_on_off(true)),
            Command::TurnOff => self.mutate(Field::OnOff, channel, |s| s.set_on_off(false)),
            Command::SetOnOff(on) => self.mutate(Field::OnOff, channel, |s| s.set_on_off(on)),
            Command::SetBrightness(brightness) => {
                self.mutate(Field::Brightness, channel, |s| s.set_brightness(brightness))
            }
            Command::SetColor(change) => {
                self.mutate(Field::Color, channel, |s| s.apply_color(&change))
            }
            Command::SetBatch(request) => self.apply_batch(request),
        }
    }

    /// Open a batch. Returns `false` if one was already open.
    pub fn start_batch(&mut self) -> bool {
        self.batch.start_batch()
    }

    /// Close the open batch and flush it. Empty when no batch was open.
    pub fn end_batch(&mut self) -> Outcome {
        match self.batch.end_batch() {
            Some(_) => Outcome::flush(Channel::OnOff, &self.state),
            None => Outcome::default(),
        }
    }

    /// Apply a state notification from the bulb and return the echo.
    ///
    /// Ignored while a batch is open so staged values are not overwritten.
    pub fn sync_from_device(&mut self, report: &DeviceReport) -> Option<BusEvent> {
        if self.batch.is_batching() {
            debug!("ignoring device report during batch: {:?}", report);
            return None;
        }
        self.state.sync_from_device(report);
        Some(BusEvent::state(Channel::OnOff, &self.state))
    }

    fn mutate(
        &mut self,
        field: Field,
        channel: Channel,
        apply: impl FnOnce(&mut LightState),
    ) -> Outcome {
        apply(&mut self.state);
        if self.batch.stage(field) {
            Outcome::default()
        } else {
            Outcome::flush(channel, &self.state)
        }
    }

    /// Apply the fields in the order color, brightness, on-off, transition.
    ///
    /// Inside an already open batch the fields are only staged.
    fn apply_batch(&mut self, request: BatchRequest) -> Outcome {
        let opened = self.batch.start_batch();

        if let Some(change) = request.color {
            self.mutate(Field::Color, Channel::Color, |s| s.apply_color(&change));
        }
        if let Some(brightness) = request.brightness {
            self.mutate(Field::Brightness, Channel::Brightness, |s| {
                s.set_brightness(brightness)
            });
        }
        if let Some(on) = request.on_off {
            self.mutate(Field::OnOff, Channel::OnOff, |s| s.set_on_off(on));
        }
        if let Some(millis) = request.transition {
            self.mutate(Field::Transition, Channel::OnOff, |s| s.set_transition(millis));
        }

        if opened {
            self.end_batch()
        } else {
            Outcome::default()
        }
    }
}
