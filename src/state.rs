//! Desired state of a single bulb.

use serde::{Deserialize, Serialize};

use crate::command::{DeviceCommand, DeviceReport};
use crate::errors::Error;
use crate::types::{ColorMode, ColorParams, Kelvin, Level, Transition};
use crate::units;

type Result<T> = std::result::Result<T, Error>;

/// A validated color command: the new color plus an optional transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorChange {
    pub color: ColorMode,
    pub transition: Option<Transition>,
}

impl ColorChange {
    /// Validate `params` for `mode` without touching any state.
    pub fn resolve(mode: &str, params: &ColorParams) -> Result<Self> {
        Ok(ColorChange {
            color: ColorMode::resolve(mode, params)?,
            transition: params.transition.map(Transition::from_millis),
        })
    }
}

/// Last known values of each color mode, kept across mode switches.
///
/// Never used to build a device command or a bus event; those follow the
/// active [`ColorMode`] only.
#[serde_with::skip_serializing_none]
#[derive(Default, Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct ColorMemory {
    hue: Option<(Level, Level)>,
    kelvin: Option<Kelvin>,
}

impl ColorMemory {
    fn remember(&mut self, color: &ColorMode) {
        match *color {
            ColorMode::Hue { hue, saturation } => self.hue = Some((hue, saturation)),
            ColorMode::Temperature { kelvin } => self.kelvin = Some(kelvin),
        }
    }
}

/// The desired attributes of one bulb.
///
/// Attribute updates arrive independently and are merged here; the result is
/// materialized as one [`DeviceCommand`] by [`LightState::device_command`].
///
/// # Example
///
/// ```
/// use lifx_bridge::{ColorMode, ColorParams, LightState};
///
/// let mut state = LightState::new();
/// assert!(!state.on());
///
/// state.set_color("hue", &ColorParams::hue(0.2, 0.9)).unwrap();
/// assert!(state.on());
/// assert!(matches!(state.color(), ColorMode::Hue { .. }));
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LightState {
    on: bool,
    brightness: Level,
    color: ColorMode,
    transition: Transition,
    memory: ColorMemory,
}

impl Default for LightState {
    fn default() -> Self {
        Self::new()
    }
}

impl LightState {
    /// Create a light that is off, at zero brightness, in hue mode with zero
    /// hue and saturation and no transition.
    pub fn new() -> Self {
        let color = ColorMode::default();
        let mut memory = ColorMemory::default();
        memory.remember(&color);
        LightState {
            on: false,
            brightness: Level::MIN,
            color,
            transition: Transition::default(),
            memory,
        }
    }

    pub fn on(&self) -> bool {
        self.on
    }

    pub fn brightness(&self) -> Level {
        self.brightness
    }

    pub fn color(&self) -> &ColorMode {
        &self.color
    }

    pub fn transition(&self) -> Transition {
        self.transition
    }

    /// Last hue and saturation set, even if temperature mode is now active.
    pub fn last_hue(&self) -> Option<(Level, Level)> {
        self.memory.hue
    }

    /// Last color temperature set, even if hue mode is now active.
    pub fn last_kelvin(&self) -> Option<Kelvin> {
        self.memory.kelvin
    }

    pub fn set_on_off(&mut self, on: bool) {
        self.on = on;
    }

    /// Set the brightness, clamping to `[0, 1]`. The color is not affected.
    pub fn set_brightness(&mut self, brightness: f64) {
        self.brightness = Level::new(brightness);
    }

    pub fn set_transition(&mut self, millis: i64) {
        self.transition = Transition::from_millis(millis);
    }

    /// Switch to the color mode named `mode` using the payload parameters.
    ///
    /// A `transition` in `params` is applied before the color. Hue mode also
    /// turns the light on. On error nothing is changed, the transition
    /// included.
    ///
    /// # Examples
    ///
    /// ```
    /// use lifx_bridge::{ColorParams, LightState};
    ///
    /// let mut state = LightState::new();
    /// let before = state.clone();
    /// assert!(state.set_color("xy", &ColorParams::xy(0.3, 0.4)).is_err());
    /// assert_eq!(state, before);
    /// ```
    pub fn set_color(&mut self, mode: &str, params: &ColorParams) -> Result<()> {
        let change = ColorChange::resolve(mode, params)?;
        self.apply_color(&change);
        Ok(())
    }

    /// Apply an already validated color change.
    pub fn apply_color(&mut self, change: &ColorChange) {
        if let Some(transition) = change.transition {
            self.transition = transition;
        }
        if matches!(change.color, ColorMode::Hue { .. }) {
            self.on = true;
        }
        self.color = change.color;
        self.memory.remember(&change.color);
    }

    /// Materialize the state as a device command.
    pub fn device_command(&self) -> DeviceCommand {
        let mut command = DeviceCommand {
            power: self.on,
            brightness: units::to_device_brightness(self.brightness.value()),
            transition_secs: self.transition.device_seconds(),
            ..Default::default()
        };

        match self.color {
            ColorMode::Hue { hue, saturation } => {
                command.hue = Some(units::to_device_hue(hue.value()));
                command.saturation = Some(units::to_device_saturation(saturation.value()));
            }
            ColorMode::Temperature { kelvin } => {
                command.kelvin = Some(kelvin.kelvin());
            }
        }
        command
    }

    /// Update the state from a notification pushed by the bulb.
    ///
    /// The transition is left untouched since bulbs do not report it.
    ///
    /// # Examples
    ///
    /// ```
    /// use lifx_bridge::{ColorMode, DeviceReport, Kelvin, LightState};
    ///
    /// let mut state = LightState::new();
    /// state.sync_from_device(&DeviceReport {
    ///     power: 65535,
    ///     brightness: 65535,
    ///     saturation: 0,
    ///     kelvin: 2700,
    ///     ..Default::default()
    /// });
    /// assert!(state.on());
    /// assert_eq!(state.color(), &ColorMode::Temperature { kelvin: Kelvin::create(2700).unwrap() });
    /// ```
    pub fn sync_from_device(&mut self, report: &DeviceReport) {
        self.on = report.is_on();
        self.brightness = Level::from_device(report.brightness);
        self.color = if report.is_white() {
            ColorMode::Temperature {
                kelvin: Kelvin::clamped(f64::from(report.kelvin)),
            }
        } else {
            ColorMode::Hue {
                hue: Level::from_device(report.hue),
                saturation: Level::from_device(report.saturation),
            }
        };
        self.memory.remember(&self.color);
    }
}
