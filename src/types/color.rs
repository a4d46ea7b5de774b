//! Color modes and the color command parameters.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use super::{Kelvin, Level};
use crate::errors::Error;

type Result<T> = std::result::Result<T, Error>;

/// Color mode names as they appear in the `mode` field of a color payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ColorModeName {
    Hue,
    Temperature,
    /// CIE xy chromaticity. Parsed so it can be reported, never applied.
    Xy,
}

/// The active color of a light.
///
/// Exactly one mode is active at a time, so hue/saturation and color
/// temperature can never be set together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ColorMode {
    Hue { hue: Level, saturation: Level },
    Temperature { kelvin: Kelvin },
}

impl Default for ColorMode {
    fn default() -> Self {
        ColorMode::Hue {
            hue: Level::MIN,
            saturation: Level::MIN,
        }
    }
}

impl ColorMode {
    pub fn name(&self) -> ColorModeName {
        match self {
            ColorMode::Hue { .. } => ColorModeName::Hue,
            ColorMode::Temperature { .. } => ColorModeName::Temperature,
        }
    }

    /// Build the color selected by `mode` from the payload parameters.
    ///
    /// # Examples
    ///
    /// ```
    /// use lifx_bridge::{ColorMode, ColorParams, Kelvin};
    ///
    /// let color = ColorMode::resolve("temperature", &ColorParams::temperature(2700.0)).unwrap();
    /// assert_eq!(color, ColorMode::Temperature { kelvin: Kelvin::create(2700).unwrap() });
    ///
    /// assert!(ColorMode::resolve("hue", &ColorParams::temperature(2700.0)).is_err());
    /// assert!(ColorMode::resolve("xy", &ColorParams::default()).is_err());
    /// ```
    pub fn resolve(mode: &str, params: &ColorParams) -> Result<Self> {
        let name = ColorModeName::from_str(mode)
            .map_err(|_| Error::UnsupportedMode(mode.to_string()))?;

        match name {
            ColorModeName::Hue => {
                let hue = params
                    .hue
                    .ok_or_else(|| Error::missing_field("hue color", "hue"))?;
                let saturation = params
                    .saturation
                    .ok_or_else(|| Error::missing_field("hue color", "saturation"))?;
                Ok(ColorMode::Hue {
                    hue: Level::new(hue),
                    saturation: Level::new(saturation),
                })
            }
            ColorModeName::Temperature => {
                let temperature = params
                    .temperature
                    .ok_or_else(|| Error::missing_field("temperature color", "temperature"))?;
                Ok(ColorMode::Temperature {
                    kelvin: Kelvin::clamped(temperature),
                })
            }
            ColorModeName::Xy => Err(Error::UnsupportedMode(name.to_string())),
        }
    }
}

/// Parameters of a color command, as received on the color channel.
///
/// Which fields are required depends on `mode`; see [`ColorMode::resolve`].
#[serde_with::skip_serializing_none]
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorParams {
    pub mode: Option<String>,
    pub hue: Option<f64>,
    pub saturation: Option<f64>,
    pub temperature: Option<f64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    /// Milliseconds.
    pub transition: Option<i64>,
}

impl ColorParams {
    /// Hue mode parameters.
    pub fn hue(hue: f64, saturation: f64) -> Self {
        ColorParams {
            mode: Some(ColorModeName::Hue.to_string()),
            hue: Some(hue),
            saturation: Some(saturation),
            ..Default::default()
        }
    }

    /// Temperature mode parameters, in Kelvin.
    pub fn temperature(temperature: f64) -> Self {
        ColorParams {
            mode: Some(ColorModeName::Temperature.to_string()),
            temperature: Some(temperature),
            ..Default::default()
        }
    }

    /// CIE xy parameters.
    pub fn xy(x: f64, y: f64) -> Self {
        ColorParams {
            mode: Some(ColorModeName::Xy.to_string()),
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }

    pub fn with_transition(mut self, millis: i64) -> Self {
        self.transition = Some(millis);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_hue_requires_both_fields() {
        let params = ColorParams {
            hue: Some(0.3),
            ..Default::default()
        };
        assert_eq!(
            ColorMode::resolve("hue", &params).unwrap_err(),
            Error::missing_field("hue color", "saturation")
        );
    }

    #[test]
    fn test_resolve_clamps_values() {
        let color = ColorMode::resolve("hue", &ColorParams::hue(1.4, -1.0)).unwrap();
        assert_eq!(
            color,
            ColorMode::Hue {
                hue: Level::MAX,
                saturation: Level::MIN
            }
        );
    }

    #[test]
    fn test_resolve_unknown_mode() {
        assert_eq!(
            ColorMode::resolve("rgb", &ColorParams::default()).unwrap_err(),
            Error::UnsupportedMode("rgb".into())
        );
        assert_eq!(
            ColorMode::resolve("xy", &ColorParams::xy(0.3, 0.4)).unwrap_err(),
            Error::UnsupportedMode("xy".into())
        );
    }

    #[test]
    fn test_params_from_json() {
        let params: ColorParams = serde_json::from_str(
            r#"{"mode": "hue", "hue": 0.2, "saturation": 0.9, "transition": 1500}"#,
        )
        .unwrap();
        assert_eq!(params, ColorParams::hue(0.2, 0.9).with_transition(1500));
    }
}
