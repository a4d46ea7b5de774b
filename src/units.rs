//! Conversions between normalized bus units and LIFX device units.
//!
//! The bus speaks normalized floats (0.0 to 1.0) and milliseconds. The bulb
//! speaks 16-bit HSBK integers, whole-second durations and Kelvin. Every
//! conversion here is total: out-of-range inputs clamp to the nearest bound
//! and `NaN` clamps to the lower bound.
//!
//! Float to integer conversions round half away from zero.

/// Lowest color temperature accepted by the bulb.
pub const MIN_KELVIN: u16 = 1500;
/// Highest color temperature accepted by the bulb.
pub const MAX_KELVIN: u16 = 9000;

/// Clamp a normalized value to `[0, 1]`, mapping `NaN` to `0`.
pub fn clamp_level(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn to_device_level(value: f64) -> u16 {
    (clamp_level(value) * f64::from(u16::MAX)).round() as u16
}

/// Scale a normalized brightness to the full 16-bit device range.
///
/// # Examples
///
/// ```
/// use lifx_bridge::units::to_device_brightness;
///
/// assert_eq!(to_device_brightness(0.0), 0);
/// assert_eq!(to_device_brightness(0.75), 49151);
/// assert_eq!(to_device_brightness(1.0), 65535);
/// assert_eq!(to_device_brightness(7.0), 65535);
/// ```
pub fn to_device_brightness(brightness: f64) -> u16 {
    to_device_level(brightness)
}

/// Scale a normalized hue (one full turn of the color wheel) to 16 bits.
pub fn to_device_hue(hue: f64) -> u16 {
    to_device_level(hue)
}

/// Scale a normalized saturation to 16 bits.
pub fn to_device_saturation(saturation: f64) -> u16 {
    to_device_level(saturation)
}

/// Convert a color temperature to the device's Kelvin field.
///
/// The input is read as Kelvin directly. Some older bus clients sent the
/// value through a mired conversion (`1_000_000 / temperature`); that form is
/// not accepted here.
///
/// # Examples
///
/// ```
/// use lifx_bridge::units::to_device_kelvin;
///
/// assert_eq!(to_device_kelvin(4000.0), 4000);
/// assert_eq!(to_device_kelvin(250.0), 1500);
/// assert_eq!(to_device_kelvin(20_000.0), 9000);
/// ```
pub fn to_device_kelvin(temperature: f64) -> u16 {
    if temperature.is_nan() {
        return MIN_KELVIN;
    }
    temperature
        .round()
        .clamp(f64::from(MIN_KELVIN), f64::from(MAX_KELVIN)) as u16
}

/// Convert a transition in milliseconds to the device's whole seconds.
///
/// Sub-second remainders are dropped, so anything under 1000ms becomes an
/// instant change. Negative durations clamp to zero.
///
/// # Examples
///
/// ```
/// use lifx_bridge::units::to_device_transition_seconds;
///
/// assert_eq!(to_device_transition_seconds(999), 0);
/// assert_eq!(to_device_transition_seconds(1500), 1);
/// assert_eq!(to_device_transition_seconds(-20), 0);
/// ```
pub fn to_device_transition_seconds(millis: i64) -> u32 {
    (millis.max(0) / 1000).min(i64::from(u32::MAX)) as u32
}

/// Scale a 16-bit device level (brightness, hue or saturation) back to `[0, 1]`.
pub fn from_device_level(value: u16) -> f64 {
    f64::from(value) / f64::from(u16::MAX)
}
