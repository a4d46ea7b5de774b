//! Value types for light control parameters.

mod color;
mod kelvin;
mod level;
mod transition;

pub use color::{ColorMode, ColorModeName, ColorParams};
pub use kelvin::Kelvin;
pub use level::Level;
pub use transition::Transition;
