//! # lifx_bridge
//!
//! The core of a bridge between a home-automation message bus and LIFX bulbs.
//!
//! Bus commands arrive as a name (or a channel and method) plus an untyped
//! JSON payload. They are validated, merged into the bulb's desired
//! [`LightState`] and, unless a batch is open, materialized as one
//! [`DeviceCommand`] in LIFX device units. After the bulb accepts the command
//! the state is echoed back to the bus as a [`BusEvent`].
//!
//! The library is **runtime-agnostic**. It does not talk to the network
//! itself: the bulb is reached through a [`BulbClient`] and the bus through an
//! [`EventSink`], both supplied by the caller.
//!
//! ## Quick Start
//!
//! ```
//! use serde_json::json;
//! use lifx_bridge::Dispatcher;
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.start_batch();
//! dispatcher.dispatch("setBrightness", &json!([0.5])).unwrap();
//! dispatcher
//!     .dispatch("setColor", &json!({"mode": "hue", "hue": 0.2, "saturation": 0.9}))
//!     .unwrap();
//!
//! // one device command carrying both changes
//! let outcome = dispatcher.end_batch();
//! let command = outcome.command.unwrap();
//! assert_eq!(command.brightness(), 32768);
//! assert_eq!(command.hue(), Some(13107));
//! assert_eq!(command.kelvin(), None);
//! ```
//!
//! ## Units
//!
//! Brightness, hue and saturation are normalized to `[0, 1]` on the bus and
//! scaled to `0..=65535` for the bulb. Color temperature is in Kelvin, clamped
//! to 1500-9000. Transitions are milliseconds on the bus and whole seconds on
//! the bulb. See [`units`].
//!
//! ## Runtime Selection
//!
//! ### Using tokio (default)
//!
//! ```toml
//! [dependencies]
//! lifx-bridge = "0.1"
//! ```
//!
//! ### Using async-std
//!
//! ```toml
//! [dependencies]
//! lifx-bridge = { version = "0.1", default-features = false, features = ["runtime-async-std"] }
//! ```
//!
//! ### Using smol
//!
//! ```toml
//! [dependencies]
//! lifx-bridge = { version = "0.1", default-features = false, features = ["runtime-smol"] }
//! ```
//!
//! ## Feature Flags
//!
//! - `runtime-tokio` (default): Use the tokio async runtime
//! - `runtime-async-std`: Use the async-std runtime
//! - `runtime-smol`: Use the smol runtime

mod batch;
mod channel;
mod command;
mod config;
mod dispatch;
mod echo;
mod errors;
mod history;
mod registry;
pub mod runtime;
mod session;
mod state;
mod types;
pub mod units;

// Re-export public API
pub use batch::{BatchCoordinator, BatchPhase, BatchSession, DirtyFields, Field};
pub use channel::Channel;
pub use command::{DeviceCommand, DeviceReport};
pub use config::BridgeConfig;
pub use dispatch::{BatchRequest, Command, CommandName, Dispatcher, Outcome};
pub use echo::{BusEvent, EventPayload, StatePayload, to_event_payload};
pub use errors::Error;
pub use history::{HistoryEntry, HistorySummary, MessageHistory, MessageType};
pub use registry::{BulbRegistry, DiscoveredBulb};
pub use session::{BulbClient, BulbSession, EventSink};
pub use state::{ColorChange, ColorMemory, LightState};
pub use types::{ColorMode, ColorModeName, ColorParams, Kelvin, Level, Transition};
