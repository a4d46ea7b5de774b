//! Bridge configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, serde_as};

use crate::errors::Error;
use crate::history::MessageHistory;

type Result<T> = std::result::Result<T, Error>;

const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_millis(2000);

fn default_command_timeout() -> Option<Duration> {
    Some(DEFAULT_COMMAND_TIMEOUT)
}

/// Settings shared by every bulb session.
///
/// Every field may be omitted from the JSON. A `null` `commandTimeout`
/// disables the timeout.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use lifx_bridge::BridgeConfig;
///
/// let config = BridgeConfig::from_json(r#"{"commandTimeout": 500}"#).unwrap();
/// assert_eq!(config.command_timeout, Some(Duration::from_millis(500)));
/// assert_eq!(config.history_size, 100);
/// ```
#[serde_as]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeConfig {
    /// Upper bound on a single device call.
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    #[serde(default = "default_command_timeout")]
    pub command_timeout: Option<Duration>,
    /// Entries kept in each session's message history.
    pub history_size: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            command_timeout: default_command_timeout(),
            history_size: MessageHistory::DEFAULT_MAX_ENTRIES,
        }
    }
}

impl BridgeConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(Error::JsonLoad)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(Error::JsonLoad)
    }

    pub fn with_command_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn with_history_size(mut self, size: usize) -> Self {
        self.history_size = size;
        self
    }
}
