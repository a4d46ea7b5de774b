/// All error types that can occur while bridging bus commands to a bulb.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A command payload lacks a key required by the command or color mode.
    #[error("missing field `{field}` in {context} payload")]
    MissingField { context: String, field: String },

    /// A payload key is present but holds a value of the wrong shape.
    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: String, reason: String },

    /// The color mode is `xy` (not supported by the bulb protocol) or unknown.
    #[error("unsupported color mode {0:?}")]
    UnsupportedMode(String),

    /// The dispatcher received a command name it has no mapping for.
    #[error("unknown command {0:?}")]
    UnknownCommand(String),

    /// The bulb client failed to deliver a device command, or timed out.
    #[error("device {address} communication error: {err:?}")]
    DeviceCommunication { address: String, err: std::io::Error },

    /// Failed to deserialize JSON data.
    #[error("failed to load json: {0:?}")]
    JsonLoad(serde_json::Error),
}

impl Error {
    /// Create a new missing field error
    pub fn missing_field(context: &str, field: &str) -> Self {
        Error::MissingField {
            context: context.to_string(),
            field: field.to_string(),
        }
    }

    /// Create a new invalid field error
    pub fn invalid_field(field: &str, reason: impl ToString) -> Self {
        Error::InvalidField {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a new device communication error
    pub fn device(address: &str, err: std::io::Error) -> Self {
        Error::DeviceCommunication {
            address: address.to_string(),
            err,
        }
    }

    /// Whether the error came from the bulb client rather than the command itself.
    pub fn is_device_error(&self) -> bool {
        matches!(self, Error::DeviceCommunication { .. })
    }
}

/// Hacky implementation of PartialEq for testing
#[cfg(test)]
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}
