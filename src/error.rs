//! Custom error types for the application.
//!
//! This module defines the primary error type, `MonitorError`, for the entire
//! application. Using the `thiserror` crate, it provides a centralized and
//! consistent way to handle the different kinds of failures the monitor can
//! hit, from configuration parsing to hardware communication.
//!
//! ## Error Categories
//!
//! - **`Config`** / **`Configuration`**: file/format errors from the `config`
//!   crate, and semantic errors that pass parsing but are logically invalid
//!   (zero sample period, empty window, out-of-range device address).
//! - **`InvalidChannel`**: a channel index outside {0, 1, 2}. This is a caller
//!   bug; the [`crate::registers::Channel`] type prevents it by construction,
//!   so the variant only surfaces from `TryFrom` conversions at the edges.
//! - **`HardwareCommunication`**: bus transport failure. Never retried — there
//!   is no recovery path for a sensor that cannot be reached, so this is
//!   expected to be fatal.
//! - **`IdentityUnavailable`**: the machine-id source is missing or empty.
//!   Fatal at startup; there is no sensible default identity.
//!
//! By using `#[from]`, `MonitorError` can be seamlessly created from
//! underlying error types, simplifying error handling with the `?` operator.

use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, MonitorError>;

/// Primary error type for the power monitor.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Configuration file parsing or format error.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Semantically invalid configuration value.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// I/O error outside the bus transport (stdout sink, identity file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be serialized for emission.
    #[error("Record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Channel index outside the device's three measurement channels.
    #[error("Invalid channel {0}: INA3221 channels are 0, 1 and 2")]
    InvalidChannel(u8),

    /// Bus transport failure while talking to the device.
    #[error("Hardware communication error: {0}")]
    HardwareCommunication(String),

    /// Machine identity source missing or unreadable.
    #[error("Machine identity unavailable: {0}")]
    IdentityUnavailable(String),
}

impl MonitorError {
    /// Shorthand for a [`MonitorError::HardwareCommunication`] with a
    /// formatted message.
    pub fn hardware(message: impl Into<String>) -> Self {
        MonitorError::HardwareCommunication(message.into())
    }
}
