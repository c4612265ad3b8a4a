//! Error types for device backends

use thiserror::Error;

/// Errors surfaced by power supply backends
///
/// Three categories, matching how callers react: `Connection` means the
/// transport is absent or unreachable, `Command` means the transport was
/// there but the exchange failed, `Config` means a setter was handed a
/// malformed value. A protection trip is state, never an error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Transport absent or unreachable
    #[error("device not connected: {0}")]
    Connection(String),

    /// Transport present but the exchange failed or the instrument rejected it
    #[error("command failed: {0}")]
    Command(String),

    /// Malformed configuration value supplied to a setter
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl DeviceError {
    /// Whether this error means the device link is down
    pub fn is_connection(&self) -> bool {
        matches!(self, DeviceError::Connection(_))
    }

    /// Whether this error came from a failed exchange on a live link
    pub fn is_command(&self) -> bool {
        matches!(self, DeviceError::Command(_))
    }

    /// Whether this error rejects a configuration value
    pub fn is_config(&self) -> bool {
        matches!(self, DeviceError::Config(_))
    }
}
