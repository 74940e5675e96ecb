//! Caller-facing errors

use core::fmt;

use crate::config::ConfigError;

/// Errors returned by the port API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Requested baud rate cannot be produced by the timer at this clock
    UnsupportedBaudRate,
    /// Timer clock reported as 0 Hz
    UnsupportedClock,
    /// `init` was already called on this port
    AlreadyInitialized,
    /// TX queue has no room; the byte was not accepted
    QueueFull,
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::UnsupportedBaudRate => Error::UnsupportedBaudRate,
            ConfigError::UnsupportedClock => Error::UnsupportedClock,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnsupportedBaudRate => f.write_str("unsupported baud rate"),
            Error::UnsupportedClock => f.write_str("unsupported timer clock"),
            Error::AlreadyInitialized => f.write_str("serial port already initialized"),
            Error::QueueFull => f.write_str("transmit queue full"),
        }
    }
}
