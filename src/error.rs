//! Unified error types for the FreeDesk firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! start-up path's error handling uniform. All variants are `Copy` so they
//! can be logged and forwarded through the event sink without allocation.
//!
//! Steady-state failures (transport errors, actuation failures) are absorbed
//! by the dispatcher and only logged; start-up failures abort start-up.

use core::fmt;

use crate::app::ports::{ChannelError, ConnectivityError, GpioError};
use crate::config::ConfigError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// Start-up could not complete; the device must not serve commands.
    Startup(StartupError),
    /// The message transport reported a failure.
    Transport(ChannelError),
    /// A relay write failed.
    Actuation(ActuatorError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Startup(e) => write!(f, "startup: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Actuation(e) => write!(f, "actuation: {e}"),
        }
    }
}

impl core::error::Error for Error {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<StartupError> for Error {
    fn from(e: StartupError) -> Self {
        Self::Startup(e)
    }
}

impl From<ChannelError> for Error {
    fn from(e: ChannelError) -> Self {
        Self::Transport(e)
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuation(e)
    }
}

// ---------------------------------------------------------------------------
// Start-up errors
// ---------------------------------------------------------------------------

/// Fatal: the start-up sequence stops at the first of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupError {
    /// Relay or limit-switch pin configuration failed.
    PinSetup(GpioError),
    /// Driving both relays off before going online failed.
    InitialLock(ActuatorError),
    /// The connectivity adapter rejected the credentials.
    Credentials(ConnectivityError),
    /// Network association failed.
    Network(ConnectivityError),
    /// The broker session could not be started.
    Channel(ChannelError),
    /// `start` called while a session is already in progress.
    AlreadyStarted,
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PinSetup(e) => write!(f, "pin setup: {e}"),
            Self::InitialLock(e) => write!(f, "initial lock: {e}"),
            Self::Credentials(e) => write!(f, "credentials: {e}"),
            Self::Network(e) => write!(f, "network: {e}"),
            Self::Channel(e) => write!(f, "message channel: {e}"),
            Self::AlreadyStarted => write!(f, "already started"),
        }
    }
}

impl core::error::Error for StartupError {}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

/// A relay write failed; the command was dropped at that write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// De-asserting a direction failed; nothing was asserted afterwards.
    ClearFailed(GpioError),
    /// The opposing direction is off but asserting the new one failed.
    AssertFailed(GpioError),
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClearFailed(e) => write!(f, "relay release failed: {e}"),
            Self::AssertFailed(e) => write!(f, "relay engage failed: {e}"),
        }
    }
}

impl core::error::Error for ActuatorError {}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
