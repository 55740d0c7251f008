//! Direction relay pair.
//!
//! [`Actuator`] turns a [`Command`] into two relay levels and is the only
//! code that writes them. Raise and lower are never asserted together: every
//! command releases before it engages, and the recorded
//! [`DeskOutputState`] tracks each individual write.

use log::{debug, warn};

use super::commands::Command;
use super::ports::{GpioPort, PinState};
use crate::error::ActuatorError;
use crate::pins::PinId;

/// Relay levels as last written to the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeskOutputState {
    pub lower_active: bool,
    pub raise_active: bool,
}

impl DeskOutputState {
    /// Both relays released.
    pub const LOCKED: Self = Self {
        lower_active: false,
        raise_active: false,
    };

    /// Target levels for `command`.
    pub const fn for_command(command: Command) -> Self {
        match command {
            Command::Raise => Self {
                lower_active: false,
                raise_active: true,
            },
            Command::Lower => Self {
                lower_active: true,
                raise_active: false,
            },
            Command::Lock => Self::LOCKED,
        }
    }

    /// Mutual exclusion holds.
    pub const fn is_safe(&self) -> bool {
        !(self.lower_active && self.raise_active)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relay {
    Lower,
    Raise,
}

/// Owns the relay pins and their state.
#[derive(Debug)]
pub struct Actuator {
    lower_pin: PinId,
    raise_pin: PinId,
    state: DeskOutputState,
}

impl Actuator {
    pub fn new(lower_pin: PinId, raise_pin: PinId) -> Self {
        Self {
            lower_pin,
            raise_pin,
            state: DeskOutputState::LOCKED,
        }
    }

    /// Drive both relays to the levels `command` calls for.
    ///
    /// Writes both pins every time, releases first. Every release is
    /// attempted even if an earlier one fails; nothing is engaged after a
    /// failure. The first error is returned and the recorded state reflects
    /// only the writes that succeeded.
    pub fn apply(
        &mut self,
        command: Command,
        gpio: &mut impl GpioPort,
    ) -> Result<DeskOutputState, ActuatorError> {
        let target = DeskOutputState::for_command(command);
        let mut writes = [
            (Relay::Lower, target.lower_active),
            (Relay::Raise, target.raise_active),
        ];
        // Stable: off before on, lower before raise among equals.
        writes.sort_by_key(|&(_, on)| on);

        let mut failure = None;
        for (relay, on) in writes {
            if on && failure.is_some() {
                break;
            }
            let pin = match relay {
                Relay::Lower => self.lower_pin,
                Relay::Raise => self.raise_pin,
            };
            match gpio.write(pin, PinState::from(on)) {
                Ok(()) => match relay {
                    Relay::Lower => self.state.lower_active = on,
                    Relay::Raise => self.state.raise_active = on,
                },
                Err(e) => {
                    warn!("{}: GPIO{} write failed: {}", command, pin, e);
                    failure.get_or_insert(if on {
                        ActuatorError::AssertFailed(e)
                    } else {
                        ActuatorError::ClearFailed(e)
                    });
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => {
                debug!("{} -> {:?}", command, self.state);
                Ok(self.state)
            }
        }
    }

    /// Last recorded relay levels.
    pub fn state(&self) -> DeskOutputState {
        self.state
    }
}
