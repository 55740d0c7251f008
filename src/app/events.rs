//! Outbound domain events.
//!
//! The dispatcher and the limit-switch monitor emit these through the
//! [`EventSink`](super::ports::EventSink) port. Adapters on the other side
//! decide what to do with them; on the device they become log lines.

use super::actuator::DeskOutputState;
use super::commands::Command;
use super::dispatcher::ConnectionState;
use super::limits::Limit;
use super::ports::{ChannelError, PinState};
use crate::error::ActuatorError;
use crate::pins::PinId;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeskEvent {
    /// The broker session moved between states.
    ConnectionChanged {
        from: ConnectionState,
        to: ConnectionState,
    },

    /// A command reached the relays.
    CommandApplied {
        command: Command,
        output: DeskOutputState,
    },

    /// A relay write failed; the command was dropped.
    ActuationFailed {
        command: Command,
        error: ActuatorError,
    },

    /// The transport reported an error.
    TransportError(ChannelError),

    /// An edge arrived on a limit-switch input.
    ///
    /// `limit` is `None` for a pin that is not a configured limit switch;
    /// `level` is `None` when the pin could not be read back.
    LimitSwitch {
        limit: Option<Limit>,
        pin: PinId,
        level: Option<PinState>,
    },

    /// Edges rejected by the full input queue since the last report.
    InputEventsDropped(u32),
}
