//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the rules of the desk controller: command decoding,
//! relay mutual exclusion, the broker-session state machine, and limit-switch
//! reporting. All interaction with hardware and the network happens through
//! **port traits** defined in [`ports`], keeping this layer fully testable
//! without real peripherals.

pub mod actuator;
pub mod commands;
pub mod dispatcher;
pub mod events;
pub mod limits;
pub mod ports;
pub mod startup;
