//! Desk commands and their wire encoding.
//!
//! A command payload is one of three ASCII tokens, matched exactly and
//! case-sensitively. Anything else is not a command.

use core::fmt;

/// Actions a remote sender can request of the desk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Drive the motor upwards.
    Raise,
    /// Drive the motor downwards.
    Lower,
    /// Stop: both directions released.
    Lock,
}

/// Payload bytes accepted for each command.
pub const COMMAND_TABLE: [(&[u8], Command); 3] = [
    (b"raise", Command::Raise),
    (b"lower", Command::Lower),
    (b"lock", Command::Lock),
];

impl Command {
    /// Decode a message payload. `None` for anything but an exact token.
    pub fn decode(payload: &[u8]) -> Option<Self> {
        COMMAND_TABLE
            .iter()
            .find(|(token, _)| *token == payload)
            .map(|&(_, cmd)| cmd)
    }

    /// The wire token for this command.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Raise => "raise",
            Self::Lower => "lower",
            Self::Lock => "lock",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
