//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured desk events to the
//! ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::DeskEvent;
use crate::app::ports::{EventSink, PinState};

/// Adapter that logs every [`DeskEvent`] to the serial console.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &DeskEvent) {
        match event {
            DeskEvent::ConnectionChanged { from, to } => {
                info!("LINK  | {} -> {}", from, to);
            }
            DeskEvent::CommandApplied { command, output } => {
                info!(
                    "CMD   | {} | lower={} raise={}",
                    command,
                    u8::from(output.lower_active),
                    u8::from(output.raise_active),
                );
            }
            DeskEvent::ActuationFailed { command, error } => {
                warn!("CMD   | {} failed: {}", command, error);
            }
            DeskEvent::TransportError(e) => {
                warn!("MQTT  | {}", e);
            }
            DeskEvent::LimitSwitch { limit, pin, level } => {
                let level = match level {
                    Some(PinState::Low) => "closed",
                    Some(PinState::High) => "open",
                    None => "unreadable",
                };
                match limit {
                    Some(limit) => info!("LIMIT | {} GPIO{} {}", limit, pin, level),
                    None => warn!("LIMIT | unexpected edge on GPIO{} ({})", pin, level),
                }
            }
            DeskEvent::InputEventsDropped(n) => {
                warn!("LIMIT | {} edge(s) dropped, queue full", n);
            }
        }
    }
}
