//! Limit-switch monitor, the single consumer of the input event queue.
//!
//! Observational only: a tripped limit is reported through the event sink
//! and does not feed back into the actuator.

use core::fmt;
use std::time::Duration;

use log::warn;

use super::events::DeskEvent;
use super::ports::{EventSink, GpioPort};
use crate::config::DeskPins;
use crate::events::{GpioEvent, InputEventQueue};
use crate::pins::PinId;

/// Longest a drop goes unreported while no edge arrives.
pub const DROP_REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Which end stop an input reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// Upper end stop: raising must stop.
    NoRaise,
    /// Lower end stop: lowering must stop.
    NoLower,
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NoRaise => "no-raise",
            Self::NoLower => "no-lower",
        })
    }
}

/// Classifies queued edges and reports them.
#[derive(Debug)]
pub struct LimitSwitchMonitor {
    no_raise_pin: PinId,
    no_lower_pin: PinId,
    reported_drops: u32,
}

impl LimitSwitchMonitor {
    pub fn new(pins: &DeskPins) -> Self {
        Self {
            no_raise_pin: pins.no_raise_limit,
            no_lower_pin: pins.no_lower_limit,
            reported_drops: 0,
        }
    }

    pub fn classify(&self, pin: PinId) -> Option<Limit> {
        if pin == self.no_raise_pin {
            Some(Limit::NoRaise)
        } else if pin == self.no_lower_pin {
            Some(Limit::NoLower)
        } else {
            None
        }
    }

    /// Report edges dropped since the last report, if any.
    pub fn report_drops<const N: usize>(
        &mut self,
        queue: &InputEventQueue<N>,
        sink: &mut impl EventSink,
    ) {
        let dropped = queue.dropped();
        if dropped != self.reported_drops {
            sink.emit(&DeskEvent::InputEventsDropped(
                dropped.wrapping_sub(self.reported_drops),
            ));
            self.reported_drops = dropped;
        }
    }

    /// Report one dequeued edge, plus any drops since the last report.
    pub fn observe<const N: usize>(
        &mut self,
        event: GpioEvent,
        queue: &InputEventQueue<N>,
        gpio: &impl GpioPort,
        sink: &mut impl EventSink,
    ) {
        self.report_drops(queue, sink);

        let level = match gpio.read(event.pin) {
            Ok(level) => Some(level),
            Err(e) => {
                warn!("Limit input read failed: {}", e);
                None
            }
        };
        sink.emit(&DeskEvent::LimitSwitch {
            limit: self.classify(event.pin),
            pin: event.pin,
            level,
        });
    }

    /// Consumer task body: wait on the queue forever. Drops are also
    /// checked when the queue stays quiet for [`DROP_REPORT_INTERVAL`].
    pub fn run(
        mut self,
        queue: &InputEventQueue,
        gpio: &impl GpioPort,
        sink: &mut impl EventSink,
        poll_interval: Duration,
    ) -> ! {
        loop {
            match queue.pop_timeout(DROP_REPORT_INTERVAL, poll_interval) {
                Some(event) => self.observe(event, queue, gpio, sink),
                None => self.report_drops(queue, sink),
            }
        }
    }
}
