//! Hardware adapter. Bridges the relay and limit-switch pins to
//! [`GpioPort`].
//!
//! The only module in the system that touches actual pins. On non-espidf
//! targets the underlying driver is a simulated pin bank.

use crate::app::ports::{GpioError, GpioPort, PinConfig, PinState};
use crate::drivers::gpio;
use crate::events::InputEventQueue;
use crate::pins::PinId;

/// Concrete [`GpioPort`] over the ESP-IDF GPIO driver.
///
/// Zero-sized: the pins themselves are global hardware state, so the
/// dispatch task and the limit-switch task each hold their own copy.
#[derive(Debug, Clone, Copy, Default)]
pub struct HardwareAdapter;

impl HardwareAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl GpioPort for HardwareAdapter {
    fn configure(&mut self, config: &PinConfig) -> Result<(), GpioError> {
        gpio::configure(config)
    }

    fn write(&mut self, pin: PinId, level: PinState) -> Result<(), GpioError> {
        gpio::write(pin, level)
    }

    fn read(&self, pin: PinId) -> Result<PinState, GpioError> {
        gpio::read(pin)
    }

    fn on_edge(&mut self, pin: PinId, queue: &'static InputEventQueue) -> Result<(), GpioError> {
        gpio::subscribe_edge(pin, queue)
    }
}
