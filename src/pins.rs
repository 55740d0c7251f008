//! GPIO pin assignments for the FreeDesk relay board.
//!
//! Single source of truth: [`DeskPins::default`](crate::config::DeskPins)
//! and the drivers reference this module rather than hard-coding pin numbers.

/// ESP-IDF GPIO number (`gpio_num_t`).
pub type PinId = i32;

/// Number of addressable GPIOs; every configured pin must be below this.
pub const GPIO_PIN_COUNT: PinId = 40;

// ---------------------------------------------------------------------------
// Direction relays (outputs, active HIGH)
// ---------------------------------------------------------------------------

/// Relay that drives the desk motor downwards.
pub const LOWER_GPIO: PinId = 12;
/// Relay that drives the desk motor upwards.
pub const RAISE_GPIO: PinId = 14;

// ---------------------------------------------------------------------------
// Limit switches (inputs, active LOW with internal pull-up)
// ---------------------------------------------------------------------------

/// Closes when the desk is at its upper end stop; raising must stop.
pub const NO_RAISE_LIMIT_GPIO: PinId = 4;
/// Closes when the desk is at its lower end stop; lowering must stop.
pub const NO_LOWER_LIMIT_GPIO: PinId = 5;

/// Build a `gpio_config_t`-style bit mask from a list of pins.
///
/// Pins outside `0..GPIO_PIN_COUNT` are ignored.
pub const fn pin_mask(pins: &[PinId]) -> u64 {
    let mut mask = 0u64;
    let mut i = 0;
    while i < pins.len() {
        let pin = pins[i];
        if pin >= 0 && pin < GPIO_PIN_COUNT {
            mask |= 1u64 << pin;
        }
        i += 1;
    }
    mask
}

/// Output relay mask for the default board wiring.
pub const OUTPUT_PIN_MASK: u64 = pin_mask(&[LOWER_GPIO, RAISE_GPIO]);
/// Limit-switch input mask for the default board wiring.
pub const INPUT_PIN_MASK: u64 = pin_mask(&[NO_RAISE_LIMIT_GPIO, NO_LOWER_LIMIT_GPIO]);
