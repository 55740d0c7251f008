//! Raw GPIO access for relay outputs and limit-switch inputs.
//!
//! Thin wrappers over the ESP-IDF `gpio_*` sys calls plus the edge ISR that
//! feeds the [`InputEventQueue`]. On non-ESP targets a simulated pin bank
//! stands in so the adapter above can be exercised on the host.

use core::sync::atomic::{AtomicPtr, Ordering};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;
use log::info;

#[cfg(target_os = "espidf")]
use crate::app::ports::InterruptMode;
use crate::app::ports::{GpioError, PinConfig, PinDirection, PinState, Pull};
use crate::events::InputEventQueue;
#[cfg(not(target_os = "espidf"))]
use crate::events::GpioEvent;
use crate::pins::{GPIO_PIN_COUNT, PinId};

/// Queue the edge ISR pushes into. Null until the first registration.
static EDGE_QUEUE: AtomicPtr<InputEventQueue> = AtomicPtr::new(core::ptr::null_mut());

fn check_pin(pin: PinId) -> Result<(), GpioError> {
    if (0..GPIO_PIN_COUNT).contains(&pin) {
        Ok(())
    } else {
        Err(GpioError::InvalidPin(pin))
    }
}

// ── Configuration ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn configure(config: &PinConfig) -> Result<(), GpioError> {
    let cfg = gpio_config_t {
        pin_bit_mask: config.pin_mask,
        mode: match config.direction {
            PinDirection::Input => gpio_mode_t_GPIO_MODE_INPUT,
            PinDirection::Output => gpio_mode_t_GPIO_MODE_OUTPUT,
        },
        pull_up_en: if config.pull == Pull::Up {
            gpio_pullup_t_GPIO_PULLUP_ENABLE
        } else {
            gpio_pullup_t_GPIO_PULLUP_DISABLE
        },
        pull_down_en: if config.pull == Pull::Down {
            gpio_pulldown_t_GPIO_PULLDOWN_ENABLE
        } else {
            gpio_pulldown_t_GPIO_PULLDOWN_DISABLE
        },
        intr_type: match config.interrupt {
            InterruptMode::Disabled => gpio_int_type_t_GPIO_INTR_DISABLE,
            InterruptMode::RisingEdge => gpio_int_type_t_GPIO_INTR_POSEDGE,
            InterruptMode::FallingEdge => gpio_int_type_t_GPIO_INTR_NEGEDGE,
            InterruptMode::AnyEdge => gpio_int_type_t_GPIO_INTR_ANYEDGE,
        },
        ..Default::default()
    };
    // SAFETY: gpio_config only reads the struct; called from the start-up
    // path before any ISR is registered.
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(GpioError::ConfigFailed(ret));
    }
    info!(
        "gpio: mask=0x{:010x} {:?} pull={:?} intr={:?}",
        config.pin_mask, config.direction, config.pull, config.interrupt
    );
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn configure(config: &PinConfig) -> Result<(), GpioError> {
    if config.pin_mask >> GPIO_PIN_COUNT != 0 {
        return Err(GpioError::ConfigFailed(-1));
    }
    if config.direction == PinDirection::Input && config.pull == Pull::Up {
        sim::LEVELS.fetch_or(config.pin_mask, Ordering::AcqRel);
    }
    info!(
        "gpio(sim): mask=0x{:010x} {:?} pull={:?} intr={:?}",
        config.pin_mask, config.direction, config.pull, config.interrupt
    );
    Ok(())
}

// ── Level I/O ─────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn write(pin: PinId, level: PinState) -> Result<(), GpioError> {
    check_pin(pin)?;
    // SAFETY: register write to a pin configured as output at start-up;
    // only the dispatch task drives the relays.
    let ret = unsafe { gpio_set_level(pin, u32::from(level == PinState::High)) };
    if ret != ESP_OK as i32 {
        return Err(GpioError::WriteFailed { pin, code: ret });
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn write(pin: PinId, level: PinState) -> Result<(), GpioError> {
    check_pin(pin)?;
    let bit = 1u64 << pin;
    match level {
        PinState::High => sim::LEVELS.fetch_or(bit, Ordering::AcqRel),
        PinState::Low => sim::LEVELS.fetch_and(!bit, Ordering::AcqRel),
    };
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn read(pin: PinId) -> Result<PinState, GpioError> {
    check_pin(pin)?;
    // SAFETY: read-only register access.
    let level = unsafe { gpio_get_level(pin) };
    Ok(PinState::from(level != 0))
}

#[cfg(not(target_os = "espidf"))]
pub fn read(pin: PinId) -> Result<PinState, GpioError> {
    check_pin(pin)?;
    Ok(PinState::from(sim::LEVELS.load(Ordering::Acquire) & (1u64 << pin) != 0))
}

// ── Edge interrupts ───────────────────────────────────────────

/// Runs in interrupt context: timestamp the edge and queue it, nothing else.
#[cfg(target_os = "espidf")]
unsafe extern "C" fn edge_isr(arg: *mut core::ffi::c_void) {
    let queue = EDGE_QUEUE.load(Ordering::Acquire);
    if queue.is_null() {
        return;
    }
    // SAFETY: esp_timer_get_time is an RTC counter read; safe in ISR context.
    let now_us = unsafe { esp_timer_get_time() };
    let event = crate::events::GpioEvent::new(arg as usize as PinId, now_us as u64);
    // SAFETY: the pointer was taken from a `&'static InputEventQueue`.
    unsafe { (*queue).push(event) };
}

/// Install the per-pin ISR service (once) and route edges on `pin` to `queue`.
#[cfg(target_os = "espidf")]
pub fn subscribe_edge(pin: PinId, queue: &'static InputEventQueue) -> Result<(), GpioError> {
    check_pin(pin)?;
    EDGE_QUEUE.store(core::ptr::from_ref(queue).cast_mut(), Ordering::Release);

    // SAFETY: gpio_install_isr_service is idempotent; ESP_ERR_INVALID_STATE
    // means it was already installed. The handler only pushes to the
    // lock-free queue.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE as i32 {
            return Err(GpioError::IsrInstallFailed(ret));
        }
        let ret = gpio_isr_handler_add(pin, Some(edge_isr), pin as usize as *mut core::ffi::c_void);
        if ret != ESP_OK as i32 {
            return Err(GpioError::IsrInstallFailed(ret));
        }
    }
    info!("gpio: edge ISR on GPIO{}", pin);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn subscribe_edge(pin: PinId, queue: &'static InputEventQueue) -> Result<(), GpioError> {
    check_pin(pin)?;
    EDGE_QUEUE.store(core::ptr::from_ref(queue).cast_mut(), Ordering::Release);
    sim::EDGE_PINS.fetch_or(1u64 << pin, Ordering::AcqRel);
    info!("gpio(sim): edge ISR on GPIO{}", pin);
    Ok(())
}

/// Simulate a falling edge: drive the input low and run the ISR path.
/// Returns whether an event was queued.
#[cfg(not(target_os = "espidf"))]
pub fn simulate_edge(pin: PinId, timestamp_us: u64) -> bool {
    if check_pin(pin).is_err() {
        return false;
    }
    sim::LEVELS.fetch_and(!(1u64 << pin), Ordering::AcqRel);
    if sim::EDGE_PINS.load(Ordering::Acquire) & (1u64 << pin) == 0 {
        return false;
    }
    let queue = EDGE_QUEUE.load(Ordering::Acquire);
    if queue.is_null() {
        return false;
    }
    // SAFETY: the pointer was taken from a `&'static InputEventQueue`.
    unsafe { (*queue).push(GpioEvent::new(pin, timestamp_us)) }
}

#[cfg(not(target_os = "espidf"))]
mod sim {
    use core::sync::atomic::AtomicU64;

    /// Current level of every simulated pin, one bit per GPIO.
    pub static LEVELS: AtomicU64 = AtomicU64::new(0);
    /// Pins with a registered edge handler.
    pub static EDGE_PINS: AtomicU64 = AtomicU64::new(0);
}
