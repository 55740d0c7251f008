//! Start-up sequence.
//!
//! Order matters and is fixed:
//!
//! 1. Relay outputs configured (push-pull, no pulls, no interrupts).
//! 2. Limit inputs configured (pull-up, falling edge) and routed to the queue.
//! 3. Both relays driven off.
//! 4. Wi-Fi credentials installed.
//! 5. Network link and broker session started.
//!
//! The desk is locked before any network activity. The first failure aborts
//! start-up; the device must then not serve commands.

use log::info;

use super::commands::Command;
use super::dispatcher::CommandDispatcher;
use super::ports::{
    ConnectivityPort, EventSink, GpioPort, InterruptMode, MessageChannel, PinConfig,
    PinDirection, Pull,
};
use crate::config::DeskConfig;
use crate::error::{self, StartupError};
use crate::events::InputEventQueue;

/// Relay output pin configuration.
pub fn output_config(config: &DeskConfig) -> PinConfig {
    PinConfig {
        pin_mask: config.pins.output_mask(),
        direction: PinDirection::Output,
        pull: Pull::None,
        interrupt: InterruptMode::Disabled,
    }
}

/// Limit-switch input pin configuration.
pub fn input_config(config: &DeskConfig) -> PinConfig {
    PinConfig {
        pin_mask: config.pins.input_mask(),
        direction: PinDirection::Input,
        pull: Pull::Up,
        interrupt: InterruptMode::FallingEdge,
    }
}

/// Run the start-up sequence against the given ports.
pub fn bring_up(
    config: &DeskConfig,
    dispatcher: &mut CommandDispatcher,
    gpio: &mut impl GpioPort,
    net: &mut impl ConnectivityPort,
    channel: &mut impl MessageChannel,
    queue: &'static InputEventQueue,
    sink: &mut impl EventSink,
) -> error::Result<()> {
    config.validate()?;

    gpio.configure(&output_config(config))
        .map_err(StartupError::PinSetup)?;
    gpio.configure(&input_config(config))
        .map_err(StartupError::PinSetup)?;
    for pin in config.pins.inputs() {
        gpio.on_edge(pin, queue).map_err(StartupError::PinSetup)?;
    }
    info!("GPIO configured");

    dispatcher
        .actuate(Command::Lock, gpio)
        .map_err(StartupError::InitialLock)?;
    info!("Desk locked");

    net.set_credentials(&config.wifi.ssid, &config.wifi.password)
        .map_err(StartupError::Credentials)?;

    dispatcher.start(net, channel, &config.broker, sink)?;
    Ok(())
}
