//! Long-running task bodies and their spawn helpers.
//!
//! ```text
//!  Core 1 ── "dispatch"    MQTT_EVENTS ─▶ CommandDispatcher ─▶ relays
//!  Core 0 ── "gpio-events" INPUT_EVENTS ─▶ LimitSwitchMonitor ─▶ log
//!  main   ── Wi-Fi link supervision
//! ```

use std::io;
use std::thread::JoinHandle;
use std::time::Duration;

use log::info;

use crate::adapters::mqtt::EventChannel;
use crate::app::dispatcher::CommandDispatcher;
use crate::app::limits::LimitSwitchMonitor;
use crate::app::ports::{EventSink, GpioPort, MessageChannel};
use crate::drivers::task_pin::{spawn_on_core, Core};
use crate::events::InputEventQueue;

const DISPATCH_PRIORITY: u8 = 10;
const DISPATCH_STACK_KB: usize = 8;
const MONITOR_PRIORITY: u8 = 5;
const MONITOR_STACK_KB: usize = 4;

/// Feed every event already queued to the dispatcher. Returns how many.
pub fn dispatch_pending(
    dispatcher: &mut CommandDispatcher,
    events: &EventChannel,
    channel: &mut impl MessageChannel,
    gpio: &mut impl GpioPort,
    sink: &mut impl EventSink,
) -> usize {
    let mut handled = 0;
    while let Ok(event) = events.try_receive() {
        dispatcher.handle_event(event, channel, gpio, sink);
        handled += 1;
    }
    handled
}

/// Dispatch task body: block on the event channel forever.
pub fn run_dispatch(
    mut dispatcher: CommandDispatcher,
    events: &EventChannel,
    mut channel: impl MessageChannel,
    mut gpio: impl GpioPort,
    mut sink: impl EventSink,
) -> ! {
    info!("Dispatch task running (topic={})", dispatcher.topic());
    loop {
        let event = futures_lite::future::block_on(events.receive());
        dispatcher.handle_event(event, &mut channel, &mut gpio, &mut sink);
    }
}

/// Spawn the dispatch task on the application core. It takes ownership of
/// the dispatcher (and with it the actuator) and of the MQTT session.
pub fn spawn_dispatch<C, G, S>(
    dispatcher: CommandDispatcher,
    events: &'static EventChannel,
    channel: C,
    gpio: G,
    sink: S,
) -> io::Result<JoinHandle<()>>
where
    C: MessageChannel + Send + 'static,
    G: GpioPort + Send + 'static,
    S: EventSink + Send + 'static,
{
    spawn_on_core(
        Core::App,
        DISPATCH_PRIORITY,
        DISPATCH_STACK_KB,
        "dispatch\0",
        move || run_dispatch(dispatcher, events, channel, gpio, sink),
    )
}

/// Spawn the limit-switch consumer task. It only logs, so it shares the
/// protocol core and leaves the application core to dispatch.
pub fn spawn_limit_monitor<G, S>(
    monitor: LimitSwitchMonitor,
    queue: &'static InputEventQueue,
    gpio: G,
    mut sink: S,
    poll_interval: Duration,
) -> io::Result<JoinHandle<()>>
where
    G: GpioPort + Send + 'static,
    S: EventSink + Send + 'static,
{
    spawn_on_core(
        Core::Pro,
        MONITOR_PRIORITY,
        MONITOR_STACK_KB,
        "gpio-events\0",
        move || monitor.run(queue, &gpio, &mut sink, poll_interval),
    )
}
