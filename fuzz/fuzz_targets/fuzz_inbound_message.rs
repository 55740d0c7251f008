//! Fuzz target: inbound MQTT data through the dispatcher
//!
//! Splits arbitrary bytes into a topic and a payload, delivers them to a
//! subscribed dispatcher, and asserts that the relays are only ever driven
//! for an exact command token on the configured topic and are never both
//! asserted.
//!
//! cargo fuzz run fuzz_inbound_message

#![no_main]

use libfuzzer_sys::fuzz_target;

use freedesk::app::commands::Command;
use freedesk::app::dispatcher::{ChannelEvent, CommandDispatcher, InboundMessage};
use freedesk::app::events::DeskEvent;
use freedesk::app::ports::{
    ChannelError, EventSink, GpioError, GpioPort, MessageChannel, MessageId, PinConfig, PinState,
    QoS,
};
use freedesk::config::{BrokerConfig, DeskConfig};
use freedesk::events::InputEventQueue;
use freedesk::pins::PinId;

#[derive(Default)]
struct Pins {
    high: u64,
    writes: usize,
}

impl GpioPort for Pins {
    fn configure(&mut self, _: &PinConfig) -> Result<(), GpioError> {
        Ok(())
    }

    fn write(&mut self, pin: PinId, level: PinState) -> Result<(), GpioError> {
        match level {
            PinState::High => self.high |= 1 << pin,
            PinState::Low => self.high &= !(1 << pin),
        }
        self.writes += 1;
        Ok(())
    }

    fn read(&self, _: PinId) -> Result<PinState, GpioError> {
        Ok(PinState::High)
    }

    fn on_edge(&mut self, _: PinId, _: &'static InputEventQueue) -> Result<(), GpioError> {
        Ok(())
    }
}

struct Ack;

impl MessageChannel for Ack {
    fn start(&mut self, _: &BrokerConfig) -> Result<(), ChannelError> {
        Ok(())
    }

    fn subscribe(&mut self, _: &str, _: QoS) -> Result<MessageId, ChannelError> {
        Ok(1)
    }
}

struct Discard;

impl EventSink for Discard {
    fn emit(&mut self, _: &DeskEvent) {}
}

fuzz_target!(|data: &[u8]| {
    let Some((&split, rest)) = data.split_first() else {
        return;
    };
    let (topic, payload) = rest.split_at((split as usize).min(rest.len()));
    let Ok(topic) = core::str::from_utf8(topic) else {
        return;
    };

    let config = DeskConfig::default();
    let mut dispatcher = CommandDispatcher::new(&config);
    let mut gpio = Pins::default();
    dispatcher.handle_event(ChannelEvent::Connected, &mut Ack, &mut gpio, &mut Discard);
    dispatcher.handle_event(ChannelEvent::Subscribed(1), &mut Ack, &mut gpio, &mut Discard);

    let msg = InboundMessage::new(topic, payload);
    dispatcher.handle_event(ChannelEvent::Data(msg), &mut Ack, &mut gpio, &mut Discard);

    let expect_command = topic == config.topic.as_str() && Command::decode(payload).is_some();
    assert_eq!(gpio.writes != 0, expect_command);
    let both = (1u64 << config.pins.lower) | (1u64 << config.pins.raise);
    assert_ne!(gpio.high & both, both, "both relays asserted");
});
