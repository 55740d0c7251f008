//! Integration tests for the CommandDispatcher → Actuator → GPIO pipeline.
//!
//! Drive the session state machine with transport events the way the
//! dispatch task does and assert on the relay writes it produces.

use crate::mock_hw::{ChannelCall, MockChannel, MockConnectivity, MockGpio, NetCall, RecordingSink};

use freedesk::app::actuator::DeskOutputState;
use freedesk::app::commands::Command;
use freedesk::app::dispatcher::{ChannelEvent, CommandDispatcher, ConnectionState, InboundMessage};
use freedesk::app::events::DeskEvent;
use freedesk::app::ports::{ChannelError, ConnectivityError, PinState, QoS};
use freedesk::config::DeskConfig;
use freedesk::error::{ActuatorError, StartupError};
use freedesk::pins::{LOWER_GPIO, RAISE_GPIO};

struct Rig {
    dispatcher: CommandDispatcher,
    net: MockConnectivity,
    channel: MockChannel,
    gpio: MockGpio,
    sink: RecordingSink,
    config: DeskConfig,
}

impl Rig {
    fn new() -> Self {
        let config = DeskConfig::default();
        Self {
            dispatcher: CommandDispatcher::new(&config),
            net: MockConnectivity::default(),
            channel: MockChannel::new(),
            gpio: MockGpio::new(),
            sink: RecordingSink::new(),
            config,
        }
    }

    fn start(&mut self) -> Result<(), StartupError> {
        self.dispatcher
            .start(&mut self.net, &mut self.channel, &self.config.broker, &mut self.sink)
    }

    fn feed(&mut self, event: ChannelEvent) {
        self.dispatcher
            .handle_event(event, &mut self.channel, &mut self.gpio, &mut self.sink);
    }

    fn data(&mut self, payload: &[u8]) {
        let topic = self.config.topic.clone();
        self.feed(ChannelEvent::Data(InboundMessage::new(&topic, payload)));
    }

    /// start → Connected → Subscribed(id)
    fn subscribed() -> Self {
        let mut rig = Self::new();
        rig.start().unwrap();
        let id = rig.channel.next_id();
        rig.feed(ChannelEvent::Connected);
        rig.feed(ChannelEvent::Subscribed(id));
        assert_eq!(rig.dispatcher.state(), ConnectionState::Subscribed);
        rig
    }
}

// ── Lifecycle ─────────────────────────────────────────────────

#[test]
fn end_to_end_raise_writes_lower_off_then_raise_on() {
    let mut rig = Rig::new();
    rig.start().unwrap();
    assert_eq!(rig.dispatcher.state(), ConnectionState::Connecting);
    assert_eq!(rig.net.calls, [NetCall::Connect]);
    assert_eq!(
        rig.channel.calls,
        [ChannelCall::Start("mqtt://broker.local:1883".into())]
    );

    let id = rig.channel.next_id();
    rig.feed(ChannelEvent::Connected);
    assert_eq!(rig.dispatcher.state(), ConnectionState::Connected);
    assert_eq!(
        rig.channel.calls.last(),
        Some(&ChannelCall::Subscribe("freedesk/desk".into(), QoS::AtLeastOnce))
    );

    rig.feed(ChannelEvent::Subscribed(id));
    assert_eq!(rig.dispatcher.state(), ConnectionState::Subscribed);

    rig.data(b"raise");
    assert_eq!(
        rig.dispatcher.output(),
        DeskOutputState {
            lower_active: false,
            raise_active: true
        }
    );
    assert_eq!(
        rig.gpio.writes,
        [(LOWER_GPIO, PinState::Low), (RAISE_GPIO, PinState::High)]
    );
    assert_eq!(rig.dispatcher.stats().commands_applied, 1);
    assert_eq!(
        rig.sink.transitions(),
        [
            ("idle", "connecting"),
            ("connecting", "connected"),
            ("connected", "subscribed"),
        ]
    );
}

#[test]
fn start_twice_is_rejected() {
    let mut rig = Rig::new();
    rig.start().unwrap();
    assert_eq!(rig.start(), Err(StartupError::AlreadyStarted));
    let mut rig = Rig::subscribed();
    assert_eq!(rig.start(), Err(StartupError::AlreadyStarted));
}

#[test]
fn network_failure_fails_start_without_touching_broker() {
    let mut rig = Rig::new();
    rig.net.connect_result = Some(ConnectivityError::ConnectionFailed);
    assert_eq!(
        rig.start(),
        Err(StartupError::Network(ConnectivityError::ConnectionFailed))
    );
    assert_eq!(rig.dispatcher.state(), ConnectionState::Failed);
    assert!(rig.channel.calls.is_empty());
}

#[test]
fn channel_failure_fails_start() {
    let mut rig = Rig::new();
    rig.channel.start_result = Some(ChannelError::Client(-3));
    assert_eq!(rig.start(), Err(StartupError::Channel(ChannelError::Client(-3))));
    assert_eq!(rig.dispatcher.state(), ConnectionState::Failed);
}

#[test]
fn failed_session_can_be_restarted() {
    let mut rig = Rig::new();
    rig.net.connect_result = Some(ConnectivityError::ConnectionFailed);
    assert!(rig.start().is_err());
    rig.net.connect_result = None;
    rig.start().unwrap();
    assert_eq!(rig.dispatcher.state(), ConnectionState::Connecting);
}

#[test]
fn stop_disconnects_and_keeps_relays() {
    let mut rig = Rig::subscribed();
    rig.data(b"lower");
    rig.dispatcher.stop(&mut rig.net, &mut rig.sink);
    assert_eq!(rig.dispatcher.state(), ConnectionState::Disconnected);
    assert_eq!(rig.net.calls.last(), Some(&NetCall::Disconnect));
    assert!(rig.dispatcher.output().lower_active);
}

#[test]
fn reconnect_cycle_resubscribes() {
    let mut rig = Rig::subscribed();
    rig.feed(ChannelEvent::Disconnected);
    assert_eq!(rig.dispatcher.state(), ConnectionState::Disconnected);

    rig.feed(ChannelEvent::BeforeConnect);
    assert_eq!(rig.dispatcher.state(), ConnectionState::Connecting);

    let id = rig.channel.next_id();
    rig.feed(ChannelEvent::Connected);
    assert_eq!(rig.channel.subscriptions(), 2);
    rig.feed(ChannelEvent::Subscribed(id));
    assert_eq!(rig.dispatcher.state(), ConnectionState::Subscribed);
}

#[test]
fn disconnect_does_not_clear_outputs() {
    let mut rig = Rig::subscribed();
    rig.data(b"raise");
    let writes = rig.gpio.writes.len();
    rig.feed(ChannelEvent::Disconnected);
    assert!(rig.dispatcher.output().raise_active);
    assert!(rig.gpio.raise_active());
    assert_eq!(rig.gpio.writes.len(), writes);
}

// ── Subscription acknowledgement ──────────────────────────────

#[test]
fn stale_subscribe_ack_is_ignored() {
    let mut rig = Rig::new();
    rig.start().unwrap();
    let id = rig.channel.next_id();
    rig.feed(ChannelEvent::Connected);
    rig.feed(ChannelEvent::Subscribed(id + 7));
    assert_eq!(rig.dispatcher.state(), ConnectionState::Connected);
    assert_eq!(rig.dispatcher.stats().events_discarded, 1);
}

#[test]
fn subscribe_ack_outside_connected_is_ignored() {
    let mut rig = Rig::new();
    rig.start().unwrap();
    rig.feed(ChannelEvent::Subscribed(rig.channel.next_id()));
    assert_eq!(rig.dispatcher.state(), ConnectionState::Connecting);
}

#[test]
fn ack_after_disconnect_does_not_subscribe() {
    let mut rig = Rig::new();
    rig.start().unwrap();
    let id = rig.channel.next_id();
    rig.feed(ChannelEvent::Connected);
    rig.feed(ChannelEvent::Disconnected);
    rig.feed(ChannelEvent::Subscribed(id));
    assert_eq!(rig.dispatcher.state(), ConnectionState::Disconnected);
}

#[test]
fn subscribe_failure_stays_connected_until_next_connect() {
    let mut rig = Rig::new();
    rig.start().unwrap();
    rig.channel.subscribe_result = Some(ChannelError::Client(-1));
    rig.feed(ChannelEvent::Connected);
    assert_eq!(rig.dispatcher.state(), ConnectionState::Connected);
    assert_eq!(rig.dispatcher.stats().subscribe_failures, 1);

    rig.channel.subscribe_result = None;
    let id = rig.channel.next_id();
    rig.feed(ChannelEvent::Connected);
    rig.feed(ChannelEvent::Subscribed(id));
    assert_eq!(rig.dispatcher.state(), ConnectionState::Subscribed);
}

// ── Data handling ─────────────────────────────────────────────

#[test]
fn data_outside_subscribed_is_discarded() {
    let mut rig = Rig::new();
    rig.start().unwrap();
    rig.feed(ChannelEvent::Connected);
    rig.data(b"raise");
    assert!(rig.gpio.writes.is_empty());
    assert_eq!(rig.dispatcher.stats().events_discarded, 1);

    let mut rig = Rig::subscribed();
    rig.feed(ChannelEvent::Disconnected);
    rig.data(b"lower");
    assert!(rig.gpio.writes.is_empty());
}

#[test]
fn foreign_topic_does_not_actuate() {
    let mut rig = Rig::subscribed();
    for topic in ["freedesk/desk2", "freedesk", "FREEDESK/DESK", ""] {
        rig.feed(ChannelEvent::Data(InboundMessage::new(topic, b"raise")));
    }
    assert!(rig.gpio.writes.is_empty());
    assert_eq!(rig.dispatcher.stats().events_discarded, 4);
}

#[test]
fn unrecognized_payload_is_counted_not_applied() {
    let mut rig = Rig::subscribed();
    for payload in [&b"Raise"[..], b"raise ", b"", b"stop", b"lo"] {
        rig.data(payload);
    }
    assert!(rig.gpio.writes.is_empty());
    assert_eq!(rig.dispatcher.stats().payloads_ignored, 5);
    assert_eq!(rig.dispatcher.output(), DeskOutputState::LOCKED);
}

#[test]
fn direction_reversal_releases_first() {
    let mut rig = Rig::subscribed();
    rig.data(b"raise");
    rig.data(b"lower");
    rig.data(b"lock");
    assert_eq!(
        rig.gpio.writes,
        [
            (LOWER_GPIO, PinState::Low),
            (RAISE_GPIO, PinState::High),
            (RAISE_GPIO, PinState::Low),
            (LOWER_GPIO, PinState::High),
            (LOWER_GPIO, PinState::Low),
            (RAISE_GPIO, PinState::Low),
        ]
    );
    assert_eq!(rig.dispatcher.output(), DeskOutputState::LOCKED);
    assert_eq!(rig.dispatcher.stats().commands_applied, 3);
}

#[test]
fn actuation_failure_is_reported_and_absorbed() {
    let mut rig = Rig::subscribed();
    rig.gpio.fail_writes = vec![0];
    rig.data(b"raise");
    assert_eq!(rig.dispatcher.stats().actuation_failures, 1);
    assert!(!rig.gpio.raise_active());
    assert!(matches!(
        rig.sink.events.last(),
        Some(DeskEvent::ActuationFailed {
            command: Command::Raise,
            error: ActuatorError::ClearFailed(_),
        })
    ));

    // Still serving commands afterwards.
    rig.data(b"raise");
    assert!(rig.gpio.raise_active());
    assert_eq!(rig.dispatcher.state(), ConnectionState::Subscribed);
}

#[test]
fn transport_error_is_counted_without_state_change() {
    let mut rig = Rig::subscribed();
    rig.feed(ChannelEvent::Error(ChannelError::Client(0x7001)));
    assert_eq!(rig.dispatcher.state(), ConnectionState::Subscribed);
    assert_eq!(rig.dispatcher.stats().transport_errors, 1);
    assert_eq!(
        rig.sink.events.last(),
        Some(&DeskEvent::TransportError(ChannelError::Client(0x7001)))
    );
}

#[test]
fn publish_and_unsubscribe_acks_are_inert() {
    let mut rig = Rig::subscribed();
    let before = rig.sink.events.len();
    rig.feed(ChannelEvent::Published(3));
    rig.feed(ChannelEvent::Unsubscribed(4));
    assert_eq!(rig.dispatcher.state(), ConnectionState::Subscribed);
    assert_eq!(rig.sink.events.len(), before);
}
