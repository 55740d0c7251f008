//! Command dispatcher: the hexagonal core.
//!
//! [`CommandDispatcher`] owns the broker-session state machine and the
//! [`Actuator`]. It is moved into the dispatch task and fed one
//! [`ChannelEvent`] at a time; all I/O flows through port traits injected
//! at call sites, so the whole thing runs against mocks on the host.
//!
//! ```text
//!  MessageChannel ──▶ ┌────────────────────────┐ ──▶ EventSink
//!                     │   CommandDispatcher    │
//!        GpioPort  ◀──│  session FSM · Actuator│
//!                     └────────────────────────┘
//! ```
//!
//! ```text
//!  Idle ──start──▶ Connecting ──Connected──▶ Connected ──Subscribed(id)──▶ Subscribed
//!                      ▲                                                       │
//!                      └──BeforeConnect── Disconnected ◀──Disconnected─────────┘
//! ```

use core::fmt;

use heapless::{String, Vec};
use log::{debug, info, warn};

use super::actuator::{Actuator, DeskOutputState};
use super::commands::Command;
use super::events::DeskEvent;
use super::ports::{
    ChannelError, ConnectivityPort, EventSink, GpioPort, MessageChannel, MessageId, QoS,
};
use crate::config::{BrokerConfig, DeskConfig, TOPIC_MAX_LEN};
use crate::error::StartupError;

/// Longest inbound topic kept; longer ones can never match.
pub const INBOUND_TOPIC_CAPACITY: usize = 64;
/// Longest inbound payload kept; the longest command token is five bytes.
pub const INBOUND_PAYLOAD_CAPACITY: usize = 32;

// ───────────────────────────────────────────────────────────────
// Session state
// ───────────────────────────────────────────────────────────────

/// Broker session lifecycle as seen by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Connected,
    Subscribed,
    Disconnected,
    Failed,
}

impl ConnectionState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Subscribed => "subscribed",
            Self::Disconnected => "disconnected",
            Self::Failed => "failed",
        }
    }

    /// A session is in progress; `start` must not be called again.
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected | Self::Subscribed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ───────────────────────────────────────────────────────────────
// Transport events
// ───────────────────────────────────────────────────────────────

/// Owned copy of a data event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    topic: String<INBOUND_TOPIC_CAPACITY>,
    payload: Vec<u8, INBOUND_PAYLOAD_CAPACITY>,
    topic_truncated: bool,
    payload_truncated: bool,
}

impl InboundMessage {
    /// Copy `topic` and `payload`, marking whichever does not fit.
    pub fn new(topic: &str, payload: &[u8]) -> Self {
        let mut owned_topic = String::new();
        let topic_truncated = owned_topic.push_str(topic).is_err();
        let mut owned_payload = Vec::new();
        let payload_truncated = owned_payload.extend_from_slice(payload).is_err();
        Self {
            topic: owned_topic,
            payload: owned_payload,
            topic_truncated,
            payload_truncated,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Topic or payload exceeded its capacity.
    pub fn is_oversized(&self) -> bool {
        self.topic_truncated || self.payload_truncated
    }

    /// Exact topic equality. An oversized topic never matches.
    pub fn matches_topic(&self, topic: &str) -> bool {
        !self.topic_truncated && self.topic.as_str() == topic
    }

    /// Decode the payload. An oversized payload never decodes.
    pub fn command(&self) -> Option<Command> {
        if self.payload_truncated {
            None
        } else {
            Command::decode(&self.payload)
        }
    }
}

/// Everything the transport reports, delivered to the dispatch task in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The client is about to (re)connect.
    BeforeConnect,
    Connected,
    Disconnected,
    Subscribed(MessageId),
    Unsubscribed(MessageId),
    Published(MessageId),
    Data(InboundMessage),
    Error(ChannelError),
}

impl ChannelEvent {
    /// Events that drive [`ConnectionState`]. Losing one can leave the
    /// session stuck, so the transport never drops them for data.
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            Self::BeforeConnect | Self::Connected | Self::Disconnected | Self::Subscribed(_)
        )
    }
}

// ───────────────────────────────────────────────────────────────
// Statistics
// ───────────────────────────────────────────────────────────────

/// Running counters, for diagnostics only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub commands_applied: u32,
    /// Data on the command topic that did not decode.
    pub payloads_ignored: u32,
    /// Data outside `Subscribed`, on another topic, or stale acknowledgements.
    pub events_discarded: u32,
    pub actuation_failures: u32,
    pub transport_errors: u32,
    pub subscribe_failures: u32,
}

/// Counters stick at `u32::MAX` instead of wrapping.
fn bump(counter: &mut u32) {
    *counter = counter.saturating_add(1);
}

// ───────────────────────────────────────────────────────────────
// CommandDispatcher
// ───────────────────────────────────────────────────────────────

/// Session state machine plus the relay actuator.
pub struct CommandDispatcher {
    state: ConnectionState,
    topic: String<TOPIC_MAX_LEN>,
    qos: QoS,
    pending_subscription: Option<MessageId>,
    actuator: Actuator,
    stats: DispatchStats,
}

impl CommandDispatcher {
    /// Construct from configuration. Starts `Idle`.
    pub fn new(config: &DeskConfig) -> Self {
        Self {
            state: ConnectionState::Idle,
            topic: config.topic.clone(),
            qos: config.qos,
            pending_subscription: None,
            actuator: Actuator::new(config.pins.lower, config.pins.raise),
            stats: DispatchStats::default(),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Bring up the network link, then open the broker session.
    ///
    /// Connection progress arrives later as [`ChannelEvent`]s.
    pub fn start(
        &mut self,
        net: &mut impl ConnectivityPort,
        channel: &mut impl MessageChannel,
        broker: &BrokerConfig,
        sink: &mut impl EventSink,
    ) -> Result<(), StartupError> {
        if self.state.is_active() {
            return Err(StartupError::AlreadyStarted);
        }
        self.transition(ConnectionState::Connecting, sink);

        if let Err(e) = net.connect() {
            warn!("Network connect failed: {}", e);
            self.transition(ConnectionState::Failed, sink);
            return Err(StartupError::Network(e));
        }
        if let Err(e) = channel.start(broker) {
            warn!("MQTT start failed: {}", e);
            self.transition(ConnectionState::Failed, sink);
            return Err(StartupError::Channel(e));
        }

        info!("Session starting: broker={} topic={}", broker.uri, self.topic);
        Ok(())
    }

    /// Drop the network link. Relay state is left as is.
    pub fn stop(&mut self, net: &mut impl ConnectivityPort, sink: &mut impl EventSink) {
        if let Err(e) = net.disconnect() {
            warn!("Network disconnect failed: {}", e);
        }
        self.pending_subscription = None;
        self.transition(ConnectionState::Disconnected, sink);
    }

    // ── Event handling ────────────────────────────────────────

    /// Process one transport event.
    pub fn handle_event(
        &mut self,
        event: ChannelEvent,
        channel: &mut impl MessageChannel,
        gpio: &mut impl GpioPort,
        sink: &mut impl EventSink,
    ) {
        match event {
            ChannelEvent::BeforeConnect => {
                self.transition(ConnectionState::Connecting, sink);
            }
            ChannelEvent::Connected => {
                self.pending_subscription = None;
                self.transition(ConnectionState::Connected, sink);
                self.subscribe(channel);
            }
            ChannelEvent::Subscribed(id) => {
                if self.state == ConnectionState::Connected
                    && self.pending_subscription == Some(id)
                {
                    self.pending_subscription = None;
                    self.transition(ConnectionState::Subscribed, sink);
                } else {
                    debug!("Ignoring subscribe ack msg_id={} in {}", id, self.state);
                    bump(&mut self.stats.events_discarded);
                }
            }
            ChannelEvent::Disconnected => {
                self.pending_subscription = None;
                self.transition(ConnectionState::Disconnected, sink);
            }
            ChannelEvent::Data(msg) => self.handle_data(&msg, gpio, sink),
            ChannelEvent::Error(e) => {
                warn!("MQTT error: {}", e);
                bump(&mut self.stats.transport_errors);
                sink.emit(&DeskEvent::TransportError(e));
            }
            ChannelEvent::Unsubscribed(id) => debug!("Unsubscribed msg_id={}", id),
            ChannelEvent::Published(id) => debug!("Published msg_id={}", id),
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Last relay levels written.
    pub fn output(&self) -> DeskOutputState {
        self.actuator.state()
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Apply a command directly, bypassing the session. Used at start-up to
    /// lock the desk before going online.
    pub fn actuate(
        &mut self,
        command: Command,
        gpio: &mut impl GpioPort,
    ) -> Result<DeskOutputState, crate::error::ActuatorError> {
        self.actuator.apply(command, gpio)
    }

    // ── Internal ──────────────────────────────────────────────

    fn subscribe(&mut self, channel: &mut impl MessageChannel) {
        match channel.subscribe(&self.topic, self.qos) {
            Ok(id) => {
                info!("Subscribing to {} (msg_id={})", self.topic, id);
                self.pending_subscription = Some(id);
            }
            Err(e) => {
                warn!("Subscribe to {} failed: {}", self.topic, e);
                bump(&mut self.stats.subscribe_failures);
            }
        }
    }

    fn handle_data(
        &mut self,
        msg: &InboundMessage,
        gpio: &mut impl GpioPort,
        sink: &mut impl EventSink,
    ) {
        if self.state != ConnectionState::Subscribed {
            debug!("Discarding data on {} in {}", msg.topic(), self.state);
            bump(&mut self.stats.events_discarded);
            return;
        }
        if !msg.matches_topic(&self.topic) {
            debug!("Discarding data on foreign topic {}", msg.topic());
            bump(&mut self.stats.events_discarded);
            return;
        }
        let Some(command) = msg.command() else {
            debug!("Ignoring payload {:?}", msg.payload());
            bump(&mut self.stats.payloads_ignored);
            return;
        };

        match self.actuator.apply(command, gpio) {
            Ok(output) => {
                info!("Command {} applied", command);
                bump(&mut self.stats.commands_applied);
                sink.emit(&DeskEvent::CommandApplied { command, output });
            }
            Err(error) => {
                warn!("Command {} failed: {}", command, error);
                bump(&mut self.stats.actuation_failures);
                sink.emit(&DeskEvent::ActuationFailed { command, error });
            }
        }
    }

    fn transition(&mut self, to: ConnectionState, sink: &mut impl EventSink) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        info!("MQTT {} -> {}", from, to);
        sink.emit(&DeskEvent::ConnectionChanged { from, to });
    }
}
