//! Mock adapters for integration tests.
//!
//! Every port call is recorded so tests can assert on the full history
//! without touching real GPIO registers, Wi-Fi, or a broker.

use freedesk::app::events::DeskEvent;
use freedesk::app::ports::{
    ChannelError, ConnectivityError, ConnectivityPort, EventSink, GpioError, GpioPort,
    MessageChannel, MessageId, PinConfig, PinState, QoS,
};
use freedesk::config::BrokerConfig;
use freedesk::events::InputEventQueue;
use freedesk::pins::{self, PinId};

// ── MockGpio ──────────────────────────────────────────────────

/// Records configuration and writes; asserts mutual exclusion on every
/// individual relay write.
pub struct MockGpio {
    pub configs: Vec<PinConfig>,
    pub writes: Vec<(PinId, PinState)>,
    pub edge_pins: Vec<PinId>,
    /// Index (into all write attempts) of writes that fail.
    pub fail_writes: Vec<usize>,
    pub fail_configure: bool,
    attempts: usize,
    levels: [bool; pins::GPIO_PIN_COUNT as usize],
    lower_pin: PinId,
    raise_pin: PinId,
}

#[allow(dead_code)]
impl MockGpio {
    pub fn new() -> Self {
        Self {
            configs: Vec::new(),
            writes: Vec::new(),
            edge_pins: Vec::new(),
            fail_writes: Vec::new(),
            fail_configure: false,
            attempts: 0,
            levels: [false; pins::GPIO_PIN_COUNT as usize],
            lower_pin: pins::LOWER_GPIO,
            raise_pin: pins::RAISE_GPIO,
        }
    }

    pub fn level(&self, pin: PinId) -> bool {
        self.levels[pin as usize]
    }

    pub fn set_input(&mut self, pin: PinId, high: bool) {
        self.levels[pin as usize] = high;
    }

    pub fn lower_active(&self) -> bool {
        self.level(self.lower_pin)
    }

    pub fn raise_active(&self) -> bool {
        self.level(self.raise_pin)
    }
}

impl Default for MockGpio {
    fn default() -> Self {
        Self::new()
    }
}

impl GpioPort for MockGpio {
    fn configure(&mut self, config: &PinConfig) -> Result<(), GpioError> {
        if self.fail_configure {
            return Err(GpioError::ConfigFailed(-1));
        }
        self.configs.push(*config);
        Ok(())
    }

    fn write(&mut self, pin: PinId, level: PinState) -> Result<(), GpioError> {
        let attempt = self.attempts;
        self.attempts += 1;
        if self.fail_writes.contains(&attempt) {
            return Err(GpioError::WriteFailed { pin, code: -1 });
        }
        self.levels[pin as usize] = level == PinState::High;
        self.writes.push((pin, level));
        assert!(
            !(self.lower_active() && self.raise_active()),
            "both relays asserted after write #{attempt}: {:?}",
            self.writes
        );
        Ok(())
    }

    fn read(&self, pin: PinId) -> Result<PinState, GpioError> {
        if !(0..pins::GPIO_PIN_COUNT).contains(&pin) {
            return Err(GpioError::InvalidPin(pin));
        }
        Ok(PinState::from(self.level(pin)))
    }

    fn on_edge(&mut self, pin: PinId, _queue: &'static InputEventQueue) -> Result<(), GpioError> {
        self.edge_pins.push(pin);
        Ok(())
    }
}

// ── MockConnectivity ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetCall {
    SetCredentials(String, String),
    Connect,
    Disconnect,
}

#[derive(Default)]
pub struct MockConnectivity {
    pub calls: Vec<NetCall>,
    pub connect_result: Option<ConnectivityError>,
    pub credentials_result: Option<ConnectivityError>,
    connected: bool,
}

impl ConnectivityPort for MockConnectivity {
    fn connect(&mut self) -> Result<(), ConnectivityError> {
        self.calls.push(NetCall::Connect);
        match self.connect_result {
            Some(e) => Err(e),
            None => {
                self.connected = true;
                Ok(())
            }
        }
    }

    fn disconnect(&mut self) -> Result<(), ConnectivityError> {
        self.calls.push(NetCall::Disconnect);
        if !self.connected {
            return Err(ConnectivityError::NotConnected);
        }
        self.connected = false;
        Ok(())
    }

    fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError> {
        self.calls
            .push(NetCall::SetCredentials(ssid.into(), password.into()));
        match self.credentials_result {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

// ── MockChannel ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelCall {
    Start(String),
    Subscribe(String, QoS),
}

pub struct MockChannel {
    pub calls: Vec<ChannelCall>,
    pub start_result: Option<ChannelError>,
    pub subscribe_result: Option<ChannelError>,
    next_id: MessageId,
}

#[allow(dead_code)]
impl MockChannel {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            start_result: None,
            subscribe_result: None,
            next_id: 41,
        }
    }

    /// Id the next successful subscribe will return.
    pub fn next_id(&self) -> MessageId {
        self.next_id + 1
    }

    pub fn subscriptions(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, ChannelCall::Subscribe(..)))
            .count()
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageChannel for MockChannel {
    fn start(&mut self, broker: &BrokerConfig) -> Result<(), ChannelError> {
        self.calls.push(ChannelCall::Start(broker.uri.as_str().into()));
        match self.start_result {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<MessageId, ChannelError> {
        self.calls.push(ChannelCall::Subscribe(topic.into(), qos));
        match self.subscribe_result {
            Some(e) => Err(e),
            None => {
                self.next_id += 1;
                Ok(self.next_id)
            }
        }
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<DeskEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transitions(&self) -> Vec<(&'static str, &'static str)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                DeskEvent::ConnectionChanged { from, to } => Some((from.as_str(), to.as_str())),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &DeskEvent) {
        self.events.push(event.clone());
    }
}
