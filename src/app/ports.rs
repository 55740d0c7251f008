//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ CommandDispatcher (domain)
//! ```
//!
//! Driven adapters (GPIO, Wi-Fi, MQTT, event sinks) implement these traits.
//! The [`CommandDispatcher`](super::dispatcher::CommandDispatcher) consumes
//! them via generics at call sites, so the domain core never touches
//! hardware or the network stack directly.

use core::fmt;

pub use embedded_hal::digital::PinState;
use serde::{Deserialize, Serialize};

use crate::config::BrokerConfig;
use crate::events::InputEventQueue;
use crate::pins::PinId;

// ───────────────────────────────────────────────────────────────
// GPIO port (driven adapter: domain ↔ pins)
// ───────────────────────────────────────────────────────────────

/// Pin direction for [`PinConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinDirection {
    Input,
    Output,
}

/// Internal pull resistor selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    None,
    Up,
    Down,
}

/// Edge that raises an interrupt on an input pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptMode {
    Disabled,
    RisingEdge,
    FallingEdge,
    AnyEdge,
}

/// Configuration applied to every pin set in `pin_mask`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinConfig {
    pub pin_mask: u64,
    pub direction: PinDirection,
    pub pull: Pull,
    pub interrupt: InterruptMode,
}

/// Pin configuration, level I/O and edge-interrupt registration.
pub trait GpioPort {
    /// Apply `config` to every pin in its mask.
    fn configure(&mut self, config: &PinConfig) -> Result<(), GpioError>;

    /// Drive an output pin.
    fn write(&mut self, pin: PinId, level: PinState) -> Result<(), GpioError>;

    /// Sample a pin.
    fn read(&self, pin: PinId) -> Result<PinState, GpioError>;

    /// Route edge interrupts on `pin` into `queue`.
    ///
    /// Pushing into the queue is the only work the interrupt handler does.
    fn on_edge(&mut self, pin: PinId, queue: &'static InputEventQueue) -> Result<(), GpioError>;
}

// ───────────────────────────────────────────────────────────────
// Connectivity port (driven adapter: domain → network link)
// ───────────────────────────────────────────────────────────────

/// Network association lifecycle (Wi-Fi station on the device).
pub trait ConnectivityPort {
    fn connect(&mut self) -> Result<(), ConnectivityError>;
    fn disconnect(&mut self) -> Result<(), ConnectivityError>;
    fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError>;
    fn is_connected(&self) -> bool;

    /// Link supervision hook, called periodically from the main task.
    fn poll(&mut self) {}
}

// ───────────────────────────────────────────────────────────────
// Message channel port (driven adapter: domain ↔ broker session)
// ───────────────────────────────────────────────────────────────

/// Broker-assigned identifier correlating a request with its acknowledgement.
pub type MessageId = u32;

/// MQTT delivery guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QoS {
    AtMostOnce,
    #[default]
    AtLeastOnce,
    ExactlyOnce,
}

/// Publish/subscribe session.
///
/// Inbound traffic is not pulled through this trait: the adapter delivers
/// [`ChannelEvent`](super::dispatcher::ChannelEvent)s asynchronously and the
/// dispatch task hands each one to the dispatcher together with the channel.
pub trait MessageChannel {
    /// Open the broker session. Connection progress arrives as events.
    fn start(&mut self, broker: &BrokerConfig) -> Result<(), ChannelError>;

    /// Request a subscription; the broker acknowledges with the returned id.
    fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<MessageId, ChannelError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`DeskEvent`](super::events::DeskEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::DeskEvent);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`GpioPort`] operations. Codes are raw `esp_err_t` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioError {
    InvalidPin(PinId),
    ConfigFailed(i32),
    WriteFailed { pin: PinId, code: i32 },
    ReadFailed { pin: PinId, code: i32 },
    IsrInstallFailed(i32),
}

impl fmt::Display for GpioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPin(pin) => write!(f, "invalid GPIO{}", pin),
            Self::ConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::WriteFailed { pin, code } => write!(f, "GPIO{} write failed (rc={})", pin, code),
            Self::ReadFailed { pin, code } => write!(f, "GPIO{} read failed (rc={})", pin, code),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR install failed (rc={})", rc),
        }
    }
}

impl core::error::Error for GpioError {}

/// Errors from [`ConnectivityPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
    AlreadyConnected,
    NotConnected,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
            Self::AlreadyConnected => write!(f, "already connected to AP"),
            Self::NotConnected => write!(f, "not connected to AP"),
        }
    }
}

impl core::error::Error for ConnectivityError {}

/// Errors from [`MessageChannel`] operations and transport error events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    /// `subscribe` before `start`, or after the client was torn down.
    NotStarted,
    AlreadyStarted,
    /// Topic is empty, too long, or not valid for a subscription.
    InvalidTopic,
    /// The client rejected the request or reported a transport failure.
    Client(i32),
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "MQTT session not started"),
            Self::AlreadyStarted => write!(f, "MQTT session already started"),
            Self::InvalidTopic => write!(f, "invalid topic"),
            Self::Client(rc) => write!(f, "MQTT client error (rc={})", rc),
        }
    }
}

impl core::error::Error for ChannelError {}
