//! MQTT client adapter.
//!
//! Implements [`MessageChannel`] over the ESP-IDF MQTT client. The client
//! runs its own task and reports through a callback; the callback only
//! converts each event and hands it to the dispatch task through a bounded
//! `embassy-sync` channel. It never blocks and never calls back into the
//! client, so `subscribe` from the dispatch task cannot deadlock against it.
//!
//! Data and other informational events may only fill part of the channel.
//! The rest is held for lifecycle events, so a burst of redelivered
//! messages cannot push out the subscribe ack the session waits for. The
//! channel stays a single FIFO, so ordering is unchanged.
//!
//! ```text
//! ┌──────────────┐ ChannelEvent ┌──────────────┐
//! │ MQTT client  │─────────────▶│ Dispatch task│──▶ CommandDispatcher
//! │ task (cb)    │ MQTT_EVENTS  │ (block_on)   │
//! └──────────────┘              └──────────────┘
//! ```
//!
//! On non-espidf targets a loopback broker stands in: `start` reports a
//! connection, `subscribe` is acknowledged, and tests publish with
//! [`MqttAdapter::sim_publish`].

use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
#[cfg(target_os = "espidf")]
use esp_idf_svc::mqtt::client::{
    Details, EspMqttClient, EspMqttEvent, EventPayload, MqttClientConfiguration,
    QoS as EspQoS,
};
use log::{error, info, warn};

use crate::app::dispatcher::ChannelEvent;
#[cfg(target_os = "espidf")]
use crate::app::dispatcher::InboundMessage;
use crate::app::ports::{ChannelError, MessageChannel, MessageId, QoS};
use crate::config::{self, BrokerConfig};

/// Events buffered between the client callback and the dispatch task.
pub const MQTT_EVENT_DEPTH: usize = 16;

/// Most non-lifecycle events queued at once; the remaining slots are
/// reserved for lifecycle events.
pub const MQTT_DATA_DEPTH: usize = 8;

pub type EventChannel = Channel<CriticalSectionRawMutex, ChannelEvent, MQTT_EVENT_DEPTH>;

/// Client callback → dispatch task.
pub static MQTT_EVENTS: EventChannel = Channel::new();

/// Events lost because the dispatch task fell behind.
static EVENTS_DROPPED: AtomicU32 = AtomicU32::new(0);

pub fn events_dropped() -> u32 {
    EVENTS_DROPPED.load(Ordering::Relaxed)
}

/// Non-blocking hand-off. Non-lifecycle events are dropped once
/// [`MQTT_DATA_DEPTH`] are queued; lifecycle events only when the whole
/// channel is full.
fn forward(events: &EventChannel, event: ChannelEvent) -> bool {
    let lifecycle = event.is_lifecycle();
    if !lifecycle && events.len() >= MQTT_DATA_DEPTH {
        let n = EVENTS_DROPPED.fetch_add(1, Ordering::Relaxed) + 1;
        warn!("MQTT data backlog full, event dropped ({} total)", n);
        return false;
    }
    match events.try_send(event) {
        Ok(()) => true,
        Err(TrySendError::Full(event)) => {
            let n = EVENTS_DROPPED.fetch_add(1, Ordering::Relaxed) + 1;
            error!("MQTT event channel full, {:?} dropped ({} total)", event, n);
            false
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Adapter
// ───────────────────────────────────────────────────────────────

pub struct MqttAdapter {
    events: &'static EventChannel,
    #[cfg(target_os = "espidf")]
    client: Option<EspMqttClient<'static>>,
    #[cfg(not(target_os = "espidf"))]
    sim: Option<SimBroker>,
}

impl MqttAdapter {
    pub fn new(events: &'static EventChannel) -> Self {
        Self {
            events,
            #[cfg(target_os = "espidf")]
            client: None,
            #[cfg(not(target_os = "espidf"))]
            sim: None,
        }
    }
}

fn check_topic(topic: &str) -> Result<(), ChannelError> {
    if topic.len() > config::TOPIC_MAX_LEN || config::validate_topic(topic).is_err() {
        return Err(ChannelError::InvalidTopic);
    }
    Ok(())
}

// ── ESP-IDF client ────────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn translate(event: &EspMqttEvent<'_>) -> Option<ChannelEvent> {
    Some(match event.payload() {
        EventPayload::BeforeConnect => ChannelEvent::BeforeConnect,
        EventPayload::Connected(_) => ChannelEvent::Connected,
        EventPayload::Disconnected => ChannelEvent::Disconnected,
        EventPayload::Subscribed(id) => ChannelEvent::Subscribed(id),
        EventPayload::Unsubscribed(id) => ChannelEvent::Unsubscribed(id),
        EventPayload::Published(id) => ChannelEvent::Published(id),
        EventPayload::Received {
            topic: Some(topic),
            data,
            details: Details::Complete,
            ..
        } => ChannelEvent::Data(InboundMessage::new(topic, data)),
        EventPayload::Received { .. } => {
            // Fragments only arrive for payloads far larger than any command.
            log::debug!("MQTT: dropping fragmented message");
            return None;
        }
        EventPayload::Deleted(_) => return None,
        EventPayload::Error(e) => ChannelEvent::Error(ChannelError::Client(e.code())),
    })
}

#[cfg(target_os = "espidf")]
fn to_esp_qos(qos: QoS) -> EspQoS {
    match qos {
        QoS::AtMostOnce => EspQoS::AtMostOnce,
        QoS::AtLeastOnce => EspQoS::AtLeastOnce,
        QoS::ExactlyOnce => EspQoS::ExactlyOnce,
    }
}

#[cfg(target_os = "espidf")]
impl MessageChannel for MqttAdapter {
    fn start(&mut self, broker: &BrokerConfig) -> Result<(), ChannelError> {
        if self.client.is_some() {
            return Err(ChannelError::AlreadyStarted);
        }

        let conf = MqttClientConfiguration {
            username: (!broker.username.is_empty()).then_some(broker.username.as_str()),
            password: (!broker.password.is_empty()).then_some(broker.password.as_str()),
            ..Default::default()
        };
        let events = self.events;
        let client = EspMqttClient::new_cb(&broker.uri, &conf, move |event| {
            if let Some(event) = translate(&event) {
                forward(events, event);
            }
        })
        .map_err(|e| ChannelError::Client(e.code()))?;

        info!("MQTT: client started for {}", broker.uri);
        self.client = Some(client);
        Ok(())
    }

    fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<MessageId, ChannelError> {
        check_topic(topic)?;
        let client = self.client.as_mut().ok_or(ChannelError::NotStarted)?;
        client
            .subscribe(topic, to_esp_qos(qos))
            .map_err(|e| ChannelError::Client(e.code()))
    }
}

// ── Loopback broker (simulation) ──────────────────────────────

#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
struct SimBroker {
    next_id: MessageId,
    subscriptions: heapless::Vec<(heapless::String<{ config::TOPIC_MAX_LEN }>, QoS), 4>,
}

#[cfg(not(target_os = "espidf"))]
impl MessageChannel for MqttAdapter {
    fn start(&mut self, broker: &BrokerConfig) -> Result<(), ChannelError> {
        if self.sim.is_some() {
            return Err(ChannelError::AlreadyStarted);
        }
        self.sim = Some(SimBroker::default());
        info!("MQTT(sim): loopback session for {}", broker.uri);
        forward(self.events, ChannelEvent::BeforeConnect);
        forward(self.events, ChannelEvent::Connected);
        Ok(())
    }

    fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<MessageId, ChannelError> {
        check_topic(topic)?;
        let sim = self.sim.as_mut().ok_or(ChannelError::NotStarted)?;
        sim.next_id += 1;
        let id = sim.next_id;

        let mut owned = heapless::String::new();
        owned.push_str(topic).map_err(|()| ChannelError::InvalidTopic)?;
        if !sim.subscriptions.iter().any(|(t, _)| t == &owned) {
            sim.subscriptions
                .push((owned, qos))
                .map_err(|_| ChannelError::Client(-1))?;
        }
        forward(self.events, ChannelEvent::Subscribed(id));
        Ok(id)
    }
}

#[cfg(not(target_os = "espidf"))]
impl MqttAdapter {
    /// Deliver a message as the broker would: only to subscribed topics.
    /// Returns whether it was queued for the dispatch task.
    pub fn sim_publish(&self, topic: &str, payload: &[u8]) -> bool {
        let subscribed = self
            .sim
            .as_ref()
            .is_some_and(|s| s.subscriptions.iter().any(|(t, _)| t.as_str() == topic));
        subscribed
            && forward(
                self.events,
                ChannelEvent::Data(crate::app::dispatcher::InboundMessage::new(topic, payload)),
            )
    }

    /// Inject an arbitrary transport event.
    pub fn inject(&self, event: ChannelEvent) -> bool {
        forward(self.events, event)
    }

    /// Topics currently subscribed, in order.
    pub fn subscriptions(&self) -> impl Iterator<Item = (&str, QoS)> {
        self.sim
            .iter()
            .flat_map(|s| s.subscriptions.iter().map(|(t, q)| (t.as_str(), *q)))
    }
}
