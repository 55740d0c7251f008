//! System configuration parameters
//!
//! Everything the firmware needs at start-up: Wi-Fi credentials, broker
//! session, command topic, pin wiring and task timing. Values are baked in
//! at compile time from `FREEDESK_*` environment variables, or supplied as a
//! single JSON document.

use core::fmt;

use heapless::String;
use serde::{Deserialize, Serialize};

use crate::app::ports::QoS;
use crate::pins::{self, PinId};

/// Longest command topic accepted.
pub const TOPIC_MAX_LEN: usize = 32;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
    pub wifi: WifiConfig,
    pub broker: BrokerConfig,
    /// Topic carrying `raise` / `lower` / `lock` commands.
    pub topic: String<TOPIC_MAX_LEN>,
    /// QoS requested for the command subscription.
    pub qos: QoS,
    pub pins: DeskPins,

    // --- Timing ---
    /// Sleep between empty checks of the limit-switch event queue (milliseconds)
    pub input_poll_interval_ms: u32,
    /// Wi-Fi link supervision interval (milliseconds)
    pub link_check_interval_ms: u32,
}

/// Station credentials for the access point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WifiConfig {
    pub ssid: String<32>,
    pub password: String<64>,
}

/// MQTT broker session parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// e.g. `mqtt://broker.local:1883` or `mqtts://…`
    pub uri: String<128>,
    pub username: String<64>,
    pub password: String<64>,
}

/// Relay outputs and limit-switch inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskPins {
    pub lower: PinId,
    pub raise: PinId,
    pub no_raise_limit: PinId,
    pub no_lower_limit: PinId,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            wifi: WifiConfig::default(),
            broker: BrokerConfig::default(),
            topic: heapless_str("freedesk/desk"),
            qos: QoS::AtLeastOnce,
            pins: DeskPins::default(),

            // Timing
            input_poll_interval_ms: 10,
            link_check_interval_ms: 1000,
        }
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            uri: heapless_str("mqtt://broker.local:1883"),
            username: String::new(),
            password: String::new(),
        }
    }
}

impl Default for DeskPins {
    fn default() -> Self {
        Self {
            lower: pins::LOWER_GPIO,
            raise: pins::RAISE_GPIO,
            no_raise_limit: pins::NO_RAISE_LIMIT_GPIO,
            no_lower_limit: pins::NO_LOWER_LIMIT_GPIO,
        }
    }
}

impl DeskPins {
    pub fn outputs(&self) -> [PinId; 2] {
        [self.lower, self.raise]
    }

    pub fn inputs(&self) -> [PinId; 2] {
        [self.no_raise_limit, self.no_lower_limit]
    }

    pub fn output_mask(&self) -> u64 {
        pins::pin_mask(&self.outputs())
    }

    pub fn input_mask(&self) -> u64 {
        pins::pin_mask(&self.inputs())
    }
}

// ───────────────────────────────────────────────────────────────
// Loading
// ───────────────────────────────────────────────────────────────

impl DeskConfig {
    /// Build the configuration from the compile-time environment.
    ///
    /// `FREEDESK_CONFIG_JSON` wins if set; otherwise the individual
    /// `FREEDESK_*` variables override the defaults one by one.
    pub fn from_build_env() -> Result<Self, ConfigError> {
        if let Some(json) = option_env!("FREEDESK_CONFIG_JSON") {
            return Self::from_json(json);
        }

        let mut config = Self::default();
        set_opt(&mut config.wifi.ssid, option_env!("FREEDESK_WIFI_SSID"), "wifi.ssid")?;
        set_opt(
            &mut config.wifi.password,
            option_env!("FREEDESK_WIFI_PASSWORD"),
            "wifi.password",
        )?;
        set_opt(&mut config.broker.uri, option_env!("FREEDESK_BROKER_URL"), "broker.uri")?;
        set_opt(
            &mut config.broker.username,
            option_env!("FREEDESK_BROKER_USER_NAME"),
            "broker.username",
        )?;
        set_opt(
            &mut config.broker.password,
            option_env!("FREEDESK_BROKER_USER_PASS"),
            "broker.password",
        )?;
        set_opt(&mut config.topic, option_env!("FREEDESK_TOPIC"), "topic")?;

        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|_| ConfigError::Malformed)?;
        config.validate()?;
        Ok(config)
    }

    /// Range and consistency checks. Rejects instead of clamping.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_topic(&self.topic)?;

        const SCHEMES: [&str; 4] = ["mqtt://", "mqtts://", "ws://", "wss://"];
        let uri = self.broker.uri.as_str();
        if !SCHEMES
            .iter()
            .any(|s| uri.len() > s.len() && uri.starts_with(s))
        {
            return Err(ConfigError::Invalid("broker.uri must be mqtt(s):// or ws(s)://"));
        }

        let all = [
            self.pins.lower,
            self.pins.raise,
            self.pins.no_raise_limit,
            self.pins.no_lower_limit,
        ];
        if all.iter().any(|&p| !(0..pins::GPIO_PIN_COUNT).contains(&p)) {
            return Err(ConfigError::Invalid("pin number out of range"));
        }
        for (i, a) in all.iter().enumerate() {
            if all.iter().skip(i + 1).any(|b| a == b) {
                return Err(ConfigError::Invalid("pins must be distinct"));
            }
        }

        if self.input_poll_interval_ms == 0 || self.link_check_interval_ms == 0 {
            return Err(ConfigError::Invalid("intervals must be non-zero"));
        }
        Ok(())
    }
}

/// A subscription topic must be a literal: no MQTT wildcards.
pub(crate) fn validate_topic(topic: &str) -> Result<(), ConfigError> {
    if topic.is_empty() {
        return Err(ConfigError::Invalid("topic must not be empty"));
    }
    if topic.contains(['+', '#']) {
        return Err(ConfigError::Invalid("topic must not contain wildcards"));
    }
    Ok(())
}

fn set_opt<const N: usize>(
    field: &mut String<N>,
    value: Option<&str>,
    name: &'static str,
) -> Result<(), ConfigError> {
    if let Some(value) = value {
        field.clear();
        field.push_str(value).map_err(|()| ConfigError::TooLong(name))?;
    }
    Ok(())
}

/// Build a heapless string from a literal known to fit.
fn heapless_str<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    // Callers only pass short literals; an overflow leaves the string empty
    // and `validate()` reports it.
    let _ = out.push_str(s);
    out
}

// ───────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────

/// Configuration could not be built or failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// JSON document did not parse (or a string overflowed its capacity).
    Malformed,
    /// A value does not fit its fixed-capacity field.
    TooLong(&'static str),
    /// A field failed validation; the message names the field and rule.
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "config JSON malformed"),
            Self::TooLong(field) => write!(f, "{} too long", field),
            Self::Invalid(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl core::error::Error for ConfigError {}
