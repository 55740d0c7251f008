//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to              |
//! |----------------|--------------------|--------------------------|
//! | `hardware`     | GpioPort           | ESP32 GPIO + edge ISRs   |
//! | `log_sink`     | EventSink          | Serial log output        |
//! | `mqtt`         | MessageChannel     | ESP-IDF MQTT client      |
//! | `wifi`         | ConnectivityPort   | ESP-IDF WiFi STA         |

pub mod hardware;
pub mod log_sink;
pub mod mqtt;
pub(super) mod utils;
pub mod wifi;
