//! FreeDesk Firmware: Main Entry Point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   WifiAdapter        MqttAdapter  LogEventSink│
//! │  (GpioPort)        (ConnectivityPort) (Message-    (EventSink) │
//! │                                        Channel)                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │        CommandDispatcher (pure logic)                  │    │
//! │  │  session FSM · Actuator       LimitSwitchMonitor       │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::time::Duration;

use anyhow::Result;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use log::{error, info, warn};

use freedesk::adapters::hardware::HardwareAdapter;
use freedesk::adapters::log_sink::LogEventSink;
use freedesk::adapters::mqtt::{events_dropped, MqttAdapter, MQTT_EVENTS};
use freedesk::adapters::wifi::WifiAdapter;
use freedesk::app::dispatcher::CommandDispatcher;
use freedesk::app::limits::LimitSwitchMonitor;
use freedesk::app::ports::ConnectivityPort;
use freedesk::app::startup::bring_up;
use freedesk::config::DeskConfig;
use freedesk::events::INPUT_EVENTS;
use freedesk::tasks;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  FreeDesk v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");
    log_chip_info();

    // ── 2. Configuration ──────────────────────────────────────
    let config = DeskConfig::from_build_env()?;
    info!(
        "Config: broker={} topic={} qos={:?}",
        config.broker.uri, config.topic, config.qos
    );

    // ── 3. Peripherals and adapters ───────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let esp_wifi = EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs))?;
    let mut wifi = WifiAdapter::new(BlockingWifi::wrap(esp_wifi, sysloop)?);

    let mut gpio = HardwareAdapter::new();
    let mut mqtt = MqttAdapter::new(&MQTT_EVENTS);
    let mut sink = LogEventSink::new();
    let mut dispatcher = CommandDispatcher::new(&config);

    // ── 4. Limit-switch consumer (before any edge can queue) ──
    tasks::spawn_limit_monitor(
        LimitSwitchMonitor::new(&config.pins),
        &INPUT_EVENTS,
        gpio,
        sink,
        Duration::from_millis(config.input_poll_interval_ms.into()),
    )?;

    // ── 5. Start-up sequence ──────────────────────────────────
    if let Err(e) = bring_up(
        &config,
        &mut dispatcher,
        &mut gpio,
        &mut wifi,
        &mut mqtt,
        &INPUT_EVENTS,
        &mut sink,
    ) {
        error!("Start-up failed, not serving commands: {}", e);
        return Err(e.into());
    }

    // ── 6. Dispatch task owns the dispatcher and MQTT session ─
    tasks::spawn_dispatch(dispatcher, &MQTT_EVENTS, mqtt, gpio, sink)?;

    // ── 7. Link supervision ───────────────────────────────────
    let link_check = Duration::from_millis(config.link_check_interval_ms.into());
    info!("Running (link check every {:?})", link_check);
    let mut reported_drops = 0;
    loop {
        std::thread::sleep(link_check);
        wifi.poll();

        let dropped = events_dropped();
        if dropped != reported_drops {
            warn!(
                "MQTT events dropped: {} since last check ({} total)",
                dropped.wrapping_sub(reported_drops),
                dropped
            );
            reported_drops = dropped;
        }
    }
}

fn log_chip_info() {
    let mut chip = esp_idf_svc::sys::esp_chip_info_t::default();
    // SAFETY: esp_chip_info only fills the provided struct.
    unsafe { esp_idf_svc::sys::esp_chip_info(&mut chip) };
    info!(
        "Chip: model={} cores={} rev={} features=0x{:08x}",
        chip.model, chip.cores, chip.revision, chip.features
    );
}
