//! Start-up sequence against mock adapters: pin setup, initial lock,
//! credentials, then session start, stopping at the first failure.

use crate::mock_hw::{ChannelCall, MockChannel, MockConnectivity, MockGpio, NetCall, RecordingSink};

use freedesk::app::dispatcher::{CommandDispatcher, ConnectionState};
use freedesk::app::ports::{
    ChannelError, ConnectivityError, GpioError, InterruptMode, PinDirection, PinState, Pull,
};
use freedesk::app::startup::bring_up;
use freedesk::config::DeskConfig;
use freedesk::error::{ActuatorError, Error, StartupError};
use freedesk::events::InputEventQueue;
use freedesk::pins::{self, LOWER_GPIO, RAISE_GPIO};

static QUEUE: InputEventQueue = InputEventQueue::new();

fn config() -> DeskConfig {
    let mut c = DeskConfig::default();
    c.wifi.ssid.push_str("DeskNet").unwrap();
    c.wifi.password.push_str("hunter2hunter2").unwrap();
    c
}

struct Outcome {
    result: Result<(), Error>,
    dispatcher: CommandDispatcher,
    gpio: MockGpio,
    net: MockConnectivity,
    channel: MockChannel,
}

fn run(gpio: MockGpio, net: MockConnectivity, channel: MockChannel) -> Outcome {
    let config = config();
    let mut dispatcher = CommandDispatcher::new(&config);
    let (mut gpio, mut net, mut channel) = (gpio, net, channel);
    let mut sink = RecordingSink::new();
    let result = bring_up(
        &config,
        &mut dispatcher,
        &mut gpio,
        &mut net,
        &mut channel,
        &QUEUE,
        &mut sink,
    );
    Outcome {
        result,
        dispatcher,
        gpio,
        net,
        channel,
    }
}

#[test]
fn happy_path_runs_in_order() {
    let o = run(MockGpio::new(), MockConnectivity::default(), MockChannel::new());
    assert_eq!(o.result, Ok(()));

    assert_eq!(o.gpio.configs.len(), 2);
    let out = o.gpio.configs[0];
    assert_eq!(out.pin_mask, pins::OUTPUT_PIN_MASK);
    assert_eq!(out.direction, PinDirection::Output);
    assert_eq!(out.pull, Pull::None);
    assert_eq!(out.interrupt, InterruptMode::Disabled);
    let inp = o.gpio.configs[1];
    assert_eq!(inp.pin_mask, pins::INPUT_PIN_MASK);
    assert_eq!(inp.direction, PinDirection::Input);
    assert_eq!(inp.pull, Pull::Up);
    assert_eq!(inp.interrupt, InterruptMode::FallingEdge);
    assert_eq!(
        o.gpio.edge_pins,
        [pins::NO_RAISE_LIMIT_GPIO, pins::NO_LOWER_LIMIT_GPIO]
    );

    assert_eq!(
        o.gpio.writes,
        [(LOWER_GPIO, PinState::Low), (RAISE_GPIO, PinState::Low)]
    );
    assert_eq!(
        o.net.calls,
        [
            NetCall::SetCredentials("DeskNet".into(), "hunter2hunter2".into()),
            NetCall::Connect,
        ]
    );
    assert!(matches!(o.channel.calls[..], [ChannelCall::Start(_)]));
    assert_eq!(o.dispatcher.state(), ConnectionState::Connecting);
}

#[test]
fn pin_setup_failure_stops_before_network() {
    let mut gpio = MockGpio::new();
    gpio.fail_configure = true;
    let o = run(gpio, MockConnectivity::default(), MockChannel::new());
    assert_eq!(
        o.result,
        Err(Error::Startup(StartupError::PinSetup(GpioError::ConfigFailed(-1))))
    );
    assert!(o.gpio.writes.is_empty());
    assert!(o.net.calls.is_empty());
    assert_eq!(o.dispatcher.state(), ConnectionState::Idle);
}

#[test]
fn initial_lock_failure_is_fatal() {
    let mut gpio = MockGpio::new();
    gpio.fail_writes = vec![1];
    let o = run(gpio, MockConnectivity::default(), MockChannel::new());
    assert!(matches!(
        o.result,
        Err(Error::Startup(StartupError::InitialLock(ActuatorError::ClearFailed(_))))
    ));
    assert!(o.net.calls.is_empty());
}

#[test]
fn rejected_credentials_stop_before_connect() {
    let mut net = MockConnectivity::default();
    net.credentials_result = Some(ConnectivityError::InvalidPassword);
    let o = run(MockGpio::new(), net, MockChannel::new());
    assert_eq!(
        o.result,
        Err(Error::Startup(StartupError::Credentials(
            ConnectivityError::InvalidPassword
        )))
    );
    assert!(!o.net.calls.contains(&NetCall::Connect));
    assert_eq!(o.gpio.writes.len(), 2, "desk locked before credentials");
}

#[test]
fn broker_failure_surfaces_as_startup_error() {
    let mut channel = MockChannel::new();
    channel.start_result = Some(ChannelError::Client(-1));
    let o = run(MockGpio::new(), MockConnectivity::default(), channel);
    assert_eq!(
        o.result,
        Err(Error::Startup(StartupError::Channel(ChannelError::Client(-1))))
    );
    assert_eq!(o.dispatcher.state(), ConnectionState::Failed);
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let mut config = config();
    config.pins.raise = config.pins.lower;
    let mut dispatcher = CommandDispatcher::new(&config);
    let mut gpio = MockGpio::new();
    let result = bring_up(
        &config,
        &mut dispatcher,
        &mut gpio,
        &mut MockConnectivity::default(),
        &mut MockChannel::new(),
        &QUEUE,
        &mut RecordingSink::new(),
    );
    assert!(matches!(result, Err(Error::Config(_))));
    assert!(gpio.configs.is_empty());
}
