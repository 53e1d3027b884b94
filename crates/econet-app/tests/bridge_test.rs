//! Engine thread startup, round trips through the queues and shutdown.

use econet_app::{BridgeConfig, BridgeHandle, Command, Event, Mode, RxEvent, StartupError};
use econet_core::{ConfigError, EngineConfig, PoolError};
use econet_harness::{SimAdlc, SimClock, peer::data_frame};
use econet_proto::Address;

fn loopback() -> (SimAdlc, SimClock) {
    let clock = SimClock::new();
    let adlc = SimAdlc::new(clock.clone());
    adlc.set_loopback(true);
    (adlc, clock)
}

#[test]
fn invalid_station_rejected_at_startup() {
    let (adlc, clock) = loopback();
    let config = BridgeConfig {
        engine: EngineConfig { station: 0xff, ..EngineConfig::default() },
        ..BridgeConfig::default()
    };

    let error = BridgeHandle::start(adlc, clock, config).unwrap_err();

    assert!(matches!(error, StartupError::Config(ConfigError::BroadcastStation(0xff))));
}

#[test]
fn empty_pool_rejected_at_startup() {
    let (adlc, clock) = loopback();
    let config = BridgeConfig { buffers: 0, ..BridgeConfig::default() };

    let error = BridgeHandle::start(adlc, clock, config).unwrap_err();

    assert!(matches!(error, StartupError::Pool(PoolError::Empty { count: 0, .. })));
}

#[test]
fn looped_back_broadcast_received() {
    let (adlc, clock) = loopback();
    let mut bridge = BridgeHandle::start(adlc, clock, BridgeConfig::default()).unwrap();

    bridge.blocking_send(Command::SetMode(Mode::Listen)).unwrap();
    bridge.blocking_send(Command::Broadcast { data: b"echo".to_vec() }).unwrap();

    assert_eq!(bridge.blocking_next_event(), Some(Event::Tx(Ok(()))));
    let Some(Event::Rx(RxEvent::Broadcast { buffer })) = bridge.blocking_next_event() else {
        panic!("expected looped back broadcast");
    };
    assert_eq!(
        bridge.take_buffer(buffer),
        Some(data_frame(Address::new(0xff, 0xff), Address::new(2, 0), b"echo"))
    );
    assert_eq!(bridge.pool().in_use(), 0);

    let counters = bridge.shutdown().unwrap();
    assert_eq!(counters.dropped_events, 0);
}

#[test]
fn shutdown_while_stopped() {
    let (adlc, clock) = loopback();
    let bridge = BridgeHandle::start(adlc, clock, BridgeConfig::default()).unwrap();

    assert!(bridge.shutdown().is_some());
}

#[tokio::test(flavor = "current_thread")]
async fn async_status_round_trip() {
    let (adlc, clock) = loopback();
    let mut bridge = BridgeHandle::start(adlc, clock, BridgeConfig::default()).unwrap();

    bridge.send(Command::SetStation(42)).await.unwrap();
    bridge.send(Command::Status).await.unwrap();

    let Some(Event::Status(report)) = bridge.next_event().await else {
        panic!("expected status");
    };
    assert_eq!(report.station, 42);
    assert_eq!(report.mode, Mode::Stop);

    let handle = tokio::task::spawn_blocking(move || bridge.shutdown());
    assert!(handle.await.unwrap().is_some());
}
