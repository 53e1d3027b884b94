//! Transmit, broadcast and reply against scripted remote stations.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use econet_core::{AckError, Engine, EngineConfig, TransmitRequest, TxError};
use econet_harness::{
    InboundFrame, SimAdlc, SimClock, TxFault,
    peer::{ack_frame, acknowledging, data_frame, scout_frame, scripted},
};
use econet_proto::{Address, FrameHeader, FrameType};

const ENGINE: Address = Address::new(2, 0);
const REMOTE: Address = Address::new(254, 0);

fn engine(config: EngineConfig) -> (Engine<SimAdlc, SimClock>, SimAdlc) {
    let clock = SimClock::new();
    let adlc = SimAdlc::new(clock.clone());
    let engine = Engine::new(adlc.clone(), clock, config).unwrap();
    (engine, adlc)
}

fn request(dest: Address, data: &[u8]) -> TransmitRequest {
    TransmitRequest { dest, control: 0x80, port: 0x99, data: data.to_vec(), scout_extra: Vec::new() }
}

#[test]
fn four_way_transmit() {
    let (mut engine, adlc) = engine(EngineConfig::default());
    adlc.set_responder(acknowledging(REMOTE));

    engine.transmit(&request(REMOTE, b"hello")).unwrap();

    assert_eq!(
        adlc.sent(),
        vec![
            scout_frame(REMOTE, ENGINE, 0x80, 0x99, &[]),
            data_frame(REMOTE, ENGINE, b"hello"),
        ]
    );
    assert!(adlc.is_listening());
}

#[test]
fn scout_addressed_to_requested_network() {
    let (mut engine, adlc) = engine(EngineConfig::default());
    let remote = Address::new(254, 5);
    adlc.set_responder(acknowledging(remote));

    let mut req = request(remote, b"x");
    req.scout_extra = vec![0xaa, 0xbb];
    engine.transmit(&req).unwrap();

    let sent = adlc.sent();
    assert_eq!(sent[0], vec![254, 5, 2, 0, 0x80, 0x99, 0xaa, 0xbb]);
    assert_eq!(sent[1], vec![254, 5, 2, 0, b'x']);
}

#[test]
fn missing_scout_ack() {
    let (mut engine, adlc) = engine(EngineConfig::default());
    let clock = adlc.clock();

    assert_eq!(engine.transmit(&request(REMOTE, b"hello")), Err(TxError::NoScoutAck));
    assert_eq!(adlc.sent().len(), 1);
    assert!(clock.elapsed() >= Duration::from_millis(200));
    assert!(clock.elapsed() < Duration::from_millis(250));
    assert!(adlc.is_listening());
}

#[test]
fn missing_data_ack() {
    let (mut engine, adlc) = engine(EngineConfig::default());
    adlc.set_responder(scripted([vec![InboundFrame::new(ack_frame(REMOTE, ENGINE))]]));

    assert_eq!(engine.transmit(&request(REMOTE, b"hello")), Err(TxError::NoDataAck));
    assert_eq!(adlc.sent().len(), 2);
}

#[test]
fn ack_from_wrong_station_rejected() {
    let (mut engine, adlc) = engine(EngineConfig::default());
    adlc.set_responder(scripted([vec![InboundFrame::new(vec![2, 0, 253, 0])]]));

    assert_eq!(engine.transmit(&request(REMOTE, b"hello")), Err(TxError::NoScoutAck));
    assert_eq!(adlc.sent().len(), 1);
}

#[test]
fn ack_with_swapped_stations_rejected() {
    let (mut engine, adlc) = engine(EngineConfig::default());
    let swapped = ack_frame(ENGINE, REMOTE);
    assert_eq!(swapped, vec![254, 0, 2, 0]);
    adlc.set_responder(scripted([vec![InboundFrame::new(swapped)]]));

    assert_eq!(engine.transmit(&request(REMOTE, b"hello")), Err(TxError::NoScoutAck));
    assert_eq!(adlc.sent(), vec![scout_frame(REMOTE, ENGINE, 0x80, 0x99, &[])]);
    assert!(adlc.is_listening());
}

#[test]
fn wait_ack_times_out_on_swapped_stations() {
    let (mut engine, adlc) = engine(EngineConfig::default());
    adlc.push_inbound(vec![254, 0, 2, 0]);

    assert_eq!(engine.wait_ack(REMOTE, ENGINE), Err(AckError::Timeout));
    assert!(adlc.fifo_reads() >= 1);
    assert!(adlc.is_listening());
}

#[test]
fn wait_ack_reports_mismatch() {
    let (mut engine, adlc) = engine(EngineConfig::default());
    adlc.push_inbound(vec![2, 0, 254, 0, 1, 2]);

    let result = engine.wait_ack(REMOTE, ENGINE);

    assert_eq!(
        result,
        Err(AckError::Mismatch {
            frame_type: FrameType::Data,
            header: Some(FrameHeader::new(ENGINE, REMOTE)),
        })
    );
}

#[test]
fn wait_ack_skips_corrupt_frames() {
    let (mut engine, adlc) = engine(EngineConfig::default());
    adlc.push_inbound(
        InboundFrame::new(ack_frame(REMOTE, ENGINE)).with_fault(2, econet_harness::RxFault::Crc),
    );
    adlc.push_inbound(ack_frame(REMOTE, ENGINE));

    assert_eq!(engine.wait_ack(REMOTE, ENGINE), Ok(()));
}

#[test]
fn wait_ack_ignores_other_stations() {
    let (mut engine, adlc) = engine(EngineConfig::default());
    adlc.push_inbound(vec![9, 0, 254, 0]);
    adlc.push_inbound(ack_frame(REMOTE, ENGINE));

    assert_eq!(engine.wait_ack(REMOTE, ENGINE), Ok(()));
}

#[test]
fn oversized_data_rejected_before_any_write() {
    let (mut engine, adlc) = engine(EngineConfig::default());
    let writes = adlc.write_count();

    let result = engine.transmit(&request(REMOTE, &[0; 3497]));

    assert_eq!(result, Err(TxError::Overflow));
    assert_eq!(adlc.write_count(), writes);
}

#[test]
fn largest_data_frame_fits() {
    let (mut engine, adlc) = engine(EngineConfig::default());
    adlc.set_responder(acknowledging(REMOTE));

    engine.transmit(&request(REMOTE, &[0; 3496])).unwrap();
    assert_eq!(adlc.sent()[1].len(), 3500);
}

#[test]
fn oversized_scout_rejected_before_any_write() {
    let (mut engine, adlc) = engine(EngineConfig::default());
    let writes = adlc.write_count();
    let mut req = request(REMOTE, b"x");
    req.scout_extra = vec![0; 27];

    assert_eq!(engine.transmit(&req), Err(TxError::Overflow));
    assert_eq!(adlc.write_count(), writes);
}

#[test]
fn transmitter_faults_mapped() {
    let cases = [
        (TxFault::Jammed, TxError::LineJammed),
        (TxFault::UnderrunAfter(3), TxError::Underrun),
        (TxFault::CompletionWithoutStatus, TxError::Misc),
    ];

    for (fault, expected) in cases {
        let mut config = EngineConfig::default();
        config.timeouts.write = Duration::from_millis(20);
        let (mut engine, adlc) = engine(config);
        adlc.set_tx_fault(Some(fault));

        assert_eq!(engine.transmit(&request(REMOTE, b"hello")), Err(expected), "{fault:?}");
        assert!(adlc.is_listening(), "{fault:?}");
    }
}

#[test]
fn broadcast_sent_without_ack() {
    let (mut engine, adlc) = engine(EngineConfig::default());

    engine.broadcast(b"everyone").unwrap();

    assert_eq!(adlc.sent(), vec![data_frame(Address::new(0xff, 0xff), ENGINE, b"everyone")]);
    assert!(adlc.is_listening());
    assert!(!adlc.flag_fill());
}

#[test]
fn oversized_broadcast_rejected() {
    let (mut engine, adlc) = engine(EngineConfig::default());
    let writes = adlc.write_count();

    assert_eq!(engine.broadcast(&[0; 4000]), Err(TxError::Overflow));
    assert_eq!(adlc.write_count(), writes);
}

#[test]
fn reply_without_pending_rejected_before_any_write() {
    let (mut engine, adlc) = engine(EngineConfig::default());
    let writes = adlc.write_count();

    assert_eq!(engine.reply(1, b"nobody asked"), Err(TxError::InvalidReceiveId));
    assert_eq!(adlc.write_count(), writes);
}

#[test]
fn restart_resets_controller() {
    let (mut engine, adlc) = engine(EngineConfig::default());

    engine.restart();

    assert_eq!(adlc.resets(), 1);
    assert!(adlc.is_listening());
    assert_eq!(engine.station(), 2);
}

#[test]
fn station_change_moves_ack_filter() {
    let (mut engine, adlc) = engine(EngineConfig::default());
    engine.set_station(9).unwrap();
    adlc.set_responder(acknowledging(REMOTE));

    engine.transmit(&request(REMOTE, b"x")).unwrap();

    assert_eq!(adlc.sent()[0][2], 9);
    assert_eq!(engine.listen_addresses().all(), &[9, 0xff]);
    assert!(engine.set_station(0xff).is_err());
    assert_eq!(engine.station(), 9);
}

#[test]
fn activity_reported_around_exchanges() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    let (engine, adlc) = engine(EngineConfig::default());
    let mut engine =
        engine.with_activity_indicator(move |active| log.lock().unwrap().push(active));
    adlc.set_responder(acknowledging(REMOTE));

    engine.transmit(&request(REMOTE, b"x")).unwrap();
    engine.broadcast(b"y").unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![true, false, true, false]);
}
