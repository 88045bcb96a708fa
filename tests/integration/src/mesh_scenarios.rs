//! End-to-end packet and transmit scenarios

use crate::test_utils::{init_test_logging, sample_metar, utc_ms, TestNode};
use aeromesh_mesh::{
    parse_packet, MessageType, Payload, Priority, TransmitOutcome, HEADER_LEN,
};
use aeromesh_radio::time_on_air;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_metar_build_transmit_parse() {
    init_test_logging();
    let node = TestNode::new(0x1A2B3C4D, utc_ms(2024, 5, 1, 9));

    let built = node
        .radio
        .create_packet(
            MessageType::Metar,
            &Payload::Metar(sample_metar("EDDF")),
            "EDDF",
            Priority::Normal,
            5,
        )
        .unwrap();
    assert_eq!(built.packet.len(), HEADER_LEN + built.payload.len());

    assert!(node.radio.transmit(&built.packet).await);
    assert_eq!(node.radio.ledger_len(), 1);

    let on_air = &node.driver.frames()[0];
    let parsed = parse_packet(&on_air.bytes).unwrap();
    assert_eq!(parsed.header.origin_id, 0x1A2B3C4D);
    assert_eq!(parsed.header.icao(), "EDDF");
    assert_eq!(parsed.header.priority, Priority::Normal);
    assert_eq!(parsed.payload, Payload::Metar(sample_metar("EDDF")));
    assert!(parsed.valid);
}

#[tokio::test(start_paused = true)]
async fn test_second_transmit_while_keyed_is_refused() {
    let node = TestNode::new(7, utc_ms(2024, 5, 1, 9));
    let packet = node
        .radio
        .create_metar_message(sample_metar("EDDF"), "EDDF")
        .unwrap();

    let (first, second) = tokio::join!(node.radio.transmit(&packet), node.radio.transmit(&packet));
    assert!(first);
    assert!(!second);
    assert_eq!(node.radio.ledger_len(), 1);
    assert_eq!(node.driver.frame_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_hour_of_traffic_hits_the_duty_cycle_then_recovers() {
    let node = TestNode::new(9, utc_ms(2024, 5, 1, 9));
    let packet = node
        .radio
        .create_metar_message(sample_metar("LFPG"), "LFPG")
        .unwrap();
    let airtime = time_on_air(packet.len(), 7, 125_000, 5, 8);
    let budget = 36_000 / airtime;

    let mut sent = 0;
    loop {
        match node.radio.try_transmit(&packet).await {
            TransmitOutcome::Sent { .. } => sent += 1,
            TransmitOutcome::DutyCycleExceeded => break,
            other => panic!("unexpected outcome {other:?}"),
        }
        node.clock.advance(Duration::from_secs(1));
    }
    assert_eq!(sent, budget);
    assert!(node.radio.stats().duty_cycle <= 0.01);

    node.clock.advance(Duration::from_secs(3600));
    assert!(node.radio.transmit(&packet).await);
    assert_eq!(node.radio.ledger_len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_channels_rotate_through_the_plan() {
    let node = TestNode::new(11, utc_ms(2024, 5, 1, 9));
    let packet = node
        .radio
        .create_metar_message(sample_metar("EHAM"), "EHAM")
        .unwrap();

    let mut channels = Vec::new();
    for _ in 0..9 {
        if let TransmitOutcome::Sent { channel_hz, .. } = node.radio.try_transmit(&packet).await {
            channels.push(channel_hz);
        }
    }
    assert_eq!(channels.len(), 9);
    assert_eq!(&channels[..8], &node.config.radio.channels[..]);
    assert_eq!(channels[8], channels[0]);
}

#[test]
fn test_sequence_numbers_are_consecutive() {
    let node = TestNode::new(12, utc_ms(2024, 5, 1, 9));
    let sequences: Vec<u16> = (0..5)
        .map(|_| {
            let packet = node
                .radio
                .create_metar_message(sample_metar("EDDM"), "EDDM")
                .unwrap();
            parse_packet(&packet).unwrap().header.sequence
        })
        .collect();
    assert_eq!(sequences, vec![1, 2, 3, 4, 5]);
}
