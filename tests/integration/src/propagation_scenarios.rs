//! Propagation intelligence driving adaptive transmission

use crate::test_utils::{sample_metar, utc_ms, TestNode};
use aeromesh_mesh::TransmitOutcome;
use aeromesh_rf::{LinkUpdate, PropagationService, TimeOfDay};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_night_transmit_trades_power_for_throughput() {
    let node = TestNode::new(0x21, utc_ms(2024, 1, 10, 2));
    let intelligence = node.intelligence(1);
    assert_eq!(
        intelligence.current_conditions().unwrap().time_of_day,
        TimeOfDay::Night
    );
    let (radio, _, driver) = node.into_intelligent(intelligence);
    let packet = radio
        .create_metar_message(sample_metar("ESSA"), "ESSA")
        .unwrap();

    assert!(radio.intelligent_transmit(&packet, "peer").await);
    let settings = driver.frames()[0].settings;
    assert_eq!(settings.tx_power_dbm, 11);
    assert_eq!(settings.spreading_factor, 7);
}

#[tokio::test(start_paused = true)]
async fn test_weak_link_gets_robust_settings() {
    let node = TestNode::new(0x22, utc_ms(2024, 4, 10, 12));
    let intelligence = node.intelligence(2);
    intelligence.update_link_metrics(
        "far-station",
        &LinkUpdate::new()
            .rssi(-118.0)
            .snr(-12.0)
            .packet_loss(0.6)
            .latency_ms(2500.0),
    );
    let (radio, _, driver) = node.into_intelligent(intelligence);
    let packet = radio
        .create_metar_message(sample_metar("LIRF"), "LIRF")
        .unwrap();

    let outcome = radio.intelligent_try_transmit(&packet, "far-station").await;
    assert!(outcome.is_sent());

    // Day: 14 + 2 clamped to 14, SF 8; weak link: power stays 14, SF 10
    let settings = driver.frames()[0].settings;
    assert_eq!(settings.tx_power_dbm, 14);
    assert_eq!(settings.spreading_factor, 10);
    if let TransmitOutcome::Sent { airtime_ms, .. } = outcome {
        assert_eq!(
            airtime_ms,
            aeromesh_radio::time_on_air(packet.len(), 10, 125_000, 5, 8)
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_repeated_success_heals_a_link() {
    let node = TestNode::new(0x23, utc_ms(2024, 4, 10, 12));
    let intelligence = node.intelligence(3);
    let start = intelligence
        .update_link_metrics("peer", &LinkUpdate::new().rssi(-90.0).snr(0.0))
        .reliability_score;
    let (radio, clock, _) = node.into_intelligent(intelligence.clone());
    let packet = radio
        .create_metar_message(sample_metar("LEMD"), "LEMD")
        .unwrap();

    let mut last = start;
    for _ in 0..5 {
        assert!(radio.intelligent_transmit(&packet, "peer").await);
        let now = intelligence.link_metrics("peer").unwrap().reliability_score;
        assert!(now > last);
        last = now;
        clock.advance(Duration::from_secs(10));
    }
}

#[tokio::test(start_paused = true)]
async fn test_service_keeps_history_fresh_for_radios() {
    let node = TestNode::new(0x24, utc_ms(2024, 7, 1, 6));
    let intelligence = Arc::new(aeromesh_rf::PropagationIntelligence::new(
        &node.config,
        Arc::new(aeromesh_rf::HeuristicModel::with_seed(5)),
        node.clock.clone(),
    ));
    let service = PropagationService::new(intelligence.clone(), Duration::from_secs(900));
    service.start().unwrap();
    assert_eq!(
        intelligence.current_conditions().unwrap().time_of_day,
        TimeOfDay::Dawn
    );

    // Wall clock and tokio clock move together: three hours, twelve samples.
    // The reader runs a second behind the sampler so each tick lands first.
    tokio::time::sleep(Duration::from_secs(1)).await;
    for _ in 0..12 {
        node.clock.advance(Duration::from_secs(900));
        tokio::time::sleep(Duration::from_secs(900)).await;
    }
    service.stop().await.unwrap();

    assert_eq!(intelligence.history_len(), 13);
    assert_eq!(
        intelligence.current_conditions().unwrap().time_of_day,
        TimeOfDay::Day
    );

    let report = intelligence.get_network_optimization_report();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["predicted_changes"].as_array().unwrap().len(), 3);
    assert_eq!(json["current_performance"], "0.0% network reliability");
}
