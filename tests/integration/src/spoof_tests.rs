//! Spoofed and tampered frames
//!
//! The 32-byte header slot cannot authenticate a frame on its own, so these
//! scenarios pair the wire bytes with the full detached signature the way a
//! key-distribution peer would.

use crate::test_utils::{sample_metar, utc_ms, TestNode};
use aeromesh_crypto::PeerKeyStore;
use aeromesh_mesh::{
    parse_packet, signing_data, verify_detached, MessageType, Payload, Priority,
};

fn trusted_store(nodes: &[&TestNode]) -> PeerKeyStore {
    let mut store = PeerKeyStore::new();
    for node in nodes {
        store
            .import(node.radio.node_id(), &node.radio.export_public_key())
            .unwrap();
    }
    store
}

#[test]
fn test_known_origin_verifies() {
    let alpha = TestNode::new(0xA1, utc_ms(2024, 3, 1, 10));
    let store = trusted_store(&[&alpha]);

    let built = alpha
        .radio
        .create_packet(
            MessageType::Metar,
            &Payload::Metar(sample_metar("EDDB")),
            "EDDB",
            Priority::Normal,
            5,
        )
        .unwrap();

    let parsed = parse_packet(&built.packet).unwrap();
    let data = signing_data(&built.packet).unwrap();
    assert!(store.verify_from(parsed.header.origin_id, &data, &built.signature));
}

#[test]
fn test_spoofed_origin_is_rejected() {
    let alpha = TestNode::new(0xA1, utc_ms(2024, 3, 1, 10));
    let mallory = TestNode::new(0xA1, utc_ms(2024, 3, 1, 10));
    let store = trusted_store(&[&alpha]);

    // Same origin id, different key
    let built = mallory
        .radio
        .create_packet(
            MessageType::Metar,
            &Payload::Metar(sample_metar("EDDB")),
            "EDDB",
            Priority::Normal,
            5,
        )
        .unwrap();

    let parsed = parse_packet(&built.packet).unwrap();
    assert!(parsed.valid, "flag-only validity cannot tell keys apart");

    let data = signing_data(&built.packet).unwrap();
    assert!(!store.verify_from(parsed.header.origin_id, &data, &built.signature));
    assert!(!store.verify_from(0xB2, &data, &built.signature));
}

#[test]
fn test_tampered_payload_fails_detached_check() {
    let alpha = TestNode::new(0xA1, utc_ms(2024, 3, 1, 10));
    let built = alpha
        .radio
        .create_packet(
            MessageType::Metar,
            &Payload::Metar(sample_metar("EDDB")),
            "EDDB",
            Priority::Normal,
            5,
        )
        .unwrap();

    let mut forged = sample_metar("EDDB");
    forged.qnh = 980;
    let forged_payload = Payload::Metar(forged).encode().unwrap();
    let mut tampered = built.packet[..64].to_vec();
    tampered.extend_from_slice(&forged_payload);

    let key = alpha.radio.public_key();
    assert!(verify_detached(&built.packet, &built.signature, &key));
    assert!(!verify_detached(&tampered, &built.signature, &key));
    assert!(parse_packet(&tampered).unwrap().valid);
}

#[test]
fn test_header_rewrite_fails_detached_check() {
    let alpha = TestNode::new(0xA1, utc_ms(2024, 3, 1, 10));
    let built = alpha
        .radio
        .create_packet(
            MessageType::Metar,
            &Payload::Metar(sample_metar("EDDB")),
            "EDDB",
            Priority::Normal,
            5,
        )
        .unwrap();

    // Escalate priority to CRITICAL
    let mut packet = built.packet.clone();
    packet[17] = Priority::Critical as u8;
    assert_eq!(parse_packet(&packet).unwrap().header.priority, Priority::Critical);
    assert!(!verify_detached(&packet, &built.signature, &alpha.radio.public_key()));
}
