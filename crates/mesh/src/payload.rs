//! CBOR message bodies.
//!
//! Field names are shortened on the wire to keep frames inside the LoRa
//! payload limit.

use crate::error::{MeshError, MeshResult};
use crate::packet::MessageType;
use ciborium::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aviation routine weather report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Metar {
    /// Knots
    #[serde(rename = "ws")]
    pub wind_speed: u16,
    #[serde(rename = "wg", default, skip_serializing_if = "Option::is_none")]
    pub wind_gust: Option<u16>,
    /// Degrees true
    #[serde(rename = "wd")]
    pub wind_dir: u16,
    /// hPa
    #[serde(rename = "q")]
    pub qnh: u16,
    /// Metres
    #[serde(rename = "vis")]
    pub visibility: u32,
    /// Celsius
    #[serde(rename = "t")]
    pub temperature: i16,
    #[serde(rename = "dp", default, skip_serializing_if = "Option::is_none")]
    pub dewpoint: Option<i16>,
    #[serde(rename = "cl", default, skip_serializing_if = "Option::is_none")]
    pub clouds: Option<Vec<String>>,
    #[serde(rename = "wx", default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<Vec<String>>,
    #[serde(rename = "raw")]
    pub raw_metar: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reading {
    Number(f64),
    Text(String),
}

impl From<f64> for Reading {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for Reading {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<f64>,
}

/// Telemetry from an attached sensor package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Sensor {
    #[serde(rename = "id")]
    pub sensor_id: String,
    #[serde(rename = "r")]
    pub readings: BTreeMap<String, Reading>,
    /// Percent
    #[serde(rename = "b", default, skip_serializing_if = "Option::is_none")]
    pub battery: Option<f64>,
    /// dBm
    #[serde(rename = "ss", default, skip_serializing_if = "Option::is_none")]
    pub signal_strength: Option<f64>,
    #[serde(rename = "loc", default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    High,
    Critical,
}

/// Threshold alert raised by a station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Alert {
    /// e.g. WIND_SPEED, QNH_DROP
    #[serde(rename = "at")]
    pub alert_type: String,
    #[serde(rename = "sv")]
    pub severity: Severity,
    #[serde(rename = "v")]
    pub value: f64,
    #[serde(rename = "th")]
    pub threshold: f64,
    #[serde(rename = "d")]
    pub description: String,
    /// Epoch seconds
    #[serde(rename = "exp", default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
}

/// Any packet body.
///
/// Equality is structural: a typed body equals an opaque one carrying the
/// same CBOR value.
#[derive(Debug, Clone)]
pub enum Payload {
    Metar(Metar),
    Sensor(Sensor),
    Alert(Alert),
    /// Structured value with no typed schema
    Other(Value),
}

/// Message types that carry a typed schema, in lookup order.
const SCHEMA_TYPES: [MessageType; 3] = [MessageType::Metar, MessageType::Sensor, MessageType::Alert];

impl Payload {
    /// Wrap any serializable value as an opaque payload.
    pub fn opaque<T: Serialize>(value: &T) -> MeshResult<Self> {
        Value::serialized(value)
            .map(Self::Other)
            .map_err(|e| MeshError::Encode(e.to_string()))
    }

    pub fn encode(&self) -> MeshResult<Vec<u8>> {
        let mut out = Vec::new();
        let result = match self {
            Self::Metar(m) => ciborium::into_writer(m, &mut out),
            Self::Sensor(s) => ciborium::into_writer(s, &mut out),
            Self::Alert(a) => ciborium::into_writer(a, &mut out),
            Self::Other(v) => ciborium::into_writer(v, &mut out),
        };
        result.map_err(|e| MeshError::Encode(e.to_string()))?;
        Ok(out)
    }

    /// The body as a generic CBOR value.
    pub fn to_value(&self) -> MeshResult<Value> {
        let value = match self {
            Self::Metar(m) => Value::serialized(m),
            Self::Sensor(s) => Value::serialized(s),
            Self::Alert(a) => Value::serialized(a),
            Self::Other(v) => return Ok(v.clone()),
        };
        value.map_err(|e| MeshError::Encode(e.to_string()))
    }

    /// Decode a body carried under `msg_type`.
    ///
    /// The schema belonging to `msg_type` is tried first, then the remaining
    /// schemas. A schema only matches when it accounts for the body exactly;
    /// anything else comes back as [`Payload::Other`].
    pub fn decode(msg_type: MessageType, bytes: &[u8]) -> MeshResult<Self> {
        let value: Value = ciborium::from_reader(bytes)
            .map_err(|e| MeshError::DecodeFailure(e.to_string()))?;

        let typed = std::iter::once(msg_type)
            .chain(SCHEMA_TYPES.into_iter().filter(|t| *t != msg_type))
            .filter_map(|t| Self::with_schema(t, &value))
            .find(|candidate| candidate.to_value().ok().as_ref() == Some(&value));

        Ok(typed.unwrap_or(Self::Other(value)))
    }

    fn with_schema(msg_type: MessageType, value: &Value) -> Option<Self> {
        match msg_type {
            MessageType::Metar => value.deserialized().ok().map(Self::Metar),
            MessageType::Sensor => value.deserialized().ok().map(Self::Sensor),
            MessageType::Alert => value.deserialized().ok().map(Self::Alert),
            _ => None,
        }
    }
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Metar(a), Self::Metar(b)) => a == b,
            (Self::Sensor(a), Self::Sensor(b)) => a == b,
            (Self::Alert(a), Self::Alert(b)) => a == b,
            (Self::Other(a), Self::Other(b)) => a == b,
            _ => match (self.to_value(), other.to_value()) {
                (Ok(a), Ok(b)) => a == b,
                _ => false,
            },
        }
    }
}

impl From<Metar> for Payload {
    fn from(value: Metar) -> Self {
        Self::Metar(value)
    }
}

impl From<Sensor> for Payload {
    fn from(value: Sensor) -> Self {
        Self::Sensor(value)
    }
}

impl From<Alert> for Payload {
    fn from(value: Alert) -> Self {
        Self::Alert(value)
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::Other(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metar() -> Metar {
        Metar {
            wind_speed: 12,
            wind_gust: None,
            wind_dir: 270,
            qnh: 1013,
            visibility: 9999,
            temperature: 15,
            dewpoint: Some(9),
            clouds: Some(vec!["FEW030".into()]),
            weather: None,
            raw_metar: "EDDF 121150Z 27012KT 9999 FEW030 15/09 Q1013".into(),
        }
    }

    fn sensor() -> Sensor {
        let mut readings = BTreeMap::new();
        readings.insert("temp".to_string(), Reading::from(21.5));
        readings.insert("status".to_string(), Reading::from("ok"));
        Sensor {
            sensor_id: "aws-7".into(),
            readings,
            battery: Some(87.0),
            signal_strength: None,
            location: Some(Location {
                lat: 50.03,
                lon: 8.57,
                alt: None,
            }),
        }
    }

    #[test]
    fn test_typed_round_trips() {
        let cases = [
            (MessageType::Metar, Payload::from(metar())),
            (MessageType::Sensor, Payload::from(sensor())),
            (
                MessageType::Alert,
                Payload::from(Alert {
                    alert_type: "WIND_SPEED".into(),
                    severity: Severity::Critical,
                    value: 48.0,
                    threshold: 35.0,
                    description: "Gusts above limit".into(),
                    expires_at: Some(1_700_003_600),
                }),
            ),
        ];
        for (msg_type, payload) in cases {
            let bytes = payload.encode().unwrap();
            assert_eq!(Payload::decode(msg_type, &bytes).unwrap(), payload);
        }
    }

    #[test]
    fn test_short_keys_on_the_wire() {
        let bytes = Payload::from(metar()).encode().unwrap();
        let value: Value = ciborium::from_reader(&bytes[..]).unwrap();
        let keys: Vec<String> = value
            .as_map()
            .unwrap()
            .iter()
            .filter_map(|(k, _)| k.as_text().map(str::to_string))
            .collect();
        assert!(keys.contains(&"ws".to_string()));
        assert!(keys.contains(&"raw".to_string()));
        assert!(!keys.contains(&"wg".to_string()));
    }

    #[test]
    fn test_typed_body_under_foreign_type() {
        let bytes = Payload::from(sensor()).encode().unwrap();
        assert!(matches!(
            Payload::decode(MessageType::Metar, &bytes).unwrap(),
            Payload::Sensor(_)
        ));
        assert!(matches!(
            Payload::decode(MessageType::Route, &bytes).unwrap(),
            Payload::Sensor(_)
        ));
    }

    #[test]
    fn test_extra_keys_stay_opaque() {
        let mut value = Payload::from(metar()).to_value().unwrap();
        if let Value::Map(entries) = &mut value {
            entries.push((Value::Text("stn".into()), Value::Text("EDDF".into())));
        }
        let payload = Payload::Other(value);
        let bytes = payload.encode().unwrap();

        let decoded = Payload::decode(MessageType::Metar, &bytes).unwrap();
        assert!(matches!(decoded, Payload::Other(_)));
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_integer_where_float_expected_stays_opaque() {
        let value = Value::Map(vec![
            (Value::Text("at".into()), Value::Text("WIND_SPEED".into())),
            (Value::Text("sv".into()), Value::Text("LOW".into())),
            (Value::Text("v".into()), Value::Integer(30.into())),
            (Value::Text("th".into()), Value::Integer(25.into())),
            (Value::Text("d".into()), Value::Text("Breezy".into())),
        ]);
        let payload = Payload::Other(value);
        let bytes = payload.encode().unwrap();
        assert_eq!(Payload::decode(MessageType::Alert, &bytes).unwrap(), payload);
    }

    #[test]
    fn test_opaque_equals_matching_typed_body() {
        let typed = Payload::from(metar());
        let opaque = Payload::Other(typed.to_value().unwrap());
        assert_eq!(typed, opaque);
        assert_ne!(typed, Payload::from(sensor()));
    }

    #[test]
    fn test_untyped_message_is_opaque() {
        let payload = Payload::opaque(&vec![1u8, 2, 3]).unwrap();
        let bytes = payload.encode().unwrap();
        assert_eq!(Payload::decode(MessageType::Heartbeat, &bytes).unwrap(), payload);
    }

    #[test]
    fn test_garbage_is_decode_failure() {
        assert!(matches!(
            Payload::decode(MessageType::Control, &[]),
            Err(MeshError::DecodeFailure(_))
        ));
        assert!(matches!(
            Payload::decode(MessageType::Metar, &[0xFF]),
            Err(MeshError::DecodeFailure(_))
        ));
    }
}
