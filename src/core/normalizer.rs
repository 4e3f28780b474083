//! Field Normalizer: raw snapshot → decrypted, typed snapshot → records
//!
//! Every field is classified first (pass-through / candidate / typed), then
//! candidates go through the cipher codec. The whole path is total: any
//! input shape produces a snapshot with the same keys.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::debug;
use crate::core::CipherCodec;
use crate::types::{
    first_field, AccessKind, AccessObservation, DecryptedSnapshot, FieldClass, RawSnapshot,
    Scalar, VitalsRecord,
};
use crate::{MIN_CIPHERTEXT_LEN, PASS_THROUGH_FIELDS};

lazy_static! {
    // Plain decimal numbers only: no NaN, no inf, no hex
    static ref RE_NUMBER: Regex = Regex::new(
        r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$"
    ).unwrap();
}

// Field aliases seen across device firmware revisions
const HEART_RATE_FIELDS: [&str; 4] = ["bpm", "heartRate", "heart_rate", "hr"];
const TEMPERATURE_FIELDS: [&str; 4] = ["temperature", "temp", "temperatureC", "temperature_c"];
const HUMIDITY_FIELDS: [&str; 3] = ["humidity", "humidityPct", "humidity_pct"];
const POSTURE_FIELDS: [&str; 2] = ["posture", "position"];
const FALL_FIELDS: [&str; 3] = ["fallDetected", "fall_detected", "fall"];
const SOS_FIELDS: [&str; 4] = ["pressed", "sos", "active", "state"];
const TIMESTAMP_FIELDS: [&str; 3] = ["timestamp", "time", "ts"];
const CARD_FIELDS: [&str; 5] = ["cardId", "card_id", "uid", "card", "rfid"];
const ACCESS_FLAG_FIELDS: [&str; 2] = ["authorized", "granted"];
const ACCESS_STATUS_FIELDS: [&str; 3] = ["status", "result", "access"];

/// Decrypts and types raw snapshots
#[derive(Debug, Clone)]
pub struct FieldNormalizer {
    codec: CipherCodec,
}

impl FieldNormalizer {
    pub fn new(codec: CipherCodec) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &CipherCodec {
        &self.codec
    }

    /// Decide how a field is treated before any decryption
    pub fn classify(name: &str, value: &Value) -> FieldClass {
        if PASS_THROUGH_FIELDS.iter().any(|f| f.eq_ignore_ascii_case(name)) {
            return FieldClass::PassThrough;
        }
        match value {
            Value::String(s) if s.chars().count() > MIN_CIPHERTEXT_LEN => FieldClass::Candidate,
            _ => FieldClass::Typed,
        }
    }

    /// Normalize an object snapshot. Never fails.
    pub fn normalize(&self, raw: &RawSnapshot) -> DecryptedSnapshot {
        raw.iter()
            .map(|(name, value)| (name.clone(), self.normalize_field(name, value)))
            .collect()
    }

    /// Normalize whatever the store returned; non-objects yield an empty snapshot
    pub fn normalize_value(&self, raw: Option<&Value>) -> DecryptedSnapshot {
        match raw {
            Some(Value::Object(map)) => self.normalize(map),
            Some(other) if !other.is_null() => {
                debug!(shape = %value_kind(other), "snapshot is not an object, ignoring");
                DecryptedSnapshot::new()
            }
            _ => DecryptedSnapshot::new(),
        }
    }

    fn normalize_field(&self, name: &str, value: &Value) -> Scalar {
        match Self::classify(name, value) {
            FieldClass::PassThrough => Scalar::from_json(value),
            FieldClass::Candidate => {
                let Value::String(encoded) = value else {
                    return Scalar::from_json(value);
                };
                match self.codec.decrypt(encoded) {
                    Ok(plain) => coerce(&plain),
                    Err(e) => {
                        debug!(field = name, error = %e, "decryption failed, keeping raw value");
                        Scalar::Text(encoded.clone())
                    }
                }
            }
            FieldClass::Typed => match value {
                Value::String(s) => coerce(s),
                other => Scalar::from_json(other),
            },
        }
    }
}

/// Infer the type of a plaintext value
pub fn coerce(text: &str) -> Scalar {
    let trimmed = text.trim();
    match trimmed {
        "true" => return Scalar::Bool(true),
        "false" => return Scalar::Bool(false),
        _ => {}
    }
    if RE_NUMBER.is_match(trimmed) {
        if let Ok(n) = trimmed.parse::<f64>() {
            if n.is_finite() {
                return Scalar::Number(n);
            }
        }
    }
    Scalar::Text(text.to_string())
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// RECORD BUILDERS
// =============================================================================

/// Build the vitals record; fall may be raised by either snapshot
pub fn vitals_from(vitals: &DecryptedSnapshot, motion: &DecryptedSnapshot) -> VitalsRecord {
    // 0 bpm is the sensor's "no finger contact" value, not a reading
    let heart_rate_bpm = first_field(vitals, &HEART_RATE_FIELDS)
        .and_then(Scalar::as_f64)
        .filter(|bpm| *bpm > 0.0);
    let temperature_c = first_field(vitals, &TEMPERATURE_FIELDS).and_then(Scalar::as_f64);
    let humidity_pct = first_field(vitals, &HUMIDITY_FIELDS).and_then(Scalar::as_f64);

    let posture = first_field(vitals, &POSTURE_FIELDS)
        .and_then(Scalar::as_str)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or("unknown")
        .to_string();

    let fall_detected = [vitals, motion].iter().any(|snap| {
        first_field(snap, &FALL_FIELDS)
            .map(Scalar::is_truthy)
            .unwrap_or(false)
    });

    VitalsRecord {
        heart_rate_bpm,
        temperature_c,
        humidity_pct,
        posture,
        fall_detected,
    }
}

/// SOS button state; anything unreadable means not pressed
pub fn sos_from(snapshot: &DecryptedSnapshot) -> bool {
    first_field(snapshot, &SOS_FIELDS)
        .map(Scalar::is_truthy)
        .unwrap_or(false)
}

/// The access event currently reported, if it is complete enough to log
pub fn access_from(snapshot: &DecryptedSnapshot) -> Option<AccessObservation> {
    let device_timestamp = first_field(snapshot, &TIMESTAMP_FIELDS)?.to_identifier()?;

    let kind = match first_field(snapshot, &ACCESS_FLAG_FIELDS).and_then(Scalar::as_bool) {
        Some(true) => AccessKind::Authorized,
        Some(false) => AccessKind::Unauthorized,
        None => first_field(snapshot, &ACCESS_STATUS_FIELDS)
            .and_then(Scalar::as_str)
            .and_then(AccessKind::from_status)?,
    };

    let card_id = first_field(snapshot, &CARD_FIELDS)
        .and_then(Scalar::to_identifier)
        .unwrap_or_else(|| "unknown".to_string());

    Some(AccessObservation {
        device_timestamp,
        card_id,
        kind,
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalizer() -> FieldNormalizer {
        FieldNormalizer::new(CipherCodec::new(*b"0123456789abcdef", *b"fedcba9876543210"))
    }

    fn raw(value: Value) -> RawSnapshot {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_classification() {
        assert_eq!(FieldNormalizer::classify("timestamp", &json!("a very long timestamp")), FieldClass::PassThrough);
        assert_eq!(FieldNormalizer::classify("Alert", &json!(true)), FieldClass::PassThrough);
        assert_eq!(FieldNormalizer::classify("bpm", &json!("U2FsdGVkX1abcdef")), FieldClass::Candidate);
        assert_eq!(FieldNormalizer::classify("bpm", &json!("72")), FieldClass::Typed);
        assert_eq!(FieldNormalizer::classify("bpm", &json!(72)), FieldClass::Typed);
    }

    #[test]
    fn test_coerce() {
        assert_eq!(coerce("true"), Scalar::Bool(true));
        assert_eq!(coerce("false"), Scalar::Bool(false));
        assert_eq!(coerce("210"), Scalar::Number(210.0));
        assert_eq!(coerce(" -3.5e1 "), Scalar::Number(-35.0));
        assert_eq!(coerce("NaN"), Scalar::Text("NaN".into()));
        assert_eq!(coerce("inf"), Scalar::Text("inf".into()));
        assert_eq!(coerce("12abc"), Scalar::Text("12abc".into()));
        assert_eq!(coerce("TRUE"), Scalar::Text("TRUE".into()));
    }

    #[test]
    fn test_decrypts_candidates() {
        let n = normalizer();
        let enc = n.codec().encrypt("210");
        let out = n.normalize(&raw(json!({"bpm": enc, "temperature": 36.5})));
        assert_eq!(out["bpm"], Scalar::Number(210.0));
        assert_eq!(out["temperature"], Scalar::Number(36.5));
    }

    #[test]
    fn test_failed_decryption_keeps_raw() {
        let n = normalizer();
        let out = n.normalize(&raw(json!({"posture": "U2FsdGVkX1+garbage=="})));
        assert_eq!(out["posture"], Scalar::Text("U2FsdGVkX1+garbage==".into()));
    }

    #[test]
    fn test_pass_through_not_decrypted() {
        let n = normalizer();
        let enc = n.codec().encrypt("1");
        let out = n.normalize(&raw(json!({"timestamp": enc.clone()})));
        assert_eq!(out["timestamp"], Scalar::Text(enc));
    }

    #[test]
    fn test_key_set_preserved() {
        let n = normalizer();
        let input = raw(json!({
            "a": null, "b": [1, 2], "c": {"x": 1}, "d": "", "e": "not base64 but long", "timestamp": 5
        }));
        let out = n.normalize(&input);
        let in_keys: Vec<_> = input.keys().cloned().collect();
        let out_keys: Vec<_> = out.keys().cloned().collect();
        assert_eq!(in_keys.len(), out_keys.len());
        for k in in_keys {
            assert!(out.contains_key(&k));
        }
    }

    #[test]
    fn test_non_object_is_empty() {
        let n = normalizer();
        assert!(n.normalize_value(None).is_empty());
        assert!(n.normalize_value(Some(&json!(null))).is_empty());
        assert!(n.normalize_value(Some(&json!("scalar"))).is_empty());
    }

    #[test]
    fn test_vitals_absent_vs_zero() {
        let n = normalizer();
        let vitals = n.normalize(&raw(json!({"bpm": 0, "temperature": 0, "posture": ""})));
        let record = vitals_from(&vitals, &DecryptedSnapshot::new());
        assert_eq!(record.heart_rate_bpm, None);
        assert_eq!(record.temperature_c, Some(0.0));
        assert_eq!(record.humidity_pct, None);
        assert_eq!(record.posture, "unknown");
    }

    #[test]
    fn test_fall_from_motion() {
        let n = normalizer();
        let motion = n.normalize(&raw(json!({"fallDetected": "true"})));
        let record = vitals_from(&DecryptedSnapshot::new(), &motion);
        assert!(record.fall_detected);
    }

    #[test]
    fn test_sos() {
        let n = normalizer();
        assert!(sos_from(&n.normalize(&raw(json!({"pressed": true})))));
        assert!(sos_from(&n.normalize(&raw(json!({"state": "PRESSED"})))));
        assert!(!sos_from(&n.normalize(&raw(json!({"pressed": false})))));
        assert!(!sos_from(&DecryptedSnapshot::new()));
    }

    #[test]
    fn test_sos_ignores_unlisted_fields() {
        let n = normalizer();
        // "status" belongs to access-control payloads, not the button
        assert!(!sos_from(&n.normalize(&raw(json!({"status": "active"})))));
        assert!(sos_from(&n.normalize(&raw(json!({"status": "idle", "sos": 1})))));
    }

    #[test]
    fn test_access_event() {
        let n = normalizer();
        let snap = n.normalize(&raw(json!({"timestamp": 1718000000, "uid": "A1B2C3", "status": "denied"})));
        let obs = access_from(&snap).unwrap();
        assert_eq!(obs.device_timestamp, "1718000000");
        assert_eq!(obs.card_id, "A1B2C3");
        assert_eq!(obs.kind, AccessKind::Unauthorized);

        let snap = n.normalize(&raw(json!({"timestamp": "t1", "authorized": "true"})));
        let obs = access_from(&snap).unwrap();
        assert_eq!(obs.kind, AccessKind::Authorized);
        assert_eq!(obs.card_id, "unknown");

        // No timestamp, no identity
        let snap = n.normalize(&raw(json!({"status": "denied"})));
        assert!(access_from(&snap).is_none());
    }
}
