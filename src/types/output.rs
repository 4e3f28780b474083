//! Response document consumed by the dashboard

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::types::{
    DispatchOutcome, EmergencyType, EmergencyVerdict, SecurityEvent, TriageBrief, VitalsRecord,
};

/// Which numeric vitals carried a real reading this cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Readings {
    pub heart_rate: bool,
    pub temperature: bool,
    pub humidity: bool,
}

/// Output of one polling cycle. Field names are the dashboard contract.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDocument {
    pub timestamp: DateTime<Utc>,
    /// 0 when absent, see `readings`
    pub heart_rate: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub posture: String,
    pub fall_detected: bool,
    pub sos_pressed: bool,
    pub readings: Readings,
    pub authorized_count: usize,
    pub unauthorized_count: usize,
    pub emergency: bool,
    pub emergency_type: Option<EmergencyType>,
    pub medical_emergency: bool,
    pub security_emergency: bool,
    pub triggers: Vec<EmergencyType>,
    pub alert_outcome: DispatchOutcome,
    pub triage: Option<TriageBrief>,
    /// Newest first
    pub recent_authorized: Vec<SecurityEvent>,
    /// Newest first
    pub recent_unauthorized: Vec<SecurityEvent>,
}

impl ResponseDocument {
    /// Fill the vitals and verdict fields; counts and history are set by the caller
    pub fn new(
        timestamp: DateTime<Utc>,
        vitals: &VitalsRecord,
        sos_pressed: bool,
        verdict: &EmergencyVerdict,
        alert_outcome: DispatchOutcome,
    ) -> Self {
        Self {
            timestamp,
            heart_rate: vitals.heart_rate_or_sentinel(),
            temperature: vitals.temperature_or_sentinel(),
            humidity: vitals.humidity_or_sentinel(),
            posture: vitals.posture.clone(),
            fall_detected: vitals.fall_detected,
            sos_pressed,
            readings: Readings {
                heart_rate: vitals.heart_rate_bpm.is_some(),
                temperature: vitals.temperature_c.is_some(),
                humidity: vitals.humidity_pct.is_some(),
            },
            authorized_count: 0,
            unauthorized_count: 0,
            emergency: verdict.is_emergency,
            emergency_type: verdict.emergency_type,
            medical_emergency: verdict.medical,
            security_emergency: verdict.security,
            triggers: verdict.triggers.clone(),
            alert_outcome,
            triage: None,
            recent_authorized: Vec::new(),
            recent_unauthorized: Vec::new(),
        }
    }

    /// Format for terminal display (with colors)
    pub fn to_terminal_string(&self) -> String {
        let (color, label) = match self.emergency_type {
            Some(kind) => (kind.color_code(), format!("🚨 {}", kind)),
            None => ("\x1b[32m", "✓ normal".to_string()),
        };
        format!("{}{}\x1b[0m | {}", color, label, self.to_parseable_string())
    }

    /// Format for parseable output (no colors)
    pub fn to_parseable_string(&self) -> String {
        format!(
            "hr={} | temp={} | posture={} | fall={} | sos={} | unauth={} | emergency={} | alert={}",
            reading(self.heart_rate, self.readings.heart_rate),
            reading(self.temperature, self.readings.temperature),
            self.posture,
            self.fall_detected,
            self.sos_pressed,
            self.unauthorized_count,
            self.emergency_type.map(|t| t.label()).unwrap_or("none"),
            self.alert_outcome.code(),
        )
    }
}

fn reading(value: f64, present: bool) -> String {
    if present {
        format!("{:.1}", value)
    } else {
        "--".to_string()
    }
}

/// Returned when no document could be produced this cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDocument {
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorDocument {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            timestamp: Utc::now(),
        }
    }
}
