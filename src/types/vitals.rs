//! Normalized vitals record

use serde::{Deserialize, Serialize};

/// One cycle's vitals. `None` means the sensor did not report a usable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalsRecord {
    pub heart_rate_bpm: Option<f64>,
    pub temperature_c: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub posture: String,
    pub fall_detected: bool,
}

impl Default for VitalsRecord {
    fn default() -> Self {
        Self {
            heart_rate_bpm: None,
            temperature_c: None,
            humidity_pct: None,
            posture: "unknown".to_string(),
            fall_detected: false,
        }
    }
}

impl VitalsRecord {
    /// Heart rate or the dashboard sentinel (0)
    pub fn heart_rate_or_sentinel(&self) -> f64 {
        self.heart_rate_bpm.unwrap_or(0.0)
    }

    /// Temperature or the dashboard sentinel (0)
    pub fn temperature_or_sentinel(&self) -> f64 {
        self.temperature_c.unwrap_or(0.0)
    }

    /// Humidity or the dashboard sentinel (0)
    pub fn humidity_or_sentinel(&self) -> f64 {
        self.humidity_pct.unwrap_or(0.0)
    }
}
