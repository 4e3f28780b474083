//! Emergency types and per-cycle verdict

use serde::{Serialize, Serializer};

/// Emergency conditions, declared in priority order (highest first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EmergencyType {
    SosButton,
    FallDetected,
    HeartRateHigh,
    HeartRateLow,
    TemperatureHigh,
    TemperatureLow,
    SecurityBreach,
}

impl EmergencyType {
    /// Label shown on the dashboard and in notifications
    pub fn label(&self) -> &'static str {
        match self {
            EmergencyType::SosButton => "SOS Button Pressed",
            EmergencyType::FallDetected => "Fall Detected",
            EmergencyType::HeartRateHigh => "Critical High Heart Rate",
            EmergencyType::HeartRateLow => "Critical Low Heart Rate",
            EmergencyType::TemperatureHigh => "Critical High Temperature",
            EmergencyType::TemperatureLow => "Critical Low Temperature",
            EmergencyType::SecurityBreach => "Security Breach",
        }
    }

    /// Everything except a breach is a medical condition
    pub fn is_medical(&self) -> bool {
        !matches!(self, EmergencyType::SecurityBreach)
    }

    /// ANSI color code for terminal display
    pub fn color_code(&self) -> &'static str {
        if self.is_medical() {
            "\x1b[31m" // Red
        } else {
            "\x1b[35m" // Magenta
        }
    }
}

// The dashboard matches on the label text
impl Serialize for EmergencyType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl std::fmt::Display for EmergencyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Result of classifying one cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyVerdict {
    pub is_emergency: bool,
    /// Highest-priority matched condition
    #[serde(rename = "type")]
    pub emergency_type: Option<EmergencyType>,
    pub medical: bool,
    pub security: bool,
    /// Every matched condition, priority order
    pub triggers: Vec<EmergencyType>,
}

impl EmergencyVerdict {
    /// No condition matched
    pub fn clear() -> Self {
        Self {
            is_emergency: false,
            emergency_type: None,
            medical: false,
            security: false,
            triggers: Vec::new(),
        }
    }

    /// Build from matched conditions in any order
    pub fn from_triggers(mut triggers: Vec<EmergencyType>) -> Self {
        triggers.sort();
        triggers.dedup();
        let medical = triggers.iter().any(|t| t.is_medical());
        let security = triggers.iter().any(|t| !t.is_medical());
        Self {
            is_emergency: medical || security,
            emergency_type: triggers.first().copied(),
            medical,
            security,
            triggers,
        }
    }
}
