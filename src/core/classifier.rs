//! Emergency Classifier: vitals + SOS + window count → verdict
//!
//! Priority (first match is the reported type):
//! 1. SOS button          5. Temperature > 40°C
//! 2. Fall detected       6. Temperature < 15°C (reading present)
//! 3. Heart rate > 200    7. ≥ 5 unauthorized accesses in window
//! 4. Heart rate < 40 (reading present)

use crate::{
    HEART_RATE_CRITICAL_HIGH, HEART_RATE_CRITICAL_LOW, SECURITY_BREACH_THRESHOLD,
    TEMPERATURE_CRITICAL_HIGH, TEMPERATURE_CRITICAL_LOW,
};
use crate::types::{EmergencyType, EmergencyVerdict, VitalsRecord};

/// Stateless threshold policy
#[derive(Debug, Default, Clone, Copy)]
pub struct EmergencyClassifier;

impl EmergencyClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify one cycle. Pure: same inputs, same verdict.
    pub fn classify(
        &self,
        vitals: &VitalsRecord,
        sos: bool,
        unauthorized_in_window: usize,
    ) -> EmergencyVerdict {
        let mut triggers = Vec::new();

        if sos {
            triggers.push(EmergencyType::SosButton);
        }
        if vitals.fall_detected {
            triggers.push(EmergencyType::FallDetected);
        }

        // Absent readings never reach the low-bound comparisons
        if let Some(bpm) = vitals.heart_rate_bpm {
            if bpm > HEART_RATE_CRITICAL_HIGH {
                triggers.push(EmergencyType::HeartRateHigh);
            } else if bpm < HEART_RATE_CRITICAL_LOW {
                triggers.push(EmergencyType::HeartRateLow);
            }
        }
        if let Some(temp) = vitals.temperature_c {
            if temp > TEMPERATURE_CRITICAL_HIGH {
                triggers.push(EmergencyType::TemperatureHigh);
            } else if temp < TEMPERATURE_CRITICAL_LOW {
                triggers.push(EmergencyType::TemperatureLow);
            }
        }

        if unauthorized_in_window >= SECURITY_BREACH_THRESHOLD {
            triggers.push(EmergencyType::SecurityBreach);
        }

        if triggers.is_empty() {
            EmergencyVerdict::clear()
        } else {
            EmergencyVerdict::from_triggers(triggers)
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn vitals(bpm: Option<f64>, temp: Option<f64>) -> VitalsRecord {
        VitalsRecord {
            heart_rate_bpm: bpm,
            temperature_c: temp,
            ..VitalsRecord::default()
        }
    }

    #[test]
    fn test_normal_vitals_clear() {
        let v = EmergencyClassifier::new().classify(&vitals(Some(72.0), Some(36.6)), false, 0);
        assert_eq!(v, EmergencyVerdict::clear());
    }

    #[test]
    fn test_absent_heart_rate_not_low() {
        let v = EmergencyClassifier::new().classify(&vitals(None, None), false, 0);
        assert!(!v.is_emergency);
    }

    #[test]
    fn test_present_low_heart_rate() {
        let v = EmergencyClassifier::new().classify(&vitals(Some(39.0), Some(36.6)), false, 0);
        assert_eq!(v.emergency_type, Some(EmergencyType::HeartRateLow));
        assert!(v.medical);
        assert!(!v.security);
    }

    #[test]
    fn test_boundaries_are_exclusive() {
        let c = EmergencyClassifier::new();
        assert!(!c.classify(&vitals(Some(200.0), Some(40.0)), false, 0).is_emergency);
        assert!(!c.classify(&vitals(Some(40.0), Some(15.0)), false, 0).is_emergency);
        assert!(!c.classify(&vitals(None, None), false, 4).is_emergency);
    }

    #[test]
    fn test_high_temperature() {
        let v = EmergencyClassifier::new().classify(&vitals(Some(80.0), Some(40.5)), false, 0);
        assert_eq!(v.emergency_type, Some(EmergencyType::TemperatureHigh));
    }

    #[test]
    fn test_sos_outranks_everything() {
        let mut record = vitals(Some(250.0), Some(10.0));
        record.fall_detected = true;
        let v = EmergencyClassifier::new().classify(&record, true, 9);
        assert_eq!(v.emergency_type, Some(EmergencyType::SosButton));
        assert_eq!(
            v.triggers,
            vec![
                EmergencyType::SosButton,
                EmergencyType::FallDetected,
                EmergencyType::HeartRateHigh,
                EmergencyType::TemperatureLow,
                EmergencyType::SecurityBreach,
            ]
        );
        assert!(v.medical && v.security);
    }

    #[test]
    fn test_breach_only_is_security() {
        let v = EmergencyClassifier::new().classify(&vitals(Some(72.0), Some(36.6)), false, 5);
        assert_eq!(v.emergency_type, Some(EmergencyType::SecurityBreach));
        assert!(v.is_emergency);
        assert!(v.security);
        assert!(!v.medical);
    }

    #[test]
    fn test_pure() {
        let c = EmergencyClassifier::new();
        let record = vitals(Some(210.0), Some(36.5));
        assert_eq!(c.classify(&record, false, 2), c.classify(&record, false, 2));
    }
}
