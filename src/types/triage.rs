//! AI triage brief

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Short assessment attached to an emergency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageBrief {
    pub risk_level: RiskLevel,
    pub explanation: String,
    pub suggested_response: String,
    /// 1 (most urgent) to 5
    pub priority: u8,
}

impl TriageBrief {
    /// Substituted when the triage collaborator fails or times out
    pub fn fallback() -> Self {
        Self {
            risk_level: RiskLevel::High,
            explanation: "Automated triage unavailable. Vital signs or security events \
                          crossed a critical threshold."
                .to_string(),
            suggested_response: "Check on the patient immediately and follow the standard \
                                 emergency protocol."
                .to_string(),
            priority: 2,
        }
    }

    /// Pull priority back into 1..=5
    pub fn sanitized(mut self) -> Self {
        self.priority = self.priority.clamp(1, 5);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_is_high_risk() {
        let brief = TriageBrief::fallback();
        assert_eq!(brief.risk_level, RiskLevel::High);
        assert!((1..=5).contains(&brief.priority));
    }

    #[test]
    fn test_parses_camel_case() {
        let brief: TriageBrief = serde_json::from_str(
            r#"{"riskLevel":"Critical","explanation":"x","suggestedResponse":"y","priority":9}"#,
        )
        .unwrap();
        assert_eq!(brief.risk_level, RiskLevel::Critical);
        assert_eq!(brief.sanitized().priority, 5);
    }
}
