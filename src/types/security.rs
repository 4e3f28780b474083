//! Access-control events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a card read at the door
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessKind {
    Authorized,
    Unauthorized,
}

impl AccessKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessKind::Authorized => "authorized",
            AccessKind::Unauthorized => "unauthorized",
        }
    }

    /// Parse a device status word ("granted", "denied", ...)
    pub fn from_status(status: &str) -> Option<Self> {
        match status.trim().to_ascii_lowercase().as_str() {
            "authorized" | "authorised" | "granted" | "allowed" | "ok" | "valid" => {
                Some(AccessKind::Authorized)
            }
            "unauthorized" | "unauthorised" | "denied" | "rejected" | "invalid" | "unknown_card" => {
                Some(AccessKind::Unauthorized)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for AccessKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An access event as read from the store this cycle, not yet logged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessObservation {
    /// Device-reported timestamp; identity of the physical event
    pub device_timestamp: String,
    pub card_id: String,
    pub kind: AccessKind,
}

/// An access event recorded in the window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityEvent {
    /// When this process first logged the event
    pub received_at: DateTime<Utc>,
    pub device_timestamp: String,
    pub card_id: String,
    pub kind: AccessKind,
}

impl SecurityEvent {
    pub fn from_observation(obs: AccessObservation, received_at: DateTime<Utc>) -> Self {
        Self {
            received_at,
            device_timestamp: obs.device_timestamp,
            card_id: obs.card_id,
            kind: obs.kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_words() {
        assert_eq!(AccessKind::from_status("Granted"), Some(AccessKind::Authorized));
        assert_eq!(AccessKind::from_status(" DENIED "), Some(AccessKind::Unauthorized));
        assert_eq!(AccessKind::from_status("maybe"), None);
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        let json = serde_json::to_string(&AccessKind::Unauthorized).unwrap();
        assert_eq!(json, "\"unauthorized\"");
    }
}
