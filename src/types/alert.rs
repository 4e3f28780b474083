//! Alert state and dispatch outcome codes

use std::time::Duration;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::types::EmergencyType;

/// Whether repeat notifications may be sent while an alert is latched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertPolicy {
    /// One notification per emergency episode
    Latched,
    /// Re-send once the cooldown elapsed or the emergency type changed
    Cooldown(Duration),
}

impl Default for AlertPolicy {
    fn default() -> Self {
        AlertPolicy::Latched
    }
}

/// Dispatcher memory across cycles
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertState {
    pub last_sent: bool,
    pub last_type: Option<String>,
    pub last_sent_at: Option<DateTime<Utc>>,
}

impl AlertState {
    pub fn is_idle(&self) -> bool {
        !self.last_sent
    }

    pub fn mark_sent(&mut self, kind: EmergencyType, at: DateTime<Utc>) {
        self.last_sent = true;
        self.last_type = Some(kind.label().to_string());
        self.last_sent_at = Some(at);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// What the dispatcher did this cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum DispatchOutcome {
    /// No emergency, nothing latched
    A001_IDLE,
    /// Idle → Sent, notification delivered
    A002_SENT,
    /// Already latched, repeat suppressed
    A003_SUPPRESSED,
    /// Latched but cooldown elapsed or type changed, notification delivered again
    A004_RESENT,
    /// Emergency resolved, latch released silently
    A005_CLEARED,
    /// Notification failed, state unchanged so the next cycle retries
    A006_FAILED,
}

impl DispatchOutcome {
    /// Get the code string (for logging)
    pub fn code(&self) -> &'static str {
        match self {
            Self::A001_IDLE => "A001_IDLE",
            Self::A002_SENT => "A002_SENT",
            Self::A003_SUPPRESSED => "A003_SUPPRESSED",
            Self::A004_RESENT => "A004_RESENT",
            Self::A005_CLEARED => "A005_CLEARED",
            Self::A006_FAILED => "A006_FAILED",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::A001_IDLE => "No emergency",
            Self::A002_SENT => "Alert sent",
            Self::A003_SUPPRESSED => "Alert already sent",
            Self::A004_RESENT => "Alert re-sent",
            Self::A005_CLEARED => "Emergency resolved",
            Self::A006_FAILED => "Alert delivery failed",
        }
    }

    /// Did this cycle put a message on the wire successfully?
    pub fn delivered(&self) -> bool {
        matches!(self, Self::A002_SENT | Self::A004_RESENT)
    }
}

impl std::fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}
