//! VitalWatch: real-time decision engine for encrypted patient telemetry
//!
//! Telemetry store → normalize → classify + event window → alert dispatch → response document

pub mod config;
pub mod core;
pub mod error;
pub mod types;

// =============================================================================
// MEDICAL THRESHOLDS
// =============================================================================

/// Heart rate above this is critical (bpm)
pub const HEART_RATE_CRITICAL_HIGH: f64 = 200.0;

/// Heart rate below this is critical, only when a reading is present (bpm)
pub const HEART_RATE_CRITICAL_LOW: f64 = 40.0;

/// Body temperature above this is critical (°C)
pub const TEMPERATURE_CRITICAL_HIGH: f64 = 40.0;

/// Body temperature below this is critical, only when a reading is present (°C)
pub const TEMPERATURE_CRITICAL_LOW: f64 = 15.0;

// =============================================================================
// SECURITY WINDOW
// =============================================================================

/// Unauthorized access attempts inside the window that constitute a breach
pub const SECURITY_BREACH_THRESHOLD: usize = 5;

/// Default sliding window for access events (seconds)
pub const EVENT_WINDOW_SECS: u64 = 300;

/// Maximum events retained per kind, oldest dropped first
pub const MAX_EVENTS_PER_KIND: usize = 100;

/// Default length of history slices in the response document
pub const HISTORY_SLICE_LEN: usize = 10;

// =============================================================================
// CIPHER
// =============================================================================

/// Strings of this length or shorter are never treated as ciphertext
pub const MIN_CIPHERTEXT_LEN: usize = 10;

/// Field names that are never decrypted
pub const PASS_THROUGH_FIELDS: [&str; 2] = ["timestamp", "alert"];

// =============================================================================
// TRIAGE
// =============================================================================

/// How long a triage brief is reused (seconds)
pub const TRIAGE_VALIDITY_SECS: u64 = 30;

/// Ceiling on a single triage request (milliseconds)
pub const TRIAGE_TIMEOUT_MS: u64 = 5000;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "1.0.0";
